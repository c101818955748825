//! Source-expression language helpers
//!
//! Attribute mappings reference their source data through a small CQL-like
//! expression language evaluated by the downstream feature-serving engine.
//! This module centralizes how those expression strings are composed so the
//! handlers never concatenate them ad hoc.
//!
//! Copyright (c) 2025 Alignmap Team
//! Licensed under the Apache-2.0 license

use regex::Regex;
use std::sync::OnceLock;

/// Quote a string literal, escaping embedded single quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Whether an expression is a constant (quoted string or number). Constant
/// client properties force `encodeIfEmpty` so the element is emitted even
/// without a value.
pub fn is_literal(expression: &str) -> bool {
    let trimmed = expression.trim();
    (trimmed.len() >= 2 && trimmed.starts_with('\'') && trimmed.ends_with('\''))
        || trimmed.parse::<f64>().is_ok()
}

/// Selection of a document field by relative path.
pub fn json_select(path: &str) -> String {
    format!("jsonSelect('{}')", path)
}

/// Identifier of the current document/collection entry.
pub fn collection_id() -> String {
    "collectionId()".to_string()
}

/// Container-side link into a nested collection.
pub fn collection_link(path: &str) -> String {
    format!("collectionLink('{}')", path)
}

/// Nested-side counterpart of [`collection_link`].
pub fn nested_collection_link() -> String {
    "nestedCollectionLink()".to_string()
}

/// `xsi:nil` value following the same logic as the source expression:
/// nil when the source is null, `'true'` otherwise.
pub fn xsi_nil_same_logic(source_expression: &str) -> String {
    format!(
        "if_then_else(isNull({}), Expression.NIL, 'true')",
        source_expression
    )
}

/// `xsi:nil` value with inverted logic: `'true'` when the source is null,
/// nil otherwise.
pub fn xsi_nil_inverted_logic(source_expression: &str) -> String {
    format!(
        "if_then_else(isNull({}), 'true', Expression.NIL)",
        source_expression
    )
}

/// Wrap an expression in a conditional derived from a filter attached to
/// the property's path step.
///
/// The first argument of `if_then_else` must be an expression; a filter text
/// containing comparison operators is not one, so the produced output is not
/// evaluable by the downstream engine. The broken form is kept until the
/// expression grammar grows a predicate argument; callers log a warning
/// whenever this path is taken.
pub fn conditional(filter: &str, property_local_name: &str, expression: &str) -> String {
    // conditions reference the filtered value as "value" and the enclosing
    // instance as "parent."
    let filter = filter.replace("parent.", "");
    let filter = filter.replace("value", property_local_name);
    format!("if_then_else({}, {}, Expression.NIL)", filter, expression)
}

/// Compose a left-nested `strConcat` chain over the given parts. A single
/// part is returned as-is; an empty slice yields the empty literal.
pub fn str_concat(parts: &[String]) -> String {
    match parts {
        [] => quote_literal(""),
        [single] => single.clone(),
        _ => {
            let mut iter = parts.iter();
            let mut expr = iter.next().cloned().unwrap_or_default();
            for part in iter {
                expr = format!("strConcat({}, {})", expr, part);
            }
            expr
        }
    }
}

/// Split a `formatted-string` pattern like `"{parcel.id}-suffix"` into
/// expression parts: variable references become column references (last
/// path segment), literal runs become quoted literals.
pub fn pattern_parts(pattern: &str) -> Vec<String> {
    static VARIABLE: OnceLock<Regex> = OnceLock::new();
    let variable = VARIABLE.get_or_init(|| Regex::new(r"\{([^{}]+)\}").expect("valid regex"));

    let mut parts = Vec::new();
    let mut last = 0;
    for capture in variable.captures_iter(pattern) {
        let whole = capture.get(0).expect("capture 0 always present");
        if whole.start() > last {
            parts.push(quote_literal(&pattern[last..whole.start()]));
        }
        let reference = capture.get(1).expect("pattern has one group").as_str();
        // variables name the source property by dotted path; the column
        // reference is its last segment
        let column = reference.rsplit('.').next().unwrap_or(reference);
        parts.push(column.to_string());
        last = whole.end();
    }
    if last < pattern.len() {
        parts.push(quote_literal(&pattern[last..]));
    }

    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_literal_escapes() {
        assert_eq!(quote_literal("plain"), "'plain'");
        assert_eq!(quote_literal("it's"), "'it''s'");
    }

    #[test]
    fn test_is_literal() {
        assert!(is_literal("'constant'"));
        assert!(is_literal("42"));
        assert!(is_literal("3.14"));
        assert!(!is_literal("area"));
        assert!(!is_literal("jsonSelect('a.b')"));
    }

    #[test]
    fn test_xsi_nil_logic() {
        assert_eq!(
            xsi_nil_same_logic("reason"),
            "if_then_else(isNull(reason), Expression.NIL, 'true')"
        );
        assert_eq!(
            xsi_nil_inverted_logic("area"),
            "if_then_else(isNull(area), 'true', Expression.NIL)"
        );
    }

    #[test]
    fn test_conditional_rewrites_references() {
        let wrapped = conditional("parent.value > 10", "area", "area");
        assert_eq!(wrapped, "if_then_else(area > 10, area, Expression.NIL)");
    }

    #[test]
    fn test_str_concat_nesting() {
        assert_eq!(str_concat(&[]), "''");
        assert_eq!(str_concat(&["a".to_string()]), "a");
        assert_eq!(
            str_concat(&["a".to_string(), "b".to_string(), "c".to_string()]),
            "strConcat(strConcat(a, b), c)"
        );
    }

    #[test]
    fn test_pattern_parts() {
        assert_eq!(
            pattern_parts("{parcel.id}-{zone}"),
            vec!["id".to_string(), "'-'".to_string(), "zone".to_string()]
        );
        assert_eq!(pattern_parts("prefix only"), vec!["'prefix only'".to_string()]);
        assert_eq!(pattern_parts("{id}"), vec!["id".to_string()]);
    }

    #[test]
    fn test_formatted_pattern_to_expression() {
        let expr = str_concat(&pattern_parts("{a}-{b}"));
        assert_eq!(expr, "strConcat(strConcat(a, '-'), b)");
    }
}
