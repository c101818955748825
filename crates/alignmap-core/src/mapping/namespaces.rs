//! Namespace registry
//!
//! Allocates and deduplicates `(uri, prefix)` pairs. Small, but every output
//! name depends on it: target elements, attribute paths and client property
//! names all resolve their prefixes here.

use super::document::Namespace;
use crate::model::Name;
use std::collections::HashMap;

/// Base of synthesized prefixes for namespaces registered without one.
pub const SYNTHETIC_PREFIX: &str = "nns__";

/// Registry of all namespaces of one mapping under construction.
///
/// Namespaces are kept in creation order; that order is the order they
/// appear in the output document.
#[derive(Debug)]
pub struct NamespaceRegistry {
    namespaces: Vec<Namespace>,
    by_uri: HashMap<String, usize>,
    by_prefix: HashMap<String, usize>,
    counter: u32,
}

impl Default for NamespaceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NamespaceRegistry {
    pub fn new() -> Self {
        Self {
            namespaces: Vec::new(),
            by_uri: HashMap::new(),
            by_prefix: HashMap::new(),
            counter: 1,
        }
    }

    /// Get or create the namespace for `uri`.
    ///
    /// A blank `prefix_hint` yields a synthesized prefix. A non-blank hint
    /// replaces a previously synthesized prefix exactly once; a prefix that
    /// was itself supplied by a caller is never replaced. Hints colliding
    /// with an existing prefix are made unique with a counter suffix.
    ///
    /// Returns `None` when `uri` is empty: nothing is registered and no
    /// namespace is emitted.
    pub fn get_or_create(&mut self, uri: &str, prefix_hint: &str) -> Option<&Namespace> {
        if uri.is_empty() {
            return None;
        }

        if let Some(&index) = self.by_uri.get(uri) {
            let hint = prefix_hint.trim();
            if !hint.is_empty() && self.namespaces[index].prefix.starts_with(SYNTHETIC_PREFIX) {
                let unique = self.unique_prefix(hint);
                let old = std::mem::replace(&mut self.namespaces[index].prefix, unique.clone());
                self.by_prefix.remove(&old);
                self.by_prefix.insert(unique, index);
            }
            return Some(&self.namespaces[index]);
        }

        let hint = prefix_hint.trim();
        let unique = if hint.is_empty() {
            let synthesized = format!("{}{}", SYNTHETIC_PREFIX, self.counter);
            self.counter += 1;
            self.unique_prefix(&synthesized)
        } else {
            self.unique_prefix(hint)
        };

        let index = self.namespaces.len();
        self.namespaces.push(Namespace {
            prefix: unique.clone(),
            uri: uri.to_string(),
        });
        self.by_uri.insert(uri.to_string(), index);
        self.by_prefix.insert(unique, index);

        Some(&self.namespaces[index])
    }

    fn unique_prefix(&mut self, base: &str) -> String {
        let mut candidate = base.to_string();
        while self.by_prefix.contains_key(&candidate) {
            candidate = format!("{}{}", base, self.counter);
            self.counter += 1;
        }
        candidate
    }

    /// Resolve the output prefix for a qualified name, registering its
    /// namespace on the fly.
    pub fn prefix_for(&mut self, name: &Name) -> Option<String> {
        self.get_or_create(&name.namespace, &name.prefix)
            .map(|ns| ns.prefix.clone())
    }

    /// The `{prefix}:{local}` form of a qualified name, or just the local
    /// name when it has no namespace.
    pub fn qualified(&mut self, name: &Name) -> String {
        match self.prefix_for(name) {
            Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, name.local),
            _ => name.local.clone(),
        }
    }

    pub fn lookup(&self, uri: &str) -> Option<&Namespace> {
        self.by_uri.get(uri).map(|&i| &self.namespaces[i])
    }

    /// All namespaces, in creation order.
    pub fn namespaces(&self) -> &[Namespace] {
        &self.namespaces
    }
}
