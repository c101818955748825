//! Error types for the Alignmap core library
//!
//! This module defines the error handling system for Alignmap, using
//! thiserror for ergonomic error definitions and anyhow for flexible error
//! contexts.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Main error type for Alignmap operations
#[derive(Error, Debug)]
pub enum Error {
    /// A cell carries a transformation identifier no handler is registered
    /// for. Recoverable: the orchestrator downgrades it to a report warning
    /// and skips the cell.
    #[error("Unsupported transformation '{identifier}'")]
    UnsupportedTransformation {
        identifier: String,
        context: Option<String>,
    },

    /// A cell violates a structural precondition (e.g. no source or target
    /// entities). Fatal to the whole generation.
    #[error("Invalid cell '{cell}': {message}")]
    InvalidCell { cell: String, message: String },

    /// A type or property referenced by the alignment could not be resolved
    /// against the schema.
    #[error("Schema lookup failed: {message}")]
    SchemaLookup { message: String },

    /// Base mapping template could not be loaded.
    #[error("Template error: {message}")]
    Template {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// XML serialization errors
    #[error("XML error: {message}")]
    Xml {
        message: String,
        #[source]
        source: quick_xml::Error,
    },

    /// JSON parsing and serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// An operation was invoked in a state that does not allow it (e.g.
    /// requesting the generated mapping before a generation has run).
    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    /// A handler broke an internal contract. Signals a programming error,
    /// not a data problem.
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Shorthand for an unsupported-transformation error.
    pub fn unsupported(identifier: impl Into<String>) -> Self {
        Error::UnsupportedTransformation {
            identifier: identifier.into(),
            context: None,
        }
    }

    /// Shorthand for a structural precondition violation on a cell.
    pub fn invalid_cell(cell: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidCell {
            cell: cell.into(),
            message: message.into(),
        }
    }

    /// Whether the orchestrator may downgrade this error to a report entry
    /// and continue with the next cell.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::UnsupportedTransformation { .. })
    }
}

/// Severity levels for report entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational, no action required
    Info,
    /// Warning, should be reviewed
    Warning,
    /// Error, the produced mapping is incomplete
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

// Conversion implementations
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::unsupported("com.example.align.pivot");
        assert_eq!(
            err.to_string(),
            "Unsupported transformation 'com.example.align.pivot'"
        );
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(Error::unsupported("x").is_recoverable());
        assert!(!Error::invalid_cell("c1", "no source").is_recoverable());
        assert!(!Error::InvalidState {
            message: "not generated".to_string()
        }
        .is_recoverable());
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
    }

    #[test]
    fn test_severity_display() {
        assert_eq!(Severity::Warning.to_string(), "warning");
    }
}
