//! Generation report
//!
//! Collects non-fatal conditions encountered while walking the alignment.
//! The caller receives either a complete mapping plus a report listing any
//! skipped cells, or no mapping at all plus a fatal error.

use crate::error::Severity;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sink for non-fatal conditions raised during one generation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Report {
    entries: Vec<ReportEntry>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Severity::Info, message, None);
    }

    pub fn warn(&mut self, message: impl Into<String>, cause: Option<String>) {
        self.push(Severity::Warning, message, cause);
    }

    pub fn error(&mut self, message: impl Into<String>, cause: Option<String>) {
        self.push(Severity::Error, message, cause);
    }

    fn push(&mut self, severity: Severity, message: impl Into<String>, cause: Option<String>) {
        self.entries.push(ReportEntry {
            severity,
            message: message.into(),
            cause,
        });
    }

    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    fn count(&self, severity: Severity) -> usize {
        self.entries
            .iter()
            .filter(|e| e.severity == severity)
            .count()
    }
}

/// One report entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportEntry {
    pub severity: Severity,
    pub message: String,
    #[serde(default)]
    pub cause: Option<String>,
}

impl fmt::Display for ReportEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "[{}] {}: {}", self.severity, self.message, cause),
            None => write!(f, "[{}] {}", self.severity, self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counts() {
        let mut report = Report::new();
        assert!(report.is_empty());

        report.info("namespaces collected");
        report.warn("skipping cell c3", Some("Unsupported transformation 'pivot'".to_string()));
        report.warn("skipping cell c7", None);

        assert_eq!(report.entries().len(), 3);
        assert_eq!(report.warning_count(), 2);
        assert_eq!(report.error_count(), 0);
    }

    #[test]
    fn test_entry_display() {
        let entry = ReportEntry {
            severity: Severity::Warning,
            message: "skipping cell c3".to_string(),
            cause: Some("unsupported".to_string()),
        };
        assert_eq!(entry.to_string(), "[warning] skipping cell c3: unsupported");
    }
}
