//! Run configuration: datastore parameters and workspace settings

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Connection configuration for the source datastore. Parameters are merged
/// into the default datastore of the mapping under construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataStoreConfig {
    /// Explicit datastore id; a random one is assigned when absent.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

/// Per-namespace workspace settings used when deriving the deployment
/// description.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceConfiguration {
    #[serde(default)]
    pub workspaces: Vec<WorkspaceSettings>,
}

impl WorkspaceConfiguration {
    pub fn workspace(&self, namespace_uri: &str) -> Option<&WorkspaceSettings> {
        self.workspaces
            .iter()
            .find(|w| w.namespace == namespace_uri)
    }

    pub fn is_isolated(&self, namespace_uri: &str) -> bool {
        self.workspace(namespace_uri)
            .map(|w| w.isolated)
            .unwrap_or(false)
    }
}

/// Settings of one workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceSettings {
    /// Namespace URI the workspace is associated with.
    pub namespace: String,
    /// Workspace name override; defaults to the namespace prefix.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub isolated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolation_lookup() {
        let conf = WorkspaceConfiguration {
            workspaces: vec![WorkspaceSettings {
                namespace: "http://example.com/ex".to_string(),
                name: None,
                isolated: true,
            }],
        };
        assert!(conf.is_isolated("http://example.com/ex"));
        assert!(!conf.is_isolated("http://example.com/other"));
    }
}
