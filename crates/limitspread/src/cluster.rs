use limitspread_core::{Node, Pod, ReplicaSet, Resource};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Cluster objects read from and written back to a YAML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterState {
    pub nodes: Vec<Node>,
    pub pods: Vec<Pod>,
    pub replica_sets: Vec<ReplicaSet>,
}

impl ClusterState {
    pub async fn load(path: &Path) -> miette::Result<Self> {
        let data = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| miette::miette!("Failed to read cluster file '{}': {}", path.display(), e))?;

        limitspread_core::from_yaml(&data)
            .map_err(|e| miette::miette!("Failed to parse cluster file '{}': {}", path.display(), e))
    }

    pub async fn save(&self, path: &Path) -> miette::Result<()> {
        let data = limitspread_core::to_yaml(self)
            .map_err(|e| miette::miette!("Failed to encode cluster state: {}", e))?;

        tokio::fs::write(path, data)
            .await
            .map_err(|e| miette::miette!("Failed to write cluster file '{}': {}", path.display(), e))
    }

    /// Index of the pod `namespace/name`
    pub fn find_pod(&self, namespace: &str, name: &str) -> Option<usize> {
        self.pods
            .iter()
            .position(|p| p.namespace() == namespace && p.name() == name)
    }
}

/// Whether the pod has not been bound yet
pub fn is_pending(pod: &Pod) -> bool {
    pod.spec
        .as_ref()
        .and_then(|s| s.node_name.as_deref())
        .map_or(true, str::is_empty)
}
