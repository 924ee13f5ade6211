use crate::{Result, SchedulerError};
use limitspread_core::{Node, Pod, Resource};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Point-in-time view of one node and the pods assigned to it
#[derive(Debug, Clone, Default)]
pub struct NodeInfo {
    /// The node object; `None` when the node was removed but pods remain cached
    pub node: Option<Node>,
    /// Pods already assigned to the node
    pub pods: Vec<Pod>,
}

/// Read access to the cluster snapshot
pub trait NodeInfoLister: Send + Sync {
    /// Look up a node by name
    fn get(&self, node_name: &str) -> Result<Arc<NodeInfo>>;
}

/// In-memory cluster snapshot, immutable once built
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    node_infos: HashMap<String, Arc<NodeInfo>>,
}

impl Snapshot {
    /// Build a snapshot from nodes and pods
    ///
    /// Pods are grouped by `spec.nodeName`. Pending pods are skipped. A pod
    /// bound to a node that is not in `nodes` produces an entry without a
    /// node object.
    pub fn new(nodes: Vec<Node>, pods: Vec<Pod>) -> Self {
        let mut infos: HashMap<String, NodeInfo> = HashMap::new();

        for node in nodes {
            let name = node.name().to_string();
            infos.entry(name).or_default().node = Some(node);
        }

        for pod in pods {
            let node_name = match pod.spec.as_ref().and_then(|s| s.node_name.clone()) {
                Some(name) if !name.is_empty() => name,
                _ => continue,
            };
            debug!("Snapshot: pod {} on node {}", pod.display_name(), node_name);
            infos.entry(node_name).or_default().pods.push(pod);
        }

        Self {
            node_infos: infos
                .into_iter()
                .map(|(name, info)| (name, Arc::new(info)))
                .collect(),
        }
    }

    /// Names of all nodes that carry a node object, sorted
    pub fn node_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .node_infos
            .iter()
            .filter(|(_, info)| info.node.is_some())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}

impl NodeInfoLister for Snapshot {
    fn get(&self, node_name: &str) -> Result<Arc<NodeInfo>> {
        self.node_infos
            .get(node_name)
            .cloned()
            .ok_or_else(|| SchedulerError::node_not_found(node_name, "nodeinfo not found"))
    }
}
