use crate::owner::OwnerClient;
use crate::snapshot::NodeInfoLister;
use crate::types::NodeScoreList;
use crate::{Result, SchedulerError};
use async_trait::async_trait;
use limitspread_core::Pod;
use std::sync::Arc;

/// Node scoring plugin
///
/// `score` is called once per candidate node and may run concurrently for
/// different nodes, so implementations must not mutate shared state there.
/// `normalize_score` runs once per pod after all nodes are scored, and
/// `post_bind` runs after the pod was bound.
#[async_trait]
pub trait ScorePlugin: Send + Sync {
    /// Name of the plugin
    fn name(&self) -> &str;

    /// Score a node for the given pod
    fn score(&self, pod: &Pod, node_name: &str) -> Result<i64>;

    /// Rewrite the scores of all nodes in place
    async fn normalize_score(&self, _pod: &Pod, _scores: &mut NodeScoreList) -> Result<()> {
        Ok(())
    }

    /// Observe a committed binding
    async fn post_bind(&self, _pod: &Pod, _node_name: &str) {}
}

/// Collaborators handed to plugins at construction
#[derive(Clone, Default)]
pub struct FrameworkHandle {
    snapshot: Option<Arc<dyn NodeInfoLister>>,
    owner_client: Option<Arc<dyn OwnerClient>>,
}

impl FrameworkHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(mut self, snapshot: Arc<dyn NodeInfoLister>) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    pub fn with_owner_client(mut self, client: Arc<dyn OwnerClient>) -> Self {
        self.owner_client = Some(client);
        self
    }

    /// The cluster snapshot lister
    pub fn snapshot_lister(&self) -> Result<Arc<dyn NodeInfoLister>> {
        self.snapshot
            .clone()
            .ok_or_else(|| SchedulerError::missing_capability("snapshot lister"))
    }

    /// The owner object client
    pub fn owner_client(&self) -> Result<Arc<dyn OwnerClient>> {
        self.owner_client
            .clone()
            .ok_or_else(|| SchedulerError::missing_capability("owner client"))
    }
}
