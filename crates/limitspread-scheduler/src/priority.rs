use crate::config::PriorityConfig;
use crate::owner::{resolve_controller, OwnerClient};
use crate::plugin::{FrameworkHandle, ScorePlugin};
use crate::state::{AnnotationStateStore, ScheduleState, ScheduleStateStore};
use crate::types::{NodeScoreList, MAX_NODE_SCORE, MIN_NODE_SCORE};
use crate::{Result, SchedulerError};
use async_trait::async_trait;
use limitspread_core::{GroupVersionKind, Pod, ReplicaSet, Resource};
use std::sync::Arc;
use tracing::{debug, error, info};

pub const SP_PRIORITY: &str = "SPPriority";

/// Rewrite `scores` so that nodes used less often by the owner score higher
///
/// The last chosen node always gets the minimum. Its own count is left out
/// of the denominator, so one node chosen over and over does not flatten the
/// scores of the others.
pub fn spread_scores(state: &ScheduleState, scores: &mut NodeScoreList) {
    let total = state.total_except_last();

    for node_score in scores.iter_mut() {
        if node_score.name == state.last {
            node_score.score = MIN_NODE_SCORE;
            continue;
        }

        if total == 0 {
            node_score.score = MAX_NODE_SCORE;
            continue;
        }

        let count = state.count(&node_score.name);
        node_score.score = (MAX_NODE_SCORE as f64 * (1.0 - count as f64 / total as f64)) as i64;
    }
}

/// Spreads the pods of a ReplicaSet across nodes using its placement history
pub struct SPPriority {
    config: PriorityConfig,
    client: Arc<dyn OwnerClient>,
    store: Arc<dyn ScheduleStateStore>,
}

impl SPPriority {
    /// Create the plugin with state kept in the owner annotation
    pub fn new(handle: &FrameworkHandle, config: PriorityConfig) -> Result<Self> {
        let client = handle.owner_client()?;
        let store = Arc::new(AnnotationStateStore::new(
            client.clone(),
            config.state_ann_key.clone(),
        ));
        Self::with_store(handle, config, store)
    }

    /// Create the plugin with a custom state store
    pub fn with_store(
        handle: &FrameworkHandle,
        config: PriorityConfig,
        store: Arc<dyn ScheduleStateStore>,
    ) -> Result<Self> {
        Ok(Self {
            client: handle.owner_client()?,
            config,
            store,
        })
    }

    /// Fetch the ReplicaSet controlling `pod`
    async fn owner_replica_set(&self, pod: &Pod) -> Result<ReplicaSet> {
        let controller = resolve_controller(pod)?;

        let expected = GroupVersionKind::replica_set();
        if controller.gvk != expected {
            return Err(SchedulerError::unexpected_owner_kind(
                pod.display_name(),
                expected.to_string(),
                controller.gvk.to_string(),
            ));
        }

        self.client
            .get_replica_set(pod.namespace(), &controller.name)
            .await
    }
}

#[async_trait]
impl ScorePlugin for SPPriority {
    fn name(&self) -> &str {
        SP_PRIORITY
    }

    /// All work happens in `normalize_score`
    fn score(&self, _pod: &Pod, _node_name: &str) -> Result<i64> {
        Ok(0)
    }

    async fn normalize_score(&self, pod: &Pod, scores: &mut NodeScoreList) -> Result<()> {
        if self.config.disable(pod) {
            return Ok(());
        }

        let owner = match self.owner_replica_set(pod).await {
            Ok(owner) => owner,
            Err(e) => {
                error!("Get pod {} owner failed: {}", pod.display_name(), e);
                return Ok(());
            }
        };

        let state = match self.store.load(&owner).await {
            Ok(state) => state,
            Err(e) => {
                error!("Get schedule state from owner {} failed: {}", owner.display_name(), e);
                return Ok(());
            }
        };

        debug!(
            last = %state.last,
            total = state.total_except_last(),
            pod = %pod.display_name(),
            "Schedule state"
        );

        spread_scores(&state, scores);
        Ok(())
    }

    async fn post_bind(&self, pod: &Pod, node_name: &str) {
        if self.config.disable(pod) {
            info!("Spread priority disabled for pod {}", pod.display_name());
            return;
        }

        let owner = match self.owner_replica_set(pod).await {
            Ok(owner) => owner,
            Err(e) => {
                error!("Get pod {} owner failed: {}", pod.display_name(), e);
                return;
            }
        };

        let replicas = owner.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);
        if self.config.skip_multi_replica && replicas > 1 {
            info!(
                "Skipping owner {} with {} replicas",
                owner.display_name(),
                replicas
            );
            return;
        }

        let mut state = match self.store.load(&owner).await {
            Ok(state) => state,
            Err(e) => {
                error!("Get schedule state from owner {} failed: {}", owner.display_name(), e);
                return;
            }
        };

        state.update(node_name);

        if let Err(e) = self.store.persist(&owner, &state).await {
            error!("Update owner {} failed: {}", owner.display_name(), e);
            return;
        }

        debug!(
            "Recorded pod {} on node {} for owner {}",
            pod.display_name(),
            node_name,
            owner.display_name()
        );
    }
}
