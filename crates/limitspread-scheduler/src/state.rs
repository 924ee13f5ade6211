//! Placement history kept on the owning ReplicaSet.
//!
//! The history is a small JSON document stored in an owner annotation:
//! `{"node_count": {"node-a": 2}, "last": "node-a"}`. Updates are
//! best-effort merge patches with no resourceVersion check, so two sibling
//! pods bound in overlapping cycles can lose one increment.

use crate::owner::OwnerClient;
use crate::{Result, SchedulerError};
use async_trait::async_trait;
use limitspread_core::{ReplicaSet, Resource};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// How often each node was chosen for pods of one owner
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleState {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub node_count: BTreeMap<String, u64>,
    #[serde(default)]
    pub last: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<BTreeMap<String, u64>>::deserialize(deserializer)?.unwrap_or_default())
}

impl ScheduleState {
    /// Record that `node_name` was chosen
    pub fn update(&mut self, node_name: &str) {
        *self.node_count.entry(node_name.to_string()).or_insert(0) += 1;
        self.last = node_name.to_string();
    }

    /// Times `node_name` was chosen
    pub fn count(&self, node_name: &str) -> u64 {
        self.node_count.get(node_name).copied().unwrap_or(0)
    }

    /// Sum of all counts except the last chosen node's
    pub fn total_except_last(&self) -> u64 {
        self.node_count
            .iter()
            .filter(|(name, _)| **name != self.last)
            .map(|(_, count)| count)
            .sum()
    }
}

/// Storage for per-owner schedule state
#[async_trait]
pub trait ScheduleStateStore: Send + Sync {
    /// Read the state of `owner`. An owner without state yields an empty state.
    async fn load(&self, owner: &ReplicaSet) -> Result<ScheduleState>;

    /// Write the state of `owner`
    async fn persist(&self, owner: &ReplicaSet, state: &ScheduleState) -> Result<()>;
}

/// Keeps the state in an annotation on the owner object
pub struct AnnotationStateStore {
    client: Arc<dyn OwnerClient>,
    ann_key: String,
}

impl AnnotationStateStore {
    pub fn new(client: Arc<dyn OwnerClient>, ann_key: impl Into<String>) -> Self {
        Self {
            client,
            ann_key: ann_key.into(),
        }
    }

    /// Decode the state from the owner's annotation
    pub fn decode(&self, owner: &ReplicaSet) -> Result<ScheduleState> {
        match owner.annotation(&self.ann_key) {
            None => Ok(ScheduleState::default()),
            Some(raw) => limitspread_core::from_json(raw)
                .map_err(|e| SchedulerError::state_decode(owner.display_name(), e.to_string())),
        }
    }

    /// Merge patch that replaces only the state annotation
    pub fn patch_for(&self, state: &ScheduleState) -> Result<serde_json::Value> {
        let encoded = limitspread_core::to_json(state)?;
        Ok(serde_json::json!({
            "metadata": {
                "annotations": {
                    self.ann_key.as_str(): encoded
                }
            }
        }))
    }
}

#[async_trait]
impl ScheduleStateStore for AnnotationStateStore {
    async fn load(&self, owner: &ReplicaSet) -> Result<ScheduleState> {
        self.decode(owner)
    }

    async fn persist(&self, owner: &ReplicaSet, state: &ScheduleState) -> Result<()> {
        let patch = self.patch_for(state)?;
        debug!("Persisting schedule state of {}: {}", owner.display_name(), patch);
        self.client
            .patch_replica_set(owner.namespace(), owner.name(), &patch)
            .await
    }
}
