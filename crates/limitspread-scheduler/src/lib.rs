//! LimitSpread Scheduler - score plugins for pod placement
//!
//! This crate provides:
//! - `FitLimitResources`: prefers nodes with headroom left after summing container limits
//! - `SPPriority`: spreads the pods of a ReplicaSet using a persisted placement history
//! - The plugin interface and the collaborators the plugins read from
//! - A small framework that drives plugins through score, normalize and post-bind

pub mod config;
pub mod error;
pub mod fit;
pub mod framework;
pub mod owner;
pub mod plugin;
pub mod priority;
pub mod snapshot;
pub mod state;
pub mod types;

// Re-export commonly used types
pub use config::PriorityConfig;
pub use error::{Result, SchedulerError};
pub use fit::FitLimitResources;
pub use framework::Framework;
pub use owner::{ApiOwnerClient, InMemoryOwnerClient, OwnerClient};
pub use plugin::{FrameworkHandle, ScorePlugin};
pub use priority::SPPriority;
pub use snapshot::{NodeInfo, NodeInfoLister, Snapshot};
pub use state::{AnnotationStateStore, ScheduleState, ScheduleStateStore};
pub use types::{NodeScore, NodeScoreList, ResourceWeights, MAX_NODE_SCORE, MIN_NODE_SCORE};
