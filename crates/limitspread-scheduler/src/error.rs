// Allow unused assignments for diagnostic fields - they're used by the macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Scheduler error type
#[derive(Error, Debug, Diagnostic)]
pub enum SchedulerError {
    /// Snapshot has no entry for the node
    #[error("getting node {node_name:?} from snapshot: {reason}")]
    #[diagnostic(
        code(scheduler::node_not_found),
        help("The snapshot may be stale. Rebuild it before the next scheduling cycle")
    )]
    NodeNotFound { node_name: String, reason: String },

    /// Snapshot entry exists but carries no node object
    #[error("node not found: {node_name}")]
    #[diagnostic(
        code(scheduler::node_object_missing),
        help("The node was removed while its pods were still cached")
    )]
    NodeObjectMissing { node_name: String },

    /// Node reports no allocatable resources
    #[error("node {node_name} has no allocatable resources")]
    #[diagnostic(
        code(scheduler::missing_allocatable),
        help("Check that the kubelet on this node has posted status.allocatable")
    )]
    MissingAllocatable { node_name: String },

    /// Pod has no controlling owner
    #[error("owner of pod {pod_name} is empty")]
    #[diagnostic(
        code(scheduler::owner_not_found),
        help("Only pods created by a ReplicaSet take part in spread scoring")
    )]
    OwnerNotFound { pod_name: String },

    /// Owner reference could not be interpreted
    #[error("owner of pod {pod_name} is invalid: {reason}")]
    #[diagnostic(code(scheduler::invalid_owner))]
    InvalidOwner { pod_name: String, reason: String },

    /// Owner is of a kind the spread plugin does not track
    #[error("owner of pod {pod_name} is {actual}, expected {expected}")]
    #[diagnostic(
        code(scheduler::unexpected_owner_kind),
        help("Spread scoring only tracks ReplicaSet owned pods")
    )]
    UnexpectedOwnerKind {
        pod_name: String,
        expected: String,
        actual: String,
    },

    /// Persisted schedule state is malformed
    #[error("failed to decode schedule state of {owner}: {message}")]
    #[diagnostic(
        code(scheduler::state_decode),
        help("Remove or fix the schedule state annotation on the owner object")
    )]
    StateDecode { owner: String, message: String },

    /// Owner object client failed
    #[error("owner client error: {message}")]
    #[diagnostic(
        code(scheduler::owner_client),
        help("Check connectivity to the API server")
    )]
    OwnerClient { message: String },

    /// Configuration could not be loaded
    #[error("failed to load config {path}: {message}")]
    #[diagnostic(
        code(scheduler::config),
        help("Fix the configuration file or remove it to use the defaults")
    )]
    Config { path: String, message: String },

    /// Plugin handle lacks a required collaborator
    #[error("{capability} is not available")]
    #[diagnostic(
        code(scheduler::missing_capability),
        help("Provide a {capability} to the framework handle before constructing plugins")
    )]
    MissingCapability { capability: String },

    /// Core error
    #[error("Core error: {0}")]
    #[diagnostic(
        code(scheduler::core_error),
        help("This is an internal error")
    )]
    CoreError(#[from] limitspread_core::LimitSpreadError),

    /// Internal error
    #[error("Internal error: {message}")]
    #[diagnostic(
        code(scheduler::internal_error),
        help("This is likely a bug. Please report it")
    )]
    InternalError { message: String },
}

/// Result type for scheduler operations
pub type Result<T> = std::result::Result<T, SchedulerError>;

impl SchedulerError {
    /// Create a NodeNotFound error
    pub fn node_not_found(node_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NodeNotFound {
            node_name: node_name.into(),
            reason: reason.into(),
        }
    }

    /// Create a NodeObjectMissing error
    pub fn node_object_missing(node_name: impl Into<String>) -> Self {
        Self::NodeObjectMissing {
            node_name: node_name.into(),
        }
    }

    /// Create a MissingAllocatable error
    pub fn missing_allocatable(node_name: impl Into<String>) -> Self {
        Self::MissingAllocatable {
            node_name: node_name.into(),
        }
    }

    /// Create an OwnerNotFound error
    pub fn owner_not_found(pod_name: impl Into<String>) -> Self {
        Self::OwnerNotFound {
            pod_name: pod_name.into(),
        }
    }

    /// Create an InvalidOwner error
    pub fn invalid_owner(pod_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOwner {
            pod_name: pod_name.into(),
            reason: reason.into(),
        }
    }

    /// Create an UnexpectedOwnerKind error
    pub fn unexpected_owner_kind(
        pod_name: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::UnexpectedOwnerKind {
            pod_name: pod_name.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a StateDecode error
    pub fn state_decode(owner: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StateDecode {
            owner: owner.into(),
            message: message.into(),
        }
    }

    /// Create an OwnerClient error
    pub fn owner_client(message: impl Into<String>) -> Self {
        Self::OwnerClient {
            message: message.into(),
        }
    }

    /// Create a Config error
    pub fn config(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a MissingCapability error
    pub fn missing_capability(capability: impl Into<String>) -> Self {
        Self::MissingCapability {
            capability: capability.into(),
        }
    }

    /// Create an InternalError
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }
}
