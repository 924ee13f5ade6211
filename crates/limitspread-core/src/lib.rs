//! LimitSpread Core - Shared types for the LimitSpread scheduler plugins
//!
//! This crate provides:
//! - Kubernetes resource abstractions (Pod, Node, ReplicaSet)
//! - Error types with miette diagnostics
//! - Type-safe resource keys and group/version/kind parsing
//! - Resource quantity parsing
//! - Serialization helpers

pub mod error;
pub mod resources;
pub mod types;

// Re-export commonly used types
pub use error::{LimitSpreadError, Result};
pub use resources::quantities::ResourceName;
pub use resources::{Resource, ResourceQuantities};
pub use types::{GroupVersionKind, ResourceKey};

// Re-export k8s-openapi types for convenience
pub use k8s_openapi;
pub use k8s_openapi::api::apps::v1::ReplicaSet;
pub use k8s_openapi::api::core::v1::{Node, Pod};
pub use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};

/// Serialize a value to JSON
pub fn to_json<T: serde::Serialize>(resource: &T) -> Result<String> {
    serde_json::to_string(resource).map_err(|e| {
        LimitSpreadError::serialization_error(
            format!("Failed to serialize to JSON: {}", e),
            Some(Box::new(e)),
        )
    })
}

/// Deserialize a value from JSON
pub fn from_json<T: for<'de> serde::Deserialize<'de>>(data: &str) -> Result<T> {
    serde_json::from_str(data).map_err(|e| {
        LimitSpreadError::serialization_error(
            format!("Failed to deserialize from JSON: {}", e),
            Some(Box::new(e)),
        )
    })
}

/// Serialize a value to YAML
pub fn to_yaml<T: serde::Serialize>(resource: &T) -> Result<String> {
    serde_yaml::to_string(resource).map_err(|e| {
        LimitSpreadError::serialization_error(
            format!("Failed to serialize to YAML: {}", e),
            Some(Box::new(e)),
        )
    })
}

/// Deserialize a value from YAML
pub fn from_yaml<T: for<'de> serde::Deserialize<'de>>(data: &str) -> Result<T> {
    serde_yaml::from_str(data).map_err(|e| {
        LimitSpreadError::serialization_error(
            format!("Failed to deserialize from YAML: {}", e),
            Some(Box::new(e)),
        )
    })
}
