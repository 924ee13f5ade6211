pub mod quantities;

pub use quantities::ResourceQuantities;

use k8s_openapi::api::apps::v1::ReplicaSet;
use k8s_openapi::api::core::v1::{Node, Pod};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};

/// Trait for Kubernetes resources
pub trait Resource: Serialize + for<'de> Deserialize<'de> + Send + Sync {
    /// Get the metadata of this resource
    fn metadata(&self) -> &ObjectMeta;

    /// Get the name, or an empty string when unset
    fn name(&self) -> &str {
        self.metadata().name.as_deref().unwrap_or_default()
    }

    /// Get the namespace, or an empty string for cluster-scoped objects
    fn namespace(&self) -> &str {
        self.metadata().namespace.as_deref().unwrap_or_default()
    }

    /// Human readable `namespace/name` used in log lines
    fn display_name(&self) -> String {
        if self.namespace().is_empty() {
            self.name().to_string()
        } else {
            format!("{}/{}", self.namespace(), self.name())
        }
    }

    /// Look up an annotation value
    fn annotation(&self, key: &str) -> Option<&str> {
        self.metadata()
            .annotations
            .as_ref()
            .and_then(|a| a.get(key))
            .map(String::as_str)
    }
}

impl Resource for Pod {
    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }
}

impl Resource for Node {
    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }
}

impl Resource for ReplicaSet {
    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }
}
