use crate::{Result, SchedulerError};
use async_trait::async_trait;
use limitspread_core::{
    GroupVersionKind, LimitSpreadError, OwnerReference, Pod, ReplicaSet, Resource, ResourceKey,
};
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Controlling owner of a pod
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerRef {
    pub gvk: GroupVersionKind,
    pub name: String,
}

/// Return the owner reference marked as controller, if any
pub fn controller_of(pod: &Pod) -> Option<&OwnerReference> {
    pod.metadata
        .owner_references
        .as_ref()?
        .iter()
        .find(|r| r.controller == Some(true))
}

/// Resolve the controlling owner of a pod into a typed reference
pub fn resolve_controller(pod: &Pod) -> Result<ControllerRef> {
    let owner =
        controller_of(pod).ok_or_else(|| SchedulerError::owner_not_found(pod.display_name()))?;

    let gvk = GroupVersionKind::parse(&owner.api_version, &owner.kind).map_err(|e| {
        SchedulerError::invalid_owner(pod.display_name(), format!("bad group version: {}", e))
    })?;

    Ok(ControllerRef {
        gvk,
        name: owner.name.clone(),
    })
}

/// Client for the objects that own scheduled pods
#[async_trait]
pub trait OwnerClient: Send + Sync {
    /// Fetch a ReplicaSet
    async fn get_replica_set(&self, namespace: &str, name: &str) -> Result<ReplicaSet>;

    /// Apply a JSON merge patch (RFC 7386) to a ReplicaSet
    async fn patch_replica_set(
        &self,
        namespace: &str,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<()>;
}

fn replica_set_key(namespace: &str, name: &str) -> ResourceKey {
    ResourceKey::new(GroupVersionKind::replica_set(), namespace, name)
}

/// In-memory owner store
///
/// Applies merge patches the way the API server does, without any
/// resourceVersion check.
#[derive(Clone, Default)]
pub struct InMemoryOwnerClient {
    objects: Arc<RwLock<HashMap<String, ReplicaSet>>>,
}

impl InMemoryOwnerClient {
    pub fn new(replica_sets: impl IntoIterator<Item = ReplicaSet>) -> Self {
        let objects = replica_sets
            .into_iter()
            .map(|rs| (replica_set_key(rs.namespace(), rs.name()).storage_key(), rs))
            .collect();
        Self {
            objects: Arc::new(RwLock::new(objects)),
        }
    }

    /// Insert or replace a ReplicaSet
    pub async fn insert(&self, rs: ReplicaSet) {
        let key = replica_set_key(rs.namespace(), rs.name()).storage_key();
        self.objects.write().await.insert(key, rs);
    }

    /// All stored ReplicaSets, ordered by key
    pub async fn replica_sets(&self) -> Vec<ReplicaSet> {
        let objects = self.objects.read().await;
        let mut keys: Vec<&String> = objects.keys().collect();
        keys.sort();
        keys.into_iter().map(|k| objects[k].clone()).collect()
    }
}

#[async_trait]
impl OwnerClient for InMemoryOwnerClient {
    async fn get_replica_set(&self, namespace: &str, name: &str) -> Result<ReplicaSet> {
        let key = replica_set_key(namespace, name);
        self.objects
            .read()
            .await
            .get(&key.storage_key())
            .cloned()
            .ok_or_else(|| LimitSpreadError::resource_not_found(key.to_string()).into())
    }

    async fn patch_replica_set(
        &self,
        namespace: &str,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<()> {
        let key = replica_set_key(namespace, name);
        let mut objects = self.objects.write().await;
        let rs = objects
            .get_mut(&key.storage_key())
            .ok_or_else(|| LimitSpreadError::resource_not_found(key.to_string()))?;

        let mut rs_json = serde_json::to_value(&*rs).map_err(|e| {
            SchedulerError::internal_error(format!("Failed to serialize replicaset: {}", e))
        })?;
        json_patch::merge(&mut rs_json, patch);

        *rs = serde_json::from_value(rs_json).map_err(|e| {
            SchedulerError::owner_client(format!("patch produced invalid replicaset: {}", e))
        })?;

        debug!("Patched {}", key);
        Ok(())
    }
}

/// Owner client backed by the Kubernetes REST API
pub struct ApiOwnerClient {
    base_url: String,
    token: Option<String>,
    client: Client,
}

impl ApiOwnerClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            client: Client::new(),
        }
    }

    /// Authenticate requests with a bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn url(&self, namespace: &str, name: &str) -> String {
        format!("{}{}", self.base_url, replica_set_key(namespace, name).api_path())
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

#[async_trait]
impl OwnerClient for ApiOwnerClient {
    /// GET /apis/apps/v1/namespaces/{namespace}/replicasets/{name}
    async fn get_replica_set(&self, namespace: &str, name: &str) -> Result<ReplicaSet> {
        let url = self.url(namespace, name);
        debug!("GET {}", url);

        let resp = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| SchedulerError::owner_client(format!("HTTP request failed: {}", e)))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(LimitSpreadError::resource_not_found(
                replica_set_key(namespace, name).to_string(),
            )
            .into());
        }

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(SchedulerError::owner_client(format!(
                "GET replicaset failed with status {}: {}",
                status, body
            )));
        }

        resp.json::<ReplicaSet>().await.map_err(|e| {
            SchedulerError::owner_client(format!("Failed to parse replicaset: {}", e))
        })
    }

    /// PATCH /apis/apps/v1/namespaces/{namespace}/replicasets/{name}
    async fn patch_replica_set(
        &self,
        namespace: &str,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<()> {
        let url = self.url(namespace, name);
        debug!("PATCH {}", url);

        let body = serde_json::to_vec(patch).map_err(|e| {
            SchedulerError::internal_error(format!("Failed to serialize patch: {}", e))
        })?;

        let resp = self
            .authorize(self.client.patch(&url))
            .header(reqwest::header::CONTENT_TYPE, "application/merge-patch+json")
            .body(body)
            .send()
            .await
            .map_err(|e| SchedulerError::owner_client(format!("HTTP request failed: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(SchedulerError::owner_client(format!(
                "PATCH replicaset failed with status {}: {}",
                status, body
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn owner_ref(api_version: &str, kind: &str, name: &str, controller: bool) -> OwnerReference {
        OwnerReference {
            api_version: api_version.to_string(),
            kind: kind.to_string(),
            name: name.to_string(),
            uid: format!("uid-{}", name),
            controller: Some(controller),
            ..Default::default()
        }
    }

    fn pod_with_owners(owners: Vec<OwnerReference>) -> Pod {
        let mut pod = Pod::default();
        pod.metadata.name = Some("web-abc".to_string());
        pod.metadata.namespace = Some("default".to_string());
        pod.metadata.owner_references = Some(owners);
        pod
    }

    fn replica_set(namespace: &str, name: &str) -> ReplicaSet {
        let mut rs = ReplicaSet::default();
        rs.metadata.name = Some(name.to_string());
        rs.metadata.namespace = Some(namespace.to_string());
        rs
    }

    #[test]
    fn test_resolve_controller() {
        let pod = pod_with_owners(vec![
            owner_ref("v1", "ConfigMap", "not-controller", false),
            owner_ref("apps/v1", "ReplicaSet", "web", true),
        ]);

        let controller = resolve_controller(&pod).unwrap();
        assert_eq!(controller.gvk, GroupVersionKind::replica_set());
        assert_eq!(controller.name, "web");
    }

    #[test]
    fn test_resolve_controller_missing() {
        let pod = pod_with_owners(vec![owner_ref("apps/v1", "ReplicaSet", "web", false)]);
        assert!(matches!(
            resolve_controller(&pod),
            Err(SchedulerError::OwnerNotFound { .. })
        ));

        assert!(matches!(
            resolve_controller(&Pod::default()),
            Err(SchedulerError::OwnerNotFound { .. })
        ));
    }

    #[test]
    fn test_resolve_controller_bad_group_version() {
        let pod = pod_with_owners(vec![owner_ref("apps/v1/x", "ReplicaSet", "web", true)]);
        assert!(matches!(
            resolve_controller(&pod),
            Err(SchedulerError::InvalidOwner { .. })
        ));
    }

    #[tokio::test]
    async fn test_in_memory_merge_patch() {
        let mut rs = replica_set("default", "web");
        rs.metadata.annotations = Some(BTreeMap::from([(
            "keep".to_string(),
            "me".to_string(),
        )]));
        let client = InMemoryOwnerClient::new(vec![rs]);

        let patch = serde_json::json!({
            "metadata": {"annotations": {"added": "value"}}
        });
        client
            .patch_replica_set("default", "web", &patch)
            .await
            .unwrap();

        let rs = client.get_replica_set("default", "web").await.unwrap();
        let annotations = rs.metadata.annotations.unwrap();
        assert_eq!(annotations.get("keep").map(String::as_str), Some("me"));
        assert_eq!(annotations.get("added").map(String::as_str), Some("value"));
    }

    #[tokio::test]
    async fn test_in_memory_missing_object() {
        let client = InMemoryOwnerClient::default();
        assert!(client.get_replica_set("default", "web").await.is_err());

        let patch = serde_json::json!({});
        assert!(client
            .patch_replica_set("default", "web", &patch)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_in_memory_listing_is_sorted() {
        let client = InMemoryOwnerClient::new(vec![replica_set("b", "web"), replica_set("a", "web")]);
        client.insert(replica_set("a", "api")).await;

        let names: Vec<String> = client
            .replica_sets()
            .await
            .iter()
            .map(|rs| rs.display_name())
            .collect();
        assert_eq!(names, vec!["a/api", "a/web", "b/web"]);
    }

    #[test]
    fn test_api_client_url() {
        let client = ApiOwnerClient::new("https://127.0.0.1:6443/");
        assert_eq!(
            client.url("default", "web"),
            "https://127.0.0.1:6443/apis/apps/v1/namespaces/default/replicasets/web"
        );
    }
}
