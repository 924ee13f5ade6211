use crate::plugin::{FrameworkHandle, ScorePlugin};
use crate::snapshot::{NodeInfo, NodeInfoLister};
use crate::types::{ResourceWeights, MAX_NODE_SCORE, MIN_NODE_SCORE};
use crate::{Result, SchedulerError};
use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use limitspread_core::{Pod, Resource, ResourceName, ResourceQuantities};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

pub const FIT_LIMIT_RESOURCES: &str = "FitLimitResources";

/// Sum the quantities of the tracked resources in a resource map.
/// Missing or unparseable entries count as zero.
pub fn sum_resource_map(resources: &BTreeMap<String, Quantity>) -> ResourceQuantities {
    let mut total = ResourceQuantities::default();
    for resource in [ResourceName::Cpu, ResourceName::Memory] {
        let Some(quantity) = resources.get(resource.as_str()) else {
            continue;
        };
        match resource.parse(&quantity.0) {
            Ok(value) => *total.get_mut(resource) += value,
            Err(e) => warn!("Ignoring {}: {}", resource, e),
        }
    }
    total
}

/// Sum of the container limits of a pod
///
/// Only regular containers count. Init containers and runtime overhead are
/// ignored, and a container without a limit contributes zero.
pub fn pod_limits(pod: &Pod) -> ResourceQuantities {
    let mut total = ResourceQuantities::default();
    let Some(spec) = &pod.spec else {
        return total;
    };

    for container in &spec.containers {
        if let Some(limits) = container.resources.as_ref().and_then(|r| r.limits.as_ref()) {
            total += sum_resource_map(limits);
        }
    }
    total
}

/// Limit totals of the pods already on a node and of the incoming pod
pub fn calculate_node_resource_limit(
    node_info: &NodeInfo,
    pod: &Pod,
) -> (ResourceQuantities, ResourceQuantities) {
    let mut node_limit = ResourceQuantities::default();
    for existing in &node_info.pods {
        node_limit += pod_limits(existing);
    }

    let pod_limit = pod_limits(pod);

    debug!(
        "Limit totals: node cpu={}m memory={} / pod {} cpu={}m memory={}",
        node_limit.cpu_millicores,
        node_limit.memory_bytes,
        pod.display_name(),
        pod_limit.cpu_millicores,
        pod_limit.memory_bytes
    );

    (node_limit, pod_limit)
}

/// Score for the headroom left on one resource after placing the pod
pub fn least_requested_score(limited: i64, capacity: i64) -> i64 {
    if capacity == 0 {
        return 0;
    }
    if limited > capacity {
        return 0;
    }

    let score = (i128::from(capacity) - i128::from(limited)) * i128::from(MAX_NODE_SCORE)
        / i128::from(capacity);
    score.clamp(i128::from(MIN_NODE_SCORE), i128::from(MAX_NODE_SCORE)) as i64
}

/// Weighted average of the per-resource headroom scores
pub fn weighted_score(
    weights: &ResourceWeights,
    limit: &ResourceQuantities,
    capacity: &ResourceQuantities,
) -> i64 {
    let weight_sum = weights.total();
    if weight_sum == 0 {
        return 0;
    }

    let node_score: i128 = weights
        .iter()
        .map(|(resource, weight)| {
            i128::from(least_requested_score(limit.get(resource), capacity.get(resource)))
                * i128::from(weight)
        })
        .sum();

    (node_score / weight_sum) as i64
}

/// Prefers nodes whose summed container limits leave the most room
pub struct FitLimitResources {
    lister: Arc<dyn NodeInfoLister>,
    weights: ResourceWeights,
}

impl FitLimitResources {
    pub fn new(handle: &FrameworkHandle, weights: ResourceWeights) -> Result<Self> {
        Ok(Self {
            lister: handle.snapshot_lister()?,
            weights,
        })
    }

    fn allocatable(node_info: &NodeInfo, node_name: &str) -> Result<ResourceQuantities> {
        let node = node_info
            .node
            .as_ref()
            .ok_or_else(|| SchedulerError::node_object_missing(node_name))?;

        let allocatable = node
            .status
            .as_ref()
            .and_then(|s| s.allocatable.as_ref())
            .ok_or_else(|| SchedulerError::missing_allocatable(node_name))?;

        Ok(sum_resource_map(allocatable))
    }
}

#[async_trait]
impl ScorePlugin for FitLimitResources {
    fn name(&self) -> &str {
        FIT_LIMIT_RESOURCES
    }

    fn score(&self, pod: &Pod, node_name: &str) -> Result<i64> {
        let node_info = self.lister.get(node_name)?;
        let capacity = Self::allocatable(&node_info, node_name)?;

        let (node_limit, pod_limit) = calculate_node_resource_limit(&node_info, pod);
        let mut projected = node_limit;
        projected += pod_limit;

        let score = weighted_score(&self.weights, &projected, &capacity);
        debug!(
            "Node {} fit score for pod {}: {} (cpu {}/{}m, memory {}/{})",
            node_name,
            pod.display_name(),
            score,
            projected.cpu_millicores,
            capacity.cpu_millicores,
            projected.memory_bytes,
            capacity.memory_bytes
        );

        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Snapshot;
    use k8s_openapi::api::core::v1::{Container, Node, ResourceRequirements};

    fn quantities(cpu: &str, memory: &str) -> BTreeMap<String, Quantity> {
        BTreeMap::from([
            ("cpu".to_string(), Quantity(cpu.to_string())),
            ("memory".to_string(), Quantity(memory.to_string())),
        ])
    }

    fn create_test_node(name: &str, cpu: &str, memory: &str) -> Node {
        let mut node = Node::default();
        node.metadata.name = Some(name.to_string());
        node.status = Some(Default::default());
        node.status.as_mut().unwrap().allocatable = Some(quantities(cpu, memory));
        node
    }

    fn container(limits: Option<(&str, &str)>) -> Container {
        Container {
            name: "app".to_string(),
            resources: Some(ResourceRequirements {
                limits: limits.map(|(cpu, memory)| quantities(cpu, memory)),
                requests: Some(quantities("10", "10Gi")),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn create_test_pod(name: &str, node_name: Option<&str>, containers: Vec<Container>) -> Pod {
        let mut pod = Pod::default();
        pod.metadata.name = Some(name.to_string());
        pod.metadata.namespace = Some("default".to_string());
        pod.spec = Some(Default::default());
        pod.spec.as_mut().unwrap().node_name = node_name.map(str::to_string);
        pod.spec.as_mut().unwrap().containers = containers;
        pod
    }

    fn plugin(snapshot: Snapshot) -> FitLimitResources {
        let handle = FrameworkHandle::new().with_snapshot(Arc::new(snapshot));
        FitLimitResources::new(&handle, ResourceWeights::default()).unwrap()
    }

    #[test]
    fn test_least_requested_score() {
        assert_eq!(least_requested_score(0, 1000), MAX_NODE_SCORE);
        assert_eq!(least_requested_score(500, 1000), 50);
        assert_eq!(least_requested_score(999, 1000), 0);
        assert_eq!(least_requested_score(1000, 1000), 0);
        assert_eq!(least_requested_score(1001, 1000), 0);
        assert_eq!(least_requested_score(0, 0), 0);
    }

    #[test]
    fn test_least_requested_score_large_capacity() {
        let one_ei = 1_i64 << 60;
        assert_eq!(least_requested_score(0, one_ei), MAX_NODE_SCORE);
        assert_eq!(least_requested_score(one_ei / 2, one_ei), 50);
        assert_eq!(least_requested_score(0, i64::MAX), MAX_NODE_SCORE);
        assert_eq!(least_requested_score(i64::MAX, i64::MAX), 0);
    }

    #[test]
    fn test_least_requested_score_non_increasing() {
        let capacity = 4096;
        let mut previous = least_requested_score(0, capacity);
        for projected in 1..=capacity {
            let score = least_requested_score(projected, capacity);
            assert!(score <= previous);
            previous = score;
        }
    }

    #[test]
    fn test_weighted_score_is_average_with_equal_weights() {
        let capacity = ResourceQuantities::new(1000, 1000);
        let limit = ResourceQuantities::new(500, 250);
        assert_eq!(
            weighted_score(&ResourceWeights::default(), &limit, &capacity),
            (50 + 75) / 2
        );
    }

    #[test]
    fn test_weighted_score_respects_weights() {
        let capacity = ResourceQuantities::new(1000, 1000);
        let limit = ResourceQuantities::new(0, 1000);
        let weights = ResourceWeights::new([(ResourceName::Cpu, 3), (ResourceName::Memory, 1)]);
        assert_eq!(weighted_score(&weights, &limit, &capacity), 75);
        assert_eq!(
            weighted_score(&ResourceWeights::new([]), &limit, &capacity),
            0
        );
    }

    #[test]
    fn test_aggregation_ignores_init_containers_and_requests() {
        let mut pod = create_test_pod(
            "web",
            None,
            vec![container(Some(("200m", "1Gi"))), container(None)],
        );
        pod.spec.as_mut().unwrap().init_containers = Some(vec![container(Some(("4", "8Gi")))]);

        let limits = pod_limits(&pod);
        assert_eq!(limits, ResourceQuantities::new(200, 1 << 30));
    }

    #[test]
    fn test_aggregation_empty_containers() {
        let pod = create_test_pod("empty", None, vec![]);
        let info = NodeInfo::default();
        let (node, pod) = calculate_node_resource_limit(&info, &pod);
        assert_eq!(node, ResourceQuantities::default());
        assert_eq!(pod, ResourceQuantities::default());
    }

    #[test]
    fn test_aggregation_splits_node_and_pod() {
        let node = create_test_node("node1", "1", "4Gi");
        let existing = create_test_pod(
            "existing",
            Some("node1"),
            vec![container(Some(("100m", "1Gi"))), container(Some(("200m", "0")))],
        );
        let snapshot = Snapshot::new(vec![node], vec![existing]);
        let info = snapshot.get("node1").unwrap();

        let pod = create_test_pod("new", None, vec![container(Some(("200m", "512Mi")))]);
        let (node_limit, pod_limit) = calculate_node_resource_limit(&info, &pod);
        assert_eq!(node_limit, ResourceQuantities::new(300, 1 << 30));
        assert_eq!(pod_limit, ResourceQuantities::new(200, 512 << 20));
    }

    #[test]
    fn test_unparseable_limit_counts_as_zero() {
        let pod = create_test_pod("web", None, vec![container(Some(("lots", "1Ki")))]);
        assert_eq!(pod_limits(&pod), ResourceQuantities::new(0, 1024));
    }

    #[test]
    fn test_score_cpu_scenario() {
        // 1000m capacity, 300m already limited on the node, 200m incoming
        let node = create_test_node("node1", "1000m", "1000");
        let existing = create_test_pod("existing", Some("node1"), vec![container(Some(("300m", "0")))]);
        let fit = plugin(Snapshot::new(vec![node], vec![existing]));

        let pod = create_test_pod("new", None, vec![container(Some(("200m", "0")))]);
        // cpu: (1000-500)*100/1000 = 50, memory: 100
        assert_eq!(fit.score(&pod, "node1").unwrap(), (50 + 100) / 2);
    }

    #[test]
    fn test_score_prefers_emptier_node() {
        let busy = create_test_node("busy", "4", "8Gi");
        let idle = create_test_node("idle", "4", "8Gi");
        let existing = create_test_pod("existing", Some("busy"), vec![container(Some(("2", "4Gi")))]);
        let fit = plugin(Snapshot::new(vec![busy, idle], vec![existing]));

        let pod = create_test_pod("new", None, vec![container(Some(("1", "1Gi")))]);
        let busy_score = fit.score(&pod, "busy").unwrap();
        let idle_score = fit.score(&pod, "idle").unwrap();
        assert!(idle_score > busy_score);
    }

    #[test]
    fn test_score_over_limit_is_zero() {
        let node = create_test_node("node1", "1", "1Gi");
        let fit = plugin(Snapshot::new(vec![node], vec![]));

        let pod = create_test_pod("big", None, vec![container(Some(("2", "2Gi")))]);
        assert_eq!(fit.score(&pod, "node1").unwrap(), 0);
    }

    #[test]
    fn test_score_huge_limits_do_not_wrap() {
        let node = create_test_node("node1", "4", "7Ei");
        let existing = create_test_pod("existing", Some("node1"), vec![container(Some(("0", "4Ei")))]);
        let fit = plugin(Snapshot::new(vec![node], vec![existing]));

        let pod = create_test_pod(
            "new",
            None,
            vec![container(Some(("0", "4Ei"))), container(Some(("0", "4Ei")))],
        );
        assert_eq!(pod_limits(&pod).memory_bytes, i64::MAX);
        // cpu: 100, memory saturates past capacity: 0
        assert_eq!(fit.score(&pod, "node1").unwrap(), 50);
    }

    #[test]
    fn test_score_huge_capacity() {
        let node = create_test_node("node1", "4", "1Ei");
        let fit = plugin(Snapshot::new(vec![node], vec![]));

        let pod = create_test_pod("new", None, vec![container(Some(("2", "512Pi")))]);
        assert_eq!(fit.score(&pod, "node1").unwrap(), 50);

        let empty = create_test_pod("empty", None, vec![]);
        assert_eq!(fit.score(&empty, "node1").unwrap(), MAX_NODE_SCORE);
    }

    #[test]
    fn test_weighted_score_huge_weights() {
        let capacity = ResourceQuantities::new(1000, 1000);
        let limit = ResourceQuantities::new(0, 0);
        let weights = ResourceWeights::new([
            (ResourceName::Cpu, i64::MAX),
            (ResourceName::Memory, i64::MAX),
        ]);
        assert_eq!(weighted_score(&weights, &limit, &capacity), MAX_NODE_SCORE);
    }

    #[test]
    fn test_score_zero_capacity_dimension() {
        let node = create_test_node("node1", "0", "1000");
        let fit = plugin(Snapshot::new(vec![node], vec![]));

        let pod = create_test_pod("new", None, vec![]);
        assert_eq!(fit.score(&pod, "node1").unwrap(), (0 + 100) / 2);
    }

    #[test]
    fn test_score_errors() {
        let mut bare = Node::default();
        bare.metadata.name = Some("bare".to_string());
        let orphan = create_test_pod("orphan", Some("gone"), vec![]);
        let fit = plugin(Snapshot::new(vec![bare], vec![orphan]));
        let pod = create_test_pod("new", None, vec![]);

        assert!(matches!(
            fit.score(&pod, "ghost"),
            Err(SchedulerError::NodeNotFound { .. })
        ));
        assert!(matches!(
            fit.score(&pod, "gone"),
            Err(SchedulerError::NodeObjectMissing { .. })
        ));
        assert!(matches!(
            fit.score(&pod, "bare"),
            Err(SchedulerError::MissingAllocatable { .. })
        ));
    }

    #[test]
    fn test_requires_snapshot() {
        let handle = FrameworkHandle::new();
        assert!(matches!(
            FitLimitResources::new(&handle, ResourceWeights::default()),
            Err(SchedulerError::MissingCapability { .. })
        ));
    }
}
