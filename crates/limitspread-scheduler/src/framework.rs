use crate::plugin::ScorePlugin;
use crate::types::{NodeScore, NodeScoreList};
use crate::{Result, SchedulerError};
use limitspread_core::{Pod, Resource};
use std::sync::Arc;
use tracing::{debug, info};

/// A plugin together with the weight of its scores
#[derive(Clone)]
pub struct WeightedPlugin {
    pub plugin: Arc<dyn ScorePlugin>,
    pub weight: i64,
}

/// Drives score plugins through one scheduling cycle
#[derive(Clone, Default)]
pub struct Framework {
    plugins: Vec<WeightedPlugin>,
}

impl Framework {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin
    pub fn with_plugin(mut self, plugin: Arc<dyn ScorePlugin>, weight: i64) -> Self {
        self.plugins.push(WeightedPlugin { plugin, weight });
        self
    }

    /// Score every node with every plugin and combine the weighted results
    ///
    /// A score error from any plugin fails the cycle for this pod.
    pub async fn score_nodes(&self, pod: &Pod, node_names: &[String]) -> Result<NodeScoreList> {
        let mut totals: NodeScoreList = node_names
            .iter()
            .map(|name| NodeScore::new(name.clone(), 0))
            .collect();

        for weighted in &self.plugins {
            let plugin = &weighted.plugin;

            let mut scores = NodeScoreList::with_capacity(node_names.len());
            for node_name in node_names {
                let score = plugin.score(pod, node_name)?;
                scores.push(NodeScore::new(node_name.clone(), score));
            }

            plugin.normalize_score(pod, &mut scores).await?;

            for (total, score) in totals.iter_mut().zip(&scores) {
                debug!(
                    "Node {} scored {} by {} (weight {})",
                    score.name,
                    score.score,
                    plugin.name(),
                    weighted.weight
                );
                total.score += score.score * weighted.weight;
            }
        }

        Ok(totals)
    }

    /// Pick the node with the highest total. Ties go to the earliest node.
    pub fn select_host(&self, pod: &Pod, scores: &NodeScoreList) -> Result<NodeScore> {
        let mut best: Option<&NodeScore> = None;
        for score in scores {
            if best.map_or(true, |b| score.score > b.score) {
                best = Some(score);
            }
        }

        best.cloned().ok_or_else(|| {
            SchedulerError::internal_error(format!("No nodes scored for pod {}", pod.display_name()))
        })
    }

    /// Let every plugin observe a committed binding
    pub async fn run_post_bind(&self, pod: &Pod, node_name: &str) {
        for weighted in &self.plugins {
            weighted.plugin.post_bind(pod, node_name).await;
        }
    }

    /// Score, select and return the chosen node with all node totals
    pub async fn schedule(&self, pod: &Pod, node_names: &[String]) -> Result<(NodeScore, NodeScoreList)> {
        let scores = self.score_nodes(pod, node_names).await?;
        let best = self.select_host(pod, &scores)?;

        info!(
            "Selected node {} for pod {} with score {}",
            best.name,
            pod.display_name(),
            best.score
        );

        Ok((best, scores))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scores nodes by the length of their name, then reverses the order
    struct NameLength {
        bound: AtomicUsize,
    }

    #[async_trait]
    impl ScorePlugin for NameLength {
        fn name(&self) -> &str {
            "NameLength"
        }

        fn score(&self, _pod: &Pod, node_name: &str) -> Result<i64> {
            if node_name == "bad" {
                return Err(SchedulerError::node_not_found(node_name, "test"));
            }
            Ok(node_name.len() as i64)
        }

        async fn normalize_score(&self, _pod: &Pod, scores: &mut NodeScoreList) -> Result<()> {
            for s in scores.iter_mut() {
                s.score = 10 - s.score;
            }
            Ok(())
        }

        async fn post_bind(&self, _pod: &Pod, _node_name: &str) {
            self.bound.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Constant(i64);

    #[async_trait]
    impl ScorePlugin for Constant {
        fn name(&self) -> &str {
            "Constant"
        }

        fn score(&self, _pod: &Pod, _node_name: &str) -> Result<i64> {
            Ok(self.0)
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_weighted_sum_after_normalize() {
        let framework = Framework::new()
            .with_plugin(Arc::new(NameLength { bound: AtomicUsize::new(0) }), 2)
            .with_plugin(Arc::new(Constant(5)), 1);

        let scores = framework
            .score_nodes(&Pod::default(), &names(&["n1", "node1"]))
            .await
            .unwrap();

        assert_eq!(scores[0], NodeScore::new("n1", (10 - 2) * 2 + 5));
        assert_eq!(scores[1], NodeScore::new("node1", (10 - 5) * 2 + 5));
    }

    #[tokio::test]
    async fn test_score_error_fails_cycle() {
        let framework =
            Framework::new().with_plugin(Arc::new(NameLength { bound: AtomicUsize::new(0) }), 1);
        assert!(framework
            .score_nodes(&Pod::default(), &names(&["n1", "bad"]))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_schedule_and_post_bind() {
        let plugin = Arc::new(NameLength { bound: AtomicUsize::new(0) });
        let framework = Framework::new().with_plugin(plugin.clone(), 1);
        let pod = Pod::default();

        let (best, _) = framework
            .schedule(&pod, &names(&["long-node", "n1", "n2"]))
            .await
            .unwrap();
        assert_eq!(best.name, "n1");

        framework.run_post_bind(&pod, &best.name).await;
        assert_eq!(plugin.bound.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_select_host_empty() {
        let framework = Framework::new();
        assert!(framework.select_host(&Pod::default(), &vec![]).is_err());
    }
}
