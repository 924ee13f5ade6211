use limitspread_core::ResourceName;
use serde::{Deserialize, Serialize};

/// Lowest score a plugin may give a node
pub const MIN_NODE_SCORE: i64 = 0;

/// Highest score a plugin may give a node
pub const MAX_NODE_SCORE: i64 = 100;

/// Score of a single node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeScore {
    /// Node name
    pub name: String,
    /// Score (higher is better)
    pub score: i64,
}

impl NodeScore {
    /// Create a new node score
    pub fn new(name: impl Into<String>, score: i64) -> Self {
        Self {
            name: name.into(),
            score,
        }
    }
}

/// Scores of all feasible nodes for one pod
pub type NodeScoreList = Vec<NodeScore>;

/// Per-resource weights used by the fit score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceWeights(Vec<(ResourceName, i64)>);

impl ResourceWeights {
    /// Build a weight table. Duplicate resources keep the last weight and
    /// non-positive weights drop the resource from the table.
    pub fn new(weights: impl IntoIterator<Item = (ResourceName, i64)>) -> Self {
        let mut table: Vec<(ResourceName, i64)> = Vec::new();
        for (resource, weight) in weights {
            match table.iter_mut().find(|(r, _)| *r == resource) {
                Some(entry) => entry.1 = weight,
                None => table.push((resource, weight)),
            }
        }
        table.retain(|(_, w)| *w > 0);
        Self(table)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResourceName, i64)> + '_ {
        self.0.iter().copied()
    }

    /// Sum of all weights, widened so large weights cannot overflow
    pub fn total(&self) -> i128 {
        self.0.iter().map(|(_, w)| i128::from(*w)).sum()
    }
}

impl Default for ResourceWeights {
    fn default() -> Self {
        Self::new([(ResourceName::Cpu, 1), (ResourceName::Memory, 1)])
    }
}
