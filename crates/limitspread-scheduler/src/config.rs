use crate::{Result, SchedulerError};
use limitspread_core::{Pod, Resource};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, error};

/// Well-known location of the spread priority configuration
pub const DEFAULT_CONFIG_PATH: &str = "/etc/kubernetes/sppriority.yaml";

/// Default annotation that opts a pod out of spread scoring
pub const DEFAULT_DISABLE_ANN_KEY: &str = "annotation.sp.io/disable-priority-scheduler";

/// Default annotation holding the schedule state on the owner
pub const DEFAULT_STATE_ANN_KEY: &str = "annotation.sp.io/schedule-state";

/// Configuration of the spread priority plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct PriorityConfig {
    /// Skip recording placements of pods whose owner wants more than one replica
    pub skip_multi_replica: bool,
    /// Namespaces exempt from spread scoring
    pub namespace_white_list: BTreeSet<String>,
    /// Pod annotation that exempts a pod from spread scoring
    pub disable_ann_key: String,
    /// Owner annotation holding the schedule state
    pub state_ann_key: String,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            skip_multi_replica: false,
            namespace_white_list: BTreeSet::from(["kube-system".to_string()]),
            disable_ann_key: DEFAULT_DISABLE_ANN_KEY.to_string(),
            state_ann_key: DEFAULT_STATE_ANN_KEY.to_string(),
        }
    }
}

impl PriorityConfig {
    /// Load from the default path
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Config {} not found, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                error!("Failed to read config file {}: {}", path.display(), e);
                return Err(SchedulerError::config(path.display().to_string(), e.to_string()));
            }
        };

        Self::from_yaml_str(&data).map_err(|e| {
            error!("Failed to parse config file {}: {}", path.display(), e);
            SchedulerError::config(path.display().to_string(), e.to_string())
        })
    }

    /// Parse a YAML document. Unknown keys are rejected.
    pub fn from_yaml_str(data: &str) -> std::result::Result<Self, serde_yaml::Error> {
        // An empty document means "all defaults"
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(data)
    }

    /// Whether `pod` is exempt from spread scoring and state tracking
    pub fn disable(&self, pod: &Pod) -> bool {
        if self.namespace_white_list.contains(pod.namespace()) {
            return true;
        }
        pod.annotation(&self.disable_ann_key).is_some()
    }
}
