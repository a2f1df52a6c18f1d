//! Engine configuration
//!
//! Every field has a default, so a config file only needs to mention what
//! it overrides.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default pause between scheduler passes. Raise it for very large graphs.
pub const DEFAULT_UPDATE_INTERVAL_MS: u64 = 5;

/// Default cascade depth bound for [`CyclePolicy::Bounded`]
pub const DEFAULT_MAX_CASCADE_DEPTH: usize = 64;

/// Default threshold above which a single node tick is reported as slow
pub const DEFAULT_SLOW_TICK_WARN_MS: u64 = 100;

/// How the engine treats feedback topologies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CyclePolicy {
    /// Refuse any link that would let an output reach one of its own
    /// upstream inputs
    Reject,
    /// Allow feedback links, but abort a cascade that recurses deeper than
    /// `max_depth` with `EngineError::CascadeDepthExceeded`
    #[serde(rename_all = "camelCase")]
    Bounded { max_depth: usize },
}

impl Default for CyclePolicy {
    fn default() -> Self {
        CyclePolicy::Bounded {
            max_depth: DEFAULT_MAX_CASCADE_DEPTH,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Pause between scheduler passes in milliseconds
    pub update_interval_ms: u64,
    /// Feedback topology handling
    pub cycle_policy: CyclePolicy,
    /// A node tick taking longer than this is reported on the debug channel
    pub slow_tick_warn_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: DEFAULT_UPDATE_INTERVAL_MS,
            cycle_policy: CyclePolicy::default(),
            slow_tick_warn_ms: DEFAULT_SLOW_TICK_WARN_MS,
        }
    }
}

impl EngineConfig {
    /// Parse a config from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a config from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_json(&content)?;
        log::info!("Loaded engine config from {:?}", path);
        Ok(config)
    }

    /// Scheduler interval as a duration
    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }

    /// Slow tick threshold as a duration
    pub fn slow_tick_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_tick_warn_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.update_interval(), Duration::from_millis(5));
        assert_eq!(
            config.cycle_policy,
            CyclePolicy::Bounded { max_depth: 64 }
        );
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{ "updateIntervalMs": 50 }"#).unwrap();
        assert_eq!(config.update_interval_ms, 50);
        assert_eq!(config.slow_tick_warn_ms, DEFAULT_SLOW_TICK_WARN_MS);
        assert_eq!(config.cycle_policy, CyclePolicy::default());
    }

    #[test]
    fn test_cycle_policy_json() {
        let config = EngineConfig::from_json(r#"{ "cyclePolicy": { "mode": "reject" } }"#).unwrap();
        assert_eq!(config.cycle_policy, CyclePolicy::Reject);

        let config = EngineConfig::from_json(
            r#"{ "cyclePolicy": { "mode": "bounded", "maxDepth": 8 } }"#,
        )
        .unwrap();
        assert_eq!(config.cycle_policy, CyclePolicy::Bounded { max_depth: 8 });
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(&path, r#"{ "slowTickWarnMs": 7 }"#).unwrap();

        let config = EngineConfig::from_file(&path).unwrap();
        assert_eq!(config.slow_tick_warn_ms, 7);
    }

    #[test]
    fn test_from_file_missing() {
        let result = EngineConfig::from_file("/definitely/not/here.json");
        assert!(result.is_err());
    }
}
