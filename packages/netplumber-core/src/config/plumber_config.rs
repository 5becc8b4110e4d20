//! Engine configuration
//!
//! All fields have serde defaults, so a partial YAML override is enough.

use super::error::{ConfigError, ConfigResult};
use super::io::ConfigFileV1;
use super::preset::Preset;
use super::validation::Validatable;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// Loop detection
// ============================================================================

/// How flows are compared when looking for forwarding loops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LoopDetection {
    /// A flow loops when it re-enters the same rule
    Rule,
    /// A flow loops when it re-enters any rule of the same table
    #[default]
    Table,
}

impl LoopDetection {
    /// Mask applied to node ids before comparing them
    pub fn key_mask(self) -> u64 {
        match self {
            LoopDetection::Rule => u64::MAX,
            LoopDetection::Table => 0xffff_ffff_0000_0000,
        }
    }
}

// ============================================================================
// Anomaly checks
// ============================================================================

/// Classes reported by `check_anomalies`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct AnomalyConfig {
    /// Rules fully covered by higher-priority rules
    pub shadow: bool,
    /// Rules after a universal higher-priority aggregate
    pub reach: bool,
    /// Rules covered by the union of lower-priority rules
    pub generalization: bool,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            shadow: true,
            reach: true,
            generalization: false,
        }
    }
}

// ============================================================================
// PlumberConfig
// ============================================================================

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct PlumberConfig {
    pub loop_detection: LoopDetection,

    /// Report shadowed/unreachable rules as they are inserted
    #[serde(default = "default_true")]
    pub check_shadow: bool,

    /// Report partial drops between a flow and a pipe
    pub check_blackholes: bool,

    pub anomalies: AnomalyConfig,

    /// Maximum flow recursion depth (1..=100000)
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Maximum node visits per mutation (0 = unlimited)
    #[serde(default = "default_max_visits")]
    pub max_visits: usize,

    /// Wall-clock limit per mutation in milliseconds (0 = unlimited)
    pub timeout_ms: u64,
}

fn default_true() -> bool {
    true
}
fn default_max_depth() -> usize {
    512
}
fn default_max_visits() -> usize {
    1_000_000
}

const MAX_DEPTH_LIMIT: usize = 100_000;

impl Default for PlumberConfig {
    fn default() -> Self {
        Self::from_preset(Preset::Balanced)
    }
}

impl PlumberConfig {
    pub fn from_preset(preset: Preset) -> Self {
        match preset {
            Preset::Fast => Self {
                loop_detection: LoopDetection::Table,
                check_shadow: false,
                check_blackholes: false,
                anomalies: AnomalyConfig {
                    shadow: true,
                    reach: true,
                    generalization: false,
                },
                max_depth: 256,
                max_visits: 250_000,
                timeout_ms: 0,
            },
            Preset::Balanced | Preset::Custom => Self {
                loop_detection: LoopDetection::Table,
                check_shadow: true,
                check_blackholes: false,
                anomalies: AnomalyConfig::default(),
                max_depth: default_max_depth(),
                max_visits: default_max_visits(),
                timeout_ms: 0,
            },
            Preset::Thorough => Self {
                loop_detection: LoopDetection::Rule,
                check_shadow: true,
                check_blackholes: true,
                anomalies: AnomalyConfig {
                    shadow: true,
                    reach: true,
                    generalization: true,
                },
                max_depth: 4096,
                max_visits: 0,
                timeout_ms: 0,
            },
        }
    }

    /// Preset whose values this configuration carries, or `Custom`
    pub fn preset(&self) -> Preset {
        [Preset::Fast, Preset::Balanced, Preset::Thorough]
            .into_iter()
            .find(|p| Self::from_preset(*p) == *self)
            .unwrap_or(Preset::Custom)
    }

    pub fn loop_detection(mut self, mode: LoopDetection) -> Self {
        self.loop_detection = mode;
        self
    }

    pub fn check_shadow(mut self, on: bool) -> Self {
        self.check_shadow = on;
        self
    }

    pub fn check_blackholes(mut self, on: bool) -> Self {
        self.check_blackholes = on;
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn max_visits(mut self, visits: usize) -> Self {
        self.max_visits = visits;
        self
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    /// Parse and validate a versioned YAML document
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let raw: serde_yaml::Value = serde_yaml::from_str(content)?;
        if raw.get("version").is_none() {
            return Err(ConfigError::MissingVersion);
        }
        let file: ConfigFileV1 = serde_yaml::from_value(raw)?;

        if file.version != 1 {
            return Err(ConfigError::UnsupportedVersion {
                found: file.version,
                supported: vec![1],
            });
        }

        let preset = Preset::from_str(&file.preset)
            .map_err(|_| ConfigError::UnknownPreset(file.preset.clone()))?;

        let mut merged = serde_yaml::to_value(Self::from_preset(preset))?;
        if let Some(overrides) = file.overrides {
            overlay(&mut merged, overrides);
        }
        let config: Self = serde_yaml::from_value(merged)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file
    pub fn from_yaml(path: &str) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        let preset = self.preset();
        let file = ConfigFileV1 {
            version: 1,
            preset: preset.to_string(),
            overrides: match preset {
                Preset::Custom => Some(serde_yaml::to_value(self)?),
                _ => None,
            },
        };
        serde_yaml::to_string(&file).map_err(ConfigError::Yaml)
    }
}

/// Recursively copy `over` onto `base`, mapping by mapping
fn overlay(base: &mut serde_yaml::Value, over: serde_yaml::Value) {
    match (base, over) {
        (serde_yaml::Value::Mapping(base), serde_yaml::Value::Mapping(over)) => {
            for (key, value) in over {
                match base.get_mut(&key) {
                    Some(slot) => overlay(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

impl Validatable for PlumberConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.max_depth == 0 || self.max_depth > MAX_DEPTH_LIMIT {
            return Err(ConfigError::range_with_hint(
                "max_depth",
                self.max_depth,
                1,
                MAX_DEPTH_LIMIT,
                "Flow chains need at least one hop; very deep limits risk stack exhaustion",
            ));
        }
        Ok(())
    }

    fn config_name(&self) -> &'static str {
        "PlumberConfig"
    }
}
