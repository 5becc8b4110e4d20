//! Configuration file schema
//!
//! Loading and saving live on `PlumberConfig` in plumber_config.rs.

use serde::{Deserialize, Serialize};

/// YAML Schema v1
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileV1 {
    /// Schema version (always 1 for v1)
    pub version: u32,

    /// Base preset
    pub preset: String,

    /// Field overrides applied on top of the preset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overrides: Option<serde_yaml::Value>,
}
