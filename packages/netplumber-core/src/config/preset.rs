//! Preset configurations
//!
//! Presets trade checking depth against propagation cost.

use serde::{Deserialize, Serialize};

/// Configuration preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Large networks, bulk loading
    ///
    /// - No shadow or blackhole reports
    /// - max_depth=256, max_visits=250k
    Fast,

    /// Interactive use
    ///
    /// - Shadow/unreachable reports on rule insert
    /// - max_depth=512, max_visits=1M
    #[default]
    Balanced,

    /// Audits
    ///
    /// - Shadow, blackhole and every anomaly class
    /// - max_depth=4096, unlimited visits
    Thorough,

    /// User-defined (YAML only); starts from balanced defaults
    Custom,
}

impl Preset {
    /// Parse preset from string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "balanced" => Ok(Self::Balanced),
            "thorough" => Ok(Self::Thorough),
            "custom" => Ok(Self::Custom),
            _ => Err(format!(
                "Unknown preset '{}'. Valid presets: fast, balanced, thorough, custom",
                s
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Balanced => "balanced",
            Self::Thorough => "thorough",
            Self::Custom => "custom",
        }
    }
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
