//! Engine configuration: presets, validation and YAML I/O

pub mod error;
pub mod io;
pub mod plumber_config;
pub mod preset;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use plumber_config::{AnomalyConfig, LoopDetection, PlumberConfig};
pub use preset::Preset;
pub use validation::Validatable;
