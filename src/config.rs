//! Application configuration
//!
//! Configuration is loaded from multiple sources with the following priority (lowest to highest):
//! 1. `config/default.toml` (version controlled)
//! 2. `config/user.toml` (gitignored, user overrides)
//! 3. Environment variables (`MRN_SECTION__KEY`)

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Output surface configuration
    #[serde(default)]
    pub window: WindowConfig,
    /// Host loop configuration
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Debug configuration
    #[serde(default)]
    pub debug: DebugConfig,
}

impl AppConfig {
    /// Load configuration from default locations
    ///
    /// Priority (lowest to highest):
    /// 1. `config/default.toml`
    /// 2. `config/user.toml`
    /// 3. Environment variables (`MRN_*`)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific config directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();
        let default_path = config_dir.join("default.toml");
        let user_path = config_dir.join("user.toml");

        let mut figment = Figment::new();

        if default_path.exists() {
            figment = figment.merge(Toml::file(&default_path));
        }
        if user_path.exists() {
            figment = figment.merge(Toml::file(&user_path));
        }

        // MRN_SIMULATION__FRAMES=10 -> simulation.frames = 10
        figment = figment.merge(Env::prefixed("MRN_").split("__"));

        figment.extract().map_err(ConfigError::from)
    }
}

/// Output surface configuration
///
/// The host is headless; the size is what the scene sees as its render surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Title used in log output
    pub title: String,
    /// Surface width in pixels
    pub width: u32,
    /// Surface height in pixels
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Marionette".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// Host loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of frames to run before exiting
    pub frames: u32,
    /// Seconds per frame when running on a fixed timestep; 0 uses the wall clock
    pub fixed_delta: f32,
    /// Upper bound on a single frame's delta, in seconds
    pub max_delta: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            frames: 120,
            fixed_delta: 1.0 / 60.0,
            max_delta: 0.25,
        }
    }
}

/// Debug configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
    /// Log every lifecycle hook invocation
    pub trace_lifecycle: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            trace_lifecycle: false,
        }
    }
}

impl DebugConfig {
    /// Filter string for `env_logger`
    pub fn log_filter(&self) -> String {
        if self.trace_lifecycle {
            format!("{},marionette_core=trace", self.log_level)
        } else {
            self.log_level.clone()
        }
    }
}

/// Configuration error
#[derive(Debug, Error)]
#[error("Configuration error: {message}")]
pub struct ConfigError {
    message: String,
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        ConfigError {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.window.width, 1280);
        assert_eq!(config.simulation.max_delta, 0.25);
        assert_eq!(config.debug.log_level, "info");
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml = toml::to_string(&config).unwrap();
        assert!(toml.contains("title"));
        assert!(toml.contains("fixed_delta"));
        assert!(toml.contains("trace_lifecycle"));
    }

    #[test]
    fn test_partial_section_uses_defaults() {
        let config: AppConfig = toml::from_str("[simulation]\nframes = 3\n").unwrap();
        assert_eq!(config.simulation.frames, 3);
        assert_eq!(config.simulation.max_delta, 0.25);
        assert_eq!(config.window.height, 720);
    }

    #[test]
    fn test_log_filter() {
        let mut debug = DebugConfig::default();
        assert_eq!(debug.log_filter(), "info");
        debug.trace_lifecycle = true;
        assert_eq!(debug.log_filter(), "info,marionette_core=trace");
    }

    #[test]
    fn test_load_from_missing_dir_uses_defaults() {
        let config = AppConfig::load_from("does/not/exist").unwrap();
        assert_eq!(config.window.title, "Marionette");
    }
}
