//! # Runtime Configuration
//!
//! TOML-backed settings, loaded once at startup.
//!
//! ```toml
//! strict_check = true
//!
//! [timer]
//! max_catchup_passes = 32
//!
//! [object_pool]
//! auto_release_interval = 60.0
//! capacity = 256
//! expire_time = 300.0
//! priority = 0
//! ```
//!
//! Every field is optional; omitted sections fall back to their defaults.

use serde::Deserialize;
use thiserror::Error;

use relic_core::{ObjectPoolSettings, DEFAULT_MAX_CATCHUP_PASSES};

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The TOML text did not parse into a runtime configuration.
    #[error("invalid runtime configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level runtime settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Enables the reference pool's double-release detection.
    pub strict_check: bool,
    /// Timer scheduler settings.
    pub timer: TimerConfig,
    /// Defaults applied to newly created object pools.
    pub object_pool: ObjectPoolConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            strict_check: false,
            timer: TimerConfig::default(),
            object_pool: ObjectPoolConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] when the text is not valid configuration TOML.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Object-pool settings carrying the configured defaults.
    #[must_use]
    pub fn pool_settings(&self) -> ObjectPoolSettings {
        ObjectPoolSettings {
            auto_release_interval: self.object_pool.auto_release_interval,
            capacity: self.object_pool.capacity,
            expire_time: self.object_pool.expire_time,
            priority: self.object_pool.priority,
        }
    }
}

/// Timer scheduler settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// Bound on catch-up firing passes within one update tick.
    pub max_catchup_passes: u32,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            max_catchup_passes: DEFAULT_MAX_CATCHUP_PASSES,
        }
    }
}

/// Defaults applied to newly created object pools.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ObjectPoolConfig {
    /// Seconds of accumulated real time between automatic eviction passes.
    pub auto_release_interval: f32,
    /// Record count above which eviction passes run.
    pub capacity: usize,
    /// Idle seconds after which a record counts as expired.
    pub expire_time: f32,
    /// Pool priority.
    pub priority: i32,
}

impl Default for ObjectPoolConfig {
    fn default() -> Self {
        let defaults = ObjectPoolSettings::default();
        Self {
            auto_release_interval: defaults.auto_release_interval,
            capacity: defaults.capacity,
            expire_time: defaults.expire_time,
            priority: defaults.priority,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert!(!config.strict_check);
        assert_eq!(config.timer.max_catchup_passes, DEFAULT_MAX_CATCHUP_PASSES);
        assert_eq!(config.object_pool.capacity, usize::MAX);
        assert!(config.object_pool.expire_time.is_infinite());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = RuntimeConfig::from_toml_str(
            r#"
            strict_check = true

            [timer]
            max_catchup_passes = 8
            "#,
        )
        .unwrap();

        assert!(config.strict_check);
        assert_eq!(config.timer.max_catchup_passes, 8);
        // Untouched section keeps its defaults.
        assert_eq!(config.object_pool.capacity, usize::MAX);
    }

    #[test]
    fn test_parse_pool_section() {
        let config = RuntimeConfig::from_toml_str(
            r#"
            [object_pool]
            auto_release_interval = 60.0
            capacity = 256
            expire_time = 300.0
            priority = 2
            "#,
        )
        .unwrap();

        let settings = config.pool_settings();
        assert_eq!(settings.capacity, 256);
        assert_eq!(settings.priority, 2);
        assert!((settings.expire_time - 300.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(RuntimeConfig::from_toml_str("strict_check = \"yes\"").is_err());
    }
}
