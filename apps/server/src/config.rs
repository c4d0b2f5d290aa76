//! Server configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Server configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port to bind the HTTP server to (0 = auto-allocate).
    /// Override: `CANDOR_BIND_PORT`
    pub bind_port: u16,

    /// Composite sample emission interval in milliseconds.
    /// Override: `CANDOR_COMPOSITE_INTERVAL_MS`
    pub composite_interval_ms: u64,

    /// Voice analysis interval in milliseconds.
    /// Override: `CANDOR_VOICE_INTERVAL_MS`
    pub voice_interval_ms: u64,

    /// Capacity of the event broadcast channel.
    pub event_channel_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let engine = candor_core::EngineConfig::default();
        Self {
            bind_port: 7900,
            composite_interval_ms: engine.composite_interval_ms,
            voice_interval_ms: engine.voice_interval_ms,
            event_channel_capacity: candor_core::Config::default().event_channel_capacity,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("CANDOR_BIND_PORT") {
            if let Ok(port) = val.parse() {
                self.bind_port = port;
            }
        }

        if let Ok(val) = std::env::var("CANDOR_COMPOSITE_INTERVAL_MS") {
            if let Ok(interval) = val.parse() {
                self.composite_interval_ms = interval;
            }
        }

        if let Ok(val) = std::env::var("CANDOR_VOICE_INTERVAL_MS") {
            if let Ok(interval) = val.parse() {
                self.voice_interval_ms = interval;
            }
        }
    }

    /// Converts to candor-core's Config type.
    pub fn to_core_config(&self) -> candor_core::Config {
        let mut config = candor_core::Config {
            preferred_port: self.bind_port,
            event_channel_capacity: self.event_channel_capacity,
            ..Default::default()
        };
        config.engine.composite_interval_ms = self.composite_interval_ms;
        config.engine.voice_interval_ms = self.voice_interval_ms;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_engine_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.composite_interval_ms, 10_000);
        assert_eq!(config.voice_interval_ms, 5_000);
    }

    #[test]
    fn to_core_config_carries_overrides() {
        let config = ServerConfig {
            bind_port: 9000,
            composite_interval_ms: 4_000,
            voice_interval_ms: 2_000,
            ..ServerConfig::default()
        };
        let core = config.to_core_config();
        assert_eq!(core.preferred_port, 9000);
        assert_eq!(core.engine.composite_interval_ms, 4_000);
        assert_eq!(core.engine.voice_interval_ms, 2_000);
    }
}
