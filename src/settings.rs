//! Layered configuration.
//!
//! Defaults, then an optional TOML file, then `PRESENCE_*` environment
//! variables (nested keys joined with `__`, e.g.
//! `PRESENCE_CLIENT__MOVE_SPEED=0.05`).
//!
//! ```toml
//! [runtime]
//! endpoint = "ws://localhost:3000/ws"
//! tick_rate_hz = 60.0
//!
//! [client]
//! world_limit = 18.5
//! reference_rate = 60.0
//! ```

use crate::types::ClientConfig;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// WebSocket URL of the relay.
    pub endpoint: String,
    /// Identity announced in `join`; generated when unset.
    pub participant_id: Option<String>,
    /// Simulation tick rate in Hz.
    pub tick_rate_hz: f32,
    /// Outbound `move` evaluation rate in Hz.
    pub send_rate_hz: f32,
    /// Walk a slow circle instead of standing still.
    pub wander: bool,
    /// Seconds between stats log lines (0 disables).
    pub stats_interval_secs: u64,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            endpoint: "ws://localhost:3000/ws".into(),
            participant_id: None,
            tick_rate_hz: 60.0,
            send_rate_hz: 20.0,
            wander: false,
            stats_interval_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub runtime: RuntimeSettings,
    pub client: ClientConfig,
}

impl Settings {
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder
            .add_source(
                Environment::with_prefix("PRESENCE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_sources() {
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings.runtime.send_rate_hz, 20.0);
        assert_eq!(settings.client.chat_capacity, 50);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(Settings::load(Some(Path::new("/nonexistent/presence.toml"))).is_err());
    }
}
