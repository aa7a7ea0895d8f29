//! TOML-based application configuration.
//!
//! Stores the few knobs the core exposes:
//! - the "too small to start" guardrail threshold for new plans
//! - the execution tick cadence
//! - the timeline refresh interval
//!
//! Configuration is stored at `<data_dir>/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;

/// Application configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Guardrail threshold used when creating a fresh day plan.
    #[serde(default = "default_minimum_fragment_minutes")]
    pub minimum_fragment_minutes: i64,
    /// Cadence of the execution tick in the watch loop, milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// How often the watch loop recomputes the display timeline, seconds.
    #[serde(default = "default_timeline_refresh_secs")]
    pub timeline_refresh_secs: u64,
}

fn default_minimum_fragment_minutes() -> i64 {
    5
}
fn default_tick_interval_ms() -> u64 {
    500
}
fn default_timeline_refresh_secs() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            minimum_fragment_minutes: default_minimum_fragment_minutes(),
            tick_interval_ms: default_tick_interval_ms(),
            timeline_refresh_secs: default_timeline_refresh_secs(),
        }
    }
}

impl Config {
    fn path() -> Result<PathBuf, Box<dyn std::error::Error>> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, writing out defaults on first run.
    ///
    /// # Errors
    /// Returns an error if an existing file cannot be parsed, or if the
    /// default config cannot be written to disk.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content)?;
                Ok(cfg)
            }
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    /// Returns an error if the config cannot be serialized or written.
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(Self::path()?, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.minimum_fragment_minutes, 5);
        assert_eq!(cfg.tick_interval_ms, 500);
        assert_eq!(cfg.timeline_refresh_secs, 30);
    }

    #[test]
    fn toml_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let parsed: Config = toml::from_str("minimum_fragment_minutes = 10\n").unwrap();
        assert_eq!(parsed.minimum_fragment_minutes, 10);
        assert_eq!(parsed.tick_interval_ms, 500);
        assert_eq!(parsed.timeline_refresh_secs, 30);
    }
}
