// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Library configuration via a YAML file named by `RADIOLIB_CONFIG`.
//!
//! ```yaml
//! logging:
//!   level: debug
//! sim:
//!   num_devices: 2
//!   rx_channels: 4
//! ```

use std::ffi::OsStr;
use std::path::Path;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use super::{RadioError, Result};

/// Logging section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive; `RUST_LOG` takes precedence.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Simulated backend section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub enabled: bool,
    /// Devices reported by discovery.
    pub num_devices: usize,
    pub num_mboards: usize,
    /// Channels per motherboard.
    pub rx_channels: usize,
    pub tx_channels: usize,
    pub master_clock_rate: f64,
    /// Samples per simulated packet.
    pub frame_size: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            num_devices: 2,
            num_mboards: 1,
            rx_channels: 2,
            tx_channels: 2,
            master_clock_rate: 32e6,
            frame_size: 2000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadioConfig {
    pub logging: LoggingConfig,
    pub sim: SimConfig,
}

impl RadioConfig {
    /// Environment variable holding the config file path.
    pub const ENV_VAR: &'static str = "RADIOLIB_CONFIG";

    /// Load configuration from `path`. Returns error if the file is missing
    /// or cannot be parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RadioError::Environment(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| {
            RadioError::Environment(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        tracing::info!("Loaded radiolib config from {}", path.display());
        Ok(config)
    }

    /// Load from the file named by `var`, or defaults when it is unset. A
    /// path that is set but unreadable is an error.
    pub fn from_var(var: Option<&OsStr>) -> Result<Self> {
        match var {
            Some(path) => Self::load(Path::new(path)),
            None => Ok(Self::default()),
        }
    }

    /// Load from the file named by `RADIOLIB_CONFIG`.
    pub fn from_env() -> Result<Self> {
        Self::from_var(std::env::var_os(Self::ENV_VAR).as_deref())
    }
}

/// Configuration actually in effect plus the reason loading failed, if it
/// did. A failed load still yields defaults so logging can come up.
struct LoadedConfig {
    config: RadioConfig,
    error: Option<String>,
}

impl LoadedConfig {
    fn new(result: Result<RadioConfig>) -> Self {
        match result {
            Ok(config) => Self {
                config,
                error: None,
            },
            Err(e) => {
                tracing::warn!("{}, using defaults", e);
                let error = match e {
                    RadioError::Environment(msg) => msg,
                    other => other.to_string(),
                };
                Self {
                    config: RadioConfig::default(),
                    error: Some(error),
                }
            }
        }
    }

    fn status(&self) -> Result<()> {
        match &self.error {
            Some(msg) => Err(RadioError::Environment(msg.clone())),
            None => Ok(()),
        }
    }
}

fn loaded() -> &'static LoadedConfig {
    static CONFIG: OnceLock<LoadedConfig> = OnceLock::new();
    CONFIG.get_or_init(|| LoadedConfig::new(RadioConfig::from_env()))
}

/// Process-wide configuration, read from the environment on first use.
pub fn global_config() -> &'static RadioConfig {
    &loaded().config
}

/// Fails with [`RadioError::Environment`] when `RADIOLIB_CONFIG` named a
/// file that could not be loaded.
pub fn config_status() -> Result<()> {
    loaded().status()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = RadioConfig::default();
        assert_eq!(config.logging.level, "info");
        assert!(config.sim.enabled);
        assert_eq!(config.sim.num_devices, 2);
    }

    #[test]
    fn test_load_partial_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "sim:\n  rx_channels: 4\n  master_clock_rate: 61.44e6").unwrap();

        let config = RadioConfig::load(file.path()).unwrap();
        assert_eq!(config.sim.rx_channels, 4);
        assert_eq!(config.sim.master_clock_rate, 61.44e6);
        assert_eq!(config.sim.tx_channels, 2);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("radiolib.yaml");
        let err = RadioConfig::load(&missing).unwrap_err();
        assert!(matches!(err, RadioError::Environment(_)));

        std::fs::write(&missing, "sim: [not, a, map]").unwrap();
        assert!(matches!(
            RadioConfig::from_var(Some(missing.as_os_str())),
            Err(RadioError::Environment(_))
        ));
        assert_eq!(RadioConfig::from_var(None).unwrap(), RadioConfig::default());
    }

    #[test]
    fn test_failed_load_falls_back_but_reports() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("radiolib.yaml");
        std::fs::write(&path, "logging: 42").unwrap();

        let loaded = LoadedConfig::new(RadioConfig::from_var(Some(path.as_os_str())));
        assert_eq!(loaded.config, RadioConfig::default());
        let err = loaded.status().unwrap_err();
        assert_eq!(err.code(), crate::core::RadioErrorCode::Environment);
        assert!(err.to_string().starts_with("EnvironmentError: Failed to parse"));

        let ok = LoadedConfig::new(RadioConfig::from_var(None));
        assert!(ok.status().is_ok());
    }
}
