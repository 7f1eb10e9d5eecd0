//! Configuration handling for the loconet tool.
//!
//! Settings come from a YAML file, then `LOCONET_*` environment variables,
//! then command line flags (applied in `main`). The log level is resolved
//! separately since logging is installed before the file is read.

use anyhow::Result;
use loconet_session::InterfaceConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Tool configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocoNetConfig {
    /// Send state machine parameters
    pub interface: InterfaceConfig,
    /// Log decoder counters when the monitor stops
    pub report_stats: bool,
}

impl Default for LocoNetConfig {
    fn default() -> Self {
        Self {
            interface: InterfaceConfig::default(),
            report_stats: true,
        }
    }
}

/// Log level from the command line, then `LOCONET_LOG_LEVEL`, then `info`
pub fn resolve_log_level<F>(cli: Option<&str>, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    cli.map(str::to_string)
        .or_else(|| lookup("LOCONET_LOG_LEVEL"))
        .unwrap_or_else(|| "info".to_string())
}

/// Root configuration structure (matches the YAML structure)
#[derive(Debug, Deserialize)]
struct RootConfig {
    loconet: Option<LocoNetConfig>,
}

impl LocoNetConfig {
    /// Load configuration from file and environment variables
    pub fn load_from_file<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let mut config = Self::default();

        if let Ok(content) = std::fs::read_to_string(&config_path) {
            match Self::from_yaml(&content) {
                Ok(loaded) => {
                    config = loaded;
                    info!("Loaded configuration from {:?}", config_path.as_ref());
                }
                Err(e) => {
                    warn!(
                        "Failed to parse config file {:?}, using defaults: {}",
                        config_path.as_ref(),
                        e
                    );
                }
            }
        } else {
            warn!("Config file {:?} not found, using defaults", config_path.as_ref());
        }

        config.apply_environment_overrides();

        info!(
            "Final loconet configuration: retry_budget={}, ack_wait_bytes={}, bit_rate={}",
            config.interface.retry_budget,
            config.interface.ack_wait_bytes,
            config.interface.bit_rate
        );

        Ok(config)
    }

    /// Parse the `loconet:` section of a YAML document
    pub fn from_yaml(content: &str) -> Result<Self> {
        let root: RootConfig = serde_yaml::from_str(content)?;
        Ok(root.loconet.unwrap_or_default())
    }

    /// Apply environment variable overrides
    fn apply_environment_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(budget) = lookup("LOCONET_RETRY_BUDGET").and_then(|v| v.parse().ok()) {
            self.interface.retry_budget = budget;
            info!("Retry budget overridden by environment: {}", budget);
        }

        if let Some(bytes) = lookup("LOCONET_ACK_WAIT_BYTES").and_then(|v| v.parse().ok()) {
            self.interface.ack_wait_bytes = bytes;
            info!("Ack wait overridden by environment: {} bytes", bytes);
        }

        if let Some(rate) = lookup("LOCONET_BIT_RATE").and_then(|v| v.parse().ok()) {
            self.interface.bit_rate = rate;
            info!("Bit rate overridden by environment: {}", rate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = LocoNetConfig::default();
        assert_eq!(config.interface.retry_budget, 10);
        assert_eq!(config.interface.ack_wait_bytes, 4);
        assert!(config.report_stats);
    }

    #[test]
    fn test_load_from_file() {
        let yaml_content = r#"
loconet:
  report_stats: false
  interface:
    retry_budget: 5
    bit_rate: 16600
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(yaml_content.as_bytes()).unwrap();

        let config = LocoNetConfig::load_from_file(temp_file.path()).unwrap();

        assert!(!config.report_stats);
        assert_eq!(config.interface.retry_budget, 5);
        assert_eq!(config.interface.bit_rate, 16600);
        assert_eq!(config.interface.ack_wait_bytes, 4);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = LocoNetConfig::load_from_file("/nonexistent/loconet.yaml").unwrap();
        assert_eq!(config.interface, InterfaceConfig::default());
    }

    #[test]
    fn test_unparseable_file_uses_defaults() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"loconet: [not, a, map").unwrap();
        let config = LocoNetConfig::load_from_file(temp_file.path()).unwrap();
        assert_eq!(config.interface.retry_budget, 10);
    }

    #[test]
    fn test_from_yaml_rejects_malformed_input() {
        assert!(LocoNetConfig::from_yaml("loconet: [not, a, map").is_err());
        assert!(LocoNetConfig::from_yaml("loconet:\n  interface:\n    retry_budget: many\n").is_err());
        assert_eq!(LocoNetConfig::from_yaml("other: 1\n").unwrap(), LocoNetConfig::default());
    }

    #[test]
    fn test_resolve_log_level() {
        let env: HashMap<&str, &str> = HashMap::from([("LOCONET_LOG_LEVEL", "trace")]);
        let lookup = |key: &str| env.get(key).map(|v| v.to_string());

        assert_eq!(resolve_log_level(Some("debug"), lookup), "debug");
        assert_eq!(resolve_log_level(None, lookup), "trace");
        assert_eq!(resolve_log_level(None, |_: &str| None), "info");
    }

    #[test]
    fn test_environment_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("LOCONET_RETRY_BUDGET", "3"),
            ("LOCONET_ACK_WAIT_BYTES", "not-a-number"),
        ]);

        let mut config = LocoNetConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.interface.retry_budget, 3);
        assert_eq!(config.interface.ack_wait_bytes, 4);
    }
}
