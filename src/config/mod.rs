mod schema;

pub use schema::*;

use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Load and validate a TOML configuration file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Reject configurations the health loop cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node.name.trim().is_empty() {
            return Err(ConfigError::Invalid("node.name must not be empty".into()));
        }
        if self.health.check_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "health.check_interval_ms must be greater than zero".into(),
            ));
        }
        if self.health.heartbeat_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "health.heartbeat_timeout_ms must be greater than zero".into(),
            ));
        }
        if self.cluster.peers.iter().any(|p| p.name == self.node.name) {
            return Err(ConfigError::Invalid(format!(
                "peer '{}' has the same name as the local node",
                self.node.name
            )));
        }
        Ok(())
    }
}
