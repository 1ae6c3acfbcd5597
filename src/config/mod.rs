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
    #[error("Host list is not set (pg_status__hosts)")]
    MissingHosts,
    #[error("Too many hosts. Maximum value = {max}")]
    TooManyHosts { max: usize },
    #[error("Invalid port: {0}")]
    InvalidPort(String),
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<MonitorParameters, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: MonitorParameters = toml::from_str(&content)?;
    Ok(config)
}

/// Load a config file if it exists
///
/// A missing file yields `None`. A file that exists but cannot be read or
/// parsed is an error.
pub fn load_optional_config<P: AsRef<Path>>(
    path: P,
) -> Result<Option<MonitorParameters>, ConfigError> {
    match load_config(path) {
        Ok(config) => Ok(Some(config)),
        Err(ConfigError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
