//! Error types for emitscope core.

use thiserror::Error;

use emitscope_emitter::EventName;

/// Errors from the interception engine and its registry.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// A record already exists for this event.
    #[error("Event already tracked: {0}")]
    AlreadyTracked(EventName),

    /// No recording proxy is installed for this event.
    #[error("Event not tracked by a recording proxy: {0}")]
    NotTracked(EventName),

    /// The tracker configuration is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Loading the configuration failed.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors loading a tracker configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading the configuration file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration is not valid TOML or has unknown fields.
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration parsed but failed validation.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for tracker operations.
pub type TrackerResult<T> = std::result::Result<T, TrackerError>;

/// Result type for configuration loading.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
