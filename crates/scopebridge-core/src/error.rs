//! Error types used across the reporting pipeline

use thiserror::Error;

/// Setup errors. These surface at start-up and are never swallowed.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse settings: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid DSN: {reason}")]
    InvalidDsn { reason: String },

    #[error("Invalid redaction rule for route {route}: {reason}")]
    InvalidRule { route: String, reason: String },

    #[error("Unknown integration: {0}")]
    UnknownIntegration(String),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors raised while turning log records into an outbound event
#[derive(Error, Debug)]
pub enum ReportingError {
    #[error("Unsupported log level {0:#x}")]
    UnsupportedLevel(u32),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type ReportingResult<T> = Result<T, ReportingError>;
