//! Error types for trading-chat.

use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Channel (transport) errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send response on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures raised while running the external analysis pipeline.
///
/// Every variant is collapsed into a single user-visible error reply by the
/// collector; nothing here crosses the chat boundary as a Rust error.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Pipeline runner {runner} failed: {reason}")]
    Failed { runner: String, reason: String },

    #[error("Invalid response from pipeline runner {runner}: {reason}")]
    InvalidResponse { runner: String, reason: String },

    #[error("Pipeline timed out after {timeout:?}")]
    TimedOut { timeout: Duration },

    #[error("Incomplete selections: missing {0}")]
    Incomplete(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rejected answer for a single slot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("'{input}' is not a whole number, please enter a value like 1, 2 or 3")]
    InvalidInteger { input: String },
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
