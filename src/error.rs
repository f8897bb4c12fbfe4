//! Error types for the rx-context crate.

use std::sync::Arc;
use thiserror::Error;

/// Error signal carried by a computation's `on_error` channel.
///
/// Shared so that the exact instance raised by a source is the one every observer sees.
pub type Failure = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Wrap any error into a [`Failure`].
pub fn failure<E>(err: E) -> Failure
where
    E: std::error::Error + Send + Sync + 'static,
{
    Arc::new(err)
}

/// Interceptor lifecycle errors
#[derive(Debug, Error)]
pub enum PropagationError {
    #[error("A context propagation interceptor is already bound to this hook registry")]
    AlreadyBound,
}

/// Settings and logging initialization errors
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid settings: {0}")]
    Invalid(String),

    #[error("Logging initialization failed: {0}")]
    Logging(String),

    #[error("Settings I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for SettingsError {
    fn from(err: config::ConfigError) -> Self {
        SettingsError::Config(err.to_string())
    }
}

/// A simple message-only error, handy for sources that fail with a description.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct SignalError(pub String);

impl SignalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
