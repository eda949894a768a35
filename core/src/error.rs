//! Error types for the kevin API client.
//!
//! # Design
//! `Config` failures are programming or setup mistakes and are always returned
//! as `Err`, whatever failure mode the client was built with. `Transport`
//! covers everything that goes wrong on the socket. `Api` carries a normalized
//! platform failure when the client is configured to raise them.

use thiserror::Error;

use crate::normalize::ApiFailure;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors returned by the client core.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connect, TLS, write or read failure, including redirect loops.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Invalid configuration or call arguments (placeholder mismatch,
    /// missing credentials, unsupported scheme).
    #[error("configuration error: {0}")]
    Config(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The platform (or the transport) produced a failure and the client is
    /// configured to raise it.
    #[error("[{}] {}: {}", .0.code, .0.name, .0.description)]
    Api(ApiFailure),
}

impl ApiError {
    /// The normalized failure, if this error carries one.
    pub fn failure(&self) -> Option<&ApiFailure> {
        match self {
            ApiError::Api(failure) => Some(failure),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Transport(err.to_string())
    }
}

impl From<url::ParseError> for ApiError {
    fn from(err: url::ParseError) -> Self {
        ApiError::Config(format!("invalid url: {err}"))
    }
}
