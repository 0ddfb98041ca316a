//! Error types shared across the crate.
use std::{path::PathBuf, time::Duration};

use thiserror::Error;

/// Result alias using the crate [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while building a load profile or sending a request.
///
/// Configuration variants are raised at construction time and are never clamped.
/// Logical failures such as an unexpected status code are *not* errors: they are
/// recorded as failed request metrics and logged.
#[derive(Error, Debug)]
pub enum Error {
    /// A ramp was given a zero duration.
    #[error("invalid phase: {0}")]
    InvalidPhase(String),

    #[error("invalid retry policy: {0}")]
    InvalidRetryPolicy(String),

    #[error("invalid wait time: min {min:?} is greater than max {max:?}")]
    InvalidWaitTime { min: Duration, max: Duration },

    #[error("invalid url `{url}`: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("invalid header `{name}`: {message}")]
    InvalidHeader { name: String, message: String },

    /// An attachment's content type is not a valid MIME type.
    #[error("invalid attachment {path}: {message}")]
    InvalidAttachment { path: PathBuf, message: String },

    #[error("invalid tick: {0:?}, the driver needs a tick greater than zero")]
    InvalidTick(Duration),

    /// A file attachment could not be read.
    #[error("failed to read attachment {path}: {source}")]
    Attachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The transport failed and the retry policy (if any) was exhausted.
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("virtual user task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl Error {
    pub fn invalid_phase(message: impl Into<String>) -> Self {
        Self::InvalidPhase(message.into())
    }

    pub fn invalid_retry_policy(message: impl Into<String>) -> Self {
        Self::InvalidRetryPolicy(message.into())
    }

    pub fn invalid_url(url: impl Into<String>, message: impl ToString) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub fn invalid_header(name: impl Into<String>, message: impl ToString) -> Self {
        Self::InvalidHeader {
            name: name.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error was raised while validating configuration.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::InvalidPhase(_)
                | Self::InvalidRetryPolicy(_)
                | Self::InvalidWaitTime { .. }
                | Self::InvalidUrl { .. }
                | Self::InvalidHeader { .. }
                | Self::InvalidAttachment { .. }
                | Self::InvalidTick(_)
        )
    }
}

/// Failure reported by a [`Transport`](crate::transport::Transport) before any
/// response was received.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("transport error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else {
            Self::Other(err.to_string())
        }
    }
}
