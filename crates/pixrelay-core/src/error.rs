// SPDX-FileCopyrightText: 2026 Pixrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types shared by every pixrelay crate.

use thiserror::Error;

/// The primary error type used across adapter traits and bot workflows.
///
/// Retry policy is a property of the variant: only [`RelayError::TransientNetwork`]
/// is retried by callers that retry at all.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Configuration errors (missing credentials, malformed values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Persistence backend errors (database open, query failure, file I/O).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Messaging transport errors (send, forward, thread creation, probe).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Network failures worth another attempt (connect, read timeout, 5xx).
    #[error("transient network error: {message}")]
    TransientNetwork {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Upstream API failures that will not improve on retry.
    #[error("upstream error: {message}")]
    Upstream {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Malformed user or admin input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Another instance of the bot is already running or polling.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Returns true when the failed operation may succeed if repeated.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RelayError::TransientNetwork { .. })
    }

    /// Returns true for the fatal duplicate-instance condition.
    pub fn is_conflict(&self) -> bool {
        matches!(self, RelayError::Conflict(_))
    }

    /// Shorthand for a transport error without an underlying source.
    pub fn transport(message: impl Into<String>) -> Self {
        RelayError::Transport {
            message: message.into(),
            source: None,
        }
    }
}
