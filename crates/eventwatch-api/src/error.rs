// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for eventwatch-api.

use thiserror::Error;

/// Result type using ApiError.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors that can occur when talking to the events API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Configuration error (missing or invalid values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport-level failure (DNS, connect, TLS, broken body).
    #[error("http error: {0}")]
    Http(String),

    /// Request timed out.
    #[error("request timed out after {0}ms")]
    Timeout(u64),

    /// API answered with a non-success status.
    #[error("api error [{status}]: {}", reasons.join("; "))]
    Api { status: u16, reasons: Vec<String> },

    /// Invalid input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ApiError {
    /// Whether the failure is worth retrying on a later poll.
    ///
    /// Transport errors, timeouts, rate limiting and 5xx responses are
    /// transient; 4xx responses and decoding failures are not.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Http(_) | ApiError::Timeout(_) => true,
            ApiError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Serialization(err.to_string())
        } else {
            ApiError::Http(err.to_string())
        }
    }
}
