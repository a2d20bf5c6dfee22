// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Poller-specific error types.

use eventwatch_api::ApiError;
use thiserror::Error;

/// Errors that can occur while polling or presenting events.
#[derive(Debug, Error)]
pub enum PollerError {
    /// The event source rejected or failed a request
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Configuration error (missing or invalid environment variable)
    #[error("configuration error: {0}")]
    Config(String),

    /// A poll task failed for a reason unrelated to the API
    #[error("poll task error: {0}")]
    Task(String),
}

impl PollerError {
    /// Whether retrying on the next tick may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            PollerError::Api(err) => err.is_transient(),
            PollerError::Config(_) => false,
            PollerError::Task(_) => true,
        }
    }
}

/// Result type for poller operations.
pub type Result<T> = std::result::Result<T, PollerError>;
