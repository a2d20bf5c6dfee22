// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration for the events API client.

use std::time::Duration;

use crate::error::{ApiError, Result};

/// Default API root.
pub const DEFAULT_API_URL: &str = "https://api.linode.com/v4";

/// Default number of events requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 25;

/// Largest page the API accepts.
pub const MAX_PAGE_SIZE: u32 = 500;

/// Configuration for the EventsClient.
#[derive(Clone)]
pub struct ApiConfig {
    /// API root, without trailing slash (e.g. `https://api.linode.com/v4`).
    pub base_url: String,
    /// Personal access token sent as a bearer token.
    pub token: Option<String>,
    /// Request timeout.
    pub request_timeout: Duration,
    /// Events requested per page.
    pub page_size: u32,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("request_timeout", &self.request_timeout)
            .field("page_size", &self.page_size)
            .finish()
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            token: None,
            request_timeout: Duration::from_secs(30),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ApiConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a configuration from environment variables.
    ///
    /// Environment variables:
    /// - `EVENTWATCH_API_URL`: API root (default: "https://api.linode.com/v4")
    /// - `EVENTWATCH_API_TOKEN`: bearer token (optional)
    /// - `EVENTWATCH_REQUEST_TIMEOUT_MS`: request timeout in milliseconds (default: 30000)
    /// - `EVENTWATCH_PAGE_SIZE`: events per page, 1..=500 (default: 25)
    pub fn from_env() -> Result<Self> {
        let base_url =
            std::env::var("EVENTWATCH_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let token = std::env::var("EVENTWATCH_API_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());

        let request_timeout_ms: u64 = std::env::var("EVENTWATCH_REQUEST_TIMEOUT_MS")
            .unwrap_or_else(|_| "30000".to_string())
            .parse()
            .map_err(|e| {
                ApiError::Config(format!("invalid EVENTWATCH_REQUEST_TIMEOUT_MS: {}", e))
            })?;

        let page_size: u32 = std::env::var("EVENTWATCH_PAGE_SIZE")
            .unwrap_or_else(|_| DEFAULT_PAGE_SIZE.to_string())
            .parse()
            .map_err(|e| ApiError::Config(format!("invalid EVENTWATCH_PAGE_SIZE: {}", e)))?;

        let config = Self {
            base_url,
            token,
            request_timeout: Duration::from_millis(request_timeout_ms),
            page_size,
        }
        .normalized();
        config.validate()?;
        Ok(config)
    }

    /// Check invariants that `from_env` and the client rely on.
    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ApiError::Config(format!(
                "base url must be http(s): {}",
                self.base_url
            )));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(ApiError::Config(format!(
                "page size must be within 1..={}, got {}",
                MAX_PAGE_SIZE, self.page_size
            )));
        }
        Ok(())
    }

    fn normalized(mut self) -> Self {
        while self.base_url.ends_with('/') {
            self.base_url.pop();
        }
        self
    }

    /// Set the API root.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self.normalized()
    }

    /// Set the bearer token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the page size.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert_eq!(config.base_url, DEFAULT_API_URL);
        assert!(config.token.is_none());
        assert_eq!(config.page_size, 25);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let config = ApiConfig::new()
            .with_base_url("http://127.0.0.1:9000/v4/")
            .with_token("secret")
            .with_request_timeout(Duration::from_secs(5))
            .with_page_size(100);

        assert_eq!(config.base_url, "http://127.0.0.1:9000/v4");
        assert_eq!(config.token.as_deref(), Some("secret"));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.page_size, 100);
    }

    #[test]
    fn test_validate_rejects_bad_page_size() {
        assert!(ApiConfig::new().with_page_size(0).validate().is_err());
        assert!(ApiConfig::new().with_page_size(501).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_non_http_url() {
        let err = ApiConfig::new()
            .with_base_url("ftp://example.com")
            .validate()
            .unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = ApiConfig::new().with_token("hunter2");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("redacted"));
    }
}
