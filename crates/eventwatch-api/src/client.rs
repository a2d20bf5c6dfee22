// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP client for the account events endpoints.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::config::ApiConfig;
use crate::error::{ApiError, Result};
use crate::filter::FilterOptions;
use crate::types::EventPage;

/// Header carrying the JSON filter.
pub const FILTER_HEADER: &str = "X-Filter";

/// Source of events for pollers and presenters.
///
/// Implemented by [`EventsClient`] for the real API; tests and embedders can
/// supply their own.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Fetch one page (1-based) of events matching `filter`.
    async fn list_events(&self, filter: &FilterOptions, page: u32) -> Result<EventPage>;

    /// Mark an event as displayed.
    async fn mark_seen(&self, event_id: u64) -> Result<()>;

    /// Mark an event as acknowledged by the user.
    async fn mark_read(&self, event_id: u64) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    errors: Vec<ApiErrorReason>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorReason {
    reason: String,
}

/// Client for `/account/events`.
///
/// Requests are issued once; retrying is left to the caller (pollers simply
/// try again on their next tick).
#[derive(Debug, Clone)]
pub struct EventsClient {
    http: reqwest::Client,
    config: ApiConfig,
}

impl EventsClient {
    /// Create a client with the given configuration.
    pub fn new(config: ApiConfig) -> Result<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        if let Some(token) = &config.token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ApiError::Config(format!("invalid api token: {}", e)))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .user_agent(concat!("eventwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Config(format!("failed to build http client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Create a client from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(ApiConfig::from_env()?)
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    fn events_url(&self) -> String {
        format!("{}/account/events", self.config.base_url)
    }

    fn event_action_url(&self, event_id: u64, action: &str) -> String {
        format!("{}/account/events/{}/{}", self.config.base_url, event_id, action)
    }

    fn map_send_error(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout(self.config.request_timeout.as_millis() as u64)
        } else {
            ApiError::from(err)
        }
    }

    /// Turn a non-success response into `ApiError::Api`.
    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let reasons = match serde_json::from_str::<ApiErrorBody>(&body) {
            Ok(parsed) if !parsed.errors.is_empty() => {
                parsed.errors.into_iter().map(|e| e.reason).collect()
            }
            _ if body.trim().is_empty() => vec![
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string(),
            ],
            _ => vec![body],
        };

        Err(ApiError::Api {
            status: status.as_u16(),
            reasons,
        })
    }

    async fn post_event_action(&self, event_id: u64, action: &str) -> Result<()> {
        let response = self
            .http
            .post(self.event_action_url(event_id, action))
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let response = Self::check_status(response).await?;
        // Drain so the connection can be reused.
        let _ = response.bytes().await;
        Ok(())
    }
}

#[async_trait]
impl EventSource for EventsClient {
    #[instrument(skip(self, filter))]
    async fn list_events(&self, filter: &FilterOptions, page: u32) -> Result<EventPage> {
        if page == 0 {
            return Err(ApiError::InvalidInput("page numbers start at 1".to_string()));
        }

        let header = filter.to_header_value();
        debug!(filter = %header, "Listing events");

        let response = self
            .http
            .get(self.events_url())
            .query(&[("page", page), ("page_size", self.config.page_size)])
            .header(FILTER_HEADER, header)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let response = Self::check_status(response).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(EventPage::empty());
        }

        let bytes = response.bytes().await.map_err(|e| self.map_send_error(e))?;
        let page: EventPage = serde_json::from_slice(&bytes)?;
        debug!(
            returned = page.data.len(),
            results = page.results,
            page = page.page,
            pages = page.pages,
            "Listed events"
        );
        Ok(page)
    }

    #[instrument(skip(self))]
    async fn mark_seen(&self, event_id: u64) -> Result<()> {
        self.post_event_action(event_id, "seen").await?;
        debug!(event_id, "Marked event as seen");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn mark_read(&self, event_id: u64) -> Result<()> {
        self.post_event_action(event_id, "read").await?;
        debug!(event_id, "Marked event as read");
        Ok(())
    }
}
