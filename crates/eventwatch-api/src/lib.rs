// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Eventwatch API
//!
//! Typed client for the cloud account events API.
//!
//! This crate provides the event data model and an HTTP client for the three
//! endpoints the notification feed needs:
//! - `GET /account/events` with an `X-Filter` header and page parameters
//! - `POST /account/events/{id}/seen`
//! - `POST /account/events/{id}/read`
//!
//! Pollers and presenters depend on the [`EventSource`] trait rather than the
//! concrete client so they can be driven by any source.
//!
//! # Example
//!
//! ```no_run
//! use eventwatch_api::{ApiConfig, EventSource, EventsClient, FilterOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = EventsClient::new(ApiConfig::from_env()?)?;
//!
//! // First page of unseen events, newest first
//! let page = client.list_events(&FilterOptions::unseen(), 1).await?;
//! for event in &page.data {
//!     if let Some(text) = eventwatch_api::event_message(event) {
//!         println!("{}", text);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;
mod filter;
mod message;
mod types;

pub use client::{EventSource, EventsClient, FILTER_HEADER};
pub use config::{ApiConfig, DEFAULT_API_URL, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use error::{ApiError, Result};
pub use filter::{Comparison, FilterOptions, SortOrder, TimeBound, TimeField};
pub use message::{event_message, generic_message};
pub use types::{
    API_DATETIME_FORMAT, Entity, Event, EventAction, EventPage, EventStatus, api_datetime,
    count_unseen, format_api_datetime, parse_api_datetime,
};
