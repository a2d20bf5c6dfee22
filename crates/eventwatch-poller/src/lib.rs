// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Eventwatch Poller
//!
//! Keeps a notification list in sync with the account events API.
//!
//! Polling starts fast and backs off while nothing happens:
//! - the first request is sent immediately
//! - each idle request doubles the wait (2s, 4s, 8s, ... up to 32s)
//! - new events, in-progress events or an explicit reset snap it back to 2s
//! - failed requests are logged and treated as idle
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use eventwatch_api::EventsClient;
//! use eventwatch_poller::{BackoffPolicy, PollingController};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(EventsClient::from_env()?);
//! let controller = PollingController::new(client, BackoffPolicy::default());
//!
//! controller.start("notifications").await?;
//!
//! // Later: the user opened the menu
//! let center = controller.center();
//! center.open().await?;
//!
//! // A user action is likely to produce events soon
//! controller.reset("notifications").await;
//! # Ok(())
//! # }
//! ```

pub mod backoff;
pub mod config;
pub mod controller;
pub mod error;
pub mod mock;
pub mod presenter;
pub mod timer;

pub use backoff::{Backoff, BackoffPolicy, BackoffStrategy};
pub use config::PollerConfig;
pub use controller::{EventPollTask, FilterState, PollState, PollingController};
pub use error::{PollerError, Result};
pub use presenter::{NotificationCenter, NotificationList};
pub use timer::{FnTask, PollTask, PollTimer, TickOutcome};
pub use tokio_util::sync::CancellationToken;
