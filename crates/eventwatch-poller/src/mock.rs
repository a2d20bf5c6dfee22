// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! In-memory event source for testing.
//!
//! Stores events like the API would and applies [`FilterOptions`] the same
//! way the server does: seen flag and time bounds combined with AND, included
//! ids combined with OR, newest first.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use eventwatch_api::{
    ApiError, Event, EventPage, EventSource, FilterOptions, Result, SortOrder, TimeField,
};
use tokio::sync::Mutex;

/// Mock event source for testing.
pub struct MockEventSource {
    events: Mutex<Vec<Event>>,
    page_size: usize,
    /// Number of upcoming list calls that should fail
    failures_pending: AtomicUsize,
    /// If true, every list call fails
    fail_lists: AtomicBool,
    /// If true, mark seen / mark read fail
    fail_marks: AtomicBool,
    list_calls: AtomicUsize,
    /// Simulated latency of list calls, in milliseconds
    list_delay_ms: AtomicU64,
    lists_in_flight: AtomicUsize,
    max_lists_in_flight: AtomicUsize,
    filters: Mutex<Vec<FilterOptions>>,
    seen_calls: Mutex<Vec<u64>>,
    read_calls: Mutex<Vec<u64>>,
}

impl Default for MockEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEventSource {
    /// Create an empty source with a page size of 25.
    pub fn new() -> Self {
        Self::with_page_size(25)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            page_size: page_size.max(1),
            failures_pending: AtomicUsize::new(0),
            fail_lists: AtomicBool::new(false),
            fail_marks: AtomicBool::new(false),
            list_calls: AtomicUsize::new(0),
            list_delay_ms: AtomicU64::new(0),
            lists_in_flight: AtomicUsize::new(0),
            max_lists_in_flight: AtomicUsize::new(0),
            filters: Mutex::new(Vec::new()),
            seen_calls: Mutex::new(Vec::new()),
            read_calls: Mutex::new(Vec::new()),
        }
    }

    /// Create a source preloaded with events.
    pub fn with_events(events: Vec<Event>) -> Self {
        Self {
            events: Mutex::new(events),
            ..Self::new()
        }
    }

    /// Add an event, replacing any stored event with the same id.
    pub async fn push(&self, event: Event) {
        let mut events = self.events.lock().await;
        events.retain(|e| e.id != event.id);
        events.push(event);
    }

    /// Stored copy of an event.
    pub async fn event(&self, event_id: u64) -> Option<Event> {
        self.events
            .lock()
            .await
            .iter()
            .find(|e| e.id == event_id)
            .cloned()
    }

    /// Fail the next `count` list calls with a 503.
    pub fn fail_next(&self, count: usize) {
        self.failures_pending.store(count, Ordering::SeqCst);
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_lists.store(failing, Ordering::SeqCst);
    }

    pub fn set_fail_marks(&self, failing: bool) {
        self.fail_marks.store(failing, Ordering::SeqCst);
    }

    /// Make every list call take `delay` before answering.
    pub fn set_list_delay(&self, delay: Duration) {
        self.list_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Highest number of list calls that were in flight at the same time.
    pub fn max_concurrent_lists(&self) -> usize {
        self.max_lists_in_flight.load(Ordering::SeqCst)
    }

    /// Number of list calls received, including failed ones.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Filters received by list calls, oldest first.
    pub async fn filters(&self) -> Vec<FilterOptions> {
        self.filters.lock().await.clone()
    }

    /// Ids passed to `mark_seen`, successful or not.
    pub async fn seen_calls(&self) -> Vec<u64> {
        self.seen_calls.lock().await.clone()
    }

    /// Ids passed to `mark_read`, successful or not.
    pub async fn read_calls(&self) -> Vec<u64> {
        self.read_calls.lock().await.clone()
    }

    fn unavailable() -> ApiError {
        ApiError::Api {
            status: 503,
            reasons: vec!["Service Unavailable".to_string()],
        }
    }

    fn not_found() -> ApiError {
        ApiError::Api {
            status: 404,
            reasons: vec!["Not found".to_string()],
        }
    }

    fn should_fail_list(&self) -> bool {
        if self.fail_lists.load(Ordering::SeqCst) {
            return true;
        }
        self.failures_pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    async fn update_event(&self, event_id: u64, apply: impl FnOnce(&mut Event)) -> Result<()> {
        if self.fail_marks.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        let mut events = self.events.lock().await;
        match events.iter_mut().find(|e| e.id == event_id) {
            Some(event) => {
                apply(event);
                Ok(())
            }
            None => Err(Self::not_found()),
        }
    }
}

/// Whether `event` satisfies `filter`.
fn matches(filter: &FilterOptions, event: &Event) -> bool {
    let conditions = filter.seen.is_none_or(|seen| event.seen == seen)
        && filter.bounds.iter().all(|bound| {
            let value = match bound.field {
                TimeField::Created => event.created,
                TimeField::Updated => event.last_change(),
            };
            bound.admits(value)
        });
    conditions || filter.include_ids.contains(&event.id)
}

#[async_trait]
impl EventSource for MockEventSource {
    async fn list_events(&self, filter: &FilterOptions, page: u32) -> Result<EventPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.filters.lock().await.push(filter.clone());

        let in_flight = self.lists_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_lists_in_flight
            .fetch_max(in_flight, Ordering::SeqCst);
        let result = self.answer_list(filter, page).await;
        self.lists_in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn mark_seen(&self, event_id: u64) -> Result<()> {
        self.seen_calls.lock().await.push(event_id);
        self.update_event(event_id, |e| e.seen = true).await
    }

    async fn mark_read(&self, event_id: u64) -> Result<()> {
        self.read_calls.lock().await.push(event_id);
        self.update_event(event_id, |e| e.read = true).await
    }
}

impl MockEventSource {
    async fn answer_list(&self, filter: &FilterOptions, page: u32) -> Result<EventPage> {
        let delay = self.list_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if page == 0 {
            return Err(ApiError::InvalidInput(
                "page numbers start at 1".to_string(),
            ));
        }
        if self.should_fail_list() {
            return Err(Self::unavailable());
        }

        let mut selected: Vec<Event> = self
            .events
            .lock()
            .await
            .iter()
            .filter(|e| matches(filter, e))
            .cloned()
            .collect();

        selected.sort_by_key(|e| match filter.order_by {
            TimeField::Created => (e.created, e.id),
            TimeField::Updated => (e.last_change(), e.id),
        });
        if filter.order == SortOrder::Desc {
            selected.reverse();
        }

        let results = selected.len();
        let pages = results.div_ceil(self.page_size).max(1);
        let data = selected
            .into_iter()
            .skip((page as usize - 1) * self.page_size)
            .take(self.page_size)
            .collect();

        Ok(EventPage {
            data,
            page,
            pages: pages as u32,
            results: results as u32,
        })
    }
}
