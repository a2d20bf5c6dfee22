// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Event polling lifecycle.
//!
//! [`PollingController`] starts, stops and resets event polls. Each poll id
//! owns its own [`FilterState`], so two polls never share a cursor:
//! - the first tick fetches everything unseen
//! - later ticks fetch events created at or after the newest one observed,
//!   plus any still-in-progress events so their progress stays fresh, and
//!   follow every page so a burst larger than one page is not skipped

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eventwatch_api::{Event, EventSource, FilterOptions, event_message};
use tokio::sync::{Mutex, broadcast};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::backoff::BackoffPolicy;
use crate::error::Result;
use crate::presenter::{NotificationCenter, NotificationList};
use crate::timer::{PollTask, PollTimer, TickOutcome};

/// Capacity of the new-event broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Lifecycle state of one poll id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Never started.
    Idle,
    /// Ticking.
    Polling,
    /// Stopped. Starting again creates a fresh poll.
    Stopped,
}

impl PollState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PollState::Idle => "idle",
            PollState::Polling => "polling",
            PollState::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for PollState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cursor for one poll: what to request next and what counts as new.
#[derive(Debug, Clone)]
pub struct FilterState {
    started_at: DateTime<Utc>,
    initial_done: bool,
    lower_bound: Option<DateTime<Utc>>,
    /// Ids already observed with `created == lower_bound`.
    ids_at_bound: HashSet<u64>,
    in_progress: BTreeSet<u64>,
}

impl FilterState {
    /// Cursor for a poll started at `started_at`.
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            initial_done: false,
            lower_bound: None,
            ids_at_bound: HashSet::new(),
            in_progress: BTreeSet::new(),
        }
    }

    /// Filter for the next request.
    pub fn next_filter(&self) -> FilterOptions {
        if !self.initial_done {
            return FilterOptions::unseen();
        }
        FilterOptions::created_since(self.lower_bound.unwrap_or(self.started_at))
            .including_ids(self.in_progress.iter().copied())
    }

    /// Whether the next request should follow every page.
    ///
    /// The first unseen fetch only needs the newest page; anything older is
    /// history. Cursor requests must read all pages or events below the new
    /// bound are lost.
    pub fn follows_pages(&self) -> bool {
        self.initial_done
    }

    /// Newest creation time observed so far.
    pub fn lower_bound(&self) -> Option<DateTime<Utc>> {
        self.lower_bound
    }

    /// Ids re-requested on every tick until they complete.
    pub fn in_progress_ids(&self) -> Vec<u64> {
        self.in_progress.iter().copied().collect()
    }

    /// Fold a response into the cursor and report what it contained.
    pub fn observe(&mut self, events: &[Event]) -> TickOutcome {
        let mut new_results = 0;
        for event in events {
            if self.is_new(event) {
                new_results += 1;
            }
            if event.is_in_progress() {
                self.in_progress.insert(event.id);
            } else {
                self.in_progress.remove(&event.id);
            }
        }

        if let Some(newest) = events.iter().map(|e| e.created).max() {
            if self.lower_bound.is_none_or(|bound| newest > bound) {
                self.lower_bound = Some(newest);
                self.ids_at_bound.clear();
            }
            if let Some(bound) = self.lower_bound {
                self.ids_at_bound
                    .extend(events.iter().filter(|e| e.created == bound).map(|e| e.id));
            }
        }
        self.initial_done = true;

        TickOutcome {
            new_results,
            in_progress: self.in_progress.len(),
        }
    }

    fn is_new(&self, event: &Event) -> bool {
        match self.lower_bound {
            None => true,
            Some(bound) if event.created > bound => true,
            Some(bound) if event.created == bound => !self.ids_at_bound.contains(&event.id),
            Some(_) => false,
        }
    }
}

/// Poll task that fetches events and feeds them to the notification list.
pub struct EventPollTask {
    source: Arc<dyn EventSource>,
    state: Mutex<FilterState>,
    list: Arc<Mutex<NotificationList>>,
    events_tx: broadcast::Sender<Event>,
}

impl EventPollTask {
    pub fn new(
        source: Arc<dyn EventSource>,
        list: Arc<Mutex<NotificationList>>,
        events_tx: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            source,
            state: Mutex::new(FilterState::new(Utc::now())),
            list,
            events_tx,
        }
    }
}

impl EventPollTask {
    /// Fetch every event matching `filter`, newest first, without duplicates.
    async fn fetch(&self, filter: &FilterOptions, all_pages: bool) -> Result<Vec<Event>> {
        let mut page = self.source.list_events(filter, 1).await?;
        let mut events = std::mem::take(&mut page.data);
        while all_pages && page.has_next() {
            page = self.source.list_events(filter, page.page + 1).await?;
            events.append(&mut page.data);
        }

        // Pages can shift while new events arrive
        let mut ids = HashSet::new();
        events.retain(|e| ids.insert(e.id));
        Ok(events)
    }
}

#[async_trait]
impl PollTask for EventPollTask {
    async fn tick(&self, cancel: &CancellationToken) -> Result<TickOutcome> {
        let (filter, all_pages) = {
            let state = self.state.lock().await;
            (state.next_filter(), state.follows_pages())
        };
        let events = self.fetch(&filter, all_pages).await?;

        // Checked under the list lock, with no await until the results are
        // published, so a stopped poll never touches the list.
        let mut state = self.state.lock().await;
        let mut list = self.list.lock().await;
        if cancel.is_cancelled() {
            debug!(results = events.len(), "Poll stopped during request, discarding results");
            return Ok(TickOutcome::idle());
        }

        let outcome = state.observe(&events);
        if events.is_empty() {
            return Ok(outcome);
        }

        let by_id: HashMap<u64, Event> = events.iter().map(|e| (e.id, e.clone())).collect();
        let added = list.ingest(events);

        for id in added {
            let Some(event) = by_id.get(&id) else {
                continue;
            };
            match event_message(event) {
                Some(text) => debug!(
                    event_id = event.id,
                    action = %event.action,
                    status = %event.status,
                    "{}",
                    text
                ),
                None => debug!(event_id = event.id, action = %event.action, "Event has no message"),
            }
            // No subscribers is fine.
            let _ = self.events_tx.send(event.clone());
        }

        Ok(outcome)
    }
}

/// Starts, stops and resets event polls that share one notification list.
pub struct PollingController {
    source: Arc<dyn EventSource>,
    timer: PollTimer,
    list: Arc<Mutex<NotificationList>>,
    stopped: Mutex<HashSet<String>>,
    events_tx: broadcast::Sender<Event>,
}

impl PollingController {
    pub fn new(source: Arc<dyn EventSource>, policy: BackoffPolicy) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            source,
            timer: PollTimer::new(policy),
            list: Arc::new(Mutex::new(NotificationList::new())),
            stopped: Mutex::new(HashSet::new()),
            events_tx,
        }
    }

    /// Shared notification list fed by every poll.
    pub fn notifications(&self) -> Arc<Mutex<NotificationList>> {
        self.list.clone()
    }

    /// API-backed operations on the shared list.
    pub fn center(&self) -> NotificationCenter {
        NotificationCenter::new(self.source.clone(), self.list.clone())
    }

    /// Receive every event added to the list after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events_tx.subscribe()
    }

    /// Begin polling `id`. Returns `Ok(false)` if it is already polling.
    ///
    /// Fails when the controller's backoff policy is invalid.
    pub async fn start(&self, id: &str) -> Result<bool> {
        let task = Arc::new(EventPollTask::new(
            self.source.clone(),
            self.list.clone(),
            self.events_tx.clone(),
        ));
        let started = self.timer.start(id, task).await?;
        if started {
            self.stopped.lock().await.remove(id);
            info!(poll_id = %id, "Event polling started");
        }
        Ok(started)
    }

    /// Stop polling `id`. Unknown ids are ignored.
    pub async fn stop(&self, id: &str) -> bool {
        let stopped = self.timer.stop(id).await;
        if stopped {
            // A tick past its cancellation check holds the list until it
            // has published.
            drop(self.list.lock().await);
            self.stopped.lock().await.insert(id.to_string());
            info!(poll_id = %id, "Event polling stopped");
        }
        stopped
    }

    /// Signal that activity is expected so `id` polls quickly again.
    pub async fn reset(&self, id: &str) -> bool {
        self.timer.reset(id).await
    }

    pub async fn state(&self, id: &str) -> PollState {
        if self.timer.is_active(id).await {
            PollState::Polling
        } else if self.stopped.lock().await.contains(id) {
            PollState::Stopped
        } else {
            PollState::Idle
        }
    }

    /// Interval before the next request for `id`.
    pub async fn interval(&self, id: &str) -> Option<Duration> {
        self.timer.interval(id).await
    }

    /// Completed requests for `id`.
    pub async fn tick_count(&self, id: &str) -> Option<u64> {
        self.timer.tick_count(id).await
    }

    /// Stop every poll.
    pub async fn shutdown(&self) {
        let ids = self.timer.active_ids().await;
        self.timer.stop_all().await;
        drop(self.list.lock().await);
        self.stopped.lock().await.extend(ids);
        debug!("All event polls stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use eventwatch_api::{Comparison, EventAction, EventStatus, TimeField};

    fn at(second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, second).unwrap()
    }

    fn event(id: u64, second: u32) -> Event {
        Event::new(id, EventAction::VolumeCreate, EventStatus::Finished, at(second))
    }

    #[test]
    fn test_first_filter_is_unseen() {
        let state = FilterState::new(at(0));
        assert_eq!(state.next_filter(), FilterOptions::unseen());
    }

    #[test]
    fn test_only_cursor_requests_follow_pages() {
        let mut state = FilterState::new(at(0));
        assert!(!state.follows_pages());
        state.observe(&[event(1, 10)]);
        assert!(state.follows_pages());
    }

    #[test]
    fn test_empty_initial_fetch_polls_from_start_time() {
        let mut state = FilterState::new(at(5));
        let outcome = state.observe(&[]);
        assert!(!outcome.is_activity());
        assert_eq!(state.next_filter(), FilterOptions::created_since(at(5)));
    }

    #[test]
    fn test_lower_bound_tracks_newest_created() {
        let mut state = FilterState::new(at(0));
        let outcome = state.observe(&[event(3, 30), event(2, 20)]);
        assert_eq!(outcome.new_results, 2);
        assert_eq!(state.lower_bound(), Some(at(30)));

        let filter = state.next_filter();
        assert_eq!(filter.created_lower_bound(), Some(at(30)));
        assert!(filter.bounds.iter().any(|b| b.field == TimeField::Created
            && b.comparison == Comparison::AtOrAfter));
    }

    #[test]
    fn test_events_at_bound_are_not_counted_twice() {
        let mut state = FilterState::new(at(0));
        state.observe(&[event(3, 30)]);

        let outcome = state.observe(&[event(3, 30)]);
        assert_eq!(outcome.new_results, 0);

        let outcome = state.observe(&[event(4, 30), event(3, 30)]);
        assert_eq!(outcome.new_results, 1);
        assert_eq!(state.lower_bound(), Some(at(30)));
    }

    #[test]
    fn test_lower_bound_never_decreases() {
        let mut state = FilterState::new(at(0));
        state.observe(&[event(3, 30)]);
        state.observe(&[event(1, 10)]);
        assert_eq!(state.lower_bound(), Some(at(30)));
    }

    #[test]
    fn test_in_progress_ids_are_included_until_complete() {
        let mut state = FilterState::new(at(0));
        let running = event(7, 10).with_percent_complete(30);
        let outcome = state.observe(&[running]);
        assert_eq!(outcome.in_progress, 1);
        assert_eq!(state.next_filter().include_ids, vec![7]);

        let outcome = state.observe(&[event(7, 10).with_percent_complete(100)]);
        assert_eq!(outcome, TickOutcome::idle());
        assert!(state.next_filter().include_ids.is_empty());
    }

    #[test]
    fn test_poll_state_display() {
        assert_eq!(PollState::Polling.to_string(), "polling");
        assert_eq!(PollState::Stopped.as_str(), "stopped");
    }
}
