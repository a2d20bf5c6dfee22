// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Notification list state.
//!
//! [`NotificationList`] holds the events shown in the notification menu,
//! newest first, and answers which event opening the menu should mark as seen
//! and which filter fetches the next page of history. It performs no I/O.
//!
//! [`NotificationCenter`] pairs a shared list with an [`EventSource`] for the
//! operations that call the API (open, mark read, show more).

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use eventwatch_api::{Event, EventSource, FilterOptions};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::Result;

/// Events currently held by the notification menu.
///
/// Display order is reverse insertion order: polled batches (newest first)
/// are appended so that the newest event ends up first, and older history is
/// prepended so that it ends up last. Events are never re-sorted by timestamp.
#[derive(Debug, Default)]
pub struct NotificationList {
    /// Event ids, oldest insertion at the front.
    order: VecDeque<u64>,
    events: HashMap<u64, Event>,
    open: bool,
    history_exhausted: bool,
}

impl NotificationList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a newest-first batch from a poll.
    ///
    /// Known events are updated in place; unknown ones are added ahead of
    /// everything already shown. Returns the ids added, newest first.
    pub fn ingest(&mut self, batch: Vec<Event>) -> Vec<u64> {
        let mut added = Vec::new();
        for event in batch.into_iter().rev() {
            let id = event.id;
            if let Some(existing) = self.events.get_mut(&id) {
                *existing = event;
                continue;
            }
            self.order.push_back(id);
            self.events.insert(id, event);
            added.push(id);
        }
        added.reverse();
        added
    }

    /// Merge a page of older history, keeping only events created before
    /// `before` that are not already shown. Returns how many were added.
    pub fn merge_older(&mut self, before: Option<DateTime<Utc>>, page: Vec<Event>) -> usize {
        let mut added = 0;
        for event in page {
            if before.is_some_and(|bound| event.created >= bound) {
                continue;
            }
            if self.events.contains_key(&event.id) {
                continue;
            }
            self.order.push_front(event.id);
            self.events.insert(event.id, event);
            added += 1;
        }
        added
    }

    /// Events in display order, newest first.
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.order.iter().rev().filter_map(|id| self.events.get(id))
    }

    /// Owned copy of the events in display order.
    pub fn snapshot(&self) -> Vec<Event> {
        self.events().cloned().collect()
    }

    pub fn get(&self, event_id: u64) -> Option<&Event> {
        self.events.get(&event_id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn unseen_count(&self) -> usize {
        self.events.values().filter(|e| !e.seen).count()
    }

    /// Events still reporting progress below 100%.
    pub fn in_progress(&self) -> Vec<&Event> {
        self.events().filter(|e| e.is_in_progress()).collect()
    }

    /// Creation time of the oldest event shown.
    pub fn oldest_created(&self) -> Option<DateTime<Utc>> {
        self.events.values().map(|e| e.created).min()
    }

    /// Unseen event with the latest creation time.
    ///
    /// Ties go to the event displayed first.
    pub fn most_recent_unseen(&self) -> Option<u64> {
        let mut best: Option<&Event> = None;
        for event in self.events().filter(|e| !e.seen) {
            match best {
                Some(current) if current.created >= event.created => {}
                _ => best = Some(event),
            }
        }
        best.map(|e| e.id)
    }

    /// Filter for the next page of older history.
    pub fn history_filter(&self) -> FilterOptions {
        match self.oldest_created() {
            Some(oldest) => FilterOptions::created_before(oldest),
            None => FilterOptions::new(),
        }
    }

    /// Whether "show more" may still return something.
    pub fn has_more(&self) -> bool {
        !self.history_exhausted
    }

    pub fn set_history_exhausted(&mut self, exhausted: bool) {
        self.history_exhausted = exhausted;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Mark the menu open and return the event that should be marked seen.
    pub fn open(&mut self) -> Option<u64> {
        self.open = true;
        self.most_recent_unseen()
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    /// Flip the local seen flag. Returns `false` for unknown ids.
    pub fn set_seen(&mut self, event_id: u64) -> bool {
        match self.events.get_mut(&event_id) {
            Some(event) => {
                event.seen = true;
                true
            }
            None => false,
        }
    }

    /// Flip the local read flag. Returns `false` for unknown ids.
    pub fn set_read(&mut self, event_id: u64) -> bool {
        match self.events.get_mut(&event_id) {
            Some(event) => {
                event.read = true;
                true
            }
            None => false,
        }
    }
}

/// API-backed operations on a shared [`NotificationList`].
///
/// Local flags only change after the corresponding request succeeds; failures
/// are returned to the caller.
#[derive(Clone)]
pub struct NotificationCenter {
    source: Arc<dyn EventSource>,
    list: Arc<Mutex<NotificationList>>,
}

impl NotificationCenter {
    pub fn new(source: Arc<dyn EventSource>, list: Arc<Mutex<NotificationList>>) -> Self {
        Self { source, list }
    }

    pub fn list(&self) -> Arc<Mutex<NotificationList>> {
        self.list.clone()
    }

    /// Open the menu and mark the most recent unseen event as seen.
    ///
    /// Returns the id that was marked, if any. When the request fails the
    /// menu stays closed and nothing is marked.
    pub async fn open(&self) -> Result<Option<u64>> {
        let target = {
            let mut list = self.list.lock().await;
            match list.most_recent_unseen() {
                Some(event_id) => event_id,
                None => {
                    list.open();
                    return Ok(None);
                }
            }
        };

        if let Err(e) = self.source.mark_seen(target).await {
            warn!(event_id = target, error = %e, "Failed to mark event as seen");
            return Err(e.into());
        }
        let mut list = self.list.lock().await;
        list.open();
        list.set_seen(target);
        debug!(event_id = target, "Marked most recent event as seen");
        Ok(Some(target))
    }

    pub async fn close(&self) {
        self.list.lock().await.close();
    }

    /// Acknowledge one event.
    pub async fn mark_read(&self, event_id: u64) -> Result<()> {
        if let Err(e) = self.source.mark_read(event_id).await {
            warn!(event_id, error = %e, "Failed to mark event as read");
            return Err(e.into());
        }
        self.list.lock().await.set_read(event_id);
        Ok(())
    }

    /// Fetch the next page of events older than everything shown.
    ///
    /// Returns how many events were added.
    pub async fn show_more(&self) -> Result<usize> {
        let (filter, before) = {
            let list = self.list.lock().await;
            (list.history_filter(), list.oldest_created())
        };

        let page = self.source.list_events(&filter, 1).await?;
        let has_next = page.has_next();

        let mut list = self.list.lock().await;
        let added = list.merge_older(before, page.data);
        list.set_history_exhausted(added == 0 || !has_next);
        debug!(added, has_more = list.has_more(), "Loaded older events");
        Ok(added)
    }
}
