// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! NotificationCenter operations against the in-memory event source.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use eventwatch_api::{Comparison, Event, EventAction, EventSource, EventStatus, FilterOptions};
use eventwatch_poller::mock::MockEventSource;
use eventwatch_poller::{NotificationCenter, NotificationList, PollerError};
use tokio::sync::Mutex;

fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap()
}

fn event(id: u64, minute: u32) -> Event {
    Event::new(id, EventAction::DomainCreate, EventStatus::Notification, at(minute))
}

/// Center whose list already shows the source's newest page.
async fn center_with(source: Arc<MockEventSource>) -> NotificationCenter {
    let page = source.list_events(&FilterOptions::new(), 1).await.unwrap();
    let list = Arc::new(Mutex::new(NotificationList::new()));
    list.lock().await.ingest(page.data);
    NotificationCenter::new(source, list)
}

fn shown_ids(list: &NotificationList) -> Vec<u64> {
    list.events().map(|e| e.id).collect()
}

#[tokio::test]
async fn test_open_marks_only_most_recent_unseen() {
    let source = Arc::new(MockEventSource::with_events(vec![event(1, 1), event(2, 2)]));
    let center = center_with(source.clone()).await;

    assert_eq!(center.open().await.unwrap(), Some(2));
    assert_eq!(source.seen_calls().await, vec![2]);

    let list = center.list();
    let list = list.lock().await;
    assert!(list.is_open());
    assert!(list.get(2).unwrap().seen);
    assert!(!list.get(1).unwrap().seen);
    assert_eq!(list.unseen_count(), 1);
}

#[tokio::test]
async fn test_open_with_nothing_unseen_makes_no_request() {
    let source = Arc::new(MockEventSource::with_events(vec![event(1, 1).with_seen(true)]));
    let center = center_with(source.clone()).await;

    assert_eq!(center.open().await.unwrap(), None);
    assert!(source.seen_calls().await.is_empty());
}

#[tokio::test]
async fn test_failed_mark_seen_is_reported_and_not_applied() {
    let source = Arc::new(MockEventSource::with_events(vec![event(1, 1)]));
    let center = center_with(source.clone()).await;
    source.set_fail_marks(true);

    let err = center.open().await.unwrap_err();
    assert!(matches!(err, PollerError::Api(_)));

    let list = center.list();
    let list = list.lock().await;
    assert!(!list.get(1).unwrap().seen);
    assert!(!list.is_open());
}

#[tokio::test]
async fn test_mark_read() {
    let source = Arc::new(MockEventSource::with_events(vec![event(1, 1), event(2, 2)]));
    let center = center_with(source.clone()).await;

    center.mark_read(1).await.unwrap();
    assert!(center.list().lock().await.get(1).unwrap().read);
    assert!(source.event(1).await.unwrap().read);

    source.set_fail_marks(true);
    assert!(center.mark_read(2).await.is_err());
    assert!(!center.list().lock().await.get(2).unwrap().read);
}

#[tokio::test]
async fn test_show_more_requests_only_older_events() {
    let source = Arc::new(MockEventSource::with_page_size(2));
    for id in 1..=5 {
        source.push(event(id, id as u32 * 10)).await;
    }
    let center = center_with(source.clone()).await;
    assert_eq!(shown_ids(&*center.list().lock().await), vec![5, 4]);

    let added = center.show_more().await.unwrap();
    assert_eq!(added, 2);

    let filter = source.filters().await.pop().unwrap();
    assert_eq!(filter.bounds.len(), 1);
    assert_eq!(filter.bounds[0].comparison, Comparison::Before);
    assert_eq!(filter.bounds[0].at, at(40));

    let list = center.list();
    let list = list.lock().await;
    assert_eq!(shown_ids(&list), vec![5, 4, 3, 2]);
    assert!(list.has_more());
}

#[tokio::test]
async fn test_show_more_never_duplicates_and_stops_at_the_end() {
    let source = Arc::new(MockEventSource::with_page_size(2));
    for id in 1..=3 {
        source.push(event(id, id as u32 * 10)).await;
    }
    let center = center_with(source.clone()).await;

    assert_eq!(center.show_more().await.unwrap(), 1);
    assert!(!center.list().lock().await.has_more());

    // Nothing older remains
    assert_eq!(center.show_more().await.unwrap(), 0);

    let list = center.list();
    let list = list.lock().await;
    assert_eq!(shown_ids(&list), vec![3, 2, 1]);
    assert_eq!(list.len(), 3);
}

#[test]
fn test_show_more_ignores_events_not_older_than_shown() {
    let mut list = NotificationList::new();
    list.ingest(vec![event(9, 30)]);
    let before = list.oldest_created();

    // A misbehaving page with a newer and an equal timestamp
    let added = list.merge_older(before, vec![event(10, 40), event(11, 30), event(12, 20)]);
    assert_eq!(added, 1);
    assert_eq!(shown_ids(&list), vec![9, 12]);
}

#[tokio::test]
async fn test_show_more_failure_is_returned() {
    let source = Arc::new(MockEventSource::with_events(vec![event(1, 1)]));
    let center = center_with(source.clone()).await;
    source.fail_next(1);

    assert!(center.show_more().await.is_err());
    assert_eq!(center.list().lock().await.len(), 1);
}
