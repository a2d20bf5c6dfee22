// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Timing behaviour of PollTimer under a paused clock.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use eventwatch_poller::{BackoffPolicy, FnTask, PollTask, PollTimer, PollerError, TickOutcome};
use tokio::time::{Instant, sleep, sleep_until};

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

/// Task that records each tick and returns scripted outcomes, then idles.
fn scripted(counter: Arc<AtomicUsize>, script: Vec<TickOutcome>) -> Arc<dyn PollTask> {
    let script = Arc::new(script);
    Arc::new(FnTask(move || {
        let counter = counter.clone();
        let script = script.clone();
        async move {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            Ok(script.get(n).copied().unwrap_or_default())
        }
    }))
}

#[tokio::test(start_paused = true)]
async fn test_idle_polls_back_off_to_ceiling() {
    let start = Instant::now();
    let timer = PollTimer::new(BackoffPolicy::default());
    let ticks = Arc::new(AtomicUsize::new(0));
    timer.start("feed", scripted(ticks.clone(), vec![])).await.unwrap();

    // Ticks at 0s, 4s, 12s, 28s, 60s, 92s
    let expected = [(1, 1), (3_999, 1), (4_001, 2), (12_001, 3), (28_001, 4), (60_001, 5), (92_001, 6)];
    for (at, count) in expected {
        sleep_until(start + ms(at)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), count, "at {}ms", at);
    }
    assert_eq!(timer.interval("feed").await, Some(ms(32_000)));
}

#[tokio::test(start_paused = true)]
async fn test_new_results_reset_interval() {
    let start = Instant::now();
    let timer = PollTimer::new(BackoffPolicy::default());
    let ticks = Arc::new(AtomicUsize::new(0));

    // idle, idle, activity, idle...
    let script = vec![TickOutcome::idle(), TickOutcome::idle(), TickOutcome::with_new(3)];
    timer.start("feed", scripted(ticks.clone(), script)).await.unwrap();

    // 0s idle -> 4s idle -> 12s activity -> next at 14s
    sleep_until(start + ms(12_001)).await;
    assert_eq!(ticks.load(Ordering::SeqCst), 3);
    assert_eq!(timer.interval("feed").await, Some(ms(2_000)));

    sleep_until(start + ms(14_001)).await;
    assert_eq!(ticks.load(Ordering::SeqCst), 4);
    assert_eq!(timer.interval("feed").await, Some(ms(4_000)));
}

#[tokio::test(start_paused = true)]
async fn test_reset_restarts_wait_at_initial_interval() {
    let start = Instant::now();
    let timer = PollTimer::new(BackoffPolicy::default());
    let ticks = Arc::new(AtomicUsize::new(0));
    timer.start("feed", scripted(ticks.clone(), vec![])).await.unwrap();

    // Ticks at 0s and 4s; the wait after that is 8s
    sleep_until(start + ms(5_000)).await;
    assert_eq!(ticks.load(Ordering::SeqCst), 2);
    assert_eq!(timer.interval("feed").await, Some(ms(8_000)));

    assert!(timer.reset("feed").await);
    sleep(ms(1)).await;
    assert_eq!(timer.interval("feed").await, Some(ms(2_000)));

    // Next tick 2s after the reset instead of at 12s
    sleep_until(start + ms(7_002)).await;
    assert_eq!(ticks.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_stop_prevents_further_ticks() {
    let timer = PollTimer::new(BackoffPolicy::default());
    let ticks = Arc::new(AtomicUsize::new(0));
    timer.start("feed", scripted(ticks.clone(), vec![])).await.unwrap();

    sleep(ms(1)).await;
    assert!(timer.stop("feed").await);
    assert!(!timer.is_active("feed").await);

    sleep(ms(120_000)).await;
    assert_eq!(ticks.load(Ordering::SeqCst), 1);
    assert!(timer.active_ids().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_restart_after_stop_begins_fresh() {
    let timer = PollTimer::new(BackoffPolicy::default());
    let ticks = Arc::new(AtomicUsize::new(0));
    timer.start("feed", scripted(ticks.clone(), vec![])).await.unwrap();
    sleep(ms(30_000)).await;
    timer.stop("feed").await;

    assert!(timer.start("feed", scripted(ticks.clone(), vec![])).await.unwrap());
    sleep(ms(1)).await;
    assert_eq!(timer.interval("feed").await, Some(ms(4_000)));
    assert_eq!(timer.tick_count("feed").await, Some(1));
}

#[tokio::test(start_paused = true)]
async fn test_ticks_never_overlap() {
    let timer = PollTimer::new(BackoffPolicy::new(ms(100), ms(100)).with_multiplier(2));
    let running = Arc::new(AtomicUsize::new(0));
    let max_running = Arc::new(AtomicUsize::new(0));
    let ticks = Arc::new(AtomicUsize::new(0));

    let task: Arc<dyn PollTask> = {
        let (running, max_running, ticks) = (running.clone(), max_running.clone(), ticks.clone());
        Arc::new(FnTask(move || {
            let (running, max_running, ticks) = (running.clone(), max_running.clone(), ticks.clone());
            async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                max_running.fetch_max(now, Ordering::SeqCst);
                // Slower than the interval
                sleep(ms(350)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                ticks.fetch_add(1, Ordering::SeqCst);
                Ok(TickOutcome::with_new(1))
            }
        }))
    };
    timer.start("slow", task).await.unwrap();

    sleep(ms(2_000)).await;
    assert_eq!(max_running.load(Ordering::SeqCst), 1);
    // Each cycle is 350ms of work plus 100ms of wait
    assert_eq!(ticks.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn test_errors_back_off_and_keep_polling() {
    let start = Instant::now();
    let timer = PollTimer::new(BackoffPolicy::default());
    let attempts = Arc::new(AtomicUsize::new(0));
    let task: Arc<dyn PollTask> = {
        let attempts = attempts.clone();
        Arc::new(FnTask(move || {
            let attempts = attempts.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<TickOutcome, _>(PollerError::Task("unreachable".to_string()))
            }
        }))
    };
    timer.start("feed", task).await.unwrap();

    sleep_until(start + ms(12_001)).await;
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert!(timer.is_active("feed").await);
    assert_eq!(timer.interval("feed").await, Some(ms(16_000)));
}

#[tokio::test(start_paused = true)]
async fn test_independent_ids() {
    let timer = PollTimer::new(BackoffPolicy::default());
    let a = Arc::new(AtomicUsize::new(0));
    let b = Arc::new(AtomicUsize::new(0));
    timer.start("a", scripted(a.clone(), vec![])).await.unwrap();
    timer.start("b", scripted(b.clone(), vec![])).await.unwrap();

    sleep(ms(1)).await;
    timer.stop("a").await;
    sleep(ms(10_000)).await;

    assert_eq!(a.load(Ordering::SeqCst), 1);
    assert_eq!(b.load(Ordering::SeqCst), 2);
    assert_eq!(timer.active_ids().await, vec!["b".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_restart_never_overlaps_a_stopped_tick() {
    let timer = PollTimer::new(BackoffPolicy::default());
    let running = Arc::new(AtomicUsize::new(0));
    let max_running = Arc::new(AtomicUsize::new(0));

    let slow_task = || -> Arc<dyn PollTask> {
        let (running, max_running) = (running.clone(), max_running.clone());
        Arc::new(FnTask(move || {
            let (running, max_running) = (running.clone(), max_running.clone());
            async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                max_running.fetch_max(now, Ordering::SeqCst);
                sleep(ms(1_000)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                Ok(TickOutcome::idle())
            }
        }))
    };

    timer.start("feed", slow_task()).await.unwrap();
    sleep(ms(50)).await;
    assert!(timer.stop("feed").await);
    assert!(timer.start("feed", slow_task()).await.unwrap());

    sleep(ms(3_000)).await;
    assert_eq!(max_running.load(Ordering::SeqCst), 1);
    assert!(timer.is_active("feed").await);
}
