// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Keyed registry of backoff-driven poll loops.
//!
//! Each registration owns one background task that runs its [`PollTask`]
//! immediately, then waits for the current backoff interval before running it
//! again. Ticks for one id never overlap: the next wait only starts once the
//! previous tick has finished.
//!
//! A registration can be:
//! - stopped, which prevents any further tick (an in-flight tick is allowed to
//!   finish but its outcome is discarded, and a later start of the same id
//!   waits for it)
//! - reset, which drops the interval back to its initial value and restarts
//!   the current wait

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info_span, warn};

use crate::backoff::{Backoff, BackoffPolicy};
use crate::error::Result;

/// What a single tick produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickOutcome {
    /// Results not seen by earlier ticks.
    pub new_results: usize,
    /// Tracked operations still running on the server.
    pub in_progress: usize,
}

impl TickOutcome {
    /// Nothing new, nothing running.
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn with_new(new_results: usize) -> Self {
        Self {
            new_results,
            in_progress: 0,
        }
    }

    /// Activity resets the backoff.
    pub fn is_activity(&self) -> bool {
        self.new_results > 0 || self.in_progress > 0
    }
}

/// Work performed on every tick of a poll.
#[async_trait]
pub trait PollTask: Send + Sync {
    /// Run one tick.
    ///
    /// `cancel` fires when the poll is stopped. A tick that finishes after
    /// that must not publish its results.
    async fn tick(&self, cancel: &CancellationToken) -> Result<TickOutcome>;
}

/// Adapter that lets a closure returning a future act as a [`PollTask`].
///
/// The closure does not receive the cancellation token.
pub struct FnTask<F>(pub F);

#[async_trait]
impl<F, Fut> PollTask for FnTask<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<TickOutcome>> + Send + 'static,
{
    async fn tick(&self, _cancel: &CancellationToken) -> Result<TickOutcome> {
        (self.0)().await
    }
}

/// Handles held for one running poll loop.
struct Registration {
    cancel: CancellationToken,
    reset: Arc<Notify>,
    interval: watch::Receiver<Duration>,
    ticks: Arc<AtomicU64>,
    handle: JoinHandle<()>,
}

impl Registration {
    fn is_running(&self) -> bool {
        !self.cancel.is_cancelled() && !self.handle.is_finished()
    }
}

/// Registry of independent poll loops keyed by string id.
pub struct PollTimer {
    policy: BackoffPolicy,
    registrations: Mutex<HashMap<String, Registration>>,
}

impl PollTimer {
    /// Create a timer whose polls use `policy` unless started with their own.
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            policy,
            registrations: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Start polling `id` with the default policy.
    ///
    /// Returns `Ok(false)` when `id` is already polling; the existing loop is
    /// left untouched.
    pub async fn start(&self, id: impl Into<String>, task: Arc<dyn PollTask>) -> Result<bool> {
        self.start_with_policy(id, task, self.policy).await
    }

    /// Start polling `id` with an explicit policy.
    ///
    /// Fails with [`PollerError::Config`](crate::PollerError::Config) when the
    /// policy is invalid. If a stopped loop for `id` still has a tick in
    /// flight, this waits for it before the new loop sends its first request.
    pub async fn start_with_policy(
        &self,
        id: impl Into<String>,
        task: Arc<dyn PollTask>,
        policy: BackoffPolicy,
    ) -> Result<bool> {
        policy.validate()?;

        let id = id.into();
        let mut registrations = self.registrations.lock().await;

        if registrations.get(&id).is_some_and(Registration::is_running) {
            debug!(poll_id = %id, "Poll already running, ignoring start");
            return Ok(false);
        }

        // The registrations lock is held so no other start for `id` can slip
        // in while the old loop drains.
        if let Some(previous) = registrations.remove(&id) {
            previous.cancel.cancel();
            if !previous.handle.is_finished() {
                debug!(poll_id = %id, "Waiting for stopped poll to finish its tick");
            }
            if let Err(e) = previous.handle.await {
                warn!(poll_id = %id, error = %e, "Stopped poll loop did not exit cleanly");
            }
        }

        let cancel = CancellationToken::new();
        let reset = Arc::new(Notify::new());
        let (interval_tx, interval_rx) = watch::channel(policy.initial);
        let ticks = Arc::new(AtomicU64::new(0));

        let poll_loop = PollLoop {
            task,
            backoff: Backoff::new(policy),
            cancel: cancel.clone(),
            reset: reset.clone(),
            interval: interval_tx,
            ticks: ticks.clone(),
        };
        let span = info_span!("poll", poll_id = %id);
        let handle = tokio::spawn(poll_loop.run().instrument(span));

        registrations.insert(
            id,
            Registration {
                cancel,
                reset,
                interval: interval_rx,
                ticks,
                handle,
            },
        );
        Ok(true)
    }

    /// Stop polling `id`. Returns `false` for unknown or already stopped ids.
    ///
    /// The registration is kept until the next start so that start can wait
    /// for a tick still in flight.
    pub async fn stop(&self, id: &str) -> bool {
        match self.registrations.lock().await.get(id) {
            Some(registration) if !registration.cancel.is_cancelled() => {
                registration.cancel.cancel();
                debug!(poll_id = %id, "Poll stopped");
                true
            }
            _ => false,
        }
    }

    /// Drop `id` back to its initial interval and restart the current wait.
    ///
    /// Returns `false` for unknown ids.
    pub async fn reset(&self, id: &str) -> bool {
        match self.registrations.lock().await.get(id) {
            Some(registration) if registration.is_running() => {
                registration.reset.notify_one();
                true
            }
            _ => false,
        }
    }

    /// Interval that will be used for the next wait of `id`.
    pub async fn interval(&self, id: &str) -> Option<Duration> {
        self.registrations
            .lock()
            .await
            .get(id)
            .filter(|r| r.is_running())
            .map(|r| *r.interval.borrow())
    }

    /// Completed ticks for `id`, including failed ones.
    pub async fn tick_count(&self, id: &str) -> Option<u64> {
        self.registrations
            .lock()
            .await
            .get(id)
            .filter(|r| r.is_running())
            .map(|r| r.ticks.load(Ordering::SeqCst))
    }

    pub async fn is_active(&self, id: &str) -> bool {
        self.registrations
            .lock()
            .await
            .get(id)
            .is_some_and(Registration::is_running)
    }

    /// Ids with a running loop, sorted.
    pub async fn active_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .registrations
            .lock()
            .await
            .iter()
            .filter(|(_, r)| r.is_running())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Stop every registration.
    pub async fn stop_all(&self) {
        let registrations = self.registrations.lock().await;
        for (id, registration) in registrations.iter() {
            if !registration.cancel.is_cancelled() {
                registration.cancel.cancel();
                debug!(poll_id = %id, "Poll stopped");
            }
        }
    }
}

impl Drop for PollTimer {
    fn drop(&mut self) {
        for registration in self.registrations.get_mut().values() {
            registration.cancel.cancel();
        }
    }
}

/// State moved into the spawned task for one registration.
struct PollLoop {
    task: Arc<dyn PollTask>,
    backoff: Backoff,
    cancel: CancellationToken,
    reset: Arc<Notify>,
    interval: watch::Sender<Duration>,
    ticks: Arc<AtomicU64>,
}

impl PollLoop {
    async fn run(mut self) {
        debug!(
            initial_ms = self.backoff.policy().initial.as_millis() as u64,
            max_ms = self.backoff.policy().max.as_millis() as u64,
            "Poll loop started"
        );

        loop {
            // The tick is not raced against cancellation so a request that
            // already left is allowed to complete.
            let outcome = self.task.tick(&self.cancel).await;
            if self.cancel.is_cancelled() {
                break;
            }
            self.ticks.fetch_add(1, Ordering::SeqCst);

            let next = match outcome {
                Ok(outcome) if outcome.is_activity() => {
                    debug!(
                        new_results = outcome.new_results,
                        in_progress = outcome.in_progress,
                        "Poll activity, resetting interval"
                    );
                    self.backoff.reset()
                }
                Ok(_) => self.backoff.advance(),
                Err(e) => {
                    warn!(error = %e, "Poll tick failed");
                    self.backoff.advance()
                }
            };
            self.interval.send_replace(next);

            if !self.wait(next).await {
                break;
            }
        }

        debug!("Poll loop exited");
    }

    /// Sleep for `interval`, restarting on reset. Returns `false` on cancel.
    async fn wait(&mut self, mut interval: Duration) -> bool {
        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => return false,

                _ = self.reset.notified() => {
                    interval = self.backoff.reset();
                    self.interval.send_replace(interval);
                    debug!(interval_ms = interval.as_millis() as u64, "Poll interval reset");
                }

                _ = tokio::time::sleep(interval) => return true,
            }
        }
    }
}
