// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Adaptive polling interval.
//!
//! A poll starts at the initial interval and grows after every tick that
//! produced nothing, up to a ceiling. Any activity snaps it back down.

use std::time::Duration;

use crate::error::{PollerError, Result};

/// Default wait before the second poll.
pub const DEFAULT_INITIAL_INTERVAL: Duration = Duration::from_millis(2_000);

/// Default ceiling for the poll interval.
pub const DEFAULT_MAX_INTERVAL: Duration = Duration::from_millis(32_000);

/// Default growth factor for exponential backoff.
pub const DEFAULT_MULTIPLIER: u32 = 2;

/// How the interval grows after an idle tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackoffStrategy {
    /// `interval * multiplier`
    #[default]
    Exponential,
    /// `interval + initial`
    Linear,
}

impl BackoffStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackoffStrategy::Exponential => "exponential",
            BackoffStrategy::Linear => "linear",
        }
    }
}

impl std::str::FromStr for BackoffStrategy {
    type Err = PollerError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "exponential" | "exp" => Ok(BackoffStrategy::Exponential),
            "linear" => Ok(BackoffStrategy::Linear),
            other => Err(PollerError::Config(format!(
                "unknown backoff strategy '{}' (expected exponential or linear)",
                other
            ))),
        }
    }
}

/// Parameters shared by every poll started with them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub max: Duration,
    pub multiplier: u32,
    pub strategy: BackoffStrategy,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: DEFAULT_INITIAL_INTERVAL,
            max: DEFAULT_MAX_INTERVAL,
            multiplier: DEFAULT_MULTIPLIER,
            strategy: BackoffStrategy::Exponential,
        }
    }
}

impl BackoffPolicy {
    /// Exponential policy with the default multiplier.
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            ..Self::default()
        }
    }

    pub fn with_multiplier(mut self, multiplier: u32) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn with_strategy(mut self, strategy: BackoffStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Reject policies that could spin or never grow.
    pub fn validate(&self) -> Result<()> {
        if self.initial.is_zero() {
            return Err(PollerError::Config(
                "initial poll interval must be positive".to_string(),
            ));
        }
        if self.max < self.initial {
            return Err(PollerError::Config(format!(
                "max poll interval ({:?}) is below the initial interval ({:?})",
                self.max, self.initial
            )));
        }
        if self.strategy == BackoffStrategy::Exponential && self.multiplier < 2 {
            return Err(PollerError::Config(
                "exponential backoff multiplier must be at least 2".to_string(),
            ));
        }
        Ok(())
    }

    /// Interval following `current` after an idle tick.
    fn grow(&self, current: Duration) -> Duration {
        let next = match self.strategy {
            BackoffStrategy::Exponential => current.saturating_mul(self.multiplier.max(1)),
            BackoffStrategy::Linear => current.saturating_add(self.initial),
        };
        next.clamp(self.initial, self.max.max(self.initial))
    }
}

/// Interval state for one poll.
///
/// The interval never drops below the initial value or rises above the
/// ceiling, and it never shrinks except through [`Backoff::reset`].
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: BackoffPolicy,
    current: Duration,
    idle_ticks: u32,
}

impl Backoff {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            current: policy.initial,
            policy,
            idle_ticks: 0,
        }
    }

    /// Interval for the next wait.
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Consecutive ticks without activity.
    pub fn idle_ticks(&self) -> u32 {
        self.idle_ticks
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Grow the interval after a tick that produced nothing.
    pub fn advance(&mut self) -> Duration {
        self.idle_ticks = self.idle_ticks.saturating_add(1);
        self.current = self.policy.grow(self.current);
        self.current
    }

    /// Return to the initial interval.
    pub fn reset(&mut self) -> Duration {
        self.idle_ticks = 0;
        self.current = self.policy.initial;
        self.current
    }

    /// Reset on activity, otherwise advance.
    pub fn record(&mut self, activity: bool) -> Duration {
        if activity { self.reset() } else { self.advance() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_exponential_growth_reaches_ceiling() {
        let mut backoff = Backoff::new(BackoffPolicy::default());
        assert_eq!(backoff.current(), ms(2_000));

        let seen: Vec<Duration> = (0..6).map(|_| backoff.advance()).collect();
        assert_eq!(
            seen,
            vec![ms(4_000), ms(8_000), ms(16_000), ms(32_000), ms(32_000), ms(32_000)]
        );
        assert_eq!(backoff.idle_ticks(), 6);
    }

    #[test]
    fn test_linear_growth() {
        let policy = BackoffPolicy::new(ms(1_000), ms(3_500)).with_strategy(BackoffStrategy::Linear);
        let mut backoff = Backoff::new(policy);

        assert_eq!(backoff.advance(), ms(2_000));
        assert_eq!(backoff.advance(), ms(3_000));
        assert_eq!(backoff.advance(), ms(3_500));
        assert_eq!(backoff.advance(), ms(3_500));
    }

    #[test]
    fn test_reset_returns_to_initial() {
        let mut backoff = Backoff::new(BackoffPolicy::default());
        backoff.advance();
        backoff.advance();

        assert_eq!(backoff.reset(), ms(2_000));
        assert_eq!(backoff.idle_ticks(), 0);
    }

    #[test]
    fn test_record_activity() {
        let mut backoff = Backoff::new(BackoffPolicy::default());
        assert_eq!(backoff.record(false), ms(4_000));
        assert_eq!(backoff.record(false), ms(8_000));
        assert_eq!(backoff.record(true), ms(2_000));
    }

    #[test]
    fn test_interval_is_monotonic_between_resets() {
        let policy = BackoffPolicy::new(ms(300), ms(10_000)).with_multiplier(3);
        let mut backoff = Backoff::new(policy);
        let mut last = backoff.current();
        for _ in 0..20 {
            let next = backoff.advance();
            assert!(next >= last);
            assert!(next <= ms(10_000));
            last = next;
        }
    }

    #[test]
    fn test_validate() {
        assert!(BackoffPolicy::default().validate().is_ok());
        assert!(BackoffPolicy::new(Duration::ZERO, ms(10)).validate().is_err());
        assert!(BackoffPolicy::new(ms(10), ms(5)).validate().is_err());
        assert!(
            BackoffPolicy::default()
                .with_multiplier(1)
                .validate()
                .is_err()
        );
        assert!(
            BackoffPolicy::default()
                .with_multiplier(1)
                .with_strategy(BackoffStrategy::Linear)
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!(
            "Linear".parse::<BackoffStrategy>().unwrap(),
            BackoffStrategy::Linear
        );
        assert_eq!(
            "exponential".parse::<BackoffStrategy>().unwrap(),
            BackoffStrategy::Exponential
        );
        assert!("fibonacci".parse::<BackoffStrategy>().is_err());
    }
}
