// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Poller configuration.

use std::env;
use std::time::Duration;

use eventwatch_api::ApiConfig;

use crate::backoff::{
    BackoffPolicy, BackoffStrategy, DEFAULT_INITIAL_INTERVAL, DEFAULT_MAX_INTERVAL,
    DEFAULT_MULTIPLIER,
};
use crate::error::{PollerError, Result};

/// Everything needed to run a poller against the API.
#[derive(Debug, Clone, Default)]
pub struct PollerConfig {
    /// API connection settings
    pub api: ApiConfig,
    /// Interval policy for new polls
    pub backoff: BackoffPolicy,
}

impl PollerConfig {
    /// Load configuration from environment variables.
    ///
    /// API variables are documented on [`ApiConfig::from_env`]. Polling adds:
    /// - `EVENTWATCH_POLL_INITIAL_MS` - First interval (default: 2000)
    /// - `EVENTWATCH_POLL_MAX_MS` - Interval ceiling (default: 32000)
    /// - `EVENTWATCH_POLL_MULTIPLIER` - Exponential growth factor (default: 2)
    /// - `EVENTWATCH_POLL_STRATEGY` - `exponential` or `linear` (default: exponential)
    pub fn from_env() -> Result<Self> {
        let api = ApiConfig::from_env()?;
        let backoff = backoff_from(|key| env::var(key).ok())?;
        Ok(Self { api, backoff })
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Build a backoff policy from a variable lookup.
fn backoff_from(lookup: impl Fn(&str) -> Option<String>) -> Result<BackoffPolicy> {
    let millis = |key: &str, default: Duration| -> Result<Duration> {
        match lookup(key) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|e| PollerError::Config(format!("invalid {}: {}", key, e))),
            None => Ok(default),
        }
    };

    let initial = millis("EVENTWATCH_POLL_INITIAL_MS", DEFAULT_INITIAL_INTERVAL)?;
    let max = millis("EVENTWATCH_POLL_MAX_MS", DEFAULT_MAX_INTERVAL)?;

    let multiplier = match lookup("EVENTWATCH_POLL_MULTIPLIER") {
        Some(raw) => raw.trim().parse::<u32>().map_err(|e| {
            PollerError::Config(format!("invalid EVENTWATCH_POLL_MULTIPLIER: {}", e))
        })?,
        None => DEFAULT_MULTIPLIER,
    };

    let strategy = match lookup("EVENTWATCH_POLL_STRATEGY") {
        Some(raw) => raw.parse::<BackoffStrategy>()?,
        None => BackoffStrategy::default(),
    };

    let policy = BackoffPolicy::new(initial, max)
        .with_multiplier(multiplier)
        .with_strategy(strategy);
    policy.validate()?;
    Ok(policy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let policy = backoff_from(lookup(&[])).unwrap();
        assert_eq!(policy, BackoffPolicy::default());
    }

    #[test]
    fn test_overrides() {
        let policy = backoff_from(lookup(&[
            ("EVENTWATCH_POLL_INITIAL_MS", "500"),
            ("EVENTWATCH_POLL_MAX_MS", "4000"),
            ("EVENTWATCH_POLL_MULTIPLIER", "3"),
            ("EVENTWATCH_POLL_STRATEGY", "linear"),
        ]))
        .unwrap();

        assert_eq!(policy.initial, Duration::from_millis(500));
        assert_eq!(policy.max, Duration::from_millis(4000));
        assert_eq!(policy.multiplier, 3);
        assert_eq!(policy.strategy, BackoffStrategy::Linear);
    }

    #[test]
    fn test_invalid_number_names_variable() {
        let err = backoff_from(lookup(&[("EVENTWATCH_POLL_MAX_MS", "soon")])).unwrap_err();
        assert!(err.to_string().contains("EVENTWATCH_POLL_MAX_MS"));
    }

    #[test]
    fn test_ceiling_below_initial_is_rejected() {
        let err = backoff_from(lookup(&[
            ("EVENTWATCH_POLL_INITIAL_MS", "5000"),
            ("EVENTWATCH_POLL_MAX_MS", "1000"),
        ]))
        .unwrap_err();
        assert!(matches!(err, PollerError::Config(_)));
    }
}
