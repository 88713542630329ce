//! Key-rotating retry policy.
//!
//! Three failure families get three remedies:
//!
//! - quota errors are tied to one key: report it, exclude it, rotate;
//! - an empty key pool or a 500/503 is global: wait and try again;
//! - a billing restriction applies to the model tier: stop and let the call
//!   site decide whether a fallback model exists.
//!
//! [`AttemptState`] holds the per-call bookkeeping and turns each outcome into a
//! [`Transition`]; [`Orchestrator`] drives it against the registry and the
//! caller's unit of work.

pub mod orchestrator;

pub use orchestrator::{Orchestrator, RunOptions};

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::classify::{self, NormalizedError};
use crate::error::KeyRotorError;
use crate::keys::ApiKey;

/// Attempt budget and pauses for one orchestrated call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Maximum attempts, counting skipped leases and busy waits.
    pub max_attempts: u32,
    /// Pause after the registry had no key to lease.
    pub busy_delay: Duration,
    /// Pause after rotating away from a quota-exhausted key.
    pub rotation_delay: Duration,
    /// Extra pause once quota errors repeat back to back (suspected IP throttling).
    pub throttle_delay: Duration,
    /// Consecutive quota errors that trigger `throttle_delay`.
    pub throttle_threshold: u32,
    /// Pause after a 500/503.
    pub server_error_delay: Duration,
    /// Pause after a failure with no recognisable status.
    pub unknown_delay: Duration,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 15,
            busy_delay: Duration::from_millis(3000),
            rotation_delay: Duration::from_millis(1500),
            throttle_delay: Duration::from_millis(5000),
            throttle_threshold: 3,
            server_error_delay: Duration::from_millis(3000),
            unknown_delay: Duration::from_millis(1000),
        }
    }
}

/// Millisecond form of [`RotationPolicy`] for configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub busy_delay_ms: u64,
    pub rotation_delay_ms: u64,
    pub throttle_delay_ms: u64,
    pub throttle_threshold: u32,
    pub server_error_delay_ms: u64,
    pub unknown_delay_ms: u64,
    /// Poll interval for long-running video jobs.
    pub poll_interval_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 15,
            busy_delay_ms: 3000,
            rotation_delay_ms: 1500,
            throttle_delay_ms: 5000,
            throttle_threshold: 3,
            server_error_delay_ms: 3000,
            unknown_delay_ms: 1000,
            poll_interval_ms: 5000,
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RotationPolicy {
        RotationPolicy {
            max_attempts: self.max_attempts,
            busy_delay: Duration::from_millis(self.busy_delay_ms),
            rotation_delay: Duration::from_millis(self.rotation_delay_ms),
            throttle_delay: Duration::from_millis(self.throttle_delay_ms),
            throttle_threshold: self.throttle_threshold,
            server_error_delay: Duration::from_millis(self.server_error_delay_ms),
            unknown_delay: Duration::from_millis(self.unknown_delay_ms),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// What the orchestrator does after an attempt fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Report the key exhausted, exclude it, pause, lease another.
    Rotate {
        /// Extra pause before reporting, set once quota errors keep repeating.
        throttle: Option<Duration>,
        delay: Duration,
    },
    /// Pause, then try again with whatever key the registry hands out.
    Backoff(Duration),
    /// Billing restriction: surface it to the call site immediately.
    Escalate,
    /// Permanent failure.
    Fail,
}

#[derive(Debug, Clone)]
enum LastFailure {
    Busy(String),
    Provider(NormalizedError),
}

/// Bookkeeping for one orchestrated call. Never outlives it.
#[derive(Debug, Default)]
pub struct AttemptState {
    attempt: u32,
    consecutive_quota: u32,
    excluded: HashSet<ApiKey>,
    last_failure: Option<LastFailure>,
}

impl AttemptState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts counted so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn consecutive_quota_errors(&self) -> u32 {
        self.consecutive_quota
    }

    pub fn has_attempts_left(&self, max_attempts: u32) -> bool {
        self.attempt < max_attempts
    }

    pub fn is_excluded(&self, key: &ApiKey) -> bool {
        self.excluded.contains(key)
    }

    pub fn exclude(&mut self, key: ApiKey) {
        self.excluded.insert(key);
    }

    /// The registry handed back a key this call already gave up on.
    pub fn on_excluded_key(&mut self) {
        self.attempt += 1;
    }

    /// The registry had nothing to lease. Does not touch the quota streak.
    pub fn on_busy(&mut self, policy: &RotationPolicy, reason: impl Into<String>) -> Transition {
        self.attempt += 1;
        self.last_failure = Some(LastFailure::Busy(reason.into()));
        Transition::Backoff(policy.busy_delay)
    }

    /// Decide how to continue after the unit of work failed.
    pub fn on_failure(&mut self, error: &NormalizedError, policy: &RotationPolicy) -> Transition {
        self.last_failure = Some(LastFailure::Provider(error.clone()));

        if classify::is_quota(error) {
            self.consecutive_quota += 1;
            self.attempt += 1;
            let throttle = (self.consecutive_quota >= policy.throttle_threshold)
                .then_some(policy.throttle_delay);
            return Transition::Rotate {
                throttle,
                delay: policy.rotation_delay,
            };
        }

        if classify::is_billing(error) {
            return Transition::Escalate;
        }

        self.consecutive_quota = 0;
        if classify::is_server_error(error) {
            self.attempt += 1;
            Transition::Backoff(policy.server_error_delay)
        } else if error.status_code.is_none() {
            self.attempt += 1;
            Transition::Backoff(policy.unknown_delay)
        } else {
            Transition::Fail
        }
    }

    /// Error to raise once the attempt budget is spent.
    pub fn into_error(self) -> KeyRotorError {
        match self.last_failure {
            Some(LastFailure::Provider(error)) => {
                KeyRotorError::from_normalized(error, self.attempt)
            }
            Some(LastFailure::Busy(reason)) => KeyRotorError::SystemBusy(reason),
            None => KeyRotorError::SystemBusy("service unavailable".to_string()),
        }
    }
}
