// SPDX-License-Identifier: MIT
//! Retry policies for operations that wait on an external signal.
//!
//! Provides [`RetryPolicy`] for configurable retry-with-backoff and
//! [`RetryState`], the per-operation attempt counter that hands out the next
//! delay until the budget is spent.
//!
//! Two engine operations retry: map creation while the provider SDK script
//! is still loading, and camera-follow while the map has not yet reported
//! its first idle event. Neither polls forever.
//!
//! # Determinism
//!
//! Backoff delays use fixed formulas (no jitter/randomness) so tests can
//! reproduce exact timing sequences through the manual scheduler.
//!
//! # Example
//!
//! ```
//! use mapview_runtime::retry::{RetryPolicy, BackoffStrategy, RetryState};
//! use web_time::Duration;
//!
//! let policy = RetryPolicy::new(2, BackoffStrategy::Fixed { delay_ms: 300 });
//! let mut state = RetryState::new(policy);
//!
//! assert_eq!(state.next_delay(), Some(Duration::from_millis(300)));
//! assert_eq!(state.next_delay(), Some(Duration::from_millis(300)));
//! assert_eq!(state.next_delay(), None);
//! assert!(state.is_exhausted());
//! ```

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use web_time::Duration;

/// Backoff strategy for retry delays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Fixed delay between retries.
    Fixed {
        /// Delay in milliseconds.
        delay_ms: u64,
    },
    /// Exponential backoff: `base_ms * 2^attempt`, capped at `max_ms`.
    Exponential {
        /// Base delay in milliseconds.
        base_ms: u64,
        /// Maximum delay cap in milliseconds.
        max_ms: u64,
    },
    /// Linear backoff: `base_ms * (attempt + 1)`, capped at `max_ms`.
    Linear {
        /// Base delay in milliseconds.
        base_ms: u64,
        /// Maximum delay cap in milliseconds.
        max_ms: u64,
    },
}

/// A retry policy with configurable attempts and backoff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (0 = no retries, just the initial attempt).
    pub max_retries: u32,
    /// Backoff strategy between retries.
    pub backoff: BackoffStrategy,
}

impl RetryPolicy {
    /// Create a new retry policy.
    pub fn new(max_retries: u32, backoff: BackoffStrategy) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    /// No retries: the first failure is final.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            backoff: BackoffStrategy::Fixed { delay_ms: 0 },
        }
    }

    /// Compute the delay before the given attempt (0-indexed).
    pub fn delay(&self, attempt: u32) -> Duration {
        match &self.backoff {
            BackoffStrategy::Fixed { delay_ms } => Duration::from_millis(*delay_ms),
            BackoffStrategy::Exponential { base_ms, max_ms } => {
                let multiplier = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
                let delay = base_ms.saturating_mul(multiplier);
                Duration::from_millis(delay.min(*max_ms))
            }
            BackoffStrategy::Linear { base_ms, max_ms } => {
                let delay = base_ms.saturating_mul(u64::from(attempt) + 1);
                Duration::from_millis(delay.min(*max_ms))
            }
        }
    }

    /// Total maximum delay across all retries (for timeout budgeting).
    pub fn total_max_delay(&self) -> Duration {
        let mut total = Duration::ZERO;
        for i in 0..self.max_retries {
            total += self.delay(i);
        }
        total
    }
}

/// Attempt counter for one retried operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryState {
    policy: RetryPolicy,
    attempt: u32,
}

impl RetryState {
    /// Fresh state with the full retry budget.
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy, attempt: 0 }
    }

    /// Delay before the next retry, consuming one attempt. `None` once the
    /// budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }
        let delay = self.policy.delay(self.attempt);
        self.attempt += 1;
        Some(delay)
    }

    /// Retries handed out so far.
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    /// True once every retry has been handed out.
    pub fn is_exhausted(&self) -> bool {
        self.attempt >= self.policy.max_retries
    }

    /// Restore the full budget.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}
