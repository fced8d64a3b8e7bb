//! Backoff schedule for transient request failures.

use std::time::{Duration, SystemTime};

use log::*;
use reqwest_retry::{RetryDecision, RetryPolicy};

const BASE_DELAY: Duration = Duration::from_millis(250);
const MAX_DELAY: Duration = Duration::from_secs(5);

/// Doubling backoff with a retry count limit and an optional overall time budget.
///
/// Only failures `reqwest-retry` classifies as transient reach this policy
/// (connection errors, 5xx, 408, 429). A 401 or a validation error is never retried.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    max_retries: u32,
    budget: Option<Duration>,
}

impl BackoffPolicy {
    /// `max_retries` of `0` disables retries.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            budget: None,
        }
    }

    /// Give up once the next attempt would start more than `budget` after the first.
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = Some(budget);
        self
    }

    /// Wait before retry number `retry` (counting from 0).
    fn delay_for(&self, retry: u32) -> Duration {
        1u32.checked_shl(retry)
            .and_then(|factor| BASE_DELAY.checked_mul(factor))
            .map_or(MAX_DELAY, |delay| delay.min(MAX_DELAY))
    }
}

impl RetryPolicy for BackoffPolicy {
    fn should_retry(&self, request_start_time: SystemTime, n_past_retries: u32) -> RetryDecision {
        if n_past_retries >= self.max_retries {
            return RetryDecision::DoNotRetry;
        }

        let execute_after = SystemTime::now() + self.delay_for(n_past_retries);
        if let Some(budget) = self.budget {
            let elapsed = execute_after
                .duration_since(request_start_time)
                .unwrap_or_default();
            if elapsed > budget {
                debug!("Retry budget of {:?} spent, giving up", budget);
                return RetryDecision::DoNotRetry;
            }
        }

        trace!("Retry {} scheduled", n_past_retries + 1);
        RetryDecision::Retry { execute_after }
    }
}
