//! Retry eligibility for items with a failure record.
//!
//! Below `max_retries` an item is always retried. At or above the cap it is
//! refused until `cooldown` has elapsed since the last failure, after which
//! it gets one more attempt regardless of how far past the cap it is. The
//! decision only moves from refuse to attempt as time passes; only a new
//! failure can move it back.

use chrono::{DateTime, Duration, Utc};

use docsync_core::config::RetryConfig;
use docsync_core::{FailedRecord, Locator};

use crate::state_store::StateStore;

pub const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// No failure on record.
    Fresh,
    /// Failed before, still under the cap.
    Retry { attempt: u32 },
    /// Cap reached but the cooldown has elapsed.
    CooledDown,
    /// Cap reached; eligible again after `eligible_at`.
    Exhausted { eligible_at: DateTime<Utc> },
}

impl RetryDecision {
    pub fn should_attempt(&self) -> bool {
        !matches!(self, RetryDecision::Exhausted { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub cooldown: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            cooldown: Duration::days(7),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            cooldown: config.cooldown(),
        }
    }
}

impl RetryPolicy {
    /// Whether `locator` may be attempted now, judged from the store's
    /// failure record.
    pub fn should_attempt(&self, store: &StateStore, locator: &Locator) -> bool {
        self.decide(store.failed_record(locator), Utc::now())
            .should_attempt()
    }

    pub fn decide(&self, failure: Option<&FailedRecord>, now: DateTime<Utc>) -> RetryDecision {
        let Some(failure) = failure else {
            return RetryDecision::Fresh;
        };
        if failure.retry_count < self.max_retries {
            return RetryDecision::Retry {
                attempt: failure.retry_count + 1,
            };
        }
        if now - failure.failed_at > self.cooldown {
            RetryDecision::CooledDown
        } else {
            RetryDecision::Exhausted {
                eligible_at: failure.failed_at + self.cooldown,
            }
        }
    }
}
