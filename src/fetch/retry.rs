//! Retry state machine
//!
//! One fetch moves `Idle → Dispatching → {Success | Blocked | Timeout |
//! TransientError}`. After a failed attempt [`RetryPolicy::next_step`]
//! decides whether to try again, with which identity, and how long to wait
//! first. Waiting goes through a [`Sleeper`] so the policy can be tested
//! without timers.

use crate::config::EngineConfig;
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

/// State of a single fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Idle,
    Dispatching { attempt: u32 },
    Success,
    Blocked,
    Timeout,
    TransientError,
}

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStep {
    /// Wait, then dispatch again; `rotate_identity` asks for a fresh proxy
    Retry {
        delay: Duration,
        rotate_identity: bool,
    },
    GiveUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts per fetch
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay),
        }
    }

    /// `base_delay * 2^attempt`, saturating
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Decides the step after attempt number `attempt` (1-based) ended in
    /// `state`
    pub fn next_step(&self, attempt: u32, state: FetchState) -> RetryStep {
        let rotate_identity = match state {
            FetchState::Blocked => true,
            FetchState::Timeout | FetchState::TransientError => false,
            FetchState::Idle | FetchState::Dispatching { .. } | FetchState::Success => {
                return RetryStep::GiveUp
            }
        };

        if attempt >= self.max_retries {
            return RetryStep::GiveUp;
        }

        RetryStep::Retry {
            delay: self.backoff(attempt),
            rotate_identity,
        }
    }
}

/// Suspends the current task between attempts
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Records requested sleeps and returns immediately
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    calls: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Duration> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(duration);
    }
}
