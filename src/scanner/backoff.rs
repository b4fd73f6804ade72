//! Delay policies between failed connection attempts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Computes how long to wait after a failed connection attempt.
///
/// `attempt` counts from zero for the first failure; `max_attempts` is the
/// target's retry budget.
pub trait Backoff: fmt::Debug + Send + Sync {
    fn delay(&self, attempt: u32, max_attempts: u32) -> Duration;
}

/// Waits the same amount of time after every failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedBackoff {
    pub delay: Duration,
}

impl FixedBackoff {
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for FixedBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl Backoff for FixedBackoff {
    fn delay(&self, _attempt: u32, _max_attempts: u32) -> Duration {
        self.delay
    }
}

/// Doubles the delay after every failure, up to `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    pub base: Duration,
    pub max: Duration,
}

impl ExponentialBackoff {
    pub const fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_secs(30))
    }
}

impl Backoff for ExponentialBackoff {
    fn delay(&self, attempt: u32, _max_attempts: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }
}

/// Backoff policy names accepted on the command line and in settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    /// One second between attempts
    #[default]
    Fixed,
    /// 500ms doubling per attempt, capped at 30s
    Exponential,
}

impl BackoffKind {
    /// Instantiate the default policy of this kind.
    pub fn build(self) -> std::sync::Arc<dyn Backoff> {
        match self {
            Self::Fixed => std::sync::Arc::new(FixedBackoff::default()),
            Self::Exponential => std::sync::Arc::new(ExponentialBackoff::default()),
        }
    }
}

impl fmt::Display for BackoffKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed => write!(f, "fixed"),
            Self::Exponential => write!(f, "exponential"),
        }
    }
}
