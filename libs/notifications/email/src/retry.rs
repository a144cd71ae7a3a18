//! Per-message retry policy
//!
//! Attempt `n` (1-based) that fails transiently is followed by a wait of
//! `backoff_factor^(n-1)` seconds: 1s, 2s, 4s, ... with the default factor.

use crate::error::TransportError;
use std::time::Duration;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BACKOFF_FACTOR: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per message, including the first
    pub max_retries: u32,
    pub backoff_factor: u32,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff_factor: u32) -> Self {
        Self {
            max_retries,
            backoff_factor,
        }
    }

    /// Attempts allowed; always at least one
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.max(1)
    }

    /// Wait after failed attempt `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        Duration::from_secs(u64::from(self.backoff_factor).saturating_pow(exponent))
    }

    /// Whether another attempt may follow failed attempt `attempt`
    pub fn should_retry(&self, attempt: u32, error: &TransportError) -> bool {
        error.is_transient() && !error.is_session_dead() && attempt < self.max_attempts()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_BACKOFF_FACTOR)
    }
}

/// Result of running the policy for one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Sent { attempts: u32 },
    Failed { attempts: u32, error: TransportError },
}

impl SendOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Self::Sent { attempts } | Self::Failed { attempts, .. } => *attempts,
        }
    }

    /// Failed because the session dropped
    pub fn needs_reconnect(&self) -> bool {
        matches!(self, Self::Failed { error, .. } if error.is_session_dead())
    }
}
