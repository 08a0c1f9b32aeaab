//! Token-bucket rate limiter gating every remote call of one region.
//!
//! Implemented as a generic cell rate algorithm: the limiter keeps the
//! theoretical arrival time of the next request and hands out reservations
//! against it. A reservation that lies in the future is waited for, unless the
//! shared cancellation token fires first.

use super::error::{DescribeError, Result};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    burst: u32,
    next_arrival: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// `requests_per_second` and `burst` are clamped to at least one.
    pub fn new(requests_per_second: u32, burst: u32) -> Self {
        Self {
            interval: Duration::from_secs(1) / requests_per_second.max(1),
            burst: burst.max(1),
            next_arrival: Mutex::new(None),
        }
    }

    /// Wait for a token. Returns [`DescribeError::Cancelled`] immediately if
    /// `cancel` is already fired, or as soon as it fires while waiting.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(DescribeError::Cancelled);
        }
        let now = Instant::now();
        let ready_at = self.reserve(now);
        if ready_at <= now {
            return Ok(());
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DescribeError::Cancelled),
            _ = tokio::time::sleep_until(ready_at) => Ok(()),
        }
    }

    fn reserve(&self, now: Instant) -> Instant {
        let mut next_arrival = self
            .next_arrival
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let arrival = next_arrival.map_or(now, |scheduled| scheduled.max(now));
        let slack = self.interval * (self.burst - 1);
        let ready_at = arrival
            .checked_sub(slack)
            .map_or(now, |ready| ready.max(now));
        *next_arrival = Some(arrival + self.interval);
        ready_at
    }
}
