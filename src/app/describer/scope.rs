//! Per-task view of one top-level operation: which region it targets, the
//! limiter every remote call must pass through, and the shared cancellation
//! token.

use super::error::{DescribeError, Result};
use super::rate_limiter::RateLimiter;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct CallScope {
    region: Arc<str>,
    limiter: Arc<RateLimiter>,
    cancel: CancellationToken,
}

impl CallScope {
    pub fn new(region: impl Into<Arc<str>>, limiter: Arc<RateLimiter>, cancel: CancellationToken) -> Self {
        Self {
            region: region.into(),
            limiter,
            cancel,
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Same region and limiter, different cancellation token.
    pub fn with_cancel(&self, cancel: CancellationToken) -> Self {
        Self {
            region: Arc::clone(&self.region),
            limiter: Arc::clone(&self.limiter),
            cancel,
        }
    }

    /// Issue one remote call: take a limiter token, then drive `request`
    /// until it completes or the scope is cancelled.
    pub async fn call<T, F>(&self, request: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.limiter.acquire(&self.cancel).await?;
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(DescribeError::Cancelled),
            outcome = request => outcome,
        }
    }
}
