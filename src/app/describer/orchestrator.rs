//! Concurrency orchestrator.
//!
//! Runs one task per unit of work (a region, a principal, a bucket) under a
//! shared cancellation token. Rows flow through a bounded channel into a single
//! collector task. The first failing task cancels the token and aborts its
//! siblings; the rows collected so far are then discarded.
//!
//! Shutdown order matters: the channel closes only once every producer task
//! has returned (each owns a sender clone), and the collector is awaited after
//! that. Closing earlier would fail in-flight sends, awaiting the collector
//! earlier would never finish.

use super::error::{DescribeError, Result};
use super::rate_limiter::RateLimiter;
use super::scope::CallScope;
use crate::app::config::DescribeConfig;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Write half handed to resolvers. Sends block while the collector is behind
/// and fail with [`DescribeError::Cancelled`] once the operation is cancelled.
#[derive(Debug)]
pub struct RowSink<R> {
    sender: mpsc::Sender<R>,
    cancel: CancellationToken,
}

impl<R> Clone for RowSink<R> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            cancel: self.cancel.clone(),
        }
    }
}

impl<R: Send> RowSink<R> {
    pub fn new(sender: mpsc::Sender<R>, cancel: CancellationToken) -> Self {
        Self { sender, cancel }
    }

    /// Standalone sink and its receiving end, for driving a resolver directly.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<R>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self::new(sender, CancellationToken::new()), receiver)
    }

    pub async fn emit(&self, row: R) -> Result<()> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(DescribeError::Cancelled),
            sent = self.sender.send(row) => sent.map_err(|_| DescribeError::Cancelled),
        }
    }

    pub async fn emit_all(&self, rows: impl IntoIterator<Item = R>) -> Result<()> {
        for row in rows {
            self.emit(row).await?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Orchestrator {
    requests_per_second: u32,
    burst: u32,
    channel_capacity: usize,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(config: &DescribeConfig) -> Self {
        Self {
            requests_per_second: config.requests_per_second,
            burst: config.burst,
            channel_capacity: config.channel_capacity.max(1),
            cancel: CancellationToken::new(),
        }
    }

    /// Operations started from this orchestrator are cancelled when `parent` is.
    pub fn with_parent_cancellation(mut self, parent: &CancellationToken) -> Self {
        self.cancel = parent.child_token();
        self
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn new_limiter(&self) -> Arc<RateLimiter> {
        Arc::new(RateLimiter::new(self.requests_per_second, self.burst))
    }

    /// Scope with a fresh limiter, for the listing calls that precede a fan-out.
    pub fn scope(&self, region: &str) -> CallScope {
        CallScope::new(region, self.new_limiter(), self.cancel.child_token())
    }

    /// One task per region, each with its own limiter.
    pub async fn run_regions<R, F, Fut>(&self, regions: &[String], task: F) -> Result<Vec<R>>
    where
        R: Send + 'static,
        F: Fn(CallScope, RowSink<R>) -> Fut,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        log_info!("describing {} region(s)", regions.len());
        let (rps, burst) = (self.requests_per_second, self.burst);
        self.run(regions.to_vec(), move |region: String, cancel, sink| {
            let limiter = Arc::new(RateLimiter::new(rps, burst));
            task(CallScope::new(region, limiter, cancel), sink)
        })
        .await
    }

    /// One task per item, all sharing the limiter and region of `scope`.
    pub async fn run_each<T, R, F, Fut>(&self, scope: &CallScope, items: Vec<T>, task: F) -> Result<Vec<R>>
    where
        R: Send + 'static,
        F: Fn(T, CallScope, RowSink<R>) -> Fut,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        trace_debug!("fanning out over {} item(s) in {}", items.len(), scope.region());
        self.run(items, |item, cancel, sink| task(item, scope.with_cancel(cancel), sink))
            .await
    }

    async fn run<U, R, F, Fut>(&self, units: Vec<U>, spawn_unit: F) -> Result<Vec<R>>
    where
        R: Send + 'static,
        F: Fn(U, CancellationToken, RowSink<R>) -> Fut,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let cancel = self.cancel.child_token();
        let (sender, mut receiver) = mpsc::channel::<R>(self.channel_capacity);
        let collector = tokio::spawn(async move {
            let mut rows = Vec::new();
            while let Some(row) = receiver.recv().await {
                rows.push(row);
            }
            rows
        });

        let mut tasks = JoinSet::new();
        for unit in units {
            let sink = RowSink::new(sender.clone(), cancel.clone());
            tasks.spawn(spawn_unit(unit, cancel.clone(), sink));
        }
        drop(sender);

        let mut failure: Option<DescribeError> = None;
        while let Some(joined) = tasks.join_next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(err) if err.is_cancelled() && failure.is_some() => continue,
                Err(err) => Err(DescribeError::from(err)),
            };
            if let Err(err) = outcome {
                if failure.is_none() {
                    log_warn!("task failed, cancelling siblings: {}", err);
                    cancel.cancel();
                    tasks.abort_all();
                    failure = Some(err);
                }
            }
        }

        // Every producer has returned, so every sender is gone and the
        // collector drains to completion.
        let rows = collector.await?;
        match failure {
            Some(err) => {
                log_debug!("discarding {} collected row(s)", rows.len());
                Err(err)
            }
            None => {
                log_debug!("collected {} row(s)", rows.len());
                Ok(rows)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn orchestrator() -> Orchestrator {
        let config = DescribeConfig {
            channel_capacity: 2,
            ..DescribeConfig::default()
        };
        Orchestrator::new(&config)
    }

    fn regions(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_collects_rows_from_every_region() {
        let mut rows = orchestrator()
            .run_regions(&regions(&["a", "b", "c"]), |scope, sink| async move {
                for n in 0..5 {
                    sink.emit(format!("{}-{}", scope.region(), n)).await?;
                }
                Ok(())
            })
            .await
            .unwrap();
        rows.sort();
        assert_eq!(rows.len(), 15);
        assert_eq!(rows[0], "a-0");
        assert_eq!(rows[14], "c-4");
    }

    #[tokio::test]
    async fn test_first_error_discards_rows_and_cancels_siblings() {
        let outcome = orchestrator()
            .run_regions(&regions(&["ok", "fail", "slow"]), |scope, sink| async move {
                match scope.region() {
                    "ok" => sink.emit(1).await,
                    "fail" => {
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        Err(DescribeError::lookup("vpc", "vpc-missing"))
                    }
                    _ => {
                        scope.cancel_token().cancelled().await;
                        Err(DescribeError::Cancelled)
                    }
                }
            })
            .await;
        match outcome {
            Err(DescribeError::Lookup { id, .. }) => assert_eq!(id, "vpc-missing"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_no_units_yields_no_rows() {
        let rows: Vec<u8> = orchestrator()
            .run_regions(&[], |_, _| async { Ok(()) })
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_run_each_shares_the_scope_limiter() {
        let orchestrator = orchestrator();
        let scope = orchestrator.scope("global");
        let limiter = Arc::clone(scope.limiter());
        let rows = orchestrator
            .run_each(&scope, vec![1, 2, 3], move |n, item_scope, sink| {
                let same = Arc::ptr_eq(item_scope.limiter(), &limiter);
                async move { sink.emit((n, same)).await }
            })
            .await
            .unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|(_, same)| *same));
    }

    #[tokio::test]
    async fn test_parent_cancellation_reaches_tasks() {
        let parent = CancellationToken::new();
        parent.cancel();
        let outcome: Result<Vec<u8>> = orchestrator()
            .with_parent_cancellation(&parent)
            .run_regions(&regions(&["a"]), |scope, _| async move {
                scope.call(async { Ok(()) }).await
            })
            .await;
        assert!(matches!(outcome, Err(DescribeError::Cancelled)));
    }
}
