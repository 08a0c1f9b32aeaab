//! Describe engine: filter compilation, rate-limited pagination, fan-out over
//! regions or entities, and the per-service reports built on top of them.
//!
//! A report runs in three stages. Indexes are fetched (concurrently where
//! independent), resolved into flat rows, and collected through a bounded
//! channel. The first error cancels every sibling and the operation returns
//! no rows.

pub mod aws_services;
pub mod documents;
pub mod error;
pub mod fetcher;
pub mod filter;
pub mod orchestrator;
pub mod rate_limiter;
pub mod report;
pub mod scope;
pub mod sdk_errors;

pub use error::{DescribeError, Result};
pub use orchestrator::{Orchestrator, RowSink};
pub use report::{sort_rows, ReportRow};
pub use scope::CallScope;
