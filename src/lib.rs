//! awsdescribe: concurrent fetch and correlation of AWS resources into flat,
//! sortable reports.
//!
//! The engine lives in [`app::describer`]: a filter compiler, a rate-limited
//! paginated fetcher, an orchestrator that fans out over regions or entities,
//! and per-service resolvers for EC2, IAM and S3. [`app::cli`], [`app::config`]
//! and [`app::render`] wrap it into the `awsdescribe` binary.

#![warn(clippy::all, rust_2018_idioms)]

#[macro_use]
pub mod logging_macros;

pub mod app;
