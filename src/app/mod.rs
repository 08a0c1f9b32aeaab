//! Application modules.
//!
//! - [`describer`] - the describe engine and per-service reports
//! - [`config`] - layered runtime configuration and SDK config loading
//! - [`render`] - text, markdown, json and yaml output
//! - [`cli`] - command line parsing and report dispatch

pub mod cli;
pub mod config;
pub mod describer;
pub mod render;
