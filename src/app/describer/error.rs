//! Error taxonomy shared by every fetch, resolver and report.
//!
//! Every variant is terminal for the operation that produced it. The only
//! locally recovered misses (display names, optional backup joins, S3 access
//! denied) never surface as an error in the first place.

use super::sdk_errors::ErrorCategory;
use thiserror::Error;

pub type Result<T, E = DescribeError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DescribeError {
    /// The relaxed filter expression could not be evaluated.
    #[error("cannot parse filter expression: {0}")]
    Parse(String),

    /// A filter criterion parsed but is structurally invalid.
    #[error("invalid filter criterion #{position} (name {name:?}): {reason}")]
    Validation {
        position: usize,
        name: String,
        reason: &'static str,
    },

    /// A structurally mandatory cross-reference is missing.
    #[error("no {kind} found: {id}")]
    Lookup { kind: &'static str, id: String },

    /// A page fetch or per-item call failed on the remote side.
    #[error("{service}:{operation} failed [{}]: {message}", .category.short_label())]
    Remote {
        service: &'static str,
        operation: &'static str,
        code: Option<String>,
        category: ErrorCategory,
        message: String,
    },

    /// A record matched none of the known buckets of a classification chain.
    #[error("unknown {subject} in route of {route_table}: valid values: {valid}")]
    Classification {
        subject: &'static str,
        route_table: String,
        valid: String,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("cannot decode policy document: {0}")]
    Document(String),

    #[error("invalid value: {value}: valid values: {valid}")]
    InvalidArgument { value: String, valid: String },

    #[error("background task failed: {0}")]
    Task(String),
}

impl DescribeError {
    pub fn lookup(kind: &'static str, id: impl Into<String>) -> Self {
        DescribeError::Lookup {
            kind,
            id: id.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, DescribeError::Cancelled)
    }

    /// AWS error code of a remote failure, if the service returned one.
    pub fn remote_code(&self) -> Option<&str> {
        match self {
            DescribeError::Remote { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

impl From<tokio::task::JoinError> for DescribeError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            DescribeError::Cancelled
        } else {
            DescribeError::Task(err.to_string())
        }
    }
}
