//! The S3 calls the bucket report depends on.

use crate::app::describer::error::Result;
use crate::app::describer::fetcher::Page;
use async_trait::async_trait;

/// Region assumed when a bucket reports no location constraint.
pub const DEFAULT_BUCKET_REGION: &str = "us-east-1";

/// Outcome of asking for a bucket's location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BucketAccess {
    /// Location of the bucket, never empty.
    Accessible(String),
    /// The caller may list the bucket but not read its location.
    Denied,
}

impl BucketAccess {
    /// Map a location constraint, where an empty one means the default region.
    pub fn located(constraint: &str) -> Self {
        if constraint.is_empty() {
            BucketAccess::Accessible(DEFAULT_BUCKET_REGION.to_string())
        } else {
            BucketAccess::Accessible(constraint.to_string())
        }
    }
}

#[async_trait]
pub trait S3Api: Send + Sync {
    /// One page of bucket names.
    async fn list_buckets(&self, continuation_token: Option<String>) -> Result<Page<String>>;

    async fn bucket_location(&self, bucket: &str) -> Result<BucketAccess>;

    /// Raw bucket policy, read from the bucket's own region. `None` when the
    /// bucket has no policy.
    async fn bucket_policy(&self, bucket: &str, region: &str) -> Result<Option<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_constraint_is_default_region() {
        assert_eq!(BucketAccess::located(""), BucketAccess::Accessible("us-east-1".to_string()));
        assert_eq!(
            BucketAccess::located("eu-west-1"),
            BucketAccess::Accessible("eu-west-1".to_string())
        );
    }
}
