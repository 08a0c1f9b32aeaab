//! S3 bucket reports. Like IAM, bucket listing is global and runs under one
//! limiter per operation.

pub mod api;
pub mod bucket;
pub mod sdk;

pub use api::{BucketAccess, S3Api};
pub use bucket::{BucketQuery, BucketRow};
pub use sdk::S3SdkClient;

use crate::app::describer::orchestrator::Orchestrator;
use crate::app::describer::scope::CallScope;
use std::sync::Arc;

pub struct S3Describer {
    api: Arc<dyn S3Api>,
    orchestrator: Orchestrator,
}

impl S3Describer {
    pub fn new(api: Arc<dyn S3Api>, orchestrator: Orchestrator) -> Self {
        Self { api, orchestrator }
    }

    fn scope(&self) -> CallScope {
        self.orchestrator.scope(super::iam::GLOBAL_SCOPE)
    }
}
