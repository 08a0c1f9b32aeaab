//! EC2 reports: instances, images, security groups, VPCs, subnets and route
//! tables, each optionally joined against related entities.
//!
//! Every report follows the same shape: one task per target region fetches
//! the indexes it needs, resolves them into flat rows and hands the rows to
//! the orchestrator's collector.

pub mod api;
pub mod classify;
pub mod image;
pub mod indexes;
pub mod instance;
pub mod model;
pub mod requests;
pub mod route_table;
pub mod sdk;
pub mod security_group;
pub mod subnet;
pub mod vpc;

pub use api::{DescribeRequest, Ec2Api};
pub use requests::Ec2Query;
pub use sdk::Ec2SdkClient;

use super::elb::LoadBalancerApi;
use crate::app::describer::error::Result;
use crate::app::describer::orchestrator::{Orchestrator, RowSink};
use crate::app::describer::scope::CallScope;
use std::future::Future;
use std::sync::Arc;

/// Clients a regional resolver task runs against.
#[derive(Clone)]
pub struct Ec2Clients {
    pub ec2: Arc<dyn Ec2Api>,
    pub elb: Arc<dyn LoadBalancerApi>,
}

pub struct Ec2Describer {
    clients: Ec2Clients,
    orchestrator: Orchestrator,
    regions: Vec<String>,
}

impl Ec2Describer {
    pub fn new(
        ec2: Arc<dyn Ec2Api>,
        elb: Arc<dyn LoadBalancerApi>,
        orchestrator: Orchestrator,
        regions: Vec<String>,
    ) -> Self {
        Self {
            clients: Ec2Clients { ec2, elb },
            orchestrator,
            regions,
        }
    }

    /// Run `resolve` once per target region and collect every emitted row.
    async fn per_region<R, F, Fut>(&self, resolve: F) -> Result<Vec<R>>
    where
        R: Send + 'static,
        F: Fn(Ec2Clients, CallScope, RowSink<R>) -> Fut,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let clients = self.clients.clone();
        self.orchestrator
            .run_regions(&self.regions, move |scope, sink| resolve(clients.clone(), scope, sink))
            .await
    }
}
