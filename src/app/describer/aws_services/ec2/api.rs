//! The EC2 calls the describers depend on.
//!
//! Each describe method returns one page; [`fetch_index`](crate::app::describer::fetcher::fetch_index)
//! drives the continuation token. Implemented over the AWS SDK by
//! [`Ec2SdkClient`](super::sdk::Ec2SdkClient) and by in-memory fakes in tests.

use super::model::{
    DhcpOptions, Image, Instance, PrefixList, RouteTable, SecurityGroup, Snapshot, Subnet, Volume, Vpc, VpcAttribute,
};
use crate::app::describer::error::Result;
use crate::app::describer::fetcher::Page;
use crate::app::describer::filter::Criterion;
use async_trait::async_trait;

/// Request parameters of a describe call, fixed for every page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescribeRequest {
    /// Explicit resource IDs (only `DescribeImages` takes them as a parameter).
    pub ids: Vec<String>,
    /// Owner scoping for images and snapshots.
    pub owners: Vec<String>,
    pub filters: Vec<Criterion>,
}

impl DescribeRequest {
    pub fn with_owners(owners: &[&str]) -> Self {
        Self {
            owners: owners.iter().map(|o| o.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn with_filter(filter: Criterion) -> Self {
        Self {
            filters: vec![filter],
            ..Default::default()
        }
    }
}

#[async_trait]
pub trait Ec2Api: Send + Sync {
    async fn describe_instances(&self, region: &str, request: &DescribeRequest, next_token: Option<String>) -> Result<Page<Instance>>;

    async fn describe_images(&self, region: &str, request: &DescribeRequest, next_token: Option<String>) -> Result<Page<Image>>;

    async fn describe_snapshots(&self, region: &str, request: &DescribeRequest, next_token: Option<String>) -> Result<Page<Snapshot>>;

    async fn describe_volumes(&self, region: &str, request: &DescribeRequest, next_token: Option<String>) -> Result<Page<Volume>>;

    async fn describe_security_groups(
        &self,
        region: &str,
        request: &DescribeRequest,
        next_token: Option<String>,
    ) -> Result<Page<SecurityGroup>>;

    async fn describe_vpcs(&self, region: &str, request: &DescribeRequest, next_token: Option<String>) -> Result<Page<Vpc>>;

    async fn describe_subnets(&self, region: &str, request: &DescribeRequest, next_token: Option<String>) -> Result<Page<Subnet>>;

    async fn describe_route_tables(
        &self,
        region: &str,
        request: &DescribeRequest,
        next_token: Option<String>,
    ) -> Result<Page<RouteTable>>;

    async fn describe_prefix_lists(&self, region: &str, next_token: Option<String>) -> Result<Page<PrefixList>>;

    async fn describe_managed_prefix_lists(&self, region: &str, next_token: Option<String>) -> Result<Page<PrefixList>>;

    async fn describe_dhcp_options(&self, region: &str, next_token: Option<String>) -> Result<Page<DhcpOptions>>;

    async fn describe_vpc_attribute(&self, region: &str, vpc_id: &str, attribute: VpcAttribute) -> Result<bool>;
}
