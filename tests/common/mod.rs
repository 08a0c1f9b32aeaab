//! In-memory fakes of the service seams.
//!
//! Every fake pages its listings one item at a time, so each report also
//! exercises the continuation loop of the fetcher.

#![allow(dead_code)]

use async_trait::async_trait;
use awsdescribe::app::config::DescribeConfig;
use awsdescribe::app::describer::aws_services::ec2::model::{
    DhcpOptions, Image, Instance, PrefixList, RouteTable, SecurityGroup, Snapshot, Subnet, Volume, Vpc, VpcAttribute,
};
use awsdescribe::app::describer::aws_services::ec2::{DescribeRequest, Ec2Api};
use awsdescribe::app::describer::aws_services::elb::{ClassicLoadBalancer, LoadBalancerApi, TargetGroup};
use awsdescribe::app::describer::aws_services::iam::model::{
    AttachedPolicy, ManagedPolicy, PolicyScope, Principal, PrincipalKind,
};
use awsdescribe::app::describer::aws_services::iam::IamApi;
use awsdescribe::app::describer::aws_services::s3::{BucketAccess, S3Api};
use awsdescribe::app::describer::error::{DescribeError, Result};
use awsdescribe::app::describer::fetcher::Page;
use awsdescribe::app::describer::orchestrator::Orchestrator;
use awsdescribe::app::describer::sdk_errors::ErrorCategory;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn orchestrator() -> Orchestrator {
    let config = DescribeConfig {
        requests_per_second: 1000,
        burst: 10,
        channel_capacity: 2,
        ..DescribeConfig::default()
    };
    Orchestrator::new(&config)
}

pub fn remote_error(service: &'static str, operation: &'static str, code: &str) -> DescribeError {
    DescribeError::Remote {
        service,
        operation,
        code: Some(code.to_string()),
        category: ErrorCategory::NonRetryable {
            code: code.to_string(),
            message: format!("{} failed", operation),
            is_permission_error: code == "AccessDenied",
        },
        message: format!("{} failed", operation),
    }
}

/// One item per page; the token is the index of the next item.
pub fn paged<T: Clone>(items: &[T], token: Option<String>) -> Page<T> {
    let start: usize = token.and_then(|t| t.parse().ok()).unwrap_or(0);
    let items_page: Vec<T> = items.iter().skip(start).take(1).cloned().collect();
    let next = (start + 1 < items.len()).then(|| (start + 1).to_string());
    Page::new(items_page, next)
}

#[derive(Debug, Clone, Default)]
pub struct RegionData {
    pub instances: Vec<Instance>,
    pub images: Vec<Image>,
    pub snapshots: Vec<Snapshot>,
    pub volumes: Vec<Volume>,
    pub security_groups: Vec<SecurityGroup>,
    pub vpcs: Vec<Vpc>,
    pub subnets: Vec<Subnet>,
    pub route_tables: Vec<RouteTable>,
    pub prefix_lists: Vec<PrefixList>,
    pub managed_prefix_lists: Vec<PrefixList>,
    pub dhcp_options: Vec<DhcpOptions>,
    pub vpc_attributes: HashMap<(String, VpcAttribute), bool>,
}

/// EC2 fake keyed by region. Filters are ignored; a region listed in
/// `failing` answers every call with `UnauthorizedOperation`.
#[derive(Debug, Default)]
pub struct FakeEc2 {
    pub regions: BTreeMap<String, RegionData>,
    pub failing: Vec<String>,
    pub calls: AtomicUsize,
}

impl FakeEc2 {
    pub fn with_region(mut self, region: &str, data: RegionData) -> Self {
        self.regions.insert(region.to_string(), data);
        self
    }

    pub fn failing_in(mut self, region: &str) -> Self {
        self.failing.push(region.to_string());
        self
    }

    fn region(&self, region: &str, operation: &'static str) -> Result<RegionData> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.iter().any(|r| r == region) {
            return Err(remote_error("ec2", operation, "UnauthorizedOperation"));
        }
        Ok(self.regions.get(region).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl Ec2Api for FakeEc2 {
    async fn describe_instances(&self, region: &str, _request: &DescribeRequest, next_token: Option<String>) -> Result<Page<Instance>> {
        Ok(paged(&self.region(region, "DescribeInstances")?.instances, next_token))
    }

    async fn describe_images(&self, region: &str, _request: &DescribeRequest, next_token: Option<String>) -> Result<Page<Image>> {
        Ok(paged(&self.region(region, "DescribeImages")?.images, next_token))
    }

    async fn describe_snapshots(&self, region: &str, _request: &DescribeRequest, next_token: Option<String>) -> Result<Page<Snapshot>> {
        Ok(paged(&self.region(region, "DescribeSnapshots")?.snapshots, next_token))
    }

    async fn describe_volumes(&self, region: &str, _request: &DescribeRequest, next_token: Option<String>) -> Result<Page<Volume>> {
        Ok(paged(&self.region(region, "DescribeVolumes")?.volumes, next_token))
    }

    async fn describe_security_groups(
        &self,
        region: &str,
        _request: &DescribeRequest,
        next_token: Option<String>,
    ) -> Result<Page<SecurityGroup>> {
        Ok(paged(&self.region(region, "DescribeSecurityGroups")?.security_groups, next_token))
    }

    async fn describe_vpcs(&self, region: &str, _request: &DescribeRequest, next_token: Option<String>) -> Result<Page<Vpc>> {
        Ok(paged(&self.region(region, "DescribeVpcs")?.vpcs, next_token))
    }

    async fn describe_subnets(&self, region: &str, _request: &DescribeRequest, next_token: Option<String>) -> Result<Page<Subnet>> {
        Ok(paged(&self.region(region, "DescribeSubnets")?.subnets, next_token))
    }

    async fn describe_route_tables(
        &self,
        region: &str,
        _request: &DescribeRequest,
        next_token: Option<String>,
    ) -> Result<Page<RouteTable>> {
        Ok(paged(&self.region(region, "DescribeRouteTables")?.route_tables, next_token))
    }

    async fn describe_prefix_lists(&self, region: &str, next_token: Option<String>) -> Result<Page<PrefixList>> {
        Ok(paged(&self.region(region, "DescribePrefixLists")?.prefix_lists, next_token))
    }

    async fn describe_managed_prefix_lists(&self, region: &str, next_token: Option<String>) -> Result<Page<PrefixList>> {
        Ok(paged(
            &self.region(region, "DescribeManagedPrefixLists")?.managed_prefix_lists,
            next_token,
        ))
    }

    async fn describe_dhcp_options(&self, region: &str, next_token: Option<String>) -> Result<Page<DhcpOptions>> {
        Ok(paged(&self.region(region, "DescribeDhcpOptions")?.dhcp_options, next_token))
    }

    async fn describe_vpc_attribute(&self, region: &str, vpc_id: &str, attribute: VpcAttribute) -> Result<bool> {
        let data = self.region(region, "DescribeVpcAttribute")?;
        Ok(data
            .vpc_attributes
            .get(&(vpc_id.to_string(), attribute))
            .copied()
            .unwrap_or(false))
    }
}

/// Load balancers: none anywhere unless given.
#[derive(Debug, Default)]
pub struct FakeLoadBalancers {
    pub classic: Vec<ClassicLoadBalancer>,
    pub target_groups: Vec<TargetGroup>,
    pub targets: HashMap<String, Vec<String>>,
}

#[async_trait]
impl LoadBalancerApi for FakeLoadBalancers {
    async fn describe_classic_load_balancers(&self, _region: &str, marker: Option<String>) -> Result<Page<ClassicLoadBalancer>> {
        Ok(paged(&self.classic, marker))
    }

    async fn describe_target_groups(&self, _region: &str, marker: Option<String>) -> Result<Page<TargetGroup>> {
        Ok(paged(&self.target_groups, marker))
    }

    async fn describe_target_health(&self, _region: &str, target_group_arn: &str) -> Result<Vec<String>> {
        Ok(self.targets.get(target_group_arn).cloned().unwrap_or_default())
    }
}

/// Policies of one principal, as IAM lists them.
#[derive(Debug, Clone, Default)]
pub struct PrincipalPolicies {
    pub attached: Vec<AttachedPolicy>,
    /// Inline policy name to raw (URL-encoded) document.
    pub inline: Vec<(String, String)>,
}

#[derive(Debug, Default)]
pub struct FakeIam {
    pub principals: HashMap<&'static str, Vec<Principal>>,
    pub policies: HashMap<(&'static str, String), PrincipalPolicies>,
    pub groups_for_user: HashMap<String, Vec<Principal>>,
    pub customer_policies: Vec<ManagedPolicy>,
    pub aws_policies: Vec<ManagedPolicy>,
    /// Policy ARN to raw (URL-encoded) default version document.
    pub versions: HashMap<String, String>,
}

impl FakeIam {
    pub fn add_principal(&mut self, kind: PrincipalKind, principal: Principal, policies: PrincipalPolicies) {
        self.policies
            .insert((kind.as_str(), principal.name.clone()), policies);
        self.principals
            .entry(kind.as_str())
            .or_default()
            .push(principal);
    }

    fn policies_of(&self, kind: PrincipalKind, name: &str) -> PrincipalPolicies {
        self.policies
            .get(&(kind.as_str(), name.to_string()))
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl IamApi for FakeIam {
    async fn list_principals(&self, kind: PrincipalKind, marker: Option<String>) -> Result<Page<Principal>> {
        let principals = self.principals.get(kind.as_str()).cloned().unwrap_or_default();
        Ok(paged(&principals, marker))
    }

    async fn list_policies(&self, scope: PolicyScope, only_attached: bool, marker: Option<String>) -> Result<Page<ManagedPolicy>> {
        let policies: Vec<ManagedPolicy> = match scope {
            PolicyScope::Local => self.customer_policies.clone(),
            PolicyScope::Aws => self.aws_policies.clone(),
        }
        .into_iter()
        .filter(|p| !only_attached || p.attachment_count > 0)
        .collect();
        Ok(paged(&policies, marker))
    }

    async fn list_groups_for_user(&self, user_name: &str, marker: Option<String>) -> Result<Page<Principal>> {
        let groups = self.groups_for_user.get(user_name).cloned().unwrap_or_default();
        Ok(paged(&groups, marker))
    }

    async fn list_attached_policies(&self, kind: PrincipalKind, name: &str, marker: Option<String>) -> Result<Page<AttachedPolicy>> {
        Ok(paged(&self.policies_of(kind, name).attached, marker))
    }

    async fn list_inline_policies(&self, kind: PrincipalKind, name: &str, marker: Option<String>) -> Result<Page<String>> {
        let names: Vec<String> = self
            .policies_of(kind, name)
            .inline
            .into_iter()
            .map(|(policy_name, _)| policy_name)
            .collect();
        Ok(paged(&names, marker))
    }

    async fn get_inline_policy_document(&self, kind: PrincipalKind, name: &str, policy_name: &str) -> Result<String> {
        self.policies_of(kind, name)
            .inline
            .into_iter()
            .find(|(n, _)| n == policy_name)
            .map(|(_, document)| document)
            .ok_or_else(|| remote_error("iam", "GetPolicy", "NoSuchEntity"))
    }

    async fn get_policy_version_document(&self, policy_arn: &str, _version_id: &str) -> Result<String> {
        self.versions
            .get(policy_arn)
            .cloned()
            .ok_or_else(|| remote_error("iam", "GetPolicyVersion", "NoSuchEntity"))
    }
}

#[derive(Debug, Clone)]
pub struct FakeBucket {
    pub name: String,
    pub access: BucketAccess,
    /// Raw policy JSON.
    pub policy: Option<String>,
}

#[derive(Debug, Default)]
pub struct FakeS3 {
    pub buckets: Vec<FakeBucket>,
    /// Regions `bucket_policy` was asked with, in call order.
    pub policy_regions: std::sync::Mutex<Vec<String>>,
}

impl FakeS3 {
    fn bucket(&self, name: &str) -> Result<&FakeBucket> {
        self.buckets
            .iter()
            .find(|b| b.name == name)
            .ok_or_else(|| remote_error("s3", "GetBucketLocation", "NoSuchBucket"))
    }
}

#[async_trait]
impl S3Api for FakeS3 {
    async fn list_buckets(&self, continuation_token: Option<String>) -> Result<Page<String>> {
        let names: Vec<String> = self.buckets.iter().map(|b| b.name.clone()).collect();
        Ok(paged(&names, continuation_token))
    }

    async fn bucket_location(&self, bucket: &str) -> Result<BucketAccess> {
        Ok(self.bucket(bucket)?.access.clone())
    }

    async fn bucket_policy(&self, bucket: &str, region: &str) -> Result<Option<String>> {
        if let Ok(mut regions) = self.policy_regions.lock() {
            regions.push(region.to_string());
        }
        Ok(self.bucket(bucket)?.policy.clone())
    }
}
