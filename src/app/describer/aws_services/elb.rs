//! Load balancer attachments of EC2 instances: classic load balancers and
//! v2 target groups whose targets are instances.

use crate::app::describer::error::Result;
use crate::app::describer::fetcher::{fetch_all, Page};
use crate::app::describer::scope::CallScope;
use crate::app::describer::sdk_errors::from_sdk_error;
use async_trait::async_trait;
use aws_sdk_elasticloadbalancing as elb;
use aws_sdk_elasticloadbalancingv2 as elbv2;
use aws_types::region::Region;
use aws_types::SdkConfig;
use futures::future::try_join_all;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassicLoadBalancer {
    pub name: String,
    pub instance_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetGroup {
    pub arn: String,
    pub name: String,
    pub target_type: String,
}

#[async_trait]
pub trait LoadBalancerApi: Send + Sync {
    async fn describe_classic_load_balancers(&self, region: &str, marker: Option<String>) -> Result<Page<ClassicLoadBalancer>>;

    async fn describe_target_groups(&self, region: &str, marker: Option<String>) -> Result<Page<TargetGroup>>;

    /// IDs of the registered targets of one target group.
    async fn describe_target_health(&self, region: &str, target_group_arn: &str) -> Result<Vec<String>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LoadBalancerKind {
    Classic,
    TargetGroup,
}

impl LoadBalancerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadBalancerKind::Classic => "Classic",
            LoadBalancerKind::TargetGroup => "TargetGroup",
        }
    }
}

/// Instance ID to the load balancers and target groups it is attached to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadBalancerAttachments {
    by_instance: BTreeMap<String, Vec<(LoadBalancerKind, String)>>,
}

impl LoadBalancerAttachments {
    pub fn attach(&mut self, instance_id: impl Into<String>, kind: LoadBalancerKind, name: impl Into<String>) {
        self.by_instance
            .entry(instance_id.into())
            .or_default()
            .push((kind, name.into()));
    }

    pub fn for_instance(&self, instance_id: &str) -> &[(LoadBalancerKind, String)] {
        self.by_instance
            .get(instance_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Sorted, deduplicated IDs of every attached instance.
    pub fn instance_ids(&self) -> Vec<String> {
        self.by_instance
            .keys()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Fetch both attachment sources of one region concurrently. Target health is
/// queried once per instance-type target group.
pub async fn attachments(api: &dyn LoadBalancerApi, scope: &CallScope) -> Result<LoadBalancerAttachments> {
    let region = scope.region();
    let (classic, groups) = tokio::try_join!(
        fetch_all(scope, "classic load balancers", move |marker| api
            .describe_classic_load_balancers(region, marker)),
        fetch_all(scope, "target groups", move |marker| api.describe_target_groups(region, marker)),
    )?;

    let groups: Vec<TargetGroup> = groups
        .into_iter()
        .filter(|group| group.target_type == "instance")
        .collect();
    let targets = try_join_all(
        groups
            .iter()
            .map(|group| scope.call(api.describe_target_health(region, &group.arn))),
    )
    .await?;

    let mut attachments = LoadBalancerAttachments::default();
    for lb in classic {
        for instance_id in lb.instance_ids {
            attachments.attach(instance_id, LoadBalancerKind::Classic, lb.name.clone());
        }
    }
    for (group, target_ids) in groups.iter().zip(targets) {
        for target_id in target_ids {
            attachments.attach(target_id, LoadBalancerKind::TargetGroup, group.name.clone());
        }
    }
    log_debug!(
        "{} instance(s) attached to load balancers in {}",
        attachments.by_instance.len(),
        region
    );
    Ok(attachments)
}

#[derive(Debug, Clone)]
pub struct LoadBalancerSdkClient {
    sdk_config: SdkConfig,
}

impl LoadBalancerSdkClient {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            sdk_config: sdk_config.clone(),
        }
    }

    fn classic(&self, region: &str) -> elb::Client {
        let config = elb::config::Builder::from(&self.sdk_config)
            .region(Region::new(region.to_string()))
            .build();
        elb::Client::from_conf(config)
    }

    fn v2(&self, region: &str) -> elbv2::Client {
        let config = elbv2::config::Builder::from(&self.sdk_config)
            .region(Region::new(region.to_string()))
            .build();
        elbv2::Client::from_conf(config)
    }
}

#[async_trait]
impl LoadBalancerApi for LoadBalancerSdkClient {
    async fn describe_classic_load_balancers(&self, region: &str, marker: Option<String>) -> Result<Page<ClassicLoadBalancer>> {
        let output = self
            .classic(region)
            .describe_load_balancers()
            .set_marker(marker)
            .send()
            .await
            .map_err(|err| from_sdk_error("elasticloadbalancing", "DescribeLoadBalancers", err))?;
        let items = output
            .load_balancer_descriptions
            .unwrap_or_default()
            .into_iter()
            .map(|lb| ClassicLoadBalancer {
                name: lb.load_balancer_name.unwrap_or_default(),
                instance_ids: lb
                    .instances
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|instance| instance.instance_id)
                    .collect(),
            })
            .collect();
        Ok(Page::new(items, output.next_marker))
    }

    async fn describe_target_groups(&self, region: &str, marker: Option<String>) -> Result<Page<TargetGroup>> {
        let output = self
            .v2(region)
            .describe_target_groups()
            .set_marker(marker)
            .send()
            .await
            .map_err(|err| from_sdk_error("elasticloadbalancingv2", "DescribeTargetGroups", err))?;
        let items = output
            .target_groups
            .unwrap_or_default()
            .into_iter()
            .map(|group| TargetGroup {
                arn: group.target_group_arn.unwrap_or_default(),
                name: group.target_group_name.unwrap_or_default(),
                target_type: group
                    .target_type
                    .map(|t| t.as_str().to_string())
                    .unwrap_or_default(),
            })
            .collect();
        Ok(Page::new(items, output.next_marker))
    }

    async fn describe_target_health(&self, region: &str, target_group_arn: &str) -> Result<Vec<String>> {
        let output = self
            .v2(region)
            .describe_target_health()
            .target_group_arn(target_group_arn)
            .send()
            .await
            .map_err(|err| from_sdk_error("elasticloadbalancingv2", "DescribeTargetHealth", err))?;
        Ok(output
            .target_health_descriptions
            .unwrap_or_default()
            .into_iter()
            .filter_map(|description| description.target.and_then(|target| target.id))
            .collect())
    }
}
