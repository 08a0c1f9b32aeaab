//! Request builders for the primary fetch of each EC2 report.
//!
//! Criteria are appended in a fixed order: id filter, name filter, user
//! filters, then the default scoping predicate when enabled.

use super::api::DescribeRequest;
use crate::app::describer::filter::Criterion;

/// Instance states kept by the default predicate and by supporting fetches.
pub const LIVE_INSTANCE_STATES: [&str; 4] = ["pending", "running", "stopping", "stopped"];

/// User-supplied selection for one EC2 report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ec2Query {
    pub ids: Vec<String>,
    pub names: Vec<String>,
    pub filters: Vec<Criterion>,
    pub default_filter: bool,
}

impl Default for Ec2Query {
    fn default() -> Self {
        Self {
            ids: Vec::new(),
            names: Vec::new(),
            filters: Vec::new(),
            default_filter: true,
        }
    }
}

impl Ec2Query {
    pub fn has_selection(&self) -> bool {
        !self.ids.is_empty() || !self.names.is_empty()
    }
}

enum DefaultScope {
    None,
    Filter(Criterion),
    Owners(&'static [&'static str]),
}

fn build(query: &Ec2Query, id_filter: &str, name_filter: &str, default_scope: DefaultScope) -> DescribeRequest {
    let mut request = DescribeRequest::default();
    if !query.ids.is_empty() {
        request.filters.push(Criterion::new(id_filter, query.ids.iter().cloned()));
    }
    if !query.names.is_empty() {
        request.filters.push(Criterion::new(name_filter, query.names.iter().cloned()));
    }
    request.filters.extend(query.filters.iter().cloned());
    if query.default_filter {
        match default_scope {
            DefaultScope::None => {}
            DefaultScope::Filter(criterion) => request.filters.push(criterion),
            DefaultScope::Owners(owners) => request.owners = owners.iter().map(|o| o.to_string()).collect(),
        }
    }
    request
}

pub fn instances(query: &Ec2Query) -> DescribeRequest {
    build(
        query,
        "instance-id",
        "tag:Name",
        DefaultScope::Filter(live_instance_states()),
    )
}

pub fn images(query: &Ec2Query) -> DescribeRequest {
    build(query, "image-id", "name", DefaultScope::Owners(&["self"]))
}

pub fn security_groups(query: &Ec2Query) -> DescribeRequest {
    build(query, "group-id", "group-name", DefaultScope::None)
}

pub fn vpcs(query: &Ec2Query) -> DescribeRequest {
    build(
        query,
        "vpc-id",
        "tag:Name",
        DefaultScope::Filter(Criterion::new("is-default", ["false"])),
    )
}

pub fn subnets(query: &Ec2Query) -> DescribeRequest {
    build(
        query,
        "subnet-id",
        "tag:Name",
        DefaultScope::Filter(Criterion::new("default-for-az", ["false"])),
    )
}

pub fn route_tables(query: &Ec2Query) -> DescribeRequest {
    build(
        query,
        "route-table-id",
        "tag:Name",
        DefaultScope::Filter(Criterion::new("association.main", ["false"])),
    )
}

pub fn live_instance_states() -> Criterion {
    Criterion::new("instance-state-name", LIVE_INSTANCE_STATES)
}
