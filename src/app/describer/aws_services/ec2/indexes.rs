//! Index fetches and the lookups resolvers run against them.

use super::api::{DescribeRequest, Ec2Api};
use super::model::{
    name_tag, DhcpOptions, Image, Instance, PrefixList, RouteTable, SecurityGroup, Snapshot, Subnet, Volume, Vpc,
};
use super::requests;
use crate::app::describer::error::{DescribeError, Result};
use crate::app::describer::fetcher::{fetch_index, EntityIndex};
use crate::app::describer::scope::CallScope;
use std::collections::{BTreeSet, HashMap};

pub async fn instances(api: &dyn Ec2Api, scope: &CallScope, request: &DescribeRequest) -> Result<EntityIndex<Instance>> {
    let region = scope.region();
    fetch_index(scope, "instances", move |token| api.describe_instances(region, request, token)).await
}

/// Instances in a live state, for reports that join against them.
pub async fn live_instances(api: &dyn Ec2Api, scope: &CallScope) -> Result<EntityIndex<Instance>> {
    let request = DescribeRequest::with_filter(requests::live_instance_states());
    instances(api, scope, &request).await
}

pub async fn images(api: &dyn Ec2Api, scope: &CallScope, request: &DescribeRequest) -> Result<EntityIndex<Image>> {
    let region = scope.region();
    fetch_index(scope, "images", move |token| api.describe_images(region, request, token)).await
}

/// Images referenced by `instances`. No call is made when none are referenced.
pub async fn images_of(
    api: &dyn Ec2Api,
    scope: &CallScope,
    instances: &EntityIndex<Instance>,
) -> Result<EntityIndex<Image>> {
    let ids: BTreeSet<String> = instances
        .values()
        .map(|instance| instance.image_id.clone())
        .filter(|id| !id.is_empty())
        .collect();
    if ids.is_empty() {
        return Ok(EntityIndex::new());
    }
    let request = DescribeRequest {
        ids: ids.into_iter().collect(),
        ..Default::default()
    };
    images(api, scope, &request).await
}

pub async fn own_snapshots(api: &dyn Ec2Api, scope: &CallScope) -> Result<EntityIndex<Snapshot>> {
    let region = scope.region();
    let request = DescribeRequest::with_owners(&["self"]);
    let request = &request;
    fetch_index(scope, "snapshots", move |token| api.describe_snapshots(region, request, token)).await
}

pub async fn volumes(api: &dyn Ec2Api, scope: &CallScope) -> Result<EntityIndex<Volume>> {
    let region = scope.region();
    let request = DescribeRequest::default();
    let request = &request;
    fetch_index(scope, "volumes", move |token| api.describe_volumes(region, request, token)).await
}

pub async fn security_groups(
    api: &dyn Ec2Api,
    scope: &CallScope,
    request: &DescribeRequest,
) -> Result<EntityIndex<SecurityGroup>> {
    let region = scope.region();
    fetch_index(scope, "security groups", move |token| api.describe_security_groups(region, request, token)).await
}

pub async fn vpcs(api: &dyn Ec2Api, scope: &CallScope, request: &DescribeRequest) -> Result<EntityIndex<Vpc>> {
    let region = scope.region();
    fetch_index(scope, "vpcs", move |token| api.describe_vpcs(region, request, token)).await
}

pub async fn subnets(
    api: &dyn Ec2Api,
    scope: &CallScope,
    request: &DescribeRequest,
) -> Result<EntityIndex<Subnet>> {
    let region = scope.region();
    fetch_index(scope, "subnets", move |token| api.describe_subnets(region, request, token)).await
}

pub async fn route_tables(api: &dyn Ec2Api, scope: &CallScope, request: &DescribeRequest) -> Result<EntityIndex<RouteTable>> {
    let region = scope.region();
    fetch_index(scope, "route tables", move |token| api.describe_route_tables(region, request, token)).await
}

/// Unfiltered VPC index, for joins.
pub async fn all_vpcs(api: &dyn Ec2Api, scope: &CallScope) -> Result<EntityIndex<Vpc>> {
    vpcs(api, scope, &DescribeRequest::default()).await
}

/// Unfiltered subnet index, for joins.
pub async fn all_subnets(api: &dyn Ec2Api, scope: &CallScope) -> Result<EntityIndex<Subnet>> {
    subnets(api, scope, &DescribeRequest::default()).await
}

/// Unfiltered route table index, for joins.
pub async fn all_route_tables(api: &dyn Ec2Api, scope: &CallScope) -> Result<EntityIndex<RouteTable>> {
    route_tables(api, scope, &DescribeRequest::default()).await
}

/// Unfiltered security group index, for joins.
pub async fn all_security_groups(api: &dyn Ec2Api, scope: &CallScope) -> Result<EntityIndex<SecurityGroup>> {
    security_groups(api, scope, &DescribeRequest::default()).await
}

/// AWS-managed and customer-managed prefix lists of one region.
#[derive(Debug, Clone, Default)]
pub struct PrefixLists {
    pub unmanaged: EntityIndex<PrefixList>,
    pub managed: EntityIndex<PrefixList>,
}

impl PrefixLists {
    pub fn name(&self, id: &str) -> Result<String> {
        prefix_list_name(&self.unmanaged, &self.managed, id)
    }
}

/// Both prefix list kinds, fetched concurrently.
pub async fn prefix_lists(api: &dyn Ec2Api, scope: &CallScope) -> Result<PrefixLists> {
    let region = scope.region();
    let (unmanaged, managed) = tokio::try_join!(
        fetch_index(scope, "prefix lists", move |token| api.describe_prefix_lists(region, token)),
        fetch_index(scope, "managed prefix lists", move |token| api
            .describe_managed_prefix_lists(region, token)),
    )?;
    Ok(PrefixLists { unmanaged, managed })
}

pub async fn dhcp_options(api: &dyn Ec2Api, scope: &CallScope) -> Result<EntityIndex<DhcpOptions>> {
    let region = scope.region();
    fetch_index(scope, "dhcp options", move |token| api.describe_dhcp_options(region, token)).await
}

/// Mandatory lookup: a miss is a `Lookup` error.
pub fn require<'a, T>(index: &'a EntityIndex<T>, kind: &'static str, id: &str) -> Result<&'a T> {
    index.get(id).ok_or_else(|| DescribeError::lookup(kind, id))
}

/// Name of a prefix list, searching AWS-managed lists before customer-managed.
pub fn prefix_list_name(
    unmanaged: &EntityIndex<PrefixList>,
    managed: &EntityIndex<PrefixList>,
    id: &str,
) -> Result<String> {
    unmanaged
        .get(id)
        .or_else(|| managed.get(id))
        .map(|list| list.prefix_list_name.clone())
        .ok_or_else(|| DescribeError::lookup("prefix list", id))
}

/// Name of a DHCP option set. The literal id `default` means no option set.
pub fn dhcp_options_name(index: &EntityIndex<DhcpOptions>, id: &str) -> Result<String> {
    if id == "default" {
        return Ok(String::new());
    }
    require(index, "dhcp options", id).map(|options| name_tag(&options.tags))
}

/// Resolves the route table governing a subnet: its explicit association,
/// or else the main table of its VPC.
pub struct RouteTableLookup<'a> {
    tables: &'a EntityIndex<RouteTable>,
    by_subnet: HashMap<&'a str, &'a RouteTable>,
}

impl<'a> RouteTableLookup<'a> {
    pub fn new(tables: &'a EntityIndex<RouteTable>) -> Self {
        let mut by_subnet = HashMap::new();
        for table in tables.values() {
            for assoc in &table.associations {
                if let Some(subnet_id) = assoc.subnet_id.as_deref().filter(|id| !id.is_empty()) {
                    by_subnet.insert(subnet_id, table);
                }
            }
        }
        Self { tables, by_subnet }
    }

    pub fn for_subnet(&self, subnet_id: &str, vpc_id: &str) -> Result<&'a RouteTable> {
        if let Some(table) = self.by_subnet.get(subnet_id) {
            return Ok(table);
        }
        self.main_of(vpc_id)
            .ok_or_else(|| DescribeError::lookup("route table", format!("{} (vpc {})", subnet_id, vpc_id)))
    }

    fn main_of(&self, vpc_id: &str) -> Option<&'a RouteTable> {
        self.tables
            .values()
            .find(|table| table.vpc_id == vpc_id && table.is_main())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::describer::aws_services::ec2::model::{RouteTableAssociation, Tag};
    use pretty_assertions::assert_eq;

    fn table(id: &str, vpc_id: &str, main: bool, subnets: &[&str]) -> RouteTable {
        let mut associations: Vec<RouteTableAssociation> = subnets
            .iter()
            .map(|subnet| RouteTableAssociation {
                main: false,
                subnet_id: Some(subnet.to_string()),
                state: "associated".to_string(),
            })
            .collect();
        if main {
            associations.push(RouteTableAssociation {
                main: true,
                subnet_id: None,
                state: "associated".to_string(),
            });
        }
        RouteTable {
            route_table_id: id.to_string(),
            vpc_id: vpc_id.to_string(),
            associations,
            ..Default::default()
        }
    }

    fn index(tables: Vec<RouteTable>) -> EntityIndex<RouteTable> {
        tables.into_iter().map(|t| (t.route_table_id.clone(), t)).collect()
    }

    #[test]
    fn test_explicit_association_wins() {
        let tables = index(vec![
            table("rtb-main", "vpc-1", true, &[]),
            table("rtb-a", "vpc-1", false, &["subnet-a"]),
        ]);
        let lookup = RouteTableLookup::new(&tables);
        assert_eq!(lookup.for_subnet("subnet-a", "vpc-1").unwrap().route_table_id, "rtb-a");
    }

    #[test]
    fn test_falls_back_to_main_table_of_vpc() {
        let tables = index(vec![
            table("rtb-other", "vpc-2", true, &[]),
            table("rtb-main", "vpc-1", true, &[]),
            table("rtb-a", "vpc-1", false, &["subnet-a"]),
        ]);
        let lookup = RouteTableLookup::new(&tables);
        assert_eq!(lookup.for_subnet("subnet-b", "vpc-1").unwrap().route_table_id, "rtb-main");
    }

    #[test]
    fn test_no_main_table_is_lookup_error() {
        let tables = index(vec![table("rtb-a", "vpc-1", false, &["subnet-a"])]);
        let lookup = RouteTableLookup::new(&tables);
        let err = lookup.for_subnet("subnet-b", "vpc-1").unwrap_err();
        assert!(matches!(err, DescribeError::Lookup { kind: "route table", .. }));
    }

    #[test]
    fn test_prefix_list_name_checks_unmanaged_first() {
        let list = |id: &str, name: &str| PrefixList {
            prefix_list_id: id.to_string(),
            prefix_list_name: name.to_string(),
        };
        let unmanaged: EntityIndex<PrefixList> = [("pl-1".to_string(), list("pl-1", "com.amazonaws.s3"))].into();
        let managed: EntityIndex<PrefixList> = [
            ("pl-1".to_string(), list("pl-1", "shadowed")),
            ("pl-2".to_string(), list("pl-2", "office")),
        ]
        .into();
        assert_eq!(prefix_list_name(&unmanaged, &managed, "pl-1").unwrap(), "com.amazonaws.s3");
        assert_eq!(prefix_list_name(&unmanaged, &managed, "pl-2").unwrap(), "office");
        assert!(prefix_list_name(&unmanaged, &managed, "pl-3").is_err());
    }

    #[test]
    fn test_default_dhcp_options_resolve_to_empty_name() {
        let options: EntityIndex<DhcpOptions> = [(
            "dopt-1".to_string(),
            DhcpOptions {
                dhcp_options_id: "dopt-1".to_string(),
                tags: Tag::name("corp"),
            },
        )]
        .into();
        assert_eq!(dhcp_options_name(&options, "default").unwrap(), "");
        assert_eq!(dhcp_options_name(&options, "dopt-1").unwrap(), "corp");
        assert!(dhcp_options_name(&options, "dopt-2").is_err());
    }
}
