//! Security group reports and the permission flattening shared with the
//! instance security group join.

use super::classify::{AddressType, FlowDirection};
use super::indexes::{self, require, PrefixLists};
use super::model::{name_tag, SecurityGroup, Vpc};
use super::requests::{self, Ec2Query};
use super::Ec2Describer;
use crate::app::describer::error::Result;
use crate::app::describer::fetcher::EntityIndex;
use std::sync::Arc;

crate::report_row! {
    pub struct SecurityGroupRow {
        security_group_id: String => "SecurityGroupId",
        security_group_name: String => "SecurityGroupName",
        vpc_id: String => "VpcId",
        vpc_name: String => "VpcName",
        region: String => "Region",
    }
    order_by [region, security_group_name, vpc_name, security_group_id]
}

crate::report_row! {
    pub struct SecurityGroupPermissionRow {
        security_group_id: String => "SecurityGroupId",
        security_group_name: String => "SecurityGroupName",
        vpc_id: String => "VpcId",
        vpc_name: String => "VpcName",
        flow_direction: String => "FlowDirection",
        ip_protocol: String => "IpProtocol",
        from_port: i32 => "FromPort",
        to_port: i32 => "ToPort",
        address_type: String => "AddressType",
        cidr_block: String => "CidrBlock",
        region: String => "Region",
    }
    order_by [region, security_group_name, vpc_name, flow_direction desc, ip_protocol, from_port, to_port, address_type]
}

/// One peer of one permission of a security group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionLeaf {
    pub direction: FlowDirection,
    pub ip_protocol: String,
    pub from_port: i32,
    pub to_port: i32,
    pub address_type: AddressType,
    pub address: String,
}

/// Flatten every permission of `group` into one leaf per peer. Ingress leaves
/// precede egress leaves; within a permission the order is IPv4 ranges, IPv6
/// ranges, group pairs, prefix lists.
pub fn permission_leaves(group: &SecurityGroup, prefix_lists: &PrefixLists) -> Result<Vec<PermissionLeaf>> {
    let mut leaves = Vec::new();
    for (direction, permissions) in [
        (FlowDirection::Ingress, &group.ingress),
        (FlowDirection::Egress, &group.egress),
    ] {
        for permission in permissions {
            let leaf = |address_type: AddressType, address: String| PermissionLeaf {
                direction,
                ip_protocol: permission.ip_protocol.clone(),
                from_port: permission.from_port,
                to_port: permission.to_port,
                address_type,
                address,
            };
            for cidr in &permission.ipv4_ranges {
                leaves.push(leaf(AddressType::Ipv4, cidr.clone()));
            }
            for cidr in &permission.ipv6_ranges {
                leaves.push(leaf(AddressType::Ipv6, cidr.clone()));
            }
            for pair in &permission.user_id_group_pairs {
                leaves.push(leaf(
                    AddressType::SecurityGroup,
                    format!("{}/{}", pair.group_id, pair.user_id),
                ));
            }
            for prefix_list_id in &permission.prefix_list_ids {
                let name = prefix_lists.name(prefix_list_id)?;
                leaves.push(leaf(
                    AddressType::PrefixList,
                    format!("{}/{}", prefix_list_id, name),
                ));
            }
        }
    }
    Ok(leaves)
}

pub fn security_group_rows(
    region: &str,
    groups: &EntityIndex<SecurityGroup>,
    vpcs: &EntityIndex<Vpc>,
) -> Result<Vec<SecurityGroupRow>> {
    groups
        .values()
        .map(|group| {
            let vpc = require(vpcs, "vpc", &group.vpc_id)?;
            Ok(SecurityGroupRow {
                security_group_id: group.group_id.clone(),
                security_group_name: group.group_name.clone(),
                vpc_id: group.vpc_id.clone(),
                vpc_name: name_tag(&vpc.tags),
                region: region.to_string(),
            })
        })
        .collect()
}

pub fn security_group_permission_rows(
    region: &str,
    groups: &EntityIndex<SecurityGroup>,
    vpcs: &EntityIndex<Vpc>,
    prefix_lists: &PrefixLists,
) -> Result<Vec<SecurityGroupPermissionRow>> {
    let mut rows = Vec::new();
    for group in groups.values() {
        let vpc = require(vpcs, "vpc", &group.vpc_id)?;
        let vpc_name = name_tag(&vpc.tags);
        for leaf in permission_leaves(group, prefix_lists)? {
            rows.push(SecurityGroupPermissionRow {
                security_group_id: group.group_id.clone(),
                security_group_name: group.group_name.clone(),
                vpc_id: group.vpc_id.clone(),
                vpc_name: vpc_name.clone(),
                flow_direction: leaf.direction.as_str().to_string(),
                ip_protocol: leaf.ip_protocol,
                from_port: leaf.from_port,
                to_port: leaf.to_port,
                address_type: leaf.address_type.as_str().to_string(),
                cidr_block: leaf.address,
                region: region.to_string(),
            });
        }
    }
    Ok(rows)
}

impl Ec2Describer {
    pub async fn security_groups(&self, query: &Ec2Query) -> Result<Vec<SecurityGroupRow>> {
        let request = Arc::new(requests::security_groups(query));
        self.per_region(move |clients, scope, sink| {
            let request = Arc::clone(&request);
            async move {
                let api = clients.ec2.as_ref();
                let (groups, vpcs) = tokio::try_join!(
                    indexes::security_groups(api, &scope, &request),
                    indexes::all_vpcs(api, &scope),
                )?;
                sink.emit_all(security_group_rows(scope.region(), &groups, &vpcs)?)
                    .await
            }
        })
        .await
    }

    pub async fn security_group_permissions(&self, query: &Ec2Query) -> Result<Vec<SecurityGroupPermissionRow>> {
        let request = Arc::new(requests::security_groups(query));
        self.per_region(move |clients, scope, sink| {
            let request = Arc::clone(&request);
            async move {
                let api = clients.ec2.as_ref();
                let (groups, vpcs, prefix_lists) = tokio::try_join!(
                    indexes::security_groups(api, &scope, &request),
                    indexes::all_vpcs(api, &scope),
                    indexes::prefix_lists(api, &scope),
                )?;
                let rows = security_group_permission_rows(scope.region(), &groups, &vpcs, &prefix_lists)?;
                sink.emit_all(rows).await
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::describer::aws_services::ec2::model::{IpPermission, PrefixList, Tag, UserIdGroupPair};
    use crate::app::describer::error::DescribeError;
    use pretty_assertions::assert_eq;

    fn group() -> SecurityGroup {
        SecurityGroup {
            group_id: "sg-1".to_string(),
            group_name: "web".to_string(),
            vpc_id: "vpc-1".to_string(),
            ingress: vec![IpPermission {
                ip_protocol: "tcp".to_string(),
                from_port: 443,
                to_port: 443,
                ipv4_ranges: vec!["10.0.0.0/8".to_string(), "192.168.0.0/16".to_string()],
                user_id_group_pairs: vec![UserIdGroupPair {
                    group_id: "sg-2".to_string(),
                    user_id: "123456789012".to_string(),
                }],
                ..Default::default()
            }],
            egress: vec![IpPermission {
                ip_protocol: "-1".to_string(),
                ipv6_ranges: vec!["::/0".to_string()],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn vpcs() -> EntityIndex<Vpc> {
        [(
            "vpc-1".to_string(),
            Vpc {
                vpc_id: "vpc-1".to_string(),
                tags: Tag::name("main"),
                ..Default::default()
            },
        )]
        .into()
    }

    fn groups(group: SecurityGroup) -> EntityIndex<SecurityGroup> {
        [(group.group_id.clone(), group)].into()
    }

    #[test]
    fn test_two_cidrs_and_one_peer_yield_three_rows() {
        let mut group = group();
        group.egress.clear();
        let rows = security_group_permission_rows("eu-west-1", &groups(group), &vpcs(), &PrefixLists::default()).unwrap();

        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|row| row.security_group_id == "sg-1"
            && row.vpc_name == "main"
            && row.from_port == 443
            && row.flow_direction == "Ingress"
            && row.region == "eu-west-1"));
        let addresses: Vec<_> = rows.iter().map(|row| (row.address_type.as_str(), row.cidr_block.as_str())).collect();
        assert_eq!(
            addresses,
            vec![
                ("Ipv4", "10.0.0.0/8"),
                ("Ipv4", "192.168.0.0/16"),
                ("SecurityGroup", "sg-2/123456789012"),
            ]
        );
    }

    #[test]
    fn test_ingress_leaves_precede_egress() {
        let leaves = permission_leaves(&group(), &PrefixLists::default()).unwrap();
        assert_eq!(leaves.len(), 4);
        assert_eq!(leaves[3].direction, FlowDirection::Egress);
        assert_eq!(leaves[3].address_type, AddressType::Ipv6);
        assert!(leaves[..3].iter().all(|leaf| leaf.direction == FlowDirection::Ingress));
    }

    #[test]
    fn test_prefix_list_peer_is_named() {
        let mut group = group();
        group.ingress[0].prefix_list_ids = vec!["pl-1".to_string()];
        let prefix_lists = PrefixLists {
            managed: [(
                "pl-1".to_string(),
                PrefixList {
                    prefix_list_id: "pl-1".to_string(),
                    prefix_list_name: "office".to_string(),
                },
            )]
            .into(),
            ..Default::default()
        };
        let leaves = permission_leaves(&group, &prefix_lists).unwrap();
        assert_eq!(leaves[3].address, "pl-1/office");
        assert_eq!(leaves[3].address_type, AddressType::PrefixList);

        let err = permission_leaves(&group, &PrefixLists::default()).unwrap_err();
        assert!(matches!(err, DescribeError::Lookup { kind: "prefix list", .. }));
    }

    #[test]
    fn test_missing_vpc_is_lookup_error() {
        let err = security_group_rows("eu-west-1", &groups(group()), &EntityIndex::new()).unwrap_err();
        assert!(matches!(err, DescribeError::Lookup { kind: "vpc", .. }));
    }
}
