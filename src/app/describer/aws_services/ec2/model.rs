//! EC2 entities as the resolvers see them.
//!
//! The SDK adapter converts every describe response into these records, so the
//! correlation code and its tests never touch SDK builders. Scalar fields the
//! API leaves unset become empty strings; foreign keys whose absence carries
//! meaning stay `Option`.

use crate::app::describer::fetcher::Keyed;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Convenience for the common `Name` tag.
    pub fn name(value: impl Into<String>) -> Vec<Tag> {
        vec![Tag::new("Name", value)]
    }
}

/// Value of the tag whose key equals `Name` ignoring ASCII case, or empty.
pub fn name_tag(tags: &[Tag]) -> String {
    tags.iter()
        .find(|tag| tag.key.eq_ignore_ascii_case("Name"))
        .map(|tag| tag.value.clone())
        .unwrap_or_default()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupIdentifier {
    pub group_id: String,
    pub group_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceBlockDevice {
    pub device_name: String,
    /// `None` for non-EBS mappings.
    pub volume_id: Option<String>,
    pub delete_on_termination: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Instance {
    pub instance_id: String,
    pub instance_type: String,
    pub private_ip_address: String,
    pub public_ip_address: String,
    pub platform_details: String,
    pub state: String,
    pub availability_zone: String,
    pub vpc_id: String,
    pub subnet_id: String,
    pub image_id: String,
    pub security_groups: Vec<GroupIdentifier>,
    pub block_devices: Vec<InstanceBlockDevice>,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageBlockDevice {
    pub device_name: String,
    /// `None` for non-EBS mappings.
    pub ebs: Option<EbsSnapshotMapping>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EbsSnapshotMapping {
    pub snapshot_id: Option<String>,
    pub delete_on_termination: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Image {
    pub image_id: String,
    pub name: String,
    pub owner_id: String,
    pub creation_date: String,
    pub architecture: String,
    pub platform_details: String,
    pub ena_support: bool,
    pub public: bool,
    pub state: String,
    pub block_devices: Vec<ImageBlockDevice>,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub snapshot_id: String,
    pub volume_id: Option<String>,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Volume {
    pub volume_id: String,
    pub volume_type: String,
    pub size: i32,
    pub iops: i32,
    pub encrypted: bool,
    pub snapshot_id: Option<String>,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserIdGroupPair {
    pub group_id: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IpPermission {
    pub ip_protocol: String,
    pub from_port: i32,
    pub to_port: i32,
    pub ipv4_ranges: Vec<String>,
    pub ipv6_ranges: Vec<String>,
    pub user_id_group_pairs: Vec<UserIdGroupPair>,
    pub prefix_list_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityGroup {
    pub group_id: String,
    pub group_name: String,
    pub vpc_id: String,
    pub ingress: Vec<IpPermission>,
    pub egress: Vec<IpPermission>,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VpcIpv6Association {
    pub ipv6_cidr_block: String,
    pub network_border_group: String,
    pub ipv6_pool: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vpc {
    pub vpc_id: String,
    pub dhcp_options_id: String,
    pub is_default: bool,
    pub instance_tenancy: String,
    pub owner_id: String,
    pub state: String,
    pub ipv4_cidr_blocks: Vec<String>,
    pub ipv6_associations: Vec<VpcIpv6Association>,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subnet {
    pub subnet_id: String,
    pub vpc_id: String,
    pub cidr_block: String,
    pub availability_zone: String,
    pub available_ip_address_count: i32,
    pub default_for_az: bool,
    pub state: String,
    pub ipv6_cidr_blocks: Vec<String>,
    pub tags: Vec<Tag>,
}

/// A route. Exactly one destination and one target field is expected to be
/// set; the classifiers in `classify` decide which one wins otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Route {
    pub destination_cidr_block: Option<String>,
    pub destination_ipv6_cidr_block: Option<String>,
    pub destination_prefix_list_id: Option<String>,
    pub gateway_id: Option<String>,
    pub nat_gateway_id: Option<String>,
    pub vpc_peering_connection_id: Option<String>,
    pub transit_gateway_id: Option<String>,
    pub egress_only_internet_gateway_id: Option<String>,
    pub carrier_gateway_id: Option<String>,
    pub instance_id: Option<String>,
    pub instance_owner_id: Option<String>,
    pub network_interface_id: Option<String>,
    pub local_gateway_id: Option<String>,
    pub core_network_arn: Option<String>,
    pub state: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTableAssociation {
    pub main: bool,
    pub subnet_id: Option<String>,
    pub state: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTable {
    pub route_table_id: String,
    pub vpc_id: String,
    pub routes: Vec<Route>,
    pub associations: Vec<RouteTableAssociation>,
    pub tags: Vec<Tag>,
}

impl RouteTable {
    pub fn is_main(&self) -> bool {
        self.associations.iter().any(|assoc| assoc.main)
    }
}

/// Both AWS-managed (`DescribePrefixLists`) and customer-managed
/// (`DescribeManagedPrefixLists`) prefix lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixList {
    pub prefix_list_id: String,
    pub prefix_list_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DhcpOptions {
    pub dhcp_options_id: String,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VpcAttribute {
    EnableDnsSupport,
    EnableDnsHostnames,
}

macro_rules! keyed_by {
    ($($entity:ty => $field:ident),* $(,)?) => {
        $(impl Keyed for $entity {
            fn key(&self) -> &str {
                &self.$field
            }
        })*
    };
}

keyed_by! {
    Instance => instance_id,
    Image => image_id,
    Snapshot => snapshot_id,
    Volume => volume_id,
    SecurityGroup => group_id,
    Vpc => vpc_id,
    Subnet => subnet_id,
    RouteTable => route_table_id,
    PrefixList => prefix_list_id,
    DhcpOptions => dhcp_options_id,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_tag_matches_key_case_insensitively() {
        let tags = vec![Tag::new("env", "prod"), Tag::new("NAME", "web-1")];
        assert_eq!(name_tag(&tags), "web-1");
    }

    #[test]
    fn test_missing_name_tag_is_empty() {
        assert_eq!(name_tag(&[Tag::new("env", "prod")]), "");
        assert_eq!(name_tag(&[]), "");
    }

    #[test]
    fn test_route_table_is_main_when_any_association_is_main() {
        let table = RouteTable {
            associations: vec![
                RouteTableAssociation {
                    subnet_id: Some("subnet-1".to_string()),
                    ..Default::default()
                },
                RouteTableAssociation {
                    main: true,
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        assert!(table.is_main());
        assert!(!RouteTable::default().is_main());
    }
}
