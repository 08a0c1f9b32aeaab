//! Ordered classification chains for routes and permission peers.

use super::model::Route;
use crate::app::describer::error::{DescribeError, Result};

/// Address family of a route destination or a permission peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressType {
    Ipv4,
    Ipv6,
    SecurityGroup,
    PrefixList,
}

impl AddressType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressType::Ipv4 => "Ipv4",
            AddressType::Ipv6 => "Ipv6",
            AddressType::SecurityGroup => "SecurityGroup",
            AddressType::PrefixList => "PrefixList",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetType {
    Local,
    InternetGateway,
    VpnGateway,
    VpcEndpoint,
    Other,
    NatGateway,
    VpcPeeringConnection,
    TransitGateway,
    EgressOnlyInternetGateway,
    CarrierGateway,
    Instance,
    NetworkInterface,
    OutpostLocalGateway,
    CoreNetwork,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Local => "Local",
            TargetType::InternetGateway => "InternetGateway",
            TargetType::VpnGateway => "VpnGateway",
            TargetType::VpcEndpoint => "VpcEndpoint",
            TargetType::Other => "Other",
            TargetType::NatGateway => "NatGateway",
            TargetType::VpcPeeringConnection => "VpcPeeringConnection",
            TargetType::TransitGateway => "TransitGateway",
            TargetType::EgressOnlyInternetGateway => "EgressOnlyInternetGateway",
            TargetType::CarrierGateway => "CarrierGateway",
            TargetType::Instance => "Instance",
            TargetType::NetworkInterface => "NetworkInterface",
            TargetType::OutpostLocalGateway => "OutpostLocalGateway",
            TargetType::CoreNetwork => "CoreNetwork",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowDirection {
    Ingress,
    Egress,
}

impl FlowDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowDirection::Ingress => "Ingress",
            FlowDirection::Egress => "Egress",
        }
    }
}

const DESTINATION_TYPES: &str = "Ipv4, Ipv6, PrefixList";
const TARGET_TYPES: &str = "GatewayId, NatGatewayId, VpcPeeringConnectionId, TransitGatewayId, \
                            EgressOnlyInternetGatewayId, CarrierGatewayId, InstanceId, NetworkInterfaceId, \
                            LocalGatewayId, CoreNetworkArn";

/// A field counts as set whenever it is `Some`, even when empty.
fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref()
}

/// Classify the destination of `route`; the earliest populated field wins.
pub fn route_destination(route: &Route, route_table_id: &str) -> Result<(AddressType, String)> {
    if let Some(cidr) = present(&route.destination_cidr_block) {
        return Ok((AddressType::Ipv4, cidr.to_string()));
    }
    if let Some(cidr) = present(&route.destination_ipv6_cidr_block) {
        return Ok((AddressType::Ipv6, cidr.to_string()));
    }
    if let Some(prefix_list) = present(&route.destination_prefix_list_id) {
        return Ok((AddressType::PrefixList, prefix_list.to_string()));
    }
    Err(DescribeError::Classification {
        subject: "destination",
        route_table: route_table_id.to_string(),
        valid: DESTINATION_TYPES.to_string(),
    })
}

fn gateway_type(gateway_id: &str) -> TargetType {
    if gateway_id.starts_with("local") {
        TargetType::Local
    } else if gateway_id.starts_with("igw") {
        TargetType::InternetGateway
    } else if gateway_id.starts_with("vgw") {
        TargetType::VpnGateway
    } else if gateway_id.starts_with("vpce") {
        TargetType::VpcEndpoint
    } else {
        TargetType::Other
    }
}

/// Classify the target of `route`; the earliest populated field wins.
pub fn route_target(route: &Route, route_table_id: &str) -> Result<(TargetType, String)> {
    if let Some(gateway) = present(&route.gateway_id) {
        return Ok((gateway_type(gateway), gateway.to_string()));
    }
    let chain: [(&Option<String>, TargetType); 5] = [
        (&route.nat_gateway_id, TargetType::NatGateway),
        (&route.vpc_peering_connection_id, TargetType::VpcPeeringConnection),
        (&route.transit_gateway_id, TargetType::TransitGateway),
        (&route.egress_only_internet_gateway_id, TargetType::EgressOnlyInternetGateway),
        (&route.carrier_gateway_id, TargetType::CarrierGateway),
    ];
    for (field, target_type) in chain {
        if let Some(value) = present(field) {
            return Ok((target_type, value.to_string()));
        }
    }
    if let Some(instance) = present(&route.instance_id) {
        let owner = route.instance_owner_id.as_deref().unwrap_or_default();
        return Ok((TargetType::Instance, format!("{}/{}", instance, owner)));
    }
    let chain: [(&Option<String>, TargetType); 3] = [
        (&route.network_interface_id, TargetType::NetworkInterface),
        (&route.local_gateway_id, TargetType::OutpostLocalGateway),
        (&route.core_network_arn, TargetType::CoreNetwork),
    ];
    for (field, target_type) in chain {
        if let Some(value) = present(field) {
            return Ok((target_type, value.to_string()));
        }
    }
    Err(DescribeError::Classification {
        subject: "target",
        route_table: route_table_id.to_string(),
        valid: TARGET_TYPES.to_string(),
    })
}

/// Classified destination and target of a route, as rendered in route rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedRoute {
    pub destination_type: AddressType,
    pub destination: String,
    pub target_type: TargetType,
    pub target: String,
    pub state: String,
}

pub fn classify_route(route: &Route, route_table_id: &str) -> Result<ClassifiedRoute> {
    let (destination_type, destination) = route_destination(route, route_table_id)?;
    let (target_type, target) = route_target(route, route_table_id)?;
    Ok(ClassifiedRoute {
        destination_type,
        destination,
        target_type,
        target,
        state: route.state.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn some(value: &str) -> Option<String> {
        Some(value.to_string())
    }

    #[test]
    fn test_destination_prefers_ipv4() {
        let route = Route {
            destination_cidr_block: some("10.0.0.0/16"),
            destination_ipv6_cidr_block: some("::/0"),
            ..Default::default()
        };
        assert_eq!(
            route_destination(&route, "rtb-1").unwrap(),
            (AddressType::Ipv4, "10.0.0.0/16".to_string())
        );
    }

    #[test]
    fn test_destination_prefix_list() {
        let route = Route {
            destination_prefix_list_id: some("pl-1"),
            ..Default::default()
        };
        assert_eq!(route_destination(&route, "rtb-1").unwrap().0, AddressType::PrefixList);
    }

    #[test]
    fn test_missing_destination_is_classification_error() {
        let err = route_destination(&Route::default(), "rtb-9").unwrap_err();
        assert!(matches!(err, DescribeError::Classification { subject: "destination", ref route_table, .. } if route_table == "rtb-9"));
    }

    #[test]
    fn test_gateway_prefixes() {
        for (gateway, expected) in [
            ("local", TargetType::Local),
            ("igw-1", TargetType::InternetGateway),
            ("vgw-1", TargetType::VpnGateway),
            ("vpce-1", TargetType::VpcEndpoint),
            ("lgw-1", TargetType::Other),
        ] {
            let route = Route {
                gateway_id: some(gateway),
                ..Default::default()
            };
            assert_eq!(route_target(&route, "rtb-1").unwrap(), (expected, gateway.to_string()));
        }
    }

    #[test]
    fn test_earliest_target_wins() {
        let route = Route {
            nat_gateway_id: some("nat-1"),
            transit_gateway_id: some("tgw-1"),
            ..Default::default()
        };
        assert_eq!(
            route_target(&route, "rtb-1").unwrap(),
            (TargetType::NatGateway, "nat-1".to_string())
        );

        let route = Route {
            gateway_id: some("igw-1"),
            nat_gateway_id: some("nat-1"),
            ..Default::default()
        };
        assert_eq!(route_target(&route, "rtb-1").unwrap().0, TargetType::InternetGateway);
    }

    #[test]
    fn test_empty_fields_still_claim_their_bucket() {
        let route = Route {
            destination_cidr_block: some(""),
            destination_ipv6_cidr_block: some("::/0"),
            gateway_id: some(""),
            nat_gateway_id: some("nat-1"),
            ..Default::default()
        };
        assert_eq!(
            route_destination(&route, "rtb-1").unwrap(),
            (AddressType::Ipv4, String::new())
        );
        assert_eq!(
            route_target(&route, "rtb-1").unwrap(),
            (TargetType::Other, String::new())
        );
    }

    #[test]
    fn test_instance_target_carries_owner() {
        let route = Route {
            instance_id: some("i-1"),
            instance_owner_id: some("123456789012"),
            network_interface_id: some("eni-1"),
            ..Default::default()
        };
        assert_eq!(
            route_target(&route, "rtb-1").unwrap(),
            (TargetType::Instance, "i-1/123456789012".to_string())
        );
    }

    #[test]
    fn test_core_network_is_last_known_bucket() {
        let route = Route {
            core_network_arn: some("arn:aws:networkmanager::1:core-network/x"),
            ..Default::default()
        };
        assert_eq!(route_target(&route, "rtb-1").unwrap().0, TargetType::CoreNetwork);
        assert!(route_target(&Route::default(), "rtb-1").is_err());
    }
}
