//! Subnet reports: address blocks and effective routes.

use super::classify::AddressType;
use super::indexes::{self, require, RouteTableLookup};
use super::model::{name_tag, RouteTable, Subnet, Vpc};
use super::requests::{self, Ec2Query};
use super::route_table::classified_routes;
use super::Ec2Describer;
use crate::app::describer::error::Result;
use crate::app::describer::fetcher::EntityIndex;
use std::sync::Arc;

crate::report_row! {
    pub struct SubnetRow {
        subnet_id: String => "SubnetId",
        subnet_name: String => "SubnetName",
        availability_zone: String => "AvailabilityZone",
        available_ip_address_count: i32 => "AvailableIpAddressCount",
        default_for_az: bool => "DefaultForAz",
        state: String => "State",
        vpc_id: String => "VpcId",
        vpc_name: String => "VpcName",
        address_type: String => "AddressType",
        cidr_block: String => "CidrBlock",
        region: String => "Region",
    }
    order_by [region, vpc_name, availability_zone, subnet_name, subnet_id, address_type, cidr_block]
}

crate::report_row! {
    pub struct SubnetRouteRow {
        subnet_id: String => "SubnetId",
        subnet_name: String => "SubnetName",
        availability_zone: String => "AvailabilityZone",
        vpc_id: String => "VpcId",
        vpc_name: String => "VpcName",
        route_table_id: String => "RouteTableId",
        route_table_name: String => "RouteTableName",
        destination_type: String => "DestinationType",
        destination: String => "Destination",
        target_type: String => "TargetType",
        target: String => "Target",
        region: String => "Region",
    }
    order_by [region, vpc_name, availability_zone, subnet_name, subnet_id, destination_type, destination]
}

/// One IPv4 row per subnet plus one row per IPv6 association.
pub fn subnet_rows(region: &str, subnets: &EntityIndex<Subnet>, vpcs: &EntityIndex<Vpc>) -> Result<Vec<SubnetRow>> {
    let mut rows = Vec::new();
    for subnet in subnets.values() {
        let vpc = require(vpcs, "vpc", &subnet.vpc_id)?;
        let base = SubnetRow {
            subnet_id: subnet.subnet_id.clone(),
            subnet_name: name_tag(&subnet.tags),
            availability_zone: subnet.availability_zone.clone(),
            available_ip_address_count: subnet.available_ip_address_count,
            default_for_az: subnet.default_for_az,
            state: subnet.state.clone(),
            vpc_id: subnet.vpc_id.clone(),
            vpc_name: name_tag(&vpc.tags),
            region: region.to_string(),
            ..Default::default()
        };
        rows.push(SubnetRow {
            address_type: AddressType::Ipv4.as_str().to_string(),
            cidr_block: subnet.cidr_block.clone(),
            ..base.clone()
        });
        for cidr in &subnet.ipv6_cidr_blocks {
            rows.push(SubnetRow {
                address_type: AddressType::Ipv6.as_str().to_string(),
                cidr_block: cidr.clone(),
                ..base.clone()
            });
        }
    }
    Ok(rows)
}

pub fn subnet_route_rows(
    region: &str,
    subnets: &EntityIndex<Subnet>,
    vpcs: &EntityIndex<Vpc>,
    tables: &EntityIndex<RouteTable>,
) -> Result<Vec<SubnetRouteRow>> {
    let lookup = RouteTableLookup::new(tables);
    let mut rows = Vec::new();
    for subnet in subnets.values() {
        let vpc = require(vpcs, "vpc", &subnet.vpc_id)?;
        let table = lookup.for_subnet(&subnet.subnet_id, &subnet.vpc_id)?;
        let (subnet_name, vpc_name, table_name) = (name_tag(&subnet.tags), name_tag(&vpc.tags), name_tag(&table.tags));
        for route in classified_routes(table)? {
            rows.push(SubnetRouteRow {
                subnet_id: subnet.subnet_id.clone(),
                subnet_name: subnet_name.clone(),
                availability_zone: subnet.availability_zone.clone(),
                vpc_id: subnet.vpc_id.clone(),
                vpc_name: vpc_name.clone(),
                route_table_id: table.route_table_id.clone(),
                route_table_name: table_name.clone(),
                destination_type: route.destination_type.as_str().to_string(),
                destination: route.destination,
                target_type: route.target_type.as_str().to_string(),
                target: route.target,
                region: region.to_string(),
            });
        }
    }
    Ok(rows)
}

impl Ec2Describer {
    pub async fn subnets(&self, query: &Ec2Query) -> Result<Vec<SubnetRow>> {
        let request = Arc::new(requests::subnets(query));
        self.per_region(move |clients, scope, sink| {
            let request = Arc::clone(&request);
            async move {
                let api = clients.ec2.as_ref();
                let (subnets, vpcs) = tokio::try_join!(
                    indexes::subnets(api, &scope, &request),
                    indexes::all_vpcs(api, &scope),
                )?;
                sink.emit_all(subnet_rows(scope.region(), &subnets, &vpcs)?).await
            }
        })
        .await
    }

    pub async fn subnet_routes(&self, query: &Ec2Query) -> Result<Vec<SubnetRouteRow>> {
        let request = Arc::new(requests::subnets(query));
        self.per_region(move |clients, scope, sink| {
            let request = Arc::clone(&request);
            async move {
                let api = clients.ec2.as_ref();
                let (subnets, vpcs, tables) = tokio::try_join!(
                    indexes::subnets(api, &scope, &request),
                    indexes::all_vpcs(api, &scope),
                    indexes::all_route_tables(api, &scope),
                )?;
                sink.emit_all(subnet_route_rows(scope.region(), &subnets, &vpcs, &tables)?)
                    .await
            }
        })
        .await
    }
}
