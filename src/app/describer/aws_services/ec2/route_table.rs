//! Route table reports and the route flattening shared with the subnet and
//! instance route joins.

use super::classify::{classify_route, ClassifiedRoute};
use super::indexes::{self, require};
use super::model::{name_tag, RouteTable, Subnet, Vpc};
use super::requests::{self, Ec2Query};
use super::Ec2Describer;
use crate::app::describer::error::Result;
use crate::app::describer::fetcher::EntityIndex;
use std::sync::Arc;

crate::report_row! {
    pub struct RouteTableRow {
        route_table_id: String => "RouteTableId",
        route_table_name: String => "RouteTableName",
        vpc_id: String => "VpcId",
        vpc_name: String => "VpcName",
        destination_type: String => "DestinationType",
        destination: String => "Destination",
        target_type: String => "TargetType",
        target: String => "Target",
        state: String => "State",
        region: String => "Region",
    }
    order_by [region, vpc_name, route_table_name, route_table_id, destination_type, destination]
}

crate::report_row! {
    pub struct RouteTableAssociationRow {
        route_table_id: String => "RouteTableId",
        route_table_name: String => "RouteTableName",
        vpc_id: String => "VpcId",
        vpc_name: String => "VpcName",
        main: bool => "Main",
        subnet_id: String => "SubnetId",
        subnet_name: String => "SubnetName",
        state: String => "State",
        region: String => "Region",
    }
    order_by [region, vpc_name, route_table_name, route_table_id, main desc, subnet_name]
}

/// Classify every route of `table`. Any unclassifiable route fails the table.
pub fn classified_routes(table: &RouteTable) -> Result<Vec<ClassifiedRoute>> {
    table
        .routes
        .iter()
        .map(|route| classify_route(route, &table.route_table_id))
        .collect()
}

pub fn route_table_rows(
    region: &str,
    tables: &EntityIndex<RouteTable>,
    vpcs: &EntityIndex<Vpc>,
) -> Result<Vec<RouteTableRow>> {
    let mut rows = Vec::new();
    for table in tables.values() {
        let vpc = require(vpcs, "vpc", &table.vpc_id)?;
        let (table_name, vpc_name) = (name_tag(&table.tags), name_tag(&vpc.tags));
        for route in classified_routes(table)? {
            rows.push(RouteTableRow {
                route_table_id: table.route_table_id.clone(),
                route_table_name: table_name.clone(),
                vpc_id: table.vpc_id.clone(),
                vpc_name: vpc_name.clone(),
                destination_type: route.destination_type.as_str().to_string(),
                destination: route.destination,
                target_type: route.target_type.as_str().to_string(),
                target: route.target,
                state: route.state,
                region: region.to_string(),
            });
        }
    }
    Ok(rows)
}

pub fn route_table_association_rows(
    region: &str,
    tables: &EntityIndex<RouteTable>,
    vpcs: &EntityIndex<Vpc>,
    subnets: &EntityIndex<Subnet>,
) -> Result<Vec<RouteTableAssociationRow>> {
    let mut rows = Vec::new();
    for table in tables.values() {
        let vpc = require(vpcs, "vpc", &table.vpc_id)?;
        let (table_name, vpc_name) = (name_tag(&table.tags), name_tag(&vpc.tags));
        for assoc in &table.associations {
            let subnet_id = assoc.subnet_id.clone().unwrap_or_default();
            let subnet_name = if subnet_id.is_empty() {
                String::new()
            } else {
                name_tag(&require(subnets, "subnet", &subnet_id)?.tags)
            };
            rows.push(RouteTableAssociationRow {
                route_table_id: table.route_table_id.clone(),
                route_table_name: table_name.clone(),
                vpc_id: table.vpc_id.clone(),
                vpc_name: vpc_name.clone(),
                main: assoc.main,
                subnet_id,
                subnet_name,
                state: assoc.state.clone(),
                region: region.to_string(),
            });
        }
    }
    Ok(rows)
}

impl Ec2Describer {
    pub async fn route_tables(&self, query: &Ec2Query) -> Result<Vec<RouteTableRow>> {
        let request = Arc::new(requests::route_tables(query));
        self.per_region(move |clients, scope, sink| {
            let request = Arc::clone(&request);
            async move {
                let api = clients.ec2.as_ref();
                let (tables, vpcs) = tokio::try_join!(
                    indexes::route_tables(api, &scope, &request),
                    indexes::all_vpcs(api, &scope),
                )?;
                sink.emit_all(route_table_rows(scope.region(), &tables, &vpcs)?).await
            }
        })
        .await
    }

    pub async fn route_table_associations(&self, query: &Ec2Query) -> Result<Vec<RouteTableAssociationRow>> {
        let request = Arc::new(requests::route_tables(query));
        self.per_region(move |clients, scope, sink| {
            let request = Arc::clone(&request);
            async move {
                let api = clients.ec2.as_ref();
                let (tables, vpcs, subnets) = tokio::try_join!(
                    indexes::route_tables(api, &scope, &request),
                    indexes::all_vpcs(api, &scope),
                    indexes::all_subnets(api, &scope),
                )?;
                let rows = route_table_association_rows(scope.region(), &tables, &vpcs, &subnets)?;
                sink.emit_all(rows).await
            }
        })
        .await
    }
}
