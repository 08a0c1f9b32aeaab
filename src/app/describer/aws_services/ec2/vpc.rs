//! VPC reports: plain, DNS attributes and CIDR associations.

use super::api::Ec2Api;
use super::classify::AddressType;
use super::indexes::{self, dhcp_options_name};
use super::model::{name_tag, DhcpOptions, Vpc, VpcAttribute};
use super::requests::{self, Ec2Query};
use super::Ec2Describer;
use crate::app::describer::error::Result;
use crate::app::describer::fetcher::EntityIndex;
use crate::app::describer::orchestrator::RowSink;
use crate::app::describer::scope::CallScope;
use std::sync::Arc;

crate::report_row! {
    pub struct VpcRow {
        vpc_id: String => "VpcId",
        vpc_name: String => "VpcName",
        dhcp_options_id: String => "DhcpOptionsId",
        dhcp_options_name: String => "DhcpOptionsName",
        is_default: bool => "IsDefault",
        instance_tenancy: String => "InstanceTenancy",
        owner_id: String => "OwnerId",
        region: String => "Region",
    }
    order_by [region, vpc_name, vpc_id]
}

crate::report_row! {
    pub struct VpcAttributeRow {
        vpc_id: String => "VpcId",
        vpc_name: String => "VpcName",
        enable_dns_support: bool => "EnableDnsSupport",
        enable_dns_hostnames: bool => "EnableDnsHostnames",
        dhcp_options_id: String => "DhcpOptionsId",
        dhcp_options_name: String => "DhcpOptionsName",
        is_default: bool => "IsDefault",
        instance_tenancy: String => "InstanceTenancy",
        owner_id: String => "OwnerId",
        region: String => "Region",
    }
    order_by [region, vpc_name, vpc_id]
}

crate::report_row! {
    pub struct VpcCidrRow {
        vpc_id: String => "VpcId",
        vpc_name: String => "VpcName",
        dhcp_options_id: String => "DhcpOptionsId",
        dhcp_options_name: String => "DhcpOptionsName",
        is_default: bool => "IsDefault",
        instance_tenancy: String => "InstanceTenancy",
        owner_id: String => "OwnerId",
        state: String => "State",
        address_type: String => "AddressType",
        cidr_block: String => "CidrBlock",
        network_border_group: String => "NetworkBorderGroup",
        pool: String => "Pool",
        region: String => "Region",
    }
    order_by [region, vpc_name, vpc_id, address_type, cidr_block]
}

pub fn vpc_rows(region: &str, vpcs: &EntityIndex<Vpc>, dhcp_options: &EntityIndex<DhcpOptions>) -> Result<Vec<VpcRow>> {
    vpcs.values()
        .map(|vpc| {
            Ok(VpcRow {
                vpc_id: vpc.vpc_id.clone(),
                vpc_name: name_tag(&vpc.tags),
                dhcp_options_id: vpc.dhcp_options_id.clone(),
                dhcp_options_name: dhcp_options_name(dhcp_options, &vpc.dhcp_options_id)?,
                is_default: vpc.is_default,
                instance_tenancy: vpc.instance_tenancy.clone(),
                owner_id: vpc.owner_id.clone(),
                region: region.to_string(),
            })
        })
        .collect()
}

/// IPv4 associations first, then IPv6.
pub fn vpc_cidr_rows(
    region: &str,
    vpcs: &EntityIndex<Vpc>,
    dhcp_options: &EntityIndex<DhcpOptions>,
) -> Result<Vec<VpcCidrRow>> {
    let mut rows = Vec::new();
    for vpc in vpcs.values() {
        let base = VpcCidrRow {
            vpc_id: vpc.vpc_id.clone(),
            vpc_name: name_tag(&vpc.tags),
            dhcp_options_id: vpc.dhcp_options_id.clone(),
            dhcp_options_name: dhcp_options_name(dhcp_options, &vpc.dhcp_options_id)?,
            is_default: vpc.is_default,
            instance_tenancy: vpc.instance_tenancy.clone(),
            owner_id: vpc.owner_id.clone(),
            state: vpc.state.clone(),
            region: region.to_string(),
            ..Default::default()
        };
        for cidr in &vpc.ipv4_cidr_blocks {
            rows.push(VpcCidrRow {
                address_type: AddressType::Ipv4.as_str().to_string(),
                cidr_block: cidr.clone(),
                ..base.clone()
            });
        }
        for assoc in &vpc.ipv6_associations {
            rows.push(VpcCidrRow {
                address_type: AddressType::Ipv6.as_str().to_string(),
                cidr_block: assoc.ipv6_cidr_block.clone(),
                network_border_group: assoc.network_border_group.clone(),
                pool: assoc.ipv6_pool.clone(),
                ..base.clone()
            });
        }
    }
    Ok(rows)
}

/// Both DNS attributes of each VPC are queried concurrently; VPCs are
/// processed one at a time and each row is emitted as soon as it resolves.
pub async fn emit_vpc_attribute_rows(
    api: &dyn Ec2Api,
    scope: &CallScope,
    vpcs: &EntityIndex<Vpc>,
    dhcp_options: &EntityIndex<DhcpOptions>,
    sink: &RowSink<VpcAttributeRow>,
) -> Result<()> {
    let region = scope.region();
    for vpc in vpcs.values() {
        let vpc_id = vpc.vpc_id.as_str();
        let (enable_dns_support, enable_dns_hostnames) = tokio::try_join!(
            scope.call(api.describe_vpc_attribute(region, vpc_id, VpcAttribute::EnableDnsSupport)),
            scope.call(api.describe_vpc_attribute(region, vpc_id, VpcAttribute::EnableDnsHostnames)),
        )?;
        sink.emit(VpcAttributeRow {
            vpc_id: vpc.vpc_id.clone(),
            vpc_name: name_tag(&vpc.tags),
            enable_dns_support,
            enable_dns_hostnames,
            dhcp_options_id: vpc.dhcp_options_id.clone(),
            dhcp_options_name: dhcp_options_name(dhcp_options, &vpc.dhcp_options_id)?,
            is_default: vpc.is_default,
            instance_tenancy: vpc.instance_tenancy.clone(),
            owner_id: vpc.owner_id.clone(),
            region: region.to_string(),
        })
        .await?;
    }
    Ok(())
}

impl Ec2Describer {
    pub async fn vpcs(&self, query: &Ec2Query) -> Result<Vec<VpcRow>> {
        let request = Arc::new(requests::vpcs(query));
        self.per_region(move |clients, scope, sink| {
            let request = Arc::clone(&request);
            async move {
                let api = clients.ec2.as_ref();
                let (vpcs, dhcp_options) = tokio::try_join!(
                    indexes::vpcs(api, &scope, &request),
                    indexes::dhcp_options(api, &scope),
                )?;
                sink.emit_all(vpc_rows(scope.region(), &vpcs, &dhcp_options)?).await
            }
        })
        .await
    }

    pub async fn vpc_attributes(&self, query: &Ec2Query) -> Result<Vec<VpcAttributeRow>> {
        let request = Arc::new(requests::vpcs(query));
        self.per_region(move |clients, scope, sink| {
            let request = Arc::clone(&request);
            async move {
                let api = clients.ec2.as_ref();
                let (vpcs, dhcp_options) = tokio::try_join!(
                    indexes::vpcs(api, &scope, &request),
                    indexes::dhcp_options(api, &scope),
                )?;
                emit_vpc_attribute_rows(api, &scope, &vpcs, &dhcp_options, &sink).await
            }
        })
        .await
    }

    pub async fn vpc_cidrs(&self, query: &Ec2Query) -> Result<Vec<VpcCidrRow>> {
        let request = Arc::new(requests::vpcs(query));
        self.per_region(move |clients, scope, sink| {
            let request = Arc::clone(&request);
            async move {
                let api = clients.ec2.as_ref();
                let (vpcs, dhcp_options) = tokio::try_join!(
                    indexes::vpcs(api, &scope, &request),
                    indexes::dhcp_options(api, &scope),
                )?;
                sink.emit_all(vpc_cidr_rows(scope.region(), &vpcs, &dhcp_options)?)
                    .await
            }
        })
        .await
    }
}
