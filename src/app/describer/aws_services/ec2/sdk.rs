//! [`Ec2Api`] over `aws-sdk-ec2`.

use super::api::{DescribeRequest, Ec2Api};
use super::model::{
    DhcpOptions, EbsSnapshotMapping, GroupIdentifier, Image, ImageBlockDevice, Instance, InstanceBlockDevice,
    IpPermission, PrefixList, Route, RouteTable, RouteTableAssociation, SecurityGroup, Snapshot, Subnet, Tag,
    UserIdGroupPair, Volume, Vpc, VpcAttribute, VpcIpv6Association,
};
use crate::app::describer::error::Result;
use crate::app::describer::fetcher::Page;
use crate::app::describer::filter::Criterion;
use crate::app::describer::sdk_errors::from_sdk_error;
use async_trait::async_trait;
use aws_sdk_ec2 as ec2;
use aws_types::region::Region;
use aws_types::SdkConfig;

/// Builds a regional client per call from one shared SDK configuration.
#[derive(Debug, Clone)]
pub struct Ec2SdkClient {
    sdk_config: SdkConfig,
}

impl Ec2SdkClient {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            sdk_config: sdk_config.clone(),
        }
    }

    fn client(&self, region: &str) -> ec2::Client {
        let config = ec2::config::Builder::from(&self.sdk_config)
            .region(Region::new(region.to_string()))
            .build();
        ec2::Client::from_conf(config)
    }
}

fn filters(criteria: &[Criterion]) -> Option<Vec<ec2::types::Filter>> {
    if criteria.is_empty() {
        return None;
    }
    Some(
        criteria
            .iter()
            .map(|criterion| {
                ec2::types::Filter::builder()
                    .name(&criterion.name)
                    .set_values(Some(criterion.values.clone()))
                    .build()
            })
            .collect(),
    )
}

fn non_empty(values: &[String]) -> Option<Vec<String>> {
    (!values.is_empty()).then(|| values.to_vec())
}

fn tags(tags: Option<Vec<ec2::types::Tag>>) -> Vec<Tag> {
    tags.unwrap_or_default()
        .into_iter()
        .map(|tag| Tag::new(tag.key.unwrap_or_default(), tag.value.unwrap_or_default()))
        .collect()
}

fn instance(instance: ec2::types::Instance) -> Instance {
    Instance {
        instance_id: instance.instance_id.unwrap_or_default(),
        instance_type: instance
            .instance_type
            .map(|t| t.as_str().to_string())
            .unwrap_or_default(),
        private_ip_address: instance.private_ip_address.unwrap_or_default(),
        public_ip_address: instance.public_ip_address.unwrap_or_default(),
        platform_details: instance.platform_details.unwrap_or_default(),
        state: instance
            .state
            .and_then(|s| s.name)
            .map(|n| n.as_str().to_string())
            .unwrap_or_default(),
        availability_zone: instance
            .placement
            .and_then(|p| p.availability_zone)
            .unwrap_or_default(),
        vpc_id: instance.vpc_id.unwrap_or_default(),
        subnet_id: instance.subnet_id.unwrap_or_default(),
        image_id: instance.image_id.unwrap_or_default(),
        security_groups: instance
            .security_groups
            .unwrap_or_default()
            .into_iter()
            .map(|group| GroupIdentifier {
                group_id: group.group_id.unwrap_or_default(),
                group_name: group.group_name.unwrap_or_default(),
            })
            .collect(),
        block_devices: instance
            .block_device_mappings
            .unwrap_or_default()
            .into_iter()
            .map(|mapping| {
                let ebs = mapping.ebs;
                InstanceBlockDevice {
                    device_name: mapping.device_name.unwrap_or_default(),
                    volume_id: ebs.as_ref().and_then(|e| e.volume_id.clone()),
                    delete_on_termination: ebs.and_then(|e| e.delete_on_termination).unwrap_or_default(),
                }
            })
            .collect(),
        tags: tags(instance.tags),
    }
}

fn image(image: ec2::types::Image) -> Image {
    Image {
        image_id: image.image_id.unwrap_or_default(),
        name: image.name.unwrap_or_default(),
        owner_id: image.owner_id.unwrap_or_default(),
        creation_date: image.creation_date.unwrap_or_default(),
        architecture: image
            .architecture
            .map(|a| a.as_str().to_string())
            .unwrap_or_default(),
        platform_details: image.platform_details.unwrap_or_default(),
        ena_support: image.ena_support.unwrap_or_default(),
        public: image.public.unwrap_or_default(),
        state: image.state.map(|s| s.as_str().to_string()).unwrap_or_default(),
        block_devices: image
            .block_device_mappings
            .unwrap_or_default()
            .into_iter()
            .map(|mapping| ImageBlockDevice {
                device_name: mapping.device_name.unwrap_or_default(),
                ebs: mapping.ebs.map(|ebs| EbsSnapshotMapping {
                    snapshot_id: ebs.snapshot_id,
                    delete_on_termination: ebs.delete_on_termination.unwrap_or_default(),
                }),
            })
            .collect(),
        tags: tags(image.tags),
    }
}

fn permissions(permissions: Option<Vec<ec2::types::IpPermission>>) -> Vec<IpPermission> {
    permissions
        .unwrap_or_default()
        .into_iter()
        .map(|permission| IpPermission {
            ip_protocol: permission.ip_protocol.unwrap_or_default(),
            from_port: permission.from_port.unwrap_or_default(),
            to_port: permission.to_port.unwrap_or_default(),
            ipv4_ranges: permission
                .ip_ranges
                .unwrap_or_default()
                .into_iter()
                .filter_map(|range| range.cidr_ip)
                .collect(),
            ipv6_ranges: permission
                .ipv6_ranges
                .unwrap_or_default()
                .into_iter()
                .filter_map(|range| range.cidr_ipv6)
                .collect(),
            user_id_group_pairs: permission
                .user_id_group_pairs
                .unwrap_or_default()
                .into_iter()
                .map(|pair| UserIdGroupPair {
                    group_id: pair.group_id.unwrap_or_default(),
                    user_id: pair.user_id.unwrap_or_default(),
                })
                .collect(),
            prefix_list_ids: permission
                .prefix_list_ids
                .unwrap_or_default()
                .into_iter()
                .filter_map(|id| id.prefix_list_id)
                .collect(),
        })
        .collect()
}

fn route(route: ec2::types::Route) -> Route {
    Route {
        destination_cidr_block: route.destination_cidr_block,
        destination_ipv6_cidr_block: route.destination_ipv6_cidr_block,
        destination_prefix_list_id: route.destination_prefix_list_id,
        gateway_id: route.gateway_id,
        nat_gateway_id: route.nat_gateway_id,
        vpc_peering_connection_id: route.vpc_peering_connection_id,
        transit_gateway_id: route.transit_gateway_id,
        egress_only_internet_gateway_id: route.egress_only_internet_gateway_id,
        carrier_gateway_id: route.carrier_gateway_id,
        instance_id: route.instance_id,
        instance_owner_id: route.instance_owner_id,
        network_interface_id: route.network_interface_id,
        local_gateway_id: route.local_gateway_id,
        core_network_arn: route.core_network_arn,
        state: route.state.map(|s| s.as_str().to_string()).unwrap_or_default(),
    }
}

fn route_table(table: ec2::types::RouteTable) -> RouteTable {
    RouteTable {
        route_table_id: table.route_table_id.unwrap_or_default(),
        vpc_id: table.vpc_id.unwrap_or_default(),
        routes: table.routes.unwrap_or_default().into_iter().map(route).collect(),
        associations: table
            .associations
            .unwrap_or_default()
            .into_iter()
            .map(|assoc| RouteTableAssociation {
                main: assoc.main.unwrap_or_default(),
                subnet_id: assoc.subnet_id,
                state: assoc
                    .association_state
                    .and_then(|s| s.state)
                    .map(|s| s.as_str().to_string())
                    .unwrap_or_default(),
            })
            .collect(),
        tags: tags(table.tags),
    }
}

#[async_trait]
impl Ec2Api for Ec2SdkClient {
    async fn describe_instances(&self, region: &str, request: &DescribeRequest, next_token: Option<String>) -> Result<Page<Instance>> {
        let output = self
            .client(region)
            .describe_instances()
            .set_instance_ids(non_empty(&request.ids))
            .set_filters(filters(&request.filters))
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|err| from_sdk_error("ec2", "DescribeInstances", err))?;
        let items = output
            .reservations
            .unwrap_or_default()
            .into_iter()
            .flat_map(|reservation| reservation.instances.unwrap_or_default())
            .map(instance)
            .collect();
        Ok(Page::new(items, output.next_token))
    }

    async fn describe_images(&self, region: &str, request: &DescribeRequest, next_token: Option<String>) -> Result<Page<Image>> {
        let output = self
            .client(region)
            .describe_images()
            .set_image_ids(non_empty(&request.ids))
            .set_owners(non_empty(&request.owners))
            .set_filters(filters(&request.filters))
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|err| from_sdk_error("ec2", "DescribeImages", err))?;
        let items = output.images.unwrap_or_default().into_iter().map(image).collect();
        Ok(Page::new(items, output.next_token))
    }

    async fn describe_snapshots(&self, region: &str, request: &DescribeRequest, next_token: Option<String>) -> Result<Page<Snapshot>> {
        let output = self
            .client(region)
            .describe_snapshots()
            .set_owner_ids(non_empty(&request.owners))
            .set_filters(filters(&request.filters))
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|err| from_sdk_error("ec2", "DescribeSnapshots", err))?;
        let items = output
            .snapshots
            .unwrap_or_default()
            .into_iter()
            .map(|snapshot| Snapshot {
                snapshot_id: snapshot.snapshot_id.unwrap_or_default(),
                volume_id: snapshot.volume_id,
                tags: tags(snapshot.tags),
            })
            .collect();
        Ok(Page::new(items, output.next_token))
    }

    async fn describe_volumes(&self, region: &str, request: &DescribeRequest, next_token: Option<String>) -> Result<Page<Volume>> {
        let output = self
            .client(region)
            .describe_volumes()
            .set_volume_ids(non_empty(&request.ids))
            .set_filters(filters(&request.filters))
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|err| from_sdk_error("ec2", "DescribeVolumes", err))?;
        let items = output
            .volumes
            .unwrap_or_default()
            .into_iter()
            .map(|volume| Volume {
                volume_id: volume.volume_id.unwrap_or_default(),
                volume_type: volume
                    .volume_type
                    .map(|t| t.as_str().to_string())
                    .unwrap_or_default(),
                size: volume.size.unwrap_or_default(),
                iops: volume.iops.unwrap_or_default(),
                encrypted: volume.encrypted.unwrap_or_default(),
                snapshot_id: volume.snapshot_id,
                tags: tags(volume.tags),
            })
            .collect();
        Ok(Page::new(items, output.next_token))
    }

    async fn describe_security_groups(
        &self,
        region: &str,
        request: &DescribeRequest,
        next_token: Option<String>,
    ) -> Result<Page<SecurityGroup>> {
        let output = self
            .client(region)
            .describe_security_groups()
            .set_group_ids(non_empty(&request.ids))
            .set_filters(filters(&request.filters))
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|err| from_sdk_error("ec2", "DescribeSecurityGroups", err))?;
        let items = output
            .security_groups
            .unwrap_or_default()
            .into_iter()
            .map(|group| SecurityGroup {
                group_id: group.group_id.unwrap_or_default(),
                group_name: group.group_name.unwrap_or_default(),
                vpc_id: group.vpc_id.unwrap_or_default(),
                ingress: permissions(group.ip_permissions),
                egress: permissions(group.ip_permissions_egress),
                tags: tags(group.tags),
            })
            .collect();
        Ok(Page::new(items, output.next_token))
    }

    async fn describe_vpcs(&self, region: &str, request: &DescribeRequest, next_token: Option<String>) -> Result<Page<Vpc>> {
        let output = self
            .client(region)
            .describe_vpcs()
            .set_vpc_ids(non_empty(&request.ids))
            .set_filters(filters(&request.filters))
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|err| from_sdk_error("ec2", "DescribeVpcs", err))?;
        let items = output
            .vpcs
            .unwrap_or_default()
            .into_iter()
            .map(|vpc| Vpc {
                vpc_id: vpc.vpc_id.unwrap_or_default(),
                dhcp_options_id: vpc.dhcp_options_id.unwrap_or_default(),
                is_default: vpc.is_default.unwrap_or_default(),
                instance_tenancy: vpc
                    .instance_tenancy
                    .map(|t| t.as_str().to_string())
                    .unwrap_or_default(),
                owner_id: vpc.owner_id.unwrap_or_default(),
                state: vpc.state.map(|s| s.as_str().to_string()).unwrap_or_default(),
                ipv4_cidr_blocks: vpc
                    .cidr_block_association_set
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|assoc| assoc.cidr_block)
                    .collect(),
                ipv6_associations: vpc
                    .ipv6_cidr_block_association_set
                    .unwrap_or_default()
                    .into_iter()
                    .map(|assoc| VpcIpv6Association {
                        ipv6_cidr_block: assoc.ipv6_cidr_block.unwrap_or_default(),
                        network_border_group: assoc.network_border_group.unwrap_or_default(),
                        ipv6_pool: assoc.ipv6_pool.unwrap_or_default(),
                    })
                    .collect(),
                tags: tags(vpc.tags),
            })
            .collect();
        Ok(Page::new(items, output.next_token))
    }

    async fn describe_subnets(&self, region: &str, request: &DescribeRequest, next_token: Option<String>) -> Result<Page<Subnet>> {
        let output = self
            .client(region)
            .describe_subnets()
            .set_subnet_ids(non_empty(&request.ids))
            .set_filters(filters(&request.filters))
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|err| from_sdk_error("ec2", "DescribeSubnets", err))?;
        let items = output
            .subnets
            .unwrap_or_default()
            .into_iter()
            .map(|subnet| Subnet {
                subnet_id: subnet.subnet_id.unwrap_or_default(),
                vpc_id: subnet.vpc_id.unwrap_or_default(),
                cidr_block: subnet.cidr_block.unwrap_or_default(),
                availability_zone: subnet.availability_zone.unwrap_or_default(),
                available_ip_address_count: subnet.available_ip_address_count.unwrap_or_default(),
                default_for_az: subnet.default_for_az.unwrap_or_default(),
                state: subnet.state.map(|s| s.as_str().to_string()).unwrap_or_default(),
                ipv6_cidr_blocks: subnet
                    .ipv6_cidr_block_association_set
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|assoc| assoc.ipv6_cidr_block)
                    .collect(),
                tags: tags(subnet.tags),
            })
            .collect();
        Ok(Page::new(items, output.next_token))
    }

    async fn describe_route_tables(
        &self,
        region: &str,
        request: &DescribeRequest,
        next_token: Option<String>,
    ) -> Result<Page<RouteTable>> {
        let output = self
            .client(region)
            .describe_route_tables()
            .set_route_table_ids(non_empty(&request.ids))
            .set_filters(filters(&request.filters))
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|err| from_sdk_error("ec2", "DescribeRouteTables", err))?;
        let items = output
            .route_tables
            .unwrap_or_default()
            .into_iter()
            .map(route_table)
            .collect();
        Ok(Page::new(items, output.next_token))
    }

    async fn describe_prefix_lists(&self, region: &str, next_token: Option<String>) -> Result<Page<PrefixList>> {
        let output = self
            .client(region)
            .describe_prefix_lists()
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|err| from_sdk_error("ec2", "DescribePrefixLists", err))?;
        let items = output
            .prefix_lists
            .unwrap_or_default()
            .into_iter()
            .map(|list| PrefixList {
                prefix_list_id: list.prefix_list_id.unwrap_or_default(),
                prefix_list_name: list.prefix_list_name.unwrap_or_default(),
            })
            .collect();
        Ok(Page::new(items, output.next_token))
    }

    async fn describe_managed_prefix_lists(&self, region: &str, next_token: Option<String>) -> Result<Page<PrefixList>> {
        let output = self
            .client(region)
            .describe_managed_prefix_lists()
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|err| from_sdk_error("ec2", "DescribeManagedPrefixLists", err))?;
        let items = output
            .prefix_lists
            .unwrap_or_default()
            .into_iter()
            .map(|list| PrefixList {
                prefix_list_id: list.prefix_list_id.unwrap_or_default(),
                prefix_list_name: list.prefix_list_name.unwrap_or_default(),
            })
            .collect();
        Ok(Page::new(items, output.next_token))
    }

    async fn describe_dhcp_options(&self, region: &str, next_token: Option<String>) -> Result<Page<DhcpOptions>> {
        let output = self
            .client(region)
            .describe_dhcp_options()
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|err| from_sdk_error("ec2", "DescribeDhcpOptions", err))?;
        let items = output
            .dhcp_options
            .unwrap_or_default()
            .into_iter()
            .map(|options| DhcpOptions {
                dhcp_options_id: options.dhcp_options_id.unwrap_or_default(),
                tags: tags(options.tags),
            })
            .collect();
        Ok(Page::new(items, output.next_token))
    }

    async fn describe_vpc_attribute(&self, region: &str, vpc_id: &str, attribute: VpcAttribute) -> Result<bool> {
        let name = match attribute {
            VpcAttribute::EnableDnsSupport => ec2::types::VpcAttributeName::EnableDnsSupport,
            VpcAttribute::EnableDnsHostnames => ec2::types::VpcAttributeName::EnableDnsHostnames,
        };
        let output = self
            .client(region)
            .describe_vpc_attribute()
            .vpc_id(vpc_id)
            .attribute(name)
            .send()
            .await
            .map_err(|err| from_sdk_error("ec2", "DescribeVpcAttribute", err))?;
        let value = match attribute {
            VpcAttribute::EnableDnsSupport => output.enable_dns_support,
            VpcAttribute::EnableDnsHostnames => output.enable_dns_hostnames,
        };
        Ok(value.and_then(|v| v.value).unwrap_or_default())
    }
}
