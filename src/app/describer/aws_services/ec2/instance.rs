//! Instance reports and their joins: security group permissions, routes,
//! storage, backups and load balancer attachments.

use super::super::elb::{self, LoadBalancerAttachments};
use super::indexes::{self, require, PrefixLists, RouteTableLookup};
use super::model::{name_tag, Image, Instance, RouteTable, SecurityGroup, Snapshot, Subnet, Volume, Vpc};
use super::requests::{self, Ec2Query};
use super::route_table::classified_routes;
use super::security_group::permission_leaves;
use super::Ec2Describer;
use crate::app::describer::error::Result;
use crate::app::describer::fetcher::EntityIndex;
use std::sync::Arc;

crate::report_row! {
    pub struct InstanceRow {
        instance_id: String => "InstanceId",
        instance_name: String => "InstanceName",
        instance_type: String => "InstanceType",
        private_ip_address: String => "PrivateIpAddress",
        public_ip_address: String => "PublicIpAddress",
        platform: String => "Platform",
        state: String => "State",
        availability_zone: String => "AvailabilityZone",
        region: String => "Region",
    }
    order_by [availability_zone, instance_name, instance_type, private_ip_address, instance_id]
}

crate::report_row! {
    pub struct InstanceSecurityGroupRow {
        instance_id: String => "InstanceId",
        instance_name: String => "InstanceName",
        vpc_id: String => "VpcId",
        vpc_name: String => "VpcName",
        security_group_id: String => "SecurityGroupId",
        security_group_name: String => "SecurityGroupName",
        flow_direction: String => "FlowDirection",
        ip_protocol: String => "IpProtocol",
        from_port: i32 => "FromPort",
        to_port: i32 => "ToPort",
        address_type: String => "AddressType",
        cidr_block: String => "CidrBlock",
        availability_zone: String => "AvailabilityZone",
        region: String => "Region",
    }
    order_by [
        availability_zone,
        instance_name,
        instance_id,
        security_group_name,
        flow_direction desc,
        ip_protocol,
        from_port,
        to_port,
        address_type,
    ]
}

crate::report_row! {
    pub struct InstanceRouteRow {
        instance_id: String => "InstanceId",
        instance_name: String => "InstanceName",
        vpc_id: String => "VpcId",
        vpc_name: String => "VpcName",
        subnet_id: String => "SubnetId",
        subnet_name: String => "SubnetName",
        availability_zone: String => "AvailabilityZone",
        route_table_id: String => "RouteTableId",
        route_table_name: String => "RouteTableName",
        destination_type: String => "DestinationType",
        destination: String => "Destination",
        target_type: String => "TargetType",
        target: String => "Target",
        region: String => "Region",
    }
    order_by [availability_zone, instance_name, instance_id, destination_type, destination]
}

crate::report_row! {
    pub struct InstanceStorageRow {
        instance_id: String => "InstanceId",
        instance_name: String => "InstanceName",
        device_name: String => "DeviceName",
        delete_on_termination: bool => "DeleteOnTermination",
        volume_id: String => "VolumeId",
        volume_name: String => "VolumeName",
        volume_type: String => "VolumeType",
        volume_size: i32 => "VolumeSize",
        iops: i32 => "IOPS",
        encrypted: bool => "Encrypted",
        availability_zone: String => "AvailabilityZone",
        region: String => "Region",
    }
    order_by [availability_zone, instance_name, instance_id, device_name]
}

crate::report_row! {
    pub struct InstanceBackupRow {
        instance_id: String => "InstanceId",
        instance_name: String => "InstanceName",
        image_id: String => "ImageId",
        image_name: String => "ImageName",
        image_owner: String => "ImageOwner",
        delete_on_termination: bool => "DeleteOnTermination",
        volume_id: String => "VolumeId",
        volume_name: String => "VolumeName",
        snapshot_id: String => "SnapshotId",
        snapshot_name: String => "SnapshotName",
        availability_zone: String => "AvailabilityZone",
        region: String => "Region",
    }
    order_by [availability_zone, instance_name, image_owner, image_name, snapshot_name, volume_name]
}

crate::report_row! {
    pub struct InstanceLoadBalancerRow {
        instance_id: String => "InstanceId",
        instance_name: String => "InstanceName",
        load_balancer_type: String => "LoadBalancerType",
        load_balancer_name: String => "LoadBalancerName",
        availability_zone: String => "AvailabilityZone",
        region: String => "Region",
    }
    order_by [availability_zone, instance_name, instance_id, load_balancer_type, load_balancer_name]
}

pub fn instance_rows(region: &str, instances: &EntityIndex<Instance>) -> Vec<InstanceRow> {
    instances
        .values()
        .map(|instance| InstanceRow {
            instance_id: instance.instance_id.clone(),
            instance_name: name_tag(&instance.tags),
            instance_type: instance.instance_type.clone(),
            private_ip_address: instance.private_ip_address.clone(),
            public_ip_address: instance.public_ip_address.clone(),
            platform: instance.platform_details.clone(),
            state: instance.state.clone(),
            availability_zone: instance.availability_zone.clone(),
            region: region.to_string(),
        })
        .collect()
}

pub fn instance_security_group_rows(
    region: &str,
    instances: &EntityIndex<Instance>,
    groups: &EntityIndex<SecurityGroup>,
    vpcs: &EntityIndex<Vpc>,
    prefix_lists: &PrefixLists,
) -> Result<Vec<InstanceSecurityGroupRow>> {
    let mut rows = Vec::new();
    for instance in instances.values() {
        let instance_name = name_tag(&instance.tags);
        let vpc = require(vpcs, "vpc", &instance.vpc_id)?;
        let vpc_name = name_tag(&vpc.tags);
        for attached in &instance.security_groups {
            let group = require(groups, "security group", &attached.group_id)?;
            for leaf in permission_leaves(group, prefix_lists)? {
                rows.push(InstanceSecurityGroupRow {
                    instance_id: instance.instance_id.clone(),
                    instance_name: instance_name.clone(),
                    vpc_id: instance.vpc_id.clone(),
                    vpc_name: vpc_name.clone(),
                    security_group_id: attached.group_id.clone(),
                    security_group_name: attached.group_name.clone(),
                    flow_direction: leaf.direction.as_str().to_string(),
                    ip_protocol: leaf.ip_protocol,
                    from_port: leaf.from_port,
                    to_port: leaf.to_port,
                    address_type: leaf.address_type.as_str().to_string(),
                    cidr_block: leaf.address,
                    availability_zone: instance.availability_zone.clone(),
                    region: region.to_string(),
                });
            }
        }
    }
    Ok(rows)
}

pub fn instance_route_rows(
    region: &str,
    instances: &EntityIndex<Instance>,
    vpcs: &EntityIndex<Vpc>,
    subnets: &EntityIndex<Subnet>,
    tables: &EntityIndex<RouteTable>,
) -> Result<Vec<InstanceRouteRow>> {
    let lookup = RouteTableLookup::new(tables);
    let mut rows = Vec::new();
    for instance in instances.values() {
        let vpc = require(vpcs, "vpc", &instance.vpc_id)?;
        let subnet = require(subnets, "subnet", &instance.subnet_id)?;
        let table = lookup.for_subnet(&subnet.subnet_id, &subnet.vpc_id)?;
        let (instance_name, vpc_name, subnet_name, table_name) = (
            name_tag(&instance.tags),
            name_tag(&vpc.tags),
            name_tag(&subnet.tags),
            name_tag(&table.tags),
        );
        for route in classified_routes(table)? {
            rows.push(InstanceRouteRow {
                instance_id: instance.instance_id.clone(),
                instance_name: instance_name.clone(),
                vpc_id: instance.vpc_id.clone(),
                vpc_name: vpc_name.clone(),
                subnet_id: instance.subnet_id.clone(),
                subnet_name: subnet_name.clone(),
                availability_zone: instance.availability_zone.clone(),
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

/// One row per EBS mapping whose volume is known; unknown volumes are skipped.
pub fn instance_storage_rows(
    region: &str,
    instances: &EntityIndex<Instance>,
    volumes: &EntityIndex<Volume>,
) -> Vec<InstanceStorageRow> {
    let mut rows = Vec::new();
    for instance in instances.values() {
        let instance_name = name_tag(&instance.tags);
        for device in &instance.block_devices {
            let Some(volume) = device.volume_id.as_deref().and_then(|id| volumes.get(id)) else {
                continue;
            };
            rows.push(InstanceStorageRow {
                instance_id: instance.instance_id.clone(),
                instance_name: instance_name.clone(),
                device_name: device.device_name.clone(),
                delete_on_termination: device.delete_on_termination,
                volume_id: volume.volume_id.clone(),
                volume_name: name_tag(&volume.tags),
                volume_type: volume.volume_type.clone(),
                volume_size: volume.size,
                iops: volume.iops,
                encrypted: volume.encrypted,
                availability_zone: instance.availability_zone.clone(),
                region: region.to_string(),
            });
        }
    }
    rows
}

/// Instance to image, and each EBS volume to the snapshot it was created
/// from. Every join is soft: a miss leaves the joined fields empty.
pub fn instance_backup_rows(
    region: &str,
    instances: &EntityIndex<Instance>,
    images: &EntityIndex<Image>,
    snapshots: &EntityIndex<Snapshot>,
    volumes: &EntityIndex<Volume>,
) -> Vec<InstanceBackupRow> {
    let mut rows = Vec::new();
    for instance in instances.values() {
        let instance_name = name_tag(&instance.tags);
        let (image_id, image_name, image_owner) = match images.get(&instance.image_id) {
            Some(image) => (image.image_id.clone(), image.name.clone(), image.owner_id.clone()),
            None => Default::default(),
        };
        for device in &instance.block_devices {
            let Some(volume_id) = device.volume_id.as_deref() else {
                continue;
            };
            let mut row = InstanceBackupRow {
                instance_id: instance.instance_id.clone(),
                instance_name: instance_name.clone(),
                image_id: image_id.clone(),
                image_name: image_name.clone(),
                image_owner: image_owner.clone(),
                delete_on_termination: device.delete_on_termination,
                availability_zone: instance.availability_zone.clone(),
                region: region.to_string(),
                ..Default::default()
            };
            if let Some(volume) = volumes.get(volume_id) {
                row.volume_id = volume.volume_id.clone();
                row.volume_name = name_tag(&volume.tags);
                if let Some(snapshot) = volume.snapshot_id.as_deref().and_then(|id| snapshots.get(id)) {
                    row.snapshot_id = snapshot.snapshot_id.clone();
                    row.snapshot_name = name_tag(&snapshot.tags);
                }
            }
            rows.push(row);
        }
    }
    rows
}

/// One row per attachment; instances without attachments yield nothing.
pub fn instance_load_balancer_rows(
    region: &str,
    instances: &EntityIndex<Instance>,
    attachments: &LoadBalancerAttachments,
) -> Vec<InstanceLoadBalancerRow> {
    let mut rows = Vec::new();
    for instance in instances.values() {
        let instance_name = name_tag(&instance.tags);
        for (kind, name) in attachments.for_instance(&instance.instance_id) {
            rows.push(InstanceLoadBalancerRow {
                instance_id: instance.instance_id.clone(),
                instance_name: instance_name.clone(),
                load_balancer_type: kind.as_str().to_string(),
                load_balancer_name: name.clone(),
                availability_zone: instance.availability_zone.clone(),
                region: region.to_string(),
            });
        }
    }
    rows
}

impl Ec2Describer {
    pub async fn instances(&self, query: &Ec2Query) -> Result<Vec<InstanceRow>> {
        let request = Arc::new(requests::instances(query));
        self.per_region(move |clients, scope, sink| {
            let request = Arc::clone(&request);
            async move {
                let instances = indexes::instances(clients.ec2.as_ref(), &scope, &request).await?;
                sink.emit_all(instance_rows(scope.region(), &instances)).await
            }
        })
        .await
    }

    pub async fn instance_security_groups(&self, query: &Ec2Query) -> Result<Vec<InstanceSecurityGroupRow>> {
        let request = Arc::new(requests::instances(query));
        self.per_region(move |clients, scope, sink| {
            let request = Arc::clone(&request);
            async move {
                let api = clients.ec2.as_ref();
                let (instances, groups, vpcs, prefix_lists) = tokio::try_join!(
                    indexes::instances(api, &scope, &request),
                    indexes::all_security_groups(api, &scope),
                    indexes::all_vpcs(api, &scope),
                    indexes::prefix_lists(api, &scope),
                )?;
                let rows = instance_security_group_rows(scope.region(), &instances, &groups, &vpcs, &prefix_lists)?;
                sink.emit_all(rows).await
            }
        })
        .await
    }

    pub async fn instance_routes(&self, query: &Ec2Query) -> Result<Vec<InstanceRouteRow>> {
        let request = Arc::new(requests::instances(query));
        self.per_region(move |clients, scope, sink| {
            let request = Arc::clone(&request);
            async move {
                let api = clients.ec2.as_ref();
                let (instances, vpcs, subnets, tables) = tokio::try_join!(
                    indexes::instances(api, &scope, &request),
                    indexes::all_vpcs(api, &scope),
                    indexes::all_subnets(api, &scope),
                    indexes::all_route_tables(api, &scope),
                )?;
                let rows = instance_route_rows(scope.region(), &instances, &vpcs, &subnets, &tables)?;
                sink.emit_all(rows).await
            }
        })
        .await
    }

    pub async fn instance_storage(&self, query: &Ec2Query) -> Result<Vec<InstanceStorageRow>> {
        let request = Arc::new(requests::instances(query));
        self.per_region(move |clients, scope, sink| {
            let request = Arc::clone(&request);
            async move {
                let api = clients.ec2.as_ref();
                let (instances, volumes) = tokio::try_join!(
                    indexes::instances(api, &scope, &request),
                    indexes::volumes(api, &scope),
                )?;
                sink.emit_all(instance_storage_rows(scope.region(), &instances, &volumes))
                    .await
            }
        })
        .await
    }

    pub async fn instance_backups(&self, query: &Ec2Query) -> Result<Vec<InstanceBackupRow>> {
        let request = Arc::new(requests::instances(query));
        self.per_region(move |clients, scope, sink| {
            let request = Arc::clone(&request);
            async move {
                let api = clients.ec2.as_ref();
                let (instances, snapshots, volumes) = tokio::try_join!(
                    indexes::instances(api, &scope, &request),
                    indexes::own_snapshots(api, &scope),
                    indexes::volumes(api, &scope),
                )?;
                let images = indexes::images_of(api, &scope, &instances).await?;
                let rows = instance_backup_rows(scope.region(), &instances, &images, &snapshots, &volumes);
                sink.emit_all(rows).await
            }
        })
        .await
    }

    /// Without explicit IDs or names, the instance selection narrows to the
    /// instances attached to any load balancer of the region.
    pub async fn instance_load_balancers(&self, query: &Ec2Query) -> Result<Vec<InstanceLoadBalancerRow>> {
        let query = Arc::new(query.clone());
        self.per_region(move |clients, scope, sink| {
            let query = Arc::clone(&query);
            async move {
                let attachments = elb::attachments(clients.elb.as_ref(), &scope).await?;
                let attached = attachments.instance_ids();
                let request = if !query.has_selection() && !attached.is_empty() {
                    requests::instances(&Ec2Query {
                        ids: attached,
                        ..(*query).clone()
                    })
                } else {
                    requests::instances(&query)
                };
                let instances = indexes::instances(clients.ec2.as_ref(), &scope, &request).await?;
                sink.emit_all(instance_load_balancer_rows(scope.region(), &instances, &attachments))
                    .await
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::describer::aws_services::ec2::model::{GroupIdentifier, InstanceBlockDevice, Tag};
    use crate::app::describer::aws_services::elb::LoadBalancerKind;
    use pretty_assertions::assert_eq;

    fn instance() -> Instance {
        Instance {
            instance_id: "i-1".to_string(),
            instance_type: "t3.micro".to_string(),
            availability_zone: "eu-west-1a".to_string(),
            vpc_id: "vpc-1".to_string(),
            subnet_id: "subnet-1".to_string(),
            image_id: "ami-1".to_string(),
            security_groups: vec![GroupIdentifier {
                group_id: "sg-1".to_string(),
                group_name: "web".to_string(),
            }],
            block_devices: vec![
                InstanceBlockDevice {
                    device_name: "/dev/xvda".to_string(),
                    volume_id: Some("vol-1".to_string()),
                    delete_on_termination: true,
                },
                InstanceBlockDevice {
                    device_name: "/dev/xvdb".to_string(),
                    volume_id: Some("vol-missing".to_string()),
                    delete_on_termination: false,
                },
                InstanceBlockDevice {
                    device_name: "ephemeral0".to_string(),
                    volume_id: None,
                    delete_on_termination: false,
                },
            ],
            tags: Tag::name("web-1"),
            ..Default::default()
        }
    }

    fn index<T: Clone>(items: &[(&str, T)]) -> EntityIndex<T> {
        items.iter().map(|(id, item)| (id.to_string(), item.clone())).collect()
    }

    fn volumes() -> EntityIndex<Volume> {
        index(&[(
            "vol-1",
            Volume {
                volume_id: "vol-1".to_string(),
                volume_type: "gp3".to_string(),
                size: 8,
                iops: 3000,
                snapshot_id: Some("snap-1".to_string()),
                tags: Tag::name("root"),
                ..Default::default()
            },
        )])
    }

    #[test]
    fn test_instance_row_takes_name_tag() {
        let rows = instance_rows("eu-west-1", &index(&[("i-1", instance())]));
        assert_eq!(rows[0].instance_name, "web-1");
        assert_eq!(rows[0].region, "eu-west-1");
    }

    #[test]
    fn test_storage_skips_unknown_and_non_ebs_volumes() {
        let rows = instance_storage_rows("eu-west-1", &index(&[("i-1", instance())]), &volumes());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].volume_name, "root");
        assert_eq!(rows[0].iops, 3000);
        assert!(rows[0].delete_on_termination);
    }

    #[test]
    fn test_backup_joins_are_soft() {
        let snapshots = index(&[(
            "snap-1",
            Snapshot {
                snapshot_id: "snap-1".to_string(),
                tags: Tag::name("nightly"),
                ..Default::default()
            },
        )]);
        let rows = instance_backup_rows(
            "eu-west-1",
            &index(&[("i-1", instance())]),
            &EntityIndex::new(),
            &snapshots,
            &volumes(),
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].image_id, "");
        assert_eq!(rows[0].snapshot_name, "nightly");
        assert_eq!(rows[1].volume_id, "");
        assert_eq!(rows[1].snapshot_id, "");
    }

    #[test]
    fn test_load_balancer_rows_skip_unattached_instances() {
        let mut other = instance();
        other.instance_id = "i-0".to_string();
        let instances = index(&[("i-0", other), ("i-1", instance())]);
        let mut attachments = LoadBalancerAttachments::default();
        attachments.attach("i-1", LoadBalancerKind::Classic, "legacy");
        attachments.attach("i-1", LoadBalancerKind::TargetGroup, "web-tg");

        let rows = instance_load_balancer_rows("eu-west-1", &instances, &attachments);
        let kinds: Vec<_> = rows
            .iter()
            .map(|row| (row.instance_id.as_str(), row.load_balancer_type.as_str()))
            .collect();
        assert_eq!(kinds, vec![("i-1", "Classic"), ("i-1", "TargetGroup")]);
    }

    #[test]
    fn test_security_group_join_requires_group() {
        let vpcs = index(&[(
            "vpc-1",
            Vpc {
                vpc_id: "vpc-1".to_string(),
                ..Default::default()
            },
        )]);
        let err = instance_security_group_rows(
            "eu-west-1",
            &index(&[("i-1", instance())]),
            &EntityIndex::new(),
            &vpcs,
            &PrefixLists::default(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "no security group found: sg-1");
    }
}
