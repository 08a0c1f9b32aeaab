//! Image reports and the image to snapshot to source volume join.

use super::indexes;
use super::model::{name_tag, Image, Snapshot, Volume};
use super::requests::{self, Ec2Query};
use super::Ec2Describer;
use crate::app::describer::error::Result;
use crate::app::describer::fetcher::EntityIndex;
use std::sync::Arc;

crate::report_row! {
    pub struct ImageRow {
        image_id: String => "ImageId",
        image_name: String => "ImageName",
        image_owner: String => "ImageOwner",
        creation_date: String => "CreationDate",
        architecture: String => "Architecture",
        platform: String => "Platform",
        ena_support: bool => "EnaSupport",
        public: bool => "Public",
        state: String => "State",
        region: String => "Region",
    }
    order_by [region, image_owner, image_name, creation_date, image_id]
}

crate::report_row! {
    pub struct ImageBackupRow {
        image_id: String => "ImageId",
        image_name: String => "ImageName",
        image_owner: String => "ImageOwner",
        delete_on_termination: bool => "DeleteOnTermination",
        snapshot_id: String => "SnapshotId",
        snapshot_name: String => "SnapshotName",
        volume_id: String => "VolumeId",
        volume_name: String => "VolumeName",
        region: String => "Region",
    }
    order_by [region, image_owner, image_name, image_id, snapshot_name, volume_name]
}

pub fn image_rows(region: &str, images: &EntityIndex<Image>) -> Vec<ImageRow> {
    images
        .values()
        .map(|image| ImageRow {
            image_id: image.image_id.clone(),
            image_name: image.name.clone(),
            image_owner: image.owner_id.clone(),
            creation_date: image.creation_date.clone(),
            architecture: image.architecture.clone(),
            platform: image.platform_details.clone(),
            ena_support: image.ena_support,
            public: image.public,
            state: image.state.clone(),
            region: region.to_string(),
        })
        .collect()
}

/// One row per EBS mapping that names a snapshot. The snapshot and its source
/// volume are soft joins.
pub fn image_backup_rows(
    region: &str,
    images: &EntityIndex<Image>,
    snapshots: &EntityIndex<Snapshot>,
    volumes: &EntityIndex<Volume>,
) -> Vec<ImageBackupRow> {
    let mut rows = Vec::new();
    for image in images.values() {
        for ebs in image.block_devices.iter().filter_map(|device| device.ebs.as_ref()) {
            let Some(snapshot_id) = ebs.snapshot_id.as_deref() else {
                continue;
            };
            let mut row = ImageBackupRow {
                image_id: image.image_id.clone(),
                image_name: image.name.clone(),
                image_owner: image.owner_id.clone(),
                delete_on_termination: ebs.delete_on_termination,
                region: region.to_string(),
                ..Default::default()
            };
            if let Some(snapshot) = snapshots.get(snapshot_id) {
                row.snapshot_id = snapshot.snapshot_id.clone();
                row.snapshot_name = name_tag(&snapshot.tags);
                if let Some(volume) = snapshot.volume_id.as_deref().and_then(|id| volumes.get(id)) {
                    row.volume_id = volume.volume_id.clone();
                    row.volume_name = name_tag(&volume.tags);
                }
            }
            rows.push(row);
        }
    }
    rows
}

impl Ec2Describer {
    pub async fn images(&self, query: &Ec2Query) -> Result<Vec<ImageRow>> {
        let request = Arc::new(requests::images(query));
        self.per_region(move |clients, scope, sink| {
            let request = Arc::clone(&request);
            async move {
                let images = indexes::images(clients.ec2.as_ref(), &scope, &request).await?;
                sink.emit_all(image_rows(scope.region(), &images)).await
            }
        })
        .await
    }

    pub async fn image_backups(&self, query: &Ec2Query) -> Result<Vec<ImageBackupRow>> {
        let request = Arc::new(requests::images(query));
        self.per_region(move |clients, scope, sink| {
            let request = Arc::clone(&request);
            async move {
                let api = clients.ec2.as_ref();
                let (images, snapshots, volumes) = tokio::try_join!(
                    indexes::images(api, &scope, &request),
                    indexes::own_snapshots(api, &scope),
                    indexes::volumes(api, &scope),
                )?;
                sink.emit_all(image_backup_rows(scope.region(), &images, &snapshots, &volumes))
                    .await
            }
        })
        .await
    }
}
