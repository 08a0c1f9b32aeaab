//! Bucket report.

use super::api::{BucketAccess, S3Api};
use super::S3Describer;
use crate::app::describer::documents::{decode_policy_document, DocumentOptions};
use crate::app::describer::error::Result;
use crate::app::describer::fetcher::fetch_all;
use crate::app::describer::scope::CallScope;
use std::sync::Arc;

crate::report_row! {
    pub struct BucketRow {
        bucket_name: String => "BucketName",
        is_accessible: bool => "IsAccessible",
        location: String => "Location",
        policy_document: String => "PolicyDocument",
    }
    order_by [bucket_name, location]
}

/// Bucket selection: exact names, and the regions an accessible bucket must
/// live in. Empty lists select everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketQuery {
    pub names: Vec<String>,
    pub regions: Vec<String>,
}

impl BucketQuery {
    fn selects_name(&self, name: &str) -> bool {
        self.names.is_empty() || self.names.iter().any(|n| n == name)
    }

    fn selects_region(&self, region: &str) -> bool {
        self.regions.is_empty() || self.regions.iter().any(|r| r == region)
    }
}

/// Resolve one bucket. With a document filter active, inaccessible buckets
/// and buckets without a policy are dropped.
pub async fn bucket_row(
    api: &dyn S3Api,
    scope: &CallScope,
    bucket: &str,
    query: &BucketQuery,
    documents: &DocumentOptions,
) -> Result<Option<BucketRow>> {
    let filter_active = documents.filter.is_active();
    let location = match scope.call(api.bucket_location(bucket)).await? {
        BucketAccess::Denied if filter_active => return Ok(None),
        BucketAccess::Denied => {
            return Ok(Some(BucketRow {
                bucket_name: bucket.to_string(),
                ..Default::default()
            }))
        }
        BucketAccess::Accessible(location) => location,
    };
    if !query.selects_region(&location) {
        return Ok(None);
    }

    let policy = if documents.include {
        scope.call(api.bucket_policy(bucket, &location)).await?
    } else {
        None
    };
    let policy_document = match policy {
        Some(raw) => decode_policy_document(&raw, false)?,
        None if filter_active => return Ok(None),
        None => String::new(),
    };
    if !documents.filter.matches(&policy_document) {
        return Ok(None);
    }
    Ok(Some(BucketRow {
        bucket_name: bucket.to_string(),
        is_accessible: true,
        location,
        policy_document,
    }))
}

impl S3Describer {
    pub async fn buckets(&self, query: &BucketQuery, documents: &DocumentOptions) -> Result<Vec<BucketRow>> {
        let scope = self.scope();
        let api = self.api.as_ref();
        let names: Vec<String> = fetch_all(&scope, "buckets", move |token| api.list_buckets(token))
            .await?
            .into_iter()
            .filter(|name| query.selects_name(name))
            .collect();
        log_debug!("selected {} bucket(s)", names.len());

        let api = Arc::clone(&self.api);
        let query = Arc::new(query.clone());
        let documents = Arc::new(documents.clone());
        self.orchestrator
            .run_each(&scope, names, move |name, scope, sink| {
                let api = Arc::clone(&api);
                let query = Arc::clone(&query);
                let documents = Arc::clone(&documents);
                async move {
                    if let Some(row) = bucket_row(api.as_ref(), &scope, &name, &query, &documents).await? {
                        sink.emit(row).await?;
                    }
                    Ok(())
                }
            })
            .await
    }
}
