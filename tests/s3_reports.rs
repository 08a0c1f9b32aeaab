mod common;

use awsdescribe::app::describer::aws_services::s3::{BucketAccess, BucketQuery, S3Describer};
use awsdescribe::app::describer::documents::DocumentOptions;
use awsdescribe::app::describer::report::sort_rows;
use common::{orchestrator, FakeBucket, FakeS3};
use pretty_assertions::assert_eq;
use std::sync::Arc;

const PUBLIC_READ: &str = r#"{"Version":"2012-10-17","Statement":[{"Effect":"Allow","Principal":"*","Action":"s3:GetObject"}]}"#;

fn bucket(name: &str, access: BucketAccess, policy: Option<&str>) -> FakeBucket {
    FakeBucket {
        name: name.to_string(),
        access,
        policy: policy.map(str::to_string),
    }
}

fn fake() -> FakeS3 {
    FakeS3 {
        buckets: vec![
            bucket("assets", BucketAccess::located("eu-west-1"), Some(PUBLIC_READ)),
            bucket("logs", BucketAccess::located(""), None),
            bucket("secret", BucketAccess::Denied, None),
        ],
        ..Default::default()
    }
}

#[tokio::test]
async fn test_inaccessible_buckets_are_listed_without_a_location() {
    let describer = S3Describer::new(Arc::new(fake()), orchestrator());
    let mut rows = describer
        .buckets(&BucketQuery::default(), &DocumentOptions::default())
        .await
        .unwrap();
    sort_rows(&mut rows);

    let summary: Vec<_> = rows
        .iter()
        .map(|r| (r.bucket_name.as_str(), r.is_accessible, r.location.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![("assets", true, "eu-west-1"), ("logs", true, "us-east-1"), ("secret", false, "")]
    );
}

#[tokio::test]
async fn test_policies_are_read_in_the_bucket_region() {
    let fake = Arc::new(fake());
    let describer = S3Describer::new(fake.clone(), orchestrator());
    let documents = DocumentOptions::new(true, vec![]).unwrap();
    let query = BucketQuery {
        names: vec!["assets".to_string()],
        ..Default::default()
    };

    let rows = describer.buckets(&query, &documents).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].policy_document.contains("\"Action\": \"s3:GetObject\""));
    assert_eq!(*fake.policy_regions.lock().unwrap(), vec!["eu-west-1".to_string()]);
}

#[tokio::test]
async fn test_region_and_document_filters_drop_buckets() {
    let describer = S3Describer::new(Arc::new(fake()), orchestrator());

    let query = BucketQuery {
        regions: vec!["us-east-1".to_string()],
        ..Default::default()
    };
    let rows = describer.buckets(&query, &DocumentOptions::default()).await.unwrap();
    let mut names: Vec<_> = rows.iter().map(|r| r.bucket_name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["logs", "secret"]);

    let documents = DocumentOptions::new(true, vec!["Principal".to_string()]).unwrap();
    let rows = describer.buckets(&BucketQuery::default(), &documents).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].bucket_name, "assets");
}
