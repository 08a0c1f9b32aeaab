//! [`S3Api`] over `aws-sdk-s3`.

use super::api::{BucketAccess, S3Api};
use crate::app::describer::error::Result;
use crate::app::describer::fetcher::Page;
use crate::app::describer::sdk_errors::{from_sdk_error, sdk_error_code};
use async_trait::async_trait;
use aws_sdk_s3 as s3;
use aws_types::region::Region;
use aws_types::SdkConfig;

#[derive(Debug, Clone)]
pub struct S3SdkClient {
    sdk_config: SdkConfig,
    client: s3::Client,
}

impl S3SdkClient {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            sdk_config: sdk_config.clone(),
            client: s3::Client::new(sdk_config),
        }
    }

    fn regional_client(&self, region: &str) -> s3::Client {
        let config = s3::config::Builder::from(&self.sdk_config)
            .region(Region::new(region.to_string()))
            .build();
        s3::Client::from_conf(config)
    }
}

#[async_trait]
impl S3Api for S3SdkClient {
    async fn list_buckets(&self, continuation_token: Option<String>) -> Result<Page<String>> {
        let output = self
            .client
            .list_buckets()
            .set_continuation_token(continuation_token)
            .send()
            .await
            .map_err(|err| from_sdk_error("s3", "ListBuckets", err))?;
        let names = output
            .buckets
            .unwrap_or_default()
            .into_iter()
            .filter_map(|bucket| bucket.name)
            .collect();
        Ok(Page::new(names, output.continuation_token))
    }

    async fn bucket_location(&self, bucket: &str) -> Result<BucketAccess> {
        match self.client.get_bucket_location().bucket(bucket).send().await {
            Ok(output) => {
                let constraint = output
                    .location_constraint
                    .map(|c| c.as_str().to_string())
                    .unwrap_or_default();
                Ok(BucketAccess::located(&constraint))
            }
            Err(err) if sdk_error_code(&err) == Some("AccessDenied") => {
                log_debug!("location of bucket {} is not readable", bucket);
                Ok(BucketAccess::Denied)
            }
            Err(err) => Err(from_sdk_error("s3", "GetBucketLocation", err)),
        }
    }

    async fn bucket_policy(&self, bucket: &str, region: &str) -> Result<Option<String>> {
        match self.regional_client(region).get_bucket_policy().bucket(bucket).send().await {
            Ok(output) => Ok(output.policy),
            Err(err) if sdk_error_code(&err) == Some("NoSuchBucketPolicy") => Ok(None),
            Err(err) => Err(from_sdk_error("s3", "GetBucketPolicy", err)),
        }
    }
}
