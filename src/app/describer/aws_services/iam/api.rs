//! The IAM calls the describers depend on. List methods return one page and
//! take the `Marker` of the previous one.

use super::model::{AttachedPolicy, ManagedPolicy, PolicyScope, Principal, PrincipalKind};
use crate::app::describer::error::Result;
use crate::app::describer::fetcher::Page;
use async_trait::async_trait;

#[async_trait]
pub trait IamApi: Send + Sync {
    async fn list_principals(&self, kind: PrincipalKind, marker: Option<String>) -> Result<Page<Principal>>;

    async fn list_policies(&self, scope: PolicyScope, only_attached: bool, marker: Option<String>) -> Result<Page<ManagedPolicy>>;

    async fn list_groups_for_user(&self, user_name: &str, marker: Option<String>) -> Result<Page<Principal>>;

    async fn list_attached_policies(
        &self,
        kind: PrincipalKind,
        name: &str,
        marker: Option<String>,
    ) -> Result<Page<AttachedPolicy>>;

    async fn list_inline_policies(&self, kind: PrincipalKind, name: &str, marker: Option<String>) -> Result<Page<String>>;

    /// Raw (URL-encoded) document of an inline policy.
    async fn get_inline_policy_document(&self, kind: PrincipalKind, name: &str, policy_name: &str) -> Result<String>;

    /// Raw (URL-encoded) document of one version of a managed policy.
    async fn get_policy_version_document(&self, policy_arn: &str, version_id: &str) -> Result<String>;
}
