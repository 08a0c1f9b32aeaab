//! [`IamApi`] over `aws-sdk-iam`.

use super::api::IamApi;
use super::model::{AttachedPolicy, ManagedPolicy, PolicyScope, Principal, PrincipalKind};
use crate::app::describer::error::Result;
use crate::app::describer::fetcher::Page;
use crate::app::describer::sdk_errors::from_sdk_error;
use async_trait::async_trait;
use aws_sdk_iam as iam;
use aws_types::SdkConfig;

#[derive(Debug, Clone)]
pub struct IamSdkClient {
    client: iam::Client,
}

impl IamSdkClient {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: iam::Client::new(sdk_config),
        }
    }
}

fn group(group: iam::types::Group) -> Principal {
    Principal {
        name: group.group_name,
        id: group.group_id,
        path: group.path,
        arn: group.arn,
        assume_role_policy_document: None,
    }
}

fn attached(policies: Option<Vec<iam::types::AttachedPolicy>>) -> Vec<AttachedPolicy> {
    policies
        .unwrap_or_default()
        .into_iter()
        .map(|policy| AttachedPolicy {
            policy_name: policy.policy_name.unwrap_or_default(),
            policy_arn: policy.policy_arn.unwrap_or_default(),
        })
        .collect()
}

#[async_trait]
impl IamApi for IamSdkClient {
    async fn list_principals(&self, kind: PrincipalKind, marker: Option<String>) -> Result<Page<Principal>> {
        match kind {
            PrincipalKind::User => {
                let output = self
                    .client
                    .list_users()
                    .set_marker(marker)
                    .send()
                    .await
                    .map_err(|err| from_sdk_error("iam", "ListUsers", err))?;
                let items = output
                    .users
                    .into_iter()
                    .map(|user| Principal {
                        name: user.user_name,
                        id: user.user_id,
                        path: user.path,
                        arn: user.arn,
                        assume_role_policy_document: None,
                    })
                    .collect();
                Ok(Page::new(items, output.marker))
            }
            PrincipalKind::Group => {
                let output = self
                    .client
                    .list_groups()
                    .set_marker(marker)
                    .send()
                    .await
                    .map_err(|err| from_sdk_error("iam", "ListGroups", err))?;
                Ok(Page::new(
                    output.groups.into_iter().map(group).collect(),
                    output.marker,
                ))
            }
            PrincipalKind::Role => {
                let output = self
                    .client
                    .list_roles()
                    .set_marker(marker)
                    .send()
                    .await
                    .map_err(|err| from_sdk_error("iam", "ListRoles", err))?;
                let items = output
                    .roles
                    .into_iter()
                    .map(|role| Principal {
                        name: role.role_name,
                        id: role.role_id,
                        path: role.path,
                        arn: role.arn,
                        assume_role_policy_document: role.assume_role_policy_document,
                    })
                    .collect();
                Ok(Page::new(items, output.marker))
            }
        }
    }

    async fn list_policies(&self, scope: PolicyScope, only_attached: bool, marker: Option<String>) -> Result<Page<ManagedPolicy>> {
        let scope = match scope {
            PolicyScope::Local => iam::types::PolicyScopeType::Local,
            PolicyScope::Aws => iam::types::PolicyScopeType::Aws,
        };
        let output = self
            .client
            .list_policies()
            .scope(scope)
            .only_attached(only_attached)
            .set_marker(marker)
            .send()
            .await
            .map_err(|err| from_sdk_error("iam", "ListPolicies", err))?;
        let items = output
            .policies
            .unwrap_or_default()
            .into_iter()
            .map(|policy| ManagedPolicy {
                policy_name: policy.policy_name.unwrap_or_default(),
                policy_id: policy.policy_id.unwrap_or_default(),
                arn: policy.arn.unwrap_or_default(),
                path: policy.path.unwrap_or_default(),
                default_version_id: policy.default_version_id.unwrap_or_default(),
                is_attachable: policy.is_attachable,
                attachment_count: policy.attachment_count.unwrap_or_default(),
                permissions_boundary_usage_count: policy.permissions_boundary_usage_count.unwrap_or_default(),
            })
            .collect();
        Ok(Page::new(items, output.marker))
    }

    async fn list_groups_for_user(&self, user_name: &str, marker: Option<String>) -> Result<Page<Principal>> {
        let output = self
            .client
            .list_groups_for_user()
            .user_name(user_name)
            .set_marker(marker)
            .send()
            .await
            .map_err(|err| from_sdk_error("iam", "ListGroupsForUser", err))?;
        Ok(Page::new(
            output.groups.into_iter().map(group).collect(),
            output.marker,
        ))
    }

    async fn list_attached_policies(
        &self,
        kind: PrincipalKind,
        name: &str,
        marker: Option<String>,
    ) -> Result<Page<AttachedPolicy>> {
        let (policies, next) = match kind {
            PrincipalKind::User => {
                let output = self
                    .client
                    .list_attached_user_policies()
                    .user_name(name)
                    .set_marker(marker)
                    .send()
                    .await
                    .map_err(|err| from_sdk_error("iam", "ListAttachedUserPolicies", err))?;
                (output.attached_policies, output.marker)
            }
            PrincipalKind::Group => {
                let output = self
                    .client
                    .list_attached_group_policies()
                    .group_name(name)
                    .set_marker(marker)
                    .send()
                    .await
                    .map_err(|err| from_sdk_error("iam", "ListAttachedGroupPolicies", err))?;
                (output.attached_policies, output.marker)
            }
            PrincipalKind::Role => {
                let output = self
                    .client
                    .list_attached_role_policies()
                    .role_name(name)
                    .set_marker(marker)
                    .send()
                    .await
                    .map_err(|err| from_sdk_error("iam", "ListAttachedRolePolicies", err))?;
                (output.attached_policies, output.marker)
            }
        };
        Ok(Page::new(attached(policies), next))
    }

    async fn list_inline_policies(&self, kind: PrincipalKind, name: &str, marker: Option<String>) -> Result<Page<String>> {
        let (names, next) = match kind {
            PrincipalKind::User => {
                let output = self
                    .client
                    .list_user_policies()
                    .user_name(name)
                    .set_marker(marker)
                    .send()
                    .await
                    .map_err(|err| from_sdk_error("iam", "ListUserPolicies", err))?;
                (output.policy_names, output.marker)
            }
            PrincipalKind::Group => {
                let output = self
                    .client
                    .list_group_policies()
                    .group_name(name)
                    .set_marker(marker)
                    .send()
                    .await
                    .map_err(|err| from_sdk_error("iam", "ListGroupPolicies", err))?;
                (output.policy_names, output.marker)
            }
            PrincipalKind::Role => {
                let output = self
                    .client
                    .list_role_policies()
                    .role_name(name)
                    .set_marker(marker)
                    .send()
                    .await
                    .map_err(|err| from_sdk_error("iam", "ListRolePolicies", err))?;
                (output.policy_names, output.marker)
            }
        };
        Ok(Page::new(names, next))
    }

    async fn get_inline_policy_document(&self, kind: PrincipalKind, name: &str, policy_name: &str) -> Result<String> {
        let document = match kind {
            PrincipalKind::User => {
                self.client
                    .get_user_policy()
                    .user_name(name)
                    .policy_name(policy_name)
                    .send()
                    .await
                    .map_err(|err| from_sdk_error("iam", "GetUserPolicy", err))?
                    .policy_document
            }
            PrincipalKind::Group => {
                self.client
                    .get_group_policy()
                    .group_name(name)
                    .policy_name(policy_name)
                    .send()
                    .await
                    .map_err(|err| from_sdk_error("iam", "GetGroupPolicy", err))?
                    .policy_document
            }
            PrincipalKind::Role => {
                self.client
                    .get_role_policy()
                    .role_name(name)
                    .policy_name(policy_name)
                    .send()
                    .await
                    .map_err(|err| from_sdk_error("iam", "GetRolePolicy", err))?
                    .policy_document
            }
        };
        Ok(document)
    }

    async fn get_policy_version_document(&self, policy_arn: &str, version_id: &str) -> Result<String> {
        let output = self
            .client
            .get_policy_version()
            .policy_arn(policy_arn)
            .version_id(version_id)
            .send()
            .await
            .map_err(|err| from_sdk_error("iam", "GetPolicyVersion", err))?;
        Ok(output
            .policy_version
            .and_then(|version| version.document)
            .unwrap_or_default())
    }
}
