//! Managed policy report.

use super::model::{ManagedPolicy, PolicyScope};
use super::{IamDescriber, PrincipalQuery};
use crate::app::describer::documents::{decode_policy_document, DocumentOptions};
use crate::app::describer::error::Result;
use crate::app::describer::fetcher::fetch_all;
use std::sync::Arc;

crate::report_row! {
    pub struct PolicyRow {
        policy_name: String => "PolicyName",
        policy_id: String => "PolicyId",
        policy_arn: String => "PolicyArn",
        path: String => "Path",
        default_version_id: String => "DefaultVersionId",
        is_attachable: bool => "IsAttachable",
        attachment_count: i32 => "AttachmentCount",
        permissions_boundary_usage_count: i32 => "PermissionsBoundaryUsageCount",
        policy_document: String => "PolicyDocument",
    }
    order_by [policy_name, policy_arn]
}

fn policy_row(policy: ManagedPolicy, policy_document: String) -> PolicyRow {
    PolicyRow {
        policy_name: policy.policy_name,
        policy_id: policy.policy_id,
        policy_arn: policy.arn,
        path: policy.path,
        default_version_id: policy.default_version_id,
        is_attachable: policy.is_attachable,
        attachment_count: policy.attachment_count,
        permissions_boundary_usage_count: policy.permissions_boundary_usage_count,
        policy_document,
    }
}

impl IamDescriber {
    /// Managed policies of `scope`. The ID and name selection applies to the
    /// policy ID and name.
    pub async fn policies(
        &self,
        scope_kind: PolicyScope,
        query: &PrincipalQuery,
        documents: &DocumentOptions,
    ) -> Result<Vec<PolicyRow>> {
        let scope = self.scope();
        let api = self.api.as_ref();
        let policies: Vec<ManagedPolicy> = fetch_all(&scope, "managed policies", move |marker| {
            api.list_policies(scope_kind, false, marker)
        })
        .await?
        .into_iter()
        .filter(|policy| query.matches(&policy.policy_id, &policy.policy_name))
        .collect();
        log_debug!("selected {} {} polic(ies)", policies.len(), scope_kind.as_str());

        let api = Arc::clone(&self.api);
        let documents = Arc::new(documents.clone());
        self.orchestrator
            .run_each(&scope, policies, move |policy, scope, sink| {
                let api = Arc::clone(&api);
                let documents = Arc::clone(&documents);
                async move {
                    let document = if documents.include {
                        let raw = scope
                            .call(api.get_policy_version_document(&policy.arn, &policy.default_version_id))
                            .await?;
                        decode_policy_document(&raw, true)?
                    } else {
                        String::new()
                    };
                    if documents.filter.matches(&document) {
                        sink.emit(policy_row(policy, document)).await?;
                    }
                    Ok(())
                }
            })
            .await
    }
}
