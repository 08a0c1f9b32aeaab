//! The principal to policy join shared by the user, group and role reports.

use super::api::IamApi;
use super::model::{AttachedPolicy, ManagedPolicy, PolicyType, PrincipalKind};
use crate::app::describer::documents::{decode_policy_document, DocumentOptions, SKIPPED_DOCUMENT};
use crate::app::describer::error::Result;
use crate::app::describer::fetcher::{fetch_all, EntityIndex};
use crate::app::describer::scope::CallScope;
use std::sync::Arc;

/// One policy of a principal. The default value is the placeholder emitted
/// for principals without any policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyEntry {
    pub policy_type: String,
    pub policy_name: String,
    pub policy_document: String,
}

impl PolicyEntry {
    fn new(policy_type: PolicyType, policy_name: impl Into<String>, policy_document: String) -> Self {
        Self {
            policy_type: policy_type.as_str().to_string(),
            policy_name: policy_name.into(),
            policy_document,
        }
    }
}

/// Policies found for one principal before the placeholder rule applies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyListing {
    /// Whether the principal has any policy at all, filtered out or not.
    pub found: bool,
    pub entries: Vec<PolicyEntry>,
}

impl PolicyListing {
    fn merge(mut self, other: PolicyListing) -> Self {
        self.found |= other.found;
        self.entries.extend(other.entries);
        self
    }

    /// A principal without policies yields one placeholder entry, unless a
    /// document filter is active.
    pub fn into_entries(self, filter_active: bool) -> Vec<PolicyEntry> {
        if self.found || filter_active {
            self.entries
        } else {
            vec![PolicyEntry::default()]
        }
    }
}

/// Everything a per-principal task needs to resolve policies.
#[derive(Clone)]
pub struct PolicyContext {
    api: Arc<dyn IamApi>,
    customer_policies: Arc<EntityIndex<ManagedPolicy>>,
    documents: Arc<DocumentOptions>,
}

impl PolicyContext {
    pub fn new(api: Arc<dyn IamApi>, customer_policies: EntityIndex<ManagedPolicy>, documents: DocumentOptions) -> Self {
        Self {
            api,
            customer_policies: Arc::new(customer_policies),
            documents: Arc::new(documents),
        }
    }

    pub fn api(&self) -> &dyn IamApi {
        self.api.as_ref()
    }

    pub fn filter_active(&self) -> bool {
        self.documents.filter.is_active()
    }

    /// Document of an attached policy at its default version. Policies
    /// outside the customer-managed index are not fetched.
    async fn attached_document(&self, scope: &CallScope, policy: &AttachedPolicy) -> Result<String> {
        let Some(managed) = self.customer_policies.get(&policy.policy_arn) else {
            return Ok(SKIPPED_DOCUMENT.to_string());
        };
        let raw = scope
            .call(
                self.api
                    .get_policy_version_document(&managed.arn, &managed.default_version_id),
            )
            .await?;
        decode_policy_document(&raw, true)
    }

    pub async fn attached(&self, scope: &CallScope, kind: PrincipalKind, name: &str) -> Result<PolicyListing> {
        let api = self.api.as_ref();
        let policies = fetch_all(scope, "attached policies", move |marker| {
            api.list_attached_policies(kind, name, marker)
        })
        .await?;
        let mut listing = PolicyListing {
            found: !policies.is_empty(),
            entries: Vec::new(),
        };
        for policy in policies {
            if !self.documents.include {
                listing
                    .entries
                    .push(PolicyEntry::new(PolicyType::Attached, policy.policy_name, String::new()));
                continue;
            }
            let document = self.attached_document(scope, &policy).await?;
            if self.documents.filter.matches(&document) {
                listing
                    .entries
                    .push(PolicyEntry::new(PolicyType::Attached, policy.policy_name, document));
            }
        }
        Ok(listing)
    }

    pub async fn inline(&self, scope: &CallScope, kind: PrincipalKind, name: &str) -> Result<PolicyListing> {
        let api = self.api.as_ref();
        let policy_names = fetch_all(scope, "inline policies", move |marker| {
            api.list_inline_policies(kind, name, marker)
        })
        .await?;
        let mut listing = PolicyListing {
            found: !policy_names.is_empty(),
            entries: Vec::new(),
        };
        for policy_name in policy_names {
            if !self.documents.include {
                listing
                    .entries
                    .push(PolicyEntry::new(PolicyType::Inline, policy_name, String::new()));
                continue;
            }
            let raw = scope
                .call(self.api.get_inline_policy_document(kind, name, &policy_name))
                .await?;
            let document = decode_policy_document(&raw, true)?;
            if self.documents.filter.matches(&document) {
                listing
                    .entries
                    .push(PolicyEntry::new(PolicyType::Inline, policy_name, document));
            }
        }
        Ok(listing)
    }

    /// Attached and inline policies of one principal, listed concurrently.
    pub async fn listing(&self, scope: &CallScope, kind: PrincipalKind, name: &str) -> Result<PolicyListing> {
        let (attached, inline) = tokio::try_join!(self.attached(scope, kind, name), self.inline(scope, kind, name))?;
        Ok(attached.merge(inline))
    }

    /// [`listing`](Self::listing) with the placeholder rule applied.
    pub async fn entries(&self, scope: &CallScope, kind: PrincipalKind, name: &str) -> Result<Vec<PolicyEntry>> {
        Ok(self
            .listing(scope, kind, name)
            .await?
            .into_entries(self.filter_active()))
    }
}
