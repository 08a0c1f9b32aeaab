//! IAM reports: users, groups, roles and managed policies, optionally joined
//! against their attached and inline policies.
//!
//! IAM is global, so a report uses one limiter for the whole operation: the
//! principal listing runs first, then one task per principal fans out over the
//! shared scope.

pub mod api;
pub mod group;
pub mod join;
pub mod model;
pub mod policy;
pub mod role;
pub mod sdk;
pub mod user;

pub use api::IamApi;
pub use sdk::IamSdkClient;

use self::join::{PolicyContext, PolicyEntry};
use self::model::{ManagedPolicy, PolicyScope, Principal, PrincipalKind};
use crate::app::describer::documents::DocumentOptions;
use crate::app::describer::error::Result;
use crate::app::describer::fetcher::{fetch_all, fetch_index, EntityIndex};
use crate::app::describer::orchestrator::Orchestrator;
use crate::app::describer::scope::CallScope;
use std::sync::Arc;

/// Label of the call scope for global services.
pub const GLOBAL_SCOPE: &str = "global";

/// Client-side selection by exact ID or name; both empty selects everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrincipalQuery {
    pub ids: Vec<String>,
    pub names: Vec<String>,
}

impl PrincipalQuery {
    pub fn matches(&self, id: &str, name: &str) -> bool {
        (self.ids.is_empty() || self.ids.iter().any(|i| i == id))
            && (self.names.is_empty() || self.names.iter().any(|n| n == name))
    }
}

pub struct IamDescriber {
    api: Arc<dyn IamApi>,
    orchestrator: Orchestrator,
}

impl IamDescriber {
    pub fn new(api: Arc<dyn IamApi>, orchestrator: Orchestrator) -> Self {
        Self { api, orchestrator }
    }

    fn scope(&self) -> CallScope {
        self.orchestrator.scope(GLOBAL_SCOPE)
    }

    async fn principals(&self, scope: &CallScope, kind: PrincipalKind, query: &PrincipalQuery) -> Result<Vec<Principal>> {
        let api = self.api.as_ref();
        let all = fetch_all(scope, kind.as_str(), move |marker| api.list_principals(kind, marker)).await?;
        let selected: Vec<Principal> = all
            .into_iter()
            .filter(|principal| query.matches(&principal.id, &principal.name))
            .collect();
        log_debug!("selected {} {}(s)", selected.len(), kind.as_str());
        Ok(selected)
    }

    /// Customer-managed policies attached to anything, keyed by ARN. Only
    /// fetched when documents are requested.
    async fn customer_policies(&self, scope: &CallScope, documents: &DocumentOptions) -> Result<EntityIndex<ManagedPolicy>> {
        if !documents.include {
            return Ok(EntityIndex::new());
        }
        let api = self.api.as_ref();
        fetch_index(scope, "customer managed policies", move |marker| {
            api.list_policies(PolicyScope::Local, true, marker)
        })
        .await
    }

    async fn policy_context(&self, scope: &CallScope, documents: &DocumentOptions) -> Result<PolicyContext> {
        let customer_policies = self.customer_policies(scope, documents).await?;
        Ok(PolicyContext::new(
            Arc::clone(&self.api),
            customer_policies,
            documents.clone(),
        ))
    }

    /// Bare principal listing, mapped straight to rows.
    async fn principal_rows<R>(&self, kind: PrincipalKind, query: &PrincipalQuery, to_row: fn(Principal) -> R) -> Result<Vec<R>> {
        let scope = self.scope();
        let principals = self.principals(&scope, kind, query).await?;
        Ok(principals.into_iter().map(to_row).collect())
    }

    /// One task per principal resolving its attached and inline policies.
    async fn principal_policy_rows<R>(
        &self,
        kind: PrincipalKind,
        query: &PrincipalQuery,
        documents: &DocumentOptions,
        to_row: fn(&Principal, PolicyEntry) -> R,
    ) -> Result<Vec<R>>
    where
        R: Send + 'static,
    {
        let scope = self.scope();
        let (principals, context) = tokio::try_join!(
            self.principals(&scope, kind, query),
            self.policy_context(&scope, documents),
        )?;
        self.orchestrator
            .run_each(&scope, principals, move |principal, scope, sink| {
                let context = context.clone();
                async move {
                    let entries = context.entries(&scope, kind, &principal.name).await?;
                    sink.emit_all(entries.into_iter().map(|entry| to_row(&principal, entry)))
                        .await
                }
            })
            .await
    }
}
