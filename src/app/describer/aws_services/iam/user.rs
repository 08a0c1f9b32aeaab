//! User reports: the bare listing, policies, group memberships and the
//! association report that follows policies through groups.

use super::join::{PolicyContext, PolicyEntry};
use super::model::{Principal, PrincipalKind};
use super::{IamDescriber, PrincipalQuery};
use crate::app::describer::documents::DocumentOptions;
use crate::app::describer::error::Result;
use crate::app::describer::fetcher::fetch_all;
use crate::app::describer::scope::CallScope;
use std::sync::Arc;

crate::report_row! {
    pub struct UserRow {
        user_name: String => "UserName",
        user_id: String => "UserId",
        path: String => "Path",
        user_arn: String => "UserArn",
    }
    order_by [user_name]
}

crate::report_row! {
    pub struct UserPolicyRow {
        user_name: String => "UserName",
        user_id: String => "UserId",
        path: String => "Path",
        policy_type: String => "PolicyType",
        policy_name: String => "PolicyName",
        policy_document: String => "PolicyDocument",
    }
    order_by [user_name, policy_type]
}

crate::report_row! {
    pub struct UserGroupRow {
        user_name: String => "UserName",
        user_id: String => "UserId",
        path: String => "Path",
        group_name: String => "GroupName",
        group_id: String => "GroupId",
    }
    order_by [user_name, group_name]
}

crate::report_row! {
    pub struct UserAssociationRow {
        user_name: String => "UserName",
        attached_by: String => "AttachedBy",
        policy_type: String => "PolicyType",
        policy_name: String => "PolicyName",
        policy_document: String => "PolicyDocument",
    }
    order_by [user_name, attached_by desc, policy_type]
}

fn user_row(user: Principal) -> UserRow {
    UserRow {
        user_name: user.name,
        user_id: user.id,
        path: user.path,
        user_arn: user.arn,
    }
}

fn user_policy_row(user: &Principal, entry: PolicyEntry) -> UserPolicyRow {
    UserPolicyRow {
        user_name: user.name.clone(),
        user_id: user.id.clone(),
        path: user.path.clone(),
        policy_type: entry.policy_type,
        policy_name: entry.policy_name,
        policy_document: entry.policy_document,
    }
}

/// One row per group; a user in no group gets a single row with empty group
/// columns.
pub fn user_group_rows(user: &Principal, groups: &[Principal]) -> Vec<UserGroupRow> {
    let row = |group_name: &str, group_id: &str| UserGroupRow {
        user_name: user.name.clone(),
        user_id: user.id.clone(),
        path: user.path.clone(),
        group_name: group_name.to_string(),
        group_id: group_id.to_string(),
    };
    if groups.is_empty() {
        return vec![row("", "")];
    }
    groups.iter().map(|group| row(&group.name, &group.id)).collect()
}

fn association_rows(user: &Principal, attached_by: &str, entries: Vec<PolicyEntry>) -> Vec<UserAssociationRow> {
    entries
        .into_iter()
        .map(|entry| UserAssociationRow {
            user_name: user.name.clone(),
            attached_by: attached_by.to_string(),
            policy_type: entry.policy_type,
            policy_name: entry.policy_name,
            policy_document: entry.policy_document,
        })
        .collect()
}

/// The user's own policies, attached by the user ARN, then every group's
/// policies, attached by the group ARN. With a document filter active, a user
/// without policies of its own is dropped along with its groups.
pub async fn user_association_rows(
    context: &PolicyContext,
    scope: &CallScope,
    user: &Principal,
) -> Result<Vec<UserAssociationRow>> {
    let api = context.api();
    let user_name = user.name.as_str();
    let (own, groups) = tokio::try_join!(
        context.listing(scope, PrincipalKind::User, user_name),
        fetch_all(scope, "groups for user", move |marker| api.list_groups_for_user(user_name, marker)),
    )?;

    let filter_active = context.filter_active();
    if !own.found && filter_active {
        return Ok(Vec::new());
    }
    let mut rows = association_rows(user, &user.arn, own.into_entries(filter_active));
    for group in &groups {
        let entries = context.entries(scope, PrincipalKind::Group, &group.name).await?;
        rows.extend(association_rows(user, &group.arn, entries));
    }
    Ok(rows)
}

impl IamDescriber {
    pub async fn users(&self, query: &PrincipalQuery) -> Result<Vec<UserRow>> {
        self.principal_rows(PrincipalKind::User, query, user_row).await
    }

    pub async fn user_policies(&self, query: &PrincipalQuery, documents: &DocumentOptions) -> Result<Vec<UserPolicyRow>> {
        self.principal_policy_rows(PrincipalKind::User, query, documents, user_policy_row)
            .await
    }

    pub async fn user_groups(&self, query: &PrincipalQuery) -> Result<Vec<UserGroupRow>> {
        let scope = self.scope();
        let users = self.principals(&scope, PrincipalKind::User, query).await?;
        let api = Arc::clone(&self.api);
        self.orchestrator
            .run_each(&scope, users, move |user, scope, sink| {
                let api = Arc::clone(&api);
                async move {
                    let user_name = user.name.as_str();
                    let api = api.as_ref();
                    let groups = fetch_all(&scope, "groups for user", move |marker| {
                        api.list_groups_for_user(user_name, marker)
                    })
                    .await?;
                    sink.emit_all(user_group_rows(&user, &groups)).await
                }
            })
            .await
    }

    pub async fn user_associations(
        &self,
        query: &PrincipalQuery,
        documents: &DocumentOptions,
    ) -> Result<Vec<UserAssociationRow>> {
        let scope = self.scope();
        let (users, context) = tokio::try_join!(
            self.principals(&scope, PrincipalKind::User, query),
            self.policy_context(&scope, documents),
        )?;
        self.orchestrator
            .run_each(&scope, users, move |user, scope, sink| {
                let context = context.clone();
                async move {
                    let rows = user_association_rows(&context, &scope, &user).await?;
                    sink.emit_all(rows).await
                }
            })
            .await
    }
}
