//! Role reports. The trust policy arrives with the role listing, so the
//! assume report needs no per-role calls.

use super::join::PolicyEntry;
use super::model::{Principal, PrincipalKind};
use super::{IamDescriber, PrincipalQuery};
use crate::app::describer::documents::{decode_policy_document, DocumentOptions};
use crate::app::describer::error::Result;

crate::report_row! {
    pub struct RoleRow {
        role_name: String => "RoleName",
        role_id: String => "RoleId",
        path: String => "Path",
        role_arn: String => "RoleArn",
    }
    order_by [role_name]
}

crate::report_row! {
    pub struct RolePolicyRow {
        role_name: String => "RoleName",
        role_id: String => "RoleId",
        path: String => "Path",
        policy_type: String => "PolicyType",
        policy_name: String => "PolicyName",
        policy_document: String => "PolicyDocument",
    }
    order_by [role_name, policy_type]
}

crate::report_row! {
    pub struct RoleAssumeRow {
        role_name: String => "RoleName",
        role_id: String => "RoleId",
        path: String => "Path",
        assume_role_policy_document: String => "AssumeRolePolicyDocument",
    }
    order_by [role_name]
}

fn role_row(role: Principal) -> RoleRow {
    RoleRow {
        role_name: role.name,
        role_id: role.id,
        path: role.path,
        role_arn: role.arn,
    }
}

fn role_policy_row(role: &Principal, entry: PolicyEntry) -> RolePolicyRow {
    RolePolicyRow {
        role_name: role.name.clone(),
        role_id: role.id.clone(),
        path: role.path.clone(),
        policy_type: entry.policy_type,
        policy_name: entry.policy_name,
        policy_document: entry.policy_document,
    }
}

pub fn role_assume_rows(roles: Vec<Principal>) -> Result<Vec<RoleAssumeRow>> {
    roles
        .into_iter()
        .map(|role| {
            let document = match role.assume_role_policy_document.as_deref() {
                Some(raw) if !raw.is_empty() => decode_policy_document(raw, true)?,
                _ => String::new(),
            };
            Ok(RoleAssumeRow {
                role_name: role.name,
                role_id: role.id,
                path: role.path,
                assume_role_policy_document: document,
            })
        })
        .collect()
}

impl IamDescriber {
    pub async fn roles(&self, query: &PrincipalQuery) -> Result<Vec<RoleRow>> {
        self.principal_rows(PrincipalKind::Role, query, role_row).await
    }

    pub async fn role_policies(&self, query: &PrincipalQuery, documents: &DocumentOptions) -> Result<Vec<RolePolicyRow>> {
        self.principal_policy_rows(PrincipalKind::Role, query, documents, role_policy_row)
            .await
    }

    pub async fn role_assumptions(&self, query: &PrincipalQuery) -> Result<Vec<RoleAssumeRow>> {
        let scope = self.scope();
        let roles = self.principals(&scope, PrincipalKind::Role, query).await?;
        role_assume_rows(roles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::describer::error::DescribeError;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_trust_policy_is_decoded() {
        let mut role = Principal::new("deployer", "AROA1");
        role.assume_role_policy_document = Some(
            "%7B%22Version%22%3A%222012-10-17%22%2C%22Statement%22%3A%5B%5D%7D".to_string(),
        );
        let rows = role_assume_rows(vec![role, Principal::new("bare", "AROA2")]).unwrap();
        assert_eq!(
            rows[0].assume_role_policy_document,
            "{\n  \"Version\": \"2012-10-17\",\n  \"Statement\": []\n}"
        );
        assert_eq!(rows[1].assume_role_policy_document, "");
    }

    #[test]
    fn test_undecodable_trust_policy_fails_the_report() {
        let mut role = Principal::new("broken", "AROA3");
        role.assume_role_policy_document = Some("not%20json".to_string());
        let err = role_assume_rows(vec![role]).unwrap_err();
        assert!(matches!(err, DescribeError::Document(_)));
    }
}
