use super::join::PolicyEntry;
use super::model::{Principal, PrincipalKind};
use super::{IamDescriber, PrincipalQuery};
use crate::app::describer::documents::DocumentOptions;
use crate::app::describer::error::Result;

crate::report_row! {
    pub struct GroupRow {
        group_name: String => "GroupName",
        group_id: String => "GroupId",
        path: String => "Path",
        group_arn: String => "GroupArn",
    }
    order_by [group_name]
}

crate::report_row! {
    pub struct GroupPolicyRow {
        group_name: String => "GroupName",
        group_id: String => "GroupId",
        path: String => "Path",
        policy_type: String => "PolicyType",
        policy_name: String => "PolicyName",
        policy_document: String => "PolicyDocument",
    }
    order_by [group_name, policy_type]
}

fn group_row(group: Principal) -> GroupRow {
    GroupRow {
        group_name: group.name,
        group_id: group.id,
        path: group.path,
        group_arn: group.arn,
    }
}

fn group_policy_row(group: &Principal, entry: PolicyEntry) -> GroupPolicyRow {
    GroupPolicyRow {
        group_name: group.name.clone(),
        group_id: group.id.clone(),
        path: group.path.clone(),
        policy_type: entry.policy_type,
        policy_name: entry.policy_name,
        policy_document: entry.policy_document,
    }
}

impl IamDescriber {
    pub async fn groups(&self, query: &PrincipalQuery) -> Result<Vec<GroupRow>> {
        self.principal_rows(PrincipalKind::Group, query, group_row).await
    }

    pub async fn group_policies(&self, query: &PrincipalQuery, documents: &DocumentOptions) -> Result<Vec<GroupPolicyRow>> {
        self.principal_policy_rows(PrincipalKind::Group, query, documents, group_policy_row)
            .await
    }
}
