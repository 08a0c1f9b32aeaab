mod common;

use awsdescribe::app::describer::aws_services::iam::model::{
    AttachedPolicy, ManagedPolicy, PolicyScope, Principal, PrincipalKind,
};
use awsdescribe::app::describer::aws_services::iam::{IamDescriber, PrincipalQuery};
use awsdescribe::app::describer::documents::{DocumentOptions, SKIPPED_DOCUMENT};
use awsdescribe::app::describer::report::sort_rows;
use common::{orchestrator, FakeIam, PrincipalPolicies};
use pretty_assertions::assert_eq;
use std::sync::Arc;

const READ_BUCKET: &str = "%7B%22Version%22%3A%222012-10-17%22%2C%22Statement%22%3A%5B%7B%22Effect%22%3A%22Allow%22%2C%22Action%22%3A%22s3%3AGetObject%22%7D%5D%7D";
const DESCRIBE_EC2: &str = "%7B%22Statement%22%3A%5B%7B%22Effect%22%3A%22Allow%22%2C%22Action%22%3A%22ec2%3ADescribe*%22%7D%5D%7D";
const CUSTOMER_ARN: &str = "arn:aws:iam::123456789012:policy/deploy";
const AWS_ARN: &str = "arn:aws:iam::aws:policy/ReadOnlyAccess";

fn principal(name: &str, id: &str, kind: &str) -> Principal {
    Principal {
        arn: format!("arn:aws:iam::123456789012:{}/{}", kind, name),
        path: "/".to_string(),
        ..Principal::new(name, id)
    }
}

fn attached(name: &str, arn: &str) -> AttachedPolicy {
    AttachedPolicy {
        policy_name: name.to_string(),
        policy_arn: arn.to_string(),
    }
}

fn deploy_policy() -> ManagedPolicy {
    ManagedPolicy {
        policy_name: "deploy".to_string(),
        policy_id: "ANPA1".to_string(),
        arn: CUSTOMER_ARN.to_string(),
        path: "/".to_string(),
        default_version_id: "v3".to_string(),
        is_attachable: true,
        attachment_count: 1,
        permissions_boundary_usage_count: 0,
    }
}

/// alice: one customer policy, one AWS policy, one inline policy, member of
/// `admins`. bob: nothing at all.
fn fake() -> FakeIam {
    let mut iam = FakeIam::default();
    iam.add_principal(
        PrincipalKind::User,
        principal("alice", "AIDA1", "user"),
        PrincipalPolicies {
            attached: vec![attached("deploy", CUSTOMER_ARN), attached("ReadOnlyAccess", AWS_ARN)],
            inline: vec![("read-bucket".to_string(), READ_BUCKET.to_string())],
        },
    );
    iam.add_principal(PrincipalKind::User, principal("bob", "AIDA2", "user"), PrincipalPolicies::default());
    iam.add_principal(
        PrincipalKind::Group,
        principal("admins", "AGPA1", "group"),
        PrincipalPolicies {
            attached: vec![],
            inline: vec![("describe".to_string(), DESCRIBE_EC2.to_string())],
        },
    );
    iam.groups_for_user
        .insert("alice".to_string(), vec![principal("admins", "AGPA1", "group")]);
    iam.customer_policies = vec![deploy_policy()];
    iam.versions.insert(CUSTOMER_ARN.to_string(), DESCRIBE_EC2.to_string());
    iam
}

fn describer() -> IamDescriber {
    IamDescriber::new(Arc::new(fake()), orchestrator())
}

#[tokio::test]
async fn test_user_policies_without_documents_include_a_placeholder() {
    let mut rows = describer()
        .user_policies(&PrincipalQuery::default(), &DocumentOptions::default())
        .await
        .unwrap();
    sort_rows(&mut rows);

    let summary: Vec<_> = rows
        .iter()
        .map(|r| (r.user_name.as_str(), r.policy_type.as_str(), r.policy_name.as_str()))
        .collect();
    assert_eq!(summary.len(), 4);
    assert!(summary.contains(&("alice", "Attached", "deploy")));
    assert!(summary.contains(&("alice", "Attached", "ReadOnlyAccess")));
    assert!(summary.contains(&("alice", "Inline", "read-bucket")));
    assert!(summary.contains(&("bob", "", "")));
    assert!(rows.iter().all(|r| r.policy_document.is_empty()));
}

#[tokio::test]
async fn test_documents_are_decoded_and_aws_policies_skipped() {
    let documents = DocumentOptions::new(true, vec![]).unwrap();
    let query = PrincipalQuery {
        names: vec!["alice".to_string()],
        ..Default::default()
    };
    let rows = describer().user_policies(&query, &documents).await.unwrap();
    assert_eq!(rows.len(), 3);

    let document_of = |name: &str| {
        rows.iter()
            .find(|r| r.policy_name == name)
            .map(|r| r.policy_document.clone())
            .unwrap()
    };
    assert_eq!(document_of("ReadOnlyAccess"), SKIPPED_DOCUMENT);
    assert!(document_of("deploy").contains("\"Action\": \"ec2:Describe*\""));
    assert!(document_of("read-bucket").contains("\"Action\": \"s3:GetObject\""));
}

#[tokio::test]
async fn test_document_filter_drops_non_matching_and_placeholders() {
    let documents = DocumentOptions::new(true, vec!["s3:".to_string()]).unwrap();
    let rows = describer()
        .user_policies(&PrincipalQuery::default(), &documents)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].policy_name, "read-bucket");
}

#[tokio::test]
async fn test_user_associations_follow_group_membership() {
    let mut rows = describer()
        .user_associations(&PrincipalQuery::default(), &DocumentOptions::default())
        .await
        .unwrap();
    sort_rows(&mut rows);

    let alice: Vec<_> = rows
        .iter()
        .filter(|r| r.user_name == "alice")
        .map(|r| (r.attached_by.as_str(), r.policy_name.as_str()))
        .collect();
    assert_eq!(alice.len(), 4);
    assert!(alice.contains(&("arn:aws:iam::123456789012:group/admins", "describe")));
    assert!(alice.contains(&("arn:aws:iam::123456789012:user/alice", "read-bucket")));

    let bob: Vec<_> = rows.iter().filter(|r| r.user_name == "bob").collect();
    assert_eq!(bob.len(), 1);
    assert_eq!(bob[0].policy_name, "");
}

#[tokio::test]
async fn test_user_groups_list_an_empty_row_for_ungrouped_users() {
    let mut rows = describer().user_groups(&PrincipalQuery::default()).await.unwrap();
    sort_rows(&mut rows);
    let summary: Vec<_> = rows
        .iter()
        .map(|r| (r.user_name.as_str(), r.group_name.as_str()))
        .collect();
    assert_eq!(summary, vec![("alice", "admins"), ("bob", "")]);
}

#[tokio::test]
async fn test_policy_report_fetches_the_default_version() {
    let documents = DocumentOptions::new(true, vec![]).unwrap();
    let rows = describer()
        .policies(PolicyScope::Local, &PrincipalQuery::default(), &documents)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].policy_arn, CUSTOMER_ARN);
    assert_eq!(rows[0].default_version_id, "v3");
    assert!(rows[0].policy_document.contains("ec2:Describe*"));
}

#[tokio::test]
async fn test_missing_policy_version_fails_the_report() {
    let mut iam = fake();
    iam.versions.clear();
    let describer = IamDescriber::new(Arc::new(iam), orchestrator());
    let documents = DocumentOptions::new(true, vec![]).unwrap();

    let err = describer
        .user_policies(&PrincipalQuery::default(), &documents)
        .await
        .unwrap_err();
    assert_eq!(err.remote_code(), Some("NoSuchEntity"));
}
