//! IAM entities as the resolvers see them.

use crate::app::describer::fetcher::Keyed;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrincipalKind {
    User,
    Group,
    Role,
}

impl PrincipalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrincipalKind::User => "user",
            PrincipalKind::Group => "group",
            PrincipalKind::Role => "role",
        }
    }
}

/// A user, group or role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Principal {
    pub name: String,
    pub id: String,
    pub path: String,
    pub arn: String,
    /// Raw (URL-encoded) trust policy; roles only.
    pub assume_role_policy_document: Option<String>,
}

impl Principal {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            ..Default::default()
        }
    }
}

/// A managed policy attached to a principal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachedPolicy {
    pub policy_name: String,
    pub policy_arn: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManagedPolicy {
    pub policy_name: String,
    pub policy_id: String,
    pub arn: String,
    pub path: String,
    pub default_version_id: String,
    pub is_attachable: bool,
    pub attachment_count: i32,
    pub permissions_boundary_usage_count: i32,
}

impl Keyed for ManagedPolicy {
    fn key(&self) -> &str {
        &self.arn
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PolicyScope {
    #[default]
    Local,
    Aws,
}

impl PolicyScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyScope::Local => "local",
            PolicyScope::Aws => "aws",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyType {
    Attached,
    Inline,
}

impl PolicyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyType::Attached => "Attached",
            PolicyType::Inline => "Inline",
        }
    }
}
