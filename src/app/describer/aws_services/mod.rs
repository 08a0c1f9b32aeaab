//! Per-service API seams, SDK adapters and report resolvers.

pub mod ec2;
pub mod elb;
pub mod iam;
pub mod s3;
