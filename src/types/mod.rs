//! AWS Resource Snapshots
//!
//! Typed views of the resources the scanner reads. Enrichment fields
//! (resolved delivery roles, log groups, KMS keys, query logging configs)
//! are filled in by the composite client, never by the raw readers.

mod account;
mod ec2;
mod iam;
mod logs;
mod route53;
mod s3;

use serde::{Deserialize, Serialize};

pub use account::{Account, DataPartition};
pub use ec2::{FlowLog, FlowLogRequest, Vpc, FLOW_LOG_STATUS_ACTIVE};
pub use iam::{OneOrMany, Policy, PolicyDocument, Role, Statement, EFFECT_ALLOW};
pub use logs::{KmsKey, LogGroup, SubscriptionFilter};
pub use route53::{HostedZone, QueryLogConfig};
pub use s3::{Bucket, BucketEncryption, BucketLogging};

/// Resource tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Insert or replace tags by key, keeping the existing order
pub fn merge_tags(existing: &mut Vec<Tag>, tags: &[Tag]) {
    for tag in tags {
        match existing.iter_mut().find(|t| t.key == tag.key) {
            Some(current) => current.value = tag.value.clone(),
            None => existing.push(tag.clone()),
        }
    }
}
