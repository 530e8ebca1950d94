//! AWS Capability Traits
//!
//! The thin per-service surface the engine needs. Implementations wrap a
//! real SDK client or the in-memory backend; the engine never sees which.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    Bucket, BucketEncryption, BucketLogging, FlowLogRequest, HostedZone, KmsKey, LogGroup, Policy,
    PolicyDocument, QueryLogConfig, Role, Tag, Vpc,
};

#[async_trait]
pub trait Ec2Api: Send + Sync {
    /// VPCs with their raw (unenriched) flow logs
    async fn list_vpcs(&self) -> Result<Vec<Vpc>>;

    async fn create_flow_logs(&self, request: &FlowLogRequest) -> Result<()>;

    async fn delete_flow_logs(&self, flow_log_ids: &[String]) -> Result<()>;
}

#[async_trait]
pub trait IamApi: Send + Sync {
    async fn find_role(&self, name: &str) -> Result<Option<Role>>;

    async fn find_role_by_arn(&self, arn: &str) -> Result<Option<Role>>;

    /// Like `find_role`, but a missing role is `ScannerError::NotFound`
    async fn get_role(&self, name: &str) -> Result<Role>;

    async fn create_role(&self, name: &str, assume_policy: &PolicyDocument) -> Result<Role>;

    async fn delete_role(&self, name: &str) -> Result<()>;

    async fn create_policy(&self, name: &str, document: &PolicyDocument) -> Result<Policy>;

    async fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> Result<()>;

    async fn detach_role_policy(&self, role_name: &str, policy_arn: &str) -> Result<()>;

    async fn delete_policy(&self, policy_arn: &str) -> Result<()>;

    async fn find_policy_arn(&self, name: &str) -> Result<Option<String>>;

    async fn tag_role(&self, name: &str, tags: &[Tag]) -> Result<()>;
}

#[async_trait]
pub trait LogsApi: Send + Sync {
    async fn find_log_group(&self, name: &str) -> Result<Option<LogGroup>>;

    async fn create_log_group(&self, name: &str) -> Result<()>;

    async fn put_retention_policy(&self, name: &str, retention_days: u32) -> Result<()>;

    async fn tag_log_group(&self, name: &str, tags: &[Tag]) -> Result<()>;

    async fn put_subscription_filter(
        &self,
        name: &str,
        filter_pattern: &str,
        destination_arn: &str,
    ) -> Result<()>;

    /// Remove the subscription filters of a log group
    async fn delete_subscription_filter(&self, name: &str) -> Result<()>;
}

#[async_trait]
pub trait KmsApi: Send + Sync {
    async fn find_key(&self, key_id: &str) -> Result<Option<KmsKey>>;
}

#[async_trait]
pub trait Route53Api: Send + Sync {
    async fn list_hosted_zones(&self) -> Result<Vec<HostedZone>>;

    async fn list_query_logging_configs(&self, zone_id: &str) -> Result<Vec<QueryLogConfig>>;

    async fn create_query_logging_config(
        &self,
        zone_id: &str,
        log_group_arn: &str,
    ) -> Result<QueryLogConfig>;

    async fn delete_query_logging_config(&self, id: &str) -> Result<()>;
}

#[async_trait]
pub trait S3Api: Send + Sync {
    async fn list_buckets(&self) -> Result<Vec<Bucket>>;

    async fn get_bucket_encryption(&self, bucket: &str) -> Result<BucketEncryption>;

    async fn get_bucket_logging(&self, bucket: &str) -> Result<BucketLogging>;
}
