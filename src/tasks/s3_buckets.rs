use async_trait::async_trait;
use tracing::warn;

use super::{insert, AwsTask, TaskResults};
use crate::clients::AwsClients;
use crate::error::Result;
use crate::types::Account;

pub struct AuditS3BucketsTask {
    account: Account,
}

impl AuditS3BucketsTask {
    pub fn new(account: Account) -> Self {
        Self { account }
    }
}

#[async_trait]
impl AwsTask for AuditS3BucketsTask {
    type Client = AwsClients;

    fn description(&self) -> &'static str {
        "audit S3 buckets"
    }

    fn account(&self) -> &Account {
        &self.account
    }

    async fn run_task(&self, client: &AwsClients) -> Result<TaskResults> {
        let mut buckets = client.s3.list_buckets().await?;
        for bucket in buckets.iter_mut() {
            let encryption = client.s3.get_bucket_encryption(&bucket.name).await;
            bucket.encryption = Some(encryption.unwrap_or_else(|e| {
                warn!(bucket = %bucket.name, error = %e, "Unable to fetch encryption config");
                Default::default()
            }));

            let logging = client.s3.get_bucket_logging(&bucket.name).await;
            bucket.logging = Some(logging.unwrap_or_else(|e| {
                warn!(bucket = %bucket.name, error = %e, "Unable to fetch server access logging config");
                Default::default()
            }));
        }

        let mut results = TaskResults::new();
        insert(&mut results, "buckets", &buckets)?;
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{AccountState, InMemoryAccount};
    use crate::types::{Bucket, BucketEncryption, BucketLogging};
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_bucket_lookups_fall_back_to_disabled() {
        let mut state = AccountState::default();
        state.buckets = vec![
            Bucket {
                name: "secure".to_string(),
                encryption: Some(BucketEncryption {
                    enabled: true,
                    kind: Some("aws:kms".to_string()),
                }),
                logging: Some(BucketLogging { enabled: true }),
            },
            Bucket::new("plain"),
        ];
        let backend = Arc::new(InMemoryAccount::new(state));
        let clients = AwsClients::from_backend(backend.clone());

        let report = AuditS3BucketsTask::new(Account::default()).run(&clients).await;
        assert!(report.is_success());
        assert_eq!(
            report.results["buckets"],
            json!([
                {"name": "secure", "encryption": {"enabled": true, "type": "aws:kms"}, "logging": {"enabled": true}},
                {"name": "plain", "encryption": {"enabled": false, "type": null}, "logging": {"enabled": false}},
            ])
        );
    }

    #[tokio::test]
    async fn test_listing_failure_is_reported() {
        let backend = Arc::new(InMemoryAccount::new(AccountState::default()));
        backend.fail_operation("list_buckets");
        let clients = AwsClients::from_backend(backend);

        let report = AuditS3BucketsTask::new(Account::default()).run(&clients).await;
        assert_eq!(report.error(), Some("s3 list_buckets failed: injected failure"));
    }
}
