//! Audit Tasks
//!
//! A task audits (and optionally remediates) one account and always yields
//! a report: failures end up under the `error` results key instead of
//! aborting the run for other accounts.

mod report;
mod route53_public_zones;
mod runner;
mod s3_buckets;
mod vpc_dns_logs;
mod vpc_flow_logs;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

use crate::error::Result;
use crate::types::{Account, DataPartition};

pub use report::{TaskReport, TaskResults, ERROR_KEY};
pub use route53_public_zones::AuditRoute53PublicZonesTask;
pub use runner::TaskRunner;
pub use s3_buckets::AuditS3BucketsTask;
pub use vpc_dns_logs::AuditVpcDnsLogsTask;
pub use vpc_flow_logs::AuditVpcFlowLogsTask;

#[async_trait]
pub trait AwsTask: Send + Sync {
    /// Client the task reads from and applies against
    type Client: Send + Sync;

    fn description(&self) -> &'static str;

    fn account(&self) -> &Account;

    fn partition(&self) -> Option<DataPartition> {
        None
    }

    async fn run_task(&self, client: &Self::Client) -> Result<TaskResults>;

    async fn run(&self, client: &Self::Client) -> TaskReport {
        info!(task = self.description(), account = %self.account(), "Running task");

        let results = match self.run_task(client).await {
            Ok(results) => results,
            Err(e) => {
                error!(task = self.description(), account = %self.account(), error = %e, "Task failed");
                let mut results = TaskResults::new();
                results.insert(ERROR_KEY.to_string(), Value::String(e.to_string()));
                results
            }
        };

        TaskReport::new(
            self.account().clone(),
            self.description(),
            self.partition(),
            results,
        )
    }
}

fn insert<T: Serialize + ?Sized>(results: &mut TaskResults, key: &str, value: &T) -> Result<()> {
    results.insert(key.to_string(), serde_json::to_value(value)?);
    Ok(())
}
