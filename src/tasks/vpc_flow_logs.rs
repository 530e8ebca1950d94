use async_trait::async_trait;
use serde_json::Value;

use super::{insert, AwsTask, TaskResults, ERROR_KEY};
use crate::compliance::ActionReport;
use crate::composite::VpcClient;
use crate::error::Result;
use crate::types::Account;

pub struct AuditVpcFlowLogsTask {
    account: Account,
    enforce: bool,
    with_subscription_filter: bool,
}

impl AuditVpcFlowLogsTask {
    pub fn new(account: Account, enforce: bool, with_subscription_filter: bool) -> Self {
        Self {
            account,
            enforce,
            with_subscription_filter,
        }
    }
}

#[async_trait]
impl AwsTask for AuditVpcFlowLogsTask {
    type Client = VpcClient;

    fn description(&self) -> &'static str {
        "audit VPC flow logs compliance"
    }

    fn account(&self) -> &Account {
        &self.account
    }

    async fn run_task(&self, client: &VpcClient) -> Result<TaskResults> {
        let vpcs = client.list_vpcs().await?;
        let mut actions = client
            .enforcement_flow_log_actions(&vpcs, self.with_subscription_filter)
            .await?;

        let mut results = TaskResults::new();
        insert(&mut results, "vpcs", &vpcs)?;

        if self.enforce {
            if let Err(e) = client.apply_actions(&mut actions).await {
                results.insert(ERROR_KEY.to_string(), Value::String(e.to_string()));
            }
        }

        let reports: Vec<ActionReport> = actions.iter().map(|a| a.to_report()).collect();
        insert(&mut results, "enforcement_actions", &reports)?;
        Ok(results)
    }
}
