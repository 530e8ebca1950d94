use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;

use super::{insert, AwsTask, TaskResults};
use crate::clients::AwsClients;
use crate::error::Result;
use crate::types::Account;

/// Public zone and the log group its queries are logged to, if any
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicZone {
    pub id: String,
    pub name: String,
    pub query_log: Option<String>,
}

pub struct AuditRoute53PublicZonesTask {
    account: Account,
}

impl AuditRoute53PublicZonesTask {
    pub fn new(account: Account) -> Self {
        Self { account }
    }
}

#[async_trait]
impl AwsTask for AuditRoute53PublicZonesTask {
    type Client = AwsClients;

    fn description(&self) -> &'static str {
        "audit Route53 public zones"
    }

    fn account(&self) -> &Account {
        &self.account
    }

    async fn run_task(&self, client: &AwsClients) -> Result<TaskResults> {
        let mut public_zones = BTreeMap::new();
        for zone in client.route53.list_hosted_zones().await? {
            if zone.private_zone {
                continue;
            }

            let query_log = client
                .route53
                .list_query_logging_configs(&zone.id)
                .await?
                .into_iter()
                .next()
                .map(|config| config.log_group_arn);
            public_zones.insert(
                zone.id.clone(),
                PublicZone {
                    id: zone.id,
                    name: zone.name,
                    query_log,
                },
            );
        }

        let mut results = TaskResults::new();
        insert(&mut results, "hosted_zones", &public_zones)?;
        Ok(results)
    }
}
