//! VPC Composite Client
//!
//! Joins the per-service readers into enriched snapshots and drives the
//! planners and the ordered execution of their actions for one account.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::clients::AwsClients;
use crate::compliance::{apply_all, dns_logs, flow_logs, ComplianceAction};
use crate::config::ScannerConfig;
use crate::error::Result;
use crate::types::{HostedZone, LogGroup, Role, Vpc};

pub struct VpcClient {
    clients: AwsClients,
    config: ScannerConfig,
}

impl VpcClient {
    pub fn new(clients: AwsClients, config: ScannerConfig) -> Self {
        Self { clients, config }
    }

    /// VPCs with each flow log's delivery role and log group resolved
    pub async fn list_vpcs(&self) -> Result<Vec<Vpc>> {
        let mut vpcs = self.clients.ec2.list_vpcs().await?;
        let mut roles: HashMap<String, Option<Role>> = HashMap::new();
        let mut groups: HashMap<String, Option<LogGroup>> = HashMap::new();

        for flow_log in vpcs.iter_mut().flat_map(|v| v.flow_logs.iter_mut()) {
            if let Some(arn) = &flow_log.deliver_log_role_arn {
                if !roles.contains_key(arn) {
                    let role = self.clients.iam.find_role_by_arn(arn).await?;
                    roles.insert(arn.clone(), role);
                }
                flow_log.deliver_log_role = roles.get(arn).cloned().flatten();
            }

            if let Some(name) = flow_log.log_group_name.as_deref().filter(|n| !n.is_empty()) {
                if !groups.contains_key(name) {
                    let group = self.find_log_group(name).await?;
                    groups.insert(name.to_string(), group);
                }
                flow_log.log_group = groups.get(name).cloned().flatten();
            }
        }

        debug!(vpcs = vpcs.len(), "Listed VPCs");
        Ok(vpcs)
    }

    /// Log group with its KMS key resolved
    pub async fn find_log_group(&self, name: &str) -> Result<Option<LogGroup>> {
        let Some(mut group) = self.clients.logs.find_log_group(name).await? else {
            return Ok(None);
        };

        if let Some(key_id) = &group.kms_key_id {
            group.kms_key = self.clients.kms.find_key(key_id).await?;
        }
        Ok(Some(group))
    }

    /// Hosted zones with their query logging configs resolved
    pub async fn list_hosted_zones(&self) -> Result<Vec<HostedZone>> {
        let mut zones = self.clients.route53.list_hosted_zones().await?;
        for zone in zones.iter_mut() {
            zone.query_logs = self
                .clients
                .route53
                .list_query_logging_configs(&zone.id)
                .await?;
        }

        debug!(zones = zones.len(), "Listed hosted zones");
        Ok(zones)
    }

    pub async fn enforcement_flow_log_actions(
        &self,
        vpcs: &[Vpc],
        with_subscription_filter: bool,
    ) -> Result<Vec<ComplianceAction>> {
        flow_logs::plan(&self.clients, &self.config, vpcs, with_subscription_filter).await
    }

    pub async fn enforcement_dns_log_actions(
        &self,
        zones: &[HostedZone],
        with_subscription_filter: bool,
    ) -> Result<Vec<ComplianceAction>> {
        dns_logs::plan(&self.clients, &self.config, zones, with_subscription_filter).await
    }

    /// Apply in planner order, stopping at the first failure
    pub async fn apply_actions(&self, actions: &mut [ComplianceAction]) -> Result<()> {
        info!(actions = actions.len(), "Applying enforcement actions");
        apply_all(actions, &self.clients).await
    }
}
