//! Compliance Actions
//!
//! A closed set of remediation steps. Planners build them, the orchestrator
//! applies them in order, and each one reports itself whether or not it
//! was applied.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, info};

use crate::clients::AwsClients;
use crate::error::{Result, ScannerError};
use crate::types::{FlowLogRequest, PolicyDocument, Tag};

pub const STATUS_APPLIED: &str = "applied";

/// Remediation step with exactly the fields it needs
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionKind {
    CreateFlowLog {
        vpc_id: String,
        log_group_name: String,
        role_name: String,
        traffic_type: String,
        log_format: String,
    },
    DeleteFlowLog {
        flow_log_id: String,
    },
    CreateDeliveryRole {
        role_name: String,
        policy_name: String,
        assume_policy: PolicyDocument,
        policy_document: PolicyDocument,
    },
    DeleteDeliveryRole {
        role_name: String,
        policy_name: String,
    },
    TagDeliveryRole {
        role_name: String,
        tags: Vec<Tag>,
    },
    CreateLogGroup {
        log_group_name: String,
    },
    PutRetentionPolicy {
        log_group_name: String,
        retention_days: u32,
    },
    TagLogGroup {
        log_group_name: String,
        tags: Vec<Tag>,
    },
    PutSubscriptionFilter {
        log_group_name: String,
        filter_pattern: String,
        destination_arn: String,
    },
    DeleteSubscriptionFilter {
        log_group_name: String,
    },
    CreateQueryLogConfig {
        zone_id: String,
        log_group_name: String,
    },
    DeleteQueryLogConfig {
        query_log_config_id: String,
    },
}

/// Serialized outcome of one action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionReport {
    /// `None` when only planned, `applied` once applied
    pub status: Option<String>,
    pub description: String,
    pub details: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComplianceAction {
    pub kind: ActionKind,
    applied: bool,
}

impl From<ActionKind> for ComplianceAction {
    fn from(kind: ActionKind) -> Self {
        Self {
            kind,
            applied: false,
        }
    }
}

impl ComplianceAction {
    pub fn delete_flow_log(flow_log_id: impl Into<String>) -> Self {
        ActionKind::DeleteFlowLog {
            flow_log_id: flow_log_id.into(),
        }
        .into()
    }

    pub fn delete_query_log_config(query_log_config_id: impl Into<String>) -> Self {
        ActionKind::DeleteQueryLogConfig {
            query_log_config_id: query_log_config_id.into(),
        }
        .into()
    }

    pub fn create_query_log_config(zone_id: impl Into<String>, log_group_name: impl Into<String>) -> Self {
        ActionKind::CreateQueryLogConfig {
            zone_id: zone_id.into(),
            log_group_name: log_group_name.into(),
        }
        .into()
    }

    pub fn is_applied(&self) -> bool {
        self.applied
    }

    pub fn description(&self) -> &'static str {
        match &self.kind {
            ActionKind::CreateFlowLog { .. } => "Create VPC flow log",
            ActionKind::DeleteFlowLog { .. } => "Delete VPC flow log",
            ActionKind::CreateDeliveryRole { .. } => "Create delivery role for VPC flow log",
            ActionKind::DeleteDeliveryRole { .. } => "Delete delivery role for VPC flow log",
            ActionKind::TagDeliveryRole { .. } => "Tag delivery role for VPC flow log",
            ActionKind::CreateLogGroup { .. } => "Create central log group",
            ActionKind::PutRetentionPolicy { .. } => "Put central log group retention policy",
            ActionKind::TagLogGroup { .. } => "Tag central log group",
            ActionKind::PutSubscriptionFilter { .. } => "Put central log group subscription filter",
            ActionKind::DeleteSubscriptionFilter { .. } => {
                "Delete central log group subscription filter"
            }
            ActionKind::CreateQueryLogConfig { .. } => "Create Route53 query logging config",
            ActionKind::DeleteQueryLogConfig { .. } => "Delete Route53 query logging config",
        }
    }

    /// Identifying fields of the action
    pub fn details(&self) -> Value {
        match &self.kind {
            ActionKind::CreateFlowLog {
                vpc_id,
                log_group_name,
                ..
            } => json!({ "vpc_id": vpc_id, "log_group_name": log_group_name }),
            ActionKind::DeleteFlowLog { flow_log_id } => json!({ "flow_log_id": flow_log_id }),
            ActionKind::CreateDeliveryRole {
                role_name,
                policy_name,
                ..
            } => json!({ "role_name": role_name, "policy_name": policy_name }),
            ActionKind::DeleteDeliveryRole { role_name, .. } => json!({ "role_name": role_name }),
            ActionKind::TagDeliveryRole { role_name, tags } => {
                json!({ "role_name": role_name, "tags": tags })
            }
            ActionKind::CreateLogGroup { log_group_name }
            | ActionKind::DeleteSubscriptionFilter { log_group_name } => {
                json!({ "log_group_name": log_group_name })
            }
            ActionKind::PutRetentionPolicy {
                log_group_name,
                retention_days,
            } => json!({ "log_group_name": log_group_name, "retention_days": retention_days }),
            ActionKind::TagLogGroup {
                log_group_name,
                tags,
            } => json!({ "log_group_name": log_group_name, "tags": tags }),
            ActionKind::PutSubscriptionFilter {
                log_group_name,
                filter_pattern,
                destination_arn,
            } => json!({
                "log_group_name": log_group_name,
                "filter_pattern": filter_pattern,
                "destination_arn": destination_arn,
            }),
            ActionKind::CreateQueryLogConfig {
                zone_id,
                log_group_name,
            } => json!({ "zone_id": zone_id, "log_group_name": log_group_name }),
            ActionKind::DeleteQueryLogConfig {
                query_log_config_id,
            } => json!({ "query_log_config_id": query_log_config_id }),
        }
    }

    pub fn to_report(&self) -> ActionReport {
        ActionReport {
            status: self.applied.then(|| STATUS_APPLIED.to_string()),
            description: self.description().to_string(),
            details: self.details(),
        }
    }

    /// Perform the remote change and mark the action applied
    pub async fn apply(&mut self, clients: &AwsClients) -> Result<()> {
        info!(action = self.description(), details = %self.details(), "Applying compliance action");

        match &self.kind {
            ActionKind::CreateFlowLog {
                vpc_id,
                log_group_name,
                role_name,
                traffic_type,
                log_format,
            } => {
                let role = clients.iam.get_role(role_name).await?;
                clients
                    .ec2
                    .create_flow_logs(&FlowLogRequest {
                        vpc_id: vpc_id.clone(),
                        role_arn: role.arn,
                        log_group_name: log_group_name.clone(),
                        traffic_type: traffic_type.clone(),
                        log_format: log_format.clone(),
                    })
                    .await?;
            }
            ActionKind::DeleteFlowLog { flow_log_id } => {
                let ids = [flow_log_id.clone()];
                ignore_missing(clients.ec2.delete_flow_logs(&ids).await)?;
            }
            ActionKind::CreateDeliveryRole {
                role_name,
                policy_name,
                assume_policy,
                policy_document,
            } => {
                if clients.iam.find_role(role_name).await?.is_none() {
                    clients.iam.create_role(role_name, assume_policy).await?;
                }

                let policy_arn = match clients.iam.find_policy_arn(policy_name).await? {
                    Some(arn) => arn,
                    None => clients
                        .iam
                        .create_policy(policy_name, policy_document)
                        .await?
                        .arn
                        .ok_or_else(|| {
                            ScannerError::api("iam", "create_policy", "no ARN returned for new policy")
                        })?,
                };
                clients.iam.attach_role_policy(role_name, &policy_arn).await?;
            }
            ActionKind::DeleteDeliveryRole {
                role_name,
                policy_name,
            } => {
                let role = clients.iam.find_role(role_name).await?;
                if let Some(role) = &role {
                    for arn in role.policies.iter().filter_map(|p| p.arn.as_deref()) {
                        ignore_missing(clients.iam.detach_role_policy(role_name, arn).await)?;
                    }
                }

                if let Some(arn) = clients.iam.find_policy_arn(policy_name).await? {
                    ignore_missing(clients.iam.delete_policy(&arn).await)?;
                }

                if role.is_some() {
                    ignore_missing(clients.iam.delete_role(role_name).await)?;
                }
            }
            ActionKind::TagDeliveryRole { role_name, tags } => {
                clients.iam.tag_role(role_name, tags).await?;
            }
            ActionKind::CreateLogGroup { log_group_name } => {
                if clients.logs.find_log_group(log_group_name).await?.is_some() {
                    debug!(log_group = %log_group_name, "Log group already exists");
                } else {
                    clients.logs.create_log_group(log_group_name).await?;
                }
            }
            ActionKind::PutRetentionPolicy {
                log_group_name,
                retention_days,
            } => {
                clients
                    .logs
                    .put_retention_policy(log_group_name, *retention_days)
                    .await?;
            }
            ActionKind::TagLogGroup {
                log_group_name,
                tags,
            } => {
                clients.logs.tag_log_group(log_group_name, tags).await?;
            }
            ActionKind::PutSubscriptionFilter {
                log_group_name,
                filter_pattern,
                destination_arn,
            } => {
                clients
                    .logs
                    .put_subscription_filter(log_group_name, filter_pattern, destination_arn)
                    .await?;
            }
            ActionKind::DeleteSubscriptionFilter { log_group_name } => {
                ignore_missing(clients.logs.delete_subscription_filter(log_group_name).await)?;
            }
            ActionKind::CreateQueryLogConfig {
                zone_id,
                log_group_name,
            } => {
                let log_group_arn = clients
                    .logs
                    .find_log_group(log_group_name)
                    .await?
                    .and_then(|group| group.arn)
                    .ok_or_else(|| ScannerError::not_found("log group", log_group_name))?;
                clients
                    .route53
                    .create_query_logging_config(zone_id, &log_group_arn)
                    .await?;
            }
            ActionKind::DeleteQueryLogConfig {
                query_log_config_id,
            } => {
                ignore_missing(
                    clients
                        .route53
                        .delete_query_logging_config(query_log_config_id)
                        .await,
                )?;
            }
        }

        self.applied = true;
        Ok(())
    }
}

/// Deleting something already gone is success
fn ignore_missing(result: Result<()>) -> Result<()> {
    match result {
        Err(e) if e.is_not_found() => {
            debug!(error = %e, "Nothing to delete");
            Ok(())
        }
        other => other,
    }
}

/// Apply actions in order, stopping at the first failure
pub async fn apply_all(actions: &mut [ComplianceAction], clients: &AwsClients) -> Result<()> {
    for action in actions.iter_mut() {
        if let Err(e) = action.apply(clients).await {
            error!(action = action.description(), error = %e, "Compliance action failed");
            return Err(e);
        }
    }
    Ok(())
}
