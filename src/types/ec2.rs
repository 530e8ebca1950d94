use serde::{Deserialize, Serialize};

use super::{LogGroup, Role};

/// Status reported by EC2 for a healthy flow log
pub const FLOW_LOG_STATUS_ACTIVE: &str = "ACTIVE";

/// VPC with its flow logs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vpc {
    pub id: String,
    #[serde(default)]
    pub flow_logs: Vec<FlowLog>,
}

/// VPC flow log configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowLog {
    pub id: String,
    pub status: String,
    pub traffic_type: String,
    pub log_format: String,
    #[serde(default)]
    pub log_group_name: Option<String>,
    #[serde(default)]
    pub deliver_log_role_arn: Option<String>,
    /// Resolved from `deliver_log_role_arn`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deliver_log_role: Option<Role>,
    /// Resolved from `log_group_name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_group: Option<LogGroup>,
}

/// Parameters of a `CreateFlowLogs` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowLogRequest {
    pub vpc_id: String,
    pub role_arn: String,
    pub log_group_name: String,
    pub traffic_type: String,
    pub log_format: String,
}
