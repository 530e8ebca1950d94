//! Scanner Configuration
//!
//! Policy values every planner is checked against: central log group
//! names, retention, subscription filter, delivery role and tags. The
//! configuration is an immutable value handed to each planner call.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{Result, ScannerError};
use crate::types::{OneOrMany, PolicyDocument, Statement, Tag, EFFECT_ALLOW};

/// Default (version 2) VPC flow log record format
pub const DEFAULT_FLOW_LOG_FORMAT: &str = "${version} ${account-id} ${interface-id} ${srcaddr} ${dstaddr} ${srcport} ${dstport} ${protocol} ${packets} ${bytes} ${start} ${end} ${action} ${log-status}";

/// Retention periods CloudWatch Logs accepts
const VALID_RETENTION_DAYS: [u32; 22] = [
    1, 3, 5, 7, 14, 30, 60, 90, 120, 150, 180, 365, 400, 545, 731, 1096, 1827, 2192, 2557, 2922,
    3288, 3653,
];

const DEFAULT_DESTINATION_ARN: &str = "arn:aws:logs:::destination:central";

fn default_tags() -> Vec<Tag> {
    vec![Tag::new("src-repo", "aws-scanner")]
}

/// Complete scanner configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub flow_logs: FlowLogConfig,
    pub vpc_flow_log_group: LogGroupConfig,
    pub dns_log_group: LogGroupConfig,
    pub tasks: TasksConfig,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            flow_logs: FlowLogConfig::default(),
            vpc_flow_log_group: LogGroupConfig::vpc_flow_logs(),
            dns_log_group: LogGroupConfig::dns_query_logs(),
            tasks: TasksConfig::default(),
        }
    }
}

impl ScannerConfig {
    /// Load configuration from a JSON file, or the defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                debug!(path = %path.display(), "Loading scanner configuration");
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    ScannerError::Configuration(format!("unable to read {}: {}", path.display(), e))
                })?;
                serde_json::from_str(&raw).map_err(|e| {
                    ScannerError::Configuration(format!("unable to parse {}: {}", path.display(), e))
                })?
            }
            None => Self::default(),
        };

        config.validate()?;
        info!(
            flow_log_group = %config.vpc_flow_log_group.name,
            dns_log_group = %config.dns_log_group.name,
            "Scanner configuration loaded"
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.flow_logs.validate()?;
        self.vpc_flow_log_group.validate()?;
        self.dns_log_group.validate()?;

        if self.tasks.executor == 0 {
            return Err(ScannerError::Configuration(
                "tasks.executor must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// VPC flow log and delivery role policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowLogConfig {
    /// Canonical log record format
    pub log_format: String,
    pub traffic_type: String,
    pub delivery_role_name: String,
    pub delivery_policy_name: String,
    /// Action the delivery role trust policy must allow
    pub trust_action: String,
    /// Service principal trusted to assume the delivery role
    pub trust_service: String,
    /// Actions the delivery role must be granted
    pub required_permissions: Vec<String>,
    pub role_tags: Vec<Tag>,
}

impl Default for FlowLogConfig {
    fn default() -> Self {
        Self {
            log_format: DEFAULT_FLOW_LOG_FORMAT.to_string(),
            traffic_type: "ALL".to_string(),
            delivery_role_name: "vpc_flow_log_role".to_string(),
            delivery_policy_name: "delivery_role_policy".to_string(),
            trust_action: "sts:AssumeRole".to_string(),
            trust_service: "vpc-flow-logs.amazonaws.com".to_string(),
            required_permissions: vec![
                "logs:CreateLogStream".to_string(),
                "logs:PutLogEvents".to_string(),
                "logs:DescribeLogGroups".to_string(),
                "logs:DescribeLogStreams".to_string(),
            ],
            role_tags: default_tags(),
        }
    }
}

impl FlowLogConfig {
    /// Trust policy letting the flow logs service assume the delivery role
    pub fn delivery_role_assume_policy(&self) -> PolicyDocument {
        PolicyDocument::new(vec![Statement {
            effect: Some(EFFECT_ALLOW.to_string()),
            action: OneOrMany::One(self.trust_action.clone()),
            resource: None,
            principal: Some(serde_json::json!({ "Service": self.trust_service })),
        }])
    }

    /// Permissions granted to the delivery role
    pub fn delivery_role_policy_document(&self) -> PolicyDocument {
        PolicyDocument::new(vec![Statement::allow(&self.required_permissions, &["*"])])
    }

    fn validate(&self) -> Result<()> {
        let required = [
            ("flow_logs.log_format", &self.log_format),
            ("flow_logs.traffic_type", &self.traffic_type),
            ("flow_logs.delivery_role_name", &self.delivery_role_name),
            ("flow_logs.delivery_policy_name", &self.delivery_policy_name),
            ("flow_logs.trust_action", &self.trust_action),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ScannerError::Configuration(format!("{} must not be empty", field)));
            }
        }

        if self.required_permissions.is_empty() {
            return Err(ScannerError::Configuration(
                "flow_logs.required_permissions must list at least one action".to_string(),
            ));
        }

        Ok(())
    }
}

/// Central log group policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogGroupConfig {
    pub name: String,
    pub retention_days: u32,
    pub filter_pattern: String,
    pub destination_arn: String,
    #[serde(default = "default_tags")]
    pub tags: Vec<Tag>,
}

impl LogGroupConfig {
    /// Central group every VPC flow log delivers to
    pub fn vpc_flow_logs() -> Self {
        Self {
            name: "/vpc/flow_log".to_string(),
            retention_days: 14,
            filter_pattern: "[version, account_id, interface_id]".to_string(),
            destination_arn: DEFAULT_DESTINATION_ARN.to_string(),
            tags: default_tags(),
        }
    }

    /// Central group every Route53 query log delivers to
    pub fn dns_query_logs() -> Self {
        Self {
            name: "/vpc/central_dns_log".to_string(),
            retention_days: 14,
            filter_pattern: String::new(),
            destination_arn: DEFAULT_DESTINATION_ARN.to_string(),
            tags: default_tags(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ScannerError::Configuration(
                "log group name must not be empty".to_string(),
            ));
        }

        if !VALID_RETENTION_DAYS.contains(&self.retention_days) {
            return Err(ScannerError::Configuration(format!(
                "log group {}: retention of {} days is not supported by CloudWatch Logs",
                self.name, self.retention_days
            )));
        }

        if self.destination_arn.trim().is_empty() {
            return Err(ScannerError::Configuration(format!(
                "log group {}: subscription destination must not be empty",
                self.name
            )));
        }

        Ok(())
    }
}

/// Task execution settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TasksConfig {
    /// Number of accounts processed concurrently
    pub executor: usize,
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self { executor: 10 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = ScannerConfig::load(None).unwrap();
        assert_eq!(config.vpc_flow_log_group.name, "/vpc/flow_log");
        assert_eq!(config.flow_logs.delivery_role_name, "vpc_flow_log_role");
        assert_eq!(config.tasks.executor, 10);
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "vpc_flow_log_group": {{
                    "name": "/vpc/central",
                    "retention_days": 30,
                    "filter_pattern": "",
                    "destination_arn": "arn:aws:logs:eu-west-2:111:destination:central"
                }},
                "tasks": {{ "executor": 4 }}
            }}"#
        )
        .unwrap();

        let config = ScannerConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.vpc_flow_log_group.name, "/vpc/central");
        assert_eq!(config.vpc_flow_log_group.retention_days, 30);
        assert_eq!(config.vpc_flow_log_group.tags, default_tags());
        assert_eq!(config.dns_log_group, LogGroupConfig::dns_query_logs());
        assert_eq!(config.tasks.executor, 4);
    }

    #[test]
    fn test_invalid_configuration_rejected() {
        let mut config = ScannerConfig::default();
        config.vpc_flow_log_group.retention_days = 21;
        assert!(matches!(config.validate(), Err(ScannerError::Configuration(_))));

        let mut config = ScannerConfig::default();
        config.flow_logs.delivery_role_name = " ".to_string();
        assert!(matches!(config.validate(), Err(ScannerError::Configuration(_))));

        let mut config = ScannerConfig::default();
        config.tasks.executor = 0;
        assert!(matches!(config.validate(), Err(ScannerError::Configuration(_))));
    }

    #[test]
    fn test_unreadable_file_is_configuration_error() {
        let result = ScannerConfig::load(Some(Path::new("/nonexistent/scanner.json")));
        assert!(matches!(result, Err(ScannerError::Configuration(_))));
    }

    #[test]
    fn test_delivery_role_documents() {
        let config = FlowLogConfig::default();

        let trust = config.delivery_role_assume_policy();
        assert_eq!(trust.statements[0].actions(), ["sts:AssumeRole".to_string()]);
        assert_eq!(
            trust.statements[0].principal,
            Some(serde_json::json!({ "Service": "vpc-flow-logs.amazonaws.com" }))
        );

        let permissions = config.delivery_role_policy_document();
        assert_eq!(permissions.statements[0].actions(), config.required_permissions.as_slice());
        assert_eq!(permissions.statements[0].resources(), ["*".to_string()]);
    }
}
