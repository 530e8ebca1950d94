use serde::{Deserialize, Serialize};

const HOSTED_ZONE_PREFIX: &str = "/hostedzone/";

/// Route53 hosted zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostedZone {
    /// Zone id without the `/hostedzone/` prefix
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub private_zone: bool,
    /// Resolved query logging configs
    #[serde(default)]
    pub query_logs: Vec<QueryLogConfig>,
}

impl HostedZone {
    /// Build a zone from the id Route53 returns (`/hostedzone/Z123`)
    pub fn new(raw_id: &str, name: impl Into<String>, private_zone: bool) -> Self {
        Self {
            id: raw_id.trim_start_matches(HOSTED_ZONE_PREFIX).to_string(),
            name: name.into(),
            private_zone,
            query_logs: Vec::new(),
        }
    }
}

/// Route53 query logging config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryLogConfig {
    pub id: String,
    pub hosted_zone_id: String,
    pub log_group_arn: String,
}

impl QueryLogConfig {
    /// Log group name embedded in the ARN
    /// (`arn:aws:logs:us-east-1:123:log-group:/aws/route53/zone:*`)
    pub fn log_group_name(&self) -> Option<&str> {
        let (_, rest) = self.log_group_arn.split_once(":log-group:")?;
        let name = rest.strip_suffix(":*").unwrap_or(rest);
        (!name.is_empty()).then_some(name)
    }
}
