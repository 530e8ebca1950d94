use serde::{Deserialize, Serialize};

use super::Tag;

/// CloudWatch log group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogGroup {
    pub name: String,
    #[serde(default)]
    pub arn: Option<String>,
    #[serde(default)]
    pub retention_days: Option<u32>,
    #[serde(default)]
    pub kms_key_id: Option<String>,
    /// Resolved from `kms_key_id`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kms_key: Option<KmsKey>,
    #[serde(default)]
    pub subscription_filters: Vec<SubscriptionFilter>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl LogGroup {
    /// A bare log group as returned right after creation
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arn: None,
            retention_days: None,
            kms_key_id: None,
            kms_key: None,
            subscription_filters: Vec::new(),
            tags: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionFilter {
    pub filter_name: String,
    pub filter_pattern: String,
    pub destination_arn: String,
}

/// KMS key protecting a log group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KmsKey {
    pub id: String,
    pub arn: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<serde_json::Value>,
}
