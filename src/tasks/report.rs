use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{Account, DataPartition};

/// Results key carrying the failure of a run
pub const ERROR_KEY: &str = "error";

pub type TaskResults = BTreeMap<String, Value>;

/// Outcome of one task against one account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskReport {
    pub account: Account,
    pub description: String,
    pub partition: Option<DataPartition>,
    pub results: TaskResults,
}

impl TaskReport {
    pub fn new(
        account: Account,
        description: impl Into<String>,
        partition: Option<DataPartition>,
        results: TaskResults,
    ) -> Self {
        Self {
            account,
            description: description.into(),
            partition,
            results,
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.results.get(ERROR_KEY).and_then(Value::as_str)
    }

    pub fn is_success(&self) -> bool {
        self.error().is_none()
    }
}
