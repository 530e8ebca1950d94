use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScannerError};

/// AWS account targeted by a task
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Account {
    /// Opaque AWS account id
    pub id: String,
    pub name: String,
}

impl Account {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// Month-granular time partition attached to a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPartition {
    pub year: i32,
    pub month: u32,
}

impl DataPartition {
    /// Build a partition, rejecting invalid months and months in the future
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(ScannerError::Configuration(format!(
                "partition month must be between 1 and 12, got {}",
                month
            )));
        }

        let today = Utc::now().date_naive();
        if (year, month) > (today.year(), today.month()) {
            return Err(ScannerError::Configuration(format!(
                "partition {}-{:02} is in the future",
                year, month
            )));
        }

        Ok(Self { year, month })
    }
}

impl std::fmt::Display for DataPartition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}
