//! AWS Scanner Library
//!
//! Audits AWS accounts against the platform's logging policy and, when
//! asked to, applies the remediating actions: VPC flow logs, the flow log
//! delivery role, central log groups and Route53 query logging.

pub mod clients;
pub mod compliance;
pub mod composite;
pub mod config;
pub mod error;
pub mod tasks;
pub mod types;

mod test_utils;

pub use clients::{AwsClients, InMemoryAccount};
pub use composite::VpcClient;
pub use config::ScannerConfig;
pub use error::{Result, ScannerError};
pub use tasks::{AwsTask, TaskReport, TaskRunner};
