//! AWS Clients
//!
//! Capability traits per AWS service, the bundle actions are applied
//! against, and an in-memory account backend implementing all of them.

mod api;
pub mod memory;

use std::sync::Arc;

pub use api::{Ec2Api, IamApi, KmsApi, LogsApi, Route53Api, S3Api};
pub use memory::{AccountState, InMemoryAccount};

/// Handles to every service client of one target account
#[derive(Clone)]
pub struct AwsClients {
    pub ec2: Arc<dyn Ec2Api>,
    pub iam: Arc<dyn IamApi>,
    pub logs: Arc<dyn LogsApi>,
    pub kms: Arc<dyn KmsApi>,
    pub route53: Arc<dyn Route53Api>,
    pub s3: Arc<dyn S3Api>,
}

impl AwsClients {
    /// Use one backend for every service
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: Ec2Api + IamApi + LogsApi + KmsApi + Route53Api + S3Api + 'static,
    {
        Self {
            ec2: backend.clone(),
            iam: backend.clone(),
            logs: backend.clone(),
            kms: backend.clone(),
            route53: backend.clone(),
            s3: backend,
        }
    }
}

impl std::fmt::Debug for AwsClients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsClients").finish_non_exhaustive()
    }
}
