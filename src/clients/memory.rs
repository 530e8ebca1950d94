//! In-Memory Account Backend
//!
//! Implements every capability trait over a serde-loadable snapshot of one
//! account. Ids and ARNs are generated the way AWS shapes them, missing
//! resources are `NotFound`, and any operation can be made to fail on
//! demand so callers can exercise their error paths.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::api::{Ec2Api, IamApi, KmsApi, LogsApi, Route53Api, S3Api};
use crate::error::{Result, ScannerError};
use crate::types::{
    merge_tags, Account, Bucket, BucketEncryption, BucketLogging, FlowLog, FlowLogRequest,
    HostedZone, KmsKey, LogGroup, Policy, PolicyDocument, QueryLogConfig, Role, SubscriptionFilter,
    Tag, Vpc, FLOW_LOG_STATUS_ACTIVE,
};

const REGION: &str = "us-east-1";

/// Everything the backend knows about one account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountState {
    pub account: Account,
    pub vpcs: Vec<Vpc>,
    pub roles: Vec<Role>,
    /// Customer managed policies, attached or not
    pub policies: Vec<Policy>,
    pub log_groups: Vec<LogGroup>,
    pub kms_keys: Vec<KmsKey>,
    pub hosted_zones: Vec<HostedZone>,
    pub query_logging_configs: Vec<QueryLogConfig>,
    pub buckets: Vec<Bucket>,
}

impl AccountState {
    pub fn role_arn(&self, name: &str) -> String {
        format!("arn:aws:iam::{}:role/{}", self.account.id, name)
    }

    pub fn policy_arn(&self, name: &str) -> String {
        format!("arn:aws:iam::{}:policy/{}", self.account.id, name)
    }

    pub fn log_group_arn(&self, name: &str) -> String {
        format!("arn:aws:logs:{}:{}:log-group:{}", REGION, self.account.id, name)
    }

    fn role_mut(&mut self, name: &str) -> Result<&mut Role> {
        self.roles
            .iter_mut()
            .find(|r| r.name == name)
            .ok_or_else(|| ScannerError::not_found("role", name))
    }

    fn log_group_mut(&mut self, name: &str) -> Result<&mut LogGroup> {
        self.log_groups
            .iter_mut()
            .find(|g| g.name == name)
            .ok_or_else(|| ScannerError::not_found("log group", name))
    }

    fn bucket(&self, name: &str) -> Result<&Bucket> {
        self.buckets
            .iter()
            .find(|b| b.name == name)
            .ok_or_else(|| ScannerError::not_found("bucket", name))
    }
}

struct Inner {
    state: AccountState,
    failing: HashSet<String>,
}

/// Capability backend holding an `AccountState` behind a mutex
pub struct InMemoryAccount {
    inner: Mutex<Inner>,
}

impl InMemoryAccount {
    pub fn new(state: AccountState) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state,
                failing: HashSet::new(),
            }),
        }
    }

    /// Load an account snapshot from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ScannerError::Configuration(format!("unable to read {}: {}", path.display(), e))
        })?;
        let state: AccountState = serde_json::from_str(&raw).map_err(|e| {
            ScannerError::Configuration(format!("unable to parse {}: {}", path.display(), e))
        })?;
        debug!(
            path = %path.display(),
            account = %state.account,
            vpcs = state.vpcs.len(),
            "Loaded account state"
        );
        Ok(Self::new(state))
    }

    /// Make every later call of `operation` (e.g. `create_flow_logs`) fail
    pub fn fail_operation(&self, operation: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.failing.insert(operation.to_string());
        }
    }

    pub fn snapshot(&self) -> Result<AccountState> {
        self.inner
            .lock()
            .map(|inner| inner.state.clone())
            .map_err(|_| ScannerError::api("memory", "snapshot", "account state lock poisoned"))
    }

    pub fn account(&self) -> Result<Account> {
        Ok(self.snapshot()?.account)
    }

    fn enter(&self, service: &'static str, operation: &'static str) -> Result<MutexGuard<'_, Inner>> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| ScannerError::api(service, operation, "account state lock poisoned"))?;
        if inner.failing.contains(operation) {
            return Err(ScannerError::api(service, operation, "injected failure"));
        }
        debug!(service, operation, "In-memory call");
        Ok(inner)
    }
}

fn short_id(prefix: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{}-{}", prefix, &id[..17])
}

#[async_trait]
impl Ec2Api for InMemoryAccount {
    async fn list_vpcs(&self) -> Result<Vec<Vpc>> {
        let inner = self.enter("ec2", "list_vpcs")?;
        let mut vpcs = inner.state.vpcs.clone();
        for flow_log in vpcs.iter_mut().flat_map(|v| v.flow_logs.iter_mut()) {
            flow_log.deliver_log_role = None;
            flow_log.log_group = None;
        }
        Ok(vpcs)
    }

    async fn create_flow_logs(&self, request: &FlowLogRequest) -> Result<()> {
        let mut inner = self.enter("ec2", "create_flow_logs")?;
        let vpc = inner
            .state
            .vpcs
            .iter_mut()
            .find(|v| v.id == request.vpc_id)
            .ok_or_else(|| ScannerError::not_found("vpc", &request.vpc_id))?;

        vpc.flow_logs.push(FlowLog {
            id: short_id("fl"),
            status: FLOW_LOG_STATUS_ACTIVE.to_string(),
            traffic_type: request.traffic_type.clone(),
            log_format: request.log_format.clone(),
            log_group_name: Some(request.log_group_name.clone()),
            deliver_log_role_arn: Some(request.role_arn.clone()),
            deliver_log_role: None,
            log_group: None,
        });
        Ok(())
    }

    async fn delete_flow_logs(&self, flow_log_ids: &[String]) -> Result<()> {
        let mut inner = self.enter("ec2", "delete_flow_logs")?;
        let mut missing: Vec<&str> = flow_log_ids.iter().map(String::as_str).collect();
        for vpc in inner.state.vpcs.iter_mut() {
            vpc.flow_logs.retain(|fl| {
                let delete = flow_log_ids.contains(&fl.id);
                if delete {
                    missing.retain(|id| *id != fl.id);
                }
                !delete
            });
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ScannerError::not_found("flow log", missing.join(",")))
        }
    }
}

#[async_trait]
impl IamApi for InMemoryAccount {
    async fn find_role(&self, name: &str) -> Result<Option<Role>> {
        let inner = self.enter("iam", "find_role")?;
        Ok(inner.state.roles.iter().find(|r| r.name == name).cloned())
    }

    async fn find_role_by_arn(&self, arn: &str) -> Result<Option<Role>> {
        let inner = self.enter("iam", "find_role_by_arn")?;
        Ok(inner.state.roles.iter().find(|r| r.arn == arn).cloned())
    }

    async fn get_role(&self, name: &str) -> Result<Role> {
        let inner = self.enter("iam", "get_role")?;
        inner
            .state
            .roles
            .iter()
            .find(|r| r.name == name)
            .cloned()
            .ok_or_else(|| ScannerError::not_found("role", name))
    }

    async fn create_role(&self, name: &str, assume_policy: &PolicyDocument) -> Result<Role> {
        let mut inner = self.enter("iam", "create_role")?;
        if inner.state.roles.iter().any(|r| r.name == name) {
            return Err(ScannerError::api(
                "iam",
                "create_role",
                format!("EntityAlreadyExists: role {} already exists", name),
            ));
        }

        let role = Role {
            name: name.to_string(),
            arn: inner.state.role_arn(name),
            assume_policy: assume_policy.clone(),
            policies: Vec::new(),
            tags: Vec::new(),
        };
        inner.state.roles.push(role.clone());
        Ok(role)
    }

    async fn delete_role(&self, name: &str) -> Result<()> {
        let mut inner = self.enter("iam", "delete_role")?;
        let role = inner.state.role_mut(name)?;
        if !role.policies.is_empty() {
            return Err(ScannerError::api(
                "iam",
                "delete_role",
                format!("DeleteConflict: role {} has attached policies", name),
            ));
        }
        inner.state.roles.retain(|r| r.name != name);
        Ok(())
    }

    async fn create_policy(&self, name: &str, document: &PolicyDocument) -> Result<Policy> {
        let mut inner = self.enter("iam", "create_policy")?;
        if inner.state.policies.iter().any(|p| p.name == name) {
            return Err(ScannerError::api(
                "iam",
                "create_policy",
                format!("EntityAlreadyExists: policy {} already exists", name),
            ));
        }

        let policy = Policy {
            name: name.to_string(),
            arn: Some(inner.state.policy_arn(name)),
            document: document.clone(),
        };
        inner.state.policies.push(policy.clone());
        Ok(policy)
    }

    async fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> Result<()> {
        let mut inner = self.enter("iam", "attach_role_policy")?;
        let policy = inner
            .state
            .policies
            .iter()
            .find(|p| p.arn.as_deref() == Some(policy_arn))
            .cloned()
            .ok_or_else(|| ScannerError::not_found("policy", policy_arn))?;

        let role = inner.state.role_mut(role_name)?;
        if !role.policies.iter().any(|p| p.arn.as_deref() == Some(policy_arn)) {
            role.policies.push(policy);
        }
        Ok(())
    }

    async fn detach_role_policy(&self, role_name: &str, policy_arn: &str) -> Result<()> {
        let mut inner = self.enter("iam", "detach_role_policy")?;
        let role = inner.state.role_mut(role_name)?;
        let before = role.policies.len();
        role.policies.retain(|p| p.arn.as_deref() != Some(policy_arn));
        if role.policies.len() == before {
            return Err(ScannerError::not_found("attached policy", policy_arn));
        }
        Ok(())
    }

    async fn delete_policy(&self, policy_arn: &str) -> Result<()> {
        let mut inner = self.enter("iam", "delete_policy")?;
        if !inner.state.policies.iter().any(|p| p.arn.as_deref() == Some(policy_arn)) {
            return Err(ScannerError::not_found("policy", policy_arn));
        }

        let attached = inner
            .state
            .roles
            .iter()
            .any(|r| r.policies.iter().any(|p| p.arn.as_deref() == Some(policy_arn)));
        if attached {
            return Err(ScannerError::api(
                "iam",
                "delete_policy",
                format!("DeleteConflict: policy {} is attached", policy_arn),
            ));
        }

        inner.state.policies.retain(|p| p.arn.as_deref() != Some(policy_arn));
        Ok(())
    }

    async fn find_policy_arn(&self, name: &str) -> Result<Option<String>> {
        let inner = self.enter("iam", "find_policy_arn")?;
        Ok(inner
            .state
            .policies
            .iter()
            .find(|p| p.name == name)
            .and_then(|p| p.arn.clone()))
    }

    async fn tag_role(&self, name: &str, tags: &[Tag]) -> Result<()> {
        let mut inner = self.enter("iam", "tag_role")?;
        let role = inner.state.role_mut(name)?;
        merge_tags(&mut role.tags, tags);
        Ok(())
    }
}

#[async_trait]
impl LogsApi for InMemoryAccount {
    async fn find_log_group(&self, name: &str) -> Result<Option<LogGroup>> {
        let inner = self.enter("logs", "find_log_group")?;
        Ok(inner
            .state
            .log_groups
            .iter()
            .find(|g| g.name == name)
            .cloned()
            .map(|mut group| {
                group.kms_key = None;
                group
            }))
    }

    async fn create_log_group(&self, name: &str) -> Result<()> {
        let mut inner = self.enter("logs", "create_log_group")?;
        if inner.state.log_groups.iter().any(|g| g.name == name) {
            return Err(ScannerError::api(
                "logs",
                "create_log_group",
                format!("ResourceAlreadyExistsException: {}", name),
            ));
        }

        let mut group = LogGroup::new(name);
        group.arn = Some(inner.state.log_group_arn(name));
        inner.state.log_groups.push(group);
        Ok(())
    }

    async fn put_retention_policy(&self, name: &str, retention_days: u32) -> Result<()> {
        let mut inner = self.enter("logs", "put_retention_policy")?;
        inner.state.log_group_mut(name)?.retention_days = Some(retention_days);
        Ok(())
    }

    async fn tag_log_group(&self, name: &str, tags: &[Tag]) -> Result<()> {
        let mut inner = self.enter("logs", "tag_log_group")?;
        merge_tags(&mut inner.state.log_group_mut(name)?.tags, tags);
        Ok(())
    }

    async fn put_subscription_filter(
        &self,
        name: &str,
        filter_pattern: &str,
        destination_arn: &str,
    ) -> Result<()> {
        let mut inner = self.enter("logs", "put_subscription_filter")?;
        let group = inner.state.log_group_mut(name)?;
        let filter = SubscriptionFilter {
            filter_name: format!("{}_sub_filter", name),
            filter_pattern: filter_pattern.to_string(),
            destination_arn: destination_arn.to_string(),
        };

        match group
            .subscription_filters
            .iter_mut()
            .find(|f| f.filter_name == filter.filter_name)
        {
            Some(existing) => *existing = filter,
            None => group.subscription_filters.push(filter),
        }
        Ok(())
    }

    async fn delete_subscription_filter(&self, name: &str) -> Result<()> {
        let mut inner = self.enter("logs", "delete_subscription_filter")?;
        let group = inner.state.log_group_mut(name)?;
        if group.subscription_filters.is_empty() {
            return Err(ScannerError::not_found("subscription filter", name));
        }
        group.subscription_filters.clear();
        Ok(())
    }
}

#[async_trait]
impl KmsApi for InMemoryAccount {
    async fn find_key(&self, key_id: &str) -> Result<Option<KmsKey>> {
        let inner = self.enter("kms", "find_key")?;
        Ok(inner
            .state
            .kms_keys
            .iter()
            .find(|k| k.id == key_id || k.arn == key_id)
            .cloned())
    }
}

#[async_trait]
impl Route53Api for InMemoryAccount {
    async fn list_hosted_zones(&self) -> Result<Vec<HostedZone>> {
        let inner = self.enter("route53", "list_hosted_zones")?;
        Ok(inner
            .state
            .hosted_zones
            .iter()
            .map(|z| HostedZone::new(&z.id, z.name.clone(), z.private_zone))
            .collect())
    }

    async fn list_query_logging_configs(&self, zone_id: &str) -> Result<Vec<QueryLogConfig>> {
        let inner = self.enter("route53", "list_query_logging_configs")?;
        Ok(inner
            .state
            .query_logging_configs
            .iter()
            .filter(|c| c.hosted_zone_id == zone_id)
            .cloned()
            .collect())
    }

    async fn create_query_logging_config(
        &self,
        zone_id: &str,
        log_group_arn: &str,
    ) -> Result<QueryLogConfig> {
        let mut inner = self.enter("route53", "create_query_logging_config")?;
        let zone = inner
            .state
            .hosted_zones
            .iter()
            .find(|z| z.id == zone_id)
            .ok_or_else(|| ScannerError::not_found("hosted zone", zone_id))?;
        if zone.private_zone {
            return Err(ScannerError::api(
                "route53",
                "create_query_logging_config",
                format!("InvalidInput: query logging is not supported for private zone {}", zone_id),
            ));
        }

        let config = QueryLogConfig {
            id: Uuid::new_v4().to_string(),
            hosted_zone_id: zone_id.to_string(),
            log_group_arn: log_group_arn.to_string(),
        };
        inner.state.query_logging_configs.push(config.clone());
        Ok(config)
    }

    async fn delete_query_logging_config(&self, id: &str) -> Result<()> {
        let mut inner = self.enter("route53", "delete_query_logging_config")?;
        let before = inner.state.query_logging_configs.len();
        inner.state.query_logging_configs.retain(|c| c.id != id);
        if inner.state.query_logging_configs.len() == before {
            return Err(ScannerError::not_found("query logging config", id));
        }
        Ok(())
    }
}

#[async_trait]
impl S3Api for InMemoryAccount {
    async fn list_buckets(&self) -> Result<Vec<Bucket>> {
        let inner = self.enter("s3", "list_buckets")?;
        Ok(inner
            .state
            .buckets
            .iter()
            .map(|b| Bucket::new(b.name.clone()))
            .collect())
    }

    async fn get_bucket_encryption(&self, bucket: &str) -> Result<BucketEncryption> {
        let inner = self.enter("s3", "get_bucket_encryption")?;
        inner.state.bucket(bucket)?.encryption.clone().ok_or_else(|| {
            ScannerError::api(
                "s3",
                "get_bucket_encryption",
                format!("ServerSideEncryptionConfigurationNotFoundError: {}", bucket),
            )
        })
    }

    async fn get_bucket_logging(&self, bucket: &str) -> Result<BucketLogging> {
        let inner = self.enter("s3", "get_bucket_logging")?;
        Ok(inner.state.bucket(bucket)?.logging.clone().unwrap_or_default())
    }
}
