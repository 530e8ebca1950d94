//! Central log group planner

use tracing::debug;

use super::actions::{ActionKind, ComplianceAction};
use super::predicates::{has_expected_retention, has_required_tags, is_central_log_group};
use crate::clients::LogsApi;
use crate::config::LogGroupConfig;
use crate::error::Result;
use crate::types::LogGroup;

pub async fn plan(
    logs: &dyn LogsApi,
    config: &LogGroupConfig,
    with_subscription_filter: bool,
) -> Result<Vec<ComplianceAction>> {
    Ok(match logs.find_log_group(&config.name).await? {
        Some(group) => plan_existing(&group, config, with_subscription_filter),
        None => plan_missing(config, with_subscription_filter),
    })
}

pub fn plan_missing(config: &LogGroupConfig, with_subscription_filter: bool) -> Vec<ComplianceAction> {
    debug!(log_group = %config.name, "Central log group missing");
    let mut actions = vec![
        ActionKind::CreateLogGroup {
            log_group_name: config.name.clone(),
        }
        .into(),
        put_retention(config),
        tag(config),
    ];
    if with_subscription_filter {
        actions.push(put_subscription(config));
    }
    actions
}

/// Patch each drifted property of an existing group: retention, tags, then subscription
pub fn plan_existing(
    group: &LogGroup,
    config: &LogGroupConfig,
    with_subscription_filter: bool,
) -> Vec<ComplianceAction> {
    let mut actions = Vec::new();

    if !has_expected_retention(group, config) {
        debug!(log_group = %group.name, retention = ?group.retention_days, "Retention differs");
        actions.push(put_retention(config));
    }

    if !has_required_tags(&group.tags, &config.tags) {
        actions.push(tag(config));
    }

    if with_subscription_filter {
        if !is_central_log_group(group, config) {
            actions.push(put_subscription(config));
        }
    } else if !group.subscription_filters.is_empty() {
        actions.push(delete_subscription(config));
    }

    actions
}

fn put_retention(config: &LogGroupConfig) -> ComplianceAction {
    ActionKind::PutRetentionPolicy {
        log_group_name: config.name.clone(),
        retention_days: config.retention_days,
    }
    .into()
}

fn tag(config: &LogGroupConfig) -> ComplianceAction {
    ActionKind::TagLogGroup {
        log_group_name: config.name.clone(),
        tags: config.tags.clone(),
    }
    .into()
}

fn put_subscription(config: &LogGroupConfig) -> ComplianceAction {
    ActionKind::PutSubscriptionFilter {
        log_group_name: config.name.clone(),
        filter_pattern: config.filter_pattern.clone(),
        destination_arn: config.destination_arn.clone(),
    }
    .into()
}

fn delete_subscription(config: &LogGroupConfig) -> ComplianceAction {
    ActionKind::DeleteSubscriptionFilter {
        log_group_name: config.name.clone(),
    }
    .into()
}
