//! Delivery role planner
//!
//! One IAM role per account lets the flow logs service write to the central
//! log group. A non-compliant role is replaced rather than patched.

use tracing::debug;

use super::actions::{ActionKind, ComplianceAction};
use super::predicates::{has_required_tags, is_delivery_role_compliant};
use crate::clients::IamApi;
use crate::config::FlowLogConfig;
use crate::error::Result;
use crate::types::Role;

/// Observed delivery role and whether its policy outlived it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeliveryRoleState {
    pub role: Option<Role>,
    pub orphan_policy: bool,
}

impl DeliveryRoleState {
    pub fn role_arn(&self) -> Option<&str> {
        self.role.as_ref().map(|r| r.arn.as_str())
    }
}

pub async fn lookup(iam: &dyn IamApi, config: &FlowLogConfig) -> Result<DeliveryRoleState> {
    let role = iam.find_role(&config.delivery_role_name).await?;
    let orphan_policy = match role {
        Some(_) => false,
        None => iam
            .find_policy_arn(&config.delivery_policy_name)
            .await?
            .is_some(),
    };
    Ok(DeliveryRoleState {
        role,
        orphan_policy,
    })
}

pub fn plan(
    state: &DeliveryRoleState,
    config: &FlowLogConfig,
    central_group_name: &str,
) -> Vec<ComplianceAction> {
    match &state.role {
        None => {
            debug!(role = %config.delivery_role_name, "Delivery role missing");
            let mut actions = Vec::new();
            if state.orphan_policy {
                actions.push(delete(config));
            }
            actions.extend([create(config), tag(config)]);
            actions
        }
        Some(role) if !is_delivery_role_compliant(role, config, central_group_name) => {
            debug!(role = %role.name, "Delivery role not compliant");
            vec![delete(config), create(config), tag(config)]
        }
        Some(role) if !has_required_tags(&role.tags, &config.role_tags) => vec![tag(config)],
        Some(_) => Vec::new(),
    }
}

fn delete(config: &FlowLogConfig) -> ComplianceAction {
    ActionKind::DeleteDeliveryRole {
        role_name: config.delivery_role_name.clone(),
        policy_name: config.delivery_policy_name.clone(),
    }
    .into()
}

fn create(config: &FlowLogConfig) -> ComplianceAction {
    ActionKind::CreateDeliveryRole {
        role_name: config.delivery_role_name.clone(),
        policy_name: config.delivery_policy_name.clone(),
        assume_policy: config.delivery_role_assume_policy(),
        policy_document: config.delivery_role_policy_document(),
    }
    .into()
}

fn tag(config: &FlowLogConfig) -> ComplianceAction {
    ActionKind::TagDeliveryRole {
        role_name: config.delivery_role_name.clone(),
        tags: config.role_tags.clone(),
    }
    .into()
}
