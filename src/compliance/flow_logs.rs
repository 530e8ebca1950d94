//! VPC flow log planner
//!
//! Each VPC ends up with exactly one flow log that is well formed and
//! delivers to the central log group. The delivery role and the central
//! log group are fixed first so that `CreateFlowLog` can rely on them.

use tracing::debug;

use super::actions::{ActionKind, ComplianceAction};
use super::predicates::{is_flow_log_centralised, is_flow_log_in_scope, is_flow_log_well_formed};
use super::{delivery_role, log_group};
use crate::clients::AwsClients;
use crate::config::ScannerConfig;
use crate::error::Result;
use crate::types::{FlowLog, Vpc};

pub async fn plan(
    clients: &AwsClients,
    config: &ScannerConfig,
    vpcs: &[Vpc],
    with_subscription_filter: bool,
) -> Result<Vec<ComplianceAction>> {
    if vpcs.is_empty() {
        return Ok(Vec::new());
    }

    let central = &config.vpc_flow_log_group.name;
    let role = delivery_role::lookup(clients.iam.as_ref(), &config.flow_logs).await?;

    let mut actions = delivery_role::plan(&role, &config.flow_logs, central);
    actions.extend(
        log_group::plan(
            clients.logs.as_ref(),
            &config.vpc_flow_log_group,
            with_subscription_filter,
        )
        .await?,
    );
    for vpc in vpcs {
        actions.extend(plan_vpc(vpc, role.role_arn(), config));
    }

    debug!(vpcs = vpcs.len(), actions = actions.len(), "Planned flow log enforcement");
    Ok(actions)
}

/// Keep the first compliant flow log and delete every other one delivering centrally
pub fn plan_vpc(
    vpc: &Vpc,
    expected_role_arn: Option<&str>,
    config: &ScannerConfig,
) -> Vec<ComplianceAction> {
    let central = &config.vpc_flow_log_group.name;
    let in_scope: Vec<&FlowLog> = vpc
        .flow_logs
        .iter()
        .filter(|fl| is_flow_log_in_scope(fl, central))
        .collect();

    let keeper = in_scope.iter().position(|fl| {
        is_flow_log_well_formed(fl, expected_role_arn, &config.flow_logs)
            && is_flow_log_centralised(fl, central)
    });

    let mut actions: Vec<ComplianceAction> = in_scope
        .iter()
        .enumerate()
        .filter(|(index, _)| Some(*index) != keeper)
        .map(|(_, fl)| ComplianceAction::delete_flow_log(&fl.id))
        .collect();

    if keeper.is_none() {
        debug!(vpc_id = %vpc.id, "No compliant flow log");
        actions.push(
            ActionKind::CreateFlowLog {
                vpc_id: vpc.id.clone(),
                log_group_name: central.clone(),
                role_name: config.flow_logs.delivery_role_name.clone(),
                traffic_type: config.flow_logs.traffic_type.clone(),
                log_format: config.flow_logs.log_format.clone(),
            }
            .into(),
        );
    }

    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{AccountState, Ec2Api, InMemoryAccount};
    use crate::compliance::actions::apply_all;
    use crate::test_utils::fixtures;
    use std::sync::Arc;

    fn expected_arn() -> String {
        fixtures::delivery_role_arn()
    }

    fn kinds(actions: &[ComplianceAction]) -> Vec<ActionKind> {
        actions.iter().map(|a| a.kind.clone()).collect()
    }

    fn delete(id: &str) -> ActionKind {
        ActionKind::DeleteFlowLog {
            flow_log_id: id.to_string(),
        }
    }

    fn clients_for(state: AccountState) -> (Arc<InMemoryAccount>, AwsClients) {
        let backend = Arc::new(InMemoryAccount::new(state));
        let clients = AwsClients::from_backend(backend.clone());
        (backend, clients)
    }

    #[test]
    fn test_compliant_vpc_needs_nothing() {
        let vpc = fixtures::vpc("vpc-1", vec![fixtures::flow_log("fl-1")]);
        assert!(plan_vpc(&vpc, Some(expected_arn().as_str()), &fixtures::config()).is_empty());
    }

    #[test]
    fn test_duplicate_deleted_and_unrelated_untouched() {
        let mut unrelated = fixtures::flow_log("fl-3");
        unrelated.log_group_name = Some("unrelated".to_string());
        let vpc = fixtures::vpc(
            "vpc-1",
            vec![fixtures::flow_log("fl-1"), fixtures::flow_log("fl-2"), unrelated],
        );

        let actions = plan_vpc(&vpc, Some(expected_arn().as_str()), &fixtures::config());
        assert_eq!(kinds(&actions), vec![delete("fl-2")]);
    }

    #[test]
    fn test_single_keeper_is_first_compliant() {
        let mut inactive = fixtures::flow_log("fl-1");
        inactive.status = "FAILED".to_string();
        let mut unnamed = fixtures::flow_log("fl-4");
        unnamed.log_group_name = None;
        let vpc = fixtures::vpc(
            "vpc-1",
            vec![inactive, fixtures::flow_log("fl-2"), fixtures::flow_log("fl-3"), unnamed],
        );

        let actions = plan_vpc(&vpc, Some(expected_arn().as_str()), &fixtures::config());
        assert_eq!(kinds(&actions), vec![delete("fl-1"), delete("fl-3"), delete("fl-4")]);
    }

    #[test]
    fn test_vpc_without_flow_logs_gets_one() {
        let vpc = fixtures::vpc("vpc-1", vec![]);
        let actions = plan_vpc(&vpc, Some(expected_arn().as_str()), &fixtures::config());

        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].description(), "Create VPC flow log");
        assert_eq!(
            actions[0].details(),
            serde_json::json!({ "vpc_id": "vpc-1", "log_group_name": "/vpc/flow_log" })
        );
    }

    #[test]
    fn test_non_compliant_flow_logs_replaced() {
        let mut wrong_format = fixtures::flow_log("fl-1");
        wrong_format.log_format = "${srcaddr} ${dstaddr}".to_string();
        let mut empty_group = fixtures::flow_log("fl-2");
        empty_group.log_group_name = Some(String::new());
        let vpc = fixtures::vpc("vpc-1", vec![wrong_format, empty_group]);

        let actions = plan_vpc(&vpc, Some(expected_arn().as_str()), &fixtures::config());
        assert_eq!(actions.len(), 3);
        assert_eq!(kinds(&actions[..2]), vec![delete("fl-1"), delete("fl-2")]);
        assert_eq!(actions[2].description(), "Create VPC flow log");
    }

    #[test]
    fn test_missing_role_makes_every_flow_log_stale() {
        let vpc = fixtures::vpc("vpc-1", vec![fixtures::flow_log("fl-1")]);
        let actions = plan_vpc(&vpc, None, &fixtures::config());
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].kind, delete("fl-1"));
    }

    #[tokio::test]
    async fn test_empty_vpc_list_does_no_lookups() {
        let (backend, clients) = clients_for(fixtures::compliant_state());
        backend.fail_operation("find_role");
        backend.fail_operation("find_log_group");

        let actions = plan(&clients, &fixtures::config(), &[], true).await.unwrap();
        assert!(actions.is_empty());
    }

    #[tokio::test]
    async fn test_compliant_account_needs_nothing() {
        let (backend, clients) = clients_for(fixtures::compliant_state());
        let vpcs = backend.list_vpcs().await.unwrap();

        let actions = plan(&clients, &fixtures::config(), &vpcs, true).await.unwrap();
        assert!(actions.is_empty());
    }

    #[tokio::test]
    async fn test_prerequisites_come_first() {
        let mut state = fixtures::compliant_state();
        state.roles.clear();
        state.log_groups.clear();
        state.vpcs = vec![fixtures::vpc("vpc-1", vec![]), fixtures::vpc("vpc-2", vec![])];
        let (backend, clients) = clients_for(state);
        let vpcs = backend.list_vpcs().await.unwrap();

        let actions = plan(&clients, &fixtures::config(), &vpcs, false).await.unwrap();
        let descriptions: Vec<&str> = actions.iter().map(ComplianceAction::description).collect();
        assert_eq!(
            descriptions,
            vec![
                "Delete delivery role for VPC flow log",
                "Create delivery role for VPC flow log",
                "Tag delivery role for VPC flow log",
                "Create central log group",
                "Put central log group retention policy",
                "Tag central log group",
                "Create VPC flow log",
                "Create VPC flow log",
            ]
        );
    }

    #[tokio::test]
    async fn test_plan_converges() {
        let mut inactive = fixtures::flow_log("fl-1");
        inactive.status = "FAILED".to_string();
        let mut unrelated = fixtures::flow_log("fl-2");
        unrelated.log_group_name = Some("unrelated".to_string());

        let mut state = fixtures::compliant_state();
        state.roles.clear();
        state.log_groups.clear();
        state.vpcs = vec![
            fixtures::vpc("vpc-1", vec![inactive, unrelated]),
            fixtures::vpc("vpc-2", vec![]),
        ];
        let (backend, clients) = clients_for(state);
        let config = fixtures::config();

        let vpcs = backend.list_vpcs().await.unwrap();
        let mut actions = plan(&clients, &config, &vpcs, true).await.unwrap();
        assert!(!actions.is_empty());
        apply_all(&mut actions, &clients).await.unwrap();

        let vpcs = backend.list_vpcs().await.unwrap();
        assert!(plan(&clients, &config, &vpcs, true).await.unwrap().is_empty());
        assert_eq!(vpcs[0].flow_logs.len(), 2);
        assert_eq!(vpcs[0].flow_logs[0].log_group_name.as_deref(), Some("unrelated"));
        assert_eq!(vpcs[1].flow_logs.len(), 1);
    }
}
