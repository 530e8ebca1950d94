//! Route53 query log planner
//!
//! Every public hosted zone keeps exactly one query logging config
//! delivering to the central DNS log group. Configs pointing at other
//! groups are left alone, and private zones cannot log queries at all.

use tracing::debug;

use super::actions::ComplianceAction;
use super::log_group;
use super::predicates::is_query_log_centralised;
use crate::clients::AwsClients;
use crate::config::ScannerConfig;
use crate::error::Result;
use crate::types::HostedZone;

pub async fn plan(
    clients: &AwsClients,
    config: &ScannerConfig,
    zones: &[HostedZone],
    with_subscription_filter: bool,
) -> Result<Vec<ComplianceAction>> {
    let public: Vec<&HostedZone> = zones.iter().filter(|z| !z.private_zone).collect();
    if public.is_empty() {
        return Ok(Vec::new());
    }

    let mut actions = log_group::plan(
        clients.logs.as_ref(),
        &config.dns_log_group,
        with_subscription_filter,
    )
    .await?;
    for zone in public {
        actions.extend(plan_zone(zone, &config.dns_log_group.name));
    }

    debug!(zones = zones.len(), actions = actions.len(), "Planned DNS query log enforcement");
    Ok(actions)
}

pub fn plan_zone(zone: &HostedZone, central_group_name: &str) -> Vec<ComplianceAction> {
    let mut centralised = zone
        .query_logs
        .iter()
        .filter(|config| is_query_log_centralised(config, central_group_name));

    match centralised.next() {
        Some(_) => centralised
            .map(|duplicate| ComplianceAction::delete_query_log_config(&duplicate.id))
            .collect(),
        None => {
            debug!(zone_id = %zone.id, "No central query logging config");
            vec![ComplianceAction::create_query_log_config(&zone.id, central_group_name)]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::InMemoryAccount;
    use crate::compliance::actions::ActionKind;
    use crate::test_utils::fixtures;
    use std::sync::Arc;

    const CENTRAL: &str = "/vpc/central_dns_log";

    fn zone_with(query_logs: Vec<crate::types::QueryLogConfig>) -> HostedZone {
        let mut zone = fixtures::hosted_zone("ZPUBLIC", false);
        zone.query_logs = query_logs;
        zone
    }

    #[test]
    fn test_centralised_zone_needs_nothing() {
        let zone = zone_with(vec![fixtures::query_log("qlc-1", "ZPUBLIC", CENTRAL)]);
        assert!(plan_zone(&zone, CENTRAL).is_empty());
    }

    #[test]
    fn test_duplicates_deleted_and_unrelated_untouched() {
        let zone = zone_with(vec![
            fixtures::query_log("qlc-0", "ZPUBLIC", "/aws/route53/example.com"),
            fixtures::query_log("qlc-1", "ZPUBLIC", CENTRAL),
            fixtures::query_log("qlc-2", "ZPUBLIC", CENTRAL),
        ]);

        let actions = plan_zone(&zone, CENTRAL);
        assert_eq!(actions.len(), 1);
        assert_eq!(
            actions[0].kind,
            ActionKind::DeleteQueryLogConfig {
                query_log_config_id: "qlc-2".to_string()
            }
        );
    }

    #[test]
    fn test_zone_without_central_config_gets_one() {
        let zone = zone_with(vec![fixtures::query_log("qlc-0", "ZPUBLIC", "/aws/route53/example.com")]);

        let actions = plan_zone(&zone, CENTRAL);
        assert_eq!(
            actions[0].kind,
            ActionKind::CreateQueryLogConfig {
                zone_id: "ZPUBLIC".to_string(),
                log_group_name: CENTRAL.to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_private_zones_skipped() {
        let backend = Arc::new(InMemoryAccount::new(fixtures::compliant_state()));
        backend.fail_operation("find_log_group");
        let clients = AwsClients::from_backend(backend);

        let zones = vec![fixtures::hosted_zone("ZPRIVATE", true)];
        let actions = plan(&clients, &fixtures::config(), &zones, false).await.unwrap();
        assert!(actions.is_empty());
    }

    #[tokio::test]
    async fn test_log_group_actions_come_first() {
        let mut state = fixtures::compliant_state();
        state.log_groups.clear();
        let clients = AwsClients::from_backend(Arc::new(InMemoryAccount::new(state)));

        let zones = vec![zone_with(vec![]), fixtures::hosted_zone("ZPRIVATE", true)];
        let actions = plan(&clients, &fixtures::config(), &zones, false).await.unwrap();
        let descriptions: Vec<&str> = actions.iter().map(ComplianceAction::description).collect();
        assert_eq!(
            descriptions,
            vec![
                "Create central log group",
                "Put central log group retention policy",
                "Tag central log group",
                "Create Route53 query logging config",
            ]
        );
    }
}
