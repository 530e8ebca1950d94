//! Compliance predicates
//!
//! Pure checks of one snapshot against the configured policy. An absent or
//! empty optional field never satisfies a check.

use crate::config::{FlowLogConfig, LogGroupConfig};
use crate::types::{FlowLog, LogGroup, QueryLogConfig, Role, Statement, Tag, FLOW_LOG_STATUS_ACTIVE};

/// Active, capturing all traffic in the canonical format, delivered by the expected role
pub fn is_flow_log_well_formed(
    flow_log: &FlowLog,
    expected_role_arn: Option<&str>,
    config: &FlowLogConfig,
) -> bool {
    let role_matches = match (flow_log.deliver_log_role_arn.as_deref(), expected_role_arn) {
        (Some(actual), Some(expected)) => actual == expected,
        _ => false,
    };

    flow_log.status == FLOW_LOG_STATUS_ACTIVE
        && flow_log.traffic_type == config.traffic_type
        && flow_log.log_format == config.log_format
        && role_matches
}

pub fn is_flow_log_centralised(flow_log: &FlowLog, central_group_name: &str) -> bool {
    flow_log.log_group_name.as_deref() == Some(central_group_name)
}

/// Flow logs delivering to some other log group belong to someone else
pub fn is_flow_log_in_scope(flow_log: &FlowLog, central_group_name: &str) -> bool {
    match flow_log.log_group_name.as_deref() {
        None | Some("") => true,
        Some(name) => name == central_group_name,
    }
}

/// The role can be assumed with the trust action and some attached policy
/// grants every required permission on the central log group
pub fn is_delivery_role_compliant(
    role: &Role,
    config: &FlowLogConfig,
    central_group_name: &str,
) -> bool {
    is_trust_compliant(role, &config.trust_action)
        && role.policies.iter().any(|policy| {
            config.required_permissions.iter().all(|permission| {
                policy
                    .document
                    .statements
                    .iter()
                    .any(|s| grants(s, permission, central_group_name))
            })
        })
}

fn is_trust_compliant(role: &Role, trust_action: &str) -> bool {
    role.assume_policy.statements.iter().any(|s| {
        (s.effect.is_none() || s.is_allow())
            && s.actions().iter().any(|a| action_matches(a, trust_action))
    })
}

fn grants(statement: &Statement, permission: &str, central_group_name: &str) -> bool {
    statement.is_allow()
        && statement.actions().iter().any(|a| action_matches(a, permission))
        && statement
            .resources()
            .iter()
            .any(|r| resource_matches(r, central_group_name))
}

/// IAM action names are case insensitive; `*` and `service:Prefix*` wildcards expand
fn action_matches(granted: &str, required: &str) -> bool {
    if granted == "*" || granted.eq_ignore_ascii_case(required) {
        return true;
    }

    match granted.strip_suffix('*') {
        Some(prefix) => required
            .to_ascii_lowercase()
            .starts_with(&prefix.to_ascii_lowercase()),
        None => false,
    }
}

fn resource_matches(resource: &str, central_group_name: &str) -> bool {
    if resource == "*" {
        return true;
    }

    match resource.split_once(":log-group:") {
        Some((_, rest)) => {
            rest == central_group_name
                || rest
                    .strip_prefix(central_group_name)
                    .is_some_and(|tail| tail.starts_with(':'))
        }
        None => false,
    }
}

/// Every required tag present with the same value
pub fn has_required_tags(actual: &[Tag], required: &[Tag]) -> bool {
    required.iter().all(|tag| actual.contains(tag))
}

/// Name matches and exactly one subscription filter ships to the configured destination
pub fn is_central_log_group(log_group: &LogGroup, config: &LogGroupConfig) -> bool {
    log_group.name == config.name && has_central_subscription(log_group, config)
}

fn has_central_subscription(log_group: &LogGroup, config: &LogGroupConfig) -> bool {
    log_group
        .subscription_filters
        .iter()
        .filter(|f| {
            f.filter_pattern == config.filter_pattern && f.destination_arn == config.destination_arn
        })
        .count()
        == 1
}

pub fn has_expected_retention(log_group: &LogGroup, config: &LogGroupConfig) -> bool {
    log_group.retention_days == Some(config.retention_days)
}

pub fn is_query_log_centralised(query_log: &QueryLogConfig, central_group_name: &str) -> bool {
    query_log.log_group_name() == Some(central_group_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures;
    use crate::types::{OneOrMany, PolicyDocument};

    fn central() -> String {
        fixtures::config().vpc_flow_log_group.name
    }

    fn flow_config() -> FlowLogConfig {
        fixtures::config().flow_logs
    }

    fn role_with_statement(statement: serde_json::Value) -> Role {
        let mut role = fixtures::role();
        role.policies[0].document = PolicyDocument {
            version: None,
            statements: vec![serde_json::from_value(statement).unwrap()],
        };
        role
    }

    #[test]
    fn test_well_formed_flow_log() {
        let arn = fixtures::delivery_role_arn();
        let config = flow_config();
        assert!(is_flow_log_well_formed(&fixtures::flow_log("fl-1"), Some(arn.as_str()), &config));

        let mut inactive = fixtures::flow_log("fl-1");
        inactive.status = "FAILED".to_string();
        assert!(!is_flow_log_well_formed(&inactive, Some(arn.as_str()), &config));

        let mut rejects_only = fixtures::flow_log("fl-1");
        rejects_only.traffic_type = "REJECT".to_string();
        assert!(!is_flow_log_well_formed(&rejects_only, Some(arn.as_str()), &config));

        let mut custom_format = fixtures::flow_log("fl-1");
        custom_format.log_format = "${srcaddr}".to_string();
        assert!(!is_flow_log_well_formed(&custom_format, Some(arn.as_str()), &config));
    }

    #[test]
    fn test_flow_log_role_must_match_exactly() {
        let config = flow_config();
        let flow_log = fixtures::flow_log("fl-1");

        assert!(!is_flow_log_well_formed(&flow_log, None, &config));
        assert!(!is_flow_log_well_formed(
            &flow_log,
            Some("arn:aws:iam::123456789012:role/other"),
            &config
        ));

        let mut no_role = fixtures::flow_log("fl-1");
        no_role.deliver_log_role_arn = None;
        let arn = fixtures::delivery_role_arn();
        assert!(!is_flow_log_well_formed(&no_role, Some(arn.as_str()), &config));
    }

    #[test]
    fn test_flow_log_scope() {
        let mut flow_log = fixtures::flow_log("fl-1");
        assert!(is_flow_log_centralised(&flow_log, &central()));
        assert!(is_flow_log_in_scope(&flow_log, &central()));

        flow_log.log_group_name = Some(String::new());
        assert!(!is_flow_log_centralised(&flow_log, &central()));
        assert!(is_flow_log_in_scope(&flow_log, &central()));

        flow_log.log_group_name = None;
        assert!(!is_flow_log_centralised(&flow_log, &central()));
        assert!(is_flow_log_in_scope(&flow_log, &central()));

        flow_log.log_group_name = Some("unrelated".to_string());
        assert!(!is_flow_log_centralised(&flow_log, &central()));
        assert!(!is_flow_log_in_scope(&flow_log, &central()));
    }

    #[test]
    fn test_delivery_role_compliant() {
        assert!(is_delivery_role_compliant(&fixtures::role(), &flow_config(), &central()));
    }

    #[test]
    fn test_trust_statement_without_effect_is_compliant() {
        let mut role = fixtures::role();
        role.assume_policy = serde_json::from_value(serde_json::json!({
            "Statement": [{"Action": "sts:AssumeRole"}]
        }))
        .unwrap();
        assert!(is_delivery_role_compliant(&role, &flow_config(), &central()));

        role.assume_policy.statements[0].effect = Some("Deny".to_string());
        assert!(!is_delivery_role_compliant(&role, &flow_config(), &central()));

        role.assume_policy.statements[0] = Statement {
            action: OneOrMany::One("sts:TagSession".to_string()),
            ..Default::default()
        };
        assert!(!is_delivery_role_compliant(&role, &flow_config(), &central()));
    }

    #[test]
    fn test_wildcard_permissions() {
        let role = role_with_statement(serde_json::json!({
            "Effect": "Allow", "Action": ["logs:*"], "Resource": "*"
        }));
        assert!(is_delivery_role_compliant(&role, &flow_config(), &central()));

        let role = role_with_statement(serde_json::json!({
            "Effect": "Allow", "Action": "*", "Resource": "*"
        }));
        assert!(is_delivery_role_compliant(&role, &flow_config(), &central()));

        let role = role_with_statement(serde_json::json!({
            "Effect": "Allow", "Action": ["logs:Put*", "logs:Create*", "logs:Describe*"], "Resource": "*"
        }));
        assert!(is_delivery_role_compliant(&role, &flow_config(), &central()));
    }

    #[test]
    fn test_insufficient_permissions() {
        let role = role_with_statement(serde_json::json!({
            "Effect": "Allow", "Action": ["logs:bla"], "Resource": "*"
        }));
        assert!(!is_delivery_role_compliant(&role, &flow_config(), &central()));

        let role = role_with_statement(serde_json::json!({
            "Effect": "Deny", "Action": ["logs:*"], "Resource": "*"
        }));
        assert!(!is_delivery_role_compliant(&role, &flow_config(), &central()));

        // No resource grants nothing
        let role = role_with_statement(serde_json::json!({
            "Effect": "Allow", "Action": ["logs:*"]
        }));
        assert!(!is_delivery_role_compliant(&role, &flow_config(), &central()));

        let mut role = fixtures::role();
        role.policies.clear();
        assert!(!is_delivery_role_compliant(&role, &flow_config(), &central()));
    }

    #[test]
    fn test_permissions_scoped_to_central_group() {
        let scoped = role_with_statement(serde_json::json!({
            "Effect": "Allow",
            "Action": ["logs:*"],
            "Resource": "arn:aws:logs:us-east-1:123456789012:log-group:/vpc/flow_log:*"
        }));
        assert!(is_delivery_role_compliant(&scoped, &flow_config(), &central()));

        let other_group = role_with_statement(serde_json::json!({
            "Effect": "Allow",
            "Action": ["logs:*"],
            "Resource": "arn:aws:logs:us-east-1:123456789012:log-group:/vpc/flow_log_other"
        }));
        assert!(!is_delivery_role_compliant(&other_group, &flow_config(), &central()));
    }

    #[test]
    fn test_required_tags() {
        let required = vec![Tag::new("src-repo", "aws-scanner")];
        assert!(has_required_tags(
            &[Tag::new("team", "platsec"), Tag::new("src-repo", "aws-scanner")],
            &required
        ));
        assert!(!has_required_tags(&[Tag::new("src-repo", "other")], &required));
        assert!(!has_required_tags(&[], &required));
        assert!(has_required_tags(&[], &[]));
    }

    #[test]
    fn test_central_log_group() {
        let config = fixtures::config().vpc_flow_log_group;
        let mut group = fixtures::log_group();
        assert!(is_central_log_group(&group, &config));
        assert!(has_expected_retention(&group, &config));

        group.retention_days = Some(21);
        assert!(!has_expected_retention(&group, &config));
        group.retention_days = None;
        assert!(!has_expected_retention(&group, &config));

        let duplicate = group.subscription_filters[0].clone();
        group.subscription_filters.push(duplicate);
        assert!(!is_central_log_group(&group, &config));

        group.subscription_filters.clear();
        assert!(!is_central_log_group(&group, &config));

        let mut renamed = fixtures::log_group();
        renamed.name = "/vpc/other".to_string();
        assert!(!is_central_log_group(&renamed, &config));
    }

    #[test]
    fn test_query_log_centralised() {
        let central = fixtures::config().dns_log_group.name;
        assert!(is_query_log_centralised(
            &fixtures::query_log("qlc-1", "Z1", &central),
            &central
        ));
        assert!(!is_query_log_centralised(
            &fixtures::query_log("qlc-2", "Z1", "/aws/route53/zone"),
            &central
        ));
    }
}
