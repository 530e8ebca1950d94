//! Compliance Engine
//!
//! Predicates judge observed state, planners turn drift into ordered
//! actions, and actions apply and report themselves.

pub mod actions;
pub mod delivery_role;
pub mod dns_logs;
pub mod flow_logs;
pub mod log_group;
pub mod predicates;

pub use actions::{apply_all, ActionKind, ActionReport, ComplianceAction, STATUS_APPLIED};
