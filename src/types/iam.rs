//! IAM roles, policies and policy documents
//!
//! Policy documents keep the AWS JSON shape (`Version`, `Statement`,
//! `Effect`, `Action`, `Resource`, `Principal`) so they round-trip through
//! the IAM API unchanged.

use serde::{Deserialize, Serialize};

use super::Tag;

pub const EFFECT_ALLOW: &str = "Allow";

/// IAM role with its attached policies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    pub arn: String,
    /// Trust policy
    pub assume_policy: PolicyDocument,
    #[serde(default)]
    pub policies: Vec<Policy>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// Managed IAM policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub name: String,
    /// Assigned by IAM on creation
    #[serde(default)]
    pub arn: Option<String>,
    pub document: PolicyDocument,
}

/// A JSON value IAM accepts either as a scalar or as a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn as_slice(&self) -> &[T] {
        match self {
            OneOrMany::One(value) => std::slice::from_ref(value),
            OneOrMany::Many(values) => values,
        }
    }
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyDocument {
    #[serde(rename = "Version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(rename = "Statement", default)]
    pub statements: Vec<Statement>,
}

impl PolicyDocument {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self {
            version: Some("2012-10-17".to_string()),
            statements,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<String>,
    #[serde(default)]
    pub action: OneOrMany<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<OneOrMany<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal: Option<serde_json::Value>,
}

impl Statement {
    /// `Allow` statement over the given actions and resources
    pub fn allow(actions: &[String], resources: &[&str]) -> Self {
        Self {
            effect: Some(EFFECT_ALLOW.to_string()),
            action: OneOrMany::Many(actions.to_vec()),
            resource: Some(OneOrMany::Many(
                resources.iter().map(|r| r.to_string()).collect(),
            )),
            principal: None,
        }
    }

    pub fn actions(&self) -> &[String] {
        self.action.as_slice()
    }

    pub fn resources(&self) -> &[String] {
        self.resource.as_ref().map(OneOrMany::as_slice).unwrap_or_default()
    }

    pub fn is_allow(&self) -> bool {
        self.effect.as_deref() == Some(EFFECT_ALLOW)
    }
}
