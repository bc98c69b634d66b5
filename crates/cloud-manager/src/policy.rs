//! IAM policy documents: parsing, validation and structural comparison.
//!
//! Statements, actions, resources, conditions and principals are compared
//! as unordered sets. Two collections match when they have the same
//! cardinality and every element of one has an equal element in the other.

use serde_json::{json, Value};

use crate::error::CloudError;

pub const POLICY_VERSION: &str = "2012-10-17";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    pub version: String,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub effect: Effect,
    pub principals: Vec<Principal>,
    pub actions: Vec<String>,
    pub resources: Vec<String>,
    pub conditions: Vec<Condition>,
}

/// `provider` is the principal map key (`Service`, `AWS`, `Federated`);
/// the anonymous `"*"` principal uses `*` for both fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub provider: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    /// Comparison type, e.g. `StringEquals`.
    pub condition_type: String,
    pub key: String,
    pub values: Vec<String>,
}

impl Policy {
    pub fn from_json(json: &str) -> Result<Self, CloudError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    /// Parse a document as returned by IAM, which percent-encodes policy JSON.
    pub fn from_remote(encoded: &str) -> Result<Self, CloudError> {
        let decoded = percent_encoding::percent_decode_str(encoded)
            .decode_utf8()
            .map_err(|e| CloudError::Config(format!("policy is not valid UTF-8: {e}")))?;
        Self::from_json(&decoded)
    }

    pub fn from_value(value: &Value) -> Result<Self, CloudError> {
        let obj = value
            .as_object()
            .ok_or_else(|| CloudError::Config("policy document must be a JSON object".into()))?;

        let version = obj
            .get("Version")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let statements = match obj.get("Statement") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(parse_statement)
                .collect::<Result<_, _>>()?,
            Some(single) => vec![parse_statement(single)?],
        };

        Ok(Self {
            version,
            statements,
        })
    }
}

fn parse_statement(value: &Value) -> Result<Statement, CloudError> {
    let obj = value
        .as_object()
        .ok_or_else(|| CloudError::Config("statement must be a JSON object".into()))?;

    let effect = match obj.get("Effect").and_then(Value::as_str) {
        Some("Allow") => Effect::Allow,
        Some("Deny") => Effect::Deny,
        other => {
            return Err(CloudError::Config(format!(
                "statement effect must be Allow or Deny, got {other:?}"
            )));
        }
    };

    let principals = match obj.get("Principal") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(s)) if s == "*" => vec![Principal {
            provider: "*".into(),
            id: "*".into(),
        }],
        Some(Value::Object(map)) => map
            .iter()
            .flat_map(|(provider, ids)| {
                string_list(Some(ids)).into_iter().map(move |id| Principal {
                    provider: provider.clone(),
                    id,
                })
            })
            .collect(),
        Some(other) => {
            return Err(CloudError::Config(format!("unsupported principal: {other}")));
        }
    };

    let conditions = match obj.get("Condition") {
        Some(Value::Object(types)) => types
            .iter()
            .flat_map(|(condition_type, entries)| {
                entries
                    .as_object()
                    .into_iter()
                    .flatten()
                    .map(move |(key, values)| Condition {
                        condition_type: condition_type.clone(),
                        key: key.clone(),
                        values: string_list(Some(values)),
                    })
            })
            .collect(),
        _ => Vec::new(),
    };

    Ok(Statement {
        effect,
        principals,
        actions: string_list(obj.get("Action")),
        resources: string_list(obj.get("Resource")),
        conditions,
    })
}

/// IAM accepts either a single string or an array of strings.
fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(scalar).collect(),
        Some(value) => scalar(value).into_iter().collect(),
        None => Vec::new(),
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Pre-submission check for trust documents. Failures are configuration
/// errors, not retryable conditions.
pub fn validate(json: &str) -> Result<(), CloudError> {
    let policy = Policy::from_json(json)?;
    if policy.version.is_empty() {
        return Err(CloudError::Config("version is required".into()));
    }
    if policy.statements.is_empty() {
        return Err(CloudError::Config("statement is required".into()));
    }
    for statement in &policy.statements {
        if statement.principals.is_empty() {
            return Err(CloudError::Config("principal is required".into()));
        }
        if statement.actions.is_empty() {
            return Err(CloudError::Config("action is required".into()));
        }
    }
    Ok(())
}

pub fn policy_changed(local: &Policy, remote: &Policy) -> bool {
    if local.version != remote.version {
        return true;
    }
    !same_set(&local.statements, &remote.statements, statement_equals)
}

fn statement_equals(a: &Statement, b: &Statement) -> bool {
    same_set(&a.actions, &b.actions, |x, y| x == y)
        && a.effect == b.effect
        && same_set(&a.resources, &b.resources, |x, y| x == y)
        && same_set(&a.conditions, &b.conditions, condition_equals)
        && same_set(&a.principals, &b.principals, |x, y| {
            x.id == y.id && x.provider == y.provider
        })
}

fn condition_equals(a: &Condition, b: &Condition) -> bool {
    a.key == b.key
        && a.condition_type == b.condition_type
        && same_set(&a.values, &b.values, |x, y| x == y)
}

fn same_set<T>(a: &[T], b: &[T], eq: impl Fn(&T, &T) -> bool) -> bool {
    a.len() == b.len() && a.iter().all(|x| b.iter().any(|y| eq(x, y)))
}

/// Managed policy attachments drift when counts differ or a local ARN is
/// missing remotely. Extra remote ARNs alone are not reported.
pub fn managed_policy_changed(local: &[String], remote: &[String]) -> bool {
    if local.len() != remote.len() {
        return true;
    }
    local.iter().any(|arn| !remote.contains(arn))
}

/// Trust document letting EC2 instances in this partition assume a role.
pub fn assume_ec2_role_document(region_domain: &str) -> String {
    json!({
        "Version": POLICY_VERSION,
        "Statement": [{
            "Effect": "Allow",
            "Principal": { "Service": format!("ec2.{region_domain}") },
            "Action": "sts:AssumeRole"
        }]
    })
    .to_string()
}
