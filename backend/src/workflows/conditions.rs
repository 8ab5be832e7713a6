// Workflow Conditions - Predicates that gate workflow execution

use serde::{Deserialize, Serialize};

/// Comparison operators available in workflow conditions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    // Equality
    Equals,
    NotEquals,

    // String operations (case-insensitive)
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    Matches,

    // Numeric comparisons
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,

    // Membership
    In,
    NotIn,

    // Presence
    IsNull,
    IsNotNull,

    // Boolean
    IsTrue,
    IsFalse,
}

/// A single predicate evaluated against the event context.
///
/// `field` is a dot-separated path into the context (e.g.
/// `customer.status` or `days_overdue`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Condition {
    pub field: String,
    pub operator: ConditionOperator,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl Condition {
    pub fn new(field: &str, operator: ConditionOperator, value: serde_json::Value) -> Self {
        Self {
            field: field.to_string(),
            operator,
            value,
        }
    }

    pub fn equals(field: &str, value: serde_json::Value) -> Self {
        Self::new(field, ConditionOperator::Equals, value)
    }

    pub fn not_equals(field: &str, value: serde_json::Value) -> Self {
        Self::new(field, ConditionOperator::NotEquals, value)
    }

    pub fn contains(field: &str, value: &str) -> Self {
        Self::new(field, ConditionOperator::Contains, serde_json::json!(value))
    }

    pub fn greater_than(field: &str, value: f64) -> Self {
        Self::new(field, ConditionOperator::GreaterThan, serde_json::json!(value))
    }

    pub fn less_than(field: &str, value: f64) -> Self {
        Self::new(field, ConditionOperator::LessThan, serde_json::json!(value))
    }

    pub fn in_list(field: &str, values: Vec<serde_json::Value>) -> Self {
        Self::new(field, ConditionOperator::In, serde_json::Value::Array(values))
    }

    pub fn is_null(field: &str) -> Self {
        Self::new(field, ConditionOperator::IsNull, serde_json::Value::Null)
    }

    pub fn is_not_null(field: &str) -> Self {
        Self::new(field, ConditionOperator::IsNotNull, serde_json::Value::Null)
    }

    pub fn is_true(field: &str) -> Self {
        Self::new(field, ConditionOperator::IsTrue, serde_json::Value::Null)
    }
}

/// Evaluate a conjunction of conditions against an event context.
/// The empty list is vacuously true.
pub fn evaluate_all(conditions: &[Condition], context: &serde_json::Value) -> bool {
    conditions.iter().all(|c| evaluate(c, context))
}

/// Evaluate one condition against an event context. A missing field fails
/// positive operators and satisfies negative ones.
pub fn evaluate(condition: &Condition, context: &serde_json::Value) -> bool {
    let field_value = lookup_path(context, &condition.field);

    match condition.operator {
        ConditionOperator::Equals => field_value
            .map(|v| json_eq(v, &condition.value))
            .unwrap_or(false),
        ConditionOperator::NotEquals => field_value
            .map(|v| !json_eq(v, &condition.value))
            .unwrap_or(true),
        ConditionOperator::Contains => {
            str_pair(field_value, &condition.value)
                .map(|(s, pattern)| s.to_lowercase().contains(&pattern.to_lowercase()))
                .unwrap_or(false)
        }
        ConditionOperator::NotContains => {
            str_pair(field_value, &condition.value)
                .map(|(s, pattern)| !s.to_lowercase().contains(&pattern.to_lowercase()))
                .unwrap_or(true)
        }
        ConditionOperator::StartsWith => {
            str_pair(field_value, &condition.value)
                .map(|(s, pattern)| s.to_lowercase().starts_with(&pattern.to_lowercase()))
                .unwrap_or(false)
        }
        ConditionOperator::EndsWith => {
            str_pair(field_value, &condition.value)
                .map(|(s, pattern)| s.to_lowercase().ends_with(&pattern.to_lowercase()))
                .unwrap_or(false)
        }
        ConditionOperator::Matches => {
            str_pair(field_value, &condition.value)
                .and_then(|(s, pattern)| regex::Regex::new(pattern).ok().map(|re| re.is_match(s)))
                .unwrap_or(false)
        }
        ConditionOperator::GreaterThan => {
            num_pair(field_value, &condition.value).map(|(v, c)| v > c).unwrap_or(false)
        }
        ConditionOperator::GreaterThanOrEqual => {
            num_pair(field_value, &condition.value).map(|(v, c)| v >= c).unwrap_or(false)
        }
        ConditionOperator::LessThan => {
            num_pair(field_value, &condition.value).map(|(v, c)| v < c).unwrap_or(false)
        }
        ConditionOperator::LessThanOrEqual => {
            num_pair(field_value, &condition.value).map(|(v, c)| v <= c).unwrap_or(false)
        }
        ConditionOperator::In => match (field_value, condition.value.as_array()) {
            (Some(v), Some(arr)) => arr.iter().any(|item| json_eq(v, item)),
            _ => false,
        },
        ConditionOperator::NotIn => match (field_value, condition.value.as_array()) {
            (Some(v), Some(arr)) => !arr.iter().any(|item| json_eq(v, item)),
            _ => true,
        },
        ConditionOperator::IsNull => {
            field_value.is_none() || field_value == Some(&serde_json::Value::Null)
        }
        ConditionOperator::IsNotNull => {
            field_value.is_some() && field_value != Some(&serde_json::Value::Null)
        }
        ConditionOperator::IsTrue => field_value.and_then(|v| v.as_bool()).unwrap_or(false),
        ConditionOperator::IsFalse => field_value
            .and_then(|v| v.as_bool())
            .map(|b| !b)
            .unwrap_or(false),
    }
}

/// Resolve a dot-separated field path against a context value.
fn lookup_path<'a>(context: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    let mut current = context;
    for part in path.split('.') {
        current = current.get(part)?;
    }
    Some(current)
}

/// Equality with case-insensitive string comparison, matching the string
/// operators above. Non-string values compare structurally.
fn json_eq(a: &serde_json::Value, b: &serde_json::Value) -> bool {
    match (a.as_str(), b.as_str()) {
        (Some(x), Some(y)) => x.eq_ignore_ascii_case(y),
        _ => a == b,
    }
}

fn str_pair<'a>(
    field_value: Option<&'a serde_json::Value>,
    expected: &'a serde_json::Value,
) -> Option<(&'a str, &'a str)> {
    Some((field_value?.as_str()?, expected.as_str()?))
}

fn num_pair(
    field_value: Option<&serde_json::Value>,
    expected: &serde_json::Value,
) -> Option<(f64, f64)> {
    Some((field_value?.as_f64()?, expected.as_f64()?))
}
