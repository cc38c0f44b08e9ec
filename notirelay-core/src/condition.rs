use crate::property::{format_number, parse_date, DecodedValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "is_empty")]
    IsEmpty,
    #[serde(rename = "is_not_empty")]
    IsNotEmpty,
}

/// One comparison against a page property. Conditions of a template are AND-ed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Property id or property name.
    #[serde(alias = "property_id")]
    pub property: String,
    pub operator: Operator,
    #[serde(default)]
    pub value: Value,
}

pub fn evaluate(value: &DecodedValue, operator: Operator, expected: &Value) -> bool {
    match operator {
        Operator::Eq => equals(value, expected),
        Operator::Ne => !equals(value, expected),
        Operator::In => match expected {
            Value::Array(candidates) => contained_in(value, candidates),
            _ => {
                debug!(condition.value = %expected, "'in' requires a list value");
                false
            }
        },
        Operator::Lt => compare(value, expected) == Some(Ordering::Less),
        Operator::Gt => compare(value, expected) == Some(Ordering::Greater),
        Operator::IsEmpty => value.is_empty(),
        Operator::IsNotEmpty => !value.is_empty(),
    }
}

/// Outcome of a condition whose property is missing from the page altogether.
pub fn evaluate_absent(operator: Operator, expected: &Value) -> bool {
    match operator {
        Operator::IsEmpty => true,
        Operator::Ne => is_blank(expected),
        _ => false,
    }
}

/// String form of a condition value, comparable with [`DecodedValue`]'s `Display`.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(value) => value.to_string(),
        Value::Number(number) => match number.as_i64() {
            Some(integer) => integer.to_string(),
            None => number.as_f64().map(format_number).unwrap_or_default(),
        },
        Value::String(text) => text.clone(),
        Value::Array(items) => items.iter().map(stringify).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}

fn equals(value: &DecodedValue, expected: &Value) -> bool {
    let expected = stringify(expected);
    match value {
        DecodedValue::List(items) => items.contains(&expected),
        scalar => scalar.to_string() == expected,
    }
}

fn contained_in(value: &DecodedValue, candidates: &[Value]) -> bool {
    let candidates: Vec<String> = candidates.iter().map(stringify).collect();
    match value {
        DecodedValue::Empty => false,
        DecodedValue::List(items) => items.iter().any(|item| candidates.contains(item)),
        scalar => candidates.contains(&scalar.to_string()),
    }
}

fn compare(value: &DecodedValue, expected: &Value) -> Option<Ordering> {
    match (value, expected) {
        (DecodedValue::Number(actual), Value::Number(expected)) => {
            actual.partial_cmp(&expected.as_f64()?)
        }
        (DecodedValue::Date(actual), Value::String(expected)) => {
            Some(actual.start_instant()?.cmp(&parse_date(expected)?))
        }
        _ => None,
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        _ => false,
    }
}
