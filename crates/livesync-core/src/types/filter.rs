//! Record filters used both as local inclusion predicates and as
//! server-side snapshot/feed filters.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::record::Record;

/// Filter comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    /// Exact equality.
    Eq,
    /// Not equal.
    Ne,
    /// Greater than (numeric).
    Gt,
    /// Greater than or equal (numeric).
    Gte,
    /// Less than (numeric).
    Lt,
    /// Less than or equal (numeric).
    Lte,
    /// List membership.
    In,
    /// Field is absent or null.
    IsNull,
    /// Field is present and not null.
    IsNotNull,
}

/// A dynamic filter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// A string value.
    String(String),
    /// An integer value.
    Integer(i64),
    /// A floating-point value.
    Float(f64),
    /// A boolean value.
    Boolean(bool),
    /// A list of string values (for `In`).
    StringList(Vec<String>),
    /// Null / no value (for `IsNull`, `IsNotNull`).
    Null,
}

impl FilterValue {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    fn equals(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::String(expected), Value::String(actual)) => expected == actual,
            (Self::Integer(expected), Value::Number(actual)) => actual.as_i64() == Some(*expected),
            (Self::Float(expected), Value::Number(actual)) => actual.as_f64() == Some(*expected),
            (Self::Boolean(expected), Value::Bool(actual)) => expected == actual,
            (Self::Null, Value::Null) => true,
            _ => false,
        }
    }
}

/// A single filter condition on a named field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterField {
    /// The field name to filter on.
    pub field: String,
    /// The comparison operator.
    pub op: FilterOp,
    /// The value to compare against.
    pub value: FilterValue,
}

impl FilterField {
    /// Create a new filter field.
    pub fn new(field: impl Into<String>, op: FilterOp, value: FilterValue) -> Self {
        Self {
            field: field.into(),
            op,
            value,
        }
    }

    /// Shorthand for a string equality filter.
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, FilterOp::Eq, FilterValue::String(value.into()))
    }

    /// Shorthand for a membership filter.
    pub fn is_in(field: impl Into<String>, values: Vec<String>) -> Self {
        Self::new(field, FilterOp::In, FilterValue::StringList(values))
    }

    /// Evaluate the condition against a record.
    pub fn matches(&self, record: &Record) -> bool {
        let actual = record.get(&self.field);
        match self.op {
            FilterOp::IsNull => matches!(actual, None | Some(Value::Null)),
            FilterOp::IsNotNull => !matches!(actual, None | Some(Value::Null)),
            FilterOp::Eq => actual.is_some_and(|v| self.value.equals(v)),
            FilterOp::Ne => !actual.is_some_and(|v| self.value.equals(v)),
            FilterOp::In => match (&self.value, actual) {
                (FilterValue::StringList(values), Some(Value::String(s))) => values.contains(s),
                _ => false,
            },
            FilterOp::Gt | FilterOp::Gte | FilterOp::Lt | FilterOp::Lte => {
                let (Some(expected), Some(actual)) =
                    (self.value.as_f64(), actual.and_then(Value::as_f64))
                else {
                    return false;
                };
                match self.op {
                    FilterOp::Gt => actual > expected,
                    FilterOp::Gte => actual >= expected,
                    FilterOp::Lt => actual < expected,
                    _ => actual <= expected,
                }
            }
        }
    }
}

/// Conjunction of conditions. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordFilter {
    /// All conditions must hold.
    pub conditions: Vec<FilterField>,
}

impl RecordFilter {
    /// Filter with a single condition.
    pub fn new(condition: FilterField) -> Self {
        Self {
            conditions: vec![condition],
        }
    }

    /// Shorthand for `field == value`.
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(FilterField::eq(field, value))
    }

    /// Add another condition.
    pub fn and(mut self, condition: FilterField) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Evaluate all conditions against a record.
    pub fn matches(&self, record: &Record) -> bool {
        self.conditions.iter().all(|c| c.matches(record))
    }
}
