//! Scalar and sequence values carried by filter operators
//!
//! Values arrive from the wire as JSON scalars (or lists of them for
//! `in`/`not_in`) and are passed through untouched to the backend renderer.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// Value assigned to an operator or used as a restriction literal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit integer
    Int(i64),
    /// Unsigned integer above `i64::MAX`
    UInt(u64),
    /// 64-bit floating point
    Float(f64),
    /// String value
    String(String),
    /// Sequence of values (only produced for list-valued operators)
    Array(Vec<Value>),
}

impl Value {
    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if value is a sequence
    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Get as i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as string reference
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Get as sequence reference
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(values) => Some(values),
            _ => None,
        }
    }

    /// Convert a JSON value, returning `None` for JSON objects
    pub fn from_json(json: &JsonValue) -> Option<Self> {
        match json {
            JsonValue::Null => Some(Value::Null),
            JsonValue::Bool(b) => Some(Value::Bool(*b)),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Value::Int(i))
                } else if let Some(u) = n.as_u64() {
                    Some(Value::UInt(u))
                } else {
                    n.as_f64().map(Value::Float)
                }
            }
            JsonValue::String(s) => Some(Value::String(s.clone())),
            JsonValue::Array(items) => items
                .iter()
                .map(Self::from_json)
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
            JsonValue::Object(_) => None,
        }
    }

    /// Convert to a JSON value
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Int(i) => JsonValue::from(*i),
            Value::UInt(u) => JsonValue::from(*u),
            // Non-finite floats have no JSON form
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Array(values) => JsonValue::Array(values.iter().map(Value::to_json).collect()),
        }
    }
}

/// Canonical string form, used when a path selector compares a literal
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::UInt(u) => write!(f, "{}", u),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "{}", s),
            Value::Array(values) => {
                write!(f, "[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        i64::try_from(u).map_or(Value::UInt(u), Value::Int)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Value::Array(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_scalars() {
        assert_eq!(Value::from_json(&json!(20)), Some(Value::Int(20)));
        assert_eq!(Value::from_json(&json!(2.5)), Some(Value::Float(2.5)));
        assert_eq!(Value::from_json(&json!("John")), Some(Value::from("John")));
        assert_eq!(Value::from_json(&json!(null)), Some(Value::Null));
        assert_eq!(Value::from_json(&json!({"a": 1})), None);
    }

    #[test]
    fn test_large_integers_keep_precision() {
        let big = u64::MAX;
        assert_eq!(Value::from_json(&json!(big)), Some(Value::UInt(big)));
        assert_eq!(Value::UInt(big).to_json(), json!(big));
        assert_eq!(Value::UInt(big).to_string(), "18446744073709551615");
        assert_eq!(Value::from(7u64), Value::Int(7));

        let value: Value = serde_json::from_str("18446744073709551615").unwrap();
        assert_eq!(value, Value::UInt(big));
    }

    #[test]
    fn test_equality_is_type_sensitive() {
        assert_ne!(Value::Int(20), Value::Float(20.0));
        assert_ne!(Value::Int(20), Value::from("20"));
        assert_eq!(Value::Int(20), Value::from(20));
    }

    #[test]
    fn test_canonical_string() {
        assert_eq!(Value::Int(20).to_string(), "20");
        assert_eq!(Value::from("John").to_string(), "John");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(
            Value::Array(vec![Value::Int(1), Value::from("a")]).to_string(),
            "[1, a]"
        );
    }

    #[test]
    fn test_untagged_serde() {
        let value: Value = serde_json::from_str("[1, \"x\", null]").unwrap();
        assert_eq!(
            value,
            Value::Array(vec![Value::Int(1), Value::from("x"), Value::Null])
        );
        assert_eq!(serde_json::to_string(&Value::Int(3)).unwrap(), "3");
    }
}
