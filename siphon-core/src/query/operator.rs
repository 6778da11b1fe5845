//! Operator registry
//!
//! Maps an operator symbol to a typed operator instance. Only the value's
//! shape is checked here; coercing the value to the column's type is left to
//! the backend renderer.

use super::error::FilterError;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::fmt;

/// Supported comparison kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorKind {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    In,
    NotIn,
}

impl OperatorKind {
    /// Canonical symbol
    pub fn symbol(self) -> &'static str {
        match self {
            OperatorKind::Eq => "eq",
            OperatorKind::Ne => "ne",
            OperatorKind::Gt => "gt",
            OperatorKind::Ge => "ge",
            OperatorKind::Lt => "lt",
            OperatorKind::Le => "le",
            OperatorKind::In => "in",
            OperatorKind::NotIn => "not_in",
        }
    }

    /// Look up a symbol, accepting the legacy `in_`/`nin` spellings
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "eq" => Some(OperatorKind::Eq),
            "ne" => Some(OperatorKind::Ne),
            "gt" => Some(OperatorKind::Gt),
            "ge" => Some(OperatorKind::Ge),
            "lt" => Some(OperatorKind::Lt),
            "le" => Some(OperatorKind::Le),
            "in" | "in_" => Some(OperatorKind::In),
            "not_in" | "nin" => Some(OperatorKind::NotIn),
            _ => None,
        }
    }

    pub fn is_operator(symbol: &str) -> bool {
        Self::from_symbol(symbol).is_some()
    }

    /// Whether the operator takes a sequence of values
    pub fn expects_sequence(self) -> bool {
        matches!(self, OperatorKind::In | OperatorKind::NotIn)
    }
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Operator bound to its assigned value
#[derive(Debug, Clone, PartialEq)]
pub struct Operator {
    kind: OperatorKind,
    value: Value,
}

impl Operator {
    /// Construct an operator from its symbol
    pub fn new(symbol: &str, value: impl Into<Value>) -> Result<Self, FilterError> {
        let kind = OperatorKind::from_symbol(symbol)
            .ok_or_else(|| FilterError::NoSuchOperation(symbol.to_string()))?;
        Self::from_kind(kind, value)
    }

    /// Construct an operator of a known kind
    pub fn from_kind(kind: OperatorKind, value: impl Into<Value>) -> Result<Self, FilterError> {
        let value = value.into();
        if kind.expects_sequence() && !value.is_array() {
            return Err(FilterError::InvalidValueType(format!(
                "operator '{}' requires a sequence of values, got {}",
                kind, value
            )));
        }
        Ok(Self { kind, value })
    }

    pub fn kind(&self) -> OperatorKind {
        self.kind
    }

    pub fn symbol(&self) -> &'static str {
        self.kind.symbol()
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// `{symbol: value}`
    pub fn dump(&self) -> JsonMap<String, JsonValue> {
        let mut map = JsonMap::new();
        map.insert(self.symbol().to_string(), self.value.to_json());
        map
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.value)
    }
}
