//! Per-column filtering restrictions
//!
//! A restriction narrows what an untrusted caller may filter on. It is
//! consulted when a leaf is compiled; a column without a restriction entry
//! is unrestricted.

use super::error::FilterError;
use super::operator::{Operator, OperatorKind};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::collections::BTreeMap;

/// Key of the wildcard marker object, `{"any": true}`
pub const WILDCARD_KEY: &str = "any";

/// Values an operator rule covers
///
/// On the wire a rule is either the wildcard marker `{"any": true}` or a bare
/// literal that must match exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "JsonValue", into = "JsonValue")]
pub enum Permitted {
    /// Any assigned value
    Any,
    /// Exactly this literal (same type and value)
    Exact(Value),
}

impl Permitted {
    pub fn covers(&self, value: &Value) -> bool {
        match self {
            Permitted::Any => true,
            Permitted::Exact(literal) => literal == value,
        }
    }
}

impl TryFrom<JsonValue> for Permitted {
    type Error = String;

    fn try_from(value: JsonValue) -> Result<Self, Self::Error> {
        if let JsonValue::Object(map) = &value {
            return match map.get(WILDCARD_KEY) {
                Some(JsonValue::Bool(true)) if map.len() == 1 => Ok(Permitted::Any),
                _ => Err(format!(
                    "expected a literal or {{\"{}\": true}}, got {}",
                    WILDCARD_KEY, value
                )),
            };
        }
        Value::from_json(&value)
            .map(Permitted::Exact)
            .ok_or_else(|| format!("unsupported literal {}", value))
    }
}

impl From<Permitted> for JsonValue {
    fn from(permitted: Permitted) -> Self {
        match permitted {
            Permitted::Any => json!({ WILDCARD_KEY: true }),
            Permitted::Exact(literal) => literal.to_json(),
        }
    }
}

/// How the rules of a restriction are read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestrictionPolicy {
    /// Only listed operators (and values) may be used
    #[default]
    Allow,
    /// Listed operators (and values) are forbidden, everything else is allowed
    Deny,
}

/// Restriction of a single column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRestriction {
    pub column: String,
    #[serde(default)]
    pub policy: RestrictionPolicy,
    pub rules: BTreeMap<OperatorKind, Permitted>,
}

impl ColumnRestriction {
    /// Allow-list restriction; starts out forbidding everything
    pub fn allow(column: impl Into<String>) -> Self {
        Self::with_policy(column, RestrictionPolicy::Allow)
    }

    /// Deny-list restriction; starts out forbidding nothing
    pub fn deny(column: impl Into<String>) -> Self {
        Self::with_policy(column, RestrictionPolicy::Deny)
    }

    pub fn with_policy(column: impl Into<String>, policy: RestrictionPolicy) -> Self {
        Self {
            column: column.into(),
            policy,
            rules: BTreeMap::new(),
        }
    }

    /// Add a rule for any value of the operator
    pub fn any(mut self, kind: OperatorKind) -> Self {
        self.rules.insert(kind, Permitted::Any);
        self
    }

    /// Add a rule for one exact value of the operator
    pub fn exact(mut self, kind: OperatorKind, value: impl Into<Value>) -> Self {
        self.rules.insert(kind, Permitted::Exact(value.into()));
        self
    }

    pub fn is_allowed(&self, operator: &Operator) -> bool {
        let listed = self
            .rules
            .get(&operator.kind())
            .map(|rule| rule.covers(operator.value()));
        match self.policy {
            RestrictionPolicy::Allow => listed.unwrap_or(false),
            RestrictionPolicy::Deny => !listed.unwrap_or(false),
        }
    }
}

/// Restrictions keyed by column name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RestrictionSet {
    columns: BTreeMap<String, ColumnRestriction>,
}

impl RestrictionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a restriction, replacing any earlier one for the same column
    pub fn insert(&mut self, restriction: ColumnRestriction) {
        self.columns.insert(restriction.column.clone(), restriction);
    }

    /// Builder form of [`RestrictionSet::insert`]
    pub fn with(mut self, restriction: ColumnRestriction) -> Self {
        self.insert(restriction);
        self
    }

    /// Load the `{ column: { operator: literal | {"any": true} } }` model
    pub fn from_model(policy: RestrictionPolicy, model: &JsonValue) -> Result<Self, FilterError> {
        let rules: BTreeMap<String, BTreeMap<String, Permitted>> =
            serde_json::from_value(model.clone())
                .map_err(|e| FilterError::BadFormat(format!("invalid restriction model: {}", e)))?;

        let mut set = Self::new();
        for (column, operators) in rules {
            let mut restriction = ColumnRestriction::with_policy(column, policy);
            for (symbol, permitted) in operators {
                let kind = OperatorKind::from_symbol(&symbol)
                    .ok_or_else(|| FilterError::NoSuchOperation(symbol.clone()))?;
                restriction.rules.insert(kind, permitted);
            }
            set.insert(restriction);
        }
        Ok(set)
    }

    pub fn get(&self, column: &str) -> Option<&ColumnRestriction> {
        self.columns.get(column)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn is_allowed(&self, column: &str, operator: &Operator) -> bool {
        self.columns
            .get(column)
            .map_or(true, |restriction| restriction.is_allowed(operator))
    }

    /// Fail with `FiltrationNotAllowed` if the operator is not allowed
    pub fn check(&self, column: &str, operator: &Operator) -> Result<(), FilterError> {
        if self.is_allowed(column, operator) {
            return Ok(());
        }
        tracing::warn!(
            column = %column,
            operator = %operator.symbol(),
            "Filtering rejected by restriction"
        );
        Err(FilterError::FiltrationNotAllowed {
            column: column.to_string(),
            operator: operator.symbol().to_string(),
        })
    }
}
