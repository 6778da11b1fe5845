//! Query modifiers: limit, offset and ordering
//!
//! Modifiers are collected alongside the predicate tree but never take part
//! in it. Order specs accept four equivalent notations:
//! `col.asc`/`col.desc`, `+col`/`-col` and `asc(col)`/`desc(col)`.

use super::backend::Backend;
use super::error::FilterError;
use crate::schema::ColumnRef;
use regex::Regex;
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::sync::OnceLock;

/// Keyword keys recognized in the input tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Limit,
    Offset,
    OrderBy,
}

impl Modifier {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "limit" => Some(Modifier::Limit),
            "offset" => Some(Modifier::Offset),
            "order_by" => Some(Modifier::OrderBy),
            _ => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Modifier::Limit => "limit",
            Modifier::Offset => "offset",
            Modifier::OrderBy => "order_by",
        }
    }
}

/// Ordering on one column
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy<C> {
    pub column: C,
    pub ascending: bool,
}

impl<C: ColumnRef> OrderBy<C> {
    pub fn asc(column: C) -> Self {
        Self { column, ascending: true }
    }

    pub fn desc(column: C) -> Self {
        Self { column, ascending: false }
    }

    /// Sign notation used when dumping (`+col` / `-col`)
    pub fn to_spec(&self) -> String {
        format!("{}{}", if self.ascending { '+' } else { '-' }, self.column.reference())
    }
}

/// Limit, offset and ordering collected from the input tree
#[derive(Debug, Clone, PartialEq)]
pub struct QueryModifiers<C> {
    limit: Option<u64>,
    offset: Option<u64>,
    order_by: Vec<OrderBy<C>>,
}

impl<C> Default for QueryModifiers<C> {
    fn default() -> Self {
        Self {
            limit: None,
            offset: None,
            order_by: Vec::new(),
        }
    }
}

impl<C: ColumnRef> QueryModifiers<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    pub fn order_by(&self) -> &[OrderBy<C>] {
        &self.order_by
    }

    pub fn set_limit(&mut self, limit: u64) {
        self.limit = Some(limit);
    }

    pub fn set_offset(&mut self, offset: u64) {
        self.offset = Some(offset);
    }

    /// Append orderings after any already collected
    pub fn add_order_by(&mut self, order_by: impl IntoIterator<Item = OrderBy<C>>) {
        self.order_by.extend(order_by);
    }

    pub fn is_empty(&self) -> bool {
        self.limit.is_none() && self.offset.is_none() && self.order_by.is_empty()
    }

    /// Apply limit, then offset, then ordering
    pub fn apply<B: Backend<Column = C>>(&self, backend: &B, mut query: B::Query) -> B::Query {
        if let Some(limit) = self.limit {
            query = backend.apply_limit(query, limit);
        }
        if let Some(offset) = self.offset {
            query = backend.apply_offset(query, offset);
        }
        if !self.order_by.is_empty() {
            query = backend.apply_ordering(query, &self.order_by);
        }
        query
    }

    /// Serialize to the wire keywords
    pub fn dump(&self) -> JsonMap<String, JsonValue> {
        let mut map = JsonMap::new();
        if let Some(limit) = self.limit {
            map.insert(Modifier::Limit.key().to_string(), JsonValue::from(limit));
        }
        if let Some(offset) = self.offset {
            map.insert(Modifier::Offset.key().to_string(), JsonValue::from(offset));
        }
        match self.order_by.as_slice() {
            [] => {}
            [single] => {
                map.insert(Modifier::OrderBy.key().to_string(), JsonValue::String(single.to_spec()));
            }
            many => {
                map.insert(
                    Modifier::OrderBy.key().to_string(),
                    JsonValue::Array(many.iter().map(|o| JsonValue::String(o.to_spec())).collect()),
                );
            }
        }
        map
    }
}

fn order_patterns() -> &'static [Regex; 3] {
    static PATTERNS: OnceLock<[Regex; 3]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        // Any non-empty column text; only the direction notation is fixed
        [
            Regex::new(r"^(?P<column>.+)\.(?P<direction>asc|desc)$").expect("valid suffix pattern"),
            Regex::new(r"^(?P<direction>[+-])(?P<column>.+)$").expect("valid sign pattern"),
            Regex::new(r"^(?P<direction>asc|desc)\((?P<column>.+)\)$").expect("valid call pattern"),
        ]
    })
}

/// Split an order spec into its column reference and direction
///
/// Returns `(column, ascending)`.
pub fn parse_order_spec(spec: &str) -> Result<(String, bool), FilterError> {
    let spec = spec.trim();
    for pattern in order_patterns() {
        if let Some(caps) = pattern.captures(spec) {
            let ascending = matches!(&caps["direction"], "asc" | "+");
            return Ok((caps["column"].to_string(), ascending));
        }
    }
    Err(FilterError::BadFormat(format!(
        "'{}' is not a valid order specification",
        spec
    )))
}
