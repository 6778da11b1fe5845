//! Structured filter input
//!
//! The nested tree handed over by the query-string parser. Keys keep their
//! original order so that dumps and reconstructions are deterministic.

use crate::query::FilterError;
use crate::value::Value;
use serde_json::{Map as JsonMap, Value as JsonValue};

/// Value of a single input node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeValue {
    /// Terminal value
    Scalar(Value),
    /// Ordered list; children are keyed by their index
    List(Vec<InputNode>),
    /// Ordered mapping of keyed children
    Map(Vec<InputNode>),
}

/// One keyed node of the input tree
#[derive(Debug, Clone, PartialEq)]
pub struct InputNode {
    key: String,
    value: NodeValue,
}

impl InputNode {
    /// Create a leaf node
    pub fn leaf(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: NodeValue::Scalar(value.into()),
        }
    }

    /// Create a list node from scalar values
    pub fn list<V: Into<Value>>(key: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        let children = values
            .into_iter()
            .enumerate()
            .map(|(i, v)| InputNode::leaf(i.to_string(), v))
            .collect();
        Self {
            key: key.into(),
            value: NodeValue::List(children),
        }
    }

    /// Create a mapping node
    pub fn map(key: impl Into<String>, children: Vec<InputNode>) -> Self {
        Self {
            key: key.into(),
            value: NodeValue::Map(children),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &NodeValue {
        &self.value
    }

    /// Scalar value of a leaf node
    pub fn scalar(&self) -> Option<&Value> {
        match &self.value {
            NodeValue::Scalar(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.value, NodeValue::Scalar(_))
    }

    /// A list whose children are all leaves
    pub fn is_simple_array_branch(&self) -> bool {
        match &self.value {
            NodeValue::List(children) => children.iter().all(InputNode::is_leaf),
            _ => false,
        }
    }

    /// Child nodes (empty for leaves)
    pub fn children(&self) -> &[InputNode] {
        match &self.value {
            NodeValue::Scalar(_) => &[],
            NodeValue::List(children) | NodeValue::Map(children) => children,
        }
    }

    /// Build a node from a JSON value
    pub fn from_json(key: impl Into<String>, json: &JsonValue) -> Self {
        let value = match json {
            JsonValue::Object(obj) => NodeValue::Map(
                obj.iter()
                    .map(|(k, v)| InputNode::from_json(k.as_str(), v))
                    .collect(),
            ),
            JsonValue::Array(items) => NodeValue::List(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, v)| InputNode::from_json(i.to_string(), v))
                    .collect(),
            ),
            // Objects are handled above, so conversion cannot fail here
            scalar => NodeValue::Scalar(Value::from_json(scalar).unwrap_or(Value::Null)),
        };
        Self {
            key: key.into(),
            value,
        }
    }

    /// Convert the node's value back to JSON
    pub fn to_json(&self) -> JsonValue {
        match &self.value {
            NodeValue::Scalar(v) => v.to_json(),
            NodeValue::List(children) => {
                JsonValue::Array(children.iter().map(InputNode::to_json).collect())
            }
            NodeValue::Map(children) => JsonValue::Object(
                children
                    .iter()
                    .map(|c| (c.key.clone(), c.to_json()))
                    .collect(),
            ),
        }
    }
}

/// Root of an input tree
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterInput {
    children: Vec<InputNode>,
}

impl FilterInput {
    pub fn new(children: Vec<InputNode>) -> Self {
        Self { children }
    }

    /// Parse JSON text into an input tree
    pub fn parse(json: &str) -> Result<Self, FilterError> {
        let value: JsonValue = serde_json::from_str(json)
            .map_err(|e| FilterError::structure(format!("invalid JSON: {}", e)))?;
        Self::from_json(&value)
    }

    /// Build an input tree from a JSON object
    pub fn from_json(value: &JsonValue) -> Result<Self, FilterError> {
        let obj = value
            .as_object()
            .ok_or_else(|| FilterError::structure("filter input must be an object"))?;
        Ok(Self::from_map(obj))
    }

    pub fn from_map(obj: &JsonMap<String, JsonValue>) -> Self {
        Self {
            children: obj
                .iter()
                .map(|(k, v)| InputNode::from_json(k.as_str(), v))
                .collect(),
        }
    }

    pub fn children(&self) -> &[InputNode] {
        &self.children
    }

    pub fn push(&mut self, node: InputNode) {
        self.children.push(node);
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(
            self.children
                .iter()
                .map(|c| (c.key.clone(), c.to_json()))
                .collect(),
        )
    }
}
