//! Reconstruction of input trees from compiled filters

use super::ast::Expression;
use super::error::FilterError;
use super::modifiers::QueryModifiers;
use crate::input::FilterInput;
use crate::schema::ColumnRef;
use serde_json::{Map as JsonMap, Value as JsonValue};

/// Dump an expression and its modifiers back into the wire mapping
///
/// The expression is normalized in place first.
pub fn reconstruct_json<C: ColumnRef>(
    expression: Option<&Expression<C>>,
    modifiers: &QueryModifiers<C>,
) -> Result<JsonMap<String, JsonValue>, FilterError> {
    let mut map = JsonMap::new();
    if let Some(expression) = expression {
        expression.normalize();
        if !expression.is_empty() {
            map = expression.dump()?;
        }
    }
    for (key, value) in modifiers.dump() {
        if map.contains_key(&key) {
            return Err(FilterError::KeyCollision { key });
        }
        map.insert(key, value);
    }
    Ok(map)
}

/// Rebuild an input tree that compiles back to the same filter
pub fn reconstruct<C: ColumnRef>(
    expression: Option<&Expression<C>>,
    modifiers: &QueryModifiers<C>,
) -> Result<FilterInput, FilterError> {
    Ok(FilterInput::from_map(&reconstruct_json(expression, modifiers)?))
}
