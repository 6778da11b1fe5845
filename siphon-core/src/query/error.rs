//! Filter compilation and expression editing errors

/// Errors raised while compiling, editing or dumping filters
///
/// Every error is terminal for the call that produced it; nothing is
/// retried or recovered internally.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FilterError {
    #[error("No such operation: {0}")]
    NoSuchOperation(String),

    #[error("Invalid value type: {0}")]
    InvalidValueType(String),

    #[error("Invalid filtering structure: {0}")]
    InvalidFilteringStructure(String),

    #[error("Bad format: {0}")]
    BadFormat(String),

    #[error("Column error: {0}")]
    ColumnError(String),

    #[error("Filtering operation '{operator}' is not allowed on column '{column}'")]
    FiltrationNotAllowed { column: String, operator: String },

    #[error("Cannot adjust expression: {0}")]
    CannotAdjustExpression(String),

    #[error("Key '{key}' appears more than once in the same junction")]
    KeyCollision { key: String },
}

impl FilterError {
    pub(crate) fn adjust(msg: impl Into<String>) -> Self {
        FilterError::CannotAdjustExpression(msg.into())
    }

    pub(crate) fn structure(msg: impl Into<String>) -> Self {
        FilterError::InvalidFilteringStructure(msg.into())
    }
}
