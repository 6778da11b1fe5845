//! Backend predicate renderer boundary
//!
//! The engine never builds executable predicates itself. A backend turns a
//! (column, operator) pair into its own predicate type, combines predicates
//! with AND/OR, and applies predicates and modifiers to its query object.

use super::modifiers::OrderBy;
use super::operator::Operator;
use crate::schema::{ColumnRef, SelectedColumns};

/// Capability a storage backend provides to render compiled filters
pub trait Backend {
    type Column: ColumnRef;
    type Predicate;
    type Query;

    /// Look up an output column of the query by name or alias
    fn selected_column(&self, query: &Self::Query, name: &str) -> Option<Self::Column>;

    /// Comparison of a column against an operator's value
    fn evaluate(&self, column: &Self::Column, operator: &Operator) -> Self::Predicate;

    fn and(&self, predicates: Vec<Self::Predicate>) -> Self::Predicate;

    fn or(&self, predicates: Vec<Self::Predicate>) -> Self::Predicate;

    fn apply_predicate(&self, query: Self::Query, predicate: Self::Predicate) -> Self::Query;

    fn apply_limit(&self, query: Self::Query, limit: u64) -> Self::Query;

    fn apply_offset(&self, query: Self::Query, offset: u64) -> Self::Query;

    fn apply_ordering(&self, query: Self::Query, order_by: &[OrderBy<Self::Column>]) -> Self::Query;
}

/// Selected columns of a query, as seen through its backend
pub struct QueryColumns<'a, B: Backend> {
    backend: &'a B,
    query: &'a B::Query,
}

impl<'a, B: Backend> QueryColumns<'a, B> {
    pub fn new(backend: &'a B, query: &'a B::Query) -> Self {
        Self { backend, query }
    }
}

impl<B: Backend> SelectedColumns<B::Column> for QueryColumns<'_, B> {
    fn selected(&self, name: &str) -> Option<B::Column> {
        self.backend.selected_column(self.query, name)
    }
}
