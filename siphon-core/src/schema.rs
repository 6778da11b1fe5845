//! Column resolution boundary
//!
//! This module provides:
//! - The traits through which the compiler resolves column references
//! - An in-memory table catalog and output-column selection for callers
//!   that do not bring their own schema layer

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Opaque handle to a queryable column
pub trait ColumnRef: Clone + Debug + PartialEq {
    /// Name the column is addressed by in filters, paths and restrictions
    fn name(&self) -> &str;

    /// Reference written back when dumping, resolvable by the compiler
    ///
    /// Defaults to [`ColumnRef::name`]. Columns reached through a
    /// `table.column` lookup should return that qualified form, so a dump
    /// still compiles when the column is not among the selected ones.
    fn reference(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.name())
    }
}

/// Registry of known tables, used for `table.column` references
pub trait TableRegistry {
    type Column: ColumnRef;

    fn column(&self, table: &str, column: &str) -> Option<Self::Column>;
}

/// Output columns currently selected by the active query
pub trait SelectedColumns<C> {
    fn selected(&self, name: &str) -> Option<C>;
}

/// Column of an in-memory table, optionally labeled in the query output
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    pub table: String,
    pub name: String,
    pub label: Option<String>,
    /// Resolved through the table registry rather than the selection
    #[serde(default)]
    pub qualified: bool,
}

impl Column {
    pub fn new(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            name: name.into(),
            label: None,
            qualified: false,
        }
    }

    /// Label the column in the query output
    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Mark the column as addressed by its `table.column` form
    pub fn qualify(mut self) -> Self {
        self.qualified = true;
        self
    }

    /// `table.column` form
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.table, self.name)
    }
}

impl ColumnRef for Column {
    fn name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    fn reference(&self) -> Cow<'_, str> {
        match &self.label {
            Some(label) => Cow::Borrowed(label),
            None if self.qualified => Cow::Owned(self.qualified_name()),
            None => Cow::Borrowed(&self.name),
        }
    }
}

/// Table definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<String>,
}

impl Table {
    pub fn new<S: Into<String>>(name: impl Into<String>, columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Get a column by name
    pub fn column(&self, name: &str) -> Option<Column> {
        self.columns
            .iter()
            .find(|c| c.as_str() == name)
            .map(|c| Column::new(self.name.clone(), c.clone()))
    }

    /// All columns of the table, unlabeled
    pub fn all_columns(&self) -> Vec<Column> {
        self.columns
            .iter()
            .map(|c| Column::new(self.name.clone(), c.clone()))
            .collect()
    }
}

/// In-memory table registry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub tables: BTreeMap<String, Table>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table definition
    pub fn add_table(&mut self, table: Table) {
        self.tables.insert(table.name.clone(), table);
    }

    /// Builder form of [`Catalog::add_table`]
    pub fn with_table(mut self, table: Table) -> Self {
        self.add_table(table);
        self
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }
}

impl TableRegistry for Catalog {
    type Column = Column;

    fn column(&self, table: &str, column: &str) -> Option<Column> {
        self.tables
            .get(table)
            .and_then(|t| t.column(column))
            .map(Column::qualify)
    }
}

/// Output columns of a query, in selection order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Selection {
    pub columns: Vec<Column>,
}

impl Selection {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    /// Select every column of a table
    pub fn all_of(table: &Table) -> Self {
        Self::new(table.all_columns())
    }
}

impl SelectedColumns<Column> for Selection {
    fn selected(&self, name: &str) -> Option<Column> {
        // Labels win over original names
        self.columns
            .iter()
            .find(|c| c.label.as_deref() == Some(name))
            .or_else(|| self.columns.iter().find(|c| c.name == name))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Table {
        Table::new("tt", ["id", "name", "age"])
    }

    #[test]
    fn test_catalog_lookup() {
        let catalog = Catalog::new().with_table(users());
        assert_eq!(catalog.column("tt", "age"), Some(Column::new("tt", "age").qualify()));
        assert_eq!(catalog.column("tt", "missing"), None);
        assert_eq!(catalog.column("other", "age"), None);
    }

    #[test]
    fn test_selection_matches_label_and_name() {
        let selection = Selection::new(vec![
            Column::new("tt", "id").labeled("ID"),
            Column::new("tt", "name"),
        ]);
        assert_eq!(selection.selected("ID").map(|c| c.name), Some("id".to_string()));
        assert_eq!(selection.selected("id").map(|c| c.name), Some("id".to_string()));
        assert_eq!(selection.selected("name").map(|c| c.table), Some("tt".to_string()));
        assert!(selection.selected("age").is_none());
    }

    #[test]
    fn test_column_name_prefers_label() {
        let column = Column::new("tt", "name").labeled("tt_name");
        assert_eq!(ColumnRef::name(&column), "tt_name");
        assert_eq!(column.qualified_name(), "tt.name");
    }

    #[test]
    fn test_column_reference() {
        let plain = Column::new("tt", "age");
        assert_eq!(plain.reference(), "age");

        let qualified = Column::new("tt", "age").qualify();
        assert_eq!(qualified.name(), "age");
        assert_eq!(qualified.reference(), "tt.age");

        let labeled = Column::new("tt", "age").labeled("years").qualify();
        assert_eq!(labeled.reference(), "years");
    }
}
