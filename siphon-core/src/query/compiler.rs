//! Compiler from input trees to expressions and modifiers
//!
//! A single top-down pass threads the current column through the tree.
//! Keyword keys feed the query modifiers, junction keys combine their
//! children, and every other key names the column its children filter on.

use super::ast::{Expression, Junction};
use super::backend::{Backend, QueryColumns};
use super::error::FilterError;
use super::modifiers::{parse_order_spec, Modifier, OrderBy, QueryModifiers};
use super::operator::{Operator, OperatorKind};
use super::restriction::RestrictionSet;
use crate::config::CompilerSettings;
use crate::input::{FilterInput, InputNode};
use crate::schema::{ColumnRef, SelectedColumns, TableRegistry};
use crate::value::Value;
use tracing::{debug, trace};

/// Separator between table and column in qualified references
pub const QUALIFIER_SEPARATOR: char = '.';

/// Result of compiling an input tree
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFilter<C> {
    /// Predicate tree, absent when the input holds no filters
    pub expression: Option<Expression<C>>,
    pub modifiers: QueryModifiers<C>,
}

impl<C: ColumnRef> CompiledFilter<C> {
    /// Apply the predicate and then the modifiers to a query
    pub fn apply<B: Backend<Column = C>>(&self, backend: &B, mut query: B::Query) -> B::Query {
        if let Some(expression) = &self.expression {
            query = expression.apply(backend, query);
        }
        self.modifiers.apply(backend, query)
    }
}

/// Filter compiler bound to a table registry
#[derive(Debug, Clone)]
pub struct Compiler<R> {
    registry: R,
    settings: CompilerSettings,
}

impl<R: TableRegistry> Compiler<R> {
    pub fn new(registry: R) -> Self {
        Self::with_settings(registry, CompilerSettings::default())
    }

    pub fn with_settings(registry: R, settings: CompilerSettings) -> Self {
        Self { registry, settings }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn settings(&self) -> &CompilerSettings {
        &self.settings
    }

    /// Compile an input tree against the given output columns
    pub fn compile<S>(
        &self,
        input: &FilterInput,
        selected: &S,
        restrictions: &RestrictionSet,
    ) -> Result<CompiledFilter<R::Column>, FilterError>
    where
        S: SelectedColumns<R::Column>,
    {
        debug!(nodes = input.children().len(), "Compiling filter input");

        let mut pass = Pass {
            compiler: self,
            selected,
            restrictions,
            modifiers: QueryModifiers::new(),
        };

        let mut filters = Vec::new();
        for node in input.children() {
            if let Some(expression) = pass.node(node, None, 1)? {
                filters.push(expression);
            }
        }

        let compiled = CompiledFilter {
            expression: Expression::joined(Junction::And, filters),
            modifiers: pass.modifiers,
        };

        debug!(
            has_filter = compiled.expression.is_some(),
            limit = ?compiled.modifiers.limit(),
            offset = ?compiled.modifiers.offset(),
            ordering = compiled.modifiers.order_by().len(),
            "Compiled filter input"
        );

        Ok(compiled)
    }

    /// Compile and apply an input tree to a backend query
    pub fn build<B>(
        &self,
        backend: &B,
        query: B::Query,
        input: &FilterInput,
        restrictions: &RestrictionSet,
    ) -> Result<B::Query, FilterError>
    where
        B: Backend<Column = R::Column>,
    {
        let compiled = {
            let columns = QueryColumns::new(backend, &query);
            self.compile(input, &columns, restrictions)?
        };
        Ok(compiled.apply(backend, query))
    }

    /// Resolve a column reference
    ///
    /// A qualified `table.column` reference is looked up in the registry
    /// first. Otherwise, or when that fails, the whole reference must match
    /// one of the selected output columns.
    pub fn resolve_column<S>(&self, reference: &str, selected: &S) -> Result<R::Column, FilterError>
    where
        S: SelectedColumns<R::Column>,
    {
        if let Some((table, column)) = reference.split_once(QUALIFIER_SEPARATOR) {
            if let Some(resolved) = self.registry.column(table, column) {
                return Ok(resolved);
            }
        }
        selected
            .selected(reference)
            .ok_or_else(|| FilterError::ColumnError(format!("column '{}' cannot be resolved", reference)))
    }
}

/// State of one compile call
struct Pass<'a, R: TableRegistry, S> {
    compiler: &'a Compiler<R>,
    selected: &'a S,
    restrictions: &'a RestrictionSet,
    modifiers: QueryModifiers<R::Column>,
}

impl<R, S> Pass<'_, R, S>
where
    R: TableRegistry,
    S: SelectedColumns<R::Column>,
{
    fn node(
        &mut self,
        node: &InputNode,
        parent: Option<&str>,
        depth: usize,
    ) -> Result<Option<Expression<R::Column>>, FilterError> {
        if depth > self.compiler.settings.max_depth {
            return Err(FilterError::structure(format!(
                "input nested deeper than {} levels",
                self.compiler.settings.max_depth
            )));
        }

        let key = node.key();

        if let Some(modifier) = Modifier::from_key(key) {
            self.modifier(modifier, node)?;
            return Ok(None);
        }

        if let Some(kind) = Junction::from_name(key) {
            if node.is_leaf() {
                return Err(FilterError::structure(format!(
                    "junction '{}' must contain filters",
                    key
                )));
            }
            let mut children = Vec::new();
            for child in node.children() {
                if let Some(expression) = self.node(child, parent, depth + 1)? {
                    children.push(expression);
                }
            }
            return Ok(Expression::joined(kind, children));
        }

        if let Some(scalar) = node.scalar() {
            let column = established(parent, key)?;
            return self.leaf(column, key, scalar.clone()).map(Some);
        }

        if node.is_simple_array_branch() {
            let column = established(parent, key)?;
            if OperatorKind::from_symbol(key).is_some_and(|kind| !kind.expects_sequence()) {
                return Err(FilterError::structure(format!(
                    "operator '{}' does not take a list of values",
                    key
                )));
            }
            let values: Vec<Value> = node.children().iter().filter_map(InputNode::scalar).cloned().collect();
            return self.leaf(column, key, Value::Array(values)).map(Some);
        }

        if parent.is_some() && OperatorKind::is_operator(key) {
            return Err(FilterError::structure(format!(
                "operator '{}' cannot contain nested filters",
                key
            )));
        }

        let mut children = Vec::new();
        for child in node.children() {
            if let Some(expression) = self.node(child, Some(key), depth + 1)? {
                children.push(expression);
            }
        }
        Ok(Expression::joined(Junction::And, children))
    }

    fn leaf(&self, reference: &str, symbol: &str, value: Value) -> Result<Expression<R::Column>, FilterError> {
        let column = self.compiler.resolve_column(reference, self.selected)?;
        let operator = Operator::new(symbol, value)?;
        self.restrictions.check(column.name(), &operator)?;
        trace!(column = %column.name(), operator = %operator, "Compiled leaf");
        Ok(Expression::leaf(column, operator))
    }

    fn modifier(&mut self, modifier: Modifier, node: &InputNode) -> Result<(), FilterError> {
        match modifier {
            Modifier::Limit => {
                let limit = parse_count(modifier, node)?;
                if let Some(max) = self.compiler.settings.max_limit {
                    if limit > max {
                        return Err(FilterError::InvalidValueType(format!(
                            "limit {} exceeds the maximum of {}",
                            limit, max
                        )));
                    }
                }
                self.modifiers.set_limit(limit);
            }
            Modifier::Offset => {
                let offset = parse_count(modifier, node)?;
                self.modifiers.set_offset(offset);
            }
            Modifier::OrderBy => {
                let specs: Vec<&Value> = if let Some(scalar) = node.scalar() {
                    vec![scalar]
                } else if node.is_simple_array_branch() {
                    node.children().iter().filter_map(InputNode::scalar).collect()
                } else {
                    return Err(FilterError::InvalidValueType(
                        "order_by must be a single spec or a list of specs".to_string(),
                    ));
                };

                let mut order_by = Vec::with_capacity(specs.len());
                for spec in specs {
                    let spec = spec
                        .as_str()
                        .ok_or_else(|| FilterError::BadFormat(format!("order spec {} is not a string", spec)))?;
                    let (reference, ascending) = parse_order_spec(spec)?;
                    let column = self.compiler.resolve_column(&reference, self.selected)?;
                    order_by.push(OrderBy { column, ascending });
                }
                self.modifiers.add_order_by(order_by);
            }
        }
        Ok(())
    }
}

fn established<'p>(parent: Option<&'p str>, key: &str) -> Result<&'p str, FilterError> {
    parent.ok_or_else(|| {
        FilterError::structure(format!("'{}' is not attached to any column", key))
    })
}

/// Non-negative integer, or a string holding one
fn parse_count(modifier: Modifier, node: &InputNode) -> Result<u64, FilterError> {
    let invalid = || {
        FilterError::InvalidValueType(format!(
            "{} must be a non-negative integer",
            modifier.key()
        ))
    };
    match node.scalar().ok_or_else(invalid)? {
        Value::Int(n) => u64::try_from(*n).map_err(|_| invalid()),
        Value::UInt(n) => Ok(*n),
        Value::String(s) => s.trim().parse::<u64>().map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}
