//! Filter expression tree
//!
//! An expression is either a leaf binding one column to one operator, or a
//! junction combining child expressions with AND/OR. Nodes are shared
//! handles: editing a node in place (promotion, replacement, normalization)
//! is observed by every handle to it.
//!
//! Handles are `!Send`; concurrent edits need a `deep_clone` per thread.

use super::backend::Backend;
use super::error::FilterError;
use super::operator::Operator;
use super::path::{Path, Selector};
use crate::schema::ColumnRef;
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Boolean combinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Junction {
    And,
    Or,
}

impl Junction {
    /// Parse a junction name, ignoring case
    pub fn from_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("and") {
            Some(Junction::And)
        } else if name.eq_ignore_ascii_case("or") {
            Some(Junction::Or)
        } else {
            None
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Junction::And => "and",
            Junction::Or => "or",
        }
    }

    pub fn is_junction(name: &str) -> bool {
        Self::from_name(name).is_some()
    }
}

impl fmt::Display for Junction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node<C> {
    Leaf { column: C, operator: Operator },
    Junction { kind: Junction, children: Vec<Expression<C>> },
}

/// Handle to a node of a filter expression tree
///
/// `Clone` produces another handle to the same node; use
/// [`Expression::deep_clone`] for an independent copy. Equality is
/// structural.
pub struct Expression<C>(Rc<RefCell<Node<C>>>);

impl<C> Clone for Expression<C> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<C: PartialEq> PartialEq for Expression<C> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0) || *self.0.borrow() == *other.0.borrow()
    }
}

impl<C: fmt::Debug> fmt::Debug for Expression<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0.borrow(), f)
    }
}

impl<C: ColumnRef> fmt::Display for Expression<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0.borrow() {
            Node::Leaf { column, operator } => write!(f, "{} {}", column.name(), operator),
            Node::Junction { kind, children } => {
                write!(f, "(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {} ", kind.name().to_uppercase())?;
                    }
                    write!(f, "{}", child)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl<C: ColumnRef> Expression<C> {
    fn from_node(node: Node<C>) -> Self {
        Self(Rc::new(RefCell::new(node)))
    }

    /// Create a leaf expression
    pub fn leaf(column: C, operator: Operator) -> Self {
        Self::from_node(Node::Leaf { column, operator })
    }

    /// Create a junction with exactly the given children
    pub fn junction(kind: Junction, children: Vec<Expression<C>>) -> Self {
        Self::from_node(Node::Junction { kind, children })
    }

    /// Combine siblings without producing degenerate junctions
    ///
    /// No children yields `None`, a single child is returned unchanged, and
    /// two or more become a junction in the given order.
    pub fn joined(kind: Junction, children: Vec<Expression<C>>) -> Option<Self> {
        match children.len() {
            0 => None,
            1 => children.into_iter().next(),
            _ => Some(Self::junction(kind, children)),
        }
    }

    pub fn is_junction(&self) -> bool {
        matches!(&*self.0.borrow(), Node::Junction { .. })
    }

    pub fn is_leaf(&self) -> bool {
        !self.is_junction()
    }

    /// Junction kind, `None` for leaves
    pub fn kind(&self) -> Option<Junction> {
        match &*self.0.borrow() {
            Node::Junction { kind, .. } => Some(*kind),
            Node::Leaf { .. } => None,
        }
    }

    /// Column of a leaf
    pub fn column(&self) -> Option<C> {
        match &*self.0.borrow() {
            Node::Leaf { column, .. } => Some(column.clone()),
            Node::Junction { .. } => None,
        }
    }

    /// Operator of a leaf
    pub fn operator(&self) -> Option<Operator> {
        match &*self.0.borrow() {
            Node::Leaf { operator, .. } => Some(operator.clone()),
            Node::Junction { .. } => None,
        }
    }

    /// Handles to the direct children (empty for leaves)
    pub fn children(&self) -> Vec<Expression<C>> {
        match &*self.0.borrow() {
            Node::Junction { children, .. } => children.clone(),
            Node::Leaf { .. } => Vec::new(),
        }
    }

    /// A junction without children, standing for "no filter"
    pub fn is_empty(&self) -> bool {
        match &*self.0.borrow() {
            Node::Junction { children, .. } => children.is_empty(),
            Node::Leaf { .. } => false,
        }
    }

    /// Whether both handles refer to the same node
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Whether `other` is this node or one of its descendants
    pub fn contains(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.children().iter().any(|c| c.contains(other))
    }

    /// Structural copy of the whole subtree
    pub fn deep_clone(&self) -> Self {
        Self::from_node(self.deep_node())
    }

    fn deep_node(&self) -> Node<C> {
        match &*self.0.borrow() {
            Node::Leaf { column, operator } => Node::Leaf {
                column: column.clone(),
                operator: operator.clone(),
            },
            Node::Junction { kind, children } => Node::Junction {
                kind: *kind,
                children: children.iter().map(Expression::deep_clone).collect(),
            },
        }
    }

    /// Find the node addressed by `path`
    ///
    /// Returns `Ok(None)` when nothing matches and an error only when the
    /// path itself is malformed.
    pub fn find(&self, path: impl Into<Path>) -> Result<Option<Expression<C>>, FilterError> {
        self.find_path(&path.into())
    }

    fn find_path(&self, path: &Path) -> Result<Option<Expression<C>>, FilterError> {
        let (last, prefix) = match path.split_last() {
            Some(split) => split,
            None => return Ok(Some(self.clone())),
        };

        let junctions = prefix
            .iter()
            .map(|segment| {
                Junction::from_name(segment).ok_or_else(|| {
                    FilterError::adjust(format!("invalid path: '{}' is not a junction", segment))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut current = self.clone();
        for kind in junctions {
            match current.children().into_iter().find(|c| c.kind() == Some(kind)) {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }

        Ok(current.find_child(last))
    }

    fn find_child(&self, segment: &str) -> Option<Expression<C>> {
        let selector = Selector::parse(segment);
        let node = self.0.borrow();
        let children = match &*node {
            Node::Junction { children, .. } => children,
            Node::Leaf { .. } => return None,
        };
        let found = children
            .iter()
            .find(|child| match &*child.0.borrow() {
                Node::Junction { kind, .. } => selector == Selector::Junction(*kind),
                Node::Leaf { column, operator } => {
                    selector.matches_leaf(column.name(), operator)
                        || selector.matches_leaf(&column.reference(), operator)
                }
            })
            .cloned();
        found
    }

    fn resolve(&self, path: &Path) -> Result<Expression<C>, FilterError> {
        self.find_path(path)?
            .ok_or_else(|| FilterError::adjust("destination expression not found"))
    }

    /// Add an expression at `path`, joining a leaf destination with AND
    pub fn add(&self, path: impl Into<Path>, expression: Expression<C>) -> Result<(), FilterError> {
        self.add_with(path, expression, Junction::And)
    }

    /// Add an expression at `path`
    ///
    /// A junction destination gets the expression appended. A leaf
    /// destination is promoted in place to an `implicit` junction holding a
    /// copy of its former content followed by the new expression.
    pub fn add_with(
        &self,
        path: impl Into<Path>,
        expression: Expression<C>,
        implicit: Junction,
    ) -> Result<(), FilterError> {
        let path = path.into();
        let target = self.resolve(&path)?;
        if expression.contains(&target) {
            return Err(FilterError::adjust("expression cannot be added into itself"));
        }

        tracing::debug!(path = ?path.segments(), "Adding expression");

        let mut node = target.0.borrow_mut();
        if let Node::Junction { children, .. } = &mut *node {
            children.push(expression);
            return Ok(());
        }
        let former = Expression::from_node(node.clone());
        *node = Node::Junction {
            kind: implicit,
            children: vec![former, expression],
        };
        Ok(())
    }

    /// Overwrite the node at `path` with a copy of `expression`
    ///
    /// The destination keeps its identity; any node, leaf or junction, may
    /// be targeted.
    pub fn replace(&self, path: impl Into<Path>, expression: &Expression<C>) -> Result<(), FilterError> {
        let path = path.into();
        let target = self.resolve(&path)?;

        tracing::debug!(path = ?path.segments(), "Replacing expression");

        let content = expression.deep_node();
        *target.0.borrow_mut() = content;
        Ok(())
    }

    /// Detach the node at `path` from its parent
    pub fn remove(&self, path: impl Into<Path>) -> Result<(), FilterError> {
        let path = path.into();
        if path.is_empty() {
            return Err(FilterError::adjust("cannot remove the root expression"));
        }
        let parent = self.resolve(&path.parent())?;
        let target = self.resolve(&path)?;

        tracing::debug!(path = ?path.segments(), "Removing expression");

        if let Node::Junction { children, .. } = &mut *parent.0.borrow_mut() {
            if let Some(index) = children.iter().position(|c| c.ptr_eq(&target)) {
                children.remove(index);
            }
        }
        Ok(())
    }

    /// Remove empty junctions and collapse single-child junctions
    ///
    /// Children are normalized first. The result is logically equivalent to
    /// the input, and normalizing again changes nothing.
    pub fn normalize(&self) {
        let children = match &*self.0.borrow() {
            Node::Junction { children, .. } => children.clone(),
            Node::Leaf { .. } => return,
        };
        for child in &children {
            child.normalize();
        }

        let mut node = self.0.borrow_mut();
        let collapsed = match &mut *node {
            Node::Junction { children, .. } => {
                children.retain(|c| !c.is_empty());
                match children.as_slice() {
                    [only] => Some(only.0.borrow().clone()),
                    _ => None,
                }
            }
            Node::Leaf { .. } => None,
        };
        if let Some(content) = collapsed {
            *node = content;
        }
    }

    /// Serialize to the nested wire mapping
    ///
    /// Intended for normalized trees. Children of an AND junction that
    /// filter the same column are merged into one operator map; any other
    /// duplicate key fails with `KeyCollision` rather than losing data.
    pub fn dump(&self) -> Result<JsonMap<String, JsonValue>, FilterError> {
        let mut map = JsonMap::new();
        match &*self.0.borrow() {
            Node::Leaf { column, operator } => {
                map.insert(column.reference().into_owned(), JsonValue::Object(operator.dump()));
            }
            Node::Junction { kind, children } => {
                let mut merged = JsonMap::new();
                for child in children {
                    for (key, value) in child.dump()? {
                        merge_dump_entry(&mut merged, *kind, key, value)?;
                    }
                }
                map.insert(kind.name().to_string(), JsonValue::Object(merged));
            }
        }
        Ok(map)
    }

    /// Render into a backend predicate
    ///
    /// Empty junctions render to nothing and are skipped by their parent.
    pub fn render<B: Backend<Column = C>>(&self, backend: &B) -> Option<B::Predicate> {
        match &*self.0.borrow() {
            Node::Leaf { column, operator } => Some(backend.evaluate(column, operator)),
            Node::Junction { kind, children } => {
                let mut predicates: Vec<_> = children.iter().filter_map(|c| c.render(backend)).collect();
                match predicates.len() {
                    0 => None,
                    1 => predicates.pop(),
                    _ => Some(match kind {
                        Junction::And => backend.and(predicates),
                        Junction::Or => backend.or(predicates),
                    }),
                }
            }
        }
    }

    /// Render and apply to a backend query
    pub fn apply<B: Backend<Column = C>>(&self, backend: &B, query: B::Query) -> B::Query {
        match self.render(backend) {
            Some(predicate) => backend.apply_predicate(query, predicate),
            None => query,
        }
    }
}

fn merge_dump_entry(
    target: &mut JsonMap<String, JsonValue>,
    kind: Junction,
    key: String,
    value: JsonValue,
) -> Result<(), FilterError> {
    let existing = match target.get_mut(&key) {
        Some(existing) => existing,
        None => {
            target.insert(key, value);
            return Ok(());
        }
    };

    let mergeable = kind == Junction::And && !Junction::is_junction(&key);
    match (existing, value) {
        (JsonValue::Object(operators), JsonValue::Object(incoming)) if mergeable => {
            for (symbol, literal) in incoming {
                if operators.contains_key(&symbol) {
                    return Err(FilterError::KeyCollision {
                        key: format!("{}.{}", key, symbol),
                    });
                }
                operators.insert(symbol, literal);
            }
            Ok(())
        }
        _ => Err(FilterError::KeyCollision { key }),
    }
}
