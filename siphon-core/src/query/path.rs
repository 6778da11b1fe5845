//! Path addressing for expression trees
//!
//! A path is a list of segments. All but the last must name a junction
//! (`and`/`or`, case-insensitive); the last may also select a leaf as
//! `column`, `column:operator` or `column:operator-literal`.

use super::ast::Junction;
use super::operator::{Operator, OperatorKind};

/// Separator used when a path is given as a single string
pub const PATH_SEPARATOR: char = '.';

/// Ordered list of path segments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    /// The empty path, addressing the receiver itself
    pub fn root() -> Self {
        Self::default()
    }

    pub fn new<S: Into<String>>(segments: impl IntoIterator<Item = S>) -> Self {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Split a dotted path string
    pub fn parse(path: &str) -> Self {
        if path.is_empty() {
            return Self::root();
        }
        Self::new(path.split(PATH_SEPARATOR))
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Everything but the last segment
    pub fn parent(&self) -> Path {
        match self.segments.split_last() {
            Some((_, prefix)) => Path::new(prefix.iter().cloned()),
            None => Path::root(),
        }
    }

    pub(crate) fn split_last(&self) -> Option<(&String, &[String])> {
        self.segments.split_last()
    }
}

impl From<&str> for Path {
    fn from(path: &str) -> Self {
        Path::parse(path)
    }
}

impl From<String> for Path {
    fn from(path: String) -> Self {
        Path::parse(&path)
    }
}

impl From<Vec<String>> for Path {
    fn from(segments: Vec<String>) -> Self {
        Path { segments }
    }
}

impl From<Vec<&str>> for Path {
    fn from(segments: Vec<&str>) -> Self {
        Path::new(segments)
    }
}

impl From<&[&str]> for Path {
    fn from(segments: &[&str]) -> Self {
        Path::new(segments.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for Path {
    fn from(segments: [&str; N]) -> Self {
        Path::new(segments)
    }
}

/// Parsed final path segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Selector<'a> {
    Junction(Junction),
    Column(&'a str),
    ColumnOperator(&'a str, &'a str),
    ColumnOperatorValue(&'a str, &'a str, &'a str),
}

impl<'a> Selector<'a> {
    pub(crate) fn parse(segment: &'a str) -> Self {
        if let Some(junction) = Junction::from_name(segment) {
            return Selector::Junction(junction);
        }
        match segment.split_once(':') {
            None => Selector::Column(segment),
            Some((column, operator)) => match operator.split_once('-') {
                None => Selector::ColumnOperator(column, operator),
                Some((symbol, literal)) => Selector::ColumnOperatorValue(column, symbol, literal),
            },
        }
    }

    /// Whether a leaf with this column name and operator matches
    ///
    /// Literals are compared against the canonical string form of the
    /// assigned value, so `age:eq-20` matches both `20` and `"20"`.
    pub(crate) fn matches_leaf(&self, column: &str, operator: &Operator) -> bool {
        let same_kind = |symbol: &str| OperatorKind::from_symbol(symbol) == Some(operator.kind());
        match *self {
            Selector::Junction(_) => false,
            Selector::Column(name) => name == column,
            Selector::ColumnOperator(name, symbol) => name == column && same_kind(symbol),
            Selector::ColumnOperatorValue(name, symbol, literal) => {
                name == column && same_kind(symbol) && operator.value().to_string() == literal
            }
        }
    }
}
