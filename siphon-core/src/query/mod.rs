//! Filter expression engine
//!
//! Compiles nested filter input into a predicate tree plus query modifiers,
//! edits compiled trees by path, and renders both through a backend.

pub mod ast;
pub mod backend;
pub mod compiler;
pub mod error;
pub mod modifiers;
pub mod operator;
pub mod path;
pub mod reconstruct;
pub mod restriction;

pub use ast::{Expression, Junction};
pub use backend::{Backend, QueryColumns};
pub use compiler::{CompiledFilter, Compiler};
pub use error::FilterError;
pub use modifiers::{parse_order_spec, Modifier, OrderBy, QueryModifiers};
pub use operator::{Operator, OperatorKind};
pub use path::Path;
pub use reconstruct::{reconstruct, reconstruct_json};
pub use restriction::{ColumnRestriction, Permitted, RestrictionPolicy, RestrictionSet};
