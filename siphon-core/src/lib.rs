//! Siphon Core - Filter expression engine
//!
//! This crate provides:
//! - Compilation of nested filter input into predicate trees and query modifiers
//! - Path-addressed editing, normalization and dumping of predicate trees
//! - Per-column restrictions on the operators untrusted callers may use
//! - Rendering through a pluggable query backend

pub mod config;
pub mod input;
pub mod logging;
pub mod query;
pub mod schema;
pub mod value;

pub use config::{CompilerSettings, LogFormat, LogLevel, LoggingSettings, SiphonConfig};
pub use input::{FilterInput, InputNode, NodeValue};
pub use logging::init_logging;
pub use query::*;
pub use schema::{Catalog, Column, ColumnRef, SelectedColumns, Selection, Table, TableRegistry};
pub use value::Value;
