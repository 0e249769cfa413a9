//! Dependency-tracked symbol table for the tabula calculator.
//!
//! Callers define named expressions; the table maintains a bidirectional
//! dependency graph from their free variables and evaluates symbols in
//! deterministic topological order, feeding each result into the scope
//! its dependents see.
//!
//! # Design
//!
//! - [`Table`] — definitions, mirrored edge sets, and the scheduler
//! - [`SymbolSet`](symbol_set::SymbolSet) / [`EdgeSet`](edge_set::EdgeSet)
//!   — the graph's building blocks
//! - user-defined functions evaluate their bodies through the table,
//!   with a guard that rejects direct self-recursion
//! - [`SharedTable`] — a mutex-guarded variant that caches and shares
//!   evaluation snapshots across readers
//!
//! Failures accumulate as diagnostics next to best-effort values:
//! undefined names evaluate to the unknown value, and dependency cycles
//! bind their members to unknown so the acyclic remainder still
//! evaluates.
//!
//! # Examples
//!
//! ```
//! use tabula_calc::Table;
//! use tabula_expr::{parse_expression, Value};
//!
//! let mut table = Table::new();
//! let (expr, _) = parse_expression("base * 2", "double");
//! table.define("double", expr);
//! let (expr, _) = parse_expression("21", "base");
//! table.define("base", expr);
//!
//! let (value, diags) = table.value("double");
//! assert!(!diags.has_errors());
//! assert_eq!(value, Value::Number(42.0));
//! ```

pub mod edge_set;
mod funcs;
pub mod shared;
pub mod symbol_set;
pub mod table;

pub use shared::{SharedTable, Snapshot};
pub use symbol_set::SymbolSet;
pub use table::{SymbolValue, Table};
