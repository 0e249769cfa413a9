//! Expression language for the tabula calculator.
//!
//! This crate is the self-contained language layer: a lexer, a
//! recursive-descent parser, a dynamically-typed value domain with a
//! distinguished unknown placeholder, layered evaluation contexts backed
//! by a global registry of built-in functions, and structured
//! diagnostics.
//!
//! # Design
//!
//! - [`Expression`] — an immutable pair of parsed tree and original
//!   source, exposing free-variable traversals and evaluation
//! - [`Context`](context::Context) — single-parent scope chain; children
//!   shadow parents, roots fall back to the built-ins
//! - [`Value`](value::Value) — tagged variants plus `Unknown(Type)`;
//!   unknowns propagate instead of failing
//! - [`Diagnostics`](diag::Diagnostics) — accumulated error records with
//!   source subjects; evaluation is best-effort and never aborts a batch
//!
//! # Examples
//!
//! ```
//! use tabula_expr::{parse_expression, Context, Value};
//!
//! let (expr, diags) = parse_expression("1 + 2 * 3", "demo");
//! assert!(!diags.has_errors());
//!
//! let (value, diags) = expr.value(&Context::new());
//! assert!(!diags.has_errors());
//! assert_eq!(value, Value::Number(7.0));
//! ```

pub mod ast;
pub mod context;
pub mod diag;
mod eval;
pub mod funcs;
pub mod lexer;
mod parser;
pub mod span;
pub mod value;

pub use ast::{Expr, ExprKind, Traversal, TravStep};
pub use context::{CallError, Context, FuncDef};
pub use diag::{Diagnostic, DiagnosticKind, Diagnostics, Severity, Subject};
pub use span::{Pos, Span};
pub use value::{Type, Value};

/// A parsed expression together with the source text it came from and
/// the label used for its diagnostic subjects.
///
/// Immutable once built; the source slice stays valid for as long as the
/// expression does.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    root: Expr,
    source: String,
    name: String,
}

impl Expression {
    /// The sentinel used in place of a definition that does not exist: a
    /// literal unknown with empty source.
    pub fn missing() -> Self {
        Expression {
            root: Expr::new(ExprKind::Literal(Value::unknown()), Span::zero()),
            source: String::new(),
            name: String::new(),
        }
    }

    /// Original source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Diagnostic label this expression was parsed under.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn into_root(self) -> Expr {
        self.root
    }

    /// Free-variable references, as traversals. Only the root name of
    /// each traversal participates in dependency tracking.
    pub fn variables(&self) -> Vec<Traversal> {
        self.root.variables()
    }

    /// Interpret the whole expression as an absolute traversal, if it is
    /// one.
    pub fn as_traversal(&self) -> Option<Traversal> {
        self.root.as_traversal()
    }

    /// Evaluate against a context, producing a best-effort value and any
    /// diagnostics raised along the way.
    pub fn value(&self, ctx: &Context<'_>) -> (Value, Diagnostics) {
        let mut diags = Diagnostics::new();
        let scope = eval::Scope {
            src: &self.source,
            label: &self.name,
        };
        let value = eval::evaluate(&self.root, &scope, ctx, &mut diags);
        (value, diags)
    }
}

/// Parse `src` into an [`Expression`] at source position (1,1).
///
/// `name` is purely a label for diagnostic subjects (typically the symbol
/// the expression is being assigned to; empty for ad-hoc input).
///
/// Parsing is best-effort: on syntax errors the returned expression still
/// carries whatever prefix shape was recognised, or a literal unknown
/// when nothing was, so callers can keep using it.
pub fn parse_expression(src: &str, name: &str) -> (Expression, Diagnostics) {
    let mut diags = Diagnostics::new();

    let (tokens, invalid) = lexer::lex(src);
    for span in invalid {
        let bad = &src[span.start as usize..span.end as usize];
        diags.push(
            Diagnostic::error(
                DiagnosticKind::Parse,
                "Invalid character",
                format!("The input {bad:?} is not valid in an expression."),
            )
            .with_subject(Subject::new(name, src, span)),
        );
    }

    let (parsed, errors) = parser::parse(&tokens);
    for error in errors {
        diags.push(error.into_diagnostic(src, name));
    }

    let root = parsed.unwrap_or_else(|| {
        Expr::new(
            ExprKind::Literal(Value::unknown()),
            Span::new(0, src.len() as u32),
        )
    });

    (
        Expression {
            root,
            source: src.to_string(),
            name: name.to_string(),
        },
        diags,
    )
}
