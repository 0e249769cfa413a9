//! Expression syntax tree.
//!
//! Nodes carry their source span so diagnostics can point back into the
//! original text. Free-variable references are exposed as traversals: a
//! root identifier followed by constant attribute and index steps. Only
//! the root name takes part in dependency tracking; steps exist so hosts
//! can validate assignment targets and drive completion.

use crate::span::Span;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

/// A spanned expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Value),
    Tuple(Vec<Expr>),
    /// Object constructor; duplicate keys keep the last entry.
    Object(Vec<(String, Expr)>),
    Variable(String),
    GetAttr {
        object: Box<Expr>,
        name: String,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        then_value: Box<Expr>,
        else_value: Box<Expr>,
    },
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Interpret this expression as an absolute traversal, if it is one:
    /// a variable reference possibly extended by attribute accesses and
    /// literal index steps. `a`, `a.b`, and `a["k"][0]` qualify; `a[i]`
    /// and `f(x).b` do not.
    pub fn as_traversal(&self) -> Option<Traversal> {
        match &self.kind {
            ExprKind::Variable(name) => Some(Traversal {
                root: name.clone(),
                steps: Vec::new(),
            }),
            ExprKind::GetAttr { object, name } => {
                let mut traversal = object.as_traversal()?;
                traversal.steps.push(TravStep::Attr(name.clone()));
                Some(traversal)
            }
            ExprKind::Index { object, index } => {
                let key = match &index.kind {
                    ExprKind::Literal(value) => value.clone(),
                    _ => return None,
                };
                let mut traversal = object.as_traversal()?;
                traversal.steps.push(TravStep::Index(key));
                Some(traversal)
            }
            _ => None,
        }
    }

    /// Collect every free-variable reference, as traversals.
    ///
    /// A reference that forms a traversal is reported whole; anything
    /// else (a computed index, a call argument) is descended into, so
    /// `a[i]` reports both `a` and `i`.
    pub fn variables(&self) -> Vec<Traversal> {
        let mut out = Vec::new();
        collect_variables(self, &mut out);
        out
    }
}

fn collect_variables(expr: &Expr, out: &mut Vec<Traversal>) {
    if let Some(traversal) = expr.as_traversal() {
        out.push(traversal);
        return;
    }
    match &expr.kind {
        ExprKind::Literal(_) | ExprKind::Variable(_) => {}
        ExprKind::Tuple(items) => {
            for item in items {
                collect_variables(item, out);
            }
        }
        ExprKind::Object(entries) => {
            for (_, value) in entries {
                collect_variables(value, out);
            }
        }
        ExprKind::GetAttr { object, .. } => collect_variables(object, out),
        ExprKind::Index { object, index } => {
            collect_variables(object, out);
            collect_variables(index, out);
        }
        ExprKind::Call { args, .. } => {
            for arg in args {
                collect_variables(arg, out);
            }
        }
        ExprKind::Unary { operand, .. } => collect_variables(operand, out),
        ExprKind::Binary { left, right, .. } => {
            collect_variables(left, out);
            collect_variables(right, out);
        }
        ExprKind::Conditional {
            cond,
            then_value,
            else_value,
        } => {
            collect_variables(cond, out);
            collect_variables(then_value, out);
            collect_variables(else_value, out);
        }
    }
}

/// A rooted reference path: a root identifier plus constant steps.
#[derive(Debug, Clone, PartialEq)]
pub struct Traversal {
    pub root: String,
    pub steps: Vec<TravStep>,
}

impl Traversal {
    /// The top-level symbol this traversal references.
    pub fn root_name(&self) -> &str {
        &self.root
    }
}

/// One step of a traversal.
#[derive(Debug, Clone, PartialEq)]
pub enum TravStep {
    Attr(String),
    Index(Value),
}
