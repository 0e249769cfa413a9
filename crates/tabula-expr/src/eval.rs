//! Tree-walking evaluation.
//!
//! Evaluation never aborts: every failure is recorded as a diagnostic and
//! the failing node yields an unknown value, so the rest of the tree (and
//! the rest of a batch) still runs. Unknown operands likewise flow
//! through every operation as unknowns of the best type available, with
//! no diagnostic.

use crate::ast::{BinaryOp, Expr, ExprKind, UnaryOp};
use crate::context::{CallError, Context};
use crate::diag::{Diagnostic, DiagnosticKind, Diagnostics, Subject};
use crate::span::Span;
use crate::value::{Type, Value};

/// Source being evaluated, for diagnostic subjects.
pub(crate) struct Scope<'s> {
    pub src: &'s str,
    pub label: &'s str,
}

impl Scope<'_> {
    fn error(
        &self,
        diags: &mut Diagnostics,
        kind: DiagnosticKind,
        span: Span,
        summary: &str,
        detail: String,
    ) {
        diags.push(
            Diagnostic::error(kind, summary, detail)
                .with_subject(Subject::new(self.label, self.src, span)),
        );
    }
}

pub(crate) fn evaluate(
    expr: &Expr,
    scope: &Scope<'_>,
    ctx: &Context<'_>,
    diags: &mut Diagnostics,
) -> Value {
    match &expr.kind {
        ExprKind::Literal(value) => value.clone(),

        ExprKind::Tuple(items) => Value::Tuple(
            items
                .iter()
                .map(|item| evaluate(item, scope, ctx, diags))
                .collect(),
        ),

        ExprKind::Object(entries) => Value::Object(
            entries
                .iter()
                .map(|(key, value)| (key.clone(), evaluate(value, scope, ctx, diags)))
                .collect(),
        ),

        ExprKind::Variable(name) => match ctx.lookup_variable(name) {
            Some(value) => value.clone(),
            None => {
                scope.error(
                    diags,
                    DiagnosticKind::EvalType,
                    expr.span,
                    "Unknown variable",
                    format!("There is no variable named {name:?}."),
                );
                Value::unknown()
            }
        },

        ExprKind::GetAttr { object, name } => {
            let object = evaluate(object, scope, ctx, diags);
            get_attr(object, name, expr.span, scope, diags)
        }

        ExprKind::Index { object, index } => {
            let object = evaluate(object, scope, ctx, diags);
            let index = evaluate(index, scope, ctx, diags);
            get_index(object, index, expr.span, scope, diags)
        }

        ExprKind::Call { name, args } => {
            let args: Vec<Value> = args
                .iter()
                .map(|arg| evaluate(arg, scope, ctx, diags))
                .collect();
            call(name, &args, expr.span, scope, ctx, diags)
        }

        ExprKind::Unary { op, operand } => {
            let operand = evaluate(operand, scope, ctx, diags);
            unary(*op, operand, expr.span, scope, diags)
        }

        ExprKind::Binary { op, left, right } => {
            let left = evaluate(left, scope, ctx, diags);
            let right = evaluate(right, scope, ctx, diags);
            binary(*op, left, right, expr.span, scope, diags)
        }

        ExprKind::Conditional {
            cond,
            then_value,
            else_value,
        } => {
            let cond = evaluate(cond, scope, ctx, diags);
            match cond {
                Value::Bool(true) => evaluate(then_value, scope, ctx, diags),
                Value::Bool(false) => evaluate(else_value, scope, ctx, diags),
                Value::Unknown(_) => Value::unknown(),
                other => {
                    scope.error(
                        diags,
                        DiagnosticKind::EvalType,
                        expr.span,
                        "Invalid condition",
                        format!(
                            "The condition of a conditional expression must be a bool, not {}.",
                            other.type_of().friendly_name()
                        ),
                    );
                    Value::unknown()
                }
            }
        }
    }
}

fn get_attr(
    object: Value,
    name: &str,
    span: Span,
    scope: &Scope<'_>,
    diags: &mut Diagnostics,
) -> Value {
    match object {
        Value::Object(attrs) => match attrs.get(name) {
            Some(value) => value.clone(),
            None => {
                scope.error(
                    diags,
                    DiagnosticKind::EvalType,
                    span,
                    "Unsupported attribute",
                    format!("This object does not have an attribute named {name:?}."),
                );
                Value::unknown()
            }
        },
        Value::Unknown(Type::Object(attr_types)) => match attr_types.get(name) {
            Some(ty) => Value::unknown_of(ty.clone()),
            None => {
                scope.error(
                    diags,
                    DiagnosticKind::EvalType,
                    span,
                    "Unsupported attribute",
                    format!("This object does not have an attribute named {name:?}."),
                );
                Value::unknown()
            }
        },
        Value::Unknown(_) => Value::unknown(),
        other => {
            scope.error(
                diags,
                DiagnosticKind::EvalType,
                span,
                "Unsupported attribute",
                format!(
                    "Only objects have named attributes; this value is a {}.",
                    other.type_of().friendly_name()
                ),
            );
            Value::unknown()
        }
    }
}

fn get_index(
    object: Value,
    index: Value,
    span: Span,
    scope: &Scope<'_>,
    diags: &mut Diagnostics,
) -> Value {
    if object.is_unknown() || index.is_unknown() {
        return Value::unknown();
    }
    match (&object, &index) {
        (Value::Tuple(items), Value::Number(n)) => {
            let i = *n;
            if i.fract() == 0.0 && i >= 0.0 && (i as usize) < items.len() {
                items[i as usize].clone()
            } else {
                scope.error(
                    diags,
                    DiagnosticKind::EvalType,
                    span,
                    "Invalid index",
                    format!("The given index {i} is outside this tuple's bounds."),
                );
                Value::unknown()
            }
        }
        (Value::Object(attrs), Value::String(key)) => match attrs.get(key) {
            Some(value) => value.clone(),
            None => {
                scope.error(
                    diags,
                    DiagnosticKind::EvalType,
                    span,
                    "Invalid index",
                    format!("This object does not have an attribute named {key:?}."),
                );
                Value::unknown()
            }
        },
        (Value::Tuple(_), other) => {
            scope.error(
                diags,
                DiagnosticKind::EvalType,
                span,
                "Invalid index",
                format!(
                    "Tuples are indexed by number, not by {}.",
                    other.type_of().friendly_name()
                ),
            );
            Value::unknown()
        }
        (Value::Object(_), other) => {
            scope.error(
                diags,
                DiagnosticKind::EvalType,
                span,
                "Invalid index",
                format!(
                    "Objects are indexed by string, not by {}.",
                    other.type_of().friendly_name()
                ),
            );
            Value::unknown()
        }
        (other, _) => {
            scope.error(
                diags,
                DiagnosticKind::EvalType,
                span,
                "Invalid index",
                format!(
                    "Only tuples and objects may be indexed; this value is a {}.",
                    other.type_of().friendly_name()
                ),
            );
            Value::unknown()
        }
    }
}

fn call(
    name: &str,
    args: &[Value],
    span: Span,
    scope: &Scope<'_>,
    ctx: &Context<'_>,
    diags: &mut Diagnostics,
) -> Value {
    let Some(func) = ctx.lookup_function(name) else {
        scope.error(
            diags,
            DiagnosticKind::EvalType,
            span,
            "Call to unknown function",
            format!("There is no function named {name:?}."),
        );
        return Value::unknown();
    };

    // An unknown argument makes the result unknown without running the
    // implementation.
    if args.iter().any(Value::is_unknown) {
        return Value::unknown();
    }

    match func.call(args) {
        Ok(value) => value,
        Err(CallError::SelfCall(func_name)) => {
            scope.error(
                diags,
                DiagnosticKind::SelfCall,
                span,
                "Error in function call",
                format!(
                    "Call to function {name:?} failed: function {func_name:?} may not call itself."
                ),
            );
            Value::unknown()
        }
        Err(CallError::Message(message)) => {
            scope.error(
                diags,
                DiagnosticKind::EvalType,
                span,
                "Error in function call",
                format!("Call to function {name:?} failed: {message}."),
            );
            Value::unknown()
        }
        // Recover the structured records rather than flattening them.
        Err(CallError::Diagnostics(body_diags)) => {
            diags.extend(body_diags);
            Value::unknown()
        }
    }
}

fn unary(op: UnaryOp, operand: Value, span: Span, scope: &Scope<'_>, diags: &mut Diagnostics) -> Value {
    match op {
        UnaryOp::Neg => match operand {
            Value::Number(n) => Value::Number(-n),
            Value::Unknown(_) => Value::unknown_of(Type::Number),
            other => {
                scope.error(
                    diags,
                    DiagnosticKind::EvalType,
                    span,
                    "Invalid operand",
                    format!(
                        "Unary `-` requires a number, not {}.",
                        other.type_of().friendly_name()
                    ),
                );
                Value::unknown()
            }
        },
        UnaryOp::Not => match operand {
            Value::Bool(b) => Value::Bool(!b),
            Value::Unknown(_) => Value::unknown_of(Type::Bool),
            other => {
                scope.error(
                    diags,
                    DiagnosticKind::EvalType,
                    span,
                    "Invalid operand",
                    format!(
                        "Unary `!` requires a bool, not {}.",
                        other.type_of().friendly_name()
                    ),
                );
                Value::unknown()
            }
        },
    }
}

fn binary(
    op: BinaryOp,
    left: Value,
    right: Value,
    span: Span,
    scope: &Scope<'_>,
    diags: &mut Diagnostics,
) -> Value {
    match op {
        BinaryOp::Eq | BinaryOp::Ne => {
            if left.is_unknown() || right.is_unknown() {
                return Value::unknown_of(Type::Bool);
            }
            let equal = left == right;
            Value::Bool(if op == BinaryOp::Eq { equal } else { !equal })
        }

        BinaryOp::And | BinaryOp::Or => {
            match (bool_operand(&left), bool_operand(&right)) {
                (Some(None), _) | (_, Some(None)) => Value::unknown_of(Type::Bool),
                (Some(Some(l)), Some(Some(r))) => Value::Bool(match op {
                    BinaryOp::And => l && r,
                    _ => l || r,
                }),
                _ => {
                    invalid_operands(op, &left, &right, span, scope, diags);
                    Value::unknown()
                }
            }
        }

        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            match (number_operand(&left), number_operand(&right)) {
                (Some(None), _) | (_, Some(None)) => Value::unknown_of(Type::Bool),
                (Some(Some(l)), Some(Some(r))) => Value::Bool(match op {
                    BinaryOp::Lt => l < r,
                    BinaryOp::Le => l <= r,
                    BinaryOp::Gt => l > r,
                    _ => l >= r,
                }),
                _ => {
                    invalid_operands(op, &left, &right, span, scope, diags);
                    Value::unknown()
                }
            }
        }

        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            match (number_operand(&left), number_operand(&right)) {
                (Some(None), _) | (_, Some(None)) => Value::unknown_of(Type::Number),
                (Some(Some(l)), Some(Some(r))) => {
                    if matches!(op, BinaryOp::Div | BinaryOp::Rem) && r == 0.0 {
                        scope.error(
                            diags,
                            DiagnosticKind::EvalType,
                            span,
                            "Division by zero",
                            "The right-hand operand of a division must not be zero.".to_string(),
                        );
                        return Value::unknown_of(Type::Number);
                    }
                    Value::Number(match op {
                        BinaryOp::Add => l + r,
                        BinaryOp::Sub => l - r,
                        BinaryOp::Mul => l * r,
                        BinaryOp::Div => l / r,
                        _ => l % r,
                    })
                }
                _ => {
                    invalid_operands(op, &left, &right, span, scope, diags);
                    Value::unknown()
                }
            }
        }
    }
}

/// `None`: wrong type. `Some(None)`: unknown. `Some(Some(b))`: a bool.
fn bool_operand(value: &Value) -> Option<Option<bool>> {
    match value {
        Value::Bool(b) => Some(Some(*b)),
        Value::Unknown(_) => Some(None),
        _ => None,
    }
}

fn number_operand(value: &Value) -> Option<Option<f64>> {
    match value {
        Value::Number(n) => Some(Some(*n)),
        Value::Unknown(_) => Some(None),
        _ => None,
    }
}

fn invalid_operands(
    op: BinaryOp,
    left: &Value,
    right: &Value,
    span: Span,
    scope: &Scope<'_>,
    diags: &mut Diagnostics,
) {
    let wanted = match op {
        BinaryOp::And | BinaryOp::Or => "bool",
        _ => "number",
    };
    scope.error(
        diags,
        DiagnosticKind::EvalType,
        span,
        "Invalid operand",
        format!(
            "This operator requires {wanted} operands; got {} and {}.",
            left.type_of().friendly_name(),
            right.type_of().friendly_name()
        ),
    );
}
