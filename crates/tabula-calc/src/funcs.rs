//! User-defined functions.
//!
//! A function record holds parameter names and a body expression. At
//! call time the record is turned into a context callable that binds the
//! arguments, shadows the function's own name with an always-failing
//! stub, and evaluates the body through the defining table's scheduler.
//!
//! Only direct self-recursion is blocked. Mutual recursion between two
//! user functions is not guarded and will not terminate if it is truly
//! cyclic at the value level.

use crate::table::Table;
use indexmap::IndexMap;
use tabula_expr::{CallError, Expression, FuncDef, Value};

/// A user-defined function: positional parameters, an optional variadic
/// tail, and a body expression. Parameters carry no static type; the
/// body checks them at call time.
#[derive(Debug, Clone, PartialEq)]
pub struct UserFunc {
    params: Vec<String>,
    var_param: Option<String>,
    body: Expression,
}

impl UserFunc {
    /// Build a record from a flat parameter list. When `variadic` is
    /// set, the last name becomes the variadic tail and receives the
    /// remaining arguments as a single tuple.
    pub(crate) fn new(mut params: Vec<String>, variadic: bool, body: Expression) -> Self {
        let var_param = if variadic { params.pop() } else { None };
        UserFunc {
            params,
            var_param,
            body,
        }
    }

}

/// Wrap `func` as a context callable that evaluates its body through
/// `table`.
pub(crate) fn bind<'t>(table: &'t Table, name: &str, func: &'t UserFunc) -> FuncDef<'t> {
    let name = name.to_string();
    FuncDef::Bound(Box::new(move |args: &[Value]| {
        call_user(table, &name, func, args)
    }))
}

fn call_user(
    table: &Table,
    name: &str,
    func: &UserFunc,
    args: &[Value],
) -> Result<Value, CallError> {
    let positional = func.params.len();
    if func.var_param.is_none() {
        if args.len() != positional {
            return Err(CallError::Message(format!(
                "function {name:?} expects {positional} argument(s), got {}",
                args.len()
            )));
        }
    } else if args.len() < positional {
        return Err(CallError::Message(format!(
            "function {name:?} expects at least {positional} argument(s), got {}",
            args.len()
        )));
    }

    let mut arg_vars = IndexMap::new();
    for (param, arg) in func.params.iter().zip(args) {
        arg_vars.insert(param.clone(), arg.clone());
    }
    if let Some(var_name) = &func.var_param {
        arg_vars.insert(var_name.clone(), Value::Tuple(args[positional..].to_vec()));
    }

    // Shadow the function's own name while the body runs so a direct
    // self-call fails instead of recursing forever.
    let mut extra_funcs = IndexMap::new();
    extra_funcs.insert(name.to_string(), no_self_call(name));

    let (result, diags) = table.eval_with(&func.body, arg_vars, extra_funcs);
    if diags.has_errors() {
        // A diagnostics list is itself an error, so it rides the error
        // channel whole; the evaluator recovers the records.
        return Err(CallError::Diagnostics(diags));
    }
    Ok(result)
}

/// An always-failing stub bound over a function's own name while its
/// body evaluates.
fn no_self_call(name: &str) -> FuncDef<'static> {
    let name = name.to_string();
    FuncDef::Bound(Box::new(move |_args: &[Value]| {
        Err(CallError::SelfCall(name.clone()))
    }))
}
