//! Layered evaluation scopes.
//!
//! A [`Context`] maps names to values and names to callables. Contexts
//! form a single-parent chain; lookup walks from the innermost layer
//! outward, so child layers shadow their parents. Every chain implicitly
//! bottoms out in the global built-in registry (see [`crate::funcs`]),
//! which is initialised once and never mutated.

use crate::diag::Diagnostics;
use crate::funcs;
use crate::value::Value;
use indexmap::IndexMap;
use std::fmt;
use thiserror::Error;

/// Error channel for function implementations.
///
/// A function body is itself evaluated and can fail with a whole list of
/// diagnostics; the list rides along in [`CallError::Diagnostics`] so the
/// evaluator can recover the individual records instead of flattening
/// them into one message.
#[derive(Debug, Error)]
pub enum CallError {
    /// A user-defined function body invoked the function itself.
    #[error("function {0:?} may not call itself")]
    SelfCall(String),

    /// Argument or value error raised by the implementation.
    #[error("{0}")]
    Message(String),

    /// Diagnostics produced while evaluating a function body.
    #[error("{0}")]
    Diagnostics(Diagnostics),
}

/// Signature shared by every callable: values in, value or error out.
pub type BuiltinFn = fn(&[Value]) -> Result<Value, CallError>;

/// A callable bound to caller state, such as a user-defined function
/// closed over its defining table.
pub type BoundFn<'a> = Box<dyn Fn(&[Value]) -> Result<Value, CallError> + Send + Sync + 'a>;

/// A function visible to expressions.
pub enum FuncDef<'a> {
    /// A pure built-in from the global registry.
    Builtin(BuiltinFn),
    /// A closure carrying its own captured state.
    Bound(BoundFn<'a>),
}

impl FuncDef<'_> {
    pub fn call(&self, args: &[Value]) -> Result<Value, CallError> {
        match self {
            FuncDef::Builtin(func) => func(args),
            FuncDef::Bound(func) => func(args),
        }
    }
}

impl fmt::Debug for FuncDef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FuncDef::Builtin(_) => f.write_str("FuncDef::Builtin(..)"),
            FuncDef::Bound(_) => f.write_str("FuncDef::Bound(..)"),
        }
    }
}

/// One layer of evaluation scope.
#[derive(Debug, Default)]
pub struct Context<'a> {
    pub variables: IndexMap<String, Value>,
    pub functions: IndexMap<String, FuncDef<'a>>,
    parent: Option<&'a Context<'a>>,
}

impl<'a> Context<'a> {
    /// A fresh root layer. Function lookup in a root still reaches the
    /// global built-ins.
    pub fn new() -> Self {
        Self::default()
    }

    /// A new empty layer whose lookups fall back to `self`.
    pub fn child<'b>(&'b self) -> Context<'b> {
        Context {
            variables: IndexMap::new(),
            functions: IndexMap::new(),
            parent: Some(self),
        }
    }

    /// Look up a variable, walking the parent chain.
    pub fn lookup_variable(&self, name: &str) -> Option<&Value> {
        match self.variables.get(name) {
            Some(value) => Some(value),
            None => self.parent.and_then(|p| p.lookup_variable(name)),
        }
    }

    /// Look up a function, walking the parent chain and then the global
    /// built-in registry.
    pub fn lookup_function(&self, name: &str) -> Option<&FuncDef<'_>> {
        if let Some(func) = self.functions.get(name) {
            return Some(func);
        }
        if let Some(parent) = self.parent {
            return parent.lookup_function(name);
        }
        funcs::builtin(name)
    }
}
