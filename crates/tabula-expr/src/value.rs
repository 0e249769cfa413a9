//! The dynamic value domain.
//!
//! Values are tagged variants with a distinguished [`Value::Unknown`]
//! placeholder: a value whose type may be known but whose content is not
//! yet determined. Unknowns arise from undefined symbols and dependency
//! cycles and propagate through every operation instead of failing it.
//!
//! [`Type::Dynamic`] is the pseudo-type that opts out of checking
//! entirely; `Value::Unknown(Type::Dynamic)` is the fully-opaque unknown
//! used as the result of failed evaluations.

use indexmap::IndexMap;
use std::fmt;

/// Shape of a value.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Null,
    Bool,
    Number,
    String,
    Tuple(Vec<Type>),
    Object(IndexMap<String, Type>),
    /// No static constraint; the real type is decided at use time.
    Dynamic,
}

impl Type {
    /// Short name for error messages.
    pub fn friendly_name(&self) -> &'static str {
        match self {
            Type::Null => "null",
            Type::Bool => "bool",
            Type::Number => "number",
            Type::String => "string",
            Type::Tuple(_) => "tuple",
            Type::Object(_) => "object",
            Type::Dynamic => "dynamic",
        }
    }
}

/// A dynamically-typed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Tuple(Vec<Value>),
    Object(IndexMap<String, Value>),
    /// Placeholder for a value of the given type that is not yet known.
    Unknown(Type),
}

impl Value {
    /// The fully-opaque unknown: unknown value of unknown type.
    pub fn unknown() -> Self {
        Value::Unknown(Type::Dynamic)
    }

    pub fn unknown_of(ty: Type) -> Self {
        Value::Unknown(ty)
    }

    pub fn type_of(&self) -> Type {
        match self {
            Value::Null => Type::Null,
            Value::Bool(_) => Type::Bool,
            Value::Number(_) => Type::Number,
            Value::String(_) => Type::String,
            Value::Tuple(items) => Type::Tuple(items.iter().map(Value::type_of).collect()),
            Value::Object(attrs) => Type::Object(
                attrs
                    .iter()
                    .map(|(k, v)| (k.clone(), v.type_of()))
                    .collect(),
            ),
            Value::Unknown(ty) => ty.clone(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Value::Unknown(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// False iff any nested value is unknown.
    pub fn is_wholly_known(&self) -> bool {
        match self {
            Value::Unknown(_) => false,
            Value::Tuple(items) => items.iter().all(Value::is_wholly_known),
            Value::Object(attrs) => attrs.values().all(Value::is_wholly_known),
            _ => true,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Element count of a tuple or object.
    pub fn collection_len(&self) -> Option<usize> {
        match self {
            Value::Tuple(items) => Some(items.len()),
            Value::Object(attrs) => Some(attrs.len()),
            _ => None,
        }
    }

    /// Convert to a JSON value. Returns `None` unless wholly known.
    ///
    /// Whole numbers convert to JSON integers so that `1 + 1` prints as
    /// `2` rather than `2.0`.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        match self {
            Value::Null => Some(serde_json::Value::Null),
            Value::Bool(b) => Some(serde_json::Value::Bool(*b)),
            Value::Number(n) => Some(number_to_json(*n)),
            Value::String(s) => Some(serde_json::Value::String(s.clone())),
            Value::Tuple(items) => items
                .iter()
                .map(Value::to_json)
                .collect::<Option<Vec<_>>>()
                .map(serde_json::Value::Array),
            Value::Object(attrs) => attrs
                .iter()
                .map(|(k, v)| v.to_json().map(|j| (k.clone(), j)))
                .collect::<Option<serde_json::Map<_, _>>>()
                .map(serde_json::Value::Object),
            Value::Unknown(_) => None,
        }
    }

    /// Build a value from decoded JSON.
    pub fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Tuple(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(attrs) => Value::Object(
                attrs
                    .into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            ),
        }
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.is_finite() && n.abs() <= i64::MAX as f64 {
        serde_json::Value::Number(serde_json::Number::from(n as i64))
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_json() {
            Some(json) => write!(f, "{json}"),
            None => write!(f, "(unknown {})", self.type_of().friendly_name()),
        }
    }
}
