//! The global registry of built-in functions.
//!
//! Built-ins are pure `fn` pointers registered once in a process-wide
//! table that every evaluation context falls back to. The registry is
//! never mutated after initialisation.
//!
//! None of these implementations see unknown arguments: the evaluator
//! short-circuits a call to an unknown result before invoking it.

use crate::context::{BuiltinFn, CallError, FuncDef};
use crate::value::{Type, Value};
use indexmap::IndexMap;
use std::sync::LazyLock;

static BUILTINS: LazyLock<IndexMap<&'static str, FuncDef<'static>>> = LazyLock::new(|| {
    let entries: &[(&'static str, BuiltinFn)] = &[
        ("coalesce", coalesce),
        ("concat", concat),
        ("format", format_fn),
        ("formatlist", formatlist),
        ("hasindex", hasindex),
        ("int", int),
        ("jsondecode", jsondecode),
        ("jsonencode", jsonencode),
        ("length", length),
        ("lower", lower),
        ("max", max),
        ("min", min),
        ("reverse", reverse),
        ("strlen", strlen),
        ("substr", substr),
        ("upper", upper),
    ];
    entries
        .iter()
        .map(|&(name, func)| (name, FuncDef::Builtin(func)))
        .collect()
});

/// Look up a built-in by name.
pub fn builtin(name: &str) -> Option<&'static FuncDef<'static>> {
    BUILTINS.get(name)
}

/// Names of every registered built-in.
pub fn builtin_names() -> impl Iterator<Item = &'static str> {
    BUILTINS.keys().copied()
}

fn err(msg: impl Into<String>) -> CallError {
    CallError::Message(msg.into())
}

fn arity(args: &[Value], n: usize, what: &str) -> Result<(), CallError> {
    if args.len() != n {
        return Err(err(format!("expected {n} {what}, got {}", args.len())));
    }
    Ok(())
}

fn number_arg(args: &[Value], i: usize) -> Result<f64, CallError> {
    args[i].as_number().ok_or_else(|| {
        err(format!(
            "argument {} must be a number, not {}",
            i + 1,
            args[i].type_of().friendly_name()
        ))
    })
}

fn string_arg(args: &[Value], i: usize) -> Result<&str, CallError> {
    args[i].as_str().ok_or_else(|| {
        err(format!(
            "argument {} must be a string, not {}",
            i + 1,
            args[i].type_of().friendly_name()
        ))
    })
}

/// First non-null argument.
fn coalesce(args: &[Value]) -> Result<Value, CallError> {
    if args.is_empty() {
        return Err(err("expected at least 1 argument, got 0"));
    }
    for arg in args {
        if !arg.is_null() {
            return Ok(arg.clone());
        }
    }
    Err(err("all arguments were null"))
}

/// Concatenate tuples into one tuple.
fn concat(args: &[Value]) -> Result<Value, CallError> {
    if args.is_empty() {
        return Err(err("expected at least 1 argument, got 0"));
    }
    let mut items = Vec::new();
    for arg in args {
        match arg {
            Value::Tuple(elems) => items.extend(elems.iter().cloned()),
            other => {
                return Err(err(format!(
                    "all arguments must be tuples; got {}",
                    other.type_of().friendly_name()
                )))
            }
        }
    }
    Ok(Value::Tuple(items))
}

/// Render one printf-style verb against an argument.
fn format_verb(verb: char, arg: &Value) -> Result<String, CallError> {
    match verb {
        's' => Ok(match arg {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }),
        'd' => arg
            .as_number()
            .map(|n| format!("{}", n.trunc() as i64))
            .ok_or_else(|| {
                err(format!(
                    "%d requires a number, not {}",
                    arg.type_of().friendly_name()
                ))
            }),
        'f' => arg.as_number().map(|n| format!("{n:.6}")).ok_or_else(|| {
            err(format!(
                "%f requires a number, not {}",
                arg.type_of().friendly_name()
            ))
        }),
        'v' => Ok(arg.to_string()),
        other => Err(err(format!("unsupported format verb %{other}"))),
    }
}

fn format_impl(fmt: &str, args: &[Value]) -> Result<String, CallError> {
    let mut out = String::new();
    let mut chars = fmt.chars();
    let mut next_arg = 0;
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('%') => out.push('%'),
            Some(verb) => {
                let arg = args
                    .get(next_arg)
                    .ok_or_else(|| err(format!("not enough arguments for %{verb}")))?;
                next_arg += 1;
                out.push_str(&format_verb(verb, arg)?);
            }
            None => return Err(err("format string ends with an incomplete verb")),
        }
    }
    if next_arg < args.len() {
        return Err(err(format!(
            "{} unused argument(s) after the format string",
            args.len() - next_arg
        )));
    }
    Ok(out)
}

/// printf-style formatting: `%s`, `%d`, `%f`, `%v`, `%%`.
fn format_fn(args: &[Value]) -> Result<Value, CallError> {
    if args.is_empty() {
        return Err(err("expected at least 1 argument, got 0"));
    }
    if args.iter().any(|a| !a.is_wholly_known()) {
        return Ok(Value::unknown_of(Type::String));
    }
    let fmt = string_arg(args, 0)?;
    format_impl(fmt, &args[1..]).map(Value::String)
}

/// Apply a format string across lists element-wise, producing a tuple of
/// strings. Scalar arguments repeat; list arguments must share a length.
fn formatlist(args: &[Value]) -> Result<Value, CallError> {
    if args.is_empty() {
        return Err(err("expected at least 1 argument, got 0"));
    }
    if args.iter().any(|a| !a.is_wholly_known()) {
        return Ok(Value::unknown());
    }
    let fmt = string_arg(args, 0)?;
    let rest = &args[1..];

    let mut len: Option<usize> = None;
    for arg in rest {
        if let Value::Tuple(items) = arg {
            match len {
                None => len = Some(items.len()),
                Some(n) if n == items.len() => {}
                Some(n) => {
                    return Err(err(format!(
                        "list arguments must share a length; got {n} and {}",
                        items.len()
                    )))
                }
            }
        }
    }

    let count = len.unwrap_or(1);
    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let row: Vec<Value> = rest
            .iter()
            .map(|arg| match arg {
                Value::Tuple(items) => items[i].clone(),
                scalar => scalar.clone(),
            })
            .collect();
        out.push(Value::String(format_impl(fmt, &row)?));
    }
    Ok(Value::Tuple(out))
}

/// Whether a collection has the given index or attribute.
fn hasindex(args: &[Value]) -> Result<Value, CallError> {
    arity(args, 2, "arguments")?;
    let has = match (&args[0], &args[1]) {
        (Value::Tuple(items), Value::Number(n)) => {
            let i = *n;
            i.fract() == 0.0 && i >= 0.0 && (i as usize) < items.len()
        }
        (Value::Object(attrs), Value::String(key)) => attrs.contains_key(key),
        _ => false,
    };
    Ok(Value::Bool(has))
}

/// Truncate a number toward zero.
fn int(args: &[Value]) -> Result<Value, CallError> {
    arity(args, 1, "argument")?;
    Ok(Value::Number(number_arg(args, 0)?.trunc()))
}

/// Parse a JSON document into a value.
fn jsondecode(args: &[Value]) -> Result<Value, CallError> {
    arity(args, 1, "argument")?;
    let src = string_arg(args, 0)?;
    let json: serde_json::Value =
        serde_json::from_str(src).map_err(|e| err(format!("invalid JSON: {e}")))?;
    Ok(Value::from_json(json))
}

/// Encode a value as a compact JSON document.
fn jsonencode(args: &[Value]) -> Result<Value, CallError> {
    arity(args, 1, "argument")?;
    match args[0].to_json() {
        Some(json) => serde_json::to_string(&json)
            .map(Value::String)
            .map_err(|e| err(e.to_string())),
        // Not wholly known yet, so neither is its encoding.
        None => Ok(Value::unknown_of(Type::String)),
    }
}

/// Element count of a tuple or object.
fn length(args: &[Value]) -> Result<Value, CallError> {
    arity(args, 1, "argument")?;
    match args[0].collection_len() {
        Some(n) => Ok(Value::Number(n as f64)),
        None => Err(err(format!(
            "argument must be a tuple or object, not {}",
            args[0].type_of().friendly_name()
        ))),
    }
}

fn lower(args: &[Value]) -> Result<Value, CallError> {
    arity(args, 1, "argument")?;
    Ok(Value::String(string_arg(args, 0)?.to_lowercase()))
}

fn upper(args: &[Value]) -> Result<Value, CallError> {
    arity(args, 1, "argument")?;
    Ok(Value::String(string_arg(args, 0)?.to_uppercase()))
}

fn fold_numbers(args: &[Value], pick: fn(f64, f64) -> f64) -> Result<Value, CallError> {
    if args.is_empty() {
        return Err(err("expected at least 1 argument, got 0"));
    }
    let mut acc = number_arg(args, 0)?;
    for i in 1..args.len() {
        acc = pick(acc, number_arg(args, i)?);
    }
    Ok(Value::Number(acc))
}

fn max(args: &[Value]) -> Result<Value, CallError> {
    fold_numbers(args, f64::max)
}

fn min(args: &[Value]) -> Result<Value, CallError> {
    fold_numbers(args, f64::min)
}

/// Reverse a string, character by character.
fn reverse(args: &[Value]) -> Result<Value, CallError> {
    arity(args, 1, "argument")?;
    Ok(Value::String(string_arg(args, 0)?.chars().rev().collect()))
}

/// Character count of a string.
fn strlen(args: &[Value]) -> Result<Value, CallError> {
    arity(args, 1, "argument")?;
    Ok(Value::Number(string_arg(args, 0)?.chars().count() as f64))
}

/// Substring by character offset and length. A negative offset counts
/// back from the end; a negative length takes the rest of the string.
fn substr(args: &[Value]) -> Result<Value, CallError> {
    arity(args, 3, "arguments")?;
    let chars: Vec<char> = string_arg(args, 0)?.chars().collect();
    let offset = number_arg(args, 1)?.trunc() as i64;
    let length = number_arg(args, 2)?.trunc() as i64;

    let start = if offset < 0 {
        (chars.len() as i64 + offset).max(0) as usize
    } else {
        (offset as usize).min(chars.len())
    };
    let end = if length < 0 {
        chars.len()
    } else {
        (start + length as usize).min(chars.len())
    };
    Ok(Value::String(chars[start..end].iter().collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Value {
        Value::Number(n)
    }

    fn s(text: &str) -> Value {
        Value::String(text.into())
    }

    fn call(name: &str, args: &[Value]) -> Result<Value, CallError> {
        builtin(name).expect("not a builtin").call(args)
    }

    #[test]
    fn registry_has_all_names() {
        let names: Vec<_> = builtin_names().collect();
        assert_eq!(names.len(), 16);
        for name in [
            "coalesce",
            "concat",
            "format",
            "formatlist",
            "hasindex",
            "int",
            "jsondecode",
            "jsonencode",
            "length",
            "lower",
            "max",
            "min",
            "reverse",
            "strlen",
            "substr",
            "upper",
        ] {
            assert!(builtin(name).is_some(), "missing builtin {name}");
        }
    }

    #[test]
    fn coalesce_picks_first_non_null() {
        assert_eq!(
            call("coalesce", &[Value::Null, num(2.0), num(3.0)]).unwrap(),
            num(2.0)
        );
        assert!(call("coalesce", &[Value::Null]).is_err());
    }

    #[test]
    fn concat_flattens_tuples() {
        let a = Value::Tuple(vec![num(1.0)]);
        let b = Value::Tuple(vec![num(2.0), num(3.0)]);
        assert_eq!(
            call("concat", &[a, b]).unwrap(),
            Value::Tuple(vec![num(1.0), num(2.0), num(3.0)])
        );
        assert!(call("concat", &[num(1.0)]).is_err());
    }

    #[test]
    fn format_verbs() {
        assert_eq!(
            call("format", &[s("%s is %d%%"), s("x"), num(7.0)]).unwrap(),
            s("x is 7%")
        );
        assert_eq!(
            call("format", &[s("%v"), Value::Tuple(vec![num(1.0)])]).unwrap(),
            s("[1]")
        );
        assert!(call("format", &[s("%d"), s("nope")]).is_err());
        assert!(call("format", &[s("%s")]).is_err());
        assert!(call("format", &[s("%s"), s("a"), s("b")]).is_err());
    }

    #[test]
    fn formatlist_cycles_scalars() {
        let hosts = Value::Tuple(vec![s("a"), s("b")]);
        assert_eq!(
            call("formatlist", &[s("%s:%d"), hosts, num(80.0)]).unwrap(),
            Value::Tuple(vec![s("a:80"), s("b:80")])
        );
    }

    #[test]
    fn formatlist_rejects_ragged_lists() {
        let two = Value::Tuple(vec![num(1.0), num(2.0)]);
        let three = Value::Tuple(vec![num(1.0), num(2.0), num(3.0)]);
        assert!(call("formatlist", &[s("%d%d"), two, three]).is_err());
    }

    #[test]
    fn hasindex_checks_bounds_and_keys() {
        let tuple = Value::Tuple(vec![num(1.0), num(2.0)]);
        assert_eq!(
            call("hasindex", &[tuple.clone(), num(1.0)]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            call("hasindex", &[tuple, num(2.0)]).unwrap(),
            Value::Bool(false)
        );

        let mut attrs = IndexMap::new();
        attrs.insert("k".to_string(), num(1.0));
        let object = Value::Object(attrs);
        assert_eq!(
            call("hasindex", &[object.clone(), s("k")]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            call("hasindex", &[object, num(0.0)]).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn int_truncates_toward_zero() {
        assert_eq!(call("int", &[num(2.9)]).unwrap(), num(2.0));
        assert_eq!(call("int", &[num(-2.9)]).unwrap(), num(-2.0));
    }

    #[test]
    fn json_round_trip() {
        let encoded = call("jsonencode", &[Value::Tuple(vec![num(1.0), s("x")])]).unwrap();
        assert_eq!(encoded, s(r#"[1,"x"]"#));
        let decoded = call("jsondecode", &[encoded]).unwrap();
        assert_eq!(decoded, Value::Tuple(vec![num(1.0), s("x")]));
        assert!(call("jsondecode", &[s("{nope")]).is_err());
    }

    #[test]
    fn jsonencode_of_partial_value_is_unknown() {
        let partial = Value::Tuple(vec![num(1.0), Value::unknown()]);
        assert_eq!(
            call("jsonencode", &[partial]).unwrap(),
            Value::unknown_of(Type::String)
        );
    }

    #[test]
    fn length_counts_collections() {
        assert_eq!(
            call("length", &[Value::Tuple(vec![num(1.0), num(2.0)])]).unwrap(),
            num(2.0)
        );
        assert!(call("length", &[s("abc")]).is_err());
    }

    #[test]
    fn string_helpers() {
        assert_eq!(call("lower", &[s("AbC")]).unwrap(), s("abc"));
        assert_eq!(call("upper", &[s("AbC")]).unwrap(), s("ABC"));
        assert_eq!(call("reverse", &[s("abc")]).unwrap(), s("cba"));
        assert_eq!(call("strlen", &[s("héllo")]).unwrap(), num(5.0));
    }

    #[test]
    fn substr_offsets() {
        assert_eq!(
            call("substr", &[s("hello"), num(1.0), num(3.0)]).unwrap(),
            s("ell")
        );
        assert_eq!(
            call("substr", &[s("hello"), num(-3.0), num(-1.0)]).unwrap(),
            s("llo")
        );
        assert_eq!(
            call("substr", &[s("hello"), num(3.0), num(99.0)]).unwrap(),
            s("lo")
        );
    }

    #[test]
    fn extrema() {
        assert_eq!(call("max", &[num(1.0), num(9.0), num(4.0)]).unwrap(), num(9.0));
        assert_eq!(call("min", &[num(1.0), num(9.0), num(4.0)]).unwrap(), num(1.0));
        assert!(call("max", &[]).is_err());
    }
}
