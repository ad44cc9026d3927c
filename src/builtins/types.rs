//! Type predicates and conversions
//!
//! Predicates follow the `is-<kind>?` naming of the language; conversions
//! are `to-int`, `to-float`, `to-str`, `to-bool`.

use crate::env::Environment;
use crate::error::{Error, Result};
use crate::value::Value;
use lispy_macros::builtin;
use std::sync::Arc;

fn one_arg<'a>(function: &str, args: &'a [Value]) -> Result<&'a Value> {
    if args.len() != 1 {
        return Err(Error::arity(function, 1, args.len()));
    }
    Ok(&args[0])
}

#[builtin(name = "is-nil?")]
/// Whether the value is nil.
pub fn is_nil(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    Ok(Value::Bool(matches!(one_arg("is-nil?", args)?, Value::Nil)))
}

#[builtin(name = "is-boolean?")]
/// Whether the value is a boolean.
pub fn is_boolean(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    Ok(Value::Bool(matches!(
        one_arg("is-boolean?", args)?,
        Value::Bool(_)
    )))
}

#[builtin(name = "is-number?")]
/// Whether the value is an int or a float.
pub fn is_number(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    Ok(Value::Bool(matches!(
        one_arg("is-number?", args)?,
        Value::Int(_) | Value::Float(_)
    )))
}

#[builtin(name = "is-string?")]
/// Whether the value is a string.
pub fn is_string(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    Ok(Value::Bool(matches!(
        one_arg("is-string?", args)?,
        Value::Str(_)
    )))
}

#[builtin(name = "is-list?")]
/// Whether the value is a list.
pub fn is_list(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    Ok(Value::Bool(matches!(
        one_arg("is-list?", args)?,
        Value::List(_)
    )))
}

#[builtin(name = "is-vector?")]
/// Whether the value is a vector.
pub fn is_vector(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    Ok(Value::Bool(matches!(
        one_arg("is-vector?", args)?,
        Value::Vector(_)
    )))
}

#[builtin(name = "is-map?")]
/// Whether the value is a map.
pub fn is_map(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    Ok(Value::Bool(matches!(one_arg("is-map?", args)?, Value::Map(_))))
}

#[builtin(name = "is-function?")]
/// Whether the value is callable (a function or a builtin).
pub fn is_function(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    Ok(Value::Bool(matches!(
        one_arg("is-function?", args)?,
        Value::Function(_) | Value::Builtin(_)
    )))
}

#[builtin(name = "is-promise?")]
/// Whether the value is a promise.
pub fn is_promise(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    Ok(Value::Bool(matches!(
        one_arg("is-promise?", args)?,
        Value::Promise(_)
    )))
}

#[builtin(name = "to-int")]
/// Converts numbers (truncating), numeric strings, and booleans to an int.
pub fn to_int(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    let value = one_arg("to-int", args)?;
    match value {
        Value::Int(n) => Ok(Value::Int(*n)),
        Value::Float(n) => Ok(Value::Int(*n as i64)),
        Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
        Value::Str(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .or_else(|_| {
                s.trim()
                    .parse::<f64>()
                    .map(|f| Value::Int(f as i64))
            })
            .map_err(|_| Error::Type(format!("'to-int' cannot convert \"{}\" to an int", s))),
        other => Err(Error::type_mismatch(
            "to-int",
            "a number, string, or boolean",
            other,
        )),
    }
}

#[builtin(name = "to-float")]
/// Converts numbers, numeric strings, and booleans to a float.
pub fn to_float(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    let value = one_arg("to-float", args)?;
    match value {
        Value::Int(n) => Ok(Value::Float(*n as f64)),
        Value::Float(n) => Ok(Value::Float(*n)),
        Value::Bool(b) => Ok(Value::Float(f64::from(u8::from(*b)))),
        Value::Str(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| Error::Type(format!("'to-float' cannot convert \"{}\" to a float", s))),
        other => Err(Error::type_mismatch(
            "to-float",
            "a number, string, or boolean",
            other,
        )),
    }
}

#[builtin(name = "to-str")]
/// Display form of any value (bare strings, readable collections).
pub fn to_str(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    Ok(Value::Str(one_arg("to-str", args)?.to_string()))
}

#[builtin(name = "to-bool")]
/// Truthiness as a boolean: only nil and false convert to false.
pub fn to_bool(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    Ok(Value::Bool(one_arg("to-bool", args)?.is_truthy()))
}

/// Register all type builtins in the environment
pub fn register(env: &Arc<Environment>) {
    register_is_nil(env);
    register_is_boolean(env);
    register_is_number(env);
    register_is_string(env);
    register_is_list(env);
    register_is_vector(env);
    register_is_map(env);
    register_is_function(env);
    register_is_promise(env);
    register_to_int(env);
    register_to_float(env);
    register_to_str(env);
    register_to_bool(env);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> Arc<Environment> {
        Environment::new()
    }

    #[test]
    fn test_predicates() {
        let e = env();
        assert_eq!(is_nil(&[Value::Nil], &e).unwrap(), Value::Bool(true));
        assert_eq!(
            is_number(&[Value::Float(1.5)], &e).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            is_vector(&[Value::List(vec![])], &e).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_to_int() {
        let e = env();
        assert_eq!(to_int(&[Value::Float(3.9)], &e).unwrap(), Value::Int(3));
        assert_eq!(
            to_int(&[Value::Str(" 42 ".to_string())], &e).unwrap(),
            Value::Int(42)
        );
        assert_eq!(to_int(&[Value::Bool(true)], &e).unwrap(), Value::Int(1));
        assert!(to_int(&[Value::Str("abc".to_string())], &e).is_err());
    }

    #[test]
    fn test_to_float_and_str() {
        let e = env();
        assert_eq!(
            to_float(&[Value::Int(2)], &e).unwrap(),
            Value::Float(2.0)
        );
        assert_eq!(
            to_str(&[Value::Vector(vec![Value::Int(1)])], &e).unwrap(),
            Value::Str("[1]".to_string())
        );
    }

    #[test]
    fn test_to_bool_uses_lispy_truthiness() {
        let e = env();
        assert_eq!(to_bool(&[Value::Int(0)], &e).unwrap(), Value::Bool(true));
        assert_eq!(
            to_bool(&[Value::Str(String::new())], &e).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(to_bool(&[Value::Nil], &e).unwrap(), Value::Bool(false));
    }
}
