//! String operations: str, split, join

use crate::env::Environment;
use crate::error::{Error, Result};
use crate::value::Value;
use lispy_macros::builtin;
use std::sync::Arc;

#[builtin(name = "str")]
/// Concatenates the display forms of all arguments; `(str)` is "".
/// Strings pass through unquoted, collections keep their readable form.
pub fn str_fn(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    let mut result = String::new();
    for arg in args {
        result.push_str(&arg.to_string());
    }
    Ok(Value::Str(result))
}

#[builtin(name = "split")]
/// `(split s separator)` - vector of pieces; an empty separator splits
/// into characters.
pub fn split(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.len() != 2 {
        return Err(Error::arity("split", 2, args.len()));
    }
    let s = match &args[0] {
        Value::Str(s) => s,
        other => return Err(Error::type_mismatch("split", "a string", other)),
    };
    let separator = match &args[1] {
        Value::Str(sep) => sep,
        other => return Err(Error::type_mismatch("split", "a string separator", other)),
    };

    let pieces: Vec<Value> = if separator.is_empty() {
        s.chars().map(|c| Value::Str(c.to_string())).collect()
    } else {
        s.split(separator.as_str())
            .map(|piece| Value::Str(piece.to_string()))
            .collect()
    };
    Ok(Value::Vector(pieces))
}

#[builtin(name = "join")]
/// `(join separator coll)` - joins display forms with the separator.
pub fn join(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.len() != 2 {
        return Err(Error::arity("join", 2, args.len()));
    }
    let separator = match &args[0] {
        Value::Str(sep) => sep,
        other => return Err(Error::type_mismatch("join", "a string separator", other)),
    };
    let items = match &args[1] {
        Value::List(items) | Value::Vector(items) => items,
        other => return Err(Error::type_mismatch("join", "a list or vector", other)),
    };

    let pieces: Vec<String> = items.iter().map(|item| item.to_string()).collect();
    Ok(Value::Str(pieces.join(separator)))
}

/// Register all string builtins in the environment
pub fn register(env: &Arc<Environment>) {
    register_str_fn(env);
    register_split(env);
    register_join(env);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> Arc<Environment> {
        Environment::new()
    }

    #[test]
    fn test_str_concatenates_display_forms() {
        let e = env();
        assert_eq!(
            str_fn(
                &[
                    Value::Str("n = ".to_string()),
                    Value::Int(42),
                    Value::Str("!".to_string()),
                ],
                &e
            )
            .unwrap(),
            Value::Str("n = 42!".to_string())
        );
        assert_eq!(str_fn(&[], &e).unwrap(), Value::Str(String::new()));
        assert_eq!(
            str_fn(&[Value::Nil, Value::Bool(true)], &e).unwrap(),
            Value::Str("niltrue".to_string())
        );
    }

    #[test]
    fn test_split() {
        let e = env();
        assert_eq!(
            split(
                &[
                    Value::Str("a,b,c".to_string()),
                    Value::Str(",".to_string()),
                ],
                &e
            )
            .unwrap(),
            Value::Vector(vec![
                Value::Str("a".to_string()),
                Value::Str("b".to_string()),
                Value::Str("c".to_string()),
            ])
        );
        assert_eq!(
            split(
                &[Value::Str("ab".to_string()), Value::Str("".to_string())],
                &e
            )
            .unwrap(),
            Value::Vector(vec![
                Value::Str("a".to_string()),
                Value::Str("b".to_string()),
            ])
        );
    }

    #[test]
    fn test_join() {
        let e = env();
        assert_eq!(
            join(
                &[
                    Value::Str("-".to_string()),
                    Value::Vector(vec![Value::Int(1), Value::Int(2), Value::Int(3)]),
                ],
                &e
            )
            .unwrap(),
            Value::Str("1-2-3".to_string())
        );
    }
}
