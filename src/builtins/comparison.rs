//! Comparison operations: =, <, >, <=, >=, not

use crate::env::Environment;
use crate::error::{Error, Result};
use crate::value::Value;
use lispy_macros::builtin;
use std::sync::Arc;

#[builtin(name = "=")]
/// Structural equality over all arguments: deep for collections, numeric
/// across the int/float boundary.
pub fn equal(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.len() < 2 {
        return Err(Error::arity("=", "at least 2", args.len()));
    }
    let first = &args[0];
    Ok(Value::Bool(args[1..].iter().all(|arg| arg == first)))
}

fn chain_compare(
    function: &str,
    args: &[Value],
    ok: fn(f64, f64) -> bool,
) -> Result<Value> {
    if args.len() < 2 {
        return Err(Error::arity(function, "at least 2", args.len()));
    }

    let mut numbers = Vec::with_capacity(args.len());
    for arg in args {
        match arg.as_number() {
            Some(n) => numbers.push(n),
            None => return Err(Error::type_mismatch(function, "a number", arg)),
        }
    }

    Ok(Value::Bool(
        numbers.windows(2).all(|pair| ok(pair[0], pair[1])),
    ))
}

#[builtin(name = "<")]
/// Numeric less-than, chained across all arguments.
pub fn less_than(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    chain_compare("<", args, |a, b| a < b)
}

#[builtin(name = ">")]
/// Numeric greater-than, chained across all arguments.
pub fn greater_than(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    chain_compare(">", args, |a, b| a > b)
}

#[builtin(name = "<=")]
/// Numeric less-than-or-equal, chained across all arguments.
pub fn less_than_or_equal(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    chain_compare("<=", args, |a, b| a <= b)
}

#[builtin(name = ">=")]
/// Numeric greater-than-or-equal, chained across all arguments.
pub fn greater_than_or_equal(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    chain_compare(">=", args, |a, b| a >= b)
}

#[builtin(name = "not")]
/// Logical negation by truthiness: nil and false become true.
pub fn not(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.len() != 1 {
        return Err(Error::arity("not", 1, args.len()));
    }
    Ok(Value::Bool(!args[0].is_truthy()))
}

/// Register all comparison builtins in the environment
pub fn register(env: &Arc<Environment>) {
    register_equal(env);
    register_less_than(env);
    register_greater_than(env);
    register_less_than_or_equal(env);
    register_greater_than_or_equal(env);
    register_not(env);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> Arc<Environment> {
        Environment::new()
    }

    #[test]
    fn test_equal_structural_and_numeric() {
        let e = env();
        assert_eq!(
            equal(&[Value::Int(1), Value::Float(1.0)], &e).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            equal(
                &[
                    Value::Vector(vec![Value::Int(1)]),
                    Value::Vector(vec![Value::Int(1)]),
                ],
                &e
            )
            .unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            equal(&[Value::Bool(true), Value::Int(1)], &e).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_chained_comparison() {
        let e = env();
        assert_eq!(
            less_than(&[Value::Int(1), Value::Int(2), Value::Int(3)], &e).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            less_than(&[Value::Int(1), Value::Int(3), Value::Int(2)], &e).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(
            less_than_or_equal(&[Value::Int(2), Value::Int(2)], &e).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_comparison_requires_numbers() {
        let e = env();
        assert!(matches!(
            greater_than(&[Value::Str("a".to_string()), Value::Int(1)], &e),
            Err(Error::Type(_))
        ));
    }

    #[test]
    fn test_not() {
        let e = env();
        assert_eq!(not(&[Value::Nil], &e).unwrap(), Value::Bool(true));
        assert_eq!(not(&[Value::Int(0)], &e).unwrap(), Value::Bool(false));
    }
}
