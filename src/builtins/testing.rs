//! BDD assertion builtins
//!
//! Assertions raise an assertion failure on mismatch. Unlike thrown values,
//! assertion failures are never caught by `try`/`catch`; they propagate to
//! the driver.

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

#[builtin(name = "assert-true?")]
/// Passes when the value is exactly true.
pub fn assert_true(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    let value = one_arg("assert-true?", args)?;
    match value {
        Value::Bool(true) => Ok(Value::Bool(true)),
        other => Err(Error::Assertion(format!(
            "expected true, got {}",
            other.repr()
        ))),
    }
}

#[builtin(name = "assert-false?")]
/// Passes when the value is exactly false.
pub fn assert_false(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    let value = one_arg("assert-false?", args)?;
    match value {
        Value::Bool(false) => Ok(Value::Bool(true)),
        other => Err(Error::Assertion(format!(
            "expected false, got {}",
            other.repr()
        ))),
    }
}

#[builtin(name = "assert-nil?")]
/// Passes when the value is nil.
pub fn assert_nil(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    let value = one_arg("assert-nil?", args)?;
    match value {
        Value::Nil => Ok(Value::Bool(true)),
        other => Err(Error::Assertion(format!(
            "expected nil, got {}",
            other.repr()
        ))),
    }
}

#[builtin(name = "assert-not-nil?")]
/// Passes when the value is anything but nil.
pub fn assert_not_nil(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    match one_arg("assert-not-nil?", args)? {
        Value::Nil => Err(Error::Assertion("expected a non-nil value, got nil".to_string())),
        _ => Ok(Value::Bool(true)),
    }
}

#[builtin(name = "assert-equal?")]
/// Passes when both arguments are structurally equal.
pub fn assert_equal(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.len() != 2 {
        return Err(Error::arity("assert-equal?", 2, args.len()));
    }
    if args[0] == args[1] {
        Ok(Value::Bool(true))
    } else {
        Err(Error::Assertion(format!(
            "expected {} to equal {}",
            args[1].repr(),
            args[0].repr()
        )))
    }
}

#[builtin(name = "assert-not-equal?")]
/// Passes when the arguments differ structurally.
pub fn assert_not_equal(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.len() != 2 {
        return Err(Error::arity("assert-not-equal?", 2, args.len()));
    }
    if args[0] != args[1] {
        Ok(Value::Bool(true))
    } else {
        Err(Error::Assertion(format!(
            "expected values to differ, both are {}",
            args[0].repr()
        )))
    }
}

/// Register all assertion builtins in the environment
pub fn register(env: &Arc<Environment>) {
    register_assert_true(env);
    register_assert_false(env);
    register_assert_nil(env);
    register_assert_not_nil(env);
    register_assert_equal(env);
    register_assert_not_equal(env);
}
