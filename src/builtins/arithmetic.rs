//! Arithmetic operations: +, -, *, /, %, abs, max, min
//!
//! Integer arithmetic stays integral until a float appears (or an i64
//! overflows, which promotes to float). Division always returns a float.

use crate::env::Environment;
use crate::error::{Error, Result};
use crate::value::Value;
use lispy_macros::builtin;
use std::sync::Arc;

fn check_number(function: &str, value: &Value) -> Result<Value> {
    match value {
        Value::Int(_) | Value::Float(_) => Ok(value.clone()),
        other => Err(Error::type_mismatch(function, "a number", other)),
    }
}

fn fold_numeric(
    function: &str,
    first: Value,
    rest: &[Value],
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value> {
    let mut acc = check_number(function, &first)?;
    for arg in rest {
        let arg = check_number(function, arg)?;
        acc = match (&acc, &arg) {
            (Value::Int(a), Value::Int(b)) => match int_op(*a, *b) {
                Some(n) => Value::Int(n),
                None => Value::Float(float_op(*a as f64, *b as f64)),
            },
            (a, b) => {
                let (x, y) = (a.as_number().unwrap_or(0.0), b.as_number().unwrap_or(0.0));
                Value::Float(float_op(x, y))
            }
        };
    }
    Ok(acc)
}

#[builtin(name = "+")]
/// Returns the sum of all arguments; `(+)` is 0.
pub fn add(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.is_empty() {
        return Ok(Value::Int(0));
    }
    fold_numeric("+", args[0].clone(), &args[1..], i64::checked_add, |a, b| {
        a + b
    })
}

#[builtin(name = "-")]
/// Subtracts subsequent arguments from the first; one argument negates.
pub fn sub(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.is_empty() {
        return Err(Error::arity("-", "at least 1", 0));
    }
    if args.len() == 1 {
        return match check_number("-", &args[0])? {
            Value::Int(n) => Ok(Value::Int(-n)),
            Value::Float(n) => Ok(Value::Float(-n)),
            other => Err(Error::type_mismatch("-", "a number", &other)),
        };
    }
    fold_numeric("-", args[0].clone(), &args[1..], i64::checked_sub, |a, b| {
        a - b
    })
}

#[builtin(name = "*")]
/// Returns the product of all arguments; `(*)` is 1.
pub fn mul(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.is_empty() {
        return Ok(Value::Int(1));
    }
    fold_numeric("*", args[0].clone(), &args[1..], i64::checked_mul, |a, b| {
        a * b
    })
}

#[builtin(name = "/")]
/// Divides the first argument by the rest, always returning a float.
pub fn div(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.len() < 2 {
        return Err(Error::arity("/", "at least 2", args.len()));
    }
    for arg in args {
        check_number("/", arg)?;
    }
    for divisor in &args[1..] {
        if divisor.as_number() == Some(0.0) {
            return Err(Error::ZeroDivision);
        }
    }

    let mut result = args[0].as_number().unwrap_or(0.0);
    for divisor in &args[1..] {
        result /= divisor.as_number().unwrap_or(1.0);
    }
    Ok(Value::Float(result))
}

/// Modulo where the result sign follows the divisor
fn int_modulo(a: i64, b: i64) -> Option<i64> {
    let r = a.checked_rem(b)?;
    if r != 0 && (r < 0) != (b < 0) {
        Some(r + b)
    } else {
        Some(r)
    }
}

fn float_modulo(a: f64, b: f64) -> f64 {
    let r = a % b;
    if r != 0.0 && (r < 0.0) != (b < 0.0) {
        r + b
    } else {
        r
    }
}

#[builtin(name = "%")]
/// Modulo, applied left-to-right; the result sign follows the divisor.
pub fn modulo(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.len() < 2 {
        return Err(Error::arity("%", "at least 2", args.len()));
    }
    for arg in args {
        check_number("%", arg)?;
    }
    for divisor in &args[1..] {
        if divisor.as_number() == Some(0.0) {
            return Err(Error::ZeroDivision);
        }
    }
    fold_numeric("%", args[0].clone(), &args[1..], int_modulo, float_modulo)
}

#[builtin(name = "abs")]
/// Absolute value.
pub fn abs(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.len() != 1 {
        return Err(Error::arity("abs", 1, args.len()));
    }
    match check_number("abs", &args[0])? {
        Value::Int(n) => Ok(Value::Int(n.abs())),
        Value::Float(n) => Ok(Value::Float(n.abs())),
        other => Err(Error::type_mismatch("abs", "a number", &other)),
    }
}

#[builtin(name = "max")]
/// Largest of the arguments.
pub fn max(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.is_empty() {
        return Err(Error::arity("max", "at least 1", 0));
    }
    let mut best = check_number("max", &args[0])?;
    for arg in &args[1..] {
        let arg = check_number("max", arg)?;
        if arg.as_number() > best.as_number() {
            best = arg;
        }
    }
    Ok(best)
}

#[builtin(name = "min")]
/// Smallest of the arguments.
pub fn min(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.is_empty() {
        return Err(Error::arity("min", "at least 1", 0));
    }
    let mut best = check_number("min", &args[0])?;
    for arg in &args[1..] {
        let arg = check_number("min", arg)?;
        if arg.as_number() < best.as_number() {
            best = arg;
        }
    }
    Ok(best)
}

/// Register all arithmetic builtins in the environment
pub fn register(env: &Arc<Environment>) {
    register_add(env);
    register_sub(env);
    register_mul(env);
    register_div(env);
    register_modulo(env);
    register_abs(env);
    register_max(env);
    register_min(env);
}
