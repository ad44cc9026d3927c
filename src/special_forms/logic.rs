// ABOUTME: Short-circuit boolean forms

use crate::env::Environment;
use crate::error::Result;
use crate::eval::evaluate;
use crate::value::Value;
use std::sync::Arc;

/// `(and e1 e2 ...)` - returns the first falsy value, or the last value if
/// all are truthy; `(and)` is true. Later forms are never evaluated once a
/// falsy value appears.
pub fn and_form(expression: &[Value], env: &Arc<Environment>) -> Result<Value> {
    let mut result = Value::Bool(true);
    for form in &expression[1..] {
        result = evaluate(form, env)?;
        if !result.is_truthy() {
            return Ok(result);
        }
    }
    Ok(result)
}

/// `(or e1 e2 ...)` - returns the first truthy value, or the last value if
/// all are falsy; `(or)` is nil.
pub fn or_form(expression: &[Value], env: &Arc<Environment>) -> Result<Value> {
    let mut result = Value::Nil;
    for form in &expression[1..] {
        result = evaluate(form, env)?;
        if result.is_truthy() {
            return Ok(result);
        }
    }
    Ok(result)
}
