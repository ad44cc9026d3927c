// ABOUTME: Async special forms - event-loop entry, awaiting, async functions

use super::parse_params;
use crate::env::Environment;
use crate::error::{Error, Result};
use crate::eval::evaluate;
use crate::promise::Settled;
use crate::value::{Function, Value};
use std::sync::Arc;

/// `(async body)` - evaluates the body; a promise result blocks the current
/// task until settlement, then yields the value or raises the rejection.
pub fn async_form(expression: &[Value], env: &Arc<Environment>) -> Result<Value> {
    if expression.len() != 2 {
        return Err(Error::Evaluation(format!(
            "'async' expects exactly 1 argument (body expression), got {}",
            expression.len() - 1
        )));
    }

    let result = evaluate(&expression[1], env)?;
    match result {
        Value::Promise(promise) => match promise.wait() {
            Settled::Resolved(value) => Ok(value),
            Settled::Rejected(reason) => Err(Error::Evaluation(format!(
                "Async operation failed: {}",
                reason
            ))),
        },
        other => Ok(other),
    }
}

/// `(await promise-expr)` - blocks until the promise settles; rejects
/// non-promises with a type error and surfaces rejections as errors.
pub fn await_form(expression: &[Value], env: &Arc<Environment>) -> Result<Value> {
    if expression.len() != 2 {
        return Err(Error::Evaluation(format!(
            "'await' expects exactly 1 argument (promise expression), got {}",
            expression.len() - 1
        )));
    }

    let value = evaluate(&expression[1], env)?;
    let promise = match value {
        Value::Promise(promise) => promise,
        other => {
            return Err(Error::Type(format!(
                "'await' can only be used with promises, got {}",
                other.type_name()
            )))
        }
    };

    match promise.wait() {
        Settled::Resolved(value) => Ok(value),
        Settled::Rejected(reason) => {
            Err(Error::Evaluation(format!("Promise rejected: {}", reason)))
        }
    }
}

/// `(defn-async name [p...] body...)` - defines a function whose application
/// returns a promise evaluating the body in a fresh child of the defining
/// environment.
pub fn defn_async(expression: &[Value], env: &Arc<Environment>) -> Result<Value> {
    if expression.len() < 4 {
        return Err(Error::Evaluation(format!(
            "'defn-async' expects at least 3 arguments (name, params, body...), got {}",
            expression.len() - 1
        )));
    }

    let name = match &expression[1] {
        Value::Symbol(name) => name.clone(),
        other => {
            return Err(Error::Type(format!(
                "'defn-async' function name must be a symbol, got {}",
                other.type_name()
            )))
        }
    };

    let params = parse_params(&expression[2], "defn-async")?;
    let function = Value::Function(Arc::new(Function {
        name: Some(name.clone()),
        params,
        body: expression[3..].to_vec(),
        env: env.clone(),
        is_async: true,
    }));
    env.define(name, function);
    Ok(Value::Nil)
}
