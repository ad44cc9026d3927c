// ABOUTME: Iteration forms - loop/recur trampolining and doseq side effects

use crate::env::Environment;
use crate::error::{Error, Result};
use crate::eval::{apply_function, evaluate, CURRENT_FUNCTION};
use crate::value::{Function, Value};
use std::sync::Arc;

/// `(loop [s1 v1 ...] body...)` - like `let`, but the bound names are the
/// target of `recur`.
///
/// Realized by synthesizing an anonymous function whose parameters are the
/// binding names and applying it through the ordinary trampoline, so `recur`
/// has a single code path for functions and loops alike.
pub fn loop_form(expression: &[Value], env: &Arc<Environment>) -> Result<Value> {
    if expression.len() < 2 {
        return Err(Error::Evaluation(
            "'loop' expects a binding vector".to_string(),
        ));
    }

    let bindings = match &expression[1] {
        Value::Vector(items) | Value::List(items) => items,
        other => {
            return Err(Error::Evaluation(format!(
                "'loop' bindings must be a vector, got {}",
                other.type_name()
            )))
        }
    };
    if bindings.len() % 2 != 0 {
        return Err(Error::Evaluation(
            "'loop' bindings require an even number of forms (name-value pairs)".to_string(),
        ));
    }

    // Initializers bind sequentially, like let
    let init_scope = Environment::child(env);
    let mut names = Vec::with_capacity(bindings.len() / 2);
    let mut values = Vec::with_capacity(bindings.len() / 2);
    for pair in bindings.chunks(2) {
        let name = match &pair[0] {
            Value::Symbol(name) => name.clone(),
            other => {
                return Err(Error::Evaluation(format!(
                    "'loop' binding name must be a symbol, got {}",
                    other.type_name()
                )))
            }
        };
        let value = evaluate(&pair[1], &init_scope)?;
        init_scope.define(name.clone(), value.clone());
        names.push(name);
        values.push(value);
    }

    let body = Arc::new(Function {
        name: Some("loop".to_string()),
        params: names,
        body: expression[2..].to_vec(),
        env: env.clone(),
        is_async: false,
    });
    apply_function(&body, &values, env)
}

/// `(recur a1 ... ak)` - evaluates its arguments, then returns the tail-call
/// sentinel instead of performing a call. The enclosing application loop
/// rebinds and re-enters without growing the host stack.
pub fn recur(expression: &[Value], env: &Arc<Environment>) -> Result<Value> {
    let current = match env.get(CURRENT_FUNCTION) {
        Some(Value::Function(function)) => function,
        _ => {
            return Err(Error::Evaluation(
                "'recur' can only be used inside a function body or a loop".to_string(),
            ))
        }
    };

    let arg_exprs = &expression[1..];
    if arg_exprs.len() != current.params.len() {
        return Err(Error::Arity(format!(
            "'recur' expects {} arguments to match '{}', got {}",
            current.params.len(),
            current.label(),
            arg_exprs.len()
        )));
    }

    let mut args = Vec::with_capacity(arg_exprs.len());
    for arg in arg_exprs {
        args.push(evaluate(arg, env)?);
    }
    Ok(Value::TailCall(args))
}

/// `(doseq [s coll] body...)` - iterates a list or vector for side effects,
/// returns nil
pub fn doseq(expression: &[Value], env: &Arc<Environment>) -> Result<Value> {
    if expression.len() < 3 {
        return Err(Error::Evaluation(format!(
            "'doseq' expects at least 2 arguments ([binding collection] body...), got {}",
            expression.len() - 1
        )));
    }

    let binding = match &expression[1] {
        Value::Vector(items) | Value::List(items) => items,
        other => {
            return Err(Error::Evaluation(format!(
                "'doseq' first argument must be a vector [binding collection], got {}",
                other.type_name()
            )))
        }
    };
    if binding.len() != 2 {
        return Err(Error::Evaluation(format!(
            "'doseq' binding vector must have exactly 2 elements [binding collection], got {}",
            binding.len()
        )));
    }

    let name = match &binding[0] {
        Value::Symbol(name) => name.clone(),
        other => {
            return Err(Error::Evaluation(format!(
                "'doseq' binding must be a symbol, got {}",
                other.type_name()
            )))
        }
    };

    let collection = evaluate(&binding[1], env)?;
    let items = match &collection {
        Value::List(items) | Value::Vector(items) => items.clone(),
        other => {
            return Err(Error::type_mismatch(
                "doseq",
                "a list or vector collection",
                other,
            ))
        }
    };

    let scope = Environment::child(env);
    for item in items {
        scope.define(name.clone(), item);
        for body_expr in &expression[2..] {
            evaluate(body_expr, &scope)?;
        }
    }
    Ok(Value::Nil)
}
