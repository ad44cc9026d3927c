// ABOUTME: Core special forms - definition, branching, binding, sequencing

use super::parse_params;
use crate::env::Environment;
use crate::error::{Error, Result};
use crate::eval::evaluate;
use crate::value::{Function, Value};
use std::sync::Arc;

/// `(define name expr)` - evaluates expr, binds name in the current frame,
/// returns nil
pub fn define(expression: &[Value], env: &Arc<Environment>) -> Result<Value> {
    if expression.len() != 3 {
        return Err(Error::Evaluation(format!(
            "'define' expects 2 arguments (name, value), got {}",
            expression.len() - 1
        )));
    }

    let name = match &expression[1] {
        Value::Symbol(name) => name,
        other => {
            return Err(Error::Evaluation(format!(
                "'define' name must be a symbol, got {}",
                other.type_name()
            )))
        }
    };

    // the value is built first, then inserted by name; a function may refer
    // to itself once its define completes
    let value = evaluate(&expression[2], env)?;
    env.define(name.clone(), value);
    Ok(Value::Nil)
}

/// `(fn [p1 ... pn] body...)` - a closure capturing the current environment
pub fn fn_form(expression: &[Value], env: &Arc<Environment>) -> Result<Value> {
    if expression.len() < 2 {
        return Err(Error::Evaluation(
            "'fn' expects a parameter vector".to_string(),
        ));
    }

    let params = parse_params(&expression[1], "fn")?;
    Ok(Value::Function(Arc::new(Function {
        name: None,
        params,
        body: expression[2..].to_vec(),
        env: env.clone(),
        is_async: false,
    })))
}

/// `(defn name [p...] body...)` - sugar for `(define name (fn [p...] body...))`
pub fn defn(expression: &[Value], env: &Arc<Environment>) -> Result<Value> {
    if expression.len() < 3 {
        return Err(Error::Evaluation(format!(
            "'defn' expects at least 2 arguments (name, params), got {}",
            expression.len() - 1
        )));
    }

    let name = match &expression[1] {
        Value::Symbol(name) => name.clone(),
        other => {
            return Err(Error::Evaluation(format!(
                "'defn' name must be a symbol, got {}",
                other.type_name()
            )))
        }
    };

    let params = parse_params(&expression[2], "defn")?;
    let function = Value::Function(Arc::new(Function {
        name: Some(name.clone()),
        params,
        body: expression[3..].to_vec(),
        env: env.clone(),
        is_async: false,
    }));
    env.define(name, function);
    Ok(Value::Nil)
}

/// `(if test then else?)` - else defaults to nil
pub fn if_form(expression: &[Value], env: &Arc<Environment>) -> Result<Value> {
    if expression.len() < 3 || expression.len() > 4 {
        return Err(Error::Evaluation(format!(
            "'if' expects 2 or 3 arguments, got {}",
            expression.len() - 1
        )));
    }

    let test = evaluate(&expression[1], env)?;
    if test.is_truthy() {
        evaluate(&expression[2], env)
    } else if expression.len() == 4 {
        evaluate(&expression[3], env)
    } else {
        Ok(Value::Nil)
    }
}

/// `(cond c1 e1 c2 e2 ...)` - first truthy condition wins; nil when none match
pub fn cond(expression: &[Value], env: &Arc<Environment>) -> Result<Value> {
    let clauses = &expression[1..];
    if clauses.len() % 2 != 0 {
        return Err(Error::Evaluation(format!(
            "'cond' requires an even number of forms (condition-expression pairs), got {}",
            clauses.len()
        )));
    }

    for pair in clauses.chunks(2) {
        if evaluate(&pair[0], env)?.is_truthy() {
            return evaluate(&pair[1], env);
        }
    }
    Ok(Value::Nil)
}

/// `(let [s1 v1 s2 v2 ...] body...)` - sequential bindings in a child frame
pub fn let_form(expression: &[Value], env: &Arc<Environment>) -> Result<Value> {
    if expression.len() < 2 {
        return Err(Error::Evaluation(
            "'let' expects a binding vector".to_string(),
        ));
    }

    let bindings = match &expression[1] {
        Value::Vector(items) | Value::List(items) => items,
        other => {
            return Err(Error::Evaluation(format!(
                "'let' bindings must be a vector, got {}",
                other.type_name()
            )))
        }
    };
    if bindings.len() % 2 != 0 {
        return Err(Error::Evaluation(
            "'let' bindings require an even number of forms (name-value pairs)".to_string(),
        ));
    }

    let scope = Environment::child(env);
    for pair in bindings.chunks(2) {
        let name = match &pair[0] {
            Value::Symbol(name) => name.clone(),
            other => {
                return Err(Error::Evaluation(format!(
                    "'let' binding name must be a symbol, got {}",
                    other.type_name()
                )))
            }
        };
        // later bindings see earlier ones
        let value = evaluate(&pair[1], &scope)?;
        scope.define(name, value);
    }

    let mut result = Value::Nil;
    for body_expr in &expression[2..] {
        result = evaluate(body_expr, &scope)?;
    }
    Ok(result)
}

/// `(quote form)` - returns the form unevaluated
pub fn quote(expression: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if expression.len() != 2 {
        return Err(Error::Evaluation(format!(
            "'quote' expects 1 argument, got {}",
            expression.len() - 1
        )));
    }
    Ok(expression[1].clone())
}

/// `(do e1 e2 ...)` - evaluates in order, returns the last value; `(do)` is nil
pub fn do_form(expression: &[Value], env: &Arc<Environment>) -> Result<Value> {
    let mut result = Value::Nil;
    for body_expr in &expression[1..] {
        result = evaluate(body_expr, env)?;
    }
    Ok(result)
}
