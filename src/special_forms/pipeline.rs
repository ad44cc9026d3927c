// ABOUTME: Thread-first and thread-last pipeline forms

use crate::env::Environment;
use crate::error::{Error, Result};
use crate::eval::evaluate;
use crate::value::Value;
use std::sync::Arc;

/// Wrap list accumulators in `(quote ...)` before splicing them back into a
/// step: an evaluated list would otherwise be re-run as code.
fn protect(value: Value) -> Value {
    match &value {
        Value::List(items) if !items.is_empty() => {
            Value::List(vec![Value::Symbol("quote".to_string()), value])
        }
        _ => value,
    }
}

enum Position {
    First,
    Last,
}

fn thread(expression: &[Value], env: &Arc<Environment>, position: Position) -> Result<Value> {
    let form_name = match position {
        Position::First => "->",
        Position::Last => "->>",
    };

    if expression.len() < 2 {
        return Err(Error::Evaluation(format!(
            "'{}' expects at least an initial value",
            form_name
        )));
    }

    let mut current = evaluate(&expression[1], env)?;

    for step in &expression[2..] {
        let accumulator = protect(current);
        let next = match step {
            // Bare symbol f: rewrite to (f acc)
            Value::Symbol(_) => Value::List(vec![step.clone(), accumulator]),
            // (f a b ...): splice acc as first or last argument
            Value::List(items) if !items.is_empty() => {
                let mut call = Vec::with_capacity(items.len() + 1);
                match position {
                    Position::First => {
                        call.push(items[0].clone());
                        call.push(accumulator);
                        call.extend(items[1..].iter().cloned());
                    }
                    Position::Last => {
                        call.extend(items.iter().cloned());
                        call.push(accumulator);
                    }
                }
                Value::List(call)
            }
            Value::List(_) => {
                return Err(Error::Evaluation(format!(
                    "Invalid empty list () found in '{}' pipeline",
                    form_name
                )))
            }
            other => {
                return Err(Error::Type(format!(
                    "Invalid form in '{}' pipeline: expected function or (function ...), got {}",
                    form_name,
                    other.type_name()
                )))
            }
        };
        current = evaluate(&next, env)?;
    }

    Ok(current)
}

/// `(-> initial step1 step2 ...)` - accumulator becomes the first argument
/// of each step
pub fn thread_first(expression: &[Value], env: &Arc<Environment>) -> Result<Value> {
    thread(expression, env, Position::First)
}

/// `(->> initial step1 step2 ...)` - accumulator becomes the last argument
/// of each step
pub fn thread_last(expression: &[Value], env: &Arc<Environment>) -> Result<Value> {
    thread(expression, env, Position::Last)
}
