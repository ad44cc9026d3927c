// ABOUTME: User-level error forms - throw payloads and try/catch recovery

use crate::env::Environment;
use crate::error::{Error, Result};
use crate::eval::evaluate;
use crate::value::Value;
use std::sync::Arc;

/// `(throw expr)` - evaluates expr and raises it as a user-thrown error
pub fn throw_form(expression: &[Value], env: &Arc<Environment>) -> Result<Value> {
    if expression.len() != 2 {
        return Err(Error::Evaluation(format!(
            "'throw' expects 1 argument, got {}",
            expression.len() - 1
        )));
    }
    let payload = evaluate(&expression[1], env)?;
    Err(Error::Thrown(payload))
}

/// `(try body... (catch var handler...))` - runs body; a user-thrown error
/// binds its payload to `var` in a child frame and evaluates the handler.
/// Assertion failures and every other error kind propagate.
pub fn try_form(expression: &[Value], env: &Arc<Environment>) -> Result<Value> {
    let rest = &expression[1..];
    let (body, catch_clause) = split_catch(rest)?;

    let mut result = Value::Nil;
    for body_expr in body {
        match evaluate(body_expr, env) {
            Ok(value) => result = value,
            Err(Error::Thrown(payload)) => {
                return match catch_clause {
                    Some((var, handlers)) => {
                        let scope = Environment::child(env);
                        scope.define(var.clone(), payload);
                        let mut handled = Value::Nil;
                        for handler in handlers {
                            handled = evaluate(handler, &scope)?;
                        }
                        Ok(handled)
                    }
                    None => Err(Error::Thrown(payload)),
                }
            }
            Err(other) => return Err(other),
        }
    }
    Ok(result)
}

/// Split the trailing `(catch var handler...)` clause from the body forms
fn split_catch(forms: &[Value]) -> Result<(&[Value], Option<(&String, &[Value])>)> {
    let Some(Value::List(clause)) = forms.last() else {
        return Ok((forms, None));
    };
    if !matches!(clause.first(), Some(Value::Symbol(head)) if head == "catch") {
        return Ok((forms, None));
    }

    if clause.len() < 2 {
        return Err(Error::Evaluation(
            "'catch' expects a binding symbol and handler expressions".to_string(),
        ));
    }
    let var = match &clause[1] {
        Value::Symbol(name) => name,
        other => {
            return Err(Error::Evaluation(format!(
                "'catch' binding must be a symbol, got {}",
                other.type_name()
            )))
        }
    };

    Ok((&forms[..forms.len() - 1], Some((var, &clause[2..]))))
}
