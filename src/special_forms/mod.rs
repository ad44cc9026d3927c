// ABOUTME: Special form dispatch - syntax evaluated by custom rules

mod core;
mod exceptions;
mod flow;
mod logic;
mod modules;
mod pipeline;
mod tasks;

use crate::env::Environment;
use crate::error::Result;
use crate::value::Value;
use std::sync::Arc;

/// A special form handler receives the whole unevaluated expression
/// (head symbol included) and the current environment.
pub type Handler = fn(&[Value], &Arc<Environment>) -> Result<Value>;

/// Static dispatch table consulted by the evaluator before the call
/// convention. Special forms are not values and cannot be shadowed.
pub fn lookup(name: &str) -> Option<Handler> {
    let handler: Handler = match name {
        "define" => core::define,
        "fn" => core::fn_form,
        "defn" => core::defn,
        "if" => core::if_form,
        "cond" => core::cond,
        "let" => core::let_form,
        "quote" => core::quote,
        "do" => core::do_form,
        "loop" => flow::loop_form,
        "recur" => flow::recur,
        "doseq" => flow::doseq,
        "and" => logic::and_form,
        "or" => logic::or_form,
        "->" => pipeline::thread_first,
        "->>" => pipeline::thread_last,
        "try" => exceptions::try_form,
        "throw" => exceptions::throw_form,
        "async" => tasks::async_form,
        "await" => tasks::await_form,
        "defn-async" => tasks::defn_async,
        "import" => modules::import_form,
        "export" => modules::export_form,
        _ => return None,
    };
    Some(handler)
}

/// Shared helper: a parameter or binding list must be a vector (or list)
/// of symbols.
pub(crate) fn parse_params(form: &Value, context: &str) -> Result<Vec<String>> {
    let items = match form {
        Value::Vector(items) | Value::List(items) => items,
        other => {
            return Err(crate::error::Error::Evaluation(format!(
                "'{}' parameters must be a vector, got {}",
                context,
                other.type_name()
            )))
        }
    };

    let mut params = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::Symbol(name) => params.push(name.clone()),
            other => {
                return Err(crate::error::Error::Evaluation(format!(
                    "'{}' parameter must be a symbol, got {}",
                    context,
                    other.type_name()
                )))
            }
        }
    }
    Ok(params)
}
