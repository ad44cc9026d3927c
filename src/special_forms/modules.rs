// ABOUTME: Module forms - export recording and import binding

use crate::env::Environment;
use crate::error::{Error, Result};
use crate::eval::evaluate;
use crate::module_loader;
use crate::value::Value;
use std::sync::Arc;

/// `(export s1 s2 ...)` - records each symbol as exported by the module
/// currently being loaded
pub fn export_form(expression: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    let module = module_loader::current_module().ok_or_else(|| {
        Error::Evaluation("'export' can only be used while a module is being loaded".to_string())
    })?;

    for form in &expression[1..] {
        match form {
            Value::Symbol(name) => module.add_export(name),
            other => {
                return Err(Error::Evaluation(format!(
                    "'export' expects symbols, got {}",
                    other.type_name()
                )))
            }
        }
    }
    Ok(Value::Nil)
}

/// `(import "module-name")` or `(import "module-name" [s1 s2 ...])` -
/// loads the module (cache respected) and binds its exports, or only the
/// listed subset, into the current environment.
pub fn import_form(expression: &[Value], env: &Arc<Environment>) -> Result<Value> {
    if expression.len() < 2 || expression.len() > 3 {
        return Err(Error::Evaluation(format!(
            "'import' expects 1 or 2 arguments (module name, optional symbol vector), got {}",
            expression.len() - 1
        )));
    }

    let name_value = evaluate(&expression[1], env)?;
    let module_name = match &name_value {
        Value::Str(name) => name.clone(),
        other => {
            return Err(Error::Type(format!(
                "'import' module name must be a string, got {}",
                other.type_name()
            )))
        }
    };

    let module = module_loader::loader().load(&module_name)?;

    match expression.get(2) {
        // Bind the full export set
        None => {
            for export in module.exports() {
                // exported but never defined: skip, like an empty binding
                if let Some(value) = module.env.get(&export) {
                    env.define(export, value);
                }
            }
        }
        // Bind only the requested subset
        Some(Value::Vector(symbols)) | Some(Value::List(symbols)) => {
            for symbol in symbols {
                match symbol {
                    Value::Symbol(name) => {
                        let value = module.exported_value(name)?;
                        env.define(name.clone(), value);
                    }
                    other => {
                        return Err(Error::Evaluation(format!(
                            "'import' symbol list entries must be symbols, got {}",
                            other.type_name()
                        )))
                    }
                }
            }
        }
        Some(other) => {
            return Err(Error::Evaluation(format!(
                "'import' symbol list must be a vector, got {}",
                other.type_name()
            )))
        }
    }

    Ok(Value::Nil)
}
