// ABOUTME: LisPy interpreter library - lexer, reader, evaluator, promises, modules

pub mod builtins;
pub mod config;
pub mod env;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod module_loader;
pub mod promise;
pub mod reader;
pub mod special_forms;
pub mod value;

use env::Environment;
use error::Result;
use std::sync::Arc;
use value::Value;

/// Tokenize, parse, and evaluate every top-level form in `source`,
/// returning the value of the last form (nil for empty input).
pub fn run_source(source: &str, env: &Arc<Environment>) -> Result<Value> {
    let tokens = lexer::tokenize(source)?;
    let forms = reader::parse_all(&tokens)?;

    let mut result = Value::Nil;
    for form in &forms {
        result = eval::evaluate(form, env)?;
    }
    Ok(result)
}
