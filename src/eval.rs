// ABOUTME: Evaluator module - recursive AST walker with a recur trampoline

use crate::env::Environment;
use crate::error::{Error, Result};
use crate::promise::Promise;
use crate::special_forms;
use crate::value::{Function, Map, Value};
use std::sync::Arc;

/// Maximum depth for regular (non-`recur`) nested function calls
pub const MAX_RECURSION_DEPTH: i64 = 100;

/// Reserved binding: the currently executing function, consulted by `recur`
pub const CURRENT_FUNCTION: &str = "__current_function__";

/// Reserved binding: the current recursion depth, consulted by the stack guard
pub const RECURSION_DEPTH: &str = "__recursion_depth__";

/// Evaluates a LisPy expression (AST node) in a given environment
pub fn evaluate(expression: &Value, env: &Arc<Environment>) -> Result<Value> {
    match expression {
        // Map literals from source may carry values that still need evaluation
        Value::Map(map) if map.is_literal() => {
            if map_needs_evaluation(map) {
                let mut evaluated = Map::new();
                for (key, value) in map.iter() {
                    evaluated.insert(key.clone(), evaluate(value, env)?);
                }
                Ok(Value::Map(evaluated))
            } else {
                Ok(Value::Map(map.clone().into_runtime()))
            }
        }

        // Runtime maps are already evaluated
        Value::Map(_) => Ok(expression.clone()),

        // Self-evaluating values (vectors included: their elements stay as-is)
        Value::Nil
        | Value::Bool(_)
        | Value::Int(_)
        | Value::Float(_)
        | Value::Str(_)
        | Value::Vector(_)
        | Value::Function(_)
        | Value::Builtin(_)
        | Value::Promise(_)
        | Value::TailCall(_) => Ok(expression.clone()),

        // Keyword-style symbols (:name) are ordinary symbols that evaluate
        // to themselves; everything else is a lookup
        Value::Symbol(name) if name.starts_with(':') => Ok(expression.clone()),
        Value::Symbol(name) => env.lookup(name),

        Value::List(items) if items.is_empty() => Err(Error::Evaluation(
            "Cannot evaluate an empty list as a function call or special form".to_string(),
        )),

        Value::List(items) => {
            if let Value::Symbol(name) = &items[0] {
                if let Some(handler) = special_forms::lookup(name) {
                    return handler(items, env);
                }
            }

            let callee = evaluate(&items[0], env)?;
            let mut args = Vec::with_capacity(items.len() - 1);
            for arg in &items[1..] {
                args.push(evaluate(arg, env)?);
            }
            apply(&callee, &args, env)
        }
    }
}

/// Whether a map-literal value still references code (symbols or calls)
fn map_needs_evaluation(map: &Map) -> bool {
    map.iter().any(|(_, value)| value_needs_evaluation(value))
}

fn value_needs_evaluation(value: &Value) -> bool {
    match value {
        Value::Symbol(_) | Value::List(_) => true,
        Value::Map(inner) => map_needs_evaluation(inner),
        Value::Vector(items) => items.iter().any(value_needs_evaluation),
        _ => false,
    }
}

/// Applies a callable to already-evaluated arguments
pub fn apply(callee: &Value, args: &[Value], env: &Arc<Environment>) -> Result<Value> {
    match callee {
        Value::Builtin(builtin) => builtin.call(args, env),
        Value::Function(function) if function.is_async => apply_async(function, args),
        Value::Function(function) => apply_function(function, args, env),
        other => Err(Error::Evaluation(format!(
            "Value is not callable: {}",
            other.type_name()
        ))),
    }
}

/// Applies a user-defined function with explicit `recur` support.
///
/// Regular recursive calls consume one host frame each and are bounded by
/// [`MAX_RECURSION_DEPTH`]; a body that yields the `TailCall` sentinel
/// re-enters with fresh parameter bindings in a child of the *defining*
/// environment, so `recur` is bounded by heap, not stack.
pub fn apply_function(
    function: &Arc<Function>,
    args: &[Value],
    env: &Arc<Environment>,
) -> Result<Value> {
    if args.len() != function.params.len() {
        return Err(Error::Arity(format!(
            "Function '{}' expects {} arguments, got {}",
            function.label(),
            function.params.len(),
            args.len()
        )));
    }

    let depth = match env.get(RECURSION_DEPTH) {
        Some(Value::Int(n)) => n + 1,
        _ => 1,
    };
    if depth > MAX_RECURSION_DEPTH {
        return Err(Error::Recursion(format!(
            "Function '{}' exceeded maximum recursion depth of {}. \
             Use 'recur' for tail-recursive calls to avoid stack overflow",
            function.label(),
            MAX_RECURSION_DEPTH
        )));
    }

    let mut current_args: Vec<Value> = args.to_vec();

    // Trampoline loop for explicit tail calls via recur
    loop {
        let call_env = Environment::child(&function.env);
        call_env.define(CURRENT_FUNCTION, Value::Function(function.clone()));
        call_env.define(RECURSION_DEPTH, Value::Int(depth));
        for (param, arg) in function.params.iter().zip(&current_args) {
            call_env.define(param.clone(), arg.clone());
        }

        let mut result = Value::Nil;
        let mut tail_args: Option<Vec<Value>> = None;
        for body_expr in &function.body {
            let value = evaluate(body_expr, &call_env)?;
            if let Value::TailCall(new_args) = value {
                tail_args = Some(new_args);
                break;
            }
            result = value;
        }

        match tail_args {
            Some(new_args) => current_args = new_args,
            None => return Ok(result),
        }
    }
}

/// Applies a `defn-async` function: arity is validated synchronously, then a
/// promise evaluates the body on a worker in a fresh child of the defining
/// environment.
fn apply_async(function: &Arc<Function>, args: &[Value]) -> Result<Value> {
    if args.len() != function.params.len() {
        return Err(Error::Arity(format!(
            "Function '{}' expects {} arguments, got {}",
            function.label(),
            function.params.len(),
            args.len()
        )));
    }

    let sync_body = Arc::new(Function {
        is_async: false,
        ..(**function).clone()
    });
    let args = args.to_vec();

    Ok(Value::Promise(Promise::spawn(move || {
        let env = sync_body.env.clone();
        apply_function(&sync_body, &args, &env)
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Builtin, MapKey};

    fn env_with_builtin() -> Arc<Environment> {
        let env = Environment::new();
        env.define(
            "plus",
            Value::Builtin(Builtin::new("plus", |args, _env| {
                let mut sum = 0;
                for arg in args {
                    match arg {
                        Value::Int(n) => sum += n,
                        other => return Err(Error::type_mismatch("plus", "int", other)),
                    }
                }
                Ok(Value::Int(sum))
            })),
        );
        env
    }

    #[test]
    fn test_self_evaluating() {
        let env = Environment::new();
        assert_eq!(evaluate(&Value::Int(5), &env).unwrap(), Value::Int(5));
        assert_eq!(evaluate(&Value::Nil, &env).unwrap(), Value::Nil);
        let vector = Value::Vector(vec![Value::Symbol("x".to_string())]);
        // vectors are self-evaluating: inner symbols stay unevaluated
        assert_eq!(evaluate(&vector, &env).unwrap(), vector);
    }

    #[test]
    fn test_symbol_lookup() {
        let env = Environment::new();
        env.define("x", Value::Int(10));
        assert_eq!(
            evaluate(&Value::Symbol("x".to_string()), &env).unwrap(),
            Value::Int(10)
        );
        assert!(matches!(
            evaluate(&Value::Symbol("missing".to_string()), &env),
            Err(Error::UnboundSymbol(_))
        ));
    }

    #[test]
    fn test_keyword_symbols_evaluate_to_themselves() {
        let env = Environment::new();
        let keyword = Value::Symbol(":status".to_string());
        assert_eq!(evaluate(&keyword, &env).unwrap(), keyword);
    }

    #[test]
    fn test_empty_list_is_an_error() {
        let env = Environment::new();
        assert!(matches!(
            evaluate(&Value::List(vec![]), &env),
            Err(Error::Evaluation(msg)) if msg.contains("empty list")
        ));
    }

    #[test]
    fn test_builtin_call() {
        let env = env_with_builtin();
        let expr = Value::List(vec![
            Value::Symbol("plus".to_string()),
            Value::Int(1),
            Value::Int(2),
            Value::Int(3),
        ]);
        assert_eq!(evaluate(&expr, &env).unwrap(), Value::Int(6));
    }

    #[test]
    fn test_not_callable() {
        let env = Environment::new();
        let expr = Value::List(vec![Value::Int(1), Value::Int(2)]);
        assert!(matches!(
            evaluate(&expr, &env),
            Err(Error::Evaluation(msg)) if msg.contains("not callable")
        ));
    }

    #[test]
    fn test_map_literal_values_evaluate() {
        let env = env_with_builtin();
        env.define("x", Value::Int(41));

        let mut literal = Map::new_literal();
        literal.insert(MapKey::keyword("a"), Value::Symbol("x".to_string()));
        literal.insert(
            MapKey::keyword("b"),
            Value::List(vec![
                Value::Symbol("plus".to_string()),
                Value::Int(1),
                Value::Int(2),
            ]),
        );

        let result = evaluate(&Value::Map(literal), &env).unwrap();
        match result {
            Value::Map(map) => {
                assert!(!map.is_literal());
                assert_eq!(map.get(&MapKey::keyword("a")), Some(&Value::Int(41)));
                assert_eq!(map.get(&MapKey::keyword("b")), Some(&Value::Int(3)));
            }
            _ => panic!("Expected map"),
        }
    }

    #[test]
    fn test_function_application_binds_positionally() {
        let env = Environment::new();
        let square = Arc::new(Function {
            name: Some("square".to_string()),
            params: vec!["x".to_string()],
            body: vec![Value::List(vec![
                Value::Symbol("times".to_string()),
                Value::Symbol("x".to_string()),
                Value::Symbol("x".to_string()),
            ])],
            env: env.clone(),
            is_async: false,
        });
        env.define(
            "times",
            Value::Builtin(Builtin::new("times", |args, _| {
                match (&args[0], &args[1]) {
                    (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a * b)),
                    _ => Err(Error::Type("times expects ints".to_string())),
                }
            })),
        );

        let result = apply_function(&square, &[Value::Int(7)], &env).unwrap();
        assert_eq!(result, Value::Int(49));
    }

    #[test]
    fn test_arity_mismatch() {
        let env = Environment::new();
        let f = Arc::new(Function {
            name: None,
            params: vec!["a".to_string(), "b".to_string()],
            body: vec![Value::Nil],
            env: env.clone(),
            is_async: false,
        });
        assert!(matches!(
            apply_function(&f, &[Value::Int(1)], &env),
            Err(Error::Arity(_))
        ));
    }

    #[test]
    fn test_trampoline_rebinds_without_stack_growth() {
        // Hand-built countdown: body yields TailCall until n reaches 0
        let env = Environment::new();
        env.define(
            "countdown-step",
            Value::Builtin(Builtin::new("countdown-step", |args, _| {
                match &args[0] {
                    Value::Int(0) => Ok(Value::Str("done".to_string())),
                    Value::Int(n) => Ok(Value::TailCall(vec![Value::Int(n - 1)])),
                    other => Err(Error::type_mismatch("countdown-step", "int", other)),
                }
            })),
        );
        let f = Arc::new(Function {
            name: Some("countdown".to_string()),
            params: vec!["n".to_string()],
            body: vec![Value::List(vec![
                Value::Symbol("countdown-step".to_string()),
                Value::Symbol("n".to_string()),
            ])],
            env: env.clone(),
            is_async: false,
        });

        let result = apply_function(&f, &[Value::Int(50_000)], &env).unwrap();
        assert_eq!(result, Value::Str("done".to_string()));
    }
}
