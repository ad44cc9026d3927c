//! Map operations: hash-map, assoc, dissoc, get, keys, vals, merge
//!
//! Keys may be any hashable value; integral floats collapse onto the
//! matching integer key.

use crate::env::Environment;
use crate::error::{Error, Result};
use crate::value::{Map, MapKey, Value};
use lispy_macros::builtin;
use std::sync::Arc;

fn expect_map<'a>(function: &str, value: &'a Value) -> Result<&'a Map> {
    match value {
        Value::Map(map) => Ok(map),
        other => Err(Error::type_mismatch(function, "a map", other)),
    }
}

#[builtin(name = "hash-map")]
/// Builds a map from alternating keys and values.
pub fn hash_map(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.len() % 2 != 0 {
        return Err(Error::Evaluation(format!(
            "'hash-map' requires an even number of arguments (key-value pairs), got {}",
            args.len()
        )));
    }

    let mut map = Map::new();
    for pair in args.chunks(2) {
        map.insert(MapKey::try_from(&pair[0])?, pair[1].clone());
    }
    Ok(Value::Map(map))
}

#[builtin(name = "assoc")]
/// Returns a new map with the given keys set.
pub fn assoc(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.len() < 3 || args.len() % 2 == 0 {
        return Err(Error::arity("assoc", "a map plus key-value pairs", args.len()));
    }

    let mut map = expect_map("assoc", &args[0])?.clone().into_runtime();
    for pair in args[1..].chunks(2) {
        map.insert(MapKey::try_from(&pair[0])?, pair[1].clone());
    }
    Ok(Value::Map(map))
}

#[builtin(name = "dissoc")]
/// Returns a new map without the given keys.
pub fn dissoc(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.len() < 2 {
        return Err(Error::arity("dissoc", "at least 2", args.len()));
    }

    let mut map = expect_map("dissoc", &args[0])?.clone().into_runtime();
    for key in &args[1..] {
        map.remove(&MapKey::try_from(key)?);
    }
    Ok(Value::Map(map))
}

#[builtin(name = "get")]
/// `(get collection key [default])` - map lookup (missing yields the
/// default, or nil) or vector indexing (out of bounds without a default is
/// an index error).
pub fn get(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.len() < 2 || args.len() > 3 {
        return Err(Error::arity("get", "2-3", args.len()));
    }
    let default = args.get(2);

    match &args[0] {
        Value::Map(map) => {
            let key = MapKey::try_from(&args[1])?;
            Ok(map
                .get(&key)
                .cloned()
                .or_else(|| default.cloned())
                .unwrap_or(Value::Nil))
        }
        Value::Vector(items) => {
            let index = match &args[1] {
                Value::Int(n) => *n,
                other => return Err(Error::type_mismatch("get", "an integer index", other)),
            };
            if index >= 0 && (index as usize) < items.len() {
                Ok(items[index as usize].clone())
            } else if let Some(default) = default {
                Ok(default.clone())
            } else {
                Err(Error::Index(format!(
                    "{} out of bounds for vector of size {}",
                    index,
                    items.len()
                )))
            }
        }
        other => Err(Error::type_mismatch("get", "a map or vector", other)),
    }
}

#[builtin(name = "keys")]
/// Map keys as a vector, in canonical order.
pub fn keys(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.len() != 1 {
        return Err(Error::arity("keys", 1, args.len()));
    }
    let map = expect_map("keys", &args[0])?;
    Ok(Value::Vector(
        map.sorted_entries()
            .iter()
            .map(|(k, _)| k.to_value())
            .collect(),
    ))
}

#[builtin(name = "vals")]
/// Map values as a vector, in canonical key order.
pub fn vals(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.len() != 1 {
        return Err(Error::arity("vals", 1, args.len()));
    }
    let map = expect_map("vals", &args[0])?;
    Ok(Value::Vector(
        map.sorted_entries()
            .iter()
            .map(|(_, v)| (*v).clone())
            .collect(),
    ))
}

#[builtin(name = "merge")]
/// Merges maps left to right; later maps win on key collisions.
pub fn merge(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.is_empty() {
        return Ok(Value::Map(Map::new()));
    }

    let mut result = Map::new();
    for arg in args {
        match arg {
            Value::Nil => {}
            other => {
                for (key, value) in expect_map("merge", other)?.iter() {
                    result.insert(key.clone(), value.clone());
                }
            }
        }
    }
    Ok(Value::Map(result))
}

/// Register all map builtins in the environment
pub fn register(env: &Arc<Environment>) {
    register_hash_map(env);
    register_assoc(env);
    register_dissoc(env);
    register_get(env);
    register_keys(env);
    register_vals(env);
    register_merge(env);
}
