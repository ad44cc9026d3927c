//! JSON encoding and decoding: json-encode, json-decode
//!
//! Type mapping:
//! - nil ↔ null; booleans, numbers, strings direct
//! - vectors and lists → JSON arrays; arrays decode as vectors
//! - maps ↔ JSON objects; object keys decode as keyword symbols (`:name`)
//! - symbols encode as their name with any leading `:` stripped

use crate::env::Environment;
use crate::error::{Error, Result};
use crate::value::{Map, MapKey, Value};
use lispy_macros::builtin;
use std::sync::Arc;

fn value_to_json(value: &Value) -> Result<serde_json::Value> {
    match value {
        Value::Nil => Ok(serde_json::Value::Null),
        Value::Bool(b) => Ok(serde_json::Value::Bool(*b)),
        Value::Int(n) => Ok(serde_json::Value::Number((*n).into())),
        Value::Float(n) => serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .ok_or_else(|| {
                Error::Evaluation(format!("'json-encode' cannot convert number {} to JSON", n))
            }),
        Value::Str(s) => Ok(serde_json::Value::String(s.clone())),
        Value::Symbol(s) => Ok(serde_json::Value::String(
            s.strip_prefix(':').unwrap_or(s).to_string(),
        )),
        Value::List(items) | Value::Vector(items) => {
            let array: Result<Vec<_>> = items.iter().map(value_to_json).collect();
            Ok(serde_json::Value::Array(array?))
        }
        Value::Map(map) => {
            let mut object = serde_json::Map::new();
            for (key, val) in map.sorted_entries() {
                object.insert(key_to_string(key), value_to_json(val)?);
            }
            Ok(serde_json::Value::Object(object))
        }
        other => Err(Error::Type(format!(
            "'json-encode' cannot convert {} to JSON",
            other.type_name()
        ))),
    }
}

fn key_to_string(key: &MapKey) -> String {
    match key {
        MapKey::Symbol(s) => s.strip_prefix(':').unwrap_or(s).to_string(),
        MapKey::Str(s) => s.clone(),
        other => other.to_value().to_string(),
    }
}

fn json_to_value(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Nil,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_json::Value::String(s) => Value::Str(s.clone()),
        serde_json::Value::Array(array) => {
            Value::Vector(array.iter().map(json_to_value).collect())
        }
        serde_json::Value::Object(object) => {
            let mut map = Map::new();
            for (key, val) in object {
                map.insert(MapKey::keyword(key), json_to_value(val));
            }
            Value::Map(map)
        }
    }
}

#[builtin(name = "json-encode")]
/// Encodes a LisPy value as a JSON string.
pub fn json_encode(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.len() != 1 {
        return Err(Error::arity("json-encode", 1, args.len()));
    }
    let json = value_to_json(&args[0])?;
    serde_json::to_string(&json)
        .map(Value::Str)
        .map_err(|e| Error::Evaluation(format!("'json-encode' failed: {}", e)))
}

#[builtin(name = "json-decode")]
/// Decodes a JSON string into a LisPy value; object keys become keyword
/// symbols and arrays become vectors.
pub fn json_decode(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.len() != 1 {
        return Err(Error::arity("json-decode", 1, args.len()));
    }
    let text = match &args[0] {
        Value::Str(s) => s,
        other => return Err(Error::type_mismatch("json-decode", "a string", other)),
    };

    let json: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| Error::Evaluation(format!("'json-decode' failed: {}", e)))?;
    Ok(json_to_value(&json))
}

/// Encode helper shared with the HTTP request builder
pub(crate) fn encode_body(value: &Value) -> Result<String> {
    let json = value_to_json(value)?;
    serde_json::to_string(&json)
        .map_err(|e| Error::Evaluation(format!("'json-encode' failed: {}", e)))
}

/// Decode helper shared with the HTTP response builder
pub(crate) fn decode_if_json(body: &str) -> Option<Value> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .map(|json| json_to_value(&json))
}

/// Register all JSON builtins in the environment
pub fn register(env: &Arc<Environment>) {
    register_json_encode(env);
    register_json_decode(env);
}
