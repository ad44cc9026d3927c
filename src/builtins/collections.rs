//! Collection operations over lists and vectors
//!
//! Construction, access, and the map/filter/reduce family. Operations
//! preserve the input collection kind unless noted (Clojure-style `conj`
//! prepends to lists and appends to vectors).

use crate::env::Environment;
use crate::error::{Error, Result};
use crate::eval::apply;
use crate::value::Value;
use lispy_macros::builtin;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::sync::Arc;

fn elements<'a>(function: &str, value: &'a Value) -> Result<&'a Vec<Value>> {
    match value {
        Value::List(items) | Value::Vector(items) => Ok(items),
        other => Err(Error::type_mismatch(function, "a list or vector", other)),
    }
}

/// Rebuild a collection with the same kind as `like`
fn same_kind(like: &Value, items: Vec<Value>) -> Value {
    match like {
        Value::Vector(_) => Value::Vector(items),
        _ => Value::List(items),
    }
}

#[builtin(name = "list")]
/// Builds a list from its arguments.
pub fn list(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    Ok(Value::List(args.to_vec()))
}

#[builtin(name = "vector")]
/// Builds a vector from its arguments.
pub fn vector(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    Ok(Value::Vector(args.to_vec()))
}

#[builtin(name = "first")]
/// First element of a collection, or nil when empty (or nil).
pub fn first(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.len() != 1 {
        return Err(Error::arity("first", 1, args.len()));
    }
    match &args[0] {
        Value::Nil => Ok(Value::Nil),
        other => Ok(elements("first", other)?
            .first()
            .cloned()
            .unwrap_or(Value::Nil)),
    }
}

#[builtin(name = "rest")]
/// Everything but the first element, preserving collection kind.
pub fn rest(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.len() != 1 {
        return Err(Error::arity("rest", 1, args.len()));
    }
    match &args[0] {
        Value::Nil => Ok(Value::List(vec![])),
        other => {
            let items = elements("rest", other)?;
            let tail = if items.is_empty() {
                vec![]
            } else {
                items[1..].to_vec()
            };
            Ok(same_kind(other, tail))
        }
    }
}

#[builtin(name = "nth")]
/// Element at a zero-based index; out of bounds is an index error.
pub fn nth(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.len() != 2 {
        return Err(Error::arity("nth", 2, args.len()));
    }

    let index = match &args[1] {
        Value::Int(n) => *n,
        other => return Err(Error::type_mismatch("nth", "an integer index", other)),
    };

    match &args[0] {
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            if index < 0 || index as usize >= chars.len() {
                return Err(Error::Index(format!(
                    "Index {} out of bounds for string of length {}",
                    index,
                    chars.len()
                )));
            }
            Ok(Value::Str(chars[index as usize].to_string()))
        }
        other => {
            let items = elements("nth", other)?;
            if index < 0 || index as usize >= items.len() {
                return Err(Error::Index(format!(
                    "Index {} out of bounds for collection of length {}",
                    index,
                    items.len()
                )));
            }
            Ok(items[index as usize].clone())
        }
    }
}

#[builtin(name = "count")]
/// Number of elements; nil counts as 0, strings count characters.
pub fn count(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.len() != 1 {
        return Err(Error::arity("count", 1, args.len()));
    }
    let n = match &args[0] {
        Value::Nil => 0,
        Value::Str(s) => s.chars().count(),
        Value::Map(map) => map.len(),
        other => elements("count", other)?.len(),
    };
    Ok(Value::Int(n as i64))
}

#[builtin(name = "empty?")]
/// Whether a collection (or nil) has no elements.
pub fn is_empty(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.len() != 1 {
        return Err(Error::arity("empty?", 1, args.len()));
    }
    let empty = match &args[0] {
        Value::Nil => true,
        Value::Str(s) => s.is_empty(),
        Value::Map(map) => map.is_empty(),
        other => elements("empty?", other)?.is_empty(),
    };
    Ok(Value::Bool(empty))
}

#[builtin(name = "conj")]
/// Adds elements the efficient way: vectors append, lists prepend.
/// nil becomes a list of the elements.
pub fn conj(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.len() < 2 {
        return Err(Error::arity("conj", "at least 2", args.len()));
    }

    match &args[0] {
        Value::Nil => Ok(Value::List(args[1..].to_vec())),
        Value::Vector(items) => {
            let mut result = items.clone();
            result.extend_from_slice(&args[1..]);
            Ok(Value::Vector(result))
        }
        Value::List(items) => {
            let mut result = items.clone();
            for element in args[1..].iter().rev() {
                result.insert(0, element.clone());
            }
            Ok(Value::List(result))
        }
        other => Err(Error::type_mismatch("conj", "a list or vector", other)),
    }
}

#[builtin(name = "cons")]
/// Prepends an element, producing a list.
pub fn cons(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.len() != 2 {
        return Err(Error::arity("cons", 2, args.len()));
    }
    let tail = match &args[1] {
        Value::Nil => vec![],
        other => elements("cons", other)?.clone(),
    };
    let mut result = Vec::with_capacity(tail.len() + 1);
    result.push(args[0].clone());
    result.extend(tail);
    Ok(Value::List(result))
}

#[builtin(name = "concat")]
/// Concatenates collections; the result keeps the first argument's kind.
pub fn concat(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.is_empty() {
        return Ok(Value::List(vec![]));
    }
    let mut result = Vec::new();
    for arg in args {
        match arg {
            Value::Nil => {}
            other => result.extend(elements("concat", other)?.iter().cloned()),
        }
    }
    Ok(same_kind(&args[0], result))
}

#[builtin(name = "reverse")]
/// Reverses a collection or string, preserving kind.
pub fn reverse(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.len() != 1 {
        return Err(Error::arity("reverse", 1, args.len()));
    }
    match &args[0] {
        Value::Str(s) => Ok(Value::Str(s.chars().rev().collect())),
        other => {
            let mut items = elements("reverse", other)?.clone();
            items.reverse();
            Ok(same_kind(other, items))
        }
    }
}

#[builtin(name = "range")]
/// `(range end)`, `(range start end)`, or `(range start end step)` -
/// a vector of integers, end exclusive.
pub fn range(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    let as_int = |value: &Value| match value {
        Value::Int(n) => Ok(*n),
        other => Err(Error::type_mismatch("range", "an integer", other)),
    };

    let (start, end, step) = match args.len() {
        1 => (0, as_int(&args[0])?, 1),
        2 => (as_int(&args[0])?, as_int(&args[1])?, 1),
        3 => (as_int(&args[0])?, as_int(&args[1])?, as_int(&args[2])?),
        n => return Err(Error::arity("range", "1-3", n)),
    };

    if step == 0 {
        return Err(Error::Evaluation("'range' step must not be zero".to_string()));
    }

    let mut items = Vec::new();
    let mut current = start;
    while (step > 0 && current < end) || (step < 0 && current > end) {
        items.push(Value::Int(current));
        current += step;
    }
    Ok(Value::Vector(items))
}

#[builtin(name = "map")]
/// Applies a function to each element, preserving collection kind.
pub fn map_fn(args: &[Value], env: &Arc<Environment>) -> Result<Value> {
    if args.len() != 2 {
        return Err(Error::arity("map", 2, args.len()));
    }
    let items = elements("map", &args[1])?;
    let mut result = Vec::with_capacity(items.len());
    for item in items {
        result.push(apply(&args[0], &[item.clone()], env)?);
    }
    Ok(same_kind(&args[1], result))
}

#[builtin(name = "filter")]
/// Keeps elements where the predicate result is truthy.
pub fn filter_fn(args: &[Value], env: &Arc<Environment>) -> Result<Value> {
    if args.len() != 2 {
        return Err(Error::arity("filter", 2, args.len()));
    }
    let items = elements("filter", &args[1])?;
    let mut result = Vec::new();
    for item in items {
        if apply(&args[0], &[item.clone()], env)?.is_truthy() {
            result.push(item.clone());
        }
    }
    Ok(same_kind(&args[1], result))
}

#[builtin(name = "reduce")]
/// `(reduce f init coll)` - folds left with a binary reducer.
pub fn reduce_fn(args: &[Value], env: &Arc<Environment>) -> Result<Value> {
    if args.len() != 3 {
        return Err(Error::arity("reduce", 3, args.len()));
    }
    let items = elements("reduce", &args[2])?;
    let mut acc = args[1].clone();
    for item in items {
        acc = apply(&args[0], &[acc, item.clone()], env)?;
    }
    Ok(acc)
}

#[builtin(name = "every?")]
/// True when the predicate holds for every element.
pub fn every(args: &[Value], env: &Arc<Environment>) -> Result<Value> {
    if args.len() != 2 {
        return Err(Error::arity("every?", 2, args.len()));
    }
    let items = elements("every?", &args[1])?;
    for item in items {
        if !apply(&args[0], &[item.clone()], env)?.is_truthy() {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

#[builtin(name = "some")]
/// First truthy predicate result, or nil.
pub fn some(args: &[Value], env: &Arc<Environment>) -> Result<Value> {
    if args.len() != 2 {
        return Err(Error::arity("some", 2, args.len()));
    }
    let items = elements("some", &args[1])?;
    for item in items {
        let result = apply(&args[0], &[item.clone()], env)?;
        if result.is_truthy() {
            return Ok(result);
        }
    }
    Ok(Value::Nil)
}

fn default_compare(a: &Value, b: &Value) -> Result<Ordering> {
    match (a, b) {
        (Value::Str(x), Value::Str(y)) => Ok(x.cmp(y)),
        _ => match (a.as_number(), b.as_number()) {
            (Some(x), Some(y)) => Ok(x.partial_cmp(&y).unwrap_or(Ordering::Equal)),
            _ => Err(Error::Type(format!(
                "'sort' cannot compare {} with {}",
                a.type_name(),
                b.type_name()
            ))),
        },
    }
}

#[builtin(name = "sort")]
/// Sorts numbers or strings ascending; an optional comparator returning a
/// negative number (or true) orders its first argument earlier.
pub fn sort(args: &[Value], env: &Arc<Environment>) -> Result<Value> {
    if args.is_empty() || args.len() > 2 {
        return Err(Error::arity("sort", "1-2", args.len()));
    }

    let mut items = elements("sort", &args[0])?.clone();
    let failure: RefCell<Option<Error>> = RefCell::new(None);

    items.sort_by(|a, b| {
        if failure.borrow().is_some() {
            return Ordering::Equal;
        }
        let ordering = match args.get(1) {
            None => default_compare(a, b),
            Some(comparator) => {
                apply(comparator, &[a.clone(), b.clone()], env).map(|decision| match decision {
                    Value::Int(n) => n.cmp(&0),
                    Value::Float(n) => n.partial_cmp(&0.0).unwrap_or(Ordering::Equal),
                    Value::Bool(true) => Ordering::Less,
                    _ => Ordering::Greater,
                })
            }
        };
        match ordering {
            Ok(ordering) => ordering,
            Err(e) => {
                *failure.borrow_mut() = Some(e);
                Ordering::Equal
            }
        }
    });

    if let Some(e) = failure.into_inner() {
        return Err(e);
    }
    Ok(same_kind(&args[0], items))
}

/// Register all collection builtins in the environment
pub fn register(env: &Arc<Environment>) {
    register_list(env);
    register_vector(env);
    register_first(env);
    register_rest(env);
    register_nth(env);
    register_count(env);
    register_is_empty(env);
    register_conj(env);
    register_cons(env);
    register_concat(env);
    register_reverse(env);
    register_range(env);
    register_map_fn(env);
    register_filter_fn(env);
    register_reduce_fn(env);
    register_every(env);
    register_some(env);
    register_sort(env);
}
