//! # Built-in Functions Module
//!
//! Every builtin follows the uniform calling convention
//! `(args: &[Value], env: &Arc<Environment>) -> Result<Value>` and validates
//! its own arity and argument types. Categories register themselves through
//! functions generated by the `#[builtin]` attribute.
//!
//! ## Categories
//!
//! - **[arithmetic]**: +, -, *, /, %, abs, max, min
//! - **[comparison]**: =, <, >, <=, >=, not
//! - **[collections]**: list, vector, first, rest, nth, count, empty?, conj,
//!   cons, concat, reverse, range, map, filter, reduce, every?, some, sort
//! - **[maps]**: hash-map, assoc, dissoc, get, keys, vals, merge
//! - **[strings]**: str, split, join
//! - **[types]**: is-*? predicates and to-* conversions
//! - **[io]**: print, println, read-line, slurp, spit
//! - **[json]**: json-encode, json-decode
//! - **[http]**: http-get, http-post, http-put, http-delete, http-request
//! - **[promises]**: promise construction, chaining, combinators, timing,
//!   rate shaping, async collection ops
//! - **[testing]**: BDD assertions

use crate::env::Environment;
use std::sync::Arc;

pub mod arithmetic;
pub mod collections;
pub mod comparison;
pub mod http;
pub mod io;
pub mod json;
pub mod maps;
pub mod promises;
pub mod strings;
pub mod testing;
pub mod types;

/// Register all built-in functions in the environment
pub fn register_builtins(env: &Arc<Environment>) {
    arithmetic::register(env);
    comparison::register(env);
    collections::register(env);
    maps::register(env);
    strings::register(env);
    types::register(env);
    io::register(env);
    json::register(env);
    http::register(env);
    promises::register(env);
    testing::register(env);
}

/// A fresh global environment with every builtin bound. Scripts, the REPL,
/// and each loaded module root their environments here.
pub fn global_env() -> Arc<Environment> {
    let env = Environment::new();
    register_builtins(&env);
    env
}
