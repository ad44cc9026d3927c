//! Promise builtins: construction, chaining, combinators, timing, and the
//! async collection operations.
//!
//! Combinators register settlement callbacks instead of polling; waiting
//! happens on condvars inside the promise runtime.

use crate::env::Environment;
use crate::error::{Error, Result};
use crate::eval::apply;
use crate::promise::{adopt, reason_from_error, Promise, Settled};
use crate::value::{Builtin, Map, MapKey, Value};
use lispy_macros::builtin;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn expect_callable(function: &str, value: &Value) -> Result<Value> {
    match value {
        Value::Function(_) | Value::Builtin(_) => Ok(value.clone()),
        other => Err(Error::type_mismatch(function, "a function", other)),
    }
}

fn expect_zero_arg(function: &str, value: &Value) -> Result<Value> {
    if let Value::Function(f) = value {
        if !f.params.is_empty() {
            return Err(Error::Arity(format!(
                "'{}' expects a zero-argument function, got one taking {}",
                function,
                f.params.len()
            )));
        }
    }
    expect_callable(function, value)
}

fn expect_promise(function: &str, value: &Value) -> Result<Arc<Promise>> {
    match value {
        Value::Promise(promise) => Ok(promise.clone()),
        other => Err(Error::type_mismatch(function, "a promise", other)),
    }
}

fn millis(function: &str, value: &Value) -> Result<u64> {
    let n = value
        .as_number()
        .ok_or_else(|| Error::type_mismatch(function, "a number of milliseconds", value))?;
    if n < 0.0 {
        return Err(Error::Evaluation(format!(
            "'{}' delay must be non-negative, got {}",
            function, n
        )));
    }
    Ok(n as u64)
}

/// A collection argument of promises, remembering the container kind
fn promise_elements(function: &str, value: &Value) -> Result<(Vec<Arc<Promise>>, bool)> {
    let (items, is_vector) = match value {
        Value::Vector(items) => (items, true),
        Value::List(items) => (items, false),
        other => {
            return Err(Error::type_mismatch(
                function,
                "a list or vector of promises",
                other,
            ))
        }
    };

    let mut promises = Vec::with_capacity(items.len());
    for (position, item) in items.iter().enumerate() {
        match item {
            Value::Promise(promise) => promises.push(promise.clone()),
            other => {
                return Err(Error::Type(format!(
                    "'{}' expects every element to be a promise, got {} at position {}",
                    function,
                    other.type_name(),
                    position
                )))
            }
        }
    }
    Ok((promises, is_vector))
}

fn rebuild(is_vector: bool, items: Vec<Value>) -> Value {
    if is_vector {
        Value::Vector(items)
    } else {
        Value::List(items)
    }
}

/// Positional results plus an outstanding count, shared by the joining
/// combinators
struct JoinState {
    slots: Vec<Option<Value>>,
    remaining: usize,
}

impl JoinState {
    fn new(n: usize) -> Arc<Mutex<JoinState>> {
        Arc::new(Mutex::new(JoinState {
            slots: vec![None; n],
            remaining: n,
        }))
    }

    /// Store a result; returns the completed row when this was the last slot
    fn complete(&mut self, index: usize, value: Value) -> Option<Vec<Value>> {
        if self.slots[index].is_none() {
            self.slots[index] = Some(value);
            self.remaining -= 1;
        }
        if self.remaining == 0 {
            Some(
                self.slots
                    .iter()
                    .map(|slot| slot.clone().unwrap_or(Value::Nil))
                    .collect(),
            )
        } else {
            None
        }
    }
}

// ============================================================================
// Construction and chaining
// ============================================================================

#[builtin(name = "promise")]
/// `(promise f)` - runs the zero-argument function on a background worker;
/// resolves with its return value or rejects with the raised error.
pub fn promise_fn(args: &[Value], env: &Arc<Environment>) -> Result<Value> {
    if args.len() != 1 {
        return Err(Error::arity("promise", 1, args.len()));
    }
    let executor = expect_zero_arg("promise", &args[0])?;
    let env = env.clone();
    Ok(Value::Promise(Promise::spawn(move || {
        apply(&executor, &[], &env)
    })))
}

#[builtin(name = "resolve")]
/// An already-resolved promise.
pub fn resolve(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.len() != 1 {
        return Err(Error::arity("resolve", 1, args.len()));
    }
    Ok(Value::Promise(Promise::resolved(args[0].clone())))
}

#[builtin(name = "reject")]
/// An already-rejected promise.
pub fn reject(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.len() != 1 {
        return Err(Error::arity("reject", 1, args.len()));
    }
    Ok(Value::Promise(Promise::rejected(args[0].clone())))
}

#[builtin(name = "then")]
/// `(then p callback)` - on resolve, chains through the callback; a promise
/// returned by the callback is flattened one level. Rejections pass through.
pub fn then(args: &[Value], env: &Arc<Environment>) -> Result<Value> {
    if args.len() != 2 {
        return Err(Error::arity("then", 2, args.len()));
    }
    let source = expect_promise("then", &args[0])?;
    let callback = expect_callable("then", &args[1])?;

    let chained = Promise::pending();
    let target = chained.clone();
    let env = env.clone();
    source.on_settle(move |settled| match settled {
        Settled::Resolved(value) => match apply(&callback, &[value.clone()], &env) {
            Ok(Value::Promise(inner)) => adopt(target, &inner),
            Ok(value) => target.resolve(value),
            Err(e) => target.reject(reason_from_error(e)),
        },
        Settled::Rejected(reason) => target.reject(reason.clone()),
    });
    Ok(Value::Promise(chained))
}

#[builtin(name = "on-reject")]
/// `(on-reject p callback)` - on reject, recovers by resolving with the
/// callback's return value. Resolutions pass through.
pub fn on_reject(args: &[Value], env: &Arc<Environment>) -> Result<Value> {
    if args.len() != 2 {
        return Err(Error::arity("on-reject", 2, args.len()));
    }
    let source = expect_promise("on-reject", &args[0])?;
    let callback = expect_callable("on-reject", &args[1])?;

    let chained = Promise::pending();
    let target = chained.clone();
    let env = env.clone();
    source.on_settle(move |settled| match settled {
        Settled::Resolved(value) => target.resolve(value.clone()),
        Settled::Rejected(reason) => match apply(&callback, &[reason.clone()], &env) {
            Ok(value) => target.resolve(value),
            Err(e) => target.reject(reason_from_error(e)),
        },
    });
    Ok(Value::Promise(chained))
}

#[builtin(name = "on-complete")]
/// `(on-complete p callback)` - runs the callback with the promise itself on
/// any terminal state; preserves the original state unless the callback
/// throws, which rejects the chained promise with that error.
pub fn on_complete(args: &[Value], env: &Arc<Environment>) -> Result<Value> {
    if args.len() != 2 {
        return Err(Error::arity("on-complete", 2, args.len()));
    }
    let source = expect_promise("on-complete", &args[0])?;
    let callback = expect_callable("on-complete", &args[1])?;

    let chained = Promise::pending();
    let target = chained.clone();
    let env = env.clone();
    let observed = source.clone();
    source.on_settle(move |settled| {
        match apply(&callback, &[Value::Promise(observed.clone())], &env) {
            Ok(_) => target.settle(settled.clone()),
            Err(e) => target.reject(reason_from_error(e)),
        }
    });
    Ok(Value::Promise(chained))
}

// ============================================================================
// Combinators
// ============================================================================

#[builtin(name = "promise-all")]
/// Waits for all; resolves with a collection of values in positional order
/// (same container kind as the input); rejects fast on the first rejection.
pub fn promise_all(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.len() != 1 {
        return Err(Error::arity("promise-all", 1, args.len()));
    }
    let (promises, is_vector) = promise_elements("promise-all", &args[0])?;

    if promises.is_empty() {
        return Ok(Value::Promise(Promise::resolved(rebuild(is_vector, vec![]))));
    }

    let result = Promise::pending();
    let state = JoinState::new(promises.len());
    for (index, promise) in promises.iter().enumerate() {
        let result = result.clone();
        let state = state.clone();
        promise.on_settle(move |settled| match settled {
            Settled::Resolved(value) => {
                let row = state.lock().complete(index, value.clone());
                if let Some(items) = row {
                    result.resolve(rebuild(is_vector, items));
                }
            }
            Settled::Rejected(reason) => result.reject(reason.clone()),
        });
    }
    Ok(Value::Promise(result))
}

#[builtin(name = "promise-race")]
/// Settles as the first promise to settle; an empty input stays pending
/// forever.
pub fn promise_race(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.len() != 1 {
        return Err(Error::arity("promise-race", 1, args.len()));
    }
    let (promises, _) = promise_elements("promise-race", &args[0])?;

    let result = Promise::pending();
    for promise in &promises {
        let result = result.clone();
        promise.on_settle(move |settled| result.settle(settled.clone()));
    }
    Ok(Value::Promise(result))
}

#[builtin(name = "promise-any")]
/// Resolves with the first resolution; when every promise rejects, rejects
/// with an aggregate error listing the per-position reasons in input order.
pub fn promise_any(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.len() != 1 {
        return Err(Error::arity("promise-any", 1, args.len()));
    }
    let (promises, is_vector) = promise_elements("promise-any", &args[0])?;

    if promises.is_empty() {
        return Ok(Value::Promise(Promise::rejected(Value::Str(
            "AggregateError: All promises were rejected (empty collection)".to_string(),
        ))));
    }

    let result = Promise::pending();
    let state = JoinState::new(promises.len());
    for (index, promise) in promises.iter().enumerate() {
        let result = result.clone();
        let state = state.clone();
        promise.on_settle(move |settled| match settled {
            Settled::Resolved(value) => result.resolve(value.clone()),
            Settled::Rejected(reason) => {
                let row = state.lock().complete(index, reason.clone());
                if let Some(reasons) = row {
                    result.reject(Value::Str(format!(
                        "AggregateError: All promises were rejected - {}",
                        rebuild(is_vector, reasons).repr()
                    )));
                }
            }
        });
    }
    Ok(Value::Promise(result))
}

fn settled_status(settled: &Settled) -> Value {
    let mut status = Map::new();
    match settled {
        Settled::Resolved(value) => {
            status.insert(
                MapKey::keyword("status"),
                Value::Str("fulfilled".to_string()),
            );
            status.insert(MapKey::keyword("value"), value.clone());
        }
        Settled::Rejected(reason) => {
            status.insert(MapKey::keyword("status"), Value::Str("rejected".to_string()));
            status.insert(MapKey::keyword("reason"), reason.clone());
        }
    }
    Value::Map(status)
}

#[builtin(name = "promise-all-settled")]
/// Never rejects; resolves with per-element status maps
/// (`{:status "fulfilled" :value v}` / `{:status "rejected" :reason e}`)
/// preserving order and container kind.
pub fn promise_all_settled(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.len() != 1 {
        return Err(Error::arity("promise-all-settled", 1, args.len()));
    }
    let (promises, is_vector) = promise_elements("promise-all-settled", &args[0])?;

    if promises.is_empty() {
        return Ok(Value::Promise(Promise::resolved(rebuild(is_vector, vec![]))));
    }

    let result = Promise::pending();
    let state = JoinState::new(promises.len());
    for (index, promise) in promises.iter().enumerate() {
        let result = result.clone();
        let state = state.clone();
        promise.on_settle(move |settled| {
            let row = state.lock().complete(index, settled_status(settled));
            if let Some(items) = row {
                result.resolve(rebuild(is_vector, items));
            }
        });
    }
    Ok(Value::Promise(result))
}

// ============================================================================
// Timing and control
// ============================================================================

#[builtin(name = "timeout")]
/// `(timeout ms [value])` - resolves with the value (default nil) after the
/// given delay.
pub fn timeout(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.is_empty() || args.len() > 2 {
        return Err(Error::arity("timeout", "1-2", args.len()));
    }
    let ms = millis("timeout", &args[0])?;
    let value = args.get(1).cloned().unwrap_or(Value::Nil);
    Ok(Value::Promise(Promise::timer(ms, value)))
}

#[builtin(name = "with-timeout")]
/// `(with-timeout p fallback ms)` - resolves with p's value if it settles
/// first, or with the fallback when the timer expires first.
pub fn with_timeout(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.len() != 3 {
        return Err(Error::arity("with-timeout", 3, args.len()));
    }
    let source = expect_promise("with-timeout", &args[0])?;
    let fallback = args[1].clone();
    let ms = millis("with-timeout", &args[2])?;

    let result = Promise::pending();
    adopt(result.clone(), &source);
    let timer = Promise::timer(ms, Value::Nil);
    let late = result.clone();
    timer.on_settle(move |_| late.resolve(fallback.clone()));
    Ok(Value::Promise(result))
}

#[builtin(name = "retry")]
/// `(retry op max-attempts delay-ms)` - invokes the zero-argument op with
/// exponential backoff (delay, 2x, 4x, ...), resolving on first success and
/// rejecting after exhausting attempts with the last error.
pub fn retry(args: &[Value], env: &Arc<Environment>) -> Result<Value> {
    if args.len() != 3 {
        return Err(Error::arity("retry", 3, args.len()));
    }
    let op = expect_zero_arg("retry", &args[0])?;
    let max_attempts = match &args[1] {
        Value::Int(n) if *n >= 1 => *n,
        other => {
            return Err(Error::type_mismatch(
                "retry",
                "a positive attempt count",
                other,
            ))
        }
    };
    let delay = millis("retry", &args[2])?;

    let result = Promise::pending();
    let handle = result.clone();
    let env = env.clone();
    thread::spawn(move || {
        let mut last_error = Value::Nil;
        for attempt in 1..=max_attempts {
            match apply(&op, &[], &env) {
                Ok(Value::Promise(inner)) => match inner.wait() {
                    Settled::Resolved(value) => {
                        handle.resolve(value);
                        return;
                    }
                    Settled::Rejected(reason) => last_error = reason,
                },
                Ok(value) => {
                    handle.resolve(value);
                    return;
                }
                Err(e) => last_error = reason_from_error(e),
            }
            if attempt < max_attempts {
                let backoff = delay.saturating_mul(1u64 << (attempt - 1).min(32) as u32);
                thread::sleep(Duration::from_millis(backoff));
            }
        }
        handle.reject(Value::Str(format!(
            "'retry' failed after {} attempts: {}",
            max_attempts, last_error
        )));
    });
    Ok(Value::Promise(result))
}

// ============================================================================
// Rate shaping
// ============================================================================

#[builtin(name = "debounce")]
/// `(debounce f ms)` - a callable that delays execution until `ms` elapse
/// without another invocation; each call cancels the previous timer.
/// Fire-and-forget: calls return nil immediately.
pub fn debounce(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.len() != 2 {
        return Err(Error::arity("debounce", 2, args.len()));
    }
    let target = expect_callable("debounce", &args[0])?;
    let ms = millis("debounce", &args[1])?;

    // each invocation bumps the generation; a stale timer sees the mismatch
    // and gives up
    let generation: Arc<Mutex<u64>> = Arc::new(Mutex::new(0));

    Ok(Value::Builtin(Builtin::new("debounced", move |call_args, call_env| {
        let my_generation = {
            let mut current = generation.lock();
            *current += 1;
            *current
        };

        let target = target.clone();
        let call_args = call_args.to_vec();
        let call_env = call_env.clone();
        let generation = generation.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(ms));
            if *generation.lock() == my_generation {
                let _ = apply(&target, &call_args, &call_env);
            }
        });
        Ok(Value::Nil)
    })))
}

#[builtin(name = "throttle")]
/// `(throttle f ms)` - a callable that executes immediately, then ignores
/// invocations until `ms` elapse; the call crossing the next window executes
/// immediately. Suppressed calls return nil.
pub fn throttle(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.len() != 2 {
        return Err(Error::arity("throttle", 2, args.len()));
    }
    let target = expect_callable("throttle", &args[0])?;
    let ms = millis("throttle", &args[1])?;

    let last_run: Arc<Mutex<Option<Instant>>> = Arc::new(Mutex::new(None));

    Ok(Value::Builtin(Builtin::new("throttled", move |call_args, call_env| {
        let should_run = {
            let mut last = last_run.lock();
            let open = match *last {
                None => true,
                Some(at) => at.elapsed() >= Duration::from_millis(ms),
            };
            if open {
                *last = Some(Instant::now());
            }
            open
        };

        if should_run {
            apply(&target, call_args, call_env)
        } else {
            Ok(Value::Nil)
        }
    })))
}

// ============================================================================
// Async collection operations
// ============================================================================

/// Apply `f` to every element eagerly; the results may be a mix of plain
/// values and promises. Shared scaffolding for async-map and async-filter.
fn apply_each(
    function: &str,
    collection: &Value,
    f: &Value,
    env: &Arc<Environment>,
) -> Result<(Vec<Value>, Vec<Value>, bool)> {
    let (items, is_vector) = match collection {
        Value::Vector(items) => (items.clone(), true),
        Value::List(items) => (items.clone(), false),
        other => {
            return Err(Error::type_mismatch(
                function,
                "a list or vector",
                other,
            ))
        }
    };

    let mut results = Vec::with_capacity(items.len());
    for item in &items {
        results.push(apply(f, &[item.clone()], env)?);
    }
    Ok((items, results, is_vector))
}

/// Resolve `result` once every (possibly asynchronous) slot settles,
/// rejecting fast on the first rejection.
fn join_mixed(
    results: Vec<Value>,
    result: Arc<Promise>,
    finish: impl Fn(Vec<Value>) -> Value + Send + Sync + 'static,
) {
    let n = results.len();
    if n == 0 {
        result.resolve(finish(vec![]));
        return;
    }
    let state = JoinState::new(n);
    let finish = Arc::new(finish);

    for (index, value) in results.into_iter().enumerate() {
        match value {
            Value::Promise(promise) => {
                let result = result.clone();
                let state = state.clone();
                let finish = finish.clone();
                promise.on_settle(move |settled| match settled {
                    Settled::Resolved(value) => {
                        let row = state.lock().complete(index, value.clone());
                        if let Some(items) = row {
                            result.resolve(finish(items));
                        }
                    }
                    Settled::Rejected(reason) => result.reject(reason.clone()),
                });
            }
            plain => {
                let row = state.lock().complete(index, plain);
                if let Some(items) = row {
                    result.resolve(finish(items));
                }
            }
        }
    }
}

#[builtin(name = "async-map")]
/// `(async-map coll f)` - applies f to each element; every application
/// starts before any result is awaited. Resolves with results in input
/// order; rejects fast on the first failure.
pub fn async_map(args: &[Value], env: &Arc<Environment>) -> Result<Value> {
    if args.len() != 2 {
        return Err(Error::arity("async-map", 2, args.len()));
    }
    expect_callable("async-map", &args[1])?;

    let result = Promise::pending();
    match apply_each("async-map", &args[0], &args[1], env) {
        Ok((_, results, is_vector)) => {
            join_mixed(results, result.clone(), move |items| {
                rebuild(is_vector, items)
            });
        }
        Err(e) => result.reject(reason_from_error(e)),
    }
    Ok(Value::Promise(result))
}

#[builtin(name = "async-filter")]
/// `(async-filter coll pred)` - keeps elements whose awaited predicate
/// result is truthy, preserving input order.
pub fn async_filter(args: &[Value], env: &Arc<Environment>) -> Result<Value> {
    if args.len() != 2 {
        return Err(Error::arity("async-filter", 2, args.len()));
    }
    expect_callable("async-filter", &args[1])?;

    let result = Promise::pending();
    match apply_each("async-filter", &args[0], &args[1], env) {
        Ok((items, results, is_vector)) => {
            join_mixed(results, result.clone(), move |decisions| {
                let kept: Vec<Value> = items
                    .iter()
                    .zip(&decisions)
                    .filter(|(_, decision)| decision.is_truthy())
                    .map(|(item, _)| item.clone())
                    .collect();
                rebuild(is_vector, kept)
            });
        }
        Err(e) => result.reject(reason_from_error(e)),
    }
    Ok(Value::Promise(result))
}

#[builtin(name = "async-reduce")]
/// `(async-reduce coll reducer init)` - sequential by contract: each step
/// sees the prior accumulator and may return a value or a promise.
/// Resolves with the final accumulator.
pub fn async_reduce(args: &[Value], env: &Arc<Environment>) -> Result<Value> {
    if args.len() != 3 {
        return Err(Error::arity("async-reduce", 3, args.len()));
    }
    let items = match &args[0] {
        Value::List(items) | Value::Vector(items) => items.clone(),
        other => return Err(Error::type_mismatch("async-reduce", "a list or vector", other)),
    };
    let reducer = expect_callable("async-reduce", &args[1])?;
    if let Value::Function(f) = &reducer {
        if f.params.len() != 2 {
            return Err(Error::Arity(format!(
                "'async-reduce' reducer expects 2 parameters (accumulator, element), got {}",
                f.params.len()
            )));
        }
    }
    let init = args[2].clone();

    let result = Promise::pending();
    let handle = result.clone();
    let env = env.clone();
    thread::spawn(move || {
        let mut accumulator = init;
        for item in items {
            match apply(&reducer, &[accumulator.clone(), item], &env) {
                Ok(Value::Promise(step)) => match step.wait() {
                    Settled::Resolved(value) => accumulator = value,
                    Settled::Rejected(reason) => {
                        handle.reject(reason);
                        return;
                    }
                },
                Ok(value) => accumulator = value,
                Err(e) => {
                    handle.reject(reason_from_error(e));
                    return;
                }
            }
        }
        handle.resolve(accumulator);
    });
    Ok(Value::Promise(result))
}

/// Register all promise builtins in the environment
pub fn register(env: &Arc<Environment>) {
    register_promise_fn(env);
    register_resolve(env);
    register_reject(env);
    register_then(env);
    register_on_reject(env);
    register_on_complete(env);
    register_promise_all(env);
    register_promise_race(env);
    register_promise_any(env);
    register_promise_all_settled(env);
    register_timeout(env);
    register_with_timeout(env);
    register_retry(env);
    register_debounce(env);
    register_throttle(env);
    register_async_map(env);
    register_async_filter(env);
    register_async_reduce(env);
}
