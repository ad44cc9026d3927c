// ABOUTME: Promise runtime - single-assignment async values on worker threads

use crate::error::Error;
use crate::value::Value;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Terminal state of a promise. Rejection reasons are ordinary values:
/// `(reject v)` stores `v`, a thrown payload is stored as-is, and any other
/// evaluator error is stored as its rendered message.
#[derive(Debug, Clone, PartialEq)]
pub enum Settled {
    Resolved(Value),
    Rejected(Value),
}

type Callback = Box<dyn FnOnce(&Settled) + Send>;

/// A single-assignment container for an eventual value or error.
///
/// State transitions are atomic with respect to callback registration: the
/// mutex guards both, the first settlement wins, and waiters block on a
/// condvar rather than polling.
pub struct Promise {
    inner: Mutex<Inner>,
    settled: Condvar,
}

struct Inner {
    state: Option<Settled>,
    callbacks: Vec<Callback>,
}

impl Promise {
    pub fn pending() -> Arc<Promise> {
        Arc::new(Promise {
            inner: Mutex::new(Inner {
                state: None,
                callbacks: Vec::new(),
            }),
            settled: Condvar::new(),
        })
    }

    /// An already-resolved promise
    pub fn resolved(value: Value) -> Arc<Promise> {
        let promise = Promise::pending();
        promise.resolve(value);
        promise
    }

    /// An already-rejected promise
    pub fn rejected(reason: Value) -> Arc<Promise> {
        let promise = Promise::pending();
        promise.reject(reason);
        promise
    }

    /// Run `executor` on a background worker; the promise resolves with its
    /// return value or rejects with the raised error.
    pub fn spawn<F>(executor: F) -> Arc<Promise>
    where
        F: FnOnce() -> crate::error::Result<Value> + Send + 'static,
    {
        let promise = Promise::pending();
        let handle = promise.clone();
        thread::spawn(move || match executor() {
            Ok(value) => handle.resolve(value),
            Err(e) => handle.reject(reason_from_error(e)),
        });
        promise
    }

    /// A promise that resolves with `value` after `ms` milliseconds
    pub fn timer(ms: u64, value: Value) -> Arc<Promise> {
        let promise = Promise::pending();
        let handle = promise.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(ms));
            handle.resolve(value);
        });
        promise
    }

    pub fn resolve(&self, value: Value) {
        self.settle(Settled::Resolved(value));
    }

    pub fn reject(&self, reason: Value) {
        self.settle(Settled::Rejected(reason));
    }

    /// First settlement wins; later calls are ignored. Registered callbacks
    /// run in registration order, outside the lock.
    pub fn settle(&self, outcome: Settled) {
        let callbacks = {
            let mut inner = self.inner.lock();
            if inner.state.is_some() {
                return;
            }
            inner.state = Some(outcome.clone());
            std::mem::take(&mut inner.callbacks)
        };

        self.settled.notify_all();
        for callback in callbacks {
            callback(&outcome);
        }
    }

    /// Snapshot of the current state; `None` while pending
    pub fn state(&self) -> Option<Settled> {
        self.inner.lock().state.clone()
    }

    pub fn is_pending(&self) -> bool {
        self.inner.lock().state.is_none()
    }

    /// Block the current task until the promise settles
    pub fn wait(&self) -> Settled {
        let mut inner = self.inner.lock();
        while inner.state.is_none() {
            self.settled.wait(&mut inner);
        }
        inner.state.clone().unwrap_or(Settled::Resolved(Value::Nil))
    }

    /// Run `callback` on settlement (immediately when already settled)
    pub fn on_settle<F>(&self, callback: F)
    where
        F: FnOnce(&Settled) + Send + 'static,
    {
        let settled = {
            let mut inner = self.inner.lock();
            match &inner.state {
                None => {
                    inner.callbacks.push(Box::new(callback));
                    return;
                }
                Some(settled) => settled.clone(),
            }
        };
        callback(&settled);
    }

    /// Printed form, mirroring the promise's lifecycle
    pub fn describe(&self) -> String {
        match self.state() {
            None => "Promise(pending)".to_string(),
            Some(Settled::Resolved(v)) => format!("Promise(resolved: {})", v.repr()),
            Some(Settled::Rejected(e)) => format!("Promise(rejected: {})", e.repr()),
        }
    }
}

/// Forward `source`'s eventual state into `target` (one-level flattening
/// for `then` callbacks that return promises)
pub fn adopt(target: Arc<Promise>, source: &Arc<Promise>) {
    source.on_settle(move |settled| target.settle(settled.clone()));
}

/// Convert an evaluator error into a rejection reason value
pub fn reason_from_error(e: Error) -> Value {
    match e {
        Error::Thrown(payload) => payload,
        other => Value::Str(other.to_string()),
    }
}

impl std::fmt::Debug for Promise {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_settlement_wins() {
        let p = Promise::pending();
        p.resolve(Value::Int(1));
        p.reject(Value::Str("late".to_string()));
        assert_eq!(p.state(), Some(Settled::Resolved(Value::Int(1))));

        let p = Promise::pending();
        p.reject(Value::Str("err".to_string()));
        p.resolve(Value::Int(2));
        assert_eq!(
            p.state(),
            Some(Settled::Rejected(Value::Str("err".to_string())))
        );
    }

    #[test]
    fn test_spawn_resolves_with_return_value() {
        let p = Promise::spawn(|| Ok(Value::Int(42)));
        assert_eq!(p.wait(), Settled::Resolved(Value::Int(42)));
    }

    #[test]
    fn test_spawn_rejects_with_error_reason() {
        let p = Promise::spawn(|| Err(Error::Thrown(Value::Str("boom".to_string()))));
        assert_eq!(
            p.wait(),
            Settled::Rejected(Value::Str("boom".to_string()))
        );
    }

    #[test]
    fn test_wait_blocks_until_settled() {
        let p = Promise::pending();
        let handle = p.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            handle.resolve(Value::Str("done".to_string()));
        });
        assert_eq!(
            p.wait(),
            Settled::Resolved(Value::Str("done".to_string()))
        );
    }

    #[test]
    fn test_callbacks_run_in_registration_order() {
        let p = Promise::pending();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let order = order.clone();
            p.on_settle(move |_| order.lock().push(i));
        }
        p.resolve(Value::Nil);

        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn test_on_settle_after_settlement_runs_immediately() {
        let p = Promise::resolved(Value::Int(5));
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        p.on_settle(move |s| *sink.lock() = Some(s.clone()));
        assert_eq!(*seen.lock(), Some(Settled::Resolved(Value::Int(5))));
    }

    #[test]
    fn test_timer_resolves_after_delay() {
        let p = Promise::timer(10, Value::Str("tick".to_string()));
        assert!(p.is_pending());
        assert_eq!(
            p.wait(),
            Settled::Resolved(Value::Str("tick".to_string()))
        );
    }

    #[test]
    fn test_adopt_forwards_state() {
        let source = Promise::pending();
        let target = Promise::pending();
        adopt(target.clone(), &source);
        source.resolve(Value::Int(9));
        assert_eq!(target.wait(), Settled::Resolved(Value::Int(9)));
    }

    #[test]
    fn test_describe_tracks_lifecycle() {
        let p = Promise::pending();
        assert_eq!(p.describe(), "Promise(pending)");
        p.resolve(Value::Int(1));
        assert_eq!(p.describe(), "Promise(resolved: 1)");
    }
}
