// ABOUTME: Environment module for managing variable bindings and scopes

use crate::error::{Error, Result};
use crate::value::Value;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A lexically-chained frame of name→value bindings. Lookup walks the parent
/// chain; `define` writes only to this frame. Frames are shared (`Arc`)
/// because closures and promise executors capture them, and locked because
/// promise executors evaluate on worker threads.
pub struct Environment {
    bindings: RwLock<HashMap<String, Value>>,
    parent: Option<Arc<Environment>>,
}

impl Environment {
    /// Creates a new global environment with no parent
    pub fn new() -> Arc<Self> {
        Arc::new(Environment {
            bindings: RwLock::new(HashMap::new()),
            parent: None,
        })
    }

    /// Creates a new child environment chained to a parent
    pub fn child(parent: &Arc<Environment>) -> Arc<Self> {
        Arc::new(Environment {
            bindings: RwLock::new(HashMap::new()),
            parent: Some(parent.clone()),
        })
    }

    /// Defines a binding in THIS frame (doesn't walk the parent chain)
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.bindings.write().insert(name.into(), value);
    }

    /// Looks up a symbol in this frame and parent frames
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.bindings.read().get(name) {
            return Some(value.clone());
        }

        match &self.parent {
            Some(parent) => parent.get(name),
            None => None,
        }
    }

    /// Like [`Environment::get`], but a miss is an `UnboundSymbolError`
    pub fn lookup(&self, name: &str) -> Result<Value> {
        self.get(name)
            .ok_or_else(|| Error::UnboundSymbol(name.to_string()))
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Binding names only: values may hold closures that point back here
        let mut names: Vec<String> = self.bindings.read().keys().cloned().collect();
        names.sort();
        f.debug_struct("Environment")
            .field("bindings", &names)
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_and_get() {
        let env = Environment::new();
        env.define("x", Value::Int(42));

        assert_eq!(env.get("x"), Some(Value::Int(42)));
    }

    #[test]
    fn test_undefined_symbol() {
        let env = Environment::new();
        assert!(env.get("undefined").is_none());
        assert!(matches!(
            env.lookup("undefined"),
            Err(Error::UnboundSymbol(name)) if name == "undefined"
        ));
    }

    #[test]
    fn test_shadowing() {
        let parent = Environment::new();
        parent.define("x", Value::Int(42));

        let child = Environment::child(&parent);
        child.define("x", Value::Int(100));

        assert_eq!(child.get("x"), Some(Value::Int(100)));
        assert_eq!(parent.get("x"), Some(Value::Int(42)));
    }

    #[test]
    fn test_parent_lookup() {
        let parent = Environment::new();
        parent.define("x", Value::Int(42));

        let child = Environment::child(&parent);
        assert_eq!(child.get("x"), Some(Value::Int(42)));
    }

    #[test]
    fn test_definition_stays_in_child() {
        let parent = Environment::new();
        let child = Environment::child(&parent);
        child.define("y", Value::Int(1));

        assert!(parent.get("y").is_none());
        assert_eq!(child.get("y"), Some(Value::Int(1)));
    }

    #[test]
    fn test_multiple_levels() {
        let grandparent = Environment::new();
        grandparent.define("a", Value::Int(1));

        let parent = Environment::child(&grandparent);
        parent.define("b", Value::Int(2));

        let child = Environment::child(&parent);
        child.define("c", Value::Int(3));

        assert_eq!(child.get("a"), Some(Value::Int(1)));
        assert_eq!(child.get("b"), Some(Value::Int(2)));
        assert_eq!(child.get("c"), Some(Value::Int(3)));
    }
}
