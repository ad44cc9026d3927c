// ABOUTME: Module loader - resolve, evaluate, and cache .lpy modules

use crate::builtins;
use crate::env::Environment;
use crate::error::{Error, Result};
use crate::eval::evaluate;
use crate::lexer::tokenize;
use crate::reader::parse_all;
use crate::value::Value;
use parking_lot::Mutex;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

/// A loaded LisPy module: its private environment (rooted on a fresh global
/// with all builtins) and the names it exports.
pub struct Module {
    pub name: String,
    pub path: PathBuf,
    pub env: Arc<Environment>,
    exports: Mutex<Vec<String>>,
}

impl Module {
    fn new(name: &str, path: &Path) -> Arc<Module> {
        Arc::new(Module {
            name: name.to_string(),
            path: path.to_path_buf(),
            env: builtins::global_env(),
            exports: Mutex::new(Vec::new()),
        })
    }

    /// Record a symbol as exported (`export` forms call this during load)
    pub fn add_export(&self, symbol: &str) {
        let mut exports = self.exports.lock();
        if !exports.iter().any(|s| s == symbol) {
            exports.push(symbol.to_string());
        }
    }

    pub fn exports(&self) -> Vec<String> {
        self.exports.lock().clone()
    }

    pub fn is_exported(&self, symbol: &str) -> bool {
        self.exports.lock().iter().any(|s| s == symbol)
    }

    /// Value of an exported symbol; requesting anything else is an import
    /// error
    pub fn exported_value(&self, symbol: &str) -> Result<Value> {
        if !self.is_exported(symbol) {
            return Err(Error::Import(format!(
                "Symbol '{}' is not exported by module '{}'",
                symbol, self.name
            )));
        }
        self.env.get(symbol).ok_or_else(|| {
            Error::Import(format!(
                "Symbol '{}' is exported but not defined in module '{}'",
                symbol, self.name
            ))
        })
    }
}

/// Handles locating, loading, and caching modules. Load paths are an ordered
/// list of directories; `"a/b"` resolves to the first `a/b.lpy` found.
pub struct ModuleLoader {
    state: Mutex<LoaderState>,
}

struct LoaderState {
    cache: HashMap<String, Arc<Module>>,
    loading: HashSet<String>,
    load_paths: Vec<PathBuf>,
}

impl ModuleLoader {
    fn new() -> Self {
        ModuleLoader {
            state: Mutex::new(LoaderState {
                cache: HashMap::new(),
                loading: HashSet::new(),
                load_paths: vec![PathBuf::from(".")],
            }),
        }
    }

    /// Add a directory to the module load path (idempotent)
    pub fn add_load_path(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        let mut state = self.state.lock();
        if !state.load_paths.contains(&path) {
            state.load_paths.push(path);
        }
    }

    /// Load a module by name; cached modules are never re-evaluated
    pub fn load(&self, name: &str) -> Result<Arc<Module>> {
        {
            let state = self.state.lock();
            if let Some(module) = state.cache.get(name) {
                return Ok(module.clone());
            }
            if state.loading.contains(name) {
                return Err(Error::CircularDependency(format!(
                    "module '{}' is already being loaded",
                    name
                )));
            }
        }

        let path = self.find_module_file(name)?;

        self.state.lock().loading.insert(name.to_string());
        let result = self.evaluate_module(name, &path);
        // the loading marker clears on success and on failure
        self.state.lock().loading.remove(name);

        let module = result?;
        self.state
            .lock()
            .cache
            .insert(name.to_string(), module.clone());
        Ok(module)
    }

    /// Resolve a dotted/slashed module name against the load path
    fn find_module_file(&self, name: &str) -> Result<PathBuf> {
        let relative = PathBuf::from(format!("{}.lpy", name));
        let load_paths = self.state.lock().load_paths.clone();

        for base in &load_paths {
            let candidate = base.join(&relative);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }

        Err(Error::Import(format!(
            "module '{}' not found in load paths: {}",
            name,
            load_paths
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        )))
    }

    /// Read, parse, and evaluate every top-level form in a fresh module
    /// environment, with the module set as current so `export` forms know
    /// where to record their names.
    fn evaluate_module(&self, name: &str, path: &Path) -> Result<Arc<Module>> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            Error::Import(format!("could not read module '{}': {}", name, e))
        })?;

        let tokens = tokenize(&source)?;
        let forms = parse_all(&tokens)?;

        let module = Module::new(name, path);
        let _context = CurrentModule::enter(module.clone());
        for form in &forms {
            evaluate(form, &module.env)?;
        }
        Ok(module)
    }
}

static LOADER: LazyLock<ModuleLoader> = LazyLock::new(ModuleLoader::new);

/// The process-wide module loader
pub fn loader() -> &'static ModuleLoader {
    &LOADER
}

thread_local! {
    /// Stack of modules currently being evaluated on this thread; nested
    /// loads restore their parent context
    static CURRENT_MODULE: RefCell<Vec<Arc<Module>>> = const { RefCell::new(Vec::new()) };
}

/// The module whose top-level forms are currently being evaluated, if any
pub fn current_module() -> Option<Arc<Module>> {
    CURRENT_MODULE.with(|stack| stack.borrow().last().cloned())
}

/// Guard that keeps the current-module stack balanced even when evaluation
/// fails mid-module
struct CurrentModule;

impl CurrentModule {
    fn enter(module: Arc<Module>) -> CurrentModule {
        CURRENT_MODULE.with(|stack| stack.borrow_mut().push(module));
        CurrentModule
    }
}

impl Drop for CurrentModule {
    fn drop(&mut self) {
        CURRENT_MODULE.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}
