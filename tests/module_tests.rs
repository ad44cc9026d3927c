// ABOUTME: Module loading, exports, caching, and cycle detection

use lispy::builtins::global_env;
use lispy::env::Environment;
use lispy::error::Error;
use lispy::module_loader;
use lispy::run_source;
use lispy::value::Value;
use serial_test::serial;
use std::path::PathBuf;
use std::sync::Arc;

fn setup() -> Arc<Environment> {
    global_env()
}

/// Unique directory for this test's module files, added to the load path.
/// Module names are unique per test so the global cache never collides.
fn module_dir(test: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push(format!("lispy-module-tests-{}-{}", std::process::id(), test));
    std::fs::create_dir_all(&dir).expect("failed to create module dir");
    module_loader::loader().add_load_path(dir.clone());
    dir
}

fn write_module(dir: &PathBuf, name: &str, source: &str) {
    let path = dir.join(format!("{}.lpy", name));
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("failed to create module subdir");
    }
    std::fs::write(path, source).expect("failed to write module");
}

fn eval_ok(env: &Arc<Environment>, source: &str) -> Value {
    run_source(source, env).unwrap_or_else(|e| panic!("{} failed: {}", source, e))
}

#[test]
#[serial]
fn test_import_binds_exports() {
    let dir = module_dir("basic");
    write_module(&dir, "basic_math", "(define x 10) (export x)");

    let env = setup();
    assert_eq!(
        eval_ok(&env, "(import \"basic_math\") x"),
        Value::Int(10)
    );
}

#[test]
#[serial]
fn test_unexported_names_stay_private() {
    let dir = module_dir("private");
    write_module(
        &dir,
        "private_helper",
        "(define visible 1) (define hidden 2) (export visible)",
    );

    let env = setup();
    eval_ok(&env, "(import \"private_helper\")");
    assert_eq!(eval_ok(&env, "visible"), Value::Int(1));
    assert!(matches!(
        run_source("hidden", &env),
        Err(Error::UnboundSymbol(_))
    ));
}

#[test]
#[serial]
fn test_selective_import() {
    let dir = module_dir("selective");
    write_module(
        &dir,
        "selective_source",
        "(define a 1) (define b 2) (export a b)",
    );

    let env = setup();
    eval_ok(&env, "(import \"selective_source\" [a])");
    assert_eq!(eval_ok(&env, "a"), Value::Int(1));
    assert!(matches!(
        run_source("b", &env),
        Err(Error::UnboundSymbol(_))
    ));
}

#[test]
#[serial]
fn test_selective_import_of_missing_export_fails() {
    let dir = module_dir("missing-export");
    write_module(&dir, "strict_exports", "(define a 1) (export a)");

    let env = setup();
    assert!(matches!(
        run_source("(import \"strict_exports\" [nope])", &env),
        Err(Error::Import(_))
    ));
}

#[test]
#[serial]
fn test_missing_module_is_an_import_error() {
    let env = setup();
    assert!(matches!(
        run_source("(import \"no_such_module_anywhere\")", &env),
        Err(Error::Import(_))
    ));
}

#[test]
#[serial]
fn test_modules_are_cached_not_reevaluated() {
    let dir = module_dir("cache");
    let marker = dir.join("evaluations.txt");
    write_module(
        &dir,
        "cached_once",
        &format!(
            "(spit \"{}\" \"x\" :append) (define v 1) (export v)",
            marker.display()
        ),
    );

    let env = setup();
    eval_ok(&env, "(import \"cached_once\")");
    eval_ok(&env, "(import \"cached_once\")");
    let other_env = setup();
    eval_ok(&other_env, "(import \"cached_once\")");

    let evaluations = std::fs::read_to_string(&marker).expect("marker file missing");
    assert_eq!(evaluations, "x", "module body ran more than once");
}

#[test]
#[serial]
fn test_nested_module_names_resolve_through_subdirectories() {
    let dir = module_dir("nested");
    write_module(&dir, "util/helpers", "(define helper 7) (export helper)");

    let env = setup();
    assert_eq!(
        eval_ok(&env, "(import \"util/helpers\") helper"),
        Value::Int(7)
    );
}

#[test]
#[serial]
fn test_modules_can_import_modules() {
    let dir = module_dir("chain");
    write_module(&dir, "chain_base", "(define base 2) (export base)");
    write_module(
        &dir,
        "chain_user",
        "(import \"chain_base\") (define doubled (* base 2)) (export doubled)",
    );

    let env = setup();
    assert_eq!(
        eval_ok(&env, "(import \"chain_user\") doubled"),
        Value::Int(4)
    );
}

#[test]
#[serial]
fn test_circular_imports_are_detected() {
    let dir = module_dir("cycle");
    write_module(&dir, "cycle_a", "(import \"cycle_b\") (define a 1) (export a)");
    write_module(&dir, "cycle_b", "(import \"cycle_a\") (define b 2) (export b)");

    let env = setup();
    match run_source("(import \"cycle_a\")", &env) {
        Err(Error::CircularDependency(message)) => {
            assert!(message.contains("cycle_a"));
        }
        // the cycle error is wrapped by the outer module's load failure
        Err(Error::Import(_)) => {}
        other => panic!("Expected a circular dependency failure, got {:?}", other),
    }
}

#[test]
#[serial]
fn test_failed_load_clears_loading_marker() {
    let dir = module_dir("retry-after-failure");
    write_module(&dir, "flaky_module", "(this-function-does-not-exist)");

    let env = setup();
    assert!(run_source("(import \"flaky_module\")", &env).is_err());
    // a second attempt must fail with the original error, not a bogus cycle
    match run_source("(import \"flaky_module\")", &env) {
        Err(Error::CircularDependency(_)) => panic!("loading marker leaked"),
        Err(_) => {}
        Ok(_) => panic!("flaky module unexpectedly loaded"),
    }
}

#[test]
#[serial]
fn test_export_outside_module_fails() {
    let env = setup();
    assert!(matches!(
        run_source("(export x)", &env),
        Err(Error::Evaluation(_))
    ));
}

#[test]
#[serial]
fn test_module_environments_are_isolated() {
    let dir = module_dir("isolation");
    write_module(&dir, "isolated_module", "(define shared 5) (export shared)");

    let env = setup();
    env.define("shared", Value::Int(1));
    eval_ok(&env, "(import \"isolated_module\")");
    // the import rebinds in the importing environment
    assert_eq!(eval_ok(&env, "shared"), Value::Int(5));
}
