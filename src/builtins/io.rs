//! Console and file I/O: print, println, read-line, slurp, spit

use crate::env::Environment;
use crate::error::{Error, Result};
use crate::value::Value;
use lispy_macros::builtin;
use std::io::Write;
use std::sync::Arc;

fn render(args: &[Value]) -> String {
    args.iter()
        .map(|arg| arg.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

#[builtin(name = "print")]
/// Prints arguments separated by spaces, without a trailing newline.
pub fn print(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    let text = render(args);
    let mut stdout = std::io::stdout();
    let _ = write!(stdout, "{}", text);
    let _ = stdout.flush();
    Ok(Value::Nil)
}

#[builtin(name = "println")]
/// Prints arguments separated by spaces, followed by a newline.
pub fn println(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    let mut stdout = std::io::stdout();
    let _ = writeln!(stdout, "{}", render(args));
    Ok(Value::Nil)
}

#[builtin(name = "read-line")]
/// Reads one line from stdin, optionally printing a prompt first.
/// Returns nil at end of input.
pub fn read_line(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.len() > 1 {
        return Err(Error::arity("read-line", "0-1", args.len()));
    }
    if let Some(prompt) = args.first() {
        match prompt {
            Value::Str(s) => {
                let mut stdout = std::io::stdout();
                let _ = write!(stdout, "{}", s);
                let _ = stdout.flush();
            }
            other => return Err(Error::type_mismatch("read-line", "a string prompt", other)),
        }
    }

    let mut line = String::new();
    match std::io::stdin().read_line(&mut line) {
        Ok(0) => Ok(Value::Nil),
        Ok(_) => {
            while line.ends_with('\n') || line.ends_with('\r') {
                line.pop();
            }
            Ok(Value::Str(line))
        }
        Err(e) => Err(Error::Evaluation(format!("'read-line' failed: {}", e))),
    }
}

#[builtin(name = "slurp")]
/// Reads a whole file as a string. The handle closes on every exit path.
pub fn slurp(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.len() != 1 {
        return Err(Error::arity("slurp", 1, args.len()));
    }
    let path = match &args[0] {
        Value::Str(path) => path,
        other => return Err(Error::type_mismatch("slurp", "a file path string", other)),
    };

    std::fs::read_to_string(path)
        .map(Value::Str)
        .map_err(|e| Error::Evaluation(format!("'slurp' could not read '{}': {}", path, e)))
}

#[builtin(name = "spit")]
/// `(spit path content)` writes (replacing); `(spit path content :append)`
/// appends. Returns nil.
pub fn spit(args: &[Value], _env: &Arc<Environment>) -> Result<Value> {
    if args.len() < 2 || args.len() > 3 {
        return Err(Error::arity("spit", "2-3", args.len()));
    }
    let path = match &args[0] {
        Value::Str(path) => path,
        other => return Err(Error::type_mismatch("spit", "a file path string", other)),
    };
    let content = args[1].to_string();

    let append = match args.get(2) {
        None => false,
        Some(Value::Symbol(s)) if s == ":append" => true,
        Some(other) => return Err(Error::type_mismatch("spit", ":append", other)),
    };

    let result = if append {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| file.write_all(content.as_bytes()))
    } else {
        std::fs::write(path, content.as_bytes())
    };

    result
        .map(|_| Value::Nil)
        .map_err(|e| Error::Evaluation(format!("'spit' could not write '{}': {}", path, e)))
}

/// Register all I/O builtins in the environment
pub fn register(env: &Arc<Environment>) {
    register_print(env);
    register_println(env);
    register_read_line(env);
    register_slurp(env);
    register_spit(env);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> Arc<Environment> {
        Environment::new()
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("lispy-io-test-{}-{}", std::process::id(), name));
        path
    }

    #[test]
    fn test_spit_then_slurp_round_trip() {
        let e = env();
        let path = temp_path("round-trip.txt");
        let path_value = Value::Str(path.display().to_string());

        spit(&[path_value.clone(), Value::Str("hello".to_string())], &e).unwrap();
        assert_eq!(
            slurp(&[path_value.clone()], &e).unwrap(),
            Value::Str("hello".to_string())
        );

        spit(
            &[
                path_value.clone(),
                Value::Str(" world".to_string()),
                Value::Symbol(":append".to_string()),
            ],
            &e,
        )
        .unwrap();
        assert_eq!(
            slurp(&[path_value], &e).unwrap(),
            Value::Str("hello world".to_string())
        );

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_slurp_missing_file() {
        let e = env();
        let result = slurp(
            &[Value::Str("/definitely/not/a/file.lpy".to_string())],
            &e,
        );
        assert!(matches!(result, Err(Error::Evaluation(_))));
    }
}
