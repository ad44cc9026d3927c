// ABOUTME: LisPy command-line interface - script runner and REPL

use clap::Parser;
use lispy::builtins;
use lispy::config;
use lispy::env::Environment;
use lispy::module_loader;
use lispy::run_source;
use lispy::value::Value;
use rustyline::error::ReadlineError;
use rustyline::{Config, DefaultEditor};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

/// LisPy interpreter - run LisPy programs or start interactive mode
#[derive(Parser, Debug)]
#[command(name = "lispy")]
#[command(version = config::VERSION)]
#[command(about = "LisPy - a Clojure-flavored Lisp interpreter")]
struct CliArgs {
    /// LisPy file to execute (starts the REPL when omitted)
    #[arg(value_name = "FILE")]
    script: Option<PathBuf>,

    /// Start interactive REPL mode (default when no file is given)
    #[arg(long = "repl")]
    repl: bool,

    /// Add directory to the module load path (can be repeated)
    #[arg(
        short = 'I',
        long = "include-path",
        value_name = "DIR",
        action = clap::ArgAction::Append
    )]
    include_paths: Vec<PathBuf>,
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    if args.script.is_some() && args.repl {
        eprintln!("Error: Cannot specify both a file and --repl option.");
        return ExitCode::FAILURE;
    }

    for path in &args.include_paths {
        module_loader::loader().add_load_path(path.clone());
    }

    let env = builtins::global_env();

    match args.script {
        Some(path) => run_file(&path, &env),
        None => run_repl(&env),
    }
}

/// Execute a LisPy file as the main entry point
fn run_file(path: &Path, env: &Arc<Environment>) -> ExitCode {
    if !path.exists() {
        eprintln!("Error: File '{}' not found.", path.display());
        return ExitCode::FAILURE;
    }
    if path.extension().and_then(|ext| ext.to_str()) != Some("lpy") {
        println!("Warning: File '{}' doesn't have .lpy extension.", path.display());
    }

    // modules resolve relative to the script first
    if let Some(dir) = path.parent() {
        let dir = if dir.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            dir.to_path_buf()
        };
        module_loader::loader().add_load_path(dir);
    }

    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error: Could not read file '{}': {}", path.display(), e);
            return ExitCode::FAILURE;
        }
    };

    match run_source(&source, env) {
        Ok(Value::Nil) => ExitCode::SUCCESS,
        Ok(result) => {
            println!("Program result: {}", result.repr());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("LisPy Error in '{}': {}", path.display(), e);
            ExitCode::FAILURE
        }
    }
}

/// Interactive read-eval-print loop
fn run_repl(env: &Arc<Environment>) -> ExitCode {
    let config = Config::builder().auto_add_history(true).build();
    let mut editor = match DefaultEditor::with_config(config) {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("Error: Failed to initialize REPL: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let _ = editor.load_history(config::HISTORY_FILE);

    println!("{}", config::WELCOME_MESSAGE);
    println!("{}", config::WELCOME_SUBTITLE);
    println!("{}", config::WELCOME_FOOTER);
    println!();

    loop {
        match editor.readline(config::PROMPT) {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                if matches!(input, "exit" | "quit" | "(exit)" | "(quit)") {
                    println!("Goodbye!");
                    break;
                }

                match run_source(input, env) {
                    Ok(Value::Nil) => {}
                    Ok(result) => println!("=> {}", result.repr()),
                    Err(e) => eprintln!("Error: {}", e),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                break;
            }
        }
    }

    let _ = editor.save_history(config::HISTORY_FILE);
    ExitCode::SUCCESS
}
