// ABOUTME: Interpreter constants shared by the CLI and REPL

/// Crate version, reported by `--version`
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const WELCOME_MESSAGE: &str = "LisPy Interactive Interpreter";
pub const WELCOME_SUBTITLE: &str = "Type expressions to evaluate them, or 'exit' to quit.";
pub const WELCOME_FOOTER: &str = "Use (import \"module-name\") to load modules.";

/// REPL prompt
pub const PROMPT: &str = "lispy> ";

/// REPL history file, kept in the working directory
pub const HISTORY_FILE: &str = ".lispy_history";
