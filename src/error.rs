// ABOUTME: Error kinds raised by the lexer, reader, evaluator, and runtime

use crate::value::Value;
use thiserror::Error;

/// Every failure the interpreter can produce, as a distinct kind.
///
/// `try`/`catch` only ever catches [`Error::Thrown`]; assertion failures and
/// everything else unwind to the top-level form.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Malformed source at the token level
    #[error("LexerError: {0}")]
    Lexer(String),

    /// Malformed structure: unclosed delimiters, odd map literals, bad quote
    #[error("ParseError: {0}")]
    Parse(String),

    /// Symbol lookup miss
    #[error("Unbound symbol: {0}")]
    UnboundSymbol(String),

    /// Generic runtime failure: not-callable, empty call, special-form syntax
    #[error("EvaluationError: {0}")]
    Evaluation(String),

    /// Operand of the wrong kind
    #[error("TypeError: {0}")]
    Type(String),

    /// Wrong number of arguments to a function, `recur`, or a builtin
    #[error("ArityError: {0}")]
    Arity(String),

    /// Exceeded the maximum non-tail recursion depth
    #[error("RecursionError: {0}")]
    Recursion(String),

    /// Out-of-bounds `nth`/`get`
    #[error("IndexError: {0}")]
    Index(String),

    /// Division or modulo by zero
    #[error("ZeroDivisionError: division by zero")]
    ZeroDivision,

    /// Module not found, or a requested symbol is not exported
    #[error("ImportError: {0}")]
    Import(String),

    /// Module dependency cycle
    #[error("CircularDependencyError: {0}")]
    CircularDependency(String),

    /// BDD assertion failed; never caught by `try`/`catch`
    #[error("AssertionFailure: {0}")]
    Assertion(String),

    /// Payload from `(throw expr)`; the only kind `try`/`catch` catches
    #[error("UserThrownError: {}", .0.repr())]
    Thrown(Value),

    /// Network or protocol failure; surfaces as a promise rejection
    #[error("HTTPError: {0}")]
    Http(String),
}

impl Error {
    /// Arity error with the callable's name and the expected/actual counts
    pub fn arity(function: &str, expected: impl std::fmt::Display, actual: usize) -> Self {
        Error::Arity(format!(
            "'{}' expects {} argument(s), got {}",
            function, expected, actual
        ))
    }

    /// Type error naming the offending callable and operand
    pub fn type_mismatch(function: &str, expected: &str, got: &Value) -> Self {
        Error::Type(format!(
            "'{}' expects {}, got {}",
            function,
            expected,
            got.type_name()
        ))
    }
}

/// Result alias used across the interpreter
pub type Result<T> = std::result::Result<T, Error>;
