use thiserror::Error;

/// Errors raised while loading a plan bundle.
///
/// Parsing is all-or-nothing: any of these means no model was produced.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("malformed bundle: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("string index {index} out of bounds in {context}")]
    DanglingStringRef { index: u32, context: String },

    #[error("call to unknown function or builtin '{0}'")]
    DanglingFunction(String),

    #[error("'{func}' called with {got} arguments, expected {expected}")]
    BadArity {
        func: String,
        expected: String,
        got: usize,
    },

    #[error("interned constant '{literal}' is not a number")]
    BadNumberLiteral { literal: String },

    #[error("duplicate plan entry point '{0}'")]
    DuplicatePlan(String),

    #[error("duplicate function '{0}'")]
    DuplicateFunction(String),

    #[error("builtin '{0}' is not registered with the host")]
    UnknownBuiltin(String),
}

/// Errors raised during plan evaluation.
///
/// Undefined navigation, failed comparisons, and lenient-mode builtin
/// failures are control flow, not errors; only genuinely fatal
/// conditions surface here.
#[derive(Error, Debug)]
pub enum EvalError {
    #[error("no plan found for entry point '{0}'")]
    UnknownEntryPoint(String),

    #[error("builtin '{name}' failed: {message}")]
    BuiltinError { name: String, message: String },

    #[error("register assigned twice with different values")]
    AssignConflict,

    #[error("object key inserted twice with different values")]
    ObjectInsertConflict,

    #[error("max call depth exceeded ({0})")]
    MaxCallDepth(usize),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, EvalError>;
