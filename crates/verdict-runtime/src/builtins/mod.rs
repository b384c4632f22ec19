pub mod aggregates;
pub mod collections;
pub mod crypto;
pub mod numbers;
pub mod strings;
pub mod types;

use std::collections::HashMap;
use std::fmt;

use crate::document::Document;

/// A builtin rejecting its arguments at call time (type mismatch,
/// domain error). Whether this aborts the evaluation or downgrades to
/// undefined is decided by the engine's strictness mode, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinError {
    pub message: String,
}

impl BuiltinError {
    pub fn new(message: impl Into<String>) -> Self {
        BuiltinError {
            message: message.into(),
        }
    }
}

impl fmt::Display for BuiltinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Outcome of a builtin call:
/// - `Ok(Some(doc))` — defined result;
/// - `Ok(None)` — undefined, the statement simply does not apply;
/// - `Err(_)` — a genuine failure, subject to the strictness mode.
pub type BuiltinResult = Result<Option<Document>, BuiltinError>;

pub type BuiltinFn = fn(&[Document]) -> BuiltinResult;

/// Declared argument count, checked against call sites at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    /// At least this many arguments.
    Variadic(usize),
}

impl Arity {
    pub fn accepts(&self, argc: usize) -> bool {
        match self {
            Arity::Exact(n) => argc == *n,
            Arity::Variadic(min) => argc >= *min,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{}", n),
            Arity::Variadic(min) => write!(f, "at least {}", min),
        }
    }
}

#[derive(Clone, Copy)]
pub struct BuiltinEntry {
    pub arity: Arity,
    pub func: BuiltinFn,
}

/// Name → native implementation table.
///
/// A bundle referencing a name absent from this table fails at load
/// time: that is a host capability gap, not a data-dependent failure,
/// so it is fatal regardless of strictness. Hosts may re-register a
/// name to override a default implementation.
#[derive(Clone)]
pub struct BuiltinRegistry {
    table: HashMap<String, BuiltinEntry>,
}

impl BuiltinRegistry {
    /// Empty registry, for hosts that want full control over the set.
    pub fn empty() -> Self {
        BuiltinRegistry {
            table: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, arity: Arity, func: BuiltinFn) {
        self.table.insert(name.into(), BuiltinEntry { arity, func });
    }

    pub fn lookup(&self, name: &str) -> Option<&BuiltinEntry> {
        self.table.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }
}

impl Default for BuiltinRegistry {
    fn default() -> Self {
        let mut registry = BuiltinRegistry::empty();
        numbers::install(&mut registry);
        strings::install(&mut registry);
        aggregates::install(&mut registry);
        collections::install(&mut registry);
        types::install(&mut registry);
        crypto::install(&mut registry);
        registry
    }
}

// ============================================================================
// Argument helpers shared by the builtin modules
// ============================================================================

pub(crate) fn expect_number(
    args: &[Document],
    idx: usize,
    fn_name: &str,
) -> Result<crate::document::Number, BuiltinError> {
    match args.get(idx) {
        Some(Document::Number(n)) => Ok(*n),
        Some(other) => Err(BuiltinError::new(format!(
            "{} expected number at argument {}, got {}",
            fn_name,
            idx,
            other.type_name()
        ))),
        None => Err(BuiltinError::new(format!(
            "{} missing argument {}",
            fn_name, idx
        ))),
    }
}

pub(crate) fn expect_string<'a>(
    args: &'a [Document],
    idx: usize,
    fn_name: &str,
) -> Result<&'a str, BuiltinError> {
    match args.get(idx) {
        Some(Document::String(s)) => Ok(s),
        Some(other) => Err(BuiltinError::new(format!(
            "{} expected string at argument {}, got {}",
            fn_name,
            idx,
            other.type_name()
        ))),
        None => Err(BuiltinError::new(format!(
            "{} missing argument {}",
            fn_name, idx
        ))),
    }
}

pub(crate) fn expect_array<'a>(
    args: &'a [Document],
    idx: usize,
    fn_name: &str,
) -> Result<&'a [Document], BuiltinError> {
    match args.get(idx) {
        Some(Document::Array(items)) => Ok(items),
        Some(other) => Err(BuiltinError::new(format!(
            "{} expected array at argument {}, got {}",
            fn_name,
            idx,
            other.type_name()
        ))),
        None => Err(BuiltinError::new(format!(
            "{} missing argument {}",
            fn_name, idx
        ))),
    }
}

pub(crate) fn expect_int(args: &[Document], idx: usize, fn_name: &str) -> Result<i64, BuiltinError> {
    let n = expect_number(args, idx, fn_name)?;
    n.as_int().ok_or_else(|| {
        BuiltinError::new(format!("{} expected integer at argument {}", fn_name, idx))
    })
}
