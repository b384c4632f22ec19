pub mod builtins;
pub mod document;
pub mod error;
pub mod eval;
pub mod parser;
pub mod plan;

use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use builtins::{Arity, BuiltinError, BuiltinRegistry};
pub use document::Document;
pub use error::{EvalError, ParseError};
pub use parser::{IntermediateRepresentation, Parser};
pub use plan::Plan;

/// Loaded policy bundle: resolves entry points to executable plans.
pub struct Verdict {
    ir: Arc<IntermediateRepresentation>,
}

impl Verdict {
    /// Load a bundle file from disk.
    pub fn builder(path: impl AsRef<Path>) -> VerdictBuilder {
        VerdictBuilder {
            path: path.as_ref().to_path_buf(),
            strict: false,
            builtins: None,
        }
    }

    /// Wrap an already-parsed model.
    pub fn new(ir: IntermediateRepresentation) -> Self {
        Verdict { ir: Arc::new(ir) }
    }

    /// Resolve an entry point to its plan.
    pub fn plan(&self, entry_point: &str) -> error::Result<Plan> {
        match self.ir.plan_position(entry_point) {
            Some(index) => Ok(Plan::new(self.ir.clone(), index)),
            None => Err(EvalError::UnknownEntryPoint(entry_point.to_string())),
        }
    }

    pub fn entry_points(&self) -> impl Iterator<Item = &str> {
        self.ir.entry_points()
    }
}

pub struct VerdictBuilder {
    path: PathBuf,
    strict: bool,
    builtins: Option<BuiltinRegistry>,
}

impl VerdictBuilder {
    /// Abort evaluation on builtin runtime errors instead of treating
    /// the failed call as undefined.
    pub fn strict_builtin_errors(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Replace the default builtin registry.
    pub fn builtin_registry(mut self, builtins: BuiltinRegistry) -> Self {
        self.builtins = Some(builtins);
        self
    }

    pub fn build(self) -> Result<Verdict, ParseError> {
        let raw = std::fs::read_to_string(&self.path)?;
        let registry = self.builtins.unwrap_or_default();
        let ir = Parser::parse_with_builtins(&raw, registry)?
            .with_strict_builtin_errors(self.strict);
        Ok(Verdict::new(ir))
    }
}
