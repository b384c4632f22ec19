use std::sync::Arc;

use crate::document::Document;
use crate::error::Result;
use crate::eval::Evaluator;
use crate::parser::IntermediateRepresentation;

/// Reusable handle to one entry point.
///
/// Cheap to clone and safe to share: the underlying model is read-only
/// and every `evaluate` call runs in private frames, so concurrent
/// evaluations never contend.
#[derive(Clone)]
pub struct Plan {
    ir: Arc<IntermediateRepresentation>,
    index: usize,
}

impl Plan {
    pub(crate) fn new(ir: Arc<IntermediateRepresentation>, index: usize) -> Self {
        Plan { ir, index }
    }

    /// Entry-point name this plan was resolved from.
    pub fn name(&self) -> &str {
        &self.ir.plan_at(self.index).name
    }

    /// Execute against the two top-level documents. The returned
    /// sequence holds every emitted result in order; empty means no
    /// policy case matched, which is not an error.
    pub fn evaluate(&self, input: &Document, data: &Document) -> Result<Vec<Document>> {
        Evaluator::new(&self.ir).eval_plan(self.ir.plan_at(self.index), input, data)
    }
}
