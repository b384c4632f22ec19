use std::collections::BTreeMap;

use verdict_common::ir::Block;
use verdict_common::stmt::{Local, Operand, Stmt};

use crate::document::Document;
use crate::error::{EvalError, Result};
use crate::parser::{FuncDef, IntermediateRepresentation, PlanDef};

/// Runtime guard against unbounded recursion in the IR. The parser
/// reports the static call depth where one exists; this limit is the
/// backstop for recursive call graphs.
pub const MAX_CALL_DEPTH: usize = 1000;

// ============================================================================
// Register frame
// ============================================================================

/// Dense register file for one plan or function invocation. A `None`
/// slot is undefined, which is distinct from holding `Document::Null`.
struct Frame {
    regs: Vec<Option<Document>>,
}

impl Frame {
    fn new(size: usize) -> Self {
        Frame {
            regs: vec![None; size],
        }
    }

    fn get(&self, local: Local) -> Option<&Document> {
        self.regs.get(local as usize).and_then(|slot| slot.as_ref())
    }

    fn slot_mut(&mut self, local: Local) -> Result<&mut Option<Document>> {
        let len = self.regs.len();
        self.regs
            .get_mut(local as usize)
            .ok_or_else(|| EvalError::Internal(format!("register {} out of frame ({})", local, len)))
    }

    fn set(&mut self, local: Local, value: Document) -> Result<()> {
        *self.slot_mut(local)? = Some(value);
        Ok(())
    }

    fn clear(&mut self, local: Local) -> Result<()> {
        *self.slot_mut(local)? = None;
        Ok(())
    }
}

// ============================================================================
// Control flow
// ============================================================================

/// Outcome of one statement or block.
///
/// `Undefined` is the routine "did not apply" signal: the enclosing
/// block stops and execution continues after it. `Break(n)` means n
/// further enclosing blocks terminate after the current one. Neither is
/// an error.
enum Flow {
    Normal,
    Undefined,
    Break(u32),
    Return(Option<Document>),
}

/// How a plan or function body ended.
enum BodyOutcome {
    /// A ReturnLocal fired; `None` inside means no-match.
    Returned(Option<Document>),
    FellThrough,
}

// ============================================================================
// Evaluator
// ============================================================================

/// Executes one plan against private state; nothing here outlives the
/// call, so any number of evaluators may run concurrently over one
/// shared model.
pub(crate) struct Evaluator<'a> {
    ir: &'a IntermediateRepresentation,
    results: Vec<Document>,
    depth: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(ir: &'a IntermediateRepresentation) -> Self {
        Evaluator {
            ir,
            results: Vec::new(),
            depth: 0,
        }
    }

    /// Run the plan body with input/data bound to locals 0/1, collecting
    /// every emitted result tuple in order. Zero results is a valid
    /// outcome meaning no policy case matched.
    pub fn eval_plan(
        mut self,
        plan: &PlanDef,
        input: &Document,
        data: &Document,
    ) -> Result<Vec<Document>> {
        let mut frame = Frame::new(plan.frame_size);
        frame.set(0, input.clone())?;
        frame.set(1, data.clone())?;
        self.eval_body(&plan.blocks, &mut frame)?;
        Ok(self.results)
    }

    /// Sequential block list of a plan or function body. Residual break
    /// levels and returns terminate the remaining blocks.
    fn eval_body(&mut self, blocks: &[Block], frame: &mut Frame) -> Result<BodyOutcome> {
        for block in blocks {
            match self.eval_block(block, frame)? {
                Flow::Normal | Flow::Undefined | Flow::Break(0) => continue,
                Flow::Break(_) => break,
                Flow::Return(value) => return Ok(BodyOutcome::Returned(value)),
            }
        }
        Ok(BodyOutcome::FellThrough)
    }

    fn eval_block(&mut self, block: &Block, frame: &mut Frame) -> Result<Flow> {
        for stmt in &block.stmts {
            match self.eval_stmt(stmt, frame)? {
                Flow::Normal => continue,
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    /// Resolve an operand; `None` is the undefined outcome.
    fn operand(&self, frame: &Frame, operand: &Operand) -> Result<Option<Document>> {
        match operand {
            Operand::Local(local) => Ok(frame.get(*local).cloned()),
            Operand::Bool(b) => Ok(Some(Document::Bool(*b))),
            Operand::StringIndex(index) => {
                let s = self.ir.string(*index).ok_or_else(|| {
                    EvalError::Internal(format!("string index {} not interned", index))
                })?;
                Ok(Some(Document::string(s)))
            }
        }
    }

    fn eval_stmt(&mut self, stmt: &Stmt, frame: &mut Frame) -> Result<Flow> {
        match stmt {
            Stmt::ArrayAppend { array, value } => {
                let Some(value) = self.operand(frame, value)? else {
                    return Ok(Flow::Undefined);
                };
                match frame.slot_mut(*array)? {
                    Some(Document::Array(items)) => {
                        items.push(value);
                        Ok(Flow::Normal)
                    }
                    _ => Ok(Flow::Undefined),
                }
            }

            Stmt::AssignInt { value, target } => {
                frame.set(*target, Document::int(*value))?;
                Ok(Flow::Normal)
            }

            Stmt::AssignVar { source, target } => {
                let Some(value) = self.operand(frame, source)? else {
                    return Ok(Flow::Undefined);
                };
                frame.set(*target, value)?;
                Ok(Flow::Normal)
            }

            Stmt::AssignVarOnce { source, target } => {
                let Some(value) = self.operand(frame, source)? else {
                    return Ok(Flow::Undefined);
                };
                if let Some(existing) = frame.get(*target) {
                    if *existing != value {
                        return Err(EvalError::AssignConflict);
                    }
                    return Ok(Flow::Normal);
                }
                frame.set(*target, value)?;
                Ok(Flow::Normal)
            }

            Stmt::Block { blocks } => {
                for block in blocks {
                    match self.eval_block(block, frame)? {
                        Flow::Normal | Flow::Undefined | Flow::Break(0) => continue,
                        Flow::Break(n) => return Ok(Flow::Break(n - 1)),
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                    }
                }
                Ok(Flow::Normal)
            }

            Stmt::Break { index } => Ok(Flow::Break(*index)),

            Stmt::Call { func, args, result } => self.eval_call(func, args, *result, frame),

            Stmt::Dot {
                source,
                key,
                target,
            } => {
                let Some(source) = self.operand(frame, source)? else {
                    return Ok(Flow::Undefined);
                };
                let Some(key) = self.operand(frame, key)? else {
                    return Ok(Flow::Undefined);
                };
                match source.get(&key) {
                    Some(member) => {
                        let member = member.clone();
                        frame.set(*target, member)?;
                        Ok(Flow::Normal)
                    }
                    None => {
                        frame.clear(*target)?;
                        Ok(Flow::Undefined)
                    }
                }
            }

            Stmt::Equal { a, b } => {
                let (Some(a), Some(b)) = (self.operand(frame, a)?, self.operand(frame, b)?) else {
                    return Ok(Flow::Undefined);
                };
                if a == b {
                    Ok(Flow::Normal)
                } else {
                    Ok(Flow::Undefined)
                }
            }

            Stmt::NotEqual { a, b } => {
                let (Some(a), Some(b)) = (self.operand(frame, a)?, self.operand(frame, b)?) else {
                    return Ok(Flow::Undefined);
                };
                if a != b {
                    Ok(Flow::Normal)
                } else {
                    Ok(Flow::Undefined)
                }
            }

            Stmt::IsArray { source } => match self.operand(frame, source)? {
                Some(Document::Array(_)) => Ok(Flow::Normal),
                _ => Ok(Flow::Undefined),
            },

            Stmt::IsObject { source } => match self.operand(frame, source)? {
                Some(Document::Object(_)) => Ok(Flow::Normal),
                _ => Ok(Flow::Undefined),
            },

            Stmt::IsDefined { source } => {
                if frame.get(*source).is_some() {
                    Ok(Flow::Normal)
                } else {
                    Ok(Flow::Undefined)
                }
            }

            Stmt::IsUndefined { source } => {
                if frame.get(*source).is_none() {
                    Ok(Flow::Normal)
                } else {
                    Ok(Flow::Undefined)
                }
            }

            Stmt::Len { source, target } => {
                let Some(source) = self.operand(frame, source)? else {
                    return Ok(Flow::Undefined);
                };
                match source.len() {
                    Some(len) => {
                        frame.set(*target, Document::int(len as i64))?;
                        Ok(Flow::Normal)
                    }
                    None => Ok(Flow::Undefined),
                }
            }

            Stmt::MakeArray { capacity, target } => {
                frame.set(*target, Document::Array(Vec::with_capacity(*capacity as usize)))?;
                Ok(Flow::Normal)
            }

            Stmt::MakeNull { target } => {
                frame.set(*target, Document::Null)?;
                Ok(Flow::Normal)
            }

            Stmt::MakeNumberInt { value, target } => {
                frame.set(*target, Document::int(*value))?;
                Ok(Flow::Normal)
            }

            Stmt::MakeNumberRef { index, target } => {
                let number = self.ir.number(*index).ok_or_else(|| {
                    EvalError::Internal(format!("number literal {} not pre-parsed", index))
                })?;
                frame.set(*target, Document::Number(number))?;
                Ok(Flow::Normal)
            }

            Stmt::MakeObject { target } => {
                frame.set(*target, Document::Object(BTreeMap::new()))?;
                Ok(Flow::Normal)
            }

            Stmt::MakeSet { target } => {
                frame.set(*target, Document::Set(Default::default()))?;
                Ok(Flow::Normal)
            }

            Stmt::Nop {} => Ok(Flow::Normal),

            Stmt::Not { block } => match self.eval_block(block, frame)? {
                // The negation holds exactly when the block did not apply.
                Flow::Undefined => Ok(Flow::Normal),
                Flow::Normal | Flow::Break(0) => Ok(Flow::Undefined),
                Flow::Break(n) => Ok(Flow::Break(n - 1)),
                Flow::Return(value) => Ok(Flow::Return(value)),
            },

            Stmt::ObjectInsert { key, value, object } => {
                let (Some(key), Some(value)) =
                    (self.operand(frame, key)?, self.operand(frame, value)?)
                else {
                    return Ok(Flow::Undefined);
                };
                let Document::String(key) = key else {
                    return Ok(Flow::Undefined);
                };
                match frame.slot_mut(*object)? {
                    Some(Document::Object(map)) => {
                        map.insert(key, value);
                        Ok(Flow::Normal)
                    }
                    _ => Ok(Flow::Undefined),
                }
            }

            Stmt::ObjectInsertOnce { key, value, object } => {
                let (Some(key), Some(value)) =
                    (self.operand(frame, key)?, self.operand(frame, value)?)
                else {
                    return Ok(Flow::Undefined);
                };
                let Document::String(key) = key else {
                    return Ok(Flow::Undefined);
                };
                match frame.slot_mut(*object)? {
                    Some(Document::Object(map)) => {
                        if let Some(existing) = map.get(&key) {
                            if *existing != value {
                                return Err(EvalError::ObjectInsertConflict);
                            }
                            return Ok(Flow::Normal);
                        }
                        map.insert(key, value);
                        Ok(Flow::Normal)
                    }
                    _ => Ok(Flow::Undefined),
                }
            }

            Stmt::ObjectMerge { a, b, target } => {
                let (Some(Document::Object(a)), Some(Document::Object(b))) =
                    (frame.get(*a).cloned(), frame.get(*b).cloned())
                else {
                    return Ok(Flow::Undefined);
                };
                frame.set(*target, Document::Object(merge_objects(a, b)))?;
                Ok(Flow::Normal)
            }

            Stmt::ResetLocal { target } => {
                frame.clear(*target)?;
                Ok(Flow::Normal)
            }

            Stmt::ResultSetAdd { value } => match frame.get(*value) {
                Some(doc) => {
                    let doc = doc.clone();
                    self.results.push(doc);
                    Ok(Flow::Normal)
                }
                None => Ok(Flow::Undefined),
            },

            Stmt::ReturnLocal { source } => Ok(Flow::Return(frame.get(*source).cloned())),

            Stmt::Scan {
                source,
                key,
                value,
                block,
            } => self.eval_scan(*source, *key, *value, block, frame),

            Stmt::SetAdd { set, value } => {
                let Some(value) = self.operand(frame, value)? else {
                    return Ok(Flow::Undefined);
                };
                match frame.slot_mut(*set)? {
                    Some(Document::Set(members)) => {
                        members.insert(value);
                        Ok(Flow::Normal)
                    }
                    _ => Ok(Flow::Undefined),
                }
            }

            Stmt::With {
                local,
                path,
                value,
                block,
            } => self.eval_with(*local, path, value, block, frame),
        }
    }

    // ========================================================================
    // Call dispatch
    // ========================================================================

    fn eval_call(
        &mut self,
        func: &str,
        args: &[Operand],
        result: Local,
        frame: &mut Frame,
    ) -> Result<Flow> {
        // An undefined argument makes the whole call undefined.
        let mut resolved = Vec::with_capacity(args.len());
        for arg in args {
            match self.operand(frame, arg)? {
                Some(doc) => resolved.push(doc),
                None => return Ok(Flow::Undefined),
            }
        }

        if let Some(def) = self.ir.func(func) {
            match self.eval_func(def, resolved)? {
                Some(value) => {
                    frame.set(result, value)?;
                    Ok(Flow::Normal)
                }
                None => Ok(Flow::Undefined),
            }
        } else if let Some(entry) = self.ir.builtins().lookup(func) {
            match (entry.func)(&resolved) {
                Ok(Some(value)) => {
                    frame.set(result, value)?;
                    Ok(Flow::Normal)
                }
                Ok(None) => Ok(Flow::Undefined),
                Err(err) if self.ir.strict_builtin_errors() => Err(EvalError::BuiltinError {
                    name: func.to_string(),
                    message: err.message,
                }),
                // Lenient mode: the failed call simply does not apply.
                Err(_) => Ok(Flow::Undefined),
            }
        } else {
            Err(EvalError::Internal(format!(
                "call target '{}' resolved at parse time is gone",
                func
            )))
        }
    }

    /// Invoke an IR function in a fresh frame. `None` means no-match:
    /// the function fell through without defining its return register.
    fn eval_func(&mut self, def: &FuncDef, args: Vec<Document>) -> Result<Option<Document>> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(EvalError::MaxCallDepth(MAX_CALL_DEPTH));
        }
        self.depth += 1;

        let mut frame = Frame::new(def.frame_size);
        for (param, arg) in def.params.iter().zip(args) {
            frame.set(*param, arg)?;
        }

        let outcome = self.eval_body(&def.blocks, &mut frame);
        self.depth -= 1;

        match outcome? {
            BodyOutcome::Returned(value) => Ok(value),
            // Fell off the end: the return register decides.
            BodyOutcome::FellThrough => Ok(frame.get(def.return_local).cloned()),
        }
    }

    // ========================================================================
    // Scan / With
    // ========================================================================

    fn eval_scan(
        &mut self,
        source: Local,
        key: Local,
        value: Local,
        block: &Block,
        frame: &mut Frame,
    ) -> Result<Flow> {
        // Snapshot the members up front: the block may reuse registers.
        let entries: Vec<(Document, Document)> = match frame.get(source) {
            Some(Document::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, v)| (Document::int(i as i64), v.clone()))
                .collect(),
            Some(Document::Object(map)) => map
                .iter()
                .map(|(k, v)| (Document::string(k.clone()), v.clone()))
                .collect(),
            Some(Document::Set(members)) => members
                .iter()
                .map(|m| (m.clone(), m.clone()))
                .collect(),
            _ => return Ok(Flow::Undefined),
        };

        for (k, v) in entries {
            frame.set(key, k)?;
            frame.set(value, v)?;
            match self.eval_block(block, frame)? {
                // An iteration that does not apply contributes nothing.
                Flow::Normal | Flow::Undefined | Flow::Break(0) => continue,
                Flow::Break(n) => return Ok(Flow::Break(n - 1)),
                Flow::Return(ret) => return Ok(Flow::Return(ret)),
            }
        }
        Ok(Flow::Normal)
    }

    fn eval_with(
        &mut self,
        local: Local,
        path: &[u32],
        value: &Operand,
        block: &Block,
        frame: &mut Frame,
    ) -> Result<Flow> {
        let Some(value) = self.operand(frame, value)? else {
            return Ok(Flow::Undefined);
        };

        let saved = frame.get(local).cloned();
        let replaced = if path.is_empty() {
            value
        } else {
            let Some(base) = saved.clone() else {
                return Ok(Flow::Undefined);
            };
            let mut keys = Vec::with_capacity(path.len());
            for index in path {
                let key = self.ir.string(*index).ok_or_else(|| {
                    EvalError::Internal(format!("with path index {} not interned", index))
                })?;
                keys.push(key.to_string());
            }
            upsert(base, &keys, value)
        };

        frame.set(local, replaced)?;
        let flow = self.eval_block(block, frame)?;
        // Restore the shadowed register whatever happened inside.
        match saved {
            Some(doc) => frame.set(local, doc)?,
            None => frame.clear(local)?,
        }

        match flow {
            Flow::Normal | Flow::Break(0) => Ok(Flow::Normal),
            Flow::Undefined => Ok(Flow::Undefined),
            Flow::Break(n) => Ok(Flow::Break(n - 1)),
            Flow::Return(ret) => Ok(Flow::Return(ret)),
        }
    }
}

/// Replace the value at `keys` inside `doc`, creating objects along the
/// path and overwriting non-object intermediates.
fn upsert(doc: Document, keys: &[String], value: Document) -> Document {
    let Some((head, rest)) = keys.split_first() else {
        return value;
    };
    let mut map = match doc {
        Document::Object(map) => map,
        _ => BTreeMap::new(),
    };
    let child = map.remove(head).unwrap_or(Document::Object(BTreeMap::new()));
    map.insert(head.clone(), upsert(child, rest, value));
    Document::Object(map)
}

/// Recursive merge; keys from `b` win non-object conflicts.
fn merge_objects(
    a: BTreeMap<String, Document>,
    b: BTreeMap<String, Document>,
) -> BTreeMap<String, Document> {
    let mut merged = a;
    for (key, value) in b {
        match (merged.remove(&key), value) {
            (Some(Document::Object(left)), Document::Object(right)) => {
                merged.insert(key, Document::Object(merge_objects(left, right)));
            }
            (_, value) => {
                merged.insert(key, value);
            }
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_creates_missing_path() {
        let doc = Document::from_json(&serde_json::json!({"a": {"b": 1}}));
        let keys = vec!["a".to_string(), "c".to_string()];
        let result = upsert(doc, &keys, Document::int(2));
        assert_eq!(
            result.to_json(),
            serde_json::json!({"a": {"b": 1, "c": 2}})
        );
    }

    #[test]
    fn upsert_replaces_scalar_intermediate() {
        let doc = Document::from_json(&serde_json::json!({"a": 5}));
        let keys = vec!["a".to_string(), "b".to_string()];
        let result = upsert(doc, &keys, Document::int(1));
        assert_eq!(result.to_json(), serde_json::json!({"a": {"b": 1}}));
    }

    #[test]
    fn merge_recurses_and_b_wins() {
        let a = Document::from_json(&serde_json::json!({"x": {"k": 1, "keep": true}, "y": 1}));
        let b = Document::from_json(&serde_json::json!({"x": {"k": 2}, "z": 3}));
        let (Document::Object(a), Document::Object(b)) = (a, b) else {
            unreachable!()
        };
        let merged = Document::Object(merge_objects(a, b));
        assert_eq!(
            merged.to_json(),
            serde_json::json!({"x": {"k": 2, "keep": true}, "y": 1, "z": 3})
        );
    }

    #[test]
    fn frame_distinguishes_null_from_undefined() {
        let mut frame = Frame::new(2);
        assert!(frame.get(0).is_none());
        frame.set(0, Document::Null).unwrap();
        assert_eq!(frame.get(0), Some(&Document::Null));
        frame.clear(0).unwrap();
        assert!(frame.get(0).is_none());
    }

    #[test]
    fn frame_rejects_out_of_bounds() {
        let mut frame = Frame::new(1);
        assert!(frame.set(5, Document::Null).is_err());
    }
}
