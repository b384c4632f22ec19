use std::collections::HashMap;

use verdict_common::ir::{Block, PolicyBundle};
use verdict_common::stmt::{Operand, Stmt};

use crate::builtins::BuiltinRegistry;
use crate::document::Number;
use crate::error::ParseError;

/// Loads a serialized plan bundle into an executable model.
pub struct Parser;

impl Parser {
    /// Parse against the default builtin set.
    pub fn parse(raw: &str) -> Result<IntermediateRepresentation, ParseError> {
        Self::parse_with_builtins(raw, BuiltinRegistry::default())
    }

    /// Parse against a caller-supplied builtin registry. All structural
    /// references (registers, strings, functions, builtins, arities) are
    /// resolved here, so the evaluator never re-validates at run time.
    /// Failure never produces a partially-valid model.
    pub fn parse_with_builtins(
        raw: &str,
        builtins: BuiltinRegistry,
    ) -> Result<IntermediateRepresentation, ParseError> {
        let bundle: PolicyBundle = serde_json::from_str(raw)?;
        resolve(bundle, builtins)
    }
}

/// The parsed, validated model: all plans and functions of one bundle
/// plus the interned constant pool and the builtin registry.
///
/// Immutable after construction; shared read-only (via `Arc`) across
/// any number of concurrent plan evaluations.
pub struct IntermediateRepresentation {
    strings: Vec<String>,
    /// Pre-parsed number literals, keyed by string-pool index.
    numbers: HashMap<u32, Number>,
    plans: Vec<PlanDef>,
    plan_index: HashMap<String, usize>,
    funcs: HashMap<String, FuncDef>,
    builtins: BuiltinRegistry,
    strict: bool,
    call_depth: Option<usize>,
}

#[derive(Debug)]
pub(crate) struct PlanDef {
    pub name: String,
    pub blocks: Vec<Block>,
    pub frame_size: usize,
}

#[derive(Debug)]
pub(crate) struct FuncDef {
    pub name: String,
    pub params: Vec<u32>,
    pub return_local: u32,
    pub blocks: Vec<Block>,
    pub frame_size: usize,
}

impl IntermediateRepresentation {
    /// Stamp the strictness mode; affects evaluator behavior only.
    pub fn with_strict_builtin_errors(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn strict_builtin_errors(&self) -> bool {
        self.strict
    }

    /// Entry-point names, in bundle order.
    pub fn entry_points(&self) -> impl Iterator<Item = &str> {
        self.plans.iter().map(|p| p.name.as_str())
    }

    /// Maximum frames a single evaluation can push, or `None` when the
    /// call graph is recursive and no static bound exists.
    pub fn call_depth(&self) -> Option<usize> {
        self.call_depth
    }

    pub(crate) fn plan_position(&self, entry_point: &str) -> Option<usize> {
        self.plan_index.get(entry_point).copied()
    }

    pub(crate) fn plan_at(&self, index: usize) -> &PlanDef {
        &self.plans[index]
    }

    pub(crate) fn func(&self, name: &str) -> Option<&FuncDef> {
        self.funcs.get(name)
    }

    pub(crate) fn string(&self, index: u32) -> Option<&str> {
        self.strings.get(index as usize).map(String::as_str)
    }

    pub(crate) fn number(&self, index: u32) -> Option<Number> {
        self.numbers.get(&index).copied()
    }

    pub(crate) fn builtins(&self) -> &BuiltinRegistry {
        &self.builtins
    }
}

// ============================================================================
// Resolution pass
// ============================================================================

fn resolve(
    bundle: PolicyBundle,
    builtins: BuiltinRegistry,
) -> Result<IntermediateRepresentation, ParseError> {
    let strings: Vec<String> = bundle
        .static_pool
        .strings
        .into_iter()
        .map(|s| s.value)
        .collect();

    // A declared builtin the host has not registered is a capability
    // gap: fatal at load time, independent of strict mode.
    for decl in &bundle.static_pool.builtin_funcs {
        if !builtins.contains(&decl.name) {
            return Err(ParseError::UnknownBuiltin(decl.name.clone()));
        }
    }

    // Function signatures first, so call sites can be checked in one walk.
    let mut func_arity: HashMap<String, usize> = HashMap::new();
    for func in &bundle.funcs.funcs {
        if func_arity
            .insert(func.name.clone(), func.params.len())
            .is_some()
        {
            return Err(ParseError::DuplicateFunction(func.name.clone()));
        }
    }

    let mut walker = Walker {
        strings: &strings,
        func_arity: &func_arity,
        builtins: &builtins,
        numbers: HashMap::new(),
    };

    let mut funcs: HashMap<String, FuncDef> = HashMap::new();
    let mut call_graph: HashMap<String, Vec<String>> = HashMap::new();
    for func in bundle.funcs.funcs {
        let context = format!("function '{}'", func.name);
        let mut max_local = func.params.iter().copied().max().unwrap_or(0);
        max_local = max_local.max(func.return_local);
        let mut callees = Vec::new();
        for block in &func.blocks {
            walker.walk_block(block, &context, &mut max_local, &mut callees)?;
        }
        call_graph.insert(func.name.clone(), callees);
        funcs.insert(
            func.name.clone(),
            FuncDef {
                name: func.name,
                params: func.params,
                return_local: func.return_local,
                blocks: func.blocks,
                frame_size: max_local as usize + 1,
            },
        );
    }

    let mut plans = Vec::with_capacity(bundle.plans.plans.len());
    let mut plan_index = HashMap::new();
    let mut plan_callees: Vec<Vec<String>> = Vec::new();
    for plan in bundle.plans.plans {
        if plan_index.contains_key(&plan.name) {
            return Err(ParseError::DuplicatePlan(plan.name));
        }
        let context = format!("plan '{}'", plan.name);
        // Locals 0 and 1 always hold the input and data documents.
        let mut max_local = 1;
        let mut callees = Vec::new();
        for block in &plan.blocks {
            walker.walk_block(block, &context, &mut max_local, &mut callees)?;
        }
        plan_callees.push(callees);
        plan_index.insert(plan.name.clone(), plans.len());
        plans.push(PlanDef {
            name: plan.name,
            blocks: plan.blocks,
            frame_size: max_local as usize + 1,
        });
    }

    let call_depth = static_call_depth(&call_graph, &plan_callees);
    let numbers = walker.numbers;

    Ok(IntermediateRepresentation {
        strings,
        numbers,
        plans,
        plan_index,
        funcs,
        builtins,
        strict: false,
        call_depth,
    })
}

fn touch(max_local: &mut u32, local: u32) {
    *max_local = (*max_local).max(local);
}

struct Walker<'a> {
    strings: &'a [String],
    func_arity: &'a HashMap<String, usize>,
    builtins: &'a BuiltinRegistry,
    numbers: HashMap<u32, Number>,
}

impl Walker<'_> {
    fn walk_block(
        &mut self,
        block: &Block,
        context: &str,
        max_local: &mut u32,
        callees: &mut Vec<String>,
    ) -> Result<(), ParseError> {
        for stmt in &block.stmts {
            self.walk_stmt(stmt, context, max_local, callees)?;
        }
        Ok(())
    }

    fn walk_stmt(
        &mut self,
        stmt: &Stmt,
        context: &str,
        max_local: &mut u32,
        callees: &mut Vec<String>,
    ) -> Result<(), ParseError> {
        match stmt {
            Stmt::ArrayAppend { array, value } => {
                touch(max_local, *array);
                self.operand(value, context, max_local)?;
            }
            Stmt::AssignInt { target, .. } => touch(max_local, *target),
            Stmt::AssignVar { source, target } | Stmt::AssignVarOnce { source, target } => {
                touch(max_local, *target);
                self.operand(source, context, max_local)?;
            }
            Stmt::Block { blocks } => {
                for b in blocks {
                    self.walk_block(b, context, max_local, callees)?;
                }
            }
            Stmt::Break { .. } | Stmt::Nop {} => {}
            Stmt::Call { func, args, result } => {
                touch(max_local, *result);
                for arg in args {
                    self.operand(arg, context, max_local)?;
                }
                if let Some(&argc) = self.func_arity.get(func) {
                    if args.len() != argc {
                        return Err(ParseError::BadArity {
                            func: func.clone(),
                            expected: argc.to_string(),
                            got: args.len(),
                        });
                    }
                    callees.push(func.clone());
                } else if let Some(entry) = self.builtins.lookup(func) {
                    if !entry.arity.accepts(args.len()) {
                        return Err(ParseError::BadArity {
                            func: func.clone(),
                            expected: entry.arity.to_string(),
                            got: args.len(),
                        });
                    }
                } else {
                    return Err(ParseError::DanglingFunction(func.clone()));
                }
            }
            Stmt::Dot {
                source,
                key,
                target,
            } => {
                touch(max_local, *target);
                self.operand(source, context, max_local)?;
                self.operand(key, context, max_local)?;
            }
            Stmt::Equal { a, b } | Stmt::NotEqual { a, b } => {
                self.operand(a, context, max_local)?;
                self.operand(b, context, max_local)?;
            }
            Stmt::IsArray { source } | Stmt::IsObject { source } => {
                self.operand(source, context, max_local)?;
            }
            Stmt::IsDefined { source } | Stmt::IsUndefined { source } => touch(max_local, *source),
            Stmt::Len { source, target } => {
                touch(max_local, *target);
                self.operand(source, context, max_local)?;
            }
            Stmt::MakeArray { target, .. }
            | Stmt::MakeNull { target }
            | Stmt::MakeNumberInt { target, .. }
            | Stmt::MakeObject { target }
            | Stmt::MakeSet { target }
            | Stmt::ResetLocal { target } => touch(max_local, *target),
            Stmt::MakeNumberRef { index, target } => {
                touch(max_local, *target);
                let literal = self.string(*index, context)?;
                let number = parse_number(literal)?;
                self.numbers.insert(*index, number);
            }
            Stmt::Not { block } => self.walk_block(block, context, max_local, callees)?,
            Stmt::ObjectInsert { key, value, object }
            | Stmt::ObjectInsertOnce { key, value, object } => {
                touch(max_local, *object);
                self.operand(key, context, max_local)?;
                self.operand(value, context, max_local)?;
            }
            Stmt::ObjectMerge { a, b, target } => {
                touch(max_local, *a);
                touch(max_local, *b);
                touch(max_local, *target);
            }
            Stmt::ResultSetAdd { value } => touch(max_local, *value),
            Stmt::ReturnLocal { source } => touch(max_local, *source),
            Stmt::Scan {
                source,
                key,
                value,
                block,
            } => {
                touch(max_local, *source);
                touch(max_local, *key);
                touch(max_local, *value);
                self.walk_block(block, context, max_local, callees)?;
            }
            Stmt::SetAdd { set, value } => {
                touch(max_local, *set);
                self.operand(value, context, max_local)?;
            }
            Stmt::With {
                local: target,
                path,
                value,
                block,
            } => {
                touch(max_local, *target);
                for index in path {
                    self.string(*index, context)?;
                }
                self.operand(value, context, max_local)?;
                self.walk_block(block, context, max_local, callees)?;
            }
        }
        Ok(())
    }

    fn operand(
        &self,
        operand: &Operand,
        context: &str,
        max_local: &mut u32,
    ) -> Result<(), ParseError> {
        match operand {
            Operand::Local(l) => *max_local = (*max_local).max(*l),
            Operand::Bool(_) => {}
            Operand::StringIndex(i) => {
                self.string(*i, context)?;
            }
        }
        Ok(())
    }

    fn string<'s>(&'s self, index: u32, context: &str) -> Result<&'s str, ParseError> {
        self.strings
            .get(index as usize)
            .map(String::as_str)
            .ok_or_else(|| ParseError::DanglingStringRef {
                index,
                context: context.to_string(),
            })
    }
}

fn parse_number(literal: &str) -> Result<Number, ParseError> {
    let parsed: serde_json::Number =
        serde_json::from_str(literal).map_err(|_| ParseError::BadNumberLiteral {
            literal: literal.to_string(),
        })?;
    if let Some(i) = parsed.as_i64() {
        Ok(Number::Int(i))
    } else {
        Ok(Number::Float(parsed.as_f64().unwrap_or(0.0)))
    }
}

// ============================================================================
// Static call depth
// ============================================================================

/// Maximum frame count of any single evaluation, walking the call graph
/// from every plan. `None` when the graph is recursive: depth is then
/// data-dependent and only the evaluator's runtime limit applies.
fn static_call_depth(
    graph: &HashMap<String, Vec<String>>,
    plan_callees: &[Vec<String>],
) -> Option<usize> {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Visiting,
        Done(usize),
    }

    fn func_depth(
        name: &str,
        graph: &HashMap<String, Vec<String>>,
        memo: &mut HashMap<String, State>,
    ) -> Option<usize> {
        match memo.get(name) {
            Some(State::Visiting) => return None,
            Some(State::Done(d)) => return Some(*d),
            None => {}
        }
        memo.insert(name.to_string(), State::Visiting);
        let mut depth = 1;
        if let Some(callees) = graph.get(name) {
            for callee in callees {
                depth = depth.max(1 + func_depth(callee, graph, memo)?);
            }
        }
        memo.insert(name.to_string(), State::Done(depth));
        Some(depth)
    }

    let mut memo = HashMap::new();
    let mut max = 1;
    for callees in plan_callees {
        for callee in callees {
            max = max.max(1 + func_depth(callee, graph, &mut memo)?);
        }
    }
    Some(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_bundle() -> String {
        r#"{
            "static": {
                "strings": [{"value": "result"}],
                "builtin_funcs": [{"name": "plus"}]
            },
            "plans": {"plans": [{
                "name": "policy/main",
                "blocks": [{"stmts": [
                    {"type": "CallStmt", "stmt": {
                        "func": "plus",
                        "args": [
                            {"type": "local", "value": 0},
                            {"type": "local", "value": 1}
                        ],
                        "result": 2
                    }},
                    {"type": "ResultSetAddStmt", "stmt": {"value": 2}}
                ]}]
            }]},
            "funcs": {"funcs": []}
        }"#
        .to_string()
    }

    #[test]
    fn parse_minimal_bundle() {
        let ir = Parser::parse(&minimal_bundle()).unwrap();
        assert_eq!(ir.entry_points().collect::<Vec<_>>(), vec!["policy/main"]);
        assert_eq!(ir.plan_at(0).frame_size, 3);
        assert_eq!(ir.call_depth(), Some(1));
        assert!(!ir.strict_builtin_errors());
    }

    #[test]
    fn strictness_is_stamped_post_parse() {
        let ir = Parser::parse(&minimal_bundle())
            .unwrap()
            .with_strict_builtin_errors(true);
        assert!(ir.strict_builtin_errors());
    }

    #[test]
    fn unknown_builtin_is_load_error() {
        let raw = r#"{
            "static": {"builtin_funcs": [{"name": "no.such.builtin"}]},
            "plans": {"plans": []}
        }"#;
        match Parser::parse(raw) {
            Err(ParseError::UnknownBuiltin(name)) => assert_eq!(name, "no.such.builtin"),
            other => panic!("expected UnknownBuiltin, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn dangling_call_is_load_error() {
        let raw = r#"{
            "plans": {"plans": [{
                "name": "p",
                "blocks": [{"stmts": [
                    {"type": "CallStmt", "stmt": {"func": "g0.data.missing", "args": [], "result": 2}}
                ]}]
            }]}
        }"#;
        assert!(matches!(
            Parser::parse(raw),
            Err(ParseError::DanglingFunction(_))
        ));
    }

    #[test]
    fn dangling_string_index_is_load_error() {
        let raw = r#"{
            "static": {"strings": [{"value": "only"}]},
            "plans": {"plans": [{
                "name": "p",
                "blocks": [{"stmts": [
                    {"type": "AssignVarStmt", "stmt": {
                        "source": {"type": "string_index", "value": 9},
                        "target": 2
                    }}
                ]}]
            }]}
        }"#;
        assert!(matches!(
            Parser::parse(raw),
            Err(ParseError::DanglingStringRef { index: 9, .. })
        ));
    }

    #[test]
    fn bad_number_literal_is_load_error() {
        let raw = r#"{
            "static": {"strings": [{"value": "not-a-number"}]},
            "plans": {"plans": [{
                "name": "p",
                "blocks": [{"stmts": [
                    {"type": "MakeNumberRefStmt", "stmt": {"index": 0, "target": 2}}
                ]}]
            }]}
        }"#;
        assert!(matches!(
            Parser::parse(raw),
            Err(ParseError::BadNumberLiteral { .. })
        ));
    }

    #[test]
    fn builtin_arity_checked_at_load() {
        let raw = r#"{
            "plans": {"plans": [{
                "name": "p",
                "blocks": [{"stmts": [
                    {"type": "CallStmt", "stmt": {
                        "func": "plus",
                        "args": [{"type": "local", "value": 0}],
                        "result": 2
                    }}
                ]}]
            }]}
        }"#;
        assert!(matches!(Parser::parse(raw), Err(ParseError::BadArity { .. })));
    }

    #[test]
    fn duplicate_plan_is_load_error() {
        let raw = r#"{
            "plans": {"plans": [
                {"name": "p", "blocks": []},
                {"name": "p", "blocks": []}
            ]}
        }"#;
        assert!(matches!(Parser::parse(raw), Err(ParseError::DuplicatePlan(_))));
    }

    #[test]
    fn recursive_call_graph_has_no_static_depth() {
        let raw = r#"{
            "plans": {"plans": [{
                "name": "p",
                "blocks": [{"stmts": [
                    {"type": "CallStmt", "stmt": {
                        "func": "loop",
                        "args": [{"type": "local", "value": 0}],
                        "result": 2
                    }}
                ]}]
            }]},
            "funcs": {"funcs": [{
                "name": "loop",
                "params": [0],
                "return": 1,
                "blocks": [{"stmts": [
                    {"type": "CallStmt", "stmt": {
                        "func": "loop",
                        "args": [{"type": "local", "value": 0}],
                        "result": 1
                    }},
                    {"type": "ReturnLocalStmt", "stmt": {"source": 1}}
                ]}]
            }]}
        }"#;
        let ir = Parser::parse(raw).unwrap();
        assert_eq!(ir.call_depth(), None);
    }

    #[test]
    fn parse_is_deterministic() {
        let raw = minimal_bundle();
        let a = Parser::parse(&raw).unwrap();
        let b = Parser::parse(&raw).unwrap();
        assert_eq!(
            a.entry_points().collect::<Vec<_>>(),
            b.entry_points().collect::<Vec<_>>()
        );
        assert_eq!(a.plan_at(0).frame_size, b.plan_at(0).frame_size);
        assert_eq!(a.call_depth(), b.call_depth());
    }
}
