use serde::{Deserialize, Serialize};

use crate::ir::Block;

/// Index of a register in the current frame.
pub type Local = u32;

/// A statement input: a register, an immediate boolean, or an index
/// into the interned string pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Operand {
    Local(Local),
    Bool(bool),
    StringIndex(u32),
}

/// The closed statement set of the plan IR.
///
/// Wire encoding is `{"type": "<KindStmt>", "stmt": {...}}`; variant
/// payloads carry the contract field names verbatim. Statements read
/// registers and write at most one, or direct control flow. A statement
/// that "does not apply" (missing key, failed comparison, undefined
/// operand) terminates the enclosing block as undefined; it is not an
/// error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "stmt")]
pub enum Stmt {
    /// Append `value` to the array held in `array`.
    #[serde(rename = "ArrayAppendStmt")]
    ArrayAppend { array: Local, value: Operand },

    /// Write an integer literal into `target`.
    #[serde(rename = "AssignIntStmt")]
    AssignInt { value: i64, target: Local },

    /// Copy `source` into `target`; undefined source is undefined.
    #[serde(rename = "AssignVarStmt")]
    AssignVar { source: Operand, target: Local },

    /// As AssignVar, but re-assignment with a different value is a hard
    /// conflict error.
    #[serde(rename = "AssignVarOnceStmt")]
    AssignVarOnce { source: Operand, target: Local },

    /// Run nested blocks in order.
    #[serde(rename = "BlockStmt")]
    Block { blocks: Vec<Block> },

    /// Break out of `index` + 1 enclosing blocks (0 = current block).
    #[serde(rename = "BreakStmt")]
    Break { index: u32 },

    /// Invoke an IR function or builtin, writing the result register.
    #[serde(rename = "CallStmt")]
    Call {
        func: String,
        args: Vec<Operand>,
        result: Local,
    },

    /// Member lookup: `target = source[key]`; missing key, out-of-range
    /// index, or a non-container source is undefined.
    #[serde(rename = "DotStmt")]
    Dot {
        source: Operand,
        key: Operand,
        target: Local,
    },

    /// Deep structural equality; mismatch is undefined.
    #[serde(rename = "EqualStmt")]
    Equal { a: Operand, b: Operand },

    /// Undefined unless `source` is an array.
    #[serde(rename = "IsArrayStmt")]
    IsArray { source: Operand },

    /// Undefined unless the register holds a value.
    #[serde(rename = "IsDefinedStmt")]
    IsDefined { source: Local },

    /// Undefined unless `source` is an object.
    #[serde(rename = "IsObjectStmt")]
    IsObject { source: Operand },

    /// Undefined unless the register is undefined.
    #[serde(rename = "IsUndefinedStmt")]
    IsUndefined { source: Local },

    /// Length of a string, array, object, or set.
    #[serde(rename = "LenStmt")]
    Len { source: Operand, target: Local },

    /// Fresh empty array with a capacity hint.
    #[serde(rename = "MakeArrayStmt")]
    MakeArray { capacity: u32, target: Local },

    #[serde(rename = "MakeNullStmt")]
    MakeNull { target: Local },

    #[serde(rename = "MakeNumberIntStmt")]
    MakeNumberInt { value: i64, target: Local },

    /// Number parsed from the interned string at `index`; the literal is
    /// validated and pre-parsed at load time.
    #[serde(rename = "MakeNumberRefStmt")]
    MakeNumberRef { index: u32, target: Local },

    #[serde(rename = "MakeObjectStmt")]
    MakeObject { target: Local },

    #[serde(rename = "MakeSetStmt")]
    MakeSet { target: Local },

    #[serde(rename = "NopStmt")]
    Nop {},

    /// Deep inequality; equal values are undefined.
    #[serde(rename = "NotEqualStmt")]
    NotEqual { a: Operand, b: Operand },

    /// Succeeds iff the nested block is undefined.
    #[serde(rename = "NotStmt")]
    Not { block: Block },

    /// Insert/overwrite `key` in the object held in `object`.
    #[serde(rename = "ObjectInsertStmt")]
    ObjectInsert {
        key: Operand,
        value: Operand,
        object: Local,
    },

    /// Insert `key`; re-inserting a different value under the same key
    /// is a hard conflict error.
    #[serde(rename = "ObjectInsertOnceStmt")]
    ObjectInsertOnce {
        key: Operand,
        value: Operand,
        object: Local,
    },

    /// Recursive object merge of `a` and `b` into `target`; values from
    /// `b` win scalar conflicts.
    #[serde(rename = "ObjectMergeStmt")]
    ObjectMerge { a: Local, b: Local, target: Local },

    /// Mark the register undefined.
    #[serde(rename = "ResetLocalStmt")]
    ResetLocal { target: Local },

    /// Emit the register as one result tuple of the running plan.
    #[serde(rename = "ResultSetAddStmt")]
    ResultSetAdd { value: Local },

    /// Function exit yielding the register value; an undefined register
    /// signals no-match to the caller.
    #[serde(rename = "ReturnLocalStmt")]
    ReturnLocal { source: Local },

    /// Iterate the collection in `source`, binding `key`/`value` and
    /// running `block` once per element.
    #[serde(rename = "ScanStmt")]
    Scan {
        source: Local,
        key: Local,
        value: Local,
        block: Block,
    },

    /// Add `value` to the set held in `set`.
    #[serde(rename = "SetAddStmt")]
    SetAdd { set: Local, value: Operand },

    /// Run `block` with the document at `path` inside `local` replaced
    /// by `value`, restoring the register afterwards.
    #[serde(rename = "WithStmt")]
    With {
        local: Local,
        path: Vec<u32>,
        value: Operand,
        block: Block,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operand_wire_encoding() {
        let op: Operand = serde_json::from_str(r#"{"type": "local", "value": 3}"#).unwrap();
        assert_eq!(op, Operand::Local(3));

        let op: Operand = serde_json::from_str(r#"{"type": "bool", "value": true}"#).unwrap();
        assert_eq!(op, Operand::Bool(true));

        let op: Operand = serde_json::from_str(r#"{"type": "string_index", "value": 7}"#).unwrap();
        assert_eq!(op, Operand::StringIndex(7));
    }

    #[test]
    fn stmt_wire_encoding() {
        let json = r#"{
            "type": "CallStmt",
            "stmt": {
                "func": "plus",
                "args": [
                    {"type": "local", "value": 2},
                    {"type": "local", "value": 3}
                ],
                "result": 4
            }
        }"#;
        let stmt: Stmt = serde_json::from_str(json).unwrap();
        match stmt {
            Stmt::Call { func, args, result } => {
                assert_eq!(func, "plus");
                assert_eq!(args.len(), 2);
                assert_eq!(result, 4);
            }
            other => panic!("expected CallStmt, got {:?}", other),
        }
    }

    #[test]
    fn stmt_rejects_unknown_kind() {
        let json = r#"{"type": "CallDynamicStmt", "stmt": {}}"#;
        assert!(serde_json::from_str::<Stmt>(json).is_err());
    }

    #[test]
    fn stmt_kind_name_round_trips() {
        let stmt = Stmt::Break { index: 1 };
        let json = serde_json::to_value(&stmt).unwrap();
        assert_eq!(json["type"], "BreakStmt");
        assert_eq!(json["stmt"]["index"], 1);
    }
}
