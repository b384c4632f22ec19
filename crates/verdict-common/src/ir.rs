use serde::{Deserialize, Serialize};

use crate::stmt::Stmt;

/// Top-level plan bundle, the serialized output of the upstream policy
/// compiler. Field names are a stable wire contract and round-trip
/// losslessly; per-statement source-location metadata is accepted but
/// not retained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyBundle {
    #[serde(rename = "static", default)]
    pub static_pool: StaticPool,
    #[serde(default)]
    pub plans: PlanSection,
    #[serde(default)]
    pub funcs: FuncSection,
}

/// Interned constants shared by all plans and functions in the bundle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticPool {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub strings: Vec<InternedString>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub builtin_funcs: Vec<BuiltinDecl>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<InternedString>,
}

/// One entry in the interned string pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InternedString {
    pub value: String,
}

/// A builtin function the bundle requires from the host.
///
/// The optional `decl` carries the compiler's type declaration; the
/// evaluator dispatches purely by name, so it is kept opaque.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDecl {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decl: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanSection {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plans: Vec<RawPlan>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FuncSection {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub funcs: Vec<RawFunc>,
}

/// A named entry point: an ordered list of blocks executed against the
/// two top-level documents (input in local 0, data in local 1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPlan {
    pub name: String,
    pub blocks: Vec<Block>,
}

/// A compiled function body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFunc {
    pub name: String,
    /// Locals bound positionally to the call arguments.
    pub params: Vec<u32>,
    /// Local holding the function result; undefined means no-match.
    #[serde(rename = "return")]
    pub return_local: u32,
    pub blocks: Vec<Block>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<String>,
}

/// An ordered statement sequence; the unit of control flow for
/// undefined short-circuiting and break-N early exit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub stmts: Vec<Stmt>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundle_sections_default_when_absent() {
        let bundle: PolicyBundle = serde_json::from_str("{}").unwrap();
        assert!(bundle.static_pool.strings.is_empty());
        assert!(bundle.plans.plans.is_empty());
        assert!(bundle.funcs.funcs.is_empty());
    }

    #[test]
    fn func_return_field_round_trips() {
        let json = r#"{
            "name": "g0.data.policy.allow",
            "params": [0, 1],
            "return": 2,
            "blocks": [{"stmts": []}],
            "path": ["g0", "policy", "allow"]
        }"#;
        let func: RawFunc = serde_json::from_str(json).unwrap();
        assert_eq!(func.return_local, 2);
        assert_eq!(func.params, vec![0, 1]);

        let back = serde_json::to_value(&func).unwrap();
        assert_eq!(back["return"], 2);
    }
}
