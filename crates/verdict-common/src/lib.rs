pub mod ir;
pub mod stmt;

pub use ir::{Block, PolicyBundle, RawFunc, RawPlan, StaticPool};
pub use stmt::{Local, Operand, Stmt};
