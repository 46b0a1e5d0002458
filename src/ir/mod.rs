//! # Host Program Representation
//!
//! Value model of the program graph the fault engine walks: modules own global
//! variables, aliases and functions, functions own basic blocks, blocks own
//! instructions. Hosts convert their own representation into these types (or
//! load them from JSON5) before running the passes.

pub mod function;
pub mod instruction;
pub mod module;
pub mod types;

pub use function::{Attribute, BasicBlock, DefinitionIndex, Function, FunctionBuilder, Param};
pub use instruction::{
    BinaryOp, BlockId, Callee, CastOp, Constant, ConstantExpr, ConstantExprOp, InlineAsm,
    InstKind, Instruction, IntPredicate, Operand, PhiIncoming, SwitchCase, ValueId,
};
pub use module::{
    GlobalAlias, GlobalValueKind, GlobalValueRef, GlobalVariable, Module, ModuleLoadError,
};
pub use types::{Linkage, Type};
