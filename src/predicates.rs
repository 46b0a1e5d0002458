//! # Pattern Predicates
//!
//! Structural tests over single graph nodes. All predicates are read only and
//! look at local structure only (operands, incoming edges, the defining
//! instruction of an operand), never into callees.

use crate::ir::{
    BlockId, CastOp, Constant, DefinitionIndex, Function, InstKind, Instruction, IntPredicate,
    Module, Operand,
};
use std::collections::HashSet;

/// Sentinel attribute planted by the `buggy-attr` pass
pub const BUGGY_ATTRIBUTE: &str = "buggy";

pub fn is_vector_typed(inst: &Instruction) -> bool {
    inst.ty.is_vector()
}

pub fn is_shufflevector(inst: &Instruction) -> bool {
    matches!(inst.kind, InstKind::ShuffleVector { .. })
}

/// Phi node of struct or array type
pub fn is_aggregate_phi(inst: &Instruction) -> bool {
    inst.is_phi() && inst.ty.is_aggregate()
}

/// First incoming block named twice by a phi node
pub fn repeated_phi_predecessor(inst: &Instruction) -> Option<BlockId> {
    let incoming = inst.phi_incoming()?;
    let mut seen = HashSet::new();
    incoming
        .iter()
        .map(|edge| edge.block)
        .find(|block| !seen.insert(*block))
}

/// Phi node using its own result as incoming value
pub fn is_phi_self_reference(inst: &Instruction) -> bool {
    inst.phi_incoming().is_some_and(|incoming| {
        incoming
            .iter()
            .any(|edge| edge.value.as_value() == Some(inst.id))
    })
}

/// Switch with an odd number of cases, default excluded
pub fn is_odd_case_switch(inst: &Instruction) -> bool {
    inst.case_count().is_some_and(|count| count % 2 == 1)
}

pub fn is_i1_select(inst: &Instruction) -> bool {
    matches!(inst.kind, InstKind::Select { .. }) && inst.ty.is_int(1)
}

/// Store whose address is a folded constant expression
pub fn is_store_to_constant_expr(inst: &Instruction) -> bool {
    match &inst.kind {
        InstKind::Store { ptr, .. } => ptr.as_constant().is_some_and(Constant::is_constant_expr),
        _ => false,
    }
}

/// Load whose address is produced by an `inttoptr` instruction
pub fn is_load_of_inttoptr(inst: &Instruction, function: &Function, defs: &DefinitionIndex) -> bool {
    let InstKind::Load {
        ptr: Operand::Value(address),
    } = &inst.kind
    else {
        return false;
    };
    defs.lookup(function, *address).is_some_and(|def| {
        matches!(
            def.kind,
            InstKind::Cast {
                cast: CastOp::IntToPtr,
                ..
            }
        )
    })
}

/// Call without a statically known target function
pub fn is_indirect_call(inst: &Instruction) -> bool {
    inst.is_call() && inst.called_function().is_none()
}

pub fn is_icmp_slt(inst: &Instruction) -> bool {
    matches!(
        inst.kind,
        InstKind::ICmp {
            predicate: IntPredicate::Slt,
            ..
        }
    )
}

/// Any global value of the module with weak linkage
pub fn has_weak_global(module: &Module) -> bool {
    module.global_values().any(|value| value.linkage.is_weak())
}

pub fn has_odd_instruction_count(function: &Function) -> bool {
    function.instruction_count() % 2 == 1
}

pub fn has_internal_linkage(function: &Function) -> bool {
    function.linkage.is_internal()
}

pub fn has_external_linkage(function: &Function) -> bool {
    function.linkage.is_external()
}

pub fn has_buggy_attribute(function: &Function) -> bool {
    function.has_attribute(BUGGY_ATTRIBUTE)
}
