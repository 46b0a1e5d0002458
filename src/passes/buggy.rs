//! # Fault Trigger Engine
//!
//! The `buggy` function pass. For every function it applies the gating faults,
//! then the function level crashes, then walks all instructions in program
//! order and fires the first armed instruction level fault that matches.

use super::Pass;
use crate::fault::{FatalFault, FaultHandler};
use crate::ir::{
    Callee, DefinitionIndex, Function, InlineAsm, InstKind, Instruction, IntPredicate, Module,
    Type,
};
use crate::options::BuggyOptions;
use crate::predicates::*;
use log::{debug, info, warn};

/// Assembly text no assembler accepts
pub const UNPARSEABLE_ASM: &str = "!@#$%^&*()";

/// The `buggy` pass configured with one set of armed faults
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuggyPass {
    pub options: BuggyOptions,
}

impl BuggyPass {
    pub fn new(options: BuggyOptions) -> Self {
        Self { options }
    }

    /// Run the fault engine on one function of `module`.
    ///
    /// # Arguments
    ///
    /// * `module` - The module owning the function.
    /// * `index` - Index of the function in `module.functions`.
    /// * `handler` - Exit path for fatal faults and the indirect call loop.
    ///
    /// # Returns
    ///
    /// * `bool` - Whether the function is reported changed. Crashes and the
    ///   indirect call loop never return.
    pub fn run_on_function(
        &self,
        module: &mut Module,
        index: usize,
        handler: &dyn FaultHandler,
    ) -> bool {
        let options = &self.options;
        let Some(function) = module.functions.get(index) else {
            return false;
        };
        if function.instruction_count() == 0 {
            return false;
        }

        if options.bug_only_if_internal_func && !has_internal_linkage(function) {
            debug!("Skip {}: not internal", function.name);
            return false;
        }
        if options.bug_only_if_external_func && !has_external_linkage(function) {
            debug!("Skip {}: not external", function.name);
            return false;
        }
        if options.crash_on_buggy_attr && has_buggy_attribute(function) {
            handler.fatal(FatalFault::BuggyAttribute);
        }
        if options.bug_only_if_odd_number_insts && !has_odd_instruction_count(function) {
            debug!(
                "Skip {}: even instruction count {}",
                function.name,
                function.instruction_count()
            );
            return false;
        }
        if options.crash_if_weak_global_exists && has_weak_global(module) {
            handler.fatal(FatalFault::WeakGlobal);
        }

        let function = &mut module.functions[index];
        if options.insert_unparseable_asm {
            return insert_unparseable_asm(function);
        }
        self.visit_instructions(function, handler)
    }

    /// Walk blocks and instructions in program order. Any visited instruction marks the
    /// function changed.
    fn visit_instructions(&self, function: &mut Function, handler: &dyn FaultHandler) -> bool {
        let defs = DefinitionIndex::build(function);
        let mut changed = false;

        for block_index in 0..function.blocks.len() {
            for inst_index in 0..function.blocks[block_index].instructions.len() {
                changed = true;

                if self.options.miscompile_icmp_slt_to_sle
                    && is_icmp_slt(&function.blocks[block_index].instructions[inst_index])
                {
                    let inst = &mut function.blocks[block_index].instructions[inst_index];
                    if let InstKind::ICmp { predicate, .. } = &mut inst.kind {
                        *predicate = IntPredicate::Sle;
                        info!("Miscompiled {} in {}: slt -> sle", inst.id, function.name);
                    }
                }

                let inst = &function.blocks[block_index].instructions[inst_index];
                if let Some(fault) = self.matching_crash(inst, function, &defs) {
                    warn!("{} in {} triggers {:?}", inst.id, function.name, fault);
                    handler.fatal(fault);
                }
                if self.options.infloop_on_indirect_call && is_indirect_call(inst) {
                    warn!("Indirect call {} in {}, spinning", inst.id, function.name);
                    spin(handler);
                }
            }
        }
        changed
    }

    /// First armed crash matching `inst`, in fixed check order
    fn matching_crash(
        &self,
        inst: &Instruction,
        function: &Function,
        defs: &DefinitionIndex,
    ) -> Option<FatalFault> {
        let options = &self.options;
        let checks = [
            (
                options.crash_switch_odd_number_cases && is_odd_case_switch(inst),
                FatalFault::SwitchOddCases,
            ),
            (
                options.crash_on_shufflevector && is_shufflevector(inst),
                FatalFault::ShuffleVector,
            ),
            (
                options.crash_on_vector && is_vector_typed(inst),
                FatalFault::Vector,
            ),
            (
                options.crash_on_repeated_phi_predecessor
                    && repeated_phi_predecessor(inst).is_some(),
                FatalFault::RepeatedPhiPredecessor,
            ),
            (
                options.crash_on_phi_self_reference && is_phi_self_reference(inst),
                FatalFault::PhiSelfReference,
            ),
            (
                options.crash_on_aggregate_phi && is_aggregate_phi(inst),
                FatalFault::AggregatePhi,
            ),
            (
                options.crash_on_i1_select && is_i1_select(inst),
                FatalFault::I1Select,
            ),
            (
                options.crash_store_to_constantexpr && is_store_to_constant_expr(inst),
                FatalFault::StoreToConstantExpr,
            ),
            (
                options.crash_load_of_inttoptr && is_load_of_inttoptr(inst, function, defs),
                FatalFault::LoadOfIntToPtr,
            ),
        ];
        checks
            .into_iter()
            .find_map(|(matched, fault)| matched.then_some(fault))
    }
}

impl Pass for BuggyPass {
    fn name(&self) -> &'static str {
        "buggy"
    }

    fn run(&self, module: &mut Module, handler: &dyn FaultHandler) -> bool {
        let mut changed = false;
        for index in 0..module.functions.len() {
            if module.functions[index].is_declaration() {
                continue;
            }
            changed |= self.run_on_function(module, index, handler);
        }
        changed
    }
}

/// Insert a call to [`UNPARSEABLE_ASM`] at the first insertion point of the entry block.
/// Skipped when the function has no free value number left.
fn insert_unparseable_asm(function: &mut Function) -> bool {
    let Some(id) = function.next_value_id() else {
        warn!("No free value number in {}, asm not inserted", function.name);
        return false;
    };
    let Some(entry) = function.blocks.first_mut() else {
        return false;
    };
    let position = entry.first_insertion_point();
    entry.instructions.insert(
        position,
        Instruction::new(
            id,
            Type::Void,
            InstKind::Call {
                callee: Callee::Asm(InlineAsm {
                    asm: UNPARSEABLE_ASM.to_string(),
                    constraints: String::new(),
                    side_effects: true,
                }),
                args: Vec::new(),
            },
        ),
    );
    info!("Inserted unparseable asm into {}", function.name);
    true
}

/// Never terminates; every iteration performs an observable write through `handler`
fn spin(handler: &dyn FaultHandler) -> ! {
    loop {
        handler.side_effect();
    }
}
