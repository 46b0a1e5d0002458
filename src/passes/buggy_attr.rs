use super::Pass;
use crate::fault::FaultHandler;
use crate::ir::Module;
use crate::predicates::BUGGY_ATTRIBUTE;
use log::debug;

/// The `buggy-attr` module pass.
///
/// Tags every function with a body with the [`BUGGY_ATTRIBUTE`] sentinel, so a later
/// `buggy<crash-on-buggy-attr>` run in the same pipeline trips over it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuggyAttrPass;

impl BuggyAttrPass {
    /// Returns `true` if the module contains at least one function with a body
    pub fn run_on_module(&self, module: &mut Module) -> bool {
        let mut changed = false;
        for function in module
            .functions
            .iter_mut()
            .filter(|function| !function.is_declaration())
        {
            function.add_attribute(BUGGY_ATTRIBUTE);
            debug!("Marked {} as {}", function.name, BUGGY_ATTRIBUTE);
            changed = true;
        }
        changed
    }
}

impl Pass for BuggyAttrPass {
    fn name(&self) -> &'static str {
        "buggy-attr"
    }

    fn run(&self, module: &mut Module, _handler: &dyn FaultHandler) -> bool {
        self.run_on_module(module)
    }
}
