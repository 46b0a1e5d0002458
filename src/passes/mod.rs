use crate::fault::FaultHandler;
use crate::ir::Module;
use std::fmt::Debug;
use std::sync::Arc;

pub mod buggy;
pub mod buggy_attr;

pub use buggy::BuggyPass;
pub use buggy_attr::BuggyAttrPass;

/// Trait for passes runnable by a [`crate::plugin::PassPipeline`]
pub trait Pass: Send + Sync + Debug {
    /// Pipeline name of the pass
    fn name(&self) -> &'static str;
    /// Run over the whole module. Returns whether the module is reported changed.
    fn run(&self, module: &mut Module, handler: &dyn FaultHandler) -> bool;
}

/// Type definition of a shareable pass instance
pub type PassType = Arc<dyn Pass>;
