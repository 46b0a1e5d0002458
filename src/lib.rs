pub mod fault;
pub mod ir;
pub mod options;
pub mod passes;
pub mod plugin;
pub mod predicates;

pub mod prelude {
    pub use crate::fault::{FatalFault, FaultHandler, ProcessAbort, UnwindOnFault};
    pub use crate::ir::{Function, FunctionBuilder, Module};
    pub use crate::options::{BuggyOptions, ParseError};
    pub use crate::passes::{BuggyAttrPass, BuggyPass, Pass, PassType};
    pub use crate::plugin::{
        BuggyPlugin, ExtensionPoint, PassPipeline, PipelineError, BUGGY_OPTIONS_ENV,
    };
}
