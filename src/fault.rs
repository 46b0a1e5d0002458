//! # Fatal Faults
//!
//! Crash kinds fired by the `buggy` pass and the handler seam through which
//! they leave the engine. Fatal faults never travel through `Result`: a handler
//! either terminates the process ([`ProcessAbort`]) or unwinds with the fault as
//! panic payload ([`UnwindOnFault`]); in both cases control never returns.

use colored::Colorize;
use log::error;
use std::fmt;
use std::hint::black_box;
use std::sync::atomic::{AtomicU64, Ordering};

/// Crash behaviors of the `buggy` pass, each with a fixed diagnostic
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FatalFault {
    Vector,
    ShuffleVector,
    AggregatePhi,
    RepeatedPhiPredecessor,
    PhiSelfReference,
    SwitchOddCases,
    I1Select,
    StoreToConstantExpr,
    LoadOfIntToPtr,
    WeakGlobal,
    BuggyAttribute,
}

impl FatalFault {
    pub fn message(self) -> &'static str {
        match self {
            FatalFault::Vector => "vector instructions are broken",
            FatalFault::ShuffleVector => "shufflevector instructions are broken",
            FatalFault::AggregatePhi => "aggregate phis are broken",
            FatalFault::RepeatedPhiPredecessor => "phi with repeated predecessors is broken",
            FatalFault::PhiSelfReference => "phi referencing itself is broken",
            FatalFault::SwitchOddCases => "switch with odd number of cases is broken",
            FatalFault::I1Select => "select of i1 is broken",
            FatalFault::StoreToConstantExpr => "store to constantexpr is broken",
            FatalFault::LoadOfIntToPtr => "load of inttoptr is broken",
            FatalFault::WeakGlobal => "weak globals are broken",
            FatalFault::BuggyAttribute => "buggy-attr is broken",
        }
    }
}

impl fmt::Display for FatalFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Exit path of the fault engine.
pub trait FaultHandler: Send + Sync {
    /// Terminate with the given fault. Must not return.
    fn fatal(&self, fault: FatalFault) -> !;

    /// Externally observable write, performed on every iteration of the indirect call loop.
    fn side_effect(&self);
}

/// Target of [`ProcessAbort::side_effect`]. Written only, never read for decisions.
static SIDE_EFFECT_CELL: AtomicU64 = AtomicU64::new(0);

/// Default handler: print the diagnostic and abort the process.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessAbort;

impl FaultHandler for ProcessAbort {
    fn fatal(&self, fault: FatalFault) -> ! {
        error!("Fatal fault {:?} fired", fault);
        eprintln!("{} {}", "BUGGY ERROR:".red().bold(), fault);
        std::process::abort()
    }

    fn side_effect(&self) {
        SIDE_EFFECT_CELL.fetch_add(black_box(1), Ordering::Relaxed);
    }
}

/// Handler for embedding hosts and tests: unwinds with the [`FatalFault`] as panic
/// payload and counts side effect writes.
#[derive(Debug, Default)]
pub struct UnwindOnFault {
    side_effects: AtomicU64,
}

impl UnwindOnFault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of side effect writes seen so far
    pub fn side_effects(&self) -> u64 {
        self.side_effects.load(Ordering::Relaxed)
    }

    /// Extract the fault from a payload produced by [`FaultHandler::fatal`] of this handler
    pub fn fault_from_payload(payload: &(dyn std::any::Any + Send)) -> Option<FatalFault> {
        payload.downcast_ref::<FatalFault>().copied()
    }
}

impl FaultHandler for UnwindOnFault {
    fn fatal(&self, fault: FatalFault) -> ! {
        error!("Fatal fault {:?} fired", fault);
        std::panic::panic_any(fault)
    }

    fn side_effect(&self) {
        self.side_effects.fetch_add(black_box(1), Ordering::Relaxed);
    }
}
