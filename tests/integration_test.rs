use buggy_pass::ir::{
    CastOp, Constant, ConstantExpr, ConstantExprOp, InstKind, IntPredicate, Linkage, Operand,
    PhiIncoming, Type,
};
use buggy_pass::prelude::*;
use crossbeam_channel::{bounded, RecvTimeoutError};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::process::Command;
use std::sync::Arc;
use std::thread::spawn;
use std::time::Duration;

/// Run `pipeline` over `module` with an unwinding handler.
/// Result is Ok(changed) or Err(fault) if a fatal fault fired.
fn run_pipeline(pipeline: &str, module: &mut Module) -> Result<bool, FatalFault> {
    let pipeline = BuggyPlugin::default().parse_pipeline(pipeline).unwrap();
    let handler = UnwindOnFault::new();
    catch_unwind(AssertUnwindSafe(|| pipeline.run(module, &handler)))
        .map_err(|payload| UnwindOnFault::fault_from_payload(payload.as_ref()).unwrap())
}

fn module_with(functions: Vec<Function>) -> Module {
    let mut module = Module::new("integration");
    module.functions = functions;
    module
}

fn vector_add() -> Function {
    let mut builder = FunctionBuilder::new("vadd", Type::vector(4, Type::int(32)));
    let a = builder.param(Type::vector(4, Type::int(32)));
    builder.push(
        Type::vector(4, Type::int(32)),
        InstKind::Binary {
            binop: buggy_pass::ir::BinaryOp::Add,
            lhs: a.into(),
            rhs: a.into(),
        },
    );
    builder.build()
}

fn ret_void(name: &str) -> Function {
    let mut builder = FunctionBuilder::new(name, Type::Void);
    builder.push(Type::Void, InstKind::Ret { value: None });
    builder.build()
}

fn indirect_call() -> Function {
    let mut builder = FunctionBuilder::new("trampoline", Type::Void);
    let target = builder.param(Type::Ptr);
    builder.push(
        Type::Void,
        InstKind::Call {
            callee: buggy_pass::ir::Callee::Indirect(target.into()),
            args: vec![],
        },
    );
    builder.build()
}

#[test]
/// Test for the vector crash
///
/// A function whose only instruction is vector typed aborts with crash-on-vector armed
fn vector_instruction_crashes() {
    let mut module = module_with(vec![vector_add()]);
    assert_eq!(
        Err(FatalFault::Vector),
        run_pipeline("buggy<crash-on-vector>", &mut module)
    );
    assert_eq!(Ok(true), run_pipeline("buggy<crash-on-shufflevector>", &mut module));
}

#[test]
/// Test for the slt -> sle miscompile
fn miscompile_is_silent() {
    let mut builder = FunctionBuilder::new("lt", Type::int(1));
    let a = builder.param(Type::int(32));
    let b = builder.param(Type::int(32));
    builder.push(
        Type::int(1),
        InstKind::ICmp {
            predicate: IntPredicate::Slt,
            lhs: a.into(),
            rhs: b.into(),
        },
    );
    let mut module = module_with(vec![builder.build()]);
    assert_eq!(
        Ok(true),
        run_pipeline("buggy<miscompile-icmp-slt-to-sle>", &mut module)
    );
    assert!(matches!(
        module.functions[0].blocks[0].instructions[0].kind,
        InstKind::ICmp {
            predicate: IntPredicate::Sle,
            ..
        }
    ));
}

#[test]
/// Test for the odd instruction count gate
///
/// Even counts (including zero) report unchanged whatever else is armed
fn odd_count_gate_blocks_even_functions() {
    let mut even = vector_add();
    even.blocks[0].instructions.push(buggy_pass::ir::Instruction::new(
        buggy_pass::ir::ValueId(2),
        Type::Void,
        InstKind::Ret {
            value: Some(Operand::Value(buggy_pass::ir::ValueId(1))),
        },
    ));
    let all = BuggyOptions::names()
        .filter(|name| !name.starts_with("bug-only-if-") && *name != "insert-unparseable-asm")
        .collect::<Vec<_>>()
        .join(";");
    let pipeline = format!("buggy<bug-only-if-odd-number-insts;{all}>");

    let mut module = module_with(vec![even, Function::declaration("decl", Type::Void)]);
    assert_eq!(Ok(false), run_pipeline(&pipeline, &mut module));

    let mut module = module_with(vec![vector_add()]);
    assert_eq!(
        Err(FatalFault::Vector),
        run_pipeline("buggy<bug-only-if-odd-number-insts;crash-on-vector>", &mut module)
    );
}

#[test]
/// Test for the two phase buggy attribute protocol
fn buggy_attr_then_crash() {
    let mut module = module_with(vec![ret_void("defined"), Function::declaration("decl", Type::Void)]);
    // Unmarked functions do not crash
    assert_eq!(Ok(true), run_pipeline("buggy<crash-on-buggy-attr>", &mut module));
    assert_eq!(
        Err(FatalFault::BuggyAttribute),
        run_pipeline("buggy-attr,buggy<crash-on-buggy-attr>", &mut module)
    );
    assert!(module.functions[0].has_attribute("buggy"));
    assert!(!module.functions[1].has_attribute("buggy"));
}

#[test]
/// Test for the phi family, store and load shapes
fn structural_crashes() {
    let mut builder = FunctionBuilder::new("loop", Type::Void);
    let entry = builder.block();
    let phi = builder.peek_id();
    builder.push(
        Type::int(32),
        InstKind::Phi {
            incoming: vec![
                PhiIncoming {
                    value: phi.into(),
                    block: entry,
                },
                PhiIncoming {
                    value: Constant::Int {
                        ty: Type::int(32),
                        value: 0,
                    }
                    .into(),
                    block: entry,
                },
            ],
        },
    );
    builder.push(Type::Void, InstKind::Br { dest: entry });
    let mut module = module_with(vec![builder.build()]);
    assert_eq!(
        Err(FatalFault::RepeatedPhiPredecessor),
        run_pipeline(
            "buggy<crash-on-phi-self-reference;crash-on-repeated-phi-predecessor>",
            &mut module
        )
    );
    assert_eq!(
        Err(FatalFault::PhiSelfReference),
        run_pipeline("buggy<crash-on-phi-self-reference>", &mut module)
    );

    let mut builder = FunctionBuilder::new("memory", Type::int(32));
    let raw = builder.param(Type::int(64));
    builder.push(
        Type::Void,
        InstKind::Store {
            value: raw.into(),
            ptr: Constant::Expr(ConstantExpr {
                op: ConstantExprOp::IntToPtr,
                ty: Type::Ptr,
                operands: vec![Constant::Int {
                    ty: Type::int(64),
                    value: 4096,
                }],
            })
            .into(),
        },
    );
    let ptr = builder.push(
        Type::Ptr,
        InstKind::Cast {
            cast: CastOp::IntToPtr,
            value: raw.into(),
        },
    );
    builder.push(Type::int(32), InstKind::Load { ptr: ptr.into() });
    let mut module = module_with(vec![builder.build()]);
    assert_eq!(
        Err(FatalFault::LoadOfIntToPtr),
        run_pipeline("buggy<crash-load-of-inttoptr>", &mut module)
    );
    assert_eq!(
        Err(FatalFault::StoreToConstantExpr),
        run_pipeline(
            "buggy<crash-load-of-inttoptr;crash-store-to-constantexpr>",
            &mut module
        )
    );
}

#[test]
/// Test for the weak global crash with linkage gating in front of it
fn weak_global_behind_linkage_gate() {
    let mut internal = ret_void("helper");
    internal.linkage = Linkage::Internal;
    let mut module = module_with(vec![internal]);
    module.globals.push(buggy_pass::ir::GlobalVariable {
        name: "fallback".to_string(),
        linkage: Linkage::Weak,
        ty: Type::int(32),
        initializer: None,
    });
    assert_eq!(
        Ok(false),
        run_pipeline(
            "buggy<bug-only-if-external-func;crash-if-weak-global-exists>",
            &mut module
        )
    );
    assert_eq!(
        Err(FatalFault::WeakGlobal),
        run_pipeline(
            "buggy<bug-only-if-internal-func;crash-if-weak-global-exists>",
            &mut module
        )
    );
}

#[test]
/// Test for the indirect call loop
///
/// The pass never returns; observed through a worker thread and an external timeout
fn indirect_call_spins_forever() {
    let handler = Arc::new(UnwindOnFault::new());
    let (sender, receiver) = bounded(1);
    let worker_handler = Arc::clone(&handler);
    spawn(move || {
        let mut module = module_with(vec![indirect_call()]);
        let pass = BuggyPass::new(BuggyOptions::parse("infloop-on-indirect-call").unwrap());
        let changed = pass.run(&mut module, worker_handler.as_ref());
        let _ = sender.send(changed);
    });

    match receiver.recv_timeout(Duration::from_millis(300)) {
        Err(RecvTimeoutError::Timeout) => (),
        other => panic!("pass returned: {:?}", other),
    }
    assert!(handler.side_effects() > 0);
    // The worker keeps spinning until the test process exits
}

#[test]
/// Test for the indirect call loop staying off when not armed
fn indirect_call_without_option_returns() {
    let mut module = module_with(vec![indirect_call()]);
    assert_eq!(Ok(true), run_pipeline("buggy", &mut module));
}

fn write_module(name: &str, module: &Module) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("buggy_pass_{}_{}.json5", name, std::process::id()));
    std::fs::write(&path, serde_json::to_string(module).unwrap()).unwrap();
    path
}

#[test]
/// Test for the driver abort path
///
/// A fatal fault terminates the process with a non-zero status and the fixed message
fn driver_aborts_on_fatal_fault() {
    let path = write_module("abort", &module_with(vec![vector_add()]));
    let output = Command::new(env!("CARGO_BIN_EXE_buggy-opt"))
        .arg(&path)
        .args(["--passes", "buggy<crash-on-vector>"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("vector instructions are broken"));
}

#[test]
/// Test for the driver watchdog on a spinning pipeline
fn driver_watchdog_on_infinite_loop() {
    let path = write_module("spin", &module_with(vec![indirect_call()]));
    let output = Command::new(env!("CARGO_BIN_EXE_buggy-opt"))
        .arg(&path)
        .args(["--watchdog-ms", "300"])
        .env("BUGGY_OPTIONS", "infloop-on-indirect-call")
        .output()
        .unwrap();
    assert_eq!(Some(124), output.status.code());
}

#[test]
/// Test for the driver rejecting bad options without crashing
fn driver_rejects_bad_options() {
    let path = write_module("reject", &module_with(vec![ret_void("f")]));
    let output = Command::new(env!("CARGO_BIN_EXE_buggy-opt"))
        .arg(&path)
        .args(["--passes", "buggy<crash-on-vector;crash-on-nothing>"])
        .output()
        .unwrap();
    assert_eq!(Some(1), output.status.code());
    assert!(String::from_utf8_lossy(&output.stderr).contains("crash-on-nothing"));
}
