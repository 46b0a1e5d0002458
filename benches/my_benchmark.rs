use buggy_pass::ir::{CastOp, Constant, InstKind, IntPredicate, Type};
use buggy_pass::prelude::*;
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

/// Straight line function mixing compares, casts and loads
fn synthetic_module(length: usize) -> Module {
    let mut builder = FunctionBuilder::new("synthetic", Type::Void);
    let arg = builder.param(Type::int(64));
    builder.block();
    for index in 0..length {
        let ptr = builder.push(
            Type::Ptr,
            InstKind::Cast {
                cast: CastOp::IntToPtr,
                value: arg.into(),
            },
        );
        builder.push(Type::int(32), InstKind::Load { ptr: ptr.into() });
        builder.push(
            Type::int(1),
            InstKind::ICmp {
                predicate: IntPredicate::Slt,
                lhs: arg.into(),
                rhs: Constant::Int {
                    ty: Type::int(64),
                    value: index as i64,
                }
                .into(),
            },
        );
    }
    builder.push(Type::Void, InstKind::Ret { value: None });
    let mut module = Module::new("bench");
    module.functions.push(builder.build());
    module
}

fn criterion_benchmark(c: &mut Criterion) {
    let module = synthetic_module(10_000);
    // Armed but never matching except for the miscompile
    let pass = BuggyPass::new(
        BuggyOptions::parse(
            "miscompile-icmp-slt-to-sle;crash-on-vector;crash-on-i1-select;crash-on-shufflevector",
        )
        .unwrap(),
    );

    let mut group = c.benchmark_group("buggy_pass");
    group.warm_up_time(std::time::Duration::from_secs(1));
    group.sample_size(20);
    group.bench_function("traverse 30k instructions", |b| {
        b.iter_batched(
            || module.clone(),
            |mut module| pass.run(&mut module, &ProcessAbort),
            BatchSize::LargeInput,
        )
    });
    group.bench_function("parse options", |b| {
        let all = BuggyOptions::names().collect::<Vec<_>>().join(";");
        b.iter(|| BuggyOptions::parse(&all).unwrap())
    });
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
