//! Performance benchmarks for the analysis pipeline.
//!
//! Programs are generated with the syntax tree builder, so every benchmark
//! measures the four passes only:
//! - Size-based: the same function shape repeated 10 to 1000 times
//! - Feature-specific: classes with initializers, nested control flow
//!
//! ## Profiling with Puffin
//!
//! Run with the `profile-with-puffin` feature to collect per-pass timings:
//!
//! ```bash
//! cargo bench --features profile-with-puffin -- --profile-time 5
//! ```

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use pure::AnalysisConfig;
use pure::ast::{BinaryOp, Builder, FunctionDef, Program, TypeDef};
use std::hint::black_box;

#[cfg(feature = "profile-with-puffin")]
static FRAME_VIEW: std::sync::OnceLock<puffin::GlobalFrameView> = std::sync::OnceLock::new();

#[cfg(feature = "profile-with-puffin")]
fn setup_profiler() {
    puffin::set_scopes_on(true);
    FRAME_VIEW.get_or_init(puffin::GlobalFrameView::default);
}

#[cfg(not(feature = "profile-with-puffin"))]
fn setup_profiler() {}

#[cfg(feature = "profile-with-puffin")]
fn end_profiling_frame() {
    puffin::GlobalProfiler::lock().new_frame();
}

#[cfg(not(feature = "profile-with-puffin"))]
fn end_profiling_frame() {}

// ============================================================================
// Program generators
// ============================================================================

/// `count(c: Bool, n: Int): Int` with a loop, a branch and a compound
/// assignment, named by index.
fn counting_function(b: &Builder, index: usize) -> FunctionDef {
    let line = (index as u32) * 10 + 1;
    let step = b.if_expr(
        b.var("c"),
        b.block(vec![b.at(line + 3).expr_stmt(b.assign(
            b.var("a"),
            b.binary(BinaryOp::Add, b.var("a"), b.int(1)),
        ))]),
        Some(b.block(vec![
            b.at(line + 5).expr_stmt(b.compound_assign(BinaryOp::Add, b.var("a"), b.int(2))),
        ])),
    );
    let body = b.block(vec![
        b.at(line + 1).var_decl("a", None, Some(b.int(0))),
        b.loop_stmt(
            line + 2,
            Some(b.while_generator(b.binary(BinaryOp::Less, b.var("a"), b.var("n")))),
            b.block(vec![b.at(line + 3).expr_stmt(step)]),
        ),
        b.at(line + 7).return_stmt(Some(b.var("a"))),
    ]);
    b.function(line, &format!("count{}", index))
        .with_parameter(b.param(line, "c", b.ty("Bool")))
        .with_parameter(b.param(line, "n", b.ty("Int")))
        .with_return(b.ty("Int"))
        .with_body(body)
}

/// A class with two stored properties, a property-parameter initializer
/// and a method reading both.
fn point_class(b: &Builder, index: usize) -> TypeDef {
    let line = (index as u32) * 10 + 1;
    let method = b
        .function(line + 4, "sum")
        .with_return(b.ty("Int"))
        .with_body(b.block(vec![b.at(line + 5).return_stmt(Some(b.binary(
            BinaryOp::Add,
            b.var("x"),
            b.var("y"),
        )))]));
    b.class(line, &format!("Point{}", index))
        .with_member(b.property(line + 1, "x", Some(b.ty("Int")), None))
        .with_member(b.property(line + 2, "y", Some(b.ty("Int")), Some(b.int(0))))
        .with_member(
            b.initializer(line + 3)
                .with_parameter(b.property_param(line + 3, "x")),
        )
        .with_member(method)
}

fn functions_program(count: usize) -> Program {
    let b = Builder::new();
    let mut file = b.file("Main", b.block(Vec::new()));
    for index in 0..count {
        file = file.with_function(counting_function(&b, index));
    }
    Program::new(vec![file])
}

fn classes_program(count: usize) -> Program {
    let b = Builder::new();
    let mut file = b.file("Main", b.block(Vec::new()));
    for index in 0..count {
        file = file.with_type(point_class(&b, index));
    }
    Program::new(vec![file])
}

/// Loops nested `depth` levels deep, each guarding a handle block.
fn nested_program(depth: usize) -> Program {
    let b = Builder::new();
    let mut body = b.block(vec![b.expr_stmt(b.increment(b.var("a")))]);
    for level in (0..depth).rev() {
        let line = level as u32 + 2;
        let handler = b.handler(line, b.ty("Error"), None, b.block(vec![b.break_stmt()]));
        body = b.block(vec![
            b.handle(line, body, vec![handler], None),
            b.expr_stmt(b.if_expr(b.var("c"), b.block(vec![b.next_stmt()]), None)),
        ]);
        body = b.block(vec![b.loop_stmt(line, None, body)]);
    }
    let function = b
        .function(1, "nested")
        .with_parameter(b.param(1, "c", b.ty("Bool")))
        .with_body(b.block(vec![b.at(1).var_decl("a", None, Some(b.int(0))), b.loop_stmt(1, None, body)]));
    Program::new(vec![b.file("Main", b.block(Vec::new())).with_function(function)])
}

// ============================================================================
// Benchmarks
// ============================================================================

fn size_based_benchmarks(c: &mut Criterion) {
    setup_profiler();
    let config = AnalysisConfig::default();
    let mut group = c.benchmark_group("analysis/functions");

    for count in [10, 100, 1000] {
        let program = functions_program(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_function(format!("{}_functions", count), |bencher| {
            bencher.iter(|| {
                let result = pure::analyse(black_box(&program), &config).unwrap();
                end_profiling_frame();
                black_box(result.diagnostics.len())
            });
        });
    }

    group.finish();
}

fn feature_specific_benchmarks(c: &mut Criterion) {
    let config = AnalysisConfig::default();
    let mut group = c.benchmark_group("analysis/features");

    let classes = classes_program(100);
    group.throughput(Throughput::Elements(100));
    group.bench_function("classes_100", |bencher| {
        bencher.iter(|| {
            let result = pure::analyse(black_box(&classes), &config).unwrap();
            black_box(result.flow.initializer_checks.len())
        });
    });

    let nested = nested_program(8);
    group.bench_function("nested_loops_8", |bencher| {
        bencher.iter(|| {
            let result = pure::analyse(black_box(&nested), &config).unwrap();
            black_box(result.flow.trackers.len())
        });
    });

    let lowering = functions_program(100);
    group.bench_function("lowering_100_functions", |bencher| {
        let result = pure::analyse(&lowering, &config).unwrap();
        bencher.iter(|| black_box(pure::lower_program(black_box(&lowering), &result).callables.len()));
    });

    group.finish();
}

criterion_group!(benches, size_based_benchmarks, feature_specific_benchmarks);
criterion_main!(benches);
