use criterion::{Criterion, black_box, criterion_group, criterion_main};
use golly::{Environment, FrameId, Number, Value, init_builtins, parse_top_level_form};
use golly_runtime::Interpreter;

// ============================================================================
// Environment Benchmarks
// ============================================================================

fn bench_define_globals(c: &mut Criterion) {
    let system = init_builtins();
    c.bench_function("define 1000 globals", |b| {
        b.iter(|| {
            let mut env = Environment::new(system.clone());
            for i in 0..1000 {
                env.define_global(&format!("var{i}"), Value::number(Number::Int(i)));
            }
            black_box(env)
        })
    });
}

fn bench_deep_lookup(c: &mut Criterion) {
    let mut env = Environment::new(init_builtins());
    env.define_global("target", Value::number(Number::Int(1)));
    let mut frame = FrameId::ROOT;
    for _ in 0..100 {
        frame = env.push_frame(frame);
    }

    c.bench_function("lookup through 100 frames", |b| {
        b.iter(|| black_box(env.lookup(frame, "target")))
    });
    c.bench_function("lookup builtin from 100 frames", |b| {
        b.iter(|| black_box(env.lookup(frame, "+")))
    });
}

// ============================================================================
// Evaluation Benchmarks
// ============================================================================

fn bench_parse_and_evaluate(c: &mut Criterion) {
    let source = "(let ((a : int32 10) (b : int32 32)) (+ (* a 2) (- b a)))";
    c.bench_function("parse binding form", |b| {
        b.iter(|| black_box(parse_top_level_form(source).unwrap()))
    });

    let form = parse_top_level_form(source).unwrap();
    let mut interp = Interpreter::new();
    c.bench_function("evaluate binding form", |b| {
        b.iter(|| black_box(interp.evaluate(&form).unwrap()))
    });
}

fn bench_deep_nesting(c: &mut Criterion) {
    let mut expr = String::from("1");
    for _ in 0..100 {
        expr = format!("(+ {expr} 1)");
    }
    let form = parse_top_level_form(&expr).unwrap();
    let mut interp = Interpreter::new();

    c.bench_function("evaluate deep nesting (100 levels)", |b| {
        b.iter(|| black_box(interp.evaluate(&form).unwrap()))
    });
}

criterion_group!(
    benches,
    bench_define_globals,
    bench_deep_lookup,
    bench_parse_and_evaluate,
    bench_deep_nesting
);
criterion_main!(benches);
