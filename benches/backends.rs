mod common;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use whilec::backend::{Backend, backends};
use whilec::bytecode::compile;
use whilec::jasmin::render;

fn bench_backends(c: &mut Criterion) {
    for (label, path, stdin) in common::workloads() {
        let program = common::load_program(&path);

        for backend in backends() {
            let prepared = backend.prepare(&program).expect("prepare");
            c.bench_function(&format!("backend_{}_{label}", backend.name()), |b| {
                b.iter(|| {
                    let output = prepared.run_with_input(black_box(&stdin)).expect("run");
                    black_box(output);
                })
            });
        }

        c.bench_function(&format!("codegen_jasmin_{label}"), |b| {
            b.iter(|| {
                let compiled = compile(black_box(&program)).expect("compile");
                black_box(render(&compiled, "Bench"));
            })
        });
    }
}

criterion_group!(benches, bench_backends);
criterion_main!(benches);
