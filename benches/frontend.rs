mod common;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use whilec::rexp::{Rexp, derivatives, simplify};
use whilec::{lexer, parser};

fn bench_frontend(c: &mut Criterion) {
    for (label, path, _) in common::workloads() {
        let source = common::load_source(&path);
        let tokens = lexer::tokenize(&source).expect("tokenize");

        c.bench_function(&format!("frontend_tokenize_{label}"), |b| {
            b.iter(|| {
                let out = lexer::tokenize(black_box(&source)).expect("tokenize");
                black_box(out);
            })
        });

        c.bench_function(&format!("frontend_parse_only_{label}"), |b| {
            b.iter(|| {
                let out = parser::parse_tokens(black_box(&tokens)).expect("parse");
                black_box(out);
            })
        });

        c.bench_function(&format!("frontend_tokenize_parse_{label}"), |b| {
            b.iter(|| {
                let out = whilec::parse(black_box(&source)).expect("parse");
                black_box(out);
            })
        });
    }
}

fn bench_derivatives(c: &mut Criterion) {
    // (a?){n} a{n} against a^n
    let n = 12;
    let pattern = Rexp::seq(
        Rexp::ntimes(Rexp::opt(Rexp::literal("a")), n),
        Rexp::ntimes(Rexp::literal("a"), n),
    );
    let input = "a".repeat(n);

    c.bench_function("rexp_derivatives_evil", |b| {
        b.iter(|| {
            let out = derivatives(black_box(&input), black_box(&pattern));
            black_box(out);
        })
    });

    c.bench_function("rexp_simplify_evil", |b| {
        let derived = derivatives(&input[..n / 2], &pattern);
        b.iter(|| {
            let out = simplify(black_box(&derived));
            black_box(out.pattern);
        })
    });
}

criterion_group!(benches, bench_frontend, bench_derivatives);
criterion_main!(benches);
