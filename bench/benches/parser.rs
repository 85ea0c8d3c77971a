use criterion::{criterion_group, criterion_main, Criterion};
use fur::{lexer, parser::parse_program, token::Token};
use std::hint::black_box;

static INPUT: &str = include_str!("../../demos/big.fur");

fn parser(tokens: &[Token]) {
    let program = parse_program(tokens).unwrap();
    _ = black_box(program);
}

fn criterion_benchmark(c: &mut Criterion) {
    let tokens = lexer::lex_in_new(INPUT).unwrap();

    c.bench_function("parser", |b| {
        b.iter(|| parser(black_box(&tokens)));
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
