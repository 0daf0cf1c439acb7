//! Benchmarks for the rewrite path.
//!
//! - Method body decoding with token resolution
//! - Layout with branch widening
//! - Type matching against the live host API
//! - A full facade redirect through the standard rules

extern crate cilcompat;

use std::{hint::black_box, sync::Arc};

use cilcompat::{
    assembly::{Immediate, Instruction, OpCode, Operand},
    facades::FacadeRegistry,
    host::{
        world::{game_api, world_date_type},
        HostType,
    },
    metadata::{method::MethodBody, scope::ReferenceScope},
    rewriter::{RewriteConfig, Rewriter},
    symbols::{matcher::is_same_type, MethodRef, Symbol, TypeRef},
};
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

/// A forward `br.s` over 124 `nop`s, one byte short of needing the long form.
fn branch_at_limit() -> MethodBody {
    let mut instructions = vec![Instruction::new(OpCode::BR_S, Operand::Target(125)).unwrap()];
    instructions.extend((0..124).map(|_| Instruction::simple(OpCode::NOP).unwrap()));
    instructions.push(Instruction::simple(OpCode::RET).unwrap());
    MethodBody::new(instructions)
}

/// Benchmark decoding a tiny body that calls through a method token.
fn bench_decode_tiny(c: &mut Criterion) {
    let scope = ReferenceScope::new();
    let ctor = MethodRef::constructor(world_date_type().to_type_ref(), vec![]);
    let token = scope.intern(&Symbol::Method(ctor)).value().to_le_bytes();
    let data = [0x1E, 0x73, token[0], token[1], token[2], token[3], 0x26, 0x2A];

    c.bench_function("decode_tiny_body", |b| {
        b.iter(|| {
            let body = MethodBody::decode(black_box(&data), &scope).unwrap();
            black_box(body)
        });
    });
}

/// Benchmark relaying out a body whose only branch must be widened.
fn bench_layout_widening(c: &mut Criterion) {
    let mut body = branch_at_limit();
    body.insert(1, Instruction::new(OpCode::LDC_I4, Operand::Immediate(Immediate::Int32(7))).unwrap())
        .unwrap();

    c.bench_function("layout_widening", |b| {
        b.iter_batched(
            || body.clone(),
            |mut body| {
                let stats = body.layout().unwrap();
                black_box(stats)
            },
            BatchSize::SmallInput,
        );
    });
}

/// Benchmark structural type matching of a generic reference.
fn bench_match_generic_type(c: &mut Criterion) {
    let definition = HostType::generic("System.Collections.Generic", "List`1", vec![world_date_type()]);
    let reference = TypeRef::generic("System.Collections.Generic", "List`1", vec![world_date_type().to_type_ref()]);

    c.bench_function("match_generic_type", |b| {
        b.iter(|| black_box(is_same_type(black_box(&definition), black_box(&reference))));
    });
}

/// Benchmark the standard rules redirecting a legacy constructor and property read.
fn bench_rewrite_facade_redirect(c: &mut Criterion) {
    let rewriter = Rewriter::new(
        Arc::new(game_api()),
        Arc::new(FacadeRegistry::with_builtin()),
        RewriteConfig::sequential(),
    )
    .with_standard_rules();
    let date = world_date_type().to_type_ref();
    let body = MethodBody::new(vec![
        Instruction::new(OpCode::NEWOBJ, Operand::Method(MethodRef::constructor(date.clone(), vec![]))).unwrap(),
        Instruction::new(
            OpCode::CALLVIRT,
            Operand::Method(MethodRef::new(date, "get_Season", TypeRef::string(), vec![]).instance()),
        )
        .unwrap(),
        Instruction::simple(OpCode::POP).unwrap(),
        Instruction::simple(OpCode::RET).unwrap(),
    ]);

    c.bench_function("rewrite_facade_redirect", |b| {
        b.iter_batched(
            || body.clone(),
            |mut body| {
                let report = rewriter.rewrite_body("Bench::Run", &mut body).unwrap();
                black_box(report)
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    bench_decode_tiny,
    bench_layout_widening,
    bench_match_generic_type,
    bench_rewrite_facade_redirect,
);
criterion_main!(benches);
