//! Benchmarks for the per-function work of a hot swap pass.
//!
//! A pass touches every opted-in method of every registered module, so the cost that scales is:
//! - Decoding a method body from its raw bytes
//! - Producing the canonical encoding used for change detection
//! - Re-encoding an instruction stream after operands were rewritten
//! - Grouping exception clauses into regions

extern crate dotswap;

use criterion::{criterion_group, criterion_main, Criterion};
use dotswap::{
    assembly::{decode_stream, encode_body, encode_instructions, InstructionEncoder, Operand},
    hotswap::build_regions,
    metadata::{method::MethodBody, token::Token},
    runtime::{LiveSymbol, TypeHandle},
    Parser,
};
use std::hint::black_box;

/// A fat body with a loop, field accesses and calls, roughly the size of a game tick handler.
fn tick_handler() -> Vec<u8> {
    let mut encoder = InstructionEncoder::new();
    for round in 0..32_u32 {
        encoder
            .emit_instruction("ldsfld", Operand::Token(Token::new(0x0400_0001 + round)))
            .unwrap();
        encoder.emit_instruction("ldc.i4.1", Operand::None).unwrap();
        encoder.emit_instruction("add", Operand::None).unwrap();
        encoder
            .emit_instruction("stsfld", Operand::Token(Token::new(0x0400_0001 + round)))
            .unwrap();
        encoder
            .emit_instruction("call", Operand::Token(Token::new(0x0A00_0001 + round)))
            .unwrap();
    }
    let loop_end = encoder.position() + 2;
    encoder
        .emit_instruction("br.s", Operand::Target(loop_end))
        .unwrap();
    encoder.emit_instruction("ret", Operand::None).unwrap();
    let code = encoder.finalize();

    let mut body = Vec::new();
    // FAT_FORMAT | INIT_LOCALS, header size 3 dwords
    body.extend_from_slice(&0x3013_u16.to_le_bytes());
    body.extend_from_slice(&8_u16.to_le_bytes());
    body.extend_from_slice(&(code.len() as u32).to_le_bytes());
    body.extend_from_slice(&0x1100_0001_u32.to_le_bytes());
    body.extend_from_slice(&code);
    body
}

/// Small EH section with `count` catch clauses sharing four protected blocks.
fn guarded_body(count: u8) -> Vec<u8> {
    let code = [0x00_u8; 64];
    let mut body = Vec::new();
    // FAT_FORMAT | MORE_SECTS, header size 3 dwords
    body.extend_from_slice(&0x300B_u16.to_le_bytes());
    body.extend_from_slice(&2_u16.to_le_bytes());
    body.extend_from_slice(&(code.len() as u32).to_le_bytes());
    body.extend_from_slice(&0_u32.to_le_bytes());
    body.extend_from_slice(&code);

    body.extend_from_slice(&[0x01, 4 + count * 12, 0x00, 0x00]);
    for clause in 0..count {
        let try_start = u16::from(clause % 4) * 8;
        body.extend_from_slice(&0_u16.to_le_bytes());
        body.extend_from_slice(&try_start.to_le_bytes());
        body.push(8);
        body.extend_from_slice(&(32 + u16::from(clause)).to_le_bytes());
        body.push(1);
        body.extend_from_slice(&(0x0100_0001 + u32::from(clause)).to_le_bytes());
    }
    body
}

/// Benchmark decoding a fat method body.
fn bench_decode_body(c: &mut Criterion) {
    let data = tick_handler();

    c.bench_function("hotswap_decode_body", |b| {
        b.iter(|| {
            let body = MethodBody::from(black_box(&data)).unwrap();
            black_box(body)
        });
    });
}

/// Benchmark the change detection of an unchanged function.
fn bench_change_detection(c: &mut Criterion) {
    let disk = MethodBody::from(&tick_handler()).unwrap();
    let baseline = encode_body(&disk).unwrap();

    c.bench_function("hotswap_change_detection", |b| {
        b.iter(|| {
            let current = encode_body(black_box(&disk)).unwrap();
            black_box(current == baseline)
        });
    });
}

/// Benchmark decoding and re-encoding a bare instruction stream.
fn bench_stream_roundtrip(c: &mut Criterion) {
    let data = tick_handler();
    let code = &data[12..];

    c.bench_function("hotswap_stream_roundtrip", |b| {
        b.iter(|| {
            let instructions = decode_stream(&mut Parser::new(black_box(code))).unwrap();
            black_box(encode_instructions(&instructions).unwrap())
        });
    });
}

/// Benchmark grouping 16 clauses over 4 protected blocks.
fn bench_build_regions(c: &mut Criterion) {
    let body = MethodBody::from(&guarded_body(16)).unwrap();

    c.bench_function("hotswap_build_regions", |b| {
        b.iter(|| {
            let regions = build_regions(black_box(&body.exception_handlers), |token| {
                Ok(LiveSymbol::Type(TypeHandle(u64::from(token.row()))))
            })
            .unwrap();
            black_box(regions)
        });
    });
}

criterion_group!(
    benches,
    bench_decode_body,
    bench_change_detection,
    bench_stream_roundtrip,
    bench_build_regions
);
criterion_main!(benches);
