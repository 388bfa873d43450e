//! Static CIL opcode tables (ECMA-335 Partition III).
//!
//! [`INSTRUCTIONS`] lists every single-byte opcode and [`INSTRUCTIONS_FE`] every opcode that
//! follows the `0xFE` prefix byte. Both tables are sorted by opcode; reserved opcodes are
//! absent, so a failed lookup means the byte stream is malformed.

use std::{collections::HashMap, sync::OnceLock};

use crate::assembly::instruction::{FlowType, OperandType};

/// Static description of a single CIL opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CilInstruction {
    /// Opcode byte (second byte for `0xFE`-prefixed opcodes)
    pub opcode: u8,
    /// Instruction mnemonic
    pub mnemonic: &'static str,
    /// Operand encoding
    pub op_type: OperandType,
    /// Control flow behaviour
    pub flow: FlowType,
}

const fn op(
    opcode: u8,
    mnemonic: &'static str,
    op_type: OperandType,
    flow: FlowType,
) -> CilInstruction {
    CilInstruction {
        opcode,
        mnemonic,
        op_type,
        flow,
    }
}

use FlowType::{
    Call, ConditionalBranch as Cond, EndFinally, Leave, Return, Sequential as Seq, Switch as Sw,
    Throw, UnconditionalBranch as Br,
};
use OperandType::{
    Float32, Float64, Int32, Int64, Int8, None as No, ShortTarget, Switch, Target, Token, UInt16,
    UInt8,
};

/// Single-byte opcodes.
pub static INSTRUCTIONS: &[CilInstruction] = &[
    op(0x00, "nop", No, Seq),
    op(0x01, "break", No, Seq),
    op(0x02, "ldarg.0", No, Seq),
    op(0x03, "ldarg.1", No, Seq),
    op(0x04, "ldarg.2", No, Seq),
    op(0x05, "ldarg.3", No, Seq),
    op(0x06, "ldloc.0", No, Seq),
    op(0x07, "ldloc.1", No, Seq),
    op(0x08, "ldloc.2", No, Seq),
    op(0x09, "ldloc.3", No, Seq),
    op(0x0A, "stloc.0", No, Seq),
    op(0x0B, "stloc.1", No, Seq),
    op(0x0C, "stloc.2", No, Seq),
    op(0x0D, "stloc.3", No, Seq),
    op(0x0E, "ldarg.s", UInt8, Seq),
    op(0x0F, "ldarga.s", UInt8, Seq),
    op(0x10, "starg.s", UInt8, Seq),
    op(0x11, "ldloc.s", UInt8, Seq),
    op(0x12, "ldloca.s", UInt8, Seq),
    op(0x13, "stloc.s", UInt8, Seq),
    op(0x14, "ldnull", No, Seq),
    op(0x15, "ldc.i4.m1", No, Seq),
    op(0x16, "ldc.i4.0", No, Seq),
    op(0x17, "ldc.i4.1", No, Seq),
    op(0x18, "ldc.i4.2", No, Seq),
    op(0x19, "ldc.i4.3", No, Seq),
    op(0x1A, "ldc.i4.4", No, Seq),
    op(0x1B, "ldc.i4.5", No, Seq),
    op(0x1C, "ldc.i4.6", No, Seq),
    op(0x1D, "ldc.i4.7", No, Seq),
    op(0x1E, "ldc.i4.8", No, Seq),
    op(0x1F, "ldc.i4.s", Int8, Seq),
    op(0x20, "ldc.i4", Int32, Seq),
    op(0x21, "ldc.i8", Int64, Seq),
    op(0x22, "ldc.r4", Float32, Seq),
    op(0x23, "ldc.r8", Float64, Seq),
    op(0x25, "dup", No, Seq),
    op(0x26, "pop", No, Seq),
    op(0x27, "jmp", Token, Call),
    op(0x28, "call", Token, Call),
    op(0x29, "calli", Token, Call),
    op(0x2A, "ret", No, Return),
    op(0x2B, "br.s", ShortTarget, Br),
    op(0x2C, "brfalse.s", ShortTarget, Cond),
    op(0x2D, "brtrue.s", ShortTarget, Cond),
    op(0x2E, "beq.s", ShortTarget, Cond),
    op(0x2F, "bge.s", ShortTarget, Cond),
    op(0x30, "bgt.s", ShortTarget, Cond),
    op(0x31, "ble.s", ShortTarget, Cond),
    op(0x32, "blt.s", ShortTarget, Cond),
    op(0x33, "bne.un.s", ShortTarget, Cond),
    op(0x34, "bge.un.s", ShortTarget, Cond),
    op(0x35, "bgt.un.s", ShortTarget, Cond),
    op(0x36, "ble.un.s", ShortTarget, Cond),
    op(0x37, "blt.un.s", ShortTarget, Cond),
    op(0x38, "br", Target, Br),
    op(0x39, "brfalse", Target, Cond),
    op(0x3A, "brtrue", Target, Cond),
    op(0x3B, "beq", Target, Cond),
    op(0x3C, "bge", Target, Cond),
    op(0x3D, "bgt", Target, Cond),
    op(0x3E, "ble", Target, Cond),
    op(0x3F, "blt", Target, Cond),
    op(0x40, "bne.un", Target, Cond),
    op(0x41, "bge.un", Target, Cond),
    op(0x42, "bgt.un", Target, Cond),
    op(0x43, "ble.un", Target, Cond),
    op(0x44, "blt.un", Target, Cond),
    op(0x45, "switch", Switch, Sw),
    op(0x46, "ldind.i1", No, Seq),
    op(0x47, "ldind.u1", No, Seq),
    op(0x48, "ldind.i2", No, Seq),
    op(0x49, "ldind.u2", No, Seq),
    op(0x4A, "ldind.i4", No, Seq),
    op(0x4B, "ldind.u4", No, Seq),
    op(0x4C, "ldind.i8", No, Seq),
    op(0x4D, "ldind.i", No, Seq),
    op(0x4E, "ldind.r4", No, Seq),
    op(0x4F, "ldind.r8", No, Seq),
    op(0x50, "ldind.ref", No, Seq),
    op(0x51, "stind.ref", No, Seq),
    op(0x52, "stind.i1", No, Seq),
    op(0x53, "stind.i2", No, Seq),
    op(0x54, "stind.i4", No, Seq),
    op(0x55, "stind.i8", No, Seq),
    op(0x56, "stind.r4", No, Seq),
    op(0x57, "stind.r8", No, Seq),
    op(0x58, "add", No, Seq),
    op(0x59, "sub", No, Seq),
    op(0x5A, "mul", No, Seq),
    op(0x5B, "div", No, Seq),
    op(0x5C, "div.un", No, Seq),
    op(0x5D, "rem", No, Seq),
    op(0x5E, "rem.un", No, Seq),
    op(0x5F, "and", No, Seq),
    op(0x60, "or", No, Seq),
    op(0x61, "xor", No, Seq),
    op(0x62, "shl", No, Seq),
    op(0x63, "shr", No, Seq),
    op(0x64, "shr.un", No, Seq),
    op(0x65, "neg", No, Seq),
    op(0x66, "not", No, Seq),
    op(0x67, "conv.i1", No, Seq),
    op(0x68, "conv.i2", No, Seq),
    op(0x69, "conv.i4", No, Seq),
    op(0x6A, "conv.i8", No, Seq),
    op(0x6B, "conv.r4", No, Seq),
    op(0x6C, "conv.r8", No, Seq),
    op(0x6D, "conv.u4", No, Seq),
    op(0x6E, "conv.u8", No, Seq),
    op(0x6F, "callvirt", Token, Call),
    op(0x70, "cpobj", Token, Seq),
    op(0x71, "ldobj", Token, Seq),
    op(0x72, "ldstr", Token, Seq),
    op(0x73, "newobj", Token, Call),
    op(0x74, "castclass", Token, Seq),
    op(0x75, "isinst", Token, Seq),
    op(0x76, "conv.r.un", No, Seq),
    op(0x79, "unbox", Token, Seq),
    op(0x7A, "throw", No, Throw),
    op(0x7B, "ldfld", Token, Seq),
    op(0x7C, "ldflda", Token, Seq),
    op(0x7D, "stfld", Token, Seq),
    op(0x7E, "ldsfld", Token, Seq),
    op(0x7F, "ldsflda", Token, Seq),
    op(0x80, "stsfld", Token, Seq),
    op(0x81, "stobj", Token, Seq),
    op(0x82, "conv.ovf.i1.un", No, Seq),
    op(0x83, "conv.ovf.i2.un", No, Seq),
    op(0x84, "conv.ovf.i4.un", No, Seq),
    op(0x85, "conv.ovf.i8.un", No, Seq),
    op(0x86, "conv.ovf.u1.un", No, Seq),
    op(0x87, "conv.ovf.u2.un", No, Seq),
    op(0x88, "conv.ovf.u4.un", No, Seq),
    op(0x89, "conv.ovf.u8.un", No, Seq),
    op(0x8A, "conv.ovf.i.un", No, Seq),
    op(0x8B, "conv.ovf.u.un", No, Seq),
    op(0x8C, "box", Token, Seq),
    op(0x8D, "newarr", Token, Seq),
    op(0x8E, "ldlen", No, Seq),
    op(0x8F, "ldelema", Token, Seq),
    op(0x90, "ldelem.i1", No, Seq),
    op(0x91, "ldelem.u1", No, Seq),
    op(0x92, "ldelem.i2", No, Seq),
    op(0x93, "ldelem.u2", No, Seq),
    op(0x94, "ldelem.i4", No, Seq),
    op(0x95, "ldelem.u4", No, Seq),
    op(0x96, "ldelem.i8", No, Seq),
    op(0x97, "ldelem.i", No, Seq),
    op(0x98, "ldelem.r4", No, Seq),
    op(0x99, "ldelem.r8", No, Seq),
    op(0x9A, "ldelem.ref", No, Seq),
    op(0x9B, "stelem.i", No, Seq),
    op(0x9C, "stelem.i1", No, Seq),
    op(0x9D, "stelem.i2", No, Seq),
    op(0x9E, "stelem.i4", No, Seq),
    op(0x9F, "stelem.i8", No, Seq),
    op(0xA0, "stelem.r4", No, Seq),
    op(0xA1, "stelem.r8", No, Seq),
    op(0xA2, "stelem.ref", No, Seq),
    op(0xA3, "ldelem", Token, Seq),
    op(0xA4, "stelem", Token, Seq),
    op(0xA5, "unbox.any", Token, Seq),
    op(0xB3, "conv.ovf.i1", No, Seq),
    op(0xB4, "conv.ovf.u1", No, Seq),
    op(0xB5, "conv.ovf.i2", No, Seq),
    op(0xB6, "conv.ovf.u2", No, Seq),
    op(0xB7, "conv.ovf.i4", No, Seq),
    op(0xB8, "conv.ovf.u4", No, Seq),
    op(0xB9, "conv.ovf.i8", No, Seq),
    op(0xBA, "conv.ovf.u8", No, Seq),
    op(0xC2, "refanyval", Token, Seq),
    op(0xC3, "ckfinite", No, Seq),
    op(0xC6, "mkrefany", Token, Seq),
    op(0xD0, "ldtoken", Token, Seq),
    op(0xD1, "conv.u2", No, Seq),
    op(0xD2, "conv.u1", No, Seq),
    op(0xD3, "conv.i", No, Seq),
    op(0xD4, "conv.ovf.i", No, Seq),
    op(0xD5, "conv.ovf.u", No, Seq),
    op(0xD6, "add.ovf", No, Seq),
    op(0xD7, "add.ovf.un", No, Seq),
    op(0xD8, "mul.ovf", No, Seq),
    op(0xD9, "mul.ovf.un", No, Seq),
    op(0xDA, "sub.ovf", No, Seq),
    op(0xDB, "sub.ovf.un", No, Seq),
    op(0xDC, "endfinally", No, EndFinally),
    op(0xDD, "leave", Target, Leave),
    op(0xDE, "leave.s", ShortTarget, Leave),
    op(0xDF, "stind.i", No, Seq),
    op(0xE0, "conv.u", No, Seq),
];

/// Opcodes that follow the `0xFE` prefix byte.
pub static INSTRUCTIONS_FE: &[CilInstruction] = &[
    op(0x00, "arglist", No, Seq),
    op(0x01, "ceq", No, Seq),
    op(0x02, "cgt", No, Seq),
    op(0x03, "cgt.un", No, Seq),
    op(0x04, "clt", No, Seq),
    op(0x05, "clt.un", No, Seq),
    op(0x06, "ldftn", Token, Seq),
    op(0x07, "ldvirtftn", Token, Seq),
    op(0x09, "ldarg", UInt16, Seq),
    op(0x0A, "ldarga", UInt16, Seq),
    op(0x0B, "starg", UInt16, Seq),
    op(0x0C, "ldloc", UInt16, Seq),
    op(0x0D, "ldloca", UInt16, Seq),
    op(0x0E, "stloc", UInt16, Seq),
    op(0x0F, "localloc", No, Seq),
    op(0x11, "endfilter", No, EndFinally),
    op(0x12, "unaligned.", UInt8, Seq),
    op(0x13, "volatile.", No, Seq),
    op(0x14, "tail.", No, Seq),
    op(0x15, "initobj", Token, Seq),
    op(0x16, "constrained.", Token, Seq),
    op(0x17, "cpblk", No, Seq),
    op(0x18, "initblk", No, Seq),
    op(0x19, "no.", UInt8, Seq),
    op(0x1A, "rethrow", No, Throw),
    op(0x1C, "sizeof", Token, Seq),
    op(0x1D, "refanytype", No, Seq),
    op(0x1E, "readonly.", No, Seq),
];

/// Looks up an opcode; `prefix` is `0xFE` for two-byte opcodes and `0` otherwise.
#[must_use]
pub fn lookup(prefix: u8, opcode: u8) -> Option<&'static CilInstruction> {
    let table = match prefix {
        0 => INSTRUCTIONS,
        0xFE => INSTRUCTIONS_FE,
        _ => return None,
    };

    table
        .binary_search_by_key(&opcode, |instr| instr.opcode)
        .ok()
        .map(|index| &table[index])
}

/// Mnemonic to (prefix, opcode, table entry) lookup used by the encoder.
type MnemonicLookup = HashMap<&'static str, (u8, &'static CilInstruction)>;

/// Looks up an opcode by mnemonic, returning its prefix byte and table entry.
pub fn lookup_mnemonic(mnemonic: &str) -> Option<(u8, &'static CilInstruction)> {
    static LOOKUP: OnceLock<MnemonicLookup> = OnceLock::new();

    LOOKUP
        .get_or_init(|| {
            let mut map = HashMap::with_capacity(INSTRUCTIONS.len() + INSTRUCTIONS_FE.len());
            for instr in INSTRUCTIONS {
                map.insert(instr.mnemonic, (0_u8, instr));
            }
            for instr in INSTRUCTIONS_FE {
                map.insert(instr.mnemonic, (0xFE_u8, instr));
            }
            map
        })
        .get(mnemonic)
        .copied()
}
