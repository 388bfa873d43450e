//! CIL instruction decoding.
//!
//! Decoding is linear: [`decode_stream`] reads one instruction after the other until the code
//! is exhausted. Branch displacements are converted to absolute code offsets on the way, so the
//! resulting [`Instruction`] values do not depend on their neighbours.
//!
//! # Examples
//!
//! ```rust
//! use dotswap::{Parser, assembly::{decode_instruction, decode_stream, Operand}};
//!
//! let code = [0x2B, 0x01, 0x00, 0x2A]; // br.s +1, nop, ret
//! let mut parser = Parser::new(&code);
//! let branch = decode_instruction(&mut parser)?;
//! assert_eq!(branch.mnemonic, "br.s");
//! assert_eq!(branch.operand, Operand::Target(3));
//!
//! let mut parser = Parser::new(&code);
//! assert_eq!(decode_stream(&mut parser)?.len(), 3);
//! # Ok::<(), dotswap::Error>(())
//! ```

use crate::{
    assembly::{
        instruction::{Immediate, Instruction, Operand, OperandType},
        instructions::lookup,
    },
    file::parser::Parser,
    metadata::token::Token,
    Result,
};

/// Decodes a single instruction at the current parser position.
///
/// The instruction offset is the parser position, so the parser should be positioned relative
/// to the start of the method code.
///
/// # Errors
///
/// Returns [`crate::Error::Malformed`] for reserved opcodes or branch targets before the start
/// of the code, and [`crate::Error::OutOfBounds`] for truncated operands.
pub fn decode_instruction(parser: &mut Parser) -> Result<Instruction> {
    let offset = parser.pos() as u64;
    let first_byte = parser.read_le::<u8>()?;

    let (cil_instruction, prefix, opcode) = match first_byte {
        0xFE => {
            let second_byte = parser.read_le::<u8>()?;

            match lookup(0xFE, second_byte) {
                Some(instr) => (instr, 0xFE, second_byte),
                None => return Err(malformed_error!("Invalid opcode: FE {:02X}", second_byte)),
            }
        }
        _ => match lookup(0, first_byte) {
            Some(instr) => (instr, 0, first_byte),
            None => return Err(malformed_error!("Invalid opcode: {:02X}", first_byte)),
        },
    };

    let operand = match cil_instruction.op_type {
        OperandType::None => Operand::None,
        OperandType::Int8 => Operand::Immediate(Immediate::Int8(parser.read_le::<i8>()?)),
        OperandType::UInt8 => Operand::Immediate(Immediate::UInt8(parser.read_le::<u8>()?)),
        OperandType::UInt16 => Operand::Immediate(Immediate::UInt16(parser.read_le::<u16>()?)),
        OperandType::Int32 => Operand::Immediate(Immediate::Int32(parser.read_le::<i32>()?)),
        OperandType::Int64 => Operand::Immediate(Immediate::Int64(parser.read_le::<i64>()?)),
        OperandType::Float32 => Operand::Immediate(Immediate::Float32(parser.read_le::<f32>()?)),
        OperandType::Float64 => Operand::Immediate(Immediate::Float64(parser.read_le::<f64>()?)),
        OperandType::Token => Operand::Token(Token::new(parser.read_le::<u32>()?)),
        OperandType::ShortTarget => {
            let displacement = i64::from(parser.read_le::<i8>()?);
            Operand::Target(branch_target(parser.pos(), displacement)?)
        }
        OperandType::Target => {
            let displacement = i64::from(parser.read_le::<i32>()?);
            Operand::Target(branch_target(parser.pos(), displacement)?)
        }
        OperandType::Switch => {
            let case_count = parser.read_le::<u32>()? as usize;
            if case_count.saturating_mul(4) > parser.remaining().len() {
                return Err(crate::Error::OutOfBounds);
            }

            let mut displacements = Vec::with_capacity(case_count);
            for _ in 0..case_count {
                displacements.push(i64::from(parser.read_le::<i32>()?));
            }

            // Switch displacements are relative to the end of the whole instruction
            let next = parser.pos();
            let targets = displacements
                .into_iter()
                .map(|displacement| branch_target(next, displacement))
                .collect::<Result<Vec<_>>>()?;

            Operand::Switch(targets)
        }
    };

    Ok(Instruction {
        offset,
        size: parser.pos() as u64 - offset,
        opcode,
        prefix,
        mnemonic: cil_instruction.mnemonic,
        flow_type: cil_instruction.flow,
        operand,
    })
}

/// Decodes instructions from the current parser position until the data is exhausted.
///
/// # Errors
///
/// Returns the first error [`decode_instruction`] reports.
pub fn decode_stream(parser: &mut Parser) -> Result<Vec<Instruction>> {
    let mut instructions = Vec::new();
    while parser.has_more_data() {
        instructions.push(decode_instruction(parser)?);
    }

    Ok(instructions)
}

fn branch_target(next: usize, displacement: i64) -> Result<u64> {
    let target = next as i64 + displacement;
    u64::try_from(target).map_err(|_| {
        malformed_error!(
            "Branch target {} lies before the start of the method code",
            target
        )
    })
}
