//! CIL instruction encoding.
//!
//! The encoder is the reverse of [`crate::assembly::decode_stream`] and shares its opcode
//! tables. Branch targets are absolute offsets in [`Operand::Target`] and
//! [`Operand::Switch`], so the encoder derives the displacement from the position of the
//! instruction being written. An instruction stream decoded from a body therefore encodes back
//! to the exact same bytes.
//!
//! # Canonical body encoding
//!
//! Change detection compares bodies through [`encode_body`]: a fat header carrying max stack, code
//! size, the local variable signature token and the init-locals flag, followed by the code and a
//! fat exception section when the body has clauses. Token operands are written as the module-local
//! values found in the stream. Two bodies from the same build therefore encode identically whenever
//! they reference the same symbols, before any of them is resolved against the running process.
//!
//! # Examples
//!
//! ```rust
//! use dotswap::assembly::{InstructionEncoder, Immediate, Operand};
//!
//! let mut encoder = InstructionEncoder::new();
//! encoder.emit_instruction("ldc.i4.s", Operand::Immediate(Immediate::Int8(42)))?;
//! encoder.emit_instruction("br.s", Operand::Target(5))?;
//! encoder.emit_instruction("nop", Operand::None)?;
//! encoder.emit_instruction("ret", Operand::None)?;
//!
//! assert_eq!(encoder.finalize(), vec![0x1F, 0x2A, 0x2B, 0x01, 0x00, 0x2A]);
//! # Ok::<(), dotswap::Error>(())
//! ```

use crate::{
    assembly::{
        instruction::{Immediate, Instruction, Operand, OperandType},
        instructions::{lookup, lookup_mnemonic, CilInstruction},
    },
    metadata::method::{
        write_exception_section, write_fat_header, ExceptionHandler, MethodBody,
    },
    Result,
};

/// Core CIL instruction encoder.
///
/// Instructions are appended in order; [`InstructionEncoder::position`] is the code offset the
/// next instruction will be written at.
#[derive(Debug, Default)]
pub struct InstructionEncoder {
    bytecode: Vec<u8>,
}

impl InstructionEncoder {
    /// Creates an empty encoder.
    #[must_use]
    pub fn new() -> Self {
        InstructionEncoder::default()
    }

    /// Returns the offset of the next instruction.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.bytecode.len() as u64
    }

    /// Appends an instruction by mnemonic and returns its offset.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] for an unknown mnemonic, an operand that does not
    /// fit the opcode or a short branch whose target is out of range.
    pub fn emit_instruction(&mut self, mnemonic: &str, operand: Operand) -> Result<u64> {
        let Some((prefix, cil_instruction)) = lookup_mnemonic(mnemonic) else {
            return Err(malformed_error!("Unknown instruction mnemonic - {}", mnemonic));
        };

        let offset = self.position();
        self.emit_raw(prefix, cil_instruction, &operand)?;
        Ok(offset)
    }

    /// Appends a decoded instruction.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the instruction's recorded offset differs from
    /// the encoder position, or for the reasons listed on
    /// [`InstructionEncoder::emit_instruction`].
    pub fn emit(&mut self, instruction: &Instruction) -> Result<()> {
        if instruction.offset != self.position() {
            return Err(malformed_error!(
                "Instruction {} recorded at 0x{:X} but laid out at 0x{:X}",
                instruction.mnemonic,
                instruction.offset,
                self.position()
            ));
        }

        let Some(cil_instruction) = lookup(instruction.prefix, instruction.opcode) else {
            return Err(malformed_error!(
                "Invalid opcode: {:02X} {:02X}",
                instruction.prefix,
                instruction.opcode
            ));
        };

        self.emit_raw(instruction.prefix, cil_instruction, &instruction.operand)?;

        let written = self.position() - instruction.offset;
        if written != instruction.size {
            return Err(malformed_error!(
                "Instruction {} at 0x{:X} has size {} but encodes to {} bytes",
                instruction.mnemonic,
                instruction.offset,
                instruction.size,
                written
            ));
        }

        Ok(())
    }

    /// Consumes the encoder and returns the bytecode.
    #[must_use]
    pub fn finalize(self) -> Vec<u8> {
        self.bytecode
    }

    fn emit_raw(&mut self, prefix: u8, cil: &CilInstruction, operand: &Operand) -> Result<()> {
        let start = self.position();
        let opcode_len: u64 = if prefix == 0 { 1 } else { 2 };

        if prefix != 0 {
            self.bytecode.push(prefix);
        }
        self.bytecode.push(cil.opcode);

        let result = self.write_operand(start, opcode_len, cil, operand);
        if result.is_err() {
            // Leave the encoder as it was before this instruction
            self.bytecode.truncate(start as usize);
        }
        result
    }

    fn write_operand(
        &mut self,
        start: u64,
        opcode_len: u64,
        cil: &CilInstruction,
        operand: &Operand,
    ) -> Result<()> {
        match (cil.op_type, operand) {
            (OperandType::None, Operand::None) => {}
            (OperandType::Int8, Operand::Immediate(Immediate::Int8(value))) => {
                self.bytecode.extend_from_slice(&value.to_le_bytes());
            }
            (OperandType::UInt8, Operand::Immediate(Immediate::UInt8(value))) => {
                self.bytecode.push(*value);
            }
            (OperandType::UInt16, Operand::Immediate(Immediate::UInt16(value))) => {
                self.bytecode.extend_from_slice(&value.to_le_bytes());
            }
            (OperandType::Int32, Operand::Immediate(Immediate::Int32(value))) => {
                self.bytecode.extend_from_slice(&value.to_le_bytes());
            }
            (OperandType::Int64, Operand::Immediate(Immediate::Int64(value))) => {
                self.bytecode.extend_from_slice(&value.to_le_bytes());
            }
            (OperandType::Float32, Operand::Immediate(Immediate::Float32(value))) => {
                self.bytecode.extend_from_slice(&value.to_le_bytes());
            }
            (OperandType::Float64, Operand::Immediate(Immediate::Float64(value))) => {
                self.bytecode.extend_from_slice(&value.to_le_bytes());
            }
            (OperandType::Token, Operand::Token(token)) => {
                self.bytecode.extend_from_slice(&token.value().to_le_bytes());
            }
            (OperandType::ShortTarget, Operand::Target(target)) => {
                let displacement = displacement(start + opcode_len + 1, *target);
                let Ok(short) = i8::try_from(displacement) else {
                    return Err(malformed_error!(
                        "Branch from 0x{:X} to 0x{:X} does not fit a short branch",
                        start,
                        target
                    ));
                };
                self.bytecode.extend_from_slice(&short.to_le_bytes());
            }
            (OperandType::Target, Operand::Target(target)) => {
                let displacement = displacement(start + opcode_len + 4, *target);
                let Ok(long) = i32::try_from(displacement) else {
                    return Err(malformed_error!(
                        "Branch from 0x{:X} to 0x{:X} is out of range",
                        start,
                        target
                    ));
                };
                self.bytecode.extend_from_slice(&long.to_le_bytes());
            }
            (OperandType::Switch, Operand::Switch(targets)) => {
                let Ok(count) = u32::try_from(targets.len()) else {
                    return Err(malformed_error!("Switch with {} targets", targets.len()));
                };
                let next = start + opcode_len + 4 + 4 * u64::from(count);

                self.bytecode.extend_from_slice(&count.to_le_bytes());
                for target in targets {
                    let Ok(value) = i32::try_from(displacement(next, *target)) else {
                        return Err(malformed_error!(
                            "Switch target 0x{:X} is out of range",
                            target
                        ));
                    };
                    self.bytecode.extend_from_slice(&value.to_le_bytes());
                }
            }
            (op_type, operand) => {
                return Err(malformed_error!(
                    "Operand {:?} does not match operand type {:?} of {}",
                    operand,
                    op_type,
                    cil.mnemonic
                ));
            }
        }

        Ok(())
    }
}

fn displacement(next: u64, target: u64) -> i64 {
    target as i64 - next as i64
}

/// Encodes an instruction stream.
///
/// Every instruction has to sit at the offset it records, i.e. the stream must be laid out
/// without gaps starting at offset 0.
///
/// # Errors
///
/// Returns [`crate::Error::Malformed`] if the layout is inconsistent or an instruction cannot
/// be encoded.
pub fn encode_instructions(instructions: &[Instruction]) -> Result<Vec<u8>> {
    let mut encoder = InstructionEncoder::new();
    for instruction in instructions {
        encoder.emit(instruction)?;
    }

    Ok(encoder.finalize())
}

/// Encodes a method body into its canonical byte form: fat header, the code and, when the
/// body has exception clauses, one fat exception handling section.
///
/// Clauses are written in their declared order with the module-local class tokens, so a
/// changed catch type, filter offset or handler boundary changes the encoding. Locals take part
/// only through the `StandAloneSig` token: a rebuild that retypes a local but keeps the token
/// and the code encodes the same.
///
/// # Errors
///
/// Returns [`crate::Error::Malformed`] if the instruction stream cannot be encoded, its size
/// disagrees with the body's code size, or the max stack depth does not fit a fat header.
pub fn encode_body(body: &MethodBody) -> Result<Vec<u8>> {
    let code = encode_instructions(&body.instructions)?;
    if code.len() != body.size_code {
        return Err(malformed_error!(
            "Method body declares {} bytes of code but its instructions encode to {}",
            body.size_code,
            code.len()
        ));
    }

    canonical_body(
        body.max_stack,
        &code,
        body.local_var_sig_token,
        body.is_init_local,
        &body.exception_handlers,
    )
}

/// Builds the canonical form from raw parts; shared by disk and live bodies.
///
/// # Errors
///
/// Returns [`crate::Error::Malformed`] if max stack or code size do not fit a fat header, or
/// the clauses do not fit a fat section.
pub fn canonical_body(
    max_stack: usize,
    code: &[u8],
    local_var_sig_token: u32,
    init_locals: bool,
    exception_handlers: &[ExceptionHandler],
) -> Result<Vec<u8>> {
    let Ok(max_stack) = u16::try_from(max_stack) else {
        return Err(malformed_error!("Max stack {} exceeds 0xFFFF", max_stack));
    };
    let Ok(code_size) = u32::try_from(code.len()) else {
        return Err(malformed_error!("Code size {} exceeds 4GB", code.len()));
    };

    let more_sects = !exception_handlers.is_empty();
    let header = write_fat_header(
        max_stack,
        code_size,
        local_var_sig_token,
        init_locals,
        more_sects,
    );

    let mut encoded = Vec::with_capacity(header.len() + code.len());
    encoded.extend_from_slice(&header);
    encoded.extend_from_slice(code);
    if more_sects {
        // Data sections start on a 4-byte boundary
        encoded.resize((encoded.len() + 3) & !3, 0x00);
        encoded.extend_from_slice(&write_exception_section(exception_handlers)?);
    }
    Ok(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assembly::decode_stream,
        metadata::{signatures::TypeSignature, token::Token},
        Parser,
    };

    #[test]
    fn emit_by_mnemonic() {
        let mut encoder = InstructionEncoder::new();
        assert_eq!(encoder.emit_instruction("ldarg.0", Operand::None).unwrap(), 0);
        assert_eq!(
            encoder
                .emit_instruction("ldfld", Operand::Token(Token::new(0x0400_0001)))
                .unwrap(),
            1
        );
        encoder
            .emit_instruction("ldarg", Operand::Immediate(Immediate::UInt16(0x102)))
            .unwrap();
        encoder.emit_instruction("ret", Operand::None).unwrap();

        assert_eq!(
            encoder.finalize(),
            vec![0x02, 0x7B, 0x01, 0x00, 0x00, 0x04, 0xFE, 0x09, 0x02, 0x01, 0x2A]
        );
    }

    #[test]
    fn emit_rejects_bad_operands() {
        let mut encoder = InstructionEncoder::new();
        assert!(encoder.emit_instruction("bogus", Operand::None).is_err());
        assert!(encoder
            .emit_instruction("ldc.i4.s", Operand::Immediate(Immediate::Int32(1)))
            .is_err());
        assert!(encoder.emit_instruction("br.s", Operand::Target(300)).is_err());
        assert_eq!(encoder.position(), 0);
    }

    #[test]
    fn decoded_streams_encode_back() {
        let code = [
            0x00, // nop
            0x2B, 0xFD, // br.s IL_0000
            0x45, 0x02, 0x00, 0x00, 0x00, 0xF0, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00, // switch
            0x38, 0x00, 0x00, 0x00, 0x00, // br IL_0015
            0x72, 0x01, 0x00, 0x00, 0x70, // ldstr
            0x2A, // ret
        ];
        let mut parser = Parser::new(&code);
        let instructions = decode_stream(&mut parser).unwrap();

        assert_eq!(instructions[2].operand, Operand::Switch(vec![0, 16]));
        assert_eq!(encode_instructions(&instructions).unwrap(), code.to_vec());
    }

    #[test]
    fn layout_mismatch() {
        let mut parser = Parser::new(&[0x00, 0x2A]);
        let mut instructions = decode_stream(&mut parser).unwrap();
        instructions.remove(0);

        assert!(encode_instructions(&instructions).is_err());
    }

    #[test]
    fn canonical_encoding() {
        let mut parser = Parser::new(&[0x17, 0x2A]);
        let mut body = MethodBody::from_instructions(decode_stream(&mut parser).unwrap(), 1);
        body.local_var_sig_token = 0x1100_0002;

        let encoded = encode_body(&body).unwrap();
        assert_eq!(encoded.len(), 14);
        assert_eq!(&encoded[12..], &[0x17, 0x2A]);
        assert_eq!(encoded, canonical_body(1, &[0x17, 0x2A], 0x1100_0002, false, &[]).unwrap());

        let mut deeper = body.clone();
        deeper.max_stack = 2;
        assert_ne!(encode_body(&deeper).unwrap(), encoded);

        let mut other_locals = body.clone();
        other_locals.local_var_sig_token = 0x1100_0003;
        assert_ne!(encode_body(&other_locals).unwrap(), encoded);

        let mut retyped_locals = body.clone();
        retyped_locals.locals = vec![TypeSignature::String];
        assert_eq!(encode_body(&retyped_locals).unwrap(), encoded);

        body.size_code = 3;
        assert!(encode_body(&body).is_err());
    }

    #[test]
    fn canonical_encoding_covers_exception_clauses() {
        use crate::metadata::method::{ExceptionHandler, ExceptionHandlerFlags};

        // nop; leave.s IL_0006; pop; leave.s IL_0006; ret
        let mut parser = Parser::new(&[0x00, 0xDE, 0x03, 0x26, 0xDE, 0x00, 0x2A]);
        let mut body = MethodBody::from_instructions(decode_stream(&mut parser).unwrap(), 2);
        body.exception_handlers.push(ExceptionHandler {
            flags: ExceptionHandlerFlags::EXCEPTION,
            try_offset: 0,
            try_length: 3,
            handler_offset: 3,
            handler_length: 3,
            filter_offset: 0x0100_0001,
        });

        let encoded = encode_body(&body).unwrap();
        // 12 byte header, 7 bytes code, 1 byte padding, 4 byte section header, one clause
        assert_eq!(encoded.len(), 48);
        assert_eq!(encoded[0] & 0x08, 0x08);
        assert_eq!(&encoded[20..24], &[0x41, 28, 0x00, 0x00]);

        let mut other_catch = body.clone();
        other_catch.exception_handlers[0].filter_offset = 0x0100_0007;
        assert_ne!(encode_body(&other_catch).unwrap(), encoded);

        let mut longer_handler = body.clone();
        longer_handler.exception_handlers[0].handler_length = 4;
        assert_ne!(encode_body(&longer_handler).unwrap(), encoded);

        body.exception_handlers.clear();
        assert_eq!(encode_body(&body).unwrap().len(), 19);
    }
}
