//! The CIL instruction codec.
//!
//! Change detection works on bytes: the live body and the disk body of a function are both
//! brought into the canonical form produced by [`encode_body`] and compared byte for byte.
//! The decoder turns raw code into [`Instruction`] values with absolute branch targets; the
//! encoder turns them back into identical bytes.
//!
//! # Key Components
//!
//! - [`decode_instruction`] / [`decode_stream`] - Byte stream to instructions
//! - [`InstructionEncoder`] / [`encode_instructions`] - Instructions to byte stream
//! - [`encode_body`] / [`canonical_body`] - Canonical body encoding used for diffing
//! - [`INSTRUCTIONS`] / [`INSTRUCTIONS_FE`] - The opcode tables both directions share
//!
//! # Examples
//!
//! ```rust
//! use dotswap::{Parser, assembly::{decode_stream, encode_instructions}};
//!
//! let code = [0x02, 0x17, 0x58, 0x2A]; // ldarg.0, ldc.i4.1, add, ret
//! let mut parser = Parser::new(&code);
//! let instructions = decode_stream(&mut parser)?;
//!
//! assert_eq!(instructions.len(), 4);
//! assert_eq!(encode_instructions(&instructions)?, code.to_vec());
//! # Ok::<(), dotswap::Error>(())
//! ```

mod decoder;
mod encoder;
mod instruction;
mod instructions;

pub use decoder::{decode_instruction, decode_stream};
pub use encoder::{canonical_body, encode_body, encode_instructions, InstructionEncoder};
pub use instruction::{FlowType, Immediate, Instruction, Operand, OperandType};
pub use instructions::{lookup, lookup_mnemonic, CilInstruction, INSTRUCTIONS, INSTRUCTIONS_FE};
