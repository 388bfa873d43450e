//! CIL instruction representation and operand types.
//!
//! A decoded instruction keeps its byte offset inside the method body, its encoded size and a
//! typed operand. Branch operands are stored as absolute code offsets rather than as the
//! displacement found in the byte stream, so an instruction stream can be compared, inspected
//! and re-encoded without tracking the position of every instruction by hand.
//!
//! # Key Components
//!
//! - [`Instruction`] - A single decoded instruction
//! - [`Operand`] - Typed operand representation
//! - [`Immediate`] - Literal operand values
//! - [`OperandType`] - Encoded operand width per opcode
//! - [`FlowType`] - Control flow behaviour per opcode
//!
//! # Examples
//!
//! ```rust
//! use dotswap::assembly::{Immediate, OperandType};
//!
//! assert_eq!(OperandType::Token.size(), Some(4));
//! assert_eq!(OperandType::Switch.size(), None);
//!
//! let value: u64 = Immediate::Int8(-1).into();
//! assert_eq!(value, u64::MAX);
//! ```

use std::fmt;

use crate::metadata::token::Token;

/// Types of operands for CIL instructions.
///
/// Every opcode has exactly one operand type, which fixes the number of operand bytes that
/// follow the opcode in the byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandType {
    /// No operand present
    None,
    /// Signed 8-bit integer
    Int8,
    /// Unsigned 8-bit integer
    UInt8,
    /// Unsigned 16-bit integer
    UInt16,
    /// Signed 32-bit integer
    Int32,
    /// Signed 64-bit integer
    Int64,
    /// 32-bit floating point
    Float32,
    /// 64-bit floating point
    Float64,
    /// Signed 8-bit branch displacement
    ShortTarget,
    /// Signed 32-bit branch displacement
    Target,
    /// Metadata token reference
    Token,
    /// Switch table operand
    Switch,
}

impl OperandType {
    /// Returns the size in bytes of this operand type.
    ///
    /// Returns `None` for [`OperandType::Switch`], whose size depends on the number of
    /// targets.
    #[must_use]
    pub const fn size(&self) -> Option<usize> {
        match self {
            OperandType::None => Some(0),
            OperandType::Int8 | OperandType::UInt8 | OperandType::ShortTarget => Some(1),
            OperandType::UInt16 => Some(2),
            OperandType::Int32
            | OperandType::Float32
            | OperandType::Target
            | OperandType::Token => Some(4),
            OperandType::Int64 | OperandType::Float64 => Some(8),
            OperandType::Switch => None,
        }
    }
}

/// Control flow behaviour of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowType {
    /// Execution continues with the next instruction
    Sequential,
    /// Branches if a condition holds, otherwise falls through
    ConditionalBranch,
    /// Always branches
    UnconditionalBranch,
    /// Calls another method and continues afterwards
    Call,
    /// Returns from the method
    Return,
    /// Multi-way branch
    Switch,
    /// Throws or rethrows an exception
    Throw,
    /// Ends a finally, fault or filter block
    EndFinally,
    /// Leaves a protected region
    Leave,
}

/// A literal value embedded in an instruction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Immediate {
    /// Signed 8-bit immediate value
    Int8(i8),
    /// Unsigned 8-bit immediate value
    UInt8(u8),
    /// Unsigned 16-bit immediate value
    UInt16(u16),
    /// Signed 32-bit immediate value
    Int32(i32),
    /// Signed 64-bit immediate value
    Int64(i64),
    /// 32-bit floating point immediate value
    Float32(f32),
    /// 64-bit floating point immediate value
    Float64(f64),
}

impl From<Immediate> for u64 {
    fn from(val: Immediate) -> Self {
        match val {
            // Signed values keep their bit pattern
            #[allow(clippy::cast_sign_loss)]
            Immediate::Int8(value) => i64::from(value) as u64,
            Immediate::UInt8(value) => u64::from(value),
            Immediate::UInt16(value) => u64::from(value),
            #[allow(clippy::cast_sign_loss)]
            Immediate::Int32(value) => i64::from(value) as u64,
            #[allow(clippy::cast_sign_loss)]
            Immediate::Int64(value) => value as u64,
            Immediate::Float32(value) => u64::from(value.to_bits()),
            Immediate::Float64(value) => value.to_bits(),
        }
    }
}

impl fmt::Display for Immediate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Immediate::Int8(value) => write!(f, "{value}"),
            Immediate::UInt8(value) => write!(f, "{value}"),
            Immediate::UInt16(value) => write!(f, "{value}"),
            Immediate::Int32(value) => write!(f, "{value}"),
            Immediate::Int64(value) => write!(f, "{value}"),
            Immediate::Float32(value) => write!(f, "{value}"),
            Immediate::Float64(value) => write!(f, "{value}"),
        }
    }
}

/// The operand of a decoded instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// No operand
    None,
    /// Literal value (integers, floats, local and argument indices)
    Immediate(Immediate),
    /// Absolute code offset of a branch target
    Target(u64),
    /// Metadata token, including user-string tokens of `ldstr`
    Token(Token),
    /// Absolute code offsets of all switch targets
    Switch(Vec<u64>),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::None => Ok(()),
            Operand::Immediate(imm) => write!(f, "{imm}"),
            Operand::Target(target) => write!(f, "IL_{target:04X}"),
            Operand::Token(token) => write!(f, "0x{:08X}", token.value()),
            Operand::Switch(targets) => {
                write!(f, "(")?;
                for (index, target) in targets.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "IL_{target:04X}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// A decoded CIL instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// Offset of the first opcode byte, relative to the start of the method code
    pub offset: u64,
    /// Encoded size in bytes, opcode and operand included
    pub size: u64,
    /// The opcode byte (second byte for two-byte opcodes)
    pub opcode: u8,
    /// `0xFE` for two-byte opcodes, `0` otherwise
    pub prefix: u8,
    /// The instruction mnemonic, e.g. `ldc.i4.s`
    pub mnemonic: &'static str,
    /// Control flow behaviour
    pub flow_type: FlowType,
    /// The decoded operand
    pub operand: Operand,
}

impl Instruction {
    /// Returns the metadata token operand, if this instruction has one.
    #[must_use]
    pub fn token(&self) -> Option<Token> {
        match &self.operand {
            Operand::Token(token) => Some(*token),
            _ => None,
        }
    }

    /// Returns the offset of the instruction that follows this one.
    #[must_use]
    pub fn next_offset(&self) -> u64 {
        self.offset + self.size
    }

    /// Returns all branch targets of this instruction.
    #[must_use]
    pub fn branch_targets(&self) -> Vec<u64> {
        match &self.operand {
            Operand::Target(target) => vec![*target],
            Operand::Switch(targets) => targets.clone(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IL_{:04X}: {}", self.offset, self.mnemonic)?;
        if self.operand != Operand::None {
            write!(f, " {}", self.operand)?;
        }
        Ok(())
    }
}
