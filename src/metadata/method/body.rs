//! Method body parsing (ECMA-335 II.25.4).
//!
//! A method body starts with either a one-byte tiny header or a twelve-byte fat header,
//! followed by the instruction stream and, for fat bodies, optional data sections that hold
//! the exception handling clauses.
//!
//! Hosts that expose the raw bytes of a live method body and metadata decoders that read disk
//! bodies both go through [`MethodBody::from`]. Test fixtures and code generators start from
//! an instruction list with [`MethodBody::from_instructions`].
//!
//! # Examples
//!
//! ```rust
//! use dotswap::metadata::method::MethodBody;
//!
//! // Tiny header for two bytes of code: ldc.i4.1, ret
//! let body = MethodBody::from(&[0x0A, 0x17, 0x2A])?;
//! assert!(!body.is_fat);
//! assert_eq!(body.size_code, 2);
//! assert_eq!(body.instructions.len(), 2);
//! # Ok::<(), dotswap::Error>(())
//! ```

use crate::{
    assembly::{decode_stream, Instruction},
    file::{
        io::{read_le, read_le_at},
        parser::Parser,
    },
    metadata::{
        method::{ExceptionHandler, ExceptionHandlerFlags, MethodBodyFlags, SectionFlags},
        signatures::TypeSignature,
    },
    Error::OutOfBounds,
    Result,
};

/// Size of a fat method header in bytes.
pub const FAT_HEADER_SIZE: usize = 12;

/// Maximum evaluation stack depth implied by a tiny header.
const TINY_MAX_STACK: usize = 8;

/// A parsed method body.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodBody {
    /// Size of the instruction stream in bytes
    pub size_code: usize,
    /// Size of the header in bytes (1 for tiny, 12 for fat headers)
    pub size_header: usize,
    /// `StandAloneSig` token of the local variable signature, 0 if there are no locals
    pub local_var_sig_token: u32,
    /// Maximum evaluation stack depth
    pub max_stack: usize,
    /// `true` if the body uses a fat header
    pub is_fat: bool,
    /// `true` if locals are zero-initialised on entry
    pub is_init_local: bool,
    /// Exception handling clauses, in declaration order
    pub exception_handlers: Vec<ExceptionHandler>,
    /// The decoded instruction stream
    pub instructions: Vec<Instruction>,
    /// Types of the declared local variables, filled in by the metadata decoder from the
    /// local variable signature
    pub locals: Vec<TypeSignature>,
}

impl MethodBody {
    /// Parses a method body from `data`, which starts at the body header.
    ///
    /// Trailing bytes after the body are ignored, so `data` may run to the end of the image.
    /// [`MethodBody::locals`] stays empty: resolving the local variable signature needs the
    /// metadata tables of the owning module.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] for an unknown header format or an undecodable
    /// instruction stream and [`crate::Error::OutOfBounds`] for truncated data.
    pub fn from(data: &[u8]) -> Result<MethodBody> {
        if data.is_empty() {
            return Err(malformed_error!("Provided data for body parsing is empty"));
        }

        let first_byte = read_le::<u8>(data)?;
        match MethodBodyFlags::from_bits_truncate(u16::from(first_byte & 0b_0000_0011_u8)) {
            MethodBodyFlags::TINY_FORMAT => {
                let size_code = (first_byte >> 2) as usize;
                if size_code + 1 > data.len() {
                    return Err(OutOfBounds);
                }

                Ok(MethodBody {
                    size_code,
                    size_header: 1,
                    local_var_sig_token: 0,
                    max_stack: TINY_MAX_STACK,
                    is_fat: false,
                    is_init_local: false,
                    exception_handlers: Vec::new(),
                    instructions: decode_code(&data[1..=size_code])?,
                    locals: Vec::new(),
                })
            }
            MethodBodyFlags::FAT_FORMAT => {
                if data.len() < FAT_HEADER_SIZE {
                    return Err(OutOfBounds);
                }

                let first_duo = read_le::<u16>(data)?;

                let size_header = ((first_duo >> 12) * 4) as usize;
                if size_header < FAT_HEADER_SIZE {
                    return Err(malformed_error!(
                        "Fat method header declares a size of {} bytes",
                        size_header
                    ));
                }

                let size_code = read_le::<u32>(&data[4..])? as usize;
                let Some(code_end) = size_header.checked_add(size_code) else {
                    return Err(OutOfBounds);
                };
                if data.len() < code_end {
                    return Err(OutOfBounds);
                }

                let local_var_sig_token = read_le::<u32>(&data[8..])?;
                let flags_header =
                    MethodBodyFlags::from_bits_truncate(first_duo & 0b_0000_1111_1111_1111_u16);
                let max_stack = read_le::<u16>(&data[2..])? as usize;

                let exception_handlers = if flags_header.contains(MethodBodyFlags::MORE_SECTS) {
                    read_sections(data, (code_end + 3) & !3)?
                } else {
                    Vec::new()
                };

                Ok(MethodBody {
                    size_code,
                    size_header,
                    local_var_sig_token,
                    max_stack,
                    is_fat: true,
                    is_init_local: flags_header.contains(MethodBodyFlags::INIT_LOCALS),
                    exception_handlers,
                    instructions: decode_code(&data[size_header..code_end])?,
                    locals: Vec::new(),
                })
            }
            _ => Err(malformed_error!(
                "MethodHeader is neither FAT nor TINY - {}",
                first_byte
            )),
        }
    }

    /// Creates a fat body from an already laid out instruction stream.
    ///
    /// The code size is taken from the end of the last instruction.
    #[must_use]
    pub fn from_instructions(instructions: Vec<Instruction>, max_stack: usize) -> MethodBody {
        let size_code = instructions
            .last()
            .map_or(0, |instr| instr.next_offset() as usize);

        MethodBody {
            size_code,
            size_header: FAT_HEADER_SIZE,
            local_var_sig_token: 0,
            max_stack,
            is_fat: true,
            is_init_local: false,
            exception_handlers: Vec::new(),
            instructions,
            locals: Vec::new(),
        }
    }

    /// Returns the total size of header and code.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size_code + self.size_header
    }

    /// Returns `true` if the body declares exception handling clauses.
    #[must_use]
    pub fn has_exception_data(&self) -> bool {
        !self.exception_handlers.is_empty()
    }
}

/// Writes a fat method header. `more_sects` announces data sections after the code.
#[must_use]
pub fn write_fat_header(
    max_stack: u16,
    code_size: u32,
    local_var_sig_token: u32,
    init_locals: bool,
    more_sects: bool,
) -> [u8; FAT_HEADER_SIZE] {
    let mut flags = MethodBodyFlags::FAT_FORMAT;
    if init_locals {
        flags |= MethodBodyFlags::INIT_LOCALS;
    }
    if more_sects {
        flags |= MethodBodyFlags::MORE_SECTS;
    }
    // Header size in 4-byte units lives in the upper nibble
    let first_duo = flags.bits() | (((FAT_HEADER_SIZE / 4) as u16) << 12);

    let mut header = [0_u8; FAT_HEADER_SIZE];
    header[0..2].copy_from_slice(&first_duo.to_le_bytes());
    header[2..4].copy_from_slice(&max_stack.to_le_bytes());
    header[4..8].copy_from_slice(&code_size.to_le_bytes());
    header[8..12].copy_from_slice(&local_var_sig_token.to_le_bytes());
    header
}

/// Writes `handlers` as a single fat exception handling section.
///
/// Small and fat clauses read from a body come out in the same fat layout, so two bodies that
/// differ only in the section format write identical bytes.
///
/// # Errors
///
/// Returns [`crate::Error::Malformed`] if the section size does not fit its 24-bit field.
pub fn write_exception_section(handlers: &[ExceptionHandler]) -> Result<Vec<u8>> {
    let section_size = 4 + handlers.len() * 24;
    let size_field = match u32::try_from(section_size) {
        Ok(size) if size <= 0x00FF_FFFF => size,
        _ => {
            return Err(malformed_error!(
                "{} exception clauses exceed a fat section",
                handlers.len()
            ))
        }
    };

    let flags = SectionFlags::EHTABLE | SectionFlags::FAT_FORMAT;
    let mut section = Vec::with_capacity(section_size);
    section.extend_from_slice(&(u32::from(flags.bits()) | (size_field << 8)).to_le_bytes());
    for handler in handlers {
        section.extend_from_slice(&u32::from(handler.flags.bits()).to_le_bytes());
        section.extend_from_slice(&handler.try_offset.to_le_bytes());
        section.extend_from_slice(&handler.try_length.to_le_bytes());
        section.extend_from_slice(&handler.handler_offset.to_le_bytes());
        section.extend_from_slice(&handler.handler_length.to_le_bytes());
        section.extend_from_slice(&handler.filter_offset.to_le_bytes());
    }
    Ok(section)
}

fn decode_code(code: &[u8]) -> Result<Vec<Instruction>> {
    let mut parser = Parser::new(code);
    decode_stream(&mut parser)
}

fn read_sections(data: &[u8], mut cursor: usize) -> Result<Vec<ExceptionHandler>> {
    let mut exception_handlers = Vec::new();

    while data.len() > cursor + 4 {
        let section_flags = SectionFlags::from_bits_truncate(read_le::<u8>(&data[cursor..])?);
        if !section_flags.contains(SectionFlags::EHTABLE) {
            break;
        }

        if section_flags.contains(SectionFlags::FAT_FORMAT) {
            let section_size = (read_le::<u32>(&data[cursor..])? >> 8) as usize;
            if section_size < 4 || data.len() < cursor + section_size {
                return Err(OutOfBounds);
            }

            let mut clause = cursor + 4;
            for _ in 0..(section_size - 4) / 24 {
                // Flags occupy the low 16 bits of the 32-bit field
                #[allow(clippy::cast_possible_truncation)]
                let flags = read_le_at::<u32>(data, &mut clause)? as u16;
                exception_handlers.push(ExceptionHandler {
                    flags: ExceptionHandlerFlags::from_bits_truncate(flags),
                    try_offset: read_le_at::<u32>(data, &mut clause)?,
                    try_length: read_le_at::<u32>(data, &mut clause)?,
                    handler_offset: read_le_at::<u32>(data, &mut clause)?,
                    handler_length: read_le_at::<u32>(data, &mut clause)?,
                    filter_offset: read_le_at::<u32>(data, &mut clause)?,
                });
            }
            cursor += section_size;
        } else {
            let section_size = read_le::<u8>(&data[cursor + 1..])? as usize;
            if section_size < 4 || data.len() < cursor + section_size {
                return Err(OutOfBounds);
            }

            let mut clause = cursor + 4;
            for _ in 0..(section_size - 4) / 12 {
                exception_handlers.push(ExceptionHandler {
                    flags: ExceptionHandlerFlags::from_bits_truncate(read_le_at::<u16>(
                        data,
                        &mut clause,
                    )?),
                    try_offset: u32::from(read_le_at::<u16>(data, &mut clause)?),
                    try_length: u32::from(read_le_at::<u8>(data, &mut clause)?),
                    handler_offset: u32::from(read_le_at::<u16>(data, &mut clause)?),
                    handler_length: u32::from(read_le_at::<u8>(data, &mut clause)?),
                    filter_offset: read_le_at::<u32>(data, &mut clause)?,
                });
            }
            cursor += section_size;
        }

        if !section_flags.contains(SectionFlags::MORE_SECTS) {
            break;
        }
        cursor = (cursor + 3) & !3;
    }

    Ok(exception_handlers)
}
