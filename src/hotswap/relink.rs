//! Rebuilding a disk body so it can run inside the live process.
//!
//! The instruction layout is kept byte for byte. Only the 4-byte token operands change: each
//! one is replaced with a fresh slot token of a [`SymbolTable`] that holds the resolved live
//! symbol. Branch displacements and exception clause offsets therefore stay valid without
//! any adjustment.

use crate::{
    assembly::encode_instructions,
    file::io::write_le_at,
    hotswap::{regions::build_regions, resolver::SymbolResolver},
    metadata::method::MethodBody,
    runtime::{ExceptionRegion, SymbolTable, TypeHandle},
    Result,
};

/// A disk body whose references point into the live process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelinkedBody {
    /// Instruction bytes with slot tokens in place of module tokens
    pub code: Vec<u8>,
    /// Resolved local variable types
    pub locals: Vec<TypeHandle>,
    /// Symbols behind the slot tokens of `code`
    pub symbols: SymbolTable,
    /// Exception regions with catch types resolved
    pub regions: Vec<ExceptionRegion>,
    /// Maximum evaluation stack depth of the disk body
    pub max_stack: usize,
    /// `true` if locals are zero-initialised
    pub init_locals: bool,
}

/// Relinks a disk body against the live process.
///
/// Every token operand gets its own slot, even when the same token appears several times.
///
/// # Errors
///
/// Returns [`crate::Error::UnresolvedSymbol`] if a local type, token operand or catch type has
/// no live counterpart, and [`crate::Error::Malformed`] if the instruction stream or the
/// exception clauses are inconsistent.
pub fn relink(body: &MethodBody, resolver: &SymbolResolver<'_>) -> Result<RelinkedBody> {
    let locals = body
        .locals
        .iter()
        .map(|local| resolver.resolve_type(local))
        .collect::<Result<Vec<_>>>()?;

    let mut code = encode_instructions(&body.instructions)?;
    let mut symbols = SymbolTable::new();

    for instruction in &body.instructions {
        let Some(token) = instruction.token() else {
            continue;
        };

        let symbol = resolver.resolve_token(token)?;
        let slot = symbols.add(symbol)?;

        // Token operands always occupy the last 4 bytes of the instruction
        let mut operand_offset = (instruction.next_offset() - 4) as usize;
        write_le_at(&mut code, &mut operand_offset, slot.value())?;
    }

    let regions = build_regions(&body.exception_handlers, |token| {
        resolver.resolve_token(token)
    })?;

    Ok(RelinkedBody {
        code,
        locals,
        symbols,
        regions,
        max_stack: body.max_stack,
        init_locals: body.is_init_local,
    })
}
