//! # dotswap Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the dotswap library. Hosts wiring up hot swapping usually need nothing else.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all dotswap operations
pub use crate::Error;

/// The result type used throughout dotswap
pub use crate::Result;

/// Low-level file parsing utilities
pub use crate::{File, Parser};

// ================================================================================================
// Hot Swapping
// ================================================================================================

/// The orchestrator and its configuration
pub use crate::hotswap::{DiffBaseline, HotSwap, HotSwapConfig, PassReport, PassState};

/// Process-scoped state shared by all passes
pub use crate::hotswap::{ModuleIndex, Replacement, ReplacementRegistry};

// ================================================================================================
// Host Capabilities
// ================================================================================================

/// Traits the host implements
pub use crate::runtime::{Detour, MethodEmitter, RuntimeView};

/// Opaque handles into the running process
pub use crate::runtime::{
    ExecutableHandle, FieldHandle, MethodHandle, ModuleHandle, TypeHandle,
};

/// Values crossing the host seams
pub use crate::runtime::{
    ExceptionRegion, LiveBody, LiveMethodInfo, LiveSymbol, ReplacementDefinition, SymbolTable,
};

// ================================================================================================
// Disk Modules
// ================================================================================================

/// The disk module model and the collaborator traits that produce it
pub use crate::metadata::module::{
    CompiledModule, MetadataDecoder, MethodDefinition, ModuleSource, PeModuleSource,
    SymbolicReference, TypeDefinition,
};

/// Metadata token type
pub use crate::metadata::token::Token;

/// Qualified type names and signatures
pub use crate::metadata::{
    signatures::{SignatureMethod, TypeSignature},
    typename::TypeName,
};

/// Method bodies and exception clauses
pub use crate::metadata::method::{ExceptionHandler, HandlerKind, MethodBody};

// ================================================================================================
// Instruction Codec
// ================================================================================================

/// Decoding and encoding of CIL instruction streams
pub use crate::assembly::{
    decode_stream, encode_body, encode_instructions, Instruction, InstructionEncoder, Operand,
};
