//! The disk-side data model.
//!
//! Everything in this module describes a compiled module as read from its file: tokens,
//! qualified type names, decoded signatures, method bodies and the [`module::CompiledModule`]
//! that ties them together. Nothing here refers to the running process.
//!
//! # Key Components
//!
//! - [`token::Token`] - Metadata tokens as found in instruction operands
//! - [`typename::TypeName`] - Qualified type names used to pair disk and live types
//! - [`signatures`] - Decoded signatures and the structural comparator
//! - [`method`] - Method body parsing and exception clauses
//! - [`module`] - Compiled module model and the decoder seams

pub mod method;
pub mod module;
pub mod signatures;
pub mod token;
pub mod typename;

pub use module::{
    CompiledModule, MetadataDecoder, MethodDefinition, MethodReference, ModuleSource,
    PeModuleSource, SymbolicReference, TypeDefinition,
};
