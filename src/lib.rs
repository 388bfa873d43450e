// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
//#![deny(unsafe_code)]
// - 'file/physical.rs' uses mmap to map a file into memory

//! # dotswap
//!
//! Live replacement of .NET method bodies inside a running host process.
//!
//! A long-running host (a game, an editor, a server) loads plugin assemblies once and is
//! expensive to restart. `dotswap` lets a developer rebuild a plugin and swap the new
//! implementation of its methods into the running process: it compares every opted-in method
//! of the rebuilt module with what the process currently executes, rewrites the changed
//! bodies so their references point at live types, fields and methods, and asks the host to
//! redirect the old methods to the new ones.
//!
//! ## Features
//!
//! - **Byte-accurate CIL codec** - decode and re-encode instruction streams, tiny and fat
//!   method headers, small and fat exception sections
//! - **Structural symbol resolution** - pair disk references with live entities by name and
//!   signature, including generic types and generic method instantiations
//! - **Exception region rebuilding** - group try/handler clauses into regions the way method
//!   builders expect them
//! - **Contained failures** - a broken module or an unresolvable reference skips exactly that
//!   module or function, with a log line naming it
//!
//! ## Quick Start
//!
//! The host implements the runtime seams ([`runtime::RuntimeView`], [`runtime::MethodEmitter`],
//! [`runtime::Detour`]) and a [`metadata::module::MetadataDecoder`], registers its plugin
//! modules once and triggers a pass whenever the developer asks for one:
//!
//! ```rust,ignore
//! use dotswap::prelude::*;
//!
//! let modules = ModuleIndex::new();
//! let registry = ReplacementRegistry::new();
//! modules.register(module, "MyMod", "/mods/MyMod/Assemblies/MyMod.dll");
//!
//! let source = PeModuleSource::new(MyDecoder);
//! let swap = HotSwap::new(&runtime, &emitter, &detour, &source, &modules, &registry);
//! swap.perform_hot_swap();
//! ```
//!
//! ## Architecture
//!
//! - [`file`] - PE image access for module files
//! - [`assembly`] - CIL instruction codec and canonical body encoding
//! - [`metadata`] - tokens, type names, signatures, method bodies and the disk module model
//! - [`runtime`] - handles and traits describing the running process
//! - [`hotswap`] - resolver, region builder, relinker and the pass orchestrator
//! - [`Error`] and [`Result`] - error handling
//!
//! ## Logging
//!
//! The crate logs through the [`log`](https://docs.rs/log) facade and never installs a
//! logger. Every activated method produces an `info` line, every skipped module or method an
//! `error` line naming the type and method.

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use dotswap::prelude::*;
///
/// let registry = ReplacementRegistry::new();
/// assert_eq!(registry.next_counter(), 0);
/// assert_eq!(HotSwapConfig::new().replacement_name("Tick", 0), "Tick_HotSwap0");
/// ```
pub mod prelude;

/// Access to module files on disk or in memory.
///
/// [`File`] validates that an input is a PE image with a CLR runtime header and gives access to
/// its bytes by RVA; [`Parser`] and [`file::io`] read the little-endian structures inside.
pub mod file;

/// CIL instruction codec based on ECMA-335.
///
/// # Key Types
///
/// - [`assembly::Instruction`] - a decoded instruction with absolute branch targets
/// - [`assembly::Operand`] - instruction operands (immediates, tokens, targets)
/// - [`assembly::InstructionEncoder`] - lays out instructions and encodes branch offsets
///
/// # Main Functions
///
/// - [`assembly::decode_stream`] - decode a whole instruction stream
/// - [`assembly::encode_instructions`] - encode a decoded stream back to bytes
/// - [`assembly::encode_body`] - the canonical encoding used for change detection
///
/// # Examples
///
/// ```rust
/// use dotswap::{assembly::{decode_stream, encode_instructions}, Parser};
///
/// let code = [0x16, 0x2C, 0x01, 0x00, 0x2A]; // ldc.i4.0, brfalse.s +1, nop, ret
/// let instructions = decode_stream(&mut Parser::new(&code))?;
///
/// assert_eq!(instructions[1].mnemonic, "brfalse.s");
/// assert_eq!(instructions[1].branch_targets(), vec![4]);
/// assert_eq!(encode_instructions(&instructions)?, code);
/// # Ok::<(), dotswap::Error>(())
/// ```
pub mod assembly;

/// The disk-side model of a compiled module.
///
/// Tokens, qualified type names, type and method signatures with their structural
/// comparator, method bodies with exception clauses, and [`metadata::module::CompiledModule`]
/// with the collaborator traits that produce it.
pub mod metadata;

/// The running process, as seen through the host's capabilities.
pub mod runtime;

/// The live-patch engine.
pub mod hotswap;

/// `dotswap` Result type
pub type Result<T> = std::result::Result<T, Error>;

/// `dotswap` Error type
///
/// The main error type for all operations in this crate. Pass-level failures are only
/// returned by [`hotswap::HotSwap::run_pass`]; everything that affects a single module or
/// method is logged and recorded in the [`hotswap::PassReport`].
pub use error::Error;

/// Provides access to low-level file and memory parsing utilities.
///
/// # Example
///
/// ```rust
/// use dotswap::{Parser, assembly::decode_instruction};
/// let code = [0x2A]; // ret
/// let mut parser = Parser::new(&code);
/// let instr = decode_instruction(&mut parser)?;
/// assert_eq!(instr.mnemonic, "ret");
/// # Ok::<(), dotswap::Error>(())
/// ```
pub use file::{parser::Parser, File};
