//! The live-patch engine.
//!
//! This module ties the codec, the metadata model and the runtime seams together:
//!
//! - [`SymbolResolver`] finds the live counterpart of a disk-module reference
//! - [`build_regions`] groups exception clauses into protected regions
//! - [`relink`] rewrites a disk body so its references point into the live process
//! - [`HotSwap`] runs a pass over all registered modules
//!
//! State that outlives a pass lives in two process-scoped objects the host creates once and
//! passes by reference: the [`ModuleIndex`] of module files and the [`ReplacementRegistry`]
//! of activated replacements.
//!
//! # Change Detection
//!
//! A function is patched when the canonical encoding of its disk body differs from its
//! baseline (see [`DiffBaseline`]). Token operands are compared as module tokens, before any
//! resolution, so a body that references the same members through the same module compares
//! equal, and any change of opcodes, literals, branch targets or referenced members does not.

mod config;
mod index;
mod pass;
mod regions;
mod registry;
mod relink;
mod resolver;

pub use config::{DiffBaseline, HotSwapConfig, DEFAULT_MARKERS, DEFAULT_REPLACEMENT_SUFFIX};
pub use index::{ModuleEntry, ModuleIndex};
pub use pass::{FunctionFailure, HotSwap, PassReport, PassState};
pub use regions::build_regions;
pub use registry::{PassGuard, Replacement, ReplacementRegistry};
pub use relink::{relink, RelinkedBody};
pub use resolver::{GenericContext, SymbolResolver};
