//! The running process, as seen through the host's capabilities.
//!
//! The crate never inspects the process by itself. The host implements three traits:
//!
//! - [`RuntimeView`] - type lookup by name, member enumeration, generic instantiation and
//!   access to the current method bodies
//! - [`MethodEmitter`] - builds a callable method from code, locals, symbols and exception
//!   regions
//! - [`Detour`] - redirects an existing method to a replacement
//!
//! Values crossing these seams are opaque handles ([`TypeHandle`], [`MethodHandle`], ...) and
//! resolved [`LiveSymbol`]s.

mod emit;
mod handles;
mod symbols;
mod view;

pub use emit::{Detour, ExceptionRegion, MethodEmitter, RegionHandler, ReplacementDefinition};
pub use handles::{ExecutableHandle, FieldHandle, MethodHandle, ModuleHandle, TypeHandle};
pub use symbols::{LiveSymbol, SymbolTable};
pub use view::{GenericOwner, LiveBody, LiveMethodInfo, RuntimeView, TypeShape};
