//! Building and activating replacement methods.
//!
//! These two traits are the only places where the host touches executable memory:
//! [`MethodEmitter`] turns a [`ReplacementDefinition`] into a callable method and
//! [`Detour`] redirects the original method to it. Everything before them is plain data.

use crate::{
    metadata::{method::HandlerKind, signatures::SignatureMethod},
    runtime::{
        handles::{ExecutableHandle, MethodHandle, TypeHandle},
        symbols::{LiveSymbol, SymbolTable},
    },
    Result,
};

/// A handler of an [`ExceptionRegion`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionHandler {
    /// Handler kind
    pub kind: HandlerKind,
    /// Offset of the handler block
    pub handler_start: u32,
    /// Length of the handler block
    pub handler_length: u32,
    /// Caught type of a [`HandlerKind::Catch`] handler
    pub catch_type: Option<LiveSymbol>,
    /// Filter block offset of a [`HandlerKind::Filter`] handler
    pub filter_start: Option<u32>,
}

/// A protected block with all its handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionRegion {
    /// Offset of the protected block
    pub try_start: u32,
    /// Length of the protected block
    pub try_length: u32,
    /// Handlers in declaration order
    pub handlers: Vec<RegionHandler>,
}

/// Everything needed to build one replacement method.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplacementDefinition {
    /// Unique name of the replacement
    pub name: String,
    /// The method being replaced
    pub original: MethodHandle,
    /// The type the replacement is associated with for visibility checks
    pub owner: TypeHandle,
    /// Calling signature, identical to the original's
    pub signature: SignatureMethod,
    /// Maximum evaluation stack depth
    pub max_stack: usize,
    /// `true` if locals are zero-initialised
    pub init_locals: bool,
    /// Local variable types in declaration order
    pub locals: Vec<TypeHandle>,
    /// Instruction bytes whose token operands are slot tokens of `symbols`
    pub code: Vec<u8>,
    /// The symbols referenced from `code`
    pub symbols: SymbolTable,
    /// Exception regions with offsets into `code`
    pub regions: Vec<ExceptionRegion>,
}

/// Builds executable methods from replacement definitions.
pub trait MethodEmitter {
    /// Builds a method from `definition`.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime rejects the definition.
    fn define(&self, definition: ReplacementDefinition) -> Result<ExecutableHandle>;

    /// Finalizes a defined method so it can be executed, e.g. by compiling it.
    ///
    /// # Errors
    ///
    /// Returns an error if the method cannot be prepared.
    fn prepare(&self, executable: ExecutableHandle) -> Result<()>;
}

/// Redirects calls of a method to a replacement.
///
/// Implementations must make the switch atomic for concurrent callers: a call either runs the
/// old body or the new one, never a mix, and no call that starts after `redirect` returns runs
/// the old body.
pub trait Detour {
    /// Redirects all future calls of `original` to `replacement`.
    ///
    /// # Errors
    ///
    /// Returns an error if the redirection is refused, e.g. for an incompatible signature.
    fn redirect(&self, original: MethodHandle, replacement: ExecutableHandle) -> Result<()>;
}
