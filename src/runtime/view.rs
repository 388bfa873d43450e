//! The reflection view of the running process.

use crate::{
    assembly::{canonical_body, encode_instructions},
    metadata::{
        method::{ExceptionHandler, MethodBody},
        signatures::SignatureMethod,
        typename::TypeName,
    },
    runtime::handles::{FieldHandle, MethodHandle, TypeHandle},
    Result,
};

/// A method as reported by the host's reflection facility.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveMethodInfo {
    /// Handle of the method
    pub handle: MethodHandle,
    /// Method name
    pub name: String,
    /// Signature, with generic parameters left open on generic definitions
    pub signature: SignatureMethod,
}

/// The body of a live method, as far as change detection needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveBody {
    /// Raw instruction bytes
    pub code: Vec<u8>,
    /// Maximum evaluation stack depth
    pub max_stack: usize,
    /// Local variable signature token in the method's own module
    pub local_var_sig_token: u32,
    /// `true` if locals are zero-initialised
    pub init_locals: bool,
    /// Exception clauses with module-local class tokens
    pub exception_handlers: Vec<ExceptionHandler>,
}

impl LiveBody {
    /// Builds a live body from raw method body bytes starting at the body header.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes do not form a valid method body.
    pub fn parse(data: &[u8]) -> Result<LiveBody> {
        let body = MethodBody::from(data)?;

        Ok(LiveBody {
            code: encode_instructions(&body.instructions)?,
            max_stack: body.max_stack,
            local_var_sig_token: body.local_var_sig_token,
            init_locals: body.is_init_local,
            exception_handlers: body.exception_handlers,
        })
    }

    /// Returns the canonical encoding, comparable with
    /// [`crate::assembly::encode_body`] of a disk body.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the body does not fit a fat header.
    pub fn canonical(&self) -> Result<Vec<u8>> {
        canonical_body(
            self.max_stack,
            &self.code,
            self.local_var_sig_token,
            self.init_locals,
            &self.exception_handlers,
        )
    }
}

/// Ways to derive a type from an element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeShape {
    /// Single-dimensional, zero-based array
    SzArray,
    /// Multi-dimensional array of the given rank
    Array(u32),
    /// Managed reference
    ByRef,
    /// Unmanaged pointer
    Pointer,
}

/// The owner of a generic parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenericOwner {
    /// A parameter of a generic type definition
    Type(TypeHandle),
    /// A parameter of a generic method definition
    Method(MethodHandle),
}

/// Read access to the running process's loaded types and members.
///
/// Lookups that can legitimately find nothing return `Option`; operations that construct new
/// runtime entities return `Result` and report host refusals as errors.
pub trait RuntimeView {
    /// Finds a loaded type by qualified name.
    ///
    /// Generic type definitions are found by their open name, e.g. ``List`1``. When `name`
    /// carries an assembly, only that assembly is searched.
    fn find_type(&self, name: &TypeName) -> Option<TypeHandle>;

    /// Returns the open generic definition of a constructed generic type.
    fn generic_type_definition(&self, ty: TypeHandle) -> Option<TypeHandle>;

    /// Instantiates a generic type definition.
    ///
    /// # Errors
    ///
    /// Returns an error if the host refuses the instantiation.
    fn make_generic_type(&self, definition: TypeHandle, args: &[TypeHandle]) -> Result<TypeHandle>;

    /// Derives an array, reference or pointer type.
    ///
    /// # Errors
    ///
    /// Returns an error if the host refuses to construct the type.
    fn compose_type(&self, element: TypeHandle, shape: TypeShape) -> Result<TypeHandle>;

    /// Returns a generic parameter by position.
    fn generic_parameter(&self, owner: GenericOwner, position: u32) -> Option<TypeHandle>;

    /// Finds a field of a type by name.
    fn field(&self, ty: TypeHandle, name: &str) -> Option<FieldHandle>;

    /// Enumerates the methods and constructors declared by a type.
    fn methods(&self, ty: TypeHandle) -> Vec<LiveMethodInfo>;

    /// Rebinds a method of a generic type definition to a constructed type.
    ///
    /// # Errors
    ///
    /// Returns an error if `method` is not declared by the definition of `constructed`.
    fn bind_method(&self, method: MethodHandle, constructed: TypeHandle) -> Result<MethodHandle>;

    /// Instantiates a generic method definition.
    ///
    /// # Errors
    ///
    /// Returns an error if the host refuses the instantiation.
    fn make_generic_method(&self, method: MethodHandle, args: &[TypeHandle])
        -> Result<MethodHandle>;

    /// Returns the body the host reports for a method.
    ///
    /// # Errors
    ///
    /// Returns an error if the method has no IL body.
    fn method_body(&self, method: MethodHandle) -> Result<LiveBody>;
}
