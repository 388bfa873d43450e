//! The disk-side view of a compiled module.
//!
//! A [`CompiledModule`] is what a metadata decoder makes of one module file: its type
//! definitions with their method bodies, and a table that maps every token the bodies use to
//! a [`SymbolicReference`] describing the referenced entity by name and signature. It is
//! opened for one hot-swap pass and dropped afterwards.
//!
//! Parsing the metadata tables is the job of a [`MetadataDecoder`] supplied by the host. The
//! crate only provides the file handling around it in [`PeModuleSource`].

use std::{collections::HashMap, path::Path};

use crate::{
    file::File,
    metadata::{
        method::MethodBody,
        signatures::{SignatureMethod, TypeSignature},
        token::Token,
        typename::TypeName,
    },
    Result,
};

/// Name of type initializers, which run once and are never patched.
pub const TYPE_INITIALIZER: &str = ".cctor";

/// A reference to a method, by declaring type, name and signature.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodReference {
    /// The declaring type; a [`TypeSignature::GenericInst`] for members of constructed types
    pub declaring_type: TypeSignature,
    /// Method name
    pub name: String,
    /// Method signature as declared on the generic definition
    pub signature: SignatureMethod,
}

/// A module-local reference to a field, method or type.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolicReference {
    /// A field of a type
    Field {
        /// The declaring type
        declaring_type: TypeSignature,
        /// Field name
        name: String,
        /// Field type
        signature: TypeSignature,
    },
    /// A non-generic method, or a method of a generic type
    Method(MethodReference),
    /// A type
    Type(TypeSignature),
    /// An instantiation of a generic method with the given type arguments
    MethodSpec(MethodReference, Vec<TypeSignature>),
}

impl SymbolicReference {
    /// Returns a short description for log lines.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            SymbolicReference::Field {
                declaring_type,
                name,
                ..
            } => format!("field {}::{}", describe_type(declaring_type), name),
            SymbolicReference::Method(method) => format!(
                "method {}::{}",
                describe_type(&method.declaring_type),
                method.name
            ),
            SymbolicReference::Type(sig) => format!("type {}", describe_type(sig)),
            SymbolicReference::MethodSpec(method, args) => format!(
                "method {}::{}<{} type arguments>",
                describe_type(&method.declaring_type),
                method.name,
                args.len()
            ),
        }
    }
}

pub(crate) fn describe_type(sig: &TypeSignature) -> String {
    match sig {
        TypeSignature::GenericInst(definition, _) => describe_type(definition),
        TypeSignature::SzArray(element) => format!("{}[]", describe_type(element)),
        TypeSignature::ByRef(element) => format!("{}&", describe_type(element)),
        TypeSignature::Ptr(element) => format!("{}*", describe_type(element)),
        other => other
            .type_name()
            .map_or_else(|| format!("{other:?}"), |name| name.to_string()),
    }
}

/// A method defined in a compiled module.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDefinition {
    /// `MethodDef` token
    pub token: Token,
    /// Method name
    pub name: String,
    /// Method signature
    pub signature: SignatureMethod,
    /// The method body; `None` for abstract, extern and runtime-implemented methods
    pub body: Option<MethodBody>,
}

impl MethodDefinition {
    /// Returns `true` for static constructors.
    #[must_use]
    pub fn is_type_initializer(&self) -> bool {
        self.name == TYPE_INITIALIZER
    }
}

/// A type defined in a compiled module.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDefinition {
    /// `TypeDef` token
    pub token: Token,
    /// Qualified name
    pub name: TypeName,
    /// Short type names of the custom attributes applied to the type
    pub attributes: Vec<String>,
    /// Methods declared by the type
    pub methods: Vec<MethodDefinition>,
}

impl TypeDefinition {
    /// Returns `true` if one of the type's attributes is named exactly like one of `markers`.
    #[must_use]
    pub fn has_marker(&self, markers: &[String]) -> bool {
        self.attributes
            .iter()
            .any(|attribute| markers.iter().any(|marker| marker == attribute))
    }
}

/// A decoded module file.
#[derive(Debug, Clone, Default)]
pub struct CompiledModule {
    /// Module name, e.g. `MyMod.dll`
    pub name: String,
    /// Simple name of the assembly the module belongs to
    pub assembly: String,
    /// Type definitions in metadata order
    pub types: Vec<TypeDefinition>,
    /// Referenced entities by token
    pub references: HashMap<Token, SymbolicReference>,
    /// `#US` heap strings by `ldstr` token
    pub user_strings: HashMap<Token, String>,
}

impl CompiledModule {
    /// Looks up the entity a token refers to.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnresolvedSymbol`] if the module does not describe the token.
    pub fn reference(&self, token: Token) -> Result<&SymbolicReference> {
        self.references
            .get(&token)
            .ok_or_else(|| unresolved_error!("token {} is not described by {}", token, self.name))
    }

    /// Looks up a user string.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnresolvedSymbol`] if the module has no string for the token.
    pub fn user_string(&self, token: Token) -> Result<&str> {
        self.user_strings
            .get(&token)
            .map(String::as_str)
            .ok_or_else(|| unresolved_error!("user string {} is missing in {}", token, self.name))
    }
}

/// Decodes the metadata tables of a validated module image.
///
/// Implementations fill [`MethodBody::locals`] from the local variable signatures and map
/// every token that appears in a method body (type, field, method, member and method spec
/// tokens) into [`CompiledModule::references`].
pub trait MetadataDecoder {
    /// Decodes `file` into a [`CompiledModule`].
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata cannot be decoded.
    fn decode(&self, file: &File) -> Result<CompiledModule>;
}

/// Opens the module file at a path and decodes it.
pub trait ModuleSource {
    /// Loads the module stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or decoded.
    fn load(&self, path: &Path) -> Result<CompiledModule>;
}

/// [`ModuleSource`] for PE files on disk.
///
/// The file is memory-mapped and checked for a CLR runtime header before the decoder sees it.
pub struct PeModuleSource<D> {
    decoder: D,
}

impl<D: MetadataDecoder> PeModuleSource<D> {
    /// Creates a module source that hands validated images to `decoder`.
    pub fn new(decoder: D) -> Self {
        PeModuleSource { decoder }
    }
}

impl<D: MetadataDecoder> ModuleSource for PeModuleSource<D> {
    fn load(&self, path: &Path) -> Result<CompiledModule> {
        let file = File::from_file(path)?;
        self.decoder.decode(&file)
    }
}
