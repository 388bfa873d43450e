use crate::metadata::typename::TypeName;

/// A type as it appears in a signature.
///
/// Type references are carried by name rather than by token so that signatures read from a
/// disk module can be compared with signatures reported by the running process.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TypeSignature {
    /// Unknown or unsupported element type
    #[default]
    Unknown,
    /// `void`
    Void,
    /// `bool`
    Boolean,
    /// `char`
    Char,
    /// `sbyte`
    I1,
    /// `byte`
    U1,
    /// `short`
    I2,
    /// `ushort`
    U2,
    /// `int`
    I4,
    /// `uint`
    U4,
    /// `long`
    I8,
    /// `ulong`
    U8,
    /// `float`
    R4,
    /// `double`
    R8,
    /// `string`
    String,
    /// `object`
    Object,
    /// Native integer
    I,
    /// Native unsigned integer
    U,
    /// `System.TypedReference`
    TypedByRef,
    /// Unmanaged pointer
    Ptr(Box<TypeSignature>),
    /// Managed reference
    ByRef(Box<TypeSignature>),
    /// Pinned local variable
    Pinned(Box<TypeSignature>),
    /// A value type
    ValueType(TypeName),
    /// A reference type
    Class(TypeName),
    /// Generic parameter of the declaring type, by position
    GenericParamType(u32),
    /// Generic parameter of the method, by position
    GenericParamMethod(u32),
    /// Single-dimensional, zero-based array
    SzArray(Box<TypeSignature>),
    /// Multi-dimensional array with the given rank
    Array(Box<TypeSignature>, u32),
    /// Instantiation of a generic type definition
    GenericInst(Box<TypeSignature>, Vec<TypeSignature>),
    /// Function pointer
    FnPtr(Box<SignatureMethod>),
}

impl TypeSignature {
    /// Returns the `System` type name of a primitive element type.
    #[must_use]
    pub fn primitive_name(&self) -> Option<TypeName> {
        let name = match self {
            TypeSignature::Void => "Void",
            TypeSignature::Boolean => "Boolean",
            TypeSignature::Char => "Char",
            TypeSignature::I1 => "SByte",
            TypeSignature::U1 => "Byte",
            TypeSignature::I2 => "Int16",
            TypeSignature::U2 => "UInt16",
            TypeSignature::I4 => "Int32",
            TypeSignature::U4 => "UInt32",
            TypeSignature::I8 => "Int64",
            TypeSignature::U8 => "UInt64",
            TypeSignature::R4 => "Single",
            TypeSignature::R8 => "Double",
            TypeSignature::String => "String",
            TypeSignature::Object => "Object",
            TypeSignature::I => "IntPtr",
            TypeSignature::U => "UIntPtr",
            TypeSignature::TypedByRef => "TypedReference",
            _ => return None,
        };

        Some(TypeName::new("System", name))
    }

    /// Returns the name of a class, value type or primitive.
    #[must_use]
    pub fn type_name(&self) -> Option<TypeName> {
        match self {
            TypeSignature::Class(name) | TypeSignature::ValueType(name) => Some(name.clone()),
            _ => self.primitive_name(),
        }
    }
}

/// A method signature (ECMA-335 II.23.2.1).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureMethod {
    /// Instance method with an implicit `this`
    pub has_this: bool,
    /// `this` is passed explicitly as the first parameter
    pub explicit_this: bool,
    /// Variable argument list
    pub vararg: bool,
    /// Number of generic parameters of the method
    pub param_count_generic: u32,
    /// Return type
    pub return_type: TypeSignature,
    /// Parameter types
    pub params: Vec<TypeSignature>,
}

impl SignatureMethod {
    /// Creates a static, non-generic method signature.
    #[must_use]
    pub fn new(return_type: TypeSignature, params: Vec<TypeSignature>) -> Self {
        SignatureMethod {
            return_type,
            params,
            ..SignatureMethod::default()
        }
    }

    /// Marks the signature as an instance method.
    #[must_use]
    pub fn instance(mut self) -> Self {
        self.has_this = true;
        self
    }

    /// Sets the number of generic method parameters.
    #[must_use]
    pub fn generic(mut self, count: u32) -> Self {
        self.param_count_generic = count;
        self
    }
}
