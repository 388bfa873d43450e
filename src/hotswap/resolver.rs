//! Resolution of disk-module references against the running process.
//!
//! A disk module and the live reflection graph are two independent descriptions of the same
//! program, so nothing is matched by identity. Types are found by qualified name, fields by
//! name on their live declaring type, and methods by name plus a structural comparison of
//! their signatures. Generic instantiations are taken apart, every piece is resolved on its
//! own and the result is specialized again with the live type arguments.
//!
//! Every failure is reported as [`crate::Error::UnresolvedSymbol`]; a resolver never hands out
//! a partially resolved symbol.

use crate::{
    metadata::{
        module::{describe_type, CompiledModule, MethodReference, SymbolicReference},
        signatures::{method_sig_eq, TypeSignature},
        token::Token,
    },
    runtime::{
        FieldHandle, GenericOwner, LiveSymbol, MethodHandle, RuntimeView, TypeHandle, TypeShape,
    },
    Error, Result,
};

/// The live owners of generic parameters used by the body being relinked.
///
/// `!0` in a signature is resolved against `declaring_type`, `!!0` against `method`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenericContext {
    /// The live declaring type of the function being relinked
    pub declaring_type: Option<TypeHandle>,
    /// The live function being relinked
    pub method: Option<MethodHandle>,
}

impl GenericContext {
    /// Creates the context of a live method declared by `declaring_type`.
    #[must_use]
    pub fn new(declaring_type: TypeHandle, method: MethodHandle) -> Self {
        GenericContext {
            declaring_type: Some(declaring_type),
            method: Some(method),
        }
    }
}

/// Resolves the tokens of one disk module against a [`RuntimeView`].
pub struct SymbolResolver<'a> {
    runtime: &'a dyn RuntimeView,
    module: &'a CompiledModule,
    context: GenericContext,
}

impl<'a> SymbolResolver<'a> {
    /// Creates a resolver for references of `module`.
    pub fn new(
        runtime: &'a dyn RuntimeView,
        module: &'a CompiledModule,
        context: GenericContext,
    ) -> Self {
        SymbolResolver {
            runtime,
            module,
            context,
        }
    }

    /// Resolves a token operand of a method body.
    ///
    /// User string tokens pass through as [`LiveSymbol::String`], everything else is looked up
    /// in the module's reference table first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnresolvedSymbol`] if the module does not describe the token or the
    /// described entity does not exist live.
    pub fn resolve_token(&self, token: Token) -> Result<LiveSymbol> {
        if token.is_user_string() {
            return Ok(LiveSymbol::String(self.module.user_string(token)?.to_string()));
        }

        self.resolve(self.module.reference(token)?)
    }

    /// Resolves a symbolic reference.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnresolvedSymbol`] if the entity does not exist live.
    pub fn resolve(&self, reference: &SymbolicReference) -> Result<LiveSymbol> {
        match reference {
            SymbolicReference::Field {
                declaring_type,
                name,
                ..
            } => self
                .resolve_field(declaring_type, name)
                .map(LiveSymbol::Field),
            SymbolicReference::Method(method) => {
                self.resolve_method(method).map(LiveSymbol::Method)
            }
            SymbolicReference::Type(sig) => self.resolve_type(sig).map(LiveSymbol::Type),
            SymbolicReference::MethodSpec(method, args) => self
                .resolve_method_spec(method, args)
                .map(LiveSymbol::Method),
        }
    }

    /// Resolves a type signature to a live type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnresolvedSymbol`] if the type, or one of its components, is not
    /// loaded or cannot be constructed.
    pub fn resolve_type(&self, sig: &TypeSignature) -> Result<TypeHandle> {
        match sig {
            TypeSignature::GenericInst(definition, args) => {
                let definition_handle = self.resolve_type(definition)?;
                let args = self.resolve_types(args)?;
                self.runtime
                    .make_generic_type(definition_handle, &args)
                    .map_err(|error| refused(&describe_type(sig), &error))
            }
            TypeSignature::SzArray(element) => self.compose(sig, element, TypeShape::SzArray),
            TypeSignature::Array(element, rank) => {
                self.compose(sig, element, TypeShape::Array(*rank))
            }
            TypeSignature::ByRef(element) => self.compose(sig, element, TypeShape::ByRef),
            TypeSignature::Ptr(element) => self.compose(sig, element, TypeShape::Pointer),
            TypeSignature::Pinned(inner) => self.resolve_type(inner),
            TypeSignature::GenericParamType(position) => {
                let owner = self.context.declaring_type.ok_or_else(|| {
                    unresolved_error!("type parameter !{} outside of a generic type", position)
                })?;
                self.runtime
                    .generic_parameter(GenericOwner::Type(owner), *position)
                    .ok_or_else(|| unresolved_error!("type parameter !{} of {}", position, owner))
            }
            TypeSignature::GenericParamMethod(position) => {
                let owner = self.context.method.ok_or_else(|| {
                    unresolved_error!("method parameter !!{} outside of a generic method", position)
                })?;
                self.runtime
                    .generic_parameter(GenericOwner::Method(owner), *position)
                    .ok_or_else(|| {
                        unresolved_error!("method parameter !!{} of {}", position, owner)
                    })
            }
            other => {
                let name = other
                    .type_name()
                    .ok_or_else(|| unresolved_error!("type {:?} has no live equivalent", other))?;
                self.runtime
                    .find_type(&name)
                    .ok_or_else(|| unresolved_error!("type {} is not loaded", name))
            }
        }
    }

    fn resolve_types(&self, sigs: &[TypeSignature]) -> Result<Vec<TypeHandle>> {
        sigs.iter().map(|sig| self.resolve_type(sig)).collect()
    }

    fn compose(
        &self,
        sig: &TypeSignature,
        element: &TypeSignature,
        shape: TypeShape,
    ) -> Result<TypeHandle> {
        let element = self.resolve_type(element)?;
        self.runtime
            .compose_type(element, shape)
            .map_err(|error| refused(&describe_type(sig), &error))
    }

    fn resolve_field(&self, declaring_type: &TypeSignature, name: &str) -> Result<FieldHandle> {
        let owner = self.resolve_type(declaring_type)?;
        self.runtime.field(owner, name).ok_or_else(|| {
            unresolved_error!("field {}::{} does not exist", describe_type(declaring_type), name)
        })
    }

    /// Resolves a method of a plain or constructed generic type.
    ///
    /// Members of a constructed type are matched on the open generic definition, where the
    /// live signatures still carry the generic parameters the disk signature uses, and are
    /// then bound to the constructed type.
    fn resolve_method(&self, reference: &MethodReference) -> Result<MethodHandle> {
        let owner = self.resolve_type(&reference.declaring_type)?;

        let constructed = matches!(reference.declaring_type, TypeSignature::GenericInst(..));
        let lookup = if constructed {
            self.runtime.generic_type_definition(owner).ok_or_else(|| {
                unresolved_error!(
                    "{} has no generic definition",
                    describe_type(&reference.declaring_type)
                )
            })?
        } else {
            owner
        };

        let method = self
            .runtime
            .methods(lookup)
            .into_iter()
            .find(|info| {
                info.name == reference.name && method_sig_eq(&info.signature, &reference.signature)
            })
            .map(|info| info.handle)
            .ok_or_else(|| {
                unresolved_error!(
                    "method {}::{} with a matching signature does not exist",
                    describe_type(&reference.declaring_type),
                    reference.name
                )
            })?;

        if constructed && lookup != owner {
            self.runtime
                .bind_method(method, owner)
                .map_err(|error| refused(&reference.name, &error))
        } else {
            Ok(method)
        }
    }

    fn resolve_method_spec(
        &self,
        reference: &MethodReference,
        args: &[TypeSignature],
    ) -> Result<MethodHandle> {
        if reference.signature.param_count_generic as usize != args.len() {
            return Err(unresolved_error!(
                "method {}::{} takes {} type arguments, {} given",
                describe_type(&reference.declaring_type),
                reference.name,
                reference.signature.param_count_generic,
                args.len()
            ));
        }

        let definition = self.resolve_method(reference)?;
        let args = self.resolve_types(args)?;
        self.runtime
            .make_generic_method(definition, &args)
            .map_err(|error| refused(&reference.name, &error))
    }
}

fn refused(what: &str, error: &Error) -> Error {
    match error {
        Error::UnresolvedSymbol(message) => Error::UnresolvedSymbol(message.clone()),
        other => unresolved_error!("{}: {}", what, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        metadata::{signatures::SignatureMethod, typename::TypeName},
        test::{MockRuntime, COUNTER_TYPE, GENERIC_LIST},
    };

    fn class(namespace: &str, name: &str) -> TypeSignature {
        TypeSignature::Class(TypeName::new(namespace, name))
    }

    #[test]
    fn strings_pass_through() {
        let runtime = MockRuntime::new();
        let mut module = CompiledModule::default();
        module
            .user_strings
            .insert(Token::new(0x7000_0005), "hello".into());

        let resolver = SymbolResolver::new(&runtime, &module, GenericContext::default());
        assert_eq!(
            resolver.resolve_token(Token::new(0x7000_0005)).unwrap(),
            LiveSymbol::String("hello".into())
        );
        assert!(matches!(
            resolver.resolve_token(Token::new(0x7000_0006)),
            Err(Error::UnresolvedSymbol(_))
        ));
    }

    #[test]
    fn fields_by_name() {
        let mut runtime = MockRuntime::new();
        let counter = runtime.add_type(TypeName::new("Mod", COUNTER_TYPE));
        let value = runtime.add_field(counter, "Value");
        let module = CompiledModule::default();
        let resolver = SymbolResolver::new(&runtime, &module, GenericContext::default());

        let found = resolver
            .resolve(&SymbolicReference::Field {
                declaring_type: class("Mod", COUNTER_TYPE),
                name: "Value".into(),
                signature: TypeSignature::I4,
            })
            .unwrap();
        assert_eq!(found, LiveSymbol::Field(value));

        let missing = resolver.resolve(&SymbolicReference::Field {
            declaring_type: class("Mod", COUNTER_TYPE),
            name: "Valeu".into(),
            signature: TypeSignature::I4,
        });
        assert!(matches!(missing, Err(Error::UnresolvedSymbol(_))));

        let unknown_type = resolver.resolve(&SymbolicReference::Field {
            declaring_type: class("Mod", "Gone"),
            name: "Value".into(),
            signature: TypeSignature::I4,
        });
        assert!(matches!(unknown_type, Err(Error::UnresolvedSymbol(_))));
    }

    #[test]
    fn methods_by_signature() {
        let mut runtime = MockRuntime::new();
        let math = runtime.add_type(TypeName::new("Mod", "Math"));
        let int_version = runtime.add_method(
            math,
            "Twice",
            SignatureMethod::new(TypeSignature::I4, vec![TypeSignature::I4]),
        );
        let string_version = runtime.add_method(
            math,
            "Twice",
            SignatureMethod::new(TypeSignature::String, vec![TypeSignature::String]),
        );
        let module = CompiledModule::default();
        let resolver = SymbolResolver::new(&runtime, &module, GenericContext::default());

        let reference = |ret: TypeSignature, param: TypeSignature| {
            SymbolicReference::Method(MethodReference {
                declaring_type: class("Mod", "Math"),
                name: "Twice".into(),
                signature: SignatureMethod::new(ret, vec![param]),
            })
        };

        assert_eq!(
            resolver
                .resolve(&reference(TypeSignature::I4, TypeSignature::I4))
                .unwrap(),
            LiveSymbol::Method(int_version)
        );
        // Reflection reports System.String where the blob says `string`
        assert_eq!(
            resolver
                .resolve(&reference(
                    class("System", "String"),
                    class("System", "String")
                ))
                .unwrap(),
            LiveSymbol::Method(string_version)
        );
        assert!(matches!(
            resolver.resolve(&reference(TypeSignature::I8, TypeSignature::I8)),
            Err(Error::UnresolvedSymbol(_))
        ));
    }

    #[test]
    fn generic_method_instantiation() {
        let mut runtime = MockRuntime::new();
        runtime.add_system_types();
        let util = runtime.add_type(TypeName::new("Mod", "Util"));
        let take = runtime.add_method(
            util,
            "Take",
            SignatureMethod::new(TypeSignature::Void, vec![TypeSignature::GenericParamMethod(0)])
                .generic(1),
        );
        let module = CompiledModule::default();
        let resolver = SymbolResolver::new(&runtime, &module, GenericContext::default());

        let definition = MethodReference {
            declaring_type: class("Mod", "Util"),
            name: "Take".into(),
            signature: SignatureMethod::new(
                TypeSignature::Void,
                vec![TypeSignature::GenericParamMethod(0)],
            )
            .generic(1),
        };

        let string_take = resolver
            .resolve(&SymbolicReference::MethodSpec(
                definition.clone(),
                vec![TypeSignature::String],
            ))
            .unwrap();
        let int_take = resolver
            .resolve(&SymbolicReference::MethodSpec(
                definition.clone(),
                vec![TypeSignature::I4],
            ))
            .unwrap();

        assert_ne!(string_take, int_take);
        let LiveSymbol::Method(int_take) = int_take else {
            panic!("expected a method");
        };
        assert_eq!(
            runtime.instantiation_of(int_take),
            Some((take, vec![runtime.system_type("Int32")]))
        );

        let wrong_arity = resolver.resolve(&SymbolicReference::MethodSpec(
            definition,
            vec![TypeSignature::I4, TypeSignature::I4],
        ));
        assert!(matches!(wrong_arity, Err(Error::UnresolvedSymbol(_))));
    }

    #[test]
    fn members_of_constructed_types() {
        let mut runtime = MockRuntime::new();
        runtime.add_system_types();
        let list = runtime.add_generic_type(TypeName::new("Mod", GENERIC_LIST), 1);
        let add = runtime.add_method(
            list,
            "Add",
            SignatureMethod::new(TypeSignature::Void, vec![TypeSignature::GenericParamType(0)])
                .instance(),
        );
        let module = CompiledModule::default();
        let resolver = SymbolResolver::new(&runtime, &module, GenericContext::default());

        let list_of_int = TypeSignature::GenericInst(
            Box::new(class("Mod", GENERIC_LIST)),
            vec![TypeSignature::I4],
        );
        let resolved = resolver
            .resolve(&SymbolicReference::Method(MethodReference {
                declaring_type: list_of_int.clone(),
                name: "Add".into(),
                signature: SignatureMethod::new(
                    TypeSignature::Void,
                    vec![TypeSignature::GenericParamType(0)],
                )
                .instance(),
            }))
            .unwrap();

        let LiveSymbol::Method(bound) = resolved else {
            panic!("expected a method");
        };
        let constructed = resolver.resolve_type(&list_of_int).unwrap();
        assert_eq!(runtime.binding_of(bound), Some((add, constructed)));
    }

    #[test]
    fn generic_parameters_need_a_context() {
        let mut runtime = MockRuntime::new();
        let list = runtime.add_generic_type(TypeName::new("Mod", GENERIC_LIST), 1);
        let module = CompiledModule::default();

        let without = SymbolResolver::new(&runtime, &module, GenericContext::default());
        assert!(without
            .resolve_type(&TypeSignature::GenericParamType(0))
            .is_err());

        let with = SymbolResolver::new(
            &runtime,
            &module,
            GenericContext {
                declaring_type: Some(list),
                method: None,
            },
        );
        let param = with
            .resolve_type(&TypeSignature::GenericParamType(0))
            .unwrap();
        assert_eq!(
            runtime.generic_parameter(GenericOwner::Type(list), 0),
            Some(param)
        );
        assert!(with
            .resolve_type(&TypeSignature::GenericParamType(1))
            .is_err());
    }

    #[test]
    fn composed_types() {
        let mut runtime = MockRuntime::new();
        runtime.add_system_types();
        let module = CompiledModule::default();
        let resolver = SymbolResolver::new(&runtime, &module, GenericContext::default());

        let array = resolver
            .resolve_type(&TypeSignature::SzArray(Box::new(TypeSignature::I4)))
            .unwrap();
        let again = resolver
            .resolve_type(&TypeSignature::SzArray(Box::new(TypeSignature::I4)))
            .unwrap();
        assert_eq!(array, again);
        assert_ne!(array, runtime.system_type("Int32"));

        assert!(resolver
            .resolve_type(&TypeSignature::FnPtr(Box::default()))
            .is_err());
    }

    #[test]
    fn stand_alone_signatures_are_unresolved() {
        let runtime = MockRuntime::new();
        let module = CompiledModule::default();
        let resolver = SymbolResolver::new(&runtime, &module, GenericContext::default());

        assert!(matches!(
            resolver.resolve_token(Token::new(0x1100_0001)),
            Err(Error::UnresolvedSymbol(_))
        ));
    }
}
