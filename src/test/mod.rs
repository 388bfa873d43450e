//! Shared test fixtures.
//!
//! [`Scenario`] wires a small plugin module into an in-memory host: the disk side is a
//! [`CompiledModule`] served by a [`MockModuleSource`], the live side a [`MockRuntime`] whose
//! bodies start out identical to the disk bodies. Tests edit the disk module, run a pass and
//! observe the result through the interpreter of [`MockHost`].

mod host;
mod logging;

pub use host::*;
pub use image::*;
pub use logging::*;
pub use runtime::*;

use crate::{
    assembly::{decode_stream, encode_instructions, InstructionEncoder, Operand},
    hotswap::{HotSwap, ModuleIndex, ReplacementRegistry},
    metadata::{
        method::MethodBody,
        module::{
            CompiledModule, MethodDefinition, MethodReference, SymbolicReference, TypeDefinition,
        },
        signatures::{SignatureMethod, TypeSignature},
        token::Token,
        typename::TypeName,
    },
    runtime::{
        FieldHandle, LiveBody, LiveSymbol, MethodHandle, ModuleHandle, RuntimeView, TypeHandle,
    },
    Parser,
};

/// Path the scenario module is registered under.
pub const MOD_PATH: &str = "/mods/Mod/Assemblies/Mod.dll";

/// `Counter.Value`
pub const VALUE: Token = Token(0x0400_0001);
/// `Util.Take<string>`
pub const TAKE_STRING: Token = Token(0x2B00_0001);
/// `Util.Take<int>`
pub const TAKE_INT: Token = Token(0x2B00_0002);
/// `"hello"`
pub const GREETING: Token = Token(0x7000_0001);
/// `System.Exception`
pub const EXCEPTION: Token = Token(0x0100_0001);
/// A field the module references but the process does not have
pub const MISSING_FIELD: Token = Token(0x0400_0009);

/// Lays out `code` and decodes it into a fat body.
pub fn assemble(code: &[(&str, Operand)], max_stack: usize) -> MethodBody {
    let mut encoder = InstructionEncoder::new();
    for (mnemonic, operand) in code {
        encoder.emit_instruction(mnemonic, operand.clone()).unwrap();
    }

    let bytes = encoder.finalize();
    let instructions = decode_stream(&mut Parser::new(&bytes)).unwrap();
    MethodBody::from_instructions(instructions, max_stack)
}

/// The body the host would report for a method compiled from `body`.
pub fn live_body(body: &MethodBody) -> LiveBody {
    LiveBody {
        code: encode_instructions(&body.instructions).unwrap(),
        max_stack: body.max_stack,
        local_var_sig_token: body.local_var_sig_token,
        init_locals: body.is_init_local,
        exception_handlers: body.exception_handlers.clone(),
    }
}

fn class(namespace: &str, name: &str) -> TypeSignature {
    TypeSignature::Class(TypeName::new(namespace, name))
}

fn take_reference() -> MethodReference {
    MethodReference {
        declaring_type: class("Mod", "Util"),
        name: "Take".into(),
        signature: SignatureMethod::new(
            TypeSignature::Void,
            vec![TypeSignature::GenericParamMethod(0)],
        )
        .generic(1),
    }
}

pub fn tick_code(step: &'static str) -> Vec<(&'static str, Operand)> {
    vec![
        ("ldsfld", Operand::Token(VALUE)),
        (step, Operand::None),
        ("add", Operand::None),
        ("stsfld", Operand::Token(VALUE)),
        ("ret", Operand::None),
    ]
}

fn method(
    token: u32,
    name: &str,
    signature: SignatureMethod,
    body: MethodBody,
) -> MethodDefinition {
    MethodDefinition {
        token: Token(token),
        name: name.into(),
        signature,
        body: Some(body),
    }
}

/// The plugin module as the compiler last wrote it.
pub fn disk_module() -> CompiledModule {
    let counter = TypeDefinition {
        token: Token(0x0200_0002),
        name: TypeName::new("Mod", COUNTER_TYPE),
        attributes: vec!["HotSwappable".into()],
        methods: vec![
            method(
                0x0600_0001,
                ".cctor",
                SignatureMethod::new(TypeSignature::Void, vec![]),
                assemble(
                    &[
                        ("ldc.i4.5", Operand::None),
                        ("stsfld", Operand::Token(VALUE)),
                        ("ret", Operand::None),
                    ],
                    1,
                ),
            ),
            method(
                0x0600_0002,
                "Tick",
                SignatureMethod::new(TypeSignature::Void, vec![]),
                assemble(&tick_code("ldc.i4.1"), 2),
            ),
            method(
                0x0600_0003,
                "Get",
                SignatureMethod::new(TypeSignature::I4, vec![]),
                assemble(
                    &[("ldsfld", Operand::Token(VALUE)), ("ret", Operand::None)],
                    1,
                ),
            ),
            MethodDefinition {
                token: Token(0x0600_0004),
                name: "Describe".into(),
                signature: SignatureMethod::new(TypeSignature::String, vec![]),
                body: None,
            },
        ],
    };

    let greeter = TypeDefinition {
        token: Token(0x0200_0003),
        name: TypeName::new("Mod", "Greeter"),
        attributes: vec!["HotSwappableAttribute".into()],
        methods: vec![method(
            0x0600_0005,
            "Greet",
            SignatureMethod::new(TypeSignature::Void, vec![]),
            assemble(
                &[
                    ("ldstr", Operand::Token(GREETING)),
                    ("call", Operand::Token(TAKE_STRING)),
                    ("ret", Operand::None),
                ],
                1,
            ),
        )],
    };

    let util = TypeDefinition {
        token: Token(0x0200_0004),
        name: TypeName::new("Mod", "Util"),
        attributes: Vec::new(),
        methods: vec![method(
            0x0600_0006,
            "Take",
            take_reference().signature,
            assemble(&[("ret", Operand::None)], 1),
        )],
    };

    let mut module = CompiledModule {
        name: "Mod.dll".into(),
        assembly: "Mod".into(),
        types: vec![counter, greeter, util],
        ..CompiledModule::default()
    };

    let references = [
        (
            VALUE,
            SymbolicReference::Field {
                declaring_type: class("Mod", COUNTER_TYPE),
                name: "Value".into(),
                signature: TypeSignature::I4,
            },
        ),
        (
            MISSING_FIELD,
            SymbolicReference::Field {
                declaring_type: class("Mod", COUNTER_TYPE),
                name: "Missing".into(),
                signature: TypeSignature::I4,
            },
        ),
        (
            TAKE_STRING,
            SymbolicReference::MethodSpec(take_reference(), vec![TypeSignature::String]),
        ),
        (
            TAKE_INT,
            SymbolicReference::MethodSpec(take_reference(), vec![TypeSignature::I4]),
        ),
        (
            EXCEPTION,
            SymbolicReference::Type(class("System", "Exception")),
        ),
    ];
    module.references.extend(references);
    module.user_strings.insert(GREETING, "hello".into());
    module
}

/// A host that loaded [`disk_module`] and a developer about to edit it.
pub struct Scenario {
    pub host: MockHost,
    pub source: MockModuleSource,
    pub modules: ModuleIndex,
    pub registry: ReplacementRegistry,
    pub counter: TypeHandle,
    pub value: FieldHandle,
    pub cctor: MethodHandle,
    pub tick: MethodHandle,
    pub get: MethodHandle,
    pub greet: MethodHandle,
    pub take: MethodHandle,
}

impl Scenario {
    pub fn new() -> Self {
        let disk = disk_module();
        let body_of = |type_index: usize, method_index: usize| {
            live_body(
                disk.types[type_index].methods[method_index]
                    .body
                    .as_ref()
                    .unwrap(),
            )
        };

        let mut runtime = MockRuntime::new();
        runtime.add_system_types();

        let counter = runtime.add_type(TypeName::new("Mod", COUNTER_TYPE).in_assembly("Mod"));
        let value = runtime.add_field(counter, "Value");
        let void = SignatureMethod::new(class("System", "Void"), vec![]);
        let cctor = runtime.add_method(counter, ".cctor", void.clone());
        let tick = runtime.add_method(counter, "Tick", void.clone());
        // Reflection reports the System type behind the `int32` of the disk signature
        let get = runtime.add_method(
            counter,
            "Get",
            SignatureMethod::new(class("System", "Int32"), vec![]),
        );
        runtime.add_method(
            counter,
            "Describe",
            SignatureMethod::new(class("System", "String"), vec![]),
        );
        runtime.set_body(cctor, body_of(0, 0));
        runtime.set_body(tick, body_of(0, 1));
        runtime.set_body(get, body_of(0, 2));

        let greeter = runtime.add_type(TypeName::new("Mod", "Greeter").in_assembly("Mod"));
        let greet = runtime.add_method(greeter, "Greet", void);
        runtime.set_body(greet, body_of(1, 0));

        let util = runtime.add_type(TypeName::new("Mod", "Util").in_assembly("Mod"));
        let take = runtime.add_method(util, "Take", take_reference().signature);

        let take_string = runtime
            .make_generic_method(take, &[runtime.system_type("String")])
            .unwrap();
        let take_int = runtime
            .make_generic_method(take, &[runtime.system_type("Int32")])
            .unwrap();
        runtime.bind_token(VALUE, LiveSymbol::Field(value));
        runtime.bind_token(GREETING, LiveSymbol::String("hello".into()));
        runtime.bind_token(TAKE_STRING, LiveSymbol::Method(take_string));
        runtime.bind_token(TAKE_INT, LiveSymbol::Method(take_int));

        let source = MockModuleSource::default();
        source.insert(MOD_PATH, disk);

        let modules = ModuleIndex::new();
        modules.register(ModuleHandle(1), "Mod", MOD_PATH);

        Scenario {
            host: MockHost::new(runtime),
            source,
            modules,
            registry: ReplacementRegistry::new(),
            counter,
            value,
            cctor,
            tick,
            get,
            greet,
            take,
        }
    }

    pub fn swap(&self) -> HotSwap<'_> {
        HotSwap::new(
            &self.host.runtime,
            &self.host.emitter,
            &self.host.detour,
            &self.source,
            &self.modules,
            &self.registry,
        )
    }

    /// Recompiles `type_name::method` on disk with new code.
    pub fn edit(&self, type_name: &str, method: &str, code: &[(&str, Operand)], max_stack: usize) {
        let body = assemble(code, max_stack);
        self.source.edit(MOD_PATH, |module| {
            let method = module
                .types
                .iter_mut()
                .filter(|ty| ty.name.name == type_name)
                .flat_map(|ty| ty.methods.iter_mut())
                .find(|candidate| candidate.name == method)
                .unwrap();
            method.body = Some(body);
        });
    }

    /// The live instantiation of `Take<T>` for a `System` type argument.
    pub fn take_of(&self, system_type: &str) -> MethodHandle {
        let runtime = &self.host.runtime;
        runtime
            .make_generic_method(self.take, &[runtime.system_type(system_type)])
            .unwrap()
    }
}
