//! The hot-swap pass.
//!
//! A pass walks every registered module, reopens its file and compares each function of the
//! opted-in types with what the process currently runs. Functions whose canonical encodings
//! differ are relinked against the live process, emitted as new methods and activated through
//! the host's [`Detour`].
//!
//! Failures are contained where they happen. A module that cannot be read is skipped, a
//! function that cannot be paired, relinked or activated is skipped, and the pass carries on
//! with the rest. Every skipped item is logged with its type and function name.

use std::{cell::Cell, fmt};

use strum::Display;

use crate::{
    assembly::encode_body,
    hotswap::{
        config::{DiffBaseline, HotSwapConfig},
        index::{ModuleEntry, ModuleIndex},
        registry::{Replacement, ReplacementRegistry},
        relink::relink,
        resolver::{GenericContext, SymbolResolver},
    },
    metadata::{
        method::MethodBody,
        module::{CompiledModule, MethodDefinition, ModuleSource, TypeDefinition},
        signatures::method_sig_eq,
        typename::TypeName,
    },
    runtime::{
        Detour, ExecutableHandle, LiveMethodInfo, MethodEmitter, MethodHandle,
        ReplacementDefinition, RuntimeView, TypeHandle,
    },
    Error, Result,
};

/// Where a pass currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum PassState {
    /// No pass is running
    #[default]
    Idle,
    /// Walking modules and types
    Scanning,
    /// The last function looked at needed no patch
    Unchanged,
    /// Building a replacement
    Relinking,
    /// The last replacement was activated
    Activated,
}

/// A function that was skipped because of an error.
#[derive(Debug)]
pub struct FunctionFailure {
    /// Full name of the declaring type
    pub type_name: String,
    /// Function name
    pub method: String,
    /// What went wrong
    pub error: Error,
}

/// Summary of one pass.
#[derive(Debug, Default)]
pub struct PassReport {
    /// Number of modules the pass looked at
    pub modules_scanned: usize,
    /// Modules whose file could not be read or decoded
    pub modules_failed: Vec<String>,
    /// Number of functions whose encoding matched the baseline
    pub unchanged: usize,
    /// Names of the replacements activated by the pass
    pub activated: Vec<String>,
    /// Functions skipped because of an error
    pub failures: Vec<FunctionFailure>,
}

impl PassReport {
    /// Returns `true` if nothing was skipped.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.modules_failed.is_empty() && self.failures.is_empty()
    }
}

impl fmt::Display for PassReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} modules scanned ({} failed), {} functions patched, {} unchanged, {} skipped",
            self.modules_scanned,
            self.modules_failed.len(),
            self.activated.len(),
            self.unchanged,
            self.failures.len()
        )
    }
}

enum Outcome {
    Unchanged,
    Activated(String),
}

/// Resets the pass state when a pass ends, however it ends.
struct IdleOnDrop<'s>(&'s Cell<PassState>);

impl Drop for IdleOnDrop<'_> {
    fn drop(&mut self) {
        self.0.set(PassState::Idle);
    }
}

/// The hot-swap orchestrator.
///
/// Holds the host capabilities and the process-scoped state a pass works with. Building one
/// is cheap; hosts typically build it on demand when the developer triggers a swap.
///
/// # Examples
///
/// ```rust,ignore
/// let registry = ReplacementRegistry::new();
/// let modules = ModuleIndex::new();
/// modules.register(module_handle, "MyMod", "/mods/MyMod/Assemblies/MyMod.dll");
///
/// let swap = HotSwap::new(&runtime, &emitter, &detour, &source, &modules, &registry);
/// swap.perform_hot_swap();
/// ```
pub struct HotSwap<'a> {
    runtime: &'a dyn RuntimeView,
    emitter: &'a dyn MethodEmitter,
    detour: &'a dyn Detour,
    source: &'a dyn ModuleSource,
    modules: &'a ModuleIndex,
    registry: &'a ReplacementRegistry,
    config: HotSwapConfig,
    state: Cell<PassState>,
}

impl<'a> HotSwap<'a> {
    /// Creates an orchestrator with the default configuration.
    pub fn new(
        runtime: &'a dyn RuntimeView,
        emitter: &'a dyn MethodEmitter,
        detour: &'a dyn Detour,
        source: &'a dyn ModuleSource,
        modules: &'a ModuleIndex,
        registry: &'a ReplacementRegistry,
    ) -> Self {
        HotSwap {
            runtime,
            emitter,
            detour,
            source,
            modules,
            registry,
            config: HotSwapConfig::default(),
            state: Cell::new(PassState::Idle),
        }
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: HotSwapConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &HotSwapConfig {
        &self.config
    }

    /// Returns the current pass state.
    #[must_use]
    pub fn state(&self) -> PassState {
        self.state.get()
    }

    /// Runs a pass and logs its outcome.
    pub fn perform_hot_swap(&self) {
        match self.run_pass() {
            Ok(report) => log::info!("Hot swap finished: {report}"),
            Err(error) => log::error!("Hot swap failed: {error}"),
        }
    }

    /// Runs a pass and reports what it did.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PassInProgress`] if another pass holds the registry and
    /// [`Error::HostState`] if no opt-in marker is configured. Everything that goes wrong
    /// after that is recorded in the report instead.
    pub fn run_pass(&self) -> Result<PassReport> {
        let _guard = self.registry.begin_pass()?;
        let _idle = IdleOnDrop(&self.state);

        if self.config.markers.is_empty() {
            return Err(Error::HostState("no opt-in markers are configured".into()));
        }

        let mut report = PassReport::default();
        for entry in self.modules.iter() {
            self.state.set(PassState::Scanning);
            report.modules_scanned += 1;

            let module = match self.source.load(&entry.path) {
                Ok(module) => module,
                Err(source) => {
                    let error = Error::ModuleParse {
                        path: entry.path.clone(),
                        source: Box::new(source),
                    };
                    log::error!("Skipping {}: {}", entry.name, error);
                    report.modules_failed.push(entry.name.clone());
                    continue;
                }
            };

            self.scan_module(entry, &module, &mut report);
        }

        Ok(report)
    }

    fn scan_module(&self, entry: &ModuleEntry, module: &CompiledModule, report: &mut PassReport) {
        log::debug!(
            "Scanning {} ({}, {})",
            entry.name,
            entry.module,
            entry.path.display()
        );

        for ty in module
            .types
            .iter()
            .filter(|ty| ty.has_marker(&self.config.markers))
        {
            let live_type = self.runtime.find_type(&live_name(module, &ty.name));

            for method in &ty.methods {
                let Some(body) = &method.body else {
                    continue;
                };
                if self.config.skip_type_initializers && method.is_type_initializer() {
                    continue;
                }

                let outcome = live_type
                    .ok_or_else(|| mismatch(ty, method))
                    .and_then(|live_type| {
                        self.patch_function(module, ty, live_type, method, body)
                    });

                match outcome {
                    Ok(Outcome::Unchanged) => report.unchanged += 1,
                    Ok(Outcome::Activated(name)) => report.activated.push(name),
                    Err(error) => {
                        log::error!("Cannot patch {}::{}: {}", ty.name, method.name, error);
                        report.failures.push(FunctionFailure {
                            type_name: ty.name.to_string(),
                            method: method.name.clone(),
                            error,
                        });
                    }
                }
            }
        }
    }

    fn patch_function(
        &self,
        module: &CompiledModule,
        ty: &TypeDefinition,
        live_type: TypeHandle,
        method: &MethodDefinition,
        body: &MethodBody,
    ) -> Result<Outcome> {
        let live = self
            .runtime
            .methods(live_type)
            .into_iter()
            .find(|info| {
                info.name == method.name && method_sig_eq(&info.signature, &method.signature)
            })
            .ok_or_else(|| mismatch(ty, method))?;

        let encoded = encode_body(body)?;
        if encoded == self.baseline(live.handle)? {
            log::debug!("{}::{} is unchanged", ty.name, method.name);
            self.state.set(PassState::Unchanged);
            return Ok(Outcome::Unchanged);
        }

        self.state.set(PassState::Relinking);
        log::debug!("Patching {}::{}", ty.name, method.name);

        let resolver = SymbolResolver::new(
            self.runtime,
            module,
            GenericContext::new(live_type, live.handle),
        );
        let relinked = relink(body, &resolver)?;

        let name = self
            .config
            .replacement_name(&method.name, self.registry.next_counter());
        let executable = self.emitter.define(ReplacementDefinition {
            name: name.clone(),
            original: live.handle,
            owner: live_type,
            signature: live.signature.clone(),
            max_stack: relinked.max_stack,
            init_locals: relinked.init_locals,
            locals: relinked.locals,
            code: relinked.code,
            symbols: relinked.symbols,
            regions: relinked.regions,
        })?;

        log::debug!("Preparing method {name}");
        self.emitter.prepare(executable)?;

        self.activate(&live, executable)?;
        self.registry.record(
            live.handle,
            Replacement {
                name: name.clone(),
                executable,
                baseline: encoded,
            },
        );

        self.state.set(PassState::Activated);
        log::info!("Patched {}::{} as {}", ty.name, method.name, name);
        Ok(Outcome::Activated(name))
    }

    fn baseline(&self, method: MethodHandle) -> Result<Vec<u8>> {
        if self.config.baseline == DiffBaseline::LastActivated {
            if let Some(baseline) = self.registry.baseline(method) {
                return Ok(baseline);
            }
        }

        self.runtime.method_body(method)?.canonical()
    }

    fn activate(&self, live: &LiveMethodInfo, executable: ExecutableHandle) -> Result<()> {
        log::debug!("Detouring {} to {}", live.name, executable);
        self.detour
            .redirect(live.handle, executable)
            .map_err(|error| match error {
                Error::ActivationFailure(_) => error,
                other => Error::ActivationFailure(other.to_string()),
            })
    }
}

/// Disk type names are looked up in the module's own assembly unless they name one.
fn live_name(module: &CompiledModule, name: &TypeName) -> TypeName {
    if name.assembly.is_some() || module.assembly.is_empty() {
        name.clone()
    } else {
        name.clone().in_assembly(module.assembly.as_str())
    }
}

fn mismatch(ty: &TypeDefinition, method: &MethodDefinition) -> Error {
    Error::SignatureMismatch {
        type_name: ty.name.to_string(),
        method: method.name.clone(),
    }
}
