//! Host capabilities for tests: a recording emitter, a detour table, a module source serving
//! prepared modules, and an interpreter that runs live and replacement bodies.

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    path::{Path, PathBuf},
};

use crate::{
    assembly::{decode_stream, Immediate, Instruction, Operand},
    metadata::{
        module::{CompiledModule, ModuleSource},
        signatures::TypeSignature,
        token::Token,
    },
    runtime::{
        Detour, ExecutableHandle, LiveSymbol, MethodEmitter, MethodHandle, ReplacementDefinition,
        RuntimeView,
    },
    test::runtime::{MockRuntime, Value},
    Error, Parser, Result,
};

/// Records every definition and hands out sequential handles.
#[derive(Debug, Default)]
pub struct MockEmitter {
    definitions: RefCell<Vec<ReplacementDefinition>>,
    prepared: RefCell<Vec<ExecutableHandle>>,
    pub reject: Cell<bool>,
}

impl MockEmitter {
    pub fn definition(&self, executable: ExecutableHandle) -> Option<ReplacementDefinition> {
        self.definitions
            .borrow()
            .get(executable.0 as usize)
            .cloned()
    }

    pub fn defined(&self) -> usize {
        self.definitions.borrow().len()
    }

    pub fn is_prepared(&self, executable: ExecutableHandle) -> bool {
        self.prepared.borrow().contains(&executable)
    }
}

impl MethodEmitter for MockEmitter {
    fn define(&self, definition: ReplacementDefinition) -> Result<ExecutableHandle> {
        if self.reject.get() {
            return Err(Error::Error(format!("cannot define {}", definition.name)));
        }

        let mut definitions = self.definitions.borrow_mut();
        definitions.push(definition);
        Ok(ExecutableHandle(definitions.len() as u64 - 1))
    }

    fn prepare(&self, executable: ExecutableHandle) -> Result<()> {
        self.prepared.borrow_mut().push(executable);
        Ok(())
    }
}

/// Redirection table; can be told to refuse.
#[derive(Debug, Default)]
pub struct MockDetour {
    redirects: RefCell<HashMap<MethodHandle, ExecutableHandle>>,
    pub refuse: Cell<bool>,
}

impl MockDetour {
    pub fn target(&self, original: MethodHandle) -> Option<ExecutableHandle> {
        self.redirects.borrow().get(&original).copied()
    }
}

impl Detour for MockDetour {
    fn redirect(&self, original: MethodHandle, replacement: ExecutableHandle) -> Result<()> {
        if self.refuse.get() {
            return Err(Error::Error(format!(
                "signature of {replacement} is incompatible with {original}"
            )));
        }

        self.redirects.borrow_mut().insert(original, replacement);
        Ok(())
    }
}

/// Serves modules from memory; unknown paths fail like a missing file.
#[derive(Debug, Default)]
pub struct MockModuleSource {
    modules: RefCell<HashMap<PathBuf, CompiledModule>>,
    loads: Cell<usize>,
}

impl MockModuleSource {
    pub fn insert(&self, path: impl Into<PathBuf>, module: CompiledModule) {
        self.modules.borrow_mut().insert(path.into(), module);
    }

    /// Applies `edit` to the module stored at `path`, as a rebuild would.
    pub fn edit(&self, path: impl AsRef<Path>, edit: impl FnOnce(&mut CompiledModule)) {
        if let Some(module) = self.modules.borrow_mut().get_mut(path.as_ref()) {
            edit(module);
        }
    }

    pub fn loads(&self) -> usize {
        self.loads.get()
    }
}

impl ModuleSource for MockModuleSource {
    fn load(&self, path: &Path) -> Result<CompiledModule> {
        self.loads.set(self.loads.get() + 1);
        self.modules.borrow().get(path).cloned().ok_or_else(|| {
            Error::FileError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            ))
        })
    }
}

/// The host process: runtime, emitter and detour, plus an interpreter that follows redirects.
#[derive(Debug, Default)]
pub struct MockHost {
    pub runtime: MockRuntime,
    pub emitter: MockEmitter,
    pub detour: MockDetour,
    calls: RefCell<Vec<MethodHandle>>,
}

impl MockHost {
    pub fn new(runtime: MockRuntime) -> Self {
        MockHost {
            runtime,
            ..MockHost::default()
        }
    }

    /// Every method invoked so far, callees included.
    pub fn calls(&self) -> Vec<MethodHandle> {
        self.calls.borrow().clone()
    }

    /// Calls `method` the way the process would: through its redirect, if there is one.
    pub fn invoke(&self, method: MethodHandle, args: &[Value]) -> Result<Option<Value>> {
        self.calls.borrow_mut().push(method);

        if let Some(executable) = self.detour.target(method) {
            let definition = self
                .emitter
                .definition(executable)
                .ok_or_else(|| Error::Error(format!("{executable} was never defined")))?;
            return self.execute(
                &definition.code,
                &|token| definition.symbols.get(token).cloned(),
                args,
            );
        }

        match self.runtime.method_body(method) {
            Ok(body) => self.execute(&body.code, &|token| self.runtime.live_symbol(token), args),
            // Bodiless methods (e.g. instantiated generics) only leave a trace in the call log
            Err(_) => Ok(None),
        }
    }

    fn execute(
        &self,
        code: &[u8],
        resolve: &dyn Fn(Token) -> Option<LiveSymbol>,
        args: &[Value],
    ) -> Result<Option<Value>> {
        let instructions = decode_stream(&mut Parser::new(code))?;
        let symbol = |token: Option<Token>| {
            token
                .and_then(resolve)
                .ok_or_else(|| Error::Error(format!("token {token:?} does not resolve")))
        };

        let mut stack: Vec<Value> = Vec::new();
        let mut index = 0;
        while let Some(instruction) = instructions.get(index) {
            let mut next = index + 1;

            match instruction.mnemonic {
                "nop" => {}
                "ldc.i4.m1" => stack.push(Value::Int(-1)),
                "ldc.i4.s" | "ldc.i4" | "ldc.i8" => stack.push(Value::Int(immediate(instruction)?)),
                mnemonic if mnemonic.starts_with("ldc.i4.") => {
                    let value = mnemonic["ldc.i4.".len()..]
                        .parse()
                        .map_err(|_| Error::Error(format!("bad constant {mnemonic}")))?;
                    stack.push(Value::Int(value));
                }
                mnemonic if mnemonic.starts_with("ldarg.") => {
                    let position: usize = mnemonic["ldarg.".len()..]
                        .parse()
                        .map_err(|_| Error::Error(format!("unsupported {mnemonic}")))?;
                    let value = args
                        .get(position)
                        .cloned()
                        .ok_or_else(|| Error::Error(format!("missing argument {position}")))?;
                    stack.push(value);
                }
                "ldstr" => match symbol(instruction.token())? {
                    LiveSymbol::String(value) => stack.push(Value::Str(value)),
                    other => return Err(Error::Error(format!("ldstr of {other:?}"))),
                },
                "ldsfld" => match symbol(instruction.token())? {
                    LiveSymbol::Field(field) => stack.push(self.runtime.static_value(field)),
                    other => return Err(Error::Error(format!("ldsfld of {other:?}"))),
                },
                "stsfld" => match symbol(instruction.token())? {
                    LiveSymbol::Field(field) => {
                        let value = pop(&mut stack)?;
                        self.runtime.set_static(field, value);
                    }
                    other => return Err(Error::Error(format!("stsfld of {other:?}"))),
                },
                "add" | "sub" | "mul" => {
                    let (Value::Int(right), Value::Int(left)) = (pop(&mut stack)?, pop(&mut stack)?)
                    else {
                        return Err(Error::Error("arithmetic on strings".into()));
                    };
                    stack.push(Value::Int(match instruction.mnemonic {
                        "add" => left + right,
                        "sub" => left - right,
                        _ => left * right,
                    }));
                }
                "call" => {
                    let LiveSymbol::Method(callee) = symbol(instruction.token())? else {
                        return Err(Error::Error("call of a non-method".into()));
                    };
                    let signature = self.runtime.signature_of(callee)?;
                    let count = signature.params.len() + usize::from(signature.has_this);
                    let split = stack
                        .len()
                        .checked_sub(count)
                        .ok_or_else(|| Error::Error("stack underflow".into()))?;
                    let call_args = stack.split_off(split);

                    let result = self.invoke(callee, &call_args)?;
                    if signature.return_type != TypeSignature::Void {
                        stack.push(result.unwrap_or(Value::Int(0)));
                    }
                }
                "pop" => {
                    pop(&mut stack)?;
                }
                "dup" => {
                    let top = pop(&mut stack)?;
                    stack.push(top.clone());
                    stack.push(top);
                }
                "br" | "br.s" | "brtrue" | "brtrue.s" | "brfalse" | "brfalse.s" => {
                    let Operand::Target(target) = instruction.operand else {
                        return Err(Error::Error("branch without target".into()));
                    };
                    let taken = match instruction.mnemonic.trim_end_matches(".s") {
                        "br" => true,
                        "brtrue" => pop(&mut stack)? != Value::Int(0),
                        _ => pop(&mut stack)? == Value::Int(0),
                    };
                    if taken {
                        next = instructions
                            .iter()
                            .position(|candidate| candidate.offset == target)
                            .ok_or_else(|| Error::Error(format!("no instruction at {target}")))?;
                    }
                }
                "ret" => return Ok(stack.pop()),
                other => return Err(Error::Error(format!("unsupported instruction {other}"))),
            }

            index = next;
        }

        Err(Error::Error("fell off the end of the method".into()))
    }
}

fn pop(stack: &mut Vec<Value>) -> Result<Value> {
    stack
        .pop()
        .ok_or_else(|| Error::Error("stack underflow".into()))
}

fn immediate(instruction: &Instruction) -> Result<i64> {
    match instruction.operand {
        Operand::Immediate(Immediate::Int8(value)) => Ok(i64::from(value)),
        Operand::Immediate(Immediate::Int32(value)) => Ok(i64::from(value)),
        Operand::Immediate(Immediate::Int64(value)) => Ok(value),
        _ => Err(Error::Error(format!("{} without integer operand", instruction.mnemonic))),
    }
}
