use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{anyhow, Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rhai::{CallFnOptions, Dynamic, Engine, Map, Module, Scope, AST, FLOAT};
use tracing::{debug, info, warn};

use crate::scene::SceneContext;

/// Key of the shared runtime in the scene system's resource map.
pub const RUNTIME_KEY: &str = "script_runtime";

/// Lines of script output kept until a console drains them.
pub const OUTPUT_CAPACITY: usize = 256;

const MAX_OPERATIONS: u64 = 5_000_000;

pub type SharedRuntime = Rc<RefCell<ScriptRuntime>>;

#[derive(Debug, Clone, Default)]
pub struct ScriptOptions {
    /// Script evaluated once when the runtime starts.
    pub prelude: Option<PathBuf>,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone)]
pub enum HookOutcome {
    /// The installed program does not define the hook.
    Missing,
    Completed(Dynamic),
    Failed(String),
}

impl HookOutcome {
    pub fn error(&self) -> Option<&str> {
        match self {
            HookOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// The single script interpreter shared by every scene.
///
/// Executed source is evaluated for its side effects and its function
/// definitions are merged into the installed program, replacing same-named
/// hooks. Hooks run with a persistent state map bound as `this`.
pub struct ScriptRuntime {
    engine: Engine,
    program: Option<AST>,
    generation: u64,
    scope: Scope<'static>,
    state: Dynamic,
    output: Rc<RefCell<VecDeque<String>>>,
    prelude_loaded: bool,
}

impl ScriptRuntime {
    pub fn new(options: &ScriptOptions) -> Self {
        let mut engine = Engine::new();
        engine.set_fast_operators(true);
        engine.set_max_operations(MAX_OPERATIONS);

        let output = Rc::new(RefCell::new(VecDeque::new()));
        let sink = Rc::clone(&output);
        engine.on_print(move |text| {
            info!(target: "script", "{text}");
            push_output(&sink, text.to_string());
        });
        let sink = Rc::clone(&output);
        engine.on_debug(move |text, source, pos| {
            debug!(target: "script", "{} @ {pos}: {text}", source.unwrap_or("script"));
            push_output(&sink, format!("[debug] {text}"));
        });

        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        register_helpers(&mut engine, Rc::new(RefCell::new(rng)));

        let mut runtime = Self {
            engine,
            program: None,
            generation: 0,
            scope: Scope::new(),
            state: Dynamic::from_map(Map::new()),
            output,
            prelude_loaded: false,
        };
        if let Some(path) = &options.prelude {
            match runtime.run_file(path) {
                Ok(_) => {
                    runtime.prelude_loaded = true;
                    info!(target: "script", path = %path.display(), "prelude loaded");
                }
                Err(err) => warn!(target: "script", "prelude failed: {err:#}"),
            }
        }
        runtime
    }

    pub fn shared(options: &ScriptOptions) -> SharedRuntime {
        Rc::new(RefCell::new(Self::new(options)))
    }

    /// Stores `runtime` in the scene context unless one is already there.
    pub fn install(ctx: &mut SceneContext, runtime: SharedRuntime) -> bool {
        ctx.shared_mut().set(RUNTIME_KEY, runtime, |runtime| {
            debug!(target: "script", refs = Rc::strong_count(&runtime), "script runtime released");
        })
    }

    /// Returns the shared runtime, creating a default one on first use.
    pub fn obtain(ctx: &mut SceneContext) -> SharedRuntime {
        if let Some(runtime) = ctx.shared().get::<SharedRuntime>(RUNTIME_KEY) {
            return Rc::clone(runtime);
        }
        let runtime = Self::shared(&ScriptOptions::default());
        Self::install(ctx, Rc::clone(&runtime));
        runtime
    }

    pub fn register_namespace(&mut self, name: &str, module: Module) {
        self.engine.register_static_module(name, module.into());
        debug!(target: "script", namespace = name, "namespace registered");
    }

    pub fn prelude_loaded(&self) -> bool {
        self.prelude_loaded
    }

    /// Bumped every time new functions are installed.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn has_program(&self) -> bool {
        self.program.is_some()
    }

    pub fn has_hook(&self, name: &str, arity: usize) -> bool {
        self.program
            .as_ref()
            .is_some_and(|ast| ast.iter_functions().any(|f| f.name == name && f.params.len() == arity))
    }

    pub fn state(&self) -> &Dynamic {
        &self.state
    }

    /// Compiles and runs `source`, then installs the functions it defines.
    /// Source without function definitions leaves the program untouched.
    pub fn run_source(&mut self, source: &str) -> Result<Dynamic> {
        let ast = self.engine.compile(source).with_context(|| "Compiling Rhai script")?;
        let value = self
            .engine
            .eval_ast_with_scope::<Dynamic>(&mut self.scope, &ast)
            .map_err(|err| anyhow!("Running Rhai script: {err}"))?;
        if ast.iter_functions().next().is_some() {
            let functions = ast.clone_functions_only();
            self.program = Some(match self.program.take() {
                Some(mut program) => {
                    program.combine(functions);
                    program
                }
                None => functions,
            });
            self.generation += 1;
        }
        Ok(value)
    }

    /// Evaluates one console line. Returns the printable result, if any.
    pub fn eval_repl(&mut self, line: &str) -> Result<Option<String>> {
        let value = self.run_source(line)?;
        if value.is_unit() {
            Ok(None)
        } else {
            Ok(Some(value.to_string()))
        }
    }

    pub fn run_file(&mut self, path: &Path) -> Result<Dynamic> {
        let source = fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
        self.run_source(&source)
    }

    /// Calls a hook of the installed program with `this` bound to the state map.
    pub fn call_hook(&mut self, name: &str, args: Vec<Dynamic>) -> HookOutcome {
        if !self.has_hook(name, args.len()) {
            return HookOutcome::Missing;
        }
        let Some(ast) = &self.program else {
            return HookOutcome::Missing;
        };
        let options = CallFnOptions::new().eval_ast(false).bind_this_ptr(&mut self.state);
        match self.engine.call_fn_with_options::<Dynamic>(options, &mut self.scope, ast, name, args) {
            Ok(value) => HookOutcome::Completed(value),
            Err(err) => HookOutcome::Failed(err.to_string()),
        }
    }

    /// Drops the installed program and hook state.
    pub fn reset(&mut self) {
        self.program = None;
        self.scope = Scope::new();
        self.state = Dynamic::from_map(Map::new());
        self.generation += 1;
    }

    pub fn take_output(&mut self) -> Vec<String> {
        self.output.borrow_mut().drain(..).collect()
    }
}

fn push_output(sink: &RefCell<VecDeque<String>>, line: String) {
    let mut lines = sink.borrow_mut();
    if lines.len() == OUTPUT_CAPACITY {
        lines.pop_front();
    }
    lines.push_back(line);
}

fn register_helpers(engine: &mut Engine, rng: Rc<RefCell<StdRng>>) {
    let unit = Rc::clone(&rng);
    engine.register_fn("rand", move || -> FLOAT { unit.borrow_mut().gen::<FLOAT>() });
    engine.register_fn("rand", move |min: FLOAT, max: FLOAT| -> FLOAT {
        if min < max {
            rng.borrow_mut().gen_range(min..max)
        } else {
            min
        }
    });
}
