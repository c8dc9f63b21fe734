// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! QuickJS backend.
//!
//! An environment is a `rquickjs::Runtime`; a scope is a full-intrinsics
//! `rquickjs::Context`. Top-level scripts are compiled to bytecode, journaled
//! in the environment, then run. Serializing an environment writes the
//! journal, the bound capability names and the values of script-defined
//! globals into a checksummed image.
//!
//! Restoring never parses or compiles source. The journal is replayed in a
//! fresh context with inert capabilities so top-level host calls stay
//! silent, then the captured global values are written back over whatever
//! the replay computed, and only then are the real capabilities bound.

mod bytecode;
mod image;

use rquickjs::function::{Args, Rest};
use rquickjs::{
    CatchResultExt, CaughtError, Coerced, Context, Ctx, FromJs, Function, Object, Runtime, Type,
    Value,
};

use crate::blob::SnapshotBlob;
use crate::capability::{Capability, CapabilitySet};
use crate::config::EngineConfig;
use crate::engine::runtime::{EngineRuntime, EnvironmentTicket, EnvironmentTracker};
use crate::engine::{FunctionCodeHandling, ScriptEngine, ScriptValue, DEFAULT_CONTEXT_INDEX};
use crate::error::{EngineError, ScriptError, SnapshotFormatError};
use crate::types::{CapabilityName, ScriptSource};

pub use bytecode::engine_version;
pub use image::{CapturedGlobal, CompiledScript, SnapshotImage, FORMAT_VERSION, MAGIC};

/// QuickJS-ng engine bound to an [`EngineRuntime`].
pub struct QuickJsEngine {
    settings: EngineConfig,
    capabilities: CapabilitySet,
    tracker: EnvironmentTracker,
    version: String,
}

/// An isolated QuickJS runtime plus what has been run in it.
pub struct QuickJsEnvironment {
    // Field order is drop order: the scope goes before the runtime.
    default_scope: Option<QuickJsScope>,
    journal: Vec<CompiledScript>,
    globals: Vec<CapturedGlobal>,
    bound: Vec<String>,
    restored: bool,
    runtime: Runtime,
    _ticket: EnvironmentTicket,
}

impl QuickJsEnvironment {
    /// Names of capabilities bound in this environment, in bind order.
    pub fn bound_capabilities(&self) -> &[String] {
        &self.bound
    }

    /// Number of top-level scripts evaluated or restored so far.
    pub fn script_count(&self) -> usize {
        self.journal.len()
    }

    /// Names of the globals restored from captured values.
    pub fn captured_globals(&self) -> impl Iterator<Item = &str> {
        self.globals.iter().map(|g| g.name.as_str())
    }

    pub fn is_restored(&self) -> bool {
        self.restored
    }
}

/// A global scope inside a [`QuickJsEnvironment`].
#[derive(Clone)]
pub struct QuickJsScope {
    context: Context,
}

/// What `inspect` reports about a snapshot blob.
#[derive(Debug, Clone)]
pub struct SnapshotSummary {
    pub total_bytes: usize,
    pub format_version: u16,
    pub engine_version: String,
    pub function_code: FunctionCodeHandling,
    pub capabilities: Vec<String>,
    pub scripts: Vec<(String, usize)>,
    pub globals: Vec<(String, usize)>,
    /// Whether the blob was produced by the linked engine.
    pub engine_matches: bool,
}

impl QuickJsEngine {
    pub fn new(
        runtime: &EngineRuntime,
        settings: EngineConfig,
        capabilities: CapabilitySet,
    ) -> Self {
        let version = engine_version();
        tracing::debug!(
            engine = "quickjs",
            version = %version,
            capabilities = capabilities.len(),
            "Script engine ready"
        );
        Self {
            settings,
            capabilities,
            tracker: runtime.tracker(),
            version,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn settings(&self) -> &EngineConfig {
        &self.settings
    }

    /// Decode a blob and describe it without building an environment.
    pub fn inspect(&self, blob: &SnapshotBlob<'_>) -> Result<SnapshotSummary, SnapshotFormatError> {
        let image = SnapshotImage::decode(blob.as_bytes())?;
        Ok(SnapshotSummary {
            total_bytes: blob.len(),
            format_version: FORMAT_VERSION,
            engine_matches: image.engine_version == self.version,
            engine_version: image.engine_version,
            function_code: image.function_code,
            capabilities: image.capabilities,
            scripts: image
                .scripts
                .iter()
                .map(|s| (s.name.clone(), s.bytecode.len()))
                .collect(),
            globals: image
                .globals
                .iter()
                .map(|g| (g.name.clone(), g.value.len()))
                .collect(),
        })
    }

    fn new_runtime(&self) -> Result<Runtime, EngineError> {
        let runtime = Runtime::new().map_err(|e| EngineError::RuntimeCreate {
            reason: e.to_string(),
        })?;

        if let Some(limit) = self.settings.memory_limit_bytes {
            runtime.set_memory_limit(limit);
        }
        runtime.set_max_stack_size(self.settings.max_stack_size_bytes);
        if let Some(threshold) = self.settings.gc_threshold_bytes {
            runtime.set_gc_threshold(threshold);
        }

        Ok(runtime)
    }

    fn new_environment(&self, runtime: Runtime, restored: bool) -> QuickJsEnvironment {
        QuickJsEnvironment {
            default_scope: None,
            journal: Vec::new(),
            globals: Vec::new(),
            bound: Vec::new(),
            restored,
            runtime,
            _ticket: self.tracker.issue(),
        }
    }
}

impl ScriptEngine for QuickJsEngine {
    type Environment = QuickJsEnvironment;
    type Scope = QuickJsScope;

    fn name(&self) -> &'static str {
        "quickjs"
    }

    fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    fn create_environment(&self) -> Result<QuickJsEnvironment, EngineError> {
        let runtime = self.new_runtime()?;
        Ok(self.new_environment(runtime, false))
    }

    fn open_scope(&self, env: &mut QuickJsEnvironment) -> Result<QuickJsScope, EngineError> {
        let context = Context::full(&env.runtime).map_err(|e| EngineError::ContextCreate {
            reason: e.to_string(),
        })?;
        Ok(QuickJsScope { context })
    }

    fn bind(
        &self,
        env: &mut QuickJsEnvironment,
        scope: &QuickJsScope,
        capability: &Capability,
    ) -> Result<(), EngineError> {
        let name = capability.name();
        let handler = capability.handler();

        scope
            .context
            .with(|ctx| -> rquickjs::Result<()> {
                let func = Function::new(ctx.clone(), move |args: Rest<Coerced<String>>| {
                    let args: Vec<String> = args.0.into_iter().map(|a| a.0).collect();
                    handler(args.as_slice());
                })?;
                install(&ctx, name, func)
            })
            .map_err(|e| EngineError::Bind {
                name: name.to_string(),
                reason: e.to_string(),
            })?;

        if !env.bound.iter().any(|b| b == name.as_str()) {
            env.bound.push(name.to_string());
        }
        tracing::trace!(capability = %name, "Capability bound");
        Ok(())
    }

    fn evaluate(
        &self,
        env: &mut QuickJsEnvironment,
        scope: &QuickJsScope,
        source: &ScriptSource,
    ) -> Result<ScriptValue, ScriptError> {
        let (bytecode, value) = scope.context.with(|ctx| {
            let bytecode = bytecode::compile(&ctx, source.name(), source.code(), false)
                .catch(&ctx)
                .map_err(script_error)?;
            let value = bytecode::run(&ctx, &bytecode)
                .catch(&ctx)
                .map_err(script_error)?;
            Ok::<_, ScriptError>((bytecode, script_value(&ctx, &value)))
        })?;

        tracing::debug!(
            script = %source.name(),
            bytecode_bytes = bytecode.len(),
            "Script compiled and evaluated"
        );
        env.journal.push(CompiledScript {
            name: source.name().to_string(),
            bytecode,
        });
        Ok(value)
    }

    fn call(
        &self,
        scope: &QuickJsScope,
        name: &str,
        args: &[ScriptValue],
    ) -> Result<ScriptValue, ScriptError> {
        scope.context.with(|ctx| {
            let target: Value = ctx.globals().get(name).catch(&ctx).map_err(script_error)?;
            let Some(func) = target.as_function() else {
                return Err(ScriptError::NotAFunction {
                    name: name.to_string(),
                });
            };

            let mut call_args = Args::new(ctx.clone(), args.len());
            for arg in args {
                let value = js_value(&ctx, arg).catch(&ctx).map_err(script_error)?;
                call_args.push_arg(value).catch(&ctx).map_err(script_error)?;
            }

            let result: Value = func.call_arg(call_args).catch(&ctx).map_err(script_error)?;
            Ok(script_value(&ctx, &result))
        })
    }

    fn set_default_scope(
        &self,
        env: &mut QuickJsEnvironment,
        scope: QuickJsScope,
    ) -> Result<usize, EngineError> {
        if env.default_scope.is_some() {
            return Err(EngineError::DefaultScopeTaken {
                index: DEFAULT_CONTEXT_INDEX,
            });
        }
        env.default_scope = Some(scope);
        Ok(DEFAULT_CONTEXT_INDEX)
    }

    fn serialize(
        &self,
        mut env: QuickJsEnvironment,
        function_code: FunctionCodeHandling,
    ) -> Result<SnapshotBlob<'static>, EngineError> {
        let scope = env.default_scope.take().ok_or(EngineError::NoDefaultScope)?;

        let scripts = match function_code {
            FunctionCodeHandling::Keep => std::mem::take(&mut env.journal),
            FunctionCodeHandling::Clear => scope.context.with(|ctx| {
                env.journal
                    .iter()
                    .map(|script| {
                        bytecode::rewrite(&ctx, &script.bytecode, true)
                            .catch(&ctx)
                            .map(|bytecode| CompiledScript {
                                name: script.name.clone(),
                                bytecode,
                            })
                            .map_err(|e| EngineError::Serialize {
                                reason: e.to_string(),
                            })
                    })
                    .collect::<Result<Vec<_>, _>>()
            })?,
        };

        let globals = scope.context.with(|ctx| capture_globals(&ctx, &env.bound))?;

        let image = SnapshotImage {
            engine_version: self.version.clone(),
            function_code,
            capabilities: std::mem::take(&mut env.bound),
            scripts,
            globals,
        };
        let bytes = image
            .encode()
            .map_err(|reason| EngineError::Serialize { reason })?;

        drop(scope);
        drop(env);

        tracing::debug!(
            bytes = bytes.len(),
            scripts = image.scripts.len(),
            globals = image.globals.len(),
            function_code = %function_code,
            "Environment serialized"
        );
        Ok(SnapshotBlob::owned(bytes))
    }

    fn restore(&self, blob: &SnapshotBlob<'_>) -> Result<QuickJsEnvironment, SnapshotFormatError> {
        let image = SnapshotImage::decode(blob.as_bytes())?;

        if image.engine_version != self.version {
            return Err(SnapshotFormatError::EngineMismatch {
                found: image.engine_version,
                expected: self.version.clone(),
            });
        }

        if let Some(unknown) = image
            .capabilities
            .iter()
            .find(|name| !self.capabilities.contains(name))
        {
            return Err(SnapshotFormatError::UnknownCapability {
                name: unknown.clone(),
            });
        }

        let runtime = self
            .new_runtime()
            .map_err(|e| SnapshotFormatError::Restore {
                reason: e.to_string(),
            })?;

        let mut env = self.new_environment(runtime, true);
        env.journal = image.scripts;
        env.globals = image.globals;
        env.bound = image.capabilities;
        Ok(env)
    }

    fn context_from_snapshot(
        &self,
        env: &mut QuickJsEnvironment,
        index: usize,
    ) -> Result<QuickJsScope, SnapshotFormatError> {
        if !env.restored {
            return Err(SnapshotFormatError::Restore {
                reason: "environment was not created from a snapshot".to_string(),
            });
        }
        if index != DEFAULT_CONTEXT_INDEX {
            return Err(SnapshotFormatError::ContextIndexOutOfRange {
                index,
                available: 1,
            });
        }

        let scope = self
            .open_scope(env)
            .map_err(|e| SnapshotFormatError::Restore {
                reason: e.to_string(),
            })?;

        let recorded = env
            .bound
            .iter()
            .map(|name| {
                self.capabilities
                    .get(name)
                    .ok_or_else(|| SnapshotFormatError::UnknownCapability { name: name.clone() })
            })
            .collect::<Result<Vec<_>, _>>()?;

        scope.context.with(|ctx| {
            // Top-level code sees the capabilities but they do nothing here.
            for capability in &recorded {
                Function::new(ctx.clone(), || {})
                    .and_then(|inert| install(&ctx, capability.name(), inert))
                    .catch(&ctx)
                    .map_err(|e| SnapshotFormatError::Restore {
                        reason: format!("{}: {}", capability.name(), e),
                    })?;
            }

            for script in &env.journal {
                bytecode::run(&ctx, &script.bytecode)
                    .catch(&ctx)
                    .map_err(|e| SnapshotFormatError::Restore {
                        reason: format!("{}: {}", script.name, e),
                    })?;
            }

            let globals = ctx.globals();
            for global in &env.globals {
                let value = bytecode::read_value(&ctx, &global.value)
                    .catch(&ctx)
                    .map_err(|e| SnapshotFormatError::Restore {
                        reason: format!("global '{}': {}", global.name, e),
                    })?;
                if let Err(e) = globals.set(global.name.as_str(), value).catch(&ctx) {
                    tracing::warn!(
                        global = %global.name,
                        error = %e,
                        "Captured global not restored"
                    );
                }
            }
            Ok::<_, SnapshotFormatError>(())
        })?;

        for capability in recorded {
            self.bind(env, &scope, capability)
                .map_err(|e| SnapshotFormatError::Restore {
                    reason: e.to_string(),
                })?;
        }

        tracing::debug!(
            scripts = env.journal.len(),
            globals = env.globals.len(),
            "Default context restored"
        );
        Ok(scope)
    }
}

/// Place `func` at `name`, creating the namespace object for dotted names.
fn install<'js>(
    ctx: &Ctx<'js>,
    name: &CapabilityName,
    func: Function<'js>,
) -> rquickjs::Result<()> {
    let globals = ctx.globals();
    match name.split_namespace() {
        Some((namespace, member)) => {
            let target = namespace_object(ctx, &globals, namespace)?;
            target.set(member, func)
        }
        None => globals.set(name.as_str(), func),
    }
}

/// Serialize every enumerable global the script defined that is not a
/// function and not a capability. Values the engine cannot serialize are
/// skipped and keep whatever a replay produces.
fn capture_globals(ctx: &Ctx<'_>, bound: &[String]) -> Result<Vec<CapturedGlobal>, EngineError> {
    let reserved: Vec<&str> = bound
        .iter()
        .map(|name| name.split_once('.').map_or(name.as_str(), |(head, _)| head))
        .collect();
    let globals = ctx.globals();
    let mut captured = Vec::new();

    for key in globals.keys::<String>() {
        let name = key.map_err(|e| EngineError::Serialize {
            reason: e.to_string(),
        })?;
        if reserved.contains(&name.as_str()) {
            continue;
        }

        let value: Value = globals
            .get(name.as_str())
            .catch(ctx)
            .map_err(|e| EngineError::Serialize {
                reason: format!("global '{}': {}", name, e),
            })?;
        if value.is_function() {
            continue;
        }

        match bytecode::write_value(ctx, &value).catch(ctx) {
            Ok(bytes) => captured.push(CapturedGlobal { name, value: bytes }),
            Err(e) => {
                tracing::debug!(global = %name, error = %e, "Global not captured");
            }
        }
    }
    Ok(captured)
}

fn namespace_object<'js>(
    ctx: &Ctx<'js>,
    globals: &Object<'js>,
    namespace: &str,
) -> rquickjs::Result<Object<'js>> {
    if let Some(existing) = globals.get::<_, Option<Object>>(namespace)? {
        return Ok(existing);
    }
    let created = Object::new(ctx.clone())?;
    globals.set(namespace, created.clone())?;
    Ok(created)
}

fn script_error(err: CaughtError<'_>) -> ScriptError {
    match err {
        CaughtError::Exception(ex) => ScriptError::Uncaught {
            message: ex
                .message()
                .unwrap_or_else(|| "uncaught exception".to_string()),
            stack: ex.stack().filter(|s| !s.is_empty()),
        },
        CaughtError::Value(value) => ScriptError::Uncaught {
            message: script_value(value.ctx(), &value).to_string(),
            stack: None,
        },
        CaughtError::Error(e) => ScriptError::Uncaught {
            message: e.to_string(),
            stack: None,
        },
    }
}

fn script_value<'js>(ctx: &Ctx<'js>, value: &Value<'js>) -> ScriptValue {
    match value.type_of() {
        Type::Undefined | Type::Uninitialized => ScriptValue::Undefined,
        Type::Null => ScriptValue::Null,
        Type::Bool => ScriptValue::Bool(value.as_bool().unwrap_or_default()),
        Type::Int | Type::Float => ScriptValue::Number(value.as_number().unwrap_or(f64::NAN)),
        Type::String => match value.as_string().map(|s| s.to_string()) {
            Some(Ok(s)) => ScriptValue::String(s),
            _ => ScriptValue::Other(String::from("[string]")),
        },
        other => match Coerced::<String>::from_js(ctx, value.clone()) {
            Ok(Coerced(s)) => ScriptValue::Other(s),
            Err(_) => ScriptValue::Other(format!("[{:?}]", other)),
        },
    }
}

fn js_value<'js>(ctx: &Ctx<'js>, value: &ScriptValue) -> rquickjs::Result<Value<'js>> {
    Ok(match value {
        ScriptValue::Undefined => Value::new_undefined(ctx.clone()),
        ScriptValue::Null => Value::new_null(ctx.clone()),
        ScriptValue::Bool(b) => Value::new_bool(ctx.clone(), *b),
        ScriptValue::Number(n) => Value::new_number(ctx.clone(), *n),
        ScriptValue::String(s) | ScriptValue::Other(s) => {
            rquickjs::String::from_str(ctx.clone(), s)?.into_value()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::ConsoleBuffer;

    fn engine(runtime: &EngineRuntime, console: Option<ConsoleBuffer>) -> QuickJsEngine {
        QuickJsEngine::new(
            runtime,
            EngineConfig::default(),
            CapabilitySet::new().console(console),
        )
    }

    fn source(code: &str) -> ScriptSource {
        ScriptSource::new("test.js", code).unwrap()
    }

    fn build_blob(engine: &QuickJsEngine, code: &str, mode: FunctionCodeHandling) -> Vec<u8> {
        let mut env = engine.create_environment().unwrap();
        let scope = engine.open_scope(&mut env).unwrap();
        for cap in engine.capabilities().iter() {
            engine.bind(&mut env, &scope, cap).unwrap();
        }
        engine.evaluate(&mut env, &scope, &source(code)).unwrap();
        engine.set_default_scope(&mut env, scope).unwrap();
        engine.serialize(env, mode).unwrap().as_bytes().to_vec()
    }

    #[test]
    fn test_evaluate_and_call() {
        let runtime = EngineRuntime::init();
        let engine = engine(&runtime, None);
        let mut env = engine.create_environment().unwrap();
        let scope = engine.open_scope(&mut env).unwrap();

        let completion = engine
            .evaluate(&mut env, &scope, &source("function f(x){ return x+1; } 41;"))
            .unwrap();
        assert_eq!(completion, ScriptValue::Number(41.0));

        let result = engine
            .call(&scope, "f", &[ScriptValue::Number(41.0)])
            .unwrap();
        assert_eq!(result, ScriptValue::Number(42.0));
        assert_eq!(env.script_count(), 1);

        drop(scope);
        drop(env);
        runtime.shutdown().unwrap();
    }

    #[test]
    fn test_uncaught_exception() {
        let runtime = EngineRuntime::init();
        let engine = engine(&runtime, None);
        let mut env = engine.create_environment().unwrap();
        let scope = engine.open_scope(&mut env).unwrap();

        let err = engine
            .evaluate(&mut env, &scope, &source("throw new TypeError('nope')"))
            .unwrap_err();
        match err {
            ScriptError::Uncaught { message, .. } => assert_eq!(message, "nope"),
            other => panic!("unexpected error: {:?}", other),
        }
        // Failed scripts are not journaled
        assert_eq!(env.script_count(), 0);
    }

    #[test]
    fn test_thrown_non_error_value() {
        let runtime = EngineRuntime::init();
        let engine = engine(&runtime, None);
        let mut env = engine.create_environment().unwrap();
        let scope = engine.open_scope(&mut env).unwrap();

        let err = engine
            .evaluate(&mut env, &scope, &source("throw 7"))
            .unwrap_err();
        assert!(err.to_string().contains('7'));
    }

    #[test]
    fn test_call_missing_function() {
        let runtime = EngineRuntime::init();
        let engine = engine(&runtime, None);
        let mut env = engine.create_environment().unwrap();
        let scope = engine.open_scope(&mut env).unwrap();
        engine.evaluate(&mut env, &scope, &source("var x = 1;")).unwrap();

        assert!(matches!(
            engine.call(&scope, "x", &[]),
            Err(ScriptError::NotAFunction { .. })
        ));
        assert!(matches!(
            engine.call(&scope, "missing", &[]),
            Err(ScriptError::NotAFunction { .. })
        ));
    }

    #[test]
    fn test_console_capability() {
        let runtime = EngineRuntime::init();
        let buffer = ConsoleBuffer::new();
        let engine = engine(&runtime, Some(buffer.clone()));
        let mut env = engine.create_environment().unwrap();
        let scope = engine.open_scope(&mut env).unwrap();
        for cap in engine.capabilities().iter() {
            engine.bind(&mut env, &scope, cap).unwrap();
        }
        // Rebinding is idempotent
        for cap in engine.capabilities().iter() {
            engine.bind(&mut env, &scope, cap).unwrap();
        }
        assert_eq!(env.bound_capabilities(), &["log", "console.log"]);

        engine
            .evaluate(&mut env, &scope, &source("log('a', 1); console.log({}.x, true);"))
            .unwrap();
        assert_eq!(buffer.lines(), vec!["a 1", "undefined true"]);
    }

    #[test]
    fn test_serialize_restore_round_trip() {
        let runtime = EngineRuntime::init();
        let engine = engine(&runtime, None);
        let bytes = build_blob(
            &engine,
            "var base = 10; function add(x){ return base + x; }",
            FunctionCodeHandling::Keep,
        );

        let blob = SnapshotBlob::borrowed(&bytes);
        let mut env = engine.restore(&blob).unwrap();
        assert!(env.is_restored());
        let scope = engine
            .context_from_snapshot(&mut env, DEFAULT_CONTEXT_INDEX)
            .unwrap();

        let result = engine.call(&scope, "add", &[ScriptValue::Number(5.0)]).unwrap();
        assert_eq!(result, ScriptValue::Number(15.0));

        drop(scope);
        drop(env);
        assert_eq!(runtime.live_environments(), 0);
    }

    #[test]
    fn test_restore_keeps_captured_state() {
        let runtime = EngineRuntime::init();
        let engine = engine(&runtime, None);
        let bytes = build_blob(
            &engine,
            "var seed = Math.random(); var box = { seed: seed, hits: [seed] }; \
             function read(){ return box.hits[0] === seed ? seed : -1; }",
            FunctionCodeHandling::Keep,
        );

        let summary = engine.inspect(&SnapshotBlob::borrowed(&bytes)).unwrap();
        let mut names: Vec<&str> = summary.globals.iter().map(|(n, _)| n.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["box", "seed"]);

        let read = |bytes: &[u8]| {
            let mut env = engine.restore(&SnapshotBlob::borrowed(bytes)).unwrap();
            let scope = engine.context_from_snapshot(&mut env, 0).unwrap();
            engine.call(&scope, "read", &[]).unwrap()
        };
        let first = read(&bytes);
        assert!(matches!(first, ScriptValue::Number(n) if n >= 0.0));
        assert_eq!(read(&bytes), first);
    }

    #[test]
    fn test_replay_does_not_reach_capabilities() {
        let runtime = EngineRuntime::init();
        let buffer = ConsoleBuffer::new();
        let engine = engine(&runtime, Some(buffer.clone()));
        let bytes = build_blob(
            &engine,
            "console.log('top'); function say(x){ log('say', x); }",
            FunctionCodeHandling::Keep,
        );
        assert_eq!(buffer.lines(), vec!["top"]);
        buffer.clear();

        let mut env = engine.restore(&SnapshotBlob::borrowed(&bytes)).unwrap();
        let scope = engine.context_from_snapshot(&mut env, 0).unwrap();
        assert!(buffer.lines().is_empty());
        assert_eq!(env.bound_capabilities(), &["log", "console.log"]);

        engine.call(&scope, "say", &[ScriptValue::Number(1.0)]).unwrap();
        assert_eq!(buffer.lines(), vec!["say 1"]);
    }

    #[test]
    fn test_unserializable_globals_are_replayed() {
        let runtime = EngineRuntime::init();
        let engine = engine(&runtime, None);
        let bytes = build_blob(
            &engine,
            "var n = 5; var api = { twice: function(x){ return 2 * x; } }; \
             function use(){ return api.twice(n); }",
            FunctionCodeHandling::Keep,
        );

        let mut env = engine.restore(&SnapshotBlob::borrowed(&bytes)).unwrap();
        let scope = engine.context_from_snapshot(&mut env, 0).unwrap();
        assert_eq!(env.captured_globals().collect::<Vec<_>>(), vec!["n"]);
        assert_eq!(
            engine.call(&scope, "use", &[]).unwrap(),
            ScriptValue::Number(10.0)
        );
    }

    #[test]
    fn test_cleared_function_code_still_runs() {
        let runtime = EngineRuntime::init();
        let engine = engine(&runtime, None);
        let code = "function f(x){ return x * 3; }";
        let keep = build_blob(&engine, code, FunctionCodeHandling::Keep);
        let clear = build_blob(&engine, code, FunctionCodeHandling::Clear);
        assert!(clear.len() < keep.len());

        let summary = engine.inspect(&SnapshotBlob::borrowed(&clear)).unwrap();
        assert_eq!(summary.function_code, FunctionCodeHandling::Clear);

        let mut env = engine.restore(&SnapshotBlob::borrowed(&clear)).unwrap();
        let scope = engine.context_from_snapshot(&mut env, 0).unwrap();
        assert_eq!(
            engine.call(&scope, "f", &[ScriptValue::Number(2.0)]).unwrap(),
            ScriptValue::Number(6.0)
        );
    }

    #[test]
    fn test_serialize_requires_default_scope() {
        let runtime = EngineRuntime::init();
        let engine = engine(&runtime, None);
        let env = engine.create_environment().unwrap();
        assert!(matches!(
            engine.serialize(env, FunctionCodeHandling::Keep),
            Err(EngineError::NoDefaultScope)
        ));
    }

    #[test]
    fn test_second_default_scope_rejected() {
        let runtime = EngineRuntime::init();
        let engine = engine(&runtime, None);
        let mut env = engine.create_environment().unwrap();
        let first = engine.open_scope(&mut env).unwrap();
        let second = engine.open_scope(&mut env).unwrap();

        assert_eq!(engine.set_default_scope(&mut env, first).unwrap(), 0);
        assert!(matches!(
            engine.set_default_scope(&mut env, second),
            Err(EngineError::DefaultScopeTaken { index: 0 })
        ));
    }

    #[test]
    fn test_context_index_out_of_range() {
        let runtime = EngineRuntime::init();
        let engine = engine(&runtime, None);
        let bytes = build_blob(&engine, "1", FunctionCodeHandling::Keep);

        let mut env = engine.restore(&SnapshotBlob::borrowed(&bytes)).unwrap();
        assert!(matches!(
            engine.context_from_snapshot(&mut env, 1),
            Err(SnapshotFormatError::ContextIndexOutOfRange { index: 1, available: 1 })
        ));
    }

    #[test]
    fn test_unknown_capability_rejected() {
        let runtime = EngineRuntime::init();
        let with_console = engine(&runtime, None);
        let bytes = build_blob(&with_console, "log('hi')", FunctionCodeHandling::Keep);

        let bare = QuickJsEngine::new(&runtime, EngineConfig::default(), CapabilitySet::new());
        assert!(matches!(
            bare.restore(&SnapshotBlob::borrowed(&bytes)),
            Err(SnapshotFormatError::UnknownCapability { .. })
        ));
    }

    #[test]
    fn test_engine_mismatch_rejected() {
        let runtime = EngineRuntime::init();
        let engine = engine(&runtime, None);
        let image = SnapshotImage {
            engine_version: "0.0.0-other".to_string(),
            function_code: FunctionCodeHandling::Keep,
            capabilities: Vec::new(),
            scripts: Vec::new(),
            globals: Vec::new(),
        };
        let bytes = image.encode().unwrap();

        assert!(matches!(
            engine.restore(&SnapshotBlob::borrowed(&bytes)),
            Err(SnapshotFormatError::EngineMismatch { .. })
        ));
        assert!(!engine.inspect(&SnapshotBlob::borrowed(&bytes)).unwrap().engine_matches);
    }

    #[test]
    fn test_cold_environment_has_no_snapshot_context() {
        let runtime = EngineRuntime::init();
        let engine = engine(&runtime, None);
        let mut env = engine.create_environment().unwrap();
        assert!(matches!(
            engine.context_from_snapshot(&mut env, 0),
            Err(SnapshotFormatError::Restore { .. })
        ));
    }
}
