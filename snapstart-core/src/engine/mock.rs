// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Scripted engine for lifecycle tests.
//!
//! Understands just enough source to know which functions a script defines
//! (`function name(`) and what its completion value is (a trailing number).
//! Calls return the first argument plus one. Restores can be made to fail.

use std::cell::{Cell, RefCell};

use crate::blob::SnapshotBlob;
use crate::capability::{Capability, CapabilitySet};
use crate::engine::runtime::{EngineRuntime, EnvironmentTicket, EnvironmentTracker};
use crate::engine::{FunctionCodeHandling, ScriptEngine, ScriptValue, DEFAULT_CONTEXT_INDEX};
use crate::error::{EngineError, ScriptError, SnapshotFormatError};
use crate::types::ScriptSource;

const MOCK_MAGIC: &[u8] = b"MOCKSNAP\n";
const FIELD_SEPARATOR: char = '\u{1e}';

pub(crate) struct MockEngine {
    capabilities: CapabilitySet,
    tracker: EnvironmentTracker,
    reject_restores: Cell<usize>,
    fail_context: Cell<bool>,
    events: RefCell<Vec<String>>,
}

pub(crate) struct MockEnvironment {
    default_scope: Option<MockScope>,
    scripts: Vec<String>,
    bound: Vec<String>,
    restored: bool,
    _ticket: EnvironmentTicket,
}

#[derive(Clone, Default)]
pub(crate) struct MockScope {
    functions: std::rc::Rc<RefCell<Vec<String>>>,
}

impl MockEngine {
    pub(crate) fn new(runtime: &EngineRuntime) -> Self {
        Self {
            capabilities: CapabilitySet::new().console(None),
            tracker: runtime.tracker(),
            reject_restores: Cell::new(0),
            fail_context: Cell::new(false),
            events: RefCell::new(Vec::new()),
        }
    }

    /// Reject the next `count` restores; `usize::MAX` rejects all of them.
    pub(crate) fn reject_restores(&self, count: usize) {
        self.reject_restores.set(count);
    }

    pub(crate) fn fail_context_creation(&self, fail: bool) {
        self.fail_context.set(fail);
    }

    pub(crate) fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }

    fn record(&self, event: impl Into<String>) {
        self.events.borrow_mut().push(event.into());
    }

    fn new_environment(&self, restored: bool) -> MockEnvironment {
        MockEnvironment {
            default_scope: None,
            scripts: Vec::new(),
            bound: Vec::new(),
            restored,
            _ticket: self.tracker.issue(),
        }
    }
}

fn defined_functions(code: &str) -> Vec<String> {
    code.split("function ")
        .skip(1)
        .filter_map(|rest| rest.split('(').next())
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

fn completion(code: &str) -> ScriptValue {
    code.trim()
        .trim_end_matches(';')
        .rsplit(|c: char| c == ';' || c == '}')
        .next()
        .and_then(|last| last.trim().parse::<f64>().ok())
        .map(ScriptValue::Number)
        .unwrap_or(ScriptValue::Undefined)
}

impl ScriptEngine for MockEngine {
    type Environment = MockEnvironment;
    type Scope = MockScope;

    fn name(&self) -> &'static str {
        "mock"
    }

    fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    fn create_environment(&self) -> Result<MockEnvironment, EngineError> {
        self.record("create");
        Ok(self.new_environment(false))
    }

    fn open_scope(&self, _env: &mut MockEnvironment) -> Result<MockScope, EngineError> {
        self.record("scope");
        Ok(MockScope::default())
    }

    fn bind(
        &self,
        env: &mut MockEnvironment,
        _scope: &MockScope,
        capability: &Capability,
    ) -> Result<(), EngineError> {
        self.record(format!("bind:{}", capability.name()));
        if !env.bound.iter().any(|b| b == capability.name().as_str()) {
            env.bound.push(capability.name().to_string());
        }
        Ok(())
    }

    fn evaluate(
        &self,
        env: &mut MockEnvironment,
        scope: &MockScope,
        source: &ScriptSource,
    ) -> Result<ScriptValue, ScriptError> {
        self.record("evaluate");
        if source.code().contains("throw") {
            return Err(ScriptError::Uncaught {
                message: "mock failure".to_string(),
                stack: None,
            });
        }
        scope
            .functions
            .borrow_mut()
            .extend(defined_functions(source.code()));
        env.scripts.push(source.code().to_string());
        Ok(completion(source.code()))
    }

    fn call(
        &self,
        scope: &MockScope,
        name: &str,
        args: &[ScriptValue],
    ) -> Result<ScriptValue, ScriptError> {
        if !scope.functions.borrow().iter().any(|f| f == name) {
            return Err(ScriptError::NotAFunction {
                name: name.to_string(),
            });
        }
        let first = args.first().and_then(ScriptValue::as_number).unwrap_or(0.0);
        Ok(ScriptValue::Number(first + 1.0))
    }

    fn set_default_scope(
        &self,
        env: &mut MockEnvironment,
        scope: MockScope,
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
        env: MockEnvironment,
        _function_code: FunctionCodeHandling,
    ) -> Result<SnapshotBlob<'static>, EngineError> {
        self.record("serialize");
        if env.default_scope.is_none() {
            return Err(EngineError::NoDefaultScope);
        }
        let sep = FIELD_SEPARATOR.to_string();
        let mut bytes = MOCK_MAGIC.to_vec();
        bytes.extend_from_slice(env.bound.join(&sep).as_bytes());
        bytes.push(b'\n');
        bytes.extend_from_slice(env.scripts.join(&sep).as_bytes());
        Ok(SnapshotBlob::owned(bytes))
    }

    fn restore(&self, blob: &SnapshotBlob<'_>) -> Result<MockEnvironment, SnapshotFormatError> {
        self.record("restore");
        let pending = self.reject_restores.get();
        if pending > 0 {
            if pending != usize::MAX {
                self.reject_restores.set(pending - 1);
            }
            return Err(SnapshotFormatError::Malformed {
                reason: "rejected by mock".to_string(),
            });
        }

        let body = blob
            .as_bytes()
            .strip_prefix(MOCK_MAGIC)
            .ok_or(SnapshotFormatError::BadMagic)?;
        let text = std::str::from_utf8(body).map_err(|e| SnapshotFormatError::Malformed {
            reason: e.to_string(),
        })?;
        let (bound, scripts) = text.split_once('\n').unwrap_or((text, ""));

        let mut env = self.new_environment(true);
        env.bound = bound
            .split(FIELD_SEPARATOR)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        env.scripts = scripts
            .split(FIELD_SEPARATOR)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Ok(env)
    }

    fn context_from_snapshot(
        &self,
        env: &mut MockEnvironment,
        index: usize,
    ) -> Result<MockScope, SnapshotFormatError> {
        self.record("context");
        if !env.restored {
            return Err(SnapshotFormatError::Restore {
                reason: "not restored".to_string(),
            });
        }
        if index != DEFAULT_CONTEXT_INDEX {
            return Err(SnapshotFormatError::ContextIndexOutOfRange {
                index,
                available: 1,
            });
        }
        if self.fail_context.get() {
            return Err(SnapshotFormatError::Restore {
                reason: "context creation failed".to_string(),
            });
        }

        let scope = MockScope::default();
        for script in &env.scripts {
            scope.functions.borrow_mut().extend(defined_functions(script));
        }
        Ok(scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_parsing() {
        assert_eq!(
            defined_functions("function f(x){ return x+1; } function g(){}"),
            vec!["f", "g"]
        );
        assert_eq!(
            completion("function f(x){ return x+1; } 41;"),
            ScriptValue::Number(41.0)
        );
        assert_eq!(completion("var x = 1;"), ScriptValue::Undefined);
    }
}
