// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Synthetic start-up workload.
//!
//! A generated script with many small functions and a lookup table built at
//! top level, so that compilation and initialization both cost something.

use std::fmt::Write;

use snapstart_core::{
    CapabilitySet, EngineConfig, EngineRuntime, QuickJsEngine, ScriptError, ScriptSource,
};

/// Name of the function every workload defines.
pub const ENTRY_FUNCTION: &str = "entry";

/// A generated script and its size parameters.
#[derive(Debug, Clone)]
pub struct Workload {
    functions: usize,
    table_size: usize,
}

impl Workload {
    pub fn new(functions: usize, table_size: usize) -> Self {
        Self {
            functions: functions.max(1),
            table_size: table_size.max(1),
        }
    }

    /// Small enough for quick runs and tests.
    pub fn small() -> Self {
        Self::new(16, 64)
    }

    /// Closer to a real application bundle.
    pub fn large() -> Self {
        Self::new(2_000, 10_000)
    }

    pub fn functions(&self) -> usize {
        self.functions
    }

    /// Script text. `entry(x)` returns `table[x % size] + handler_0(x)`.
    pub fn script(&self) -> String {
        let mut code = String::with_capacity(self.functions * 64);
        let _ = writeln!(code, "var table = [];");
        let _ = writeln!(
            code,
            "for (var i = 0; i < {}; i++) {{ table.push((i * 7919) % 104729); }}",
            self.table_size
        );
        for i in 0..self.functions {
            let _ = writeln!(
                code,
                "function handler_{i}(x) {{ var s = 0; \
                 for (var k = 0; k < 3; k++) {{ s += x * {i} + k; }} return s; }}"
            );
        }
        let _ = writeln!(
            code,
            "function {ENTRY_FUNCTION}(x) {{ return table[x % table.length] + handler_0(x); }}"
        );
        let _ = writeln!(code, "table.length;");
        code
    }

    pub fn source(&self) -> Result<ScriptSource, ScriptError> {
        ScriptSource::new("workload.js", self.script())
    }

    /// Value `entry(x)` should return.
    pub fn expected_entry(&self, x: u64) -> f64 {
        let table = ((x as usize % self.table_size) as u64 * 7919) % 104729;
        // handler_0 adds k for k in 0..3
        (table + 3) as f64
    }
}

/// QuickJS engine with the default settings and a silent console.
pub fn engine(runtime: &EngineRuntime) -> QuickJsEngine {
    let capabilities = CapabilitySet::new().console(None);
    QuickJsEngine::new(runtime, EngineConfig::default(), capabilities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapstart_core::{Bootstrapper, ScriptValue};

    #[test]
    fn test_workload_script_runs() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = EngineRuntime::init();
        let engine = engine(&runtime);
        let workload = Workload::small();

        let session = Bootstrapper::new(&engine, dir.path().join("w.blob"))
            .boot_source(&workload.source().unwrap())
            .unwrap();

        assert_eq!(session.completion(), Some(&ScriptValue::Number(64.0)));
        for x in [0u64, 5, 100] {
            assert_eq!(
                session
                    .call(ENTRY_FUNCTION, &[ScriptValue::Number(x as f64)])
                    .unwrap(),
                ScriptValue::Number(workload.expected_entry(x))
            );
        }
    }

    #[test]
    fn test_workload_scales() {
        assert!(Workload::large().script().len() > Workload::small().script().len() * 50);
        assert_eq!(Workload::new(0, 0).functions(), 1);
    }
}
