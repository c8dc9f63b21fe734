// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `snapstart run` command - Boot from the snapshot and optionally call a function.

use std::path::Path;

use serde_json::json;
use snapstart_core::snapshot::phases;
use snapstart_core::{
    Bootstrapper, Config, ConsoleBuffer, EngineRuntime, QuickJsEngine, ScriptEngine,
    ScriptError, ScriptValue, Session,
};

/// What to print besides results.
#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    pub report: bool,
    pub capture: bool,
    /// Print boot metrics and phases as JSON instead of text
    pub json: bool,
}

pub fn execute(
    config: &Config,
    script: &Path,
    call: Option<&str>,
    args: &[String],
    output: Output,
) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = EngineRuntime::init();
    let buffer = output.capture.then(ConsoleBuffer::new);
    let engine = QuickJsEngine::new(
        &runtime,
        config.engine.clone(),
        super::capabilities(config, buffer.clone()),
    );

    let boot = Bootstrapper::new(&engine, &config.snapshot.path)
        .function_code(config.snapshot.function_code)
        .atomic_write(config.snapshot.atomic_write);

    let mut session = match boot.boot(script) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("✗ Bootstrap failed:");
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };

    if let Some(completion) = session.completion() {
        println!("{}", completion);
    }

    let mut call_failed = false;
    let mut call_result = None;
    if let Some(name) = call {
        match call_function(&mut session, name, args) {
            Ok(value) => {
                println!("{}", value);
                call_result = Some(value.to_string());
            }
            Err(e) => {
                eprintln!("✗ Call to '{}' failed:", name);
                eprintln!("  {}", e);
                call_failed = true;
            }
        }
    }

    if let Some(buffer) = &buffer {
        for line in buffer.lines() {
            println!("{}", line);
        }
    }

    let deltas = session.report();
    if output.json {
        let document = json!({
            "boot": session.metrics(),
            "snapshot": config.snapshot.path.display().to_string(),
            "result": call_result,
            "phases": deltas
                .iter()
                .map(|p| json!({ "name": p.name, "elapsed_ms": p.elapsed_ms() }))
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&document)?);
    } else if output.report {
        print!("{}", session.render());
    }

    drop(session);
    runtime.shutdown()?;

    if call_failed {
        std::process::exit(1);
    }
    Ok(())
}

/// Call a global function with CLI arguments and record the call phase.
fn call_function<E: ScriptEngine>(
    session: &mut Session<'_, E>,
    name: &str,
    args: &[String],
) -> Result<ScriptValue, ScriptError> {
    let args: Vec<ScriptValue> = args.iter().map(|a| ScriptValue::parse_arg(a)).collect();
    let result = session.call(name, &args);
    session.timer_mut().track(phases::FUNCTION_CALLED);
    result
}
