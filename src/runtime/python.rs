//! Python interpreter runtime
//!
//! Runs `<interpreter> <script>` so the script sees `sys.argv == [script]`,
//! with the invocation's lookup paths prepended to `PYTHONPATH`.

use super::{ExecutionOutcome, InvocationContext, ScriptRuntime};
use crate::config::Config;
use async_trait::async_trait;
use std::ffi::OsString;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Environment variable overriding the configured interpreter
pub const INTERPRETER_ENV: &str = "PYP_PYTHON";

/// Module search path variable understood by the interpreter
const MODULE_PATH_ENV: &str = "PYTHONPATH";

/// Script runtime backed by an external Python interpreter
pub struct PythonRuntime {
    interpreter: String,
}

impl PythonRuntime {
    /// Create a runtime using the given interpreter executable
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }

    /// Create a runtime from configuration, honouring `PYP_PYTHON`
    pub fn from_config(config: &Config) -> Self {
        match std::env::var(INTERPRETER_ENV) {
            Ok(interpreter) if !interpreter.trim().is_empty() => Self::new(interpreter),
            _ => Self::new(config.launcher.interpreter.clone()),
        }
    }

    /// Interpreter executable
    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }

    /// Build the interpreter command for a context
    pub fn command(&self, context: &InvocationContext) -> Command {
        let mut cmd = Command::new(&self.interpreter);
        cmd.arg(&context.program)
            .args(&context.args)
            .current_dir(&context.working_dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        if let Some(module_path) = module_path(context) {
            cmd.env(MODULE_PATH_ENV, module_path);
        }
        cmd
    }
}

/// Lookup paths followed by any inherited `PYTHONPATH`
fn module_path(context: &InvocationContext) -> Option<OsString> {
    if context.lookup_paths.is_empty() {
        return None;
    }

    let mut paths: Vec<OsString> = context
        .lookup_paths
        .entries()
        .iter()
        .map(|p| p.clone().into_os_string())
        .collect();
    if let Some(inherited) = std::env::var_os(MODULE_PATH_ENV) {
        paths.extend(std::env::split_paths(&inherited).map(|p| p.into_os_string()));
    }

    match std::env::join_paths(paths) {
        Ok(joined) => Some(joined),
        Err(e) => {
            warn!("Cannot build {}: {}", MODULE_PATH_ENV, e);
            None
        }
    }
}

#[async_trait]
impl ScriptRuntime for PythonRuntime {
    async fn execute(&self, context: &InvocationContext) -> ExecutionOutcome {
        debug!(
            "Executing: {} {:?} in {}",
            self.interpreter,
            context.argv(),
            context.working_dir.display()
        );

        let mut child = match self.command(context).spawn() {
            Ok(child) => child,
            Err(e) => {
                return ExecutionOutcome::SpawnFailed {
                    reason: format!("{}: {}", self.interpreter, e),
                }
            }
        };

        // The script receives Ctrl-C itself; the launcher waits so that
        // cleanup still runs afterwards.
        let mut watch_interrupts = true;
        let status = loop {
            tokio::select! {
                status = child.wait() => break status,
                signal = tokio::signal::ctrl_c(), if watch_interrupts => match signal {
                    Ok(()) => info!("Interrupt received, waiting for script to exit"),
                    Err(e) => {
                        warn!("Cannot watch for interrupts: {}", e);
                        watch_interrupts = false;
                    }
                },
            }
        };

        match status {
            Ok(status) if status.success() => ExecutionOutcome::Succeeded,
            Ok(status) => match status.code() {
                Some(code) => ExecutionOutcome::Failed { code },
                None => ExecutionOutcome::Signaled,
            },
            Err(e) => ExecutionOutcome::SpawnFailed {
                reason: e.to_string(),
            },
        }
    }

    fn runtime_name(&self) -> &str {
        &self.interpreter
    }
}
