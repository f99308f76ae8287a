//! Script runtime abstraction
//!
//! The orchestrator never mutates process state to launch a script. It builds
//! an [`InvocationContext`] (program, arguments, working directory, extra
//! module lookup paths) and hands it to a [`ScriptRuntime`].

pub mod python;

pub use python::PythonRuntime;

use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};

/// Ordered list of module lookup locations, highest priority first.
///
/// Registering a path that is already present is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupPath {
    entries: Vec<PathBuf>,
}

impl LookupPath {
    /// Create an empty lookup path
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `path` at the front unless already registered.
    ///
    /// Returns whether the path was added.
    pub fn register(&mut self, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        if self.entries.contains(&path) {
            return false;
        }
        self.entries.insert(0, path);
        true
    }

    /// Whether `path` is registered
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.iter().any(|entry| entry == path)
    }

    /// Registered paths in priority order
    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything a runtime needs to start a script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationContext {
    /// Script path; the script observes this as argument zero
    pub program: PathBuf,
    /// Further arguments (empty for package launches)
    pub args: Vec<String>,
    /// Working directory of the script
    pub working_dir: PathBuf,
    /// Additional module lookup locations
    pub lookup_paths: LookupPath,
}

impl InvocationContext {
    /// Context for running `script` as the sole top-level program, inside
    /// the directory that contains it.
    pub fn for_script(script: &Path, lookup_paths: LookupPath) -> Self {
        let working_dir = script
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            program: script.to_path_buf(),
            args: Vec::new(),
            working_dir,
            lookup_paths,
        }
    }

    /// The argument vector as observed by the script
    pub fn argv(&self) -> Vec<String> {
        let mut argv = vec![self.program.display().to_string()];
        argv.extend(self.args.iter().cloned());
        argv
    }
}

/// How a script execution ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// Script exited successfully
    Succeeded,
    /// Script exited with a non-zero code
    Failed { code: i32 },
    /// Script was terminated by a signal
    Signaled,
    /// The runtime could not be started
    SpawnFailed { reason: String },
}

impl ExecutionOutcome {
    /// Whether the script completed successfully
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl fmt::Display for ExecutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "completed"),
            Self::Failed { code } => write!(f, "exited with code {}", code),
            Self::Signaled => write!(f, "terminated by signal"),
            Self::SpawnFailed { reason } => write!(f, "could not start: {}", reason),
        }
    }
}

/// Abstract script runtime interface
///
/// Implementations block the launch until the script's top-level execution
/// finishes. Failures are reported through [`ExecutionOutcome`], never as
/// errors, so cleanup always follows.
#[async_trait]
pub trait ScriptRuntime: Send + Sync {
    /// Execute the script described by `context`
    async fn execute(&self, context: &InvocationContext) -> ExecutionOutcome;

    /// Get the human-readable runtime name for display
    fn runtime_name(&self) -> &str;
}
