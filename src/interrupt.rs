//! Cooperative interruption of a launch
//!
//! Ctrl-C is turned into a shared flag instead of terminating the process.
//! Long-running phases poll the flag between entries and unwind with
//! [`LauncherError::Interrupted`], so the workspace guard still gets dropped.

use crate::error::{LauncherError, LauncherResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Shared interruption flag
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    flag: Arc<AtomicBool>,
}

impl Interrupt {
    /// Create an untriggered flag
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the current launch stop
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether an interruption was requested
    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// `Err(Interrupted)` once the flag is set
    pub fn check(&self) -> LauncherResult<()> {
        if self.is_triggered() {
            Err(LauncherError::Interrupted)
        } else {
            Ok(())
        }
    }

    /// Trigger this flag on Ctrl-C until the returned guard is dropped.
    ///
    /// Must be called from within a tokio runtime.
    pub fn watch_ctrl_c(&self) -> CtrlCWatch {
        let interrupt = self.clone();
        let task = tokio::spawn(async move {
            loop {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        info!("Interrupt received, stopping launch");
                        interrupt.trigger();
                    }
                    Err(e) => {
                        warn!("Cannot watch for interrupts: {}", e);
                        break;
                    }
                }
            }
        });
        CtrlCWatch { task }
    }
}

/// Stops the Ctrl-C watcher when dropped
#[derive(Debug)]
pub struct CtrlCWatch {
    task: JoinHandle<()>,
}

impl Drop for CtrlCWatch {
    fn drop(&mut self) {
        self.task.abort();
    }
}
