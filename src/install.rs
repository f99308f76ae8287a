//! Dependency package installation
//!
//! Every `.whl` archive found directly inside the package's dependency
//! directory is expanded into a private library root. Later packages win on
//! file conflicts; processing follows directory listing order, which the
//! filesystem does not guarantee to be stable.

use crate::archive::{self, WHEEL_EXTENSION};
use crate::config::InstallErrorPolicy;
use crate::error::{LauncherError, LauncherResult};
use crate::interrupt::Interrupt;
use crate::runtime::LookupPath;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info, warn};

/// Result of an install pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// Packages expanded into the library root, in processing order
    pub installed: Vec<String>,
    /// Packages that could not be expanded, with the reason
    pub failed: Vec<(String, String)>,
    /// Whether the pass stopped early under [`InstallErrorPolicy::Abort`]
    pub aborted: bool,
}

/// Installs dependency archives into a library root
pub struct DependencyInstaller {
    policy: InstallErrorPolicy,
}

impl DependencyInstaller {
    /// Create an installer with the given failure policy
    pub fn new(policy: InstallErrorPolicy) -> Self {
        Self { policy }
    }

    /// Expand every installable archive in `libs_dir` into `target_root`,
    /// then register `target_root` on `lookup` (once).
    ///
    /// A missing `libs_dir` is a no-op. Failing to list an existing
    /// `libs_dir` is an error; individual bad packages follow the policy.
    /// An interruption stops the pass with [`LauncherError::Interrupted`].
    pub fn install(
        &self,
        libs_dir: &Path,
        target_root: &Path,
        lookup: &mut LookupPath,
        interrupt: &Interrupt,
    ) -> LauncherResult<InstallReport> {
        let mut report = InstallReport::default();

        let entries = match fs::read_dir(libs_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No dependency directory at {}", libs_dir.display());
                return Ok(report);
            }
            Err(e) => {
                return Err(LauncherError::io(
                    format!("listing {}", libs_dir.display()),
                    e,
                ))
            }
        };

        fs::create_dir_all(target_root)
            .map_err(|e| LauncherError::io(format!("creating {}", target_root.display()), e))?;

        for entry in entries.filter_map(Result::ok) {
            interrupt.check()?;
            let path = entry.path();
            if !path.is_file() || !archive::has_extension(&path, WHEEL_EXTENSION) {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            info!("Installing: {}", name);

            match archive::extract(&path, target_root, interrupt) {
                Ok(files) => {
                    debug!("Installed {} ({} files)", name, files);
                    report.installed.push(name);
                }
                Err(e) if e.is_interrupted() => return Err(e),
                Err(e) => {
                    warn!("Failed to install {}: {}", name, e);
                    report.failed.push((name, e.to_string()));

                    if self.policy == InstallErrorPolicy::Abort {
                        report.aborted = true;
                        break;
                    }
                }
            }
        }

        if lookup.register(target_root) {
            debug!("Registered library root {}", target_root.display());
        }
        Ok(report)
    }
}

impl Default for DependencyInstaller {
    fn default() -> Self {
        Self::new(InstallErrorPolicy::default())
    }
}
