//! Package launch pipeline
//!
//! Sequences one run of a package:
//!
//! ```text
//! Extract -> VerifyEntry -> ComputeDigest -> Materialize -> InstallDeps -> Execute -> Cleanup
//! ```
//!
//! The archive is validated before any temporary state exists. From the
//! moment the extraction root is created, a [`Workspace`] guard owns it and
//! removes it on every exit path, including early returns and panics.
//! Only extraction, entry verification and Ctrl-C can abort a launch; every
//! other failure in a later phase is reported and the pipeline continues.

use crate::archive::{PackageArchive, DEPENDENCY_DIR, ENTRY_SCRIPT, LIBRARY_DIR};
use crate::cache::{self, DigestAlgorithm, MaterializeReport};
use crate::clean;
use crate::config::{Config, ConfigManager, InstallErrorPolicy};
use crate::error::{LauncherError, LauncherResult};
use crate::install::{DependencyInstaller, InstallReport};
use crate::interrupt::Interrupt;
use crate::runtime::{ExecutionOutcome, InvocationContext, LookupPath, ScriptRuntime};
use crate::ui::{self, TaskSpinner, UiContext};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Prefix of extraction root directory names
const WORKSPACE_PREFIX: &str = "pyp-";

/// Launch phases, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Extract,
    VerifyEntry,
    ComputeDigest,
    Materialize,
    InstallDeps,
    Execute,
    Cleanup,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Extract => "extract",
            Self::VerifyEntry => "verify-entry",
            Self::ComputeDigest => "compute-digest",
            Self::Materialize => "materialize",
            Self::InstallDeps => "install-deps",
            Self::Execute => "execute",
            Self::Cleanup => "cleanup",
        };
        write!(f, "{}", name)
    }
}

/// Ephemeral extraction root, removed when dropped
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Create a fresh, uniquely named directory under `base`
    pub fn create(base: &Path) -> LauncherResult<Self> {
        fs::create_dir_all(base)
            .map_err(|e| LauncherError::io(format!("creating {}", base.display()), e))?;

        let root = base.join(format!("{}{}", WORKSPACE_PREFIX, Uuid::new_v4().simple()));
        fs::create_dir(&root)
            .map_err(|e| LauncherError::io(format!("creating {}", root.display()), e))?;

        debug!("Created workspace {}", root.display());
        Ok(Self { root })
    }

    /// Extraction root
    pub fn path(&self) -> &Path {
        &self.root
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        debug!("Phase {}: removing {}", Phase::Cleanup, self.root.display());
        clean::remove_tree(&self.root);
    }
}

/// Settings resolved from configuration for a launch
#[derive(Debug, Clone)]
pub struct LaunchSettings {
    /// Base directory for extraction roots
    pub temp_root: PathBuf,
    /// Persistent side-file cache root
    pub cache_root: PathBuf,
    /// Digest naming cache directories
    pub digest: DigestAlgorithm,
    /// Dependency failure handling
    pub install_policy: InstallErrorPolicy,
}

impl LaunchSettings {
    /// Resolve settings from configuration
    pub fn from_config(config: &Config) -> LauncherResult<Self> {
        Ok(Self {
            temp_root: ConfigManager::temp_root(config),
            cache_root: ConfigManager::cache_root(config),
            digest: config.cache.digest.parse()?,
            install_policy: config.launcher.on_install_error,
        })
    }
}

/// What happened during a launch that reached execution
#[derive(Debug, Clone)]
pub struct LaunchReport {
    /// Entry-script digest, if it could be computed
    pub digest: Option<String>,
    /// Cache directory the side files went to
    pub cache_dir: Option<PathBuf>,
    /// Side-file copy results
    pub side_files: MaterializeReport,
    /// Dependency install results
    pub dependencies: InstallReport,
    /// How the script ended
    pub outcome: ExecutionOutcome,
}

/// Runs packages end to end
pub struct Launcher {
    settings: LaunchSettings,
    runtime: Box<dyn ScriptRuntime>,
    ui: UiContext,
    interrupt: Interrupt,
}

impl Launcher {
    /// Create a launcher executing scripts with `runtime`
    pub fn new(settings: LaunchSettings, runtime: Box<dyn ScriptRuntime>) -> Self {
        Self {
            settings,
            runtime,
            ui: UiContext::non_interactive(),
            interrupt: Interrupt::new(),
        }
    }

    /// Use `ui` for console messages
    pub fn with_ui(mut self, ui: UiContext) -> Self {
        self.ui = ui;
        self
    }

    /// Share `interrupt` with the caller, which may trigger it at any time
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Run one package.
    ///
    /// Errors are returned only when the package cannot be opened or
    /// extracted, lacks its entry script, or Ctrl-C arrives before the script
    /// starts. Script failures are part of the report. The extraction root is
    /// removed before this returns on every path.
    pub async fn launch(&self, package: &Path) -> LauncherResult<LaunchReport> {
        let _watch = self.interrupt.watch_ctrl_c();
        // Let the watcher install its handler before any work starts
        tokio::task::yield_now().await;
        self.run_phases(package).await
    }

    async fn run_phases(&self, package: &Path) -> LauncherResult<LaunchReport> {
        let mut archive = PackageArchive::open(package)?;
        let workspace = Workspace::create(&self.settings.temp_root)?;
        let root = workspace.path().to_path_buf();

        debug!("Phase {}: {} -> {}", Phase::Extract, package.display(), root.display());
        let mut spinner = TaskSpinner::new(&self.ui);
        spinner.start(&format!("Extracting {}...", display_name(package)));
        let extracted = {
            let (root, interrupt) = (root.clone(), self.interrupt.clone());
            self.blocking(move || archive.extract_to(&root, &interrupt))
                .await
        };
        match extracted {
            Ok(files) => spinner.stop(&format!("Extracted {} files", files)),
            Err(e) => {
                spinner.stop_error("Extraction failed");
                return Err(e);
            }
        }

        debug!("Phase {}", Phase::VerifyEntry);
        let script = root.join(ENTRY_SCRIPT);
        if !script.is_file() {
            return Err(LauncherError::MissingEntry {
                name: ENTRY_SCRIPT.to_string(),
                package: package.to_path_buf(),
            });
        }

        debug!("Phase {} ({})", Phase::ComputeDigest, self.settings.digest);
        let digest = match self.settings.digest.digest_file(&script) {
            Ok(digest) => Some(digest),
            Err(e) => {
                warn!("Cannot fingerprint {}: {}", ENTRY_SCRIPT, e);
                ui::step_warn(&self.ui, &format!("Side files not cached: {}", e));
                None
            }
        };

        debug!("Phase {}", Phase::Materialize);
        let cache_dir = digest
            .as_deref()
            .map(|digest| cache::cache_dir_for(&self.settings.cache_root, digest));
        let side_files = match cache_dir {
            Some(ref dir) => self.materialize(&root, dir).await?,
            None => MaterializeReport::default(),
        };

        debug!("Phase {}", Phase::InstallDeps);
        let (dependencies, lookup) = self.install(&root).await?;
        self.interrupt.check()?;

        debug!("Phase {}", Phase::Execute);
        let context = InvocationContext::for_script(&script, lookup);
        ui::step_info(
            &self.ui,
            &format!("Running {} with {}", ENTRY_SCRIPT, self.runtime.runtime_name()),
        );
        let outcome = self.runtime.execute(&context).await;
        if outcome.is_success() {
            info!("{} completed", ENTRY_SCRIPT);
        } else {
            warn!("{} {}", ENTRY_SCRIPT, outcome);
            ui::step_error_detail(
                &self.ui,
                &format!("Error while running {}", ENTRY_SCRIPT),
                &outcome.to_string(),
            );
        }

        Ok(LaunchReport {
            digest,
            cache_dir,
            side_files,
            dependencies,
            outcome,
        })
    }

    /// Run filesystem work off the runtime thread so Ctrl-C stays observable
    async fn blocking<T, F>(&self, work: F) -> LauncherResult<T>
    where
        T: Send + 'static,
        F: FnOnce() -> LauncherResult<T> + Send + 'static,
    {
        tokio::task::spawn_blocking(work)
            .await
            .map_err(|e| LauncherError::User(format!("Launch task failed: {}", e)))?
    }

    async fn materialize(&self, root: &Path, cache_dir: &Path) -> LauncherResult<MaterializeReport> {
        let result = {
            let (root, dir) = (root.to_path_buf(), cache_dir.to_path_buf());
            let interrupt = self.interrupt.clone();
            self.blocking(move || cache::materialize(&root, &dir, &interrupt))
                .await
        };

        match result {
            Ok(report) => {
                for (name, reason) in &report.failed {
                    ui::step_warn(&self.ui, &format!("Failed to copy {}: {}", name, reason));
                }
                if !report.copied.is_empty() {
                    ui::step_ok_detail(
                        &self.ui,
                        &format!("Cached {} side file(s)", report.copied.len()),
                        &cache_dir.display().to_string(),
                    );
                }
                Ok(report)
            }
            Err(e) if e.is_interrupted() => Err(e),
            Err(e) => {
                warn!("Side-file caching failed: {}", e);
                ui::step_warn(&self.ui, &format!("Side files not cached: {}", e));
                Ok(MaterializeReport::default())
            }
        }
    }

    async fn install(&self, root: &Path) -> LauncherResult<(InstallReport, LookupPath)> {
        let installer = DependencyInstaller::new(self.settings.install_policy);
        let libs_dir = root.join(DEPENDENCY_DIR);
        let target = root.join(LIBRARY_DIR);
        let interrupt = self.interrupt.clone();

        let result = self
            .blocking(move || {
                let mut lookup = LookupPath::new();
                installer
                    .install(&libs_dir, &target, &mut lookup, &interrupt)
                    .map(|report| (report, lookup))
            })
            .await;

        match result {
            Ok((report, lookup)) => {
                for name in &report.installed {
                    ui::step_ok(&self.ui, &format!("Installing: {}", name));
                }
                for (name, reason) in &report.failed {
                    ui::step_warn(&self.ui, &format!("Failed to install {}: {}", name, reason));
                }
                if report.aborted {
                    ui::step_warn(&self.ui, "Dependency installation stopped early");
                }
                Ok((report, lookup))
            }
            Err(e) if e.is_interrupted() => Err(e),
            Err(e) => {
                warn!("Dependency installation failed: {}", e);
                ui::step_warn(&self.ui, &format!("Dependencies not installed: {}", e));
                Ok((InstallReport::default(), LookupPath::new()))
            }
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
