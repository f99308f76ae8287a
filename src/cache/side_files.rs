//! Copy package side files into the persistent cache
//!
//! Side files are every top-level entry of an extracted package except the
//! entry script and the dependency directory. Copies merge into whatever the
//! cache directory already holds: same-named files are overwritten, nothing
//! is ever removed.

use crate::archive::{DEPENDENCY_DIR, ENTRY_SCRIPT};
use crate::error::{LauncherError, LauncherResult};
use crate::interrupt::Interrupt;
use filetime::FileTime;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Outcome of a materialization pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MaterializeReport {
    /// Top-level entries copied in full
    pub copied: Vec<String>,
    /// Top-level entries that failed, with the reason
    pub failed: Vec<(String, String)>,
}

impl MaterializeReport {
    /// Whether every side file made it into the cache
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Whether a top-level package entry is reserved and stays out of the cache
pub fn is_reserved(name: &str) -> bool {
    name == DEPENDENCY_DIR || name == ENTRY_SCRIPT
}

/// Copy all side files of `extracted_root` into `cache_dir`.
///
/// Per-entry failures are logged and recorded; the remaining entries are
/// still copied. Only failing to list `extracted_root` and being
/// interrupted are errors.
pub fn materialize(
    extracted_root: &Path,
    cache_dir: &Path,
    interrupt: &Interrupt,
) -> LauncherResult<MaterializeReport> {
    fs::create_dir_all(cache_dir)
        .map_err(|e| LauncherError::io(format!("creating {}", cache_dir.display()), e))?;

    let entries = fs::read_dir(extracted_root)
        .map_err(|e| LauncherError::io(format!("listing {}", extracted_root.display()), e))?;

    let mut report = MaterializeReport::default();
    for entry in entries {
        interrupt.check()?;
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", extracted_root.display(), e);
                continue;
            }
        };

        let name = entry.file_name().to_string_lossy().into_owned();
        if is_reserved(&name) {
            continue;
        }

        let src = entry.path();
        let dest = cache_dir.join(entry.file_name());
        let result = if src.is_dir() {
            copy_tree(&src, &dest, interrupt)
        } else {
            copy_file(&src, &dest)
        };
        // A tree copy cut short is not a completed entry
        interrupt.check()?;

        match result {
            Ok(()) => {
                debug!("Cached {} -> {}", name, dest.display());
                report.copied.push(name);
            }
            Err(e) => {
                warn!("Failed to copy {}: {}", name, e);
                report.failed.push((name, e.to_string()));
            }
        }
    }

    Ok(report)
}

/// Copy one file, keeping its modification time
fn copy_file(src: &Path, dest: &Path) -> std::io::Result<()> {
    fs::copy(src, dest)?;
    let metadata = fs::metadata(src)?;
    filetime::set_file_mtime(dest, FileTime::from_last_modification_time(&metadata))
}

/// Merge a directory tree into `dest`, creating directories as needed.
///
/// Keeps going after a failed file and reports the first failure. Stops
/// quietly once `interrupt` is triggered.
fn copy_tree(src: &Path, dest: &Path, interrupt: &Interrupt) -> std::io::Result<()> {
    let mut first_error = None;

    for entry in WalkDir::new(src) {
        if interrupt.is_triggered() {
            break;
        }
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                first_error.get_or_insert_with(|| std::io::Error::other(e.to_string()));
                continue;
            }
        };

        let relative = match entry.path().strip_prefix(src) {
            Ok(relative) => relative,
            Err(_) => continue,
        };
        let target = dest.join(relative);

        let result = if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
        } else {
            copy_file(entry.path(), &target)
        };

        if let Err(e) = result {
            debug!("Copy of {} failed: {}", entry.path().display(), e);
            first_error.get_or_insert(e);
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
