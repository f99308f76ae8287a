//! Best-effort removal of directory trees
//!
//! The walk is bottom-up and driven by an explicit stack, so tree depth is
//! bounded only by heap memory. Symbolic links are unlinked, never followed.
//! Every individual failure is ignored: the routine always returns and
//! never reports an error.

use std::fs;
use std::path::Path;
use tracing::debug;

/// Delete `path` and everything beneath it, ignoring all failures
pub fn remove_tree(path: &Path) {
    #[cfg(unix)]
    unix::remove_contents(path);
    #[cfg(not(unix))]
    portable::remove_contents(path);

    if fs::remove_dir(path).is_err() && fs::remove_file(path).is_err() && path.exists() {
        debug!("Could not fully remove {}", path.display());
    }
}

/// Descriptor-relative walk. Frames hold names only and a single directory
/// descriptor is kept per level being processed, so neither the call stack
/// nor `PATH_MAX` limits depth.
#[cfg(unix)]
mod unix {
    use nix::dir::Dir;
    use nix::fcntl::{self, AtFlags, OFlag};
    use nix::sys::stat::{self, Mode, SFlag};
    use nix::unistd::{self, UnlinkatFlags};
    use std::ffi::{CStr, CString};
    use std::os::fd::OwnedFd;
    use std::path::Path;

    fn dir_flags() -> OFlag {
        OFlag::O_RDONLY | OFlag::O_DIRECTORY | OFlag::O_NOFOLLOW | OFlag::O_CLOEXEC
    }

    struct Frame {
        /// Name of the directory being emptied, relative to its parent
        name: CString,
        /// Parent entries still to process
        pending: Vec<CString>,
    }

    pub(super) fn remove_contents(root: &Path) {
        let Ok(mut current) = fcntl::open(root, dir_flags(), Mode::empty()) else {
            return;
        };

        let mut stack: Vec<Frame> = Vec::new();
        let mut pending = read_names(&current);

        loop {
            match pending.pop() {
                Some(name) => {
                    if !is_directory(&current, &name) {
                        unlink(&current, &name, UnlinkatFlags::NoRemoveDir);
                        continue;
                    }
                    match open_dir(&current, &name) {
                        Some(child) => {
                            let child_pending = read_names(&child);
                            stack.push(Frame {
                                name,
                                pending: std::mem::replace(&mut pending, child_pending),
                            });
                            current = child;
                        }
                        None => unlink(&current, &name, UnlinkatFlags::RemoveDir),
                    }
                }
                None => {
                    let Some(frame) = stack.pop() else {
                        break;
                    };
                    let Some(parent) = open_dir(&current, c"..") else {
                        break;
                    };
                    current = parent;
                    unlink(&current, &frame.name, UnlinkatFlags::RemoveDir);
                    pending = frame.pending;
                }
            }
        }
    }

    fn open_dir(parent: &OwnedFd, name: &CStr) -> Option<OwnedFd> {
        fcntl::openat(parent, name, dir_flags(), Mode::empty()).ok()
    }

    fn unlink(dir: &OwnedFd, name: &CStr, flags: UnlinkatFlags) {
        let _ = unistd::unlinkat(dir, name, flags);
    }

    /// Real directory (not a symlink to one)
    fn is_directory(dir: &OwnedFd, name: &CStr) -> bool {
        stat::fstatat(dir, name, AtFlags::AT_SYMLINK_NOFOLLOW)
            .map(|st| SFlag::from_bits_truncate(st.st_mode) & SFlag::S_IFMT == SFlag::S_IFDIR)
            .unwrap_or(false)
    }

    /// Entry names of `dir`, excluding `.` and `..`
    fn read_names(dir: &OwnedFd) -> Vec<CString> {
        let Ok(mut stream) = Dir::openat(dir, c".", dir_flags(), Mode::empty()) else {
            return Vec::new();
        };

        stream
            .iter()
            .flatten()
            .map(|entry| entry.file_name().to_owned())
            .filter(|name| name.as_bytes() != b"." && name.as_bytes() != b"..")
            .collect()
    }
}

/// Path-based walk for platforms without `openat`
#[cfg(any(not(unix), test))]
mod portable {
    use std::fs;
    use std::path::{Path, PathBuf};

    enum Step {
        Visit(PathBuf),
        /// All children have been handled
        Leave(PathBuf),
    }

    pub(super) fn remove_contents(root: &Path) {
        let mut stack = vec![Step::Visit(root.to_path_buf())];

        while let Some(step) = stack.pop() {
            let path = match step {
                Step::Leave(path) => {
                    let _ = fs::remove_dir(&path);
                    continue;
                }
                Step::Visit(path) => path,
            };

            let Ok(metadata) = fs::symlink_metadata(&path) else {
                continue;
            };

            if metadata.file_type().is_symlink() {
                if fs::remove_file(&path).is_err() {
                    let _ = fs::remove_dir(&path);
                }
            } else if metadata.is_dir() {
                stack.push(Step::Leave(path.clone()));
                if let Ok(entries) = fs::read_dir(&path) {
                    stack.extend(entries.flatten().map(|entry| Step::Visit(entry.path())));
                }
            } else {
                let _ = fs::remove_file(&path);
            }
        }
    }
}
