//! Interactive package picker
//!
//! Pages through directories, 25 entries at a time by default. Directories
//! navigate; only `.pyp` files can be picked.

use super::context::UiContext;
use super::output::step_warn;
use crate::archive::{self, PACKAGE_EXTENSION};
use crate::error::{LauncherError, LauncherResult};
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tracing::debug;

/// One directory entry shown in the browser
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseEntry {
    /// File name
    pub name: String,
    /// Full path
    pub path: PathBuf,
    /// Whether the entry is a directory (following symlinks)
    pub is_dir: bool,
}

/// A user action in the browser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowseChoice {
    /// Open the entry at this index in the directory listing
    Open(usize),
    /// Next page
    Next,
    /// Previous page
    Prev,
    /// Parent directory
    Up,
    /// Leave without picking
    Quit,
}

/// Result of applying a choice
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowseStep {
    /// Keep browsing
    Continue,
    /// A package was picked
    Selected(PathBuf),
    /// The user quit
    Cancelled,
    /// The choice was not acceptable; keep browsing
    Rejected(&'static str),
}

/// Browser position: directory and page
#[derive(Debug, Clone)]
pub struct Browser {
    current: PathBuf,
    page: usize,
    page_size: usize,
}

impl Browser {
    /// Start browsing at `start`
    pub fn new(start: &Path, page_size: usize) -> Self {
        let current = start
            .canonicalize()
            .unwrap_or_else(|_| start.to_path_buf());
        Self {
            current,
            page: 0,
            page_size: page_size.max(1),
        }
    }

    /// Directory being shown
    pub fn current(&self) -> &Path {
        &self.current
    }

    /// Zero-based page index
    pub fn page(&self) -> usize {
        self.page
    }

    /// Sorted entries of the current directory
    pub fn list(&self) -> io::Result<Vec<BrowseEntry>> {
        let mut entries: Vec<BrowseEntry> = fs::read_dir(&self.current)?
            .filter_map(Result::ok)
            .map(|entry| {
                let path = entry.path();
                BrowseEntry {
                    name: entry.file_name().to_string_lossy().into_owned(),
                    is_dir: path.is_dir(),
                    path,
                }
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// Number of pages for `count` entries (at least one)
    pub fn total_pages(&self, count: usize) -> usize {
        count.div_ceil(self.page_size).max(1)
    }

    /// Index range of the entries on the current page
    pub fn page_range(&self, count: usize) -> std::ops::Range<usize> {
        let start = (self.page * self.page_size).min(count);
        let end = (start + self.page_size).min(count);
        start..end
    }

    /// Move to the parent directory. Returns false at the filesystem root.
    pub fn go_up(&mut self) -> bool {
        match self.current.parent() {
            Some(parent) => {
                self.current = parent.to_path_buf();
                self.page = 0;
                true
            }
            None => false,
        }
    }

    /// Apply a choice against the current listing
    pub fn apply(&mut self, choice: BrowseChoice, entries: &[BrowseEntry]) -> BrowseStep {
        match choice {
            BrowseChoice::Quit => BrowseStep::Cancelled,
            BrowseChoice::Next => {
                if self.page + 1 < self.total_pages(entries.len()) {
                    self.page += 1;
                }
                BrowseStep::Continue
            }
            BrowseChoice::Prev => {
                self.page = self.page.saturating_sub(1);
                BrowseStep::Continue
            }
            BrowseChoice::Up => {
                self.go_up();
                BrowseStep::Continue
            }
            BrowseChoice::Open(index) => match entries.get(index) {
                None => BrowseStep::Rejected("Invalid index."),
                Some(entry) if entry.is_dir => {
                    self.current = entry.path.clone();
                    self.page = 0;
                    BrowseStep::Continue
                }
                Some(entry) if archive::has_extension(&entry.path, PACKAGE_EXTENSION) => {
                    BrowseStep::Selected(entry.path.clone())
                }
                Some(_) => BrowseStep::Rejected("Not a .pyp file."),
            },
        }
    }

    /// Menu items for the current page: (choice, label, hint)
    pub fn menu(&self, entries: &[BrowseEntry]) -> Vec<(BrowseChoice, String, String)> {
        let total = self.total_pages(entries.len());
        let mut items: Vec<(BrowseChoice, String, String)> = self
            .page_range(entries.len())
            .map(|i| {
                let entry = &entries[i];
                let label = if entry.is_dir {
                    format!("{}/", entry.name)
                } else {
                    entry.name.clone()
                };
                let hint = if entry.is_dir { "dir" } else { "" };
                (BrowseChoice::Open(i), label, hint.to_string())
            })
            .collect();

        if self.page + 1 < total {
            items.push((BrowseChoice::Next, "next page".into(), String::new()));
        }
        if self.page > 0 {
            items.push((BrowseChoice::Prev, "previous page".into(), String::new()));
        }
        if self.current.parent().is_some() {
            items.push((BrowseChoice::Up, "..".into(), "parent".into()));
        }
        items.push((BrowseChoice::Quit, "quit".into(), String::new()));
        items
    }
}

/// Let the user pick a package, starting at `start`.
///
/// Returns `None` when the user quits or no terminal is available.
pub async fn browse(
    ctx: &UiContext,
    start: &Path,
    page_size: usize,
) -> LauncherResult<Option<PathBuf>> {
    if !ctx.is_interactive() {
        debug!("No terminal available for package selection");
        return Ok(None);
    }

    let mut browser = Browser::new(start, page_size);
    loop {
        let entries = match browser.list() {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                step_warn(ctx, "Permission denied.");
                if !browser.go_up() {
                    return Ok(None);
                }
                continue;
            }
            Err(e) => {
                return Err(LauncherError::io(
                    format!("listing {}", browser.current().display()),
                    e,
                ))
            }
        };

        let title = format!(
            "{}  (page {}/{})",
            browser.current().display(),
            browser.page() + 1,
            browser.total_pages(entries.len())
        );
        let items = browser.menu(&entries);

        let picked = tokio::task::spawn_blocking(move || {
            let mut select = cliclack::select(title);
            for (value, label, hint) in items {
                select = select.item(value, label, hint);
            }
            select.interact()
        })
        .await
        .map_err(|e| LauncherError::User(format!("Browser task failed: {}", e)))?;

        let choice = match picked {
            Ok(choice) => choice,
            // Esc / Ctrl-C
            Err(_) => return Ok(None),
        };

        match browser.apply(choice, &entries) {
            BrowseStep::Continue => {}
            BrowseStep::Selected(path) => return Ok(Some(path)),
            BrowseStep::Cancelled => return Ok(None),
            BrowseStep::Rejected(reason) => step_warn(ctx, reason),
        }
    }
}
