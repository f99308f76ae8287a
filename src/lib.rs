//! pyp - portable package launcher
//!
//! Runs self-contained `.pyp` packages: a zip archive holding an entry
//! script (`script.py`), optional dependency archives under `modules/`, and
//! any side files the script needs next to it. Each run extracts into a
//! private temporary tree that is always removed afterwards; side files are
//! also copied into a persistent cache keyed by the entry script's digest.

pub mod archive;
pub mod cache;
pub mod clean;
pub mod cli;
pub mod config;
pub mod error;
pub mod install;
pub mod interrupt;
pub mod launcher;
pub mod runtime;
pub mod ui;

pub use error::{LauncherError, LauncherResult};
