//! Layout of the persistent cache root
//!
//! One subdirectory per observed entry-script digest. The launcher never
//! deletes from here.

use super::digest::DigestAlgorithm;
use crate::error::{LauncherError, LauncherResult};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Cache directory for a digest
pub fn cache_dir_for(root: &Path, digest: &str) -> PathBuf {
    root.join(digest)
}

/// Summary of one cache directory
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Digest naming the directory
    pub digest: String,
    /// Full path of the directory
    pub path: PathBuf,
    /// Number of files beneath it
    pub files: u64,
    /// Total size of those files in bytes
    pub size_bytes: u64,
    /// Most recent modification time seen in the tree
    pub modified: Option<DateTime<Utc>>,
}

/// List cache directories under `root` whose names look like digests of
/// `algorithm`. A missing root yields an empty list.
pub fn list_caches(root: &Path, algorithm: DigestAlgorithm) -> LauncherResult<Vec<CacheEntry>> {
    if !root.exists() {
        debug!("Cache root {} does not exist", root.display());
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(root)
        .map_err(|e| LauncherError::io(format!("listing cache root {}", root.display()), e))?;

    let mut caches: Vec<CacheEntry> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| {
            let digest = entry.file_name().to_str()?.to_string();
            algorithm
                .matches(&digest)
                .then(|| summarize(digest, entry.path()))
        })
        .collect();

    caches.sort_by(|a, b| a.digest.cmp(&b.digest));
    Ok(caches)
}

fn summarize(digest: String, path: PathBuf) -> CacheEntry {
    let mut files = 0;
    let mut size_bytes = 0;
    let mut modified: Option<DateTime<Utc>> = None;

    for entry in WalkDir::new(&path).into_iter().filter_map(Result::ok) {
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if metadata.is_file() {
            files += 1;
            size_bytes += metadata.len();
        }
        if let Ok(time) = metadata.modified() {
            let time = DateTime::<Utc>::from(time);
            if modified.map_or(true, |current| time > current) {
                modified = Some(time);
            }
        }
    }

    CacheEntry {
        digest,
        path,
        files,
        size_bytes,
        modified,
    }
}
