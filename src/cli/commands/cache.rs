//! Cache command - inspect the side-file cache

use crate::archive::{PackageArchive, ENTRY_SCRIPT};
use crate::cache::{self, CacheEntry, DigestAlgorithm};
use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::config::{Config, ConfigManager};
use crate::error::{LauncherError, LauncherResult};
use console::style;
use std::path::Path;
use tracing::debug;

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> LauncherResult<()> {
    let algorithm: DigestAlgorithm = config.cache.digest.parse()?;
    let root = ConfigManager::cache_root(config);
    debug!("Cache root: {}", root.display());

    match args.action {
        CacheAction::List { format } => list_caches(&root, algorithm, format),
        CacheAction::Path { package } => show_cache_path(&package, &root, algorithm),
    }
}

fn list_caches(root: &Path, algorithm: DigestAlgorithm, format: OutputFormat) -> LauncherResult<()> {
    let caches = cache::list_caches(root, algorithm)?;

    if caches.is_empty() {
        println!("No cache directories found in {}.", root.display());
        return Ok(());
    }

    match format {
        OutputFormat::Table => print_cache_table(&caches),
        OutputFormat::Json => print_cache_json(&caches)?,
        OutputFormat::Plain => print_cache_plain(&caches),
    }

    Ok(())
}

fn print_cache_table(caches: &[CacheEntry]) {
    println!(
        "{:<66} {:>7} {:>10} {:<16}",
        "DIGEST", "FILES", "SIZE", "MODIFIED"
    );
    println!("{}", "-".repeat(102));

    for cache in caches {
        let modified = cache
            .modified
            .map(|time| time.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| style("-").dim().to_string());

        println!(
            "{:<66} {:>7} {:>10} {:<16}",
            cache.digest,
            cache.files,
            format_bytes(cache.size_bytes),
            modified
        );
    }

    let total: u64 = caches.iter().map(|c| c.size_bytes).sum();
    println!();
    println!(
        "Total: {} cache(s), {}",
        caches.len(),
        format_bytes(total)
    );
}

fn print_cache_json(caches: &[CacheEntry]) -> LauncherResult<()> {
    #[derive(serde::Serialize)]
    struct CacheJson {
        digest: String,
        path: String,
        files: u64,
        size_bytes: u64,
        modified: Option<String>,
    }

    let json: Vec<CacheJson> = caches
        .iter()
        .map(|c| CacheJson {
            digest: c.digest.clone(),
            path: c.path.display().to_string(),
            files: c.files,
            size_bytes: c.size_bytes,
            modified: c.modified.map(|time| time.to_rfc3339()),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

fn print_cache_plain(caches: &[CacheEntry]) {
    for cache in caches {
        println!("{}", cache.path.display());
    }
}

/// Fingerprint a package's entry script without unpacking the rest
fn show_cache_path(package: &Path, root: &Path, algorithm: DigestAlgorithm) -> LauncherResult<()> {
    if !package.exists() {
        return Err(LauncherError::PathNotFound(package.to_path_buf()));
    }

    let script = PackageArchive::open(package)?
        .read_entry(ENTRY_SCRIPT)?
        .ok_or_else(|| LauncherError::MissingEntry {
            name: ENTRY_SCRIPT.to_string(),
            package: package.to_path_buf(),
        })?;

    let digest = algorithm.digest_bytes(&script);
    println!("{}", cache::cache_dir_for(root, &digest).display());
    Ok(())
}

/// Format bytes as human-readable size (e.g., "1.5 MB")
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::test_support::write_zip;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn format_bytes_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024 + 512 * 1024), "5.5 MB");
    }

    #[test]
    fn cache_path_requires_entry_script() {
        let temp = TempDir::new().unwrap();
        let package = temp.path().join("empty.pyp");
        write_zip(&package, &[("notes.txt", "hi"), ("lib/script.py", "pass")]);

        let err = show_cache_path(&package, &temp.path().join("cache"), DigestAlgorithm::Md5)
            .unwrap_err();

        assert!(matches!(err, LauncherError::MissingEntry { .. }));
    }

    #[test]
    fn cache_path_needs_no_scratch_space() {
        let temp = TempDir::new().unwrap();
        let package = temp.path().join("demo.pyp");
        write_zip(&package, &[("script.py", "print('x')\n")]);

        show_cache_path(&package, &temp.path().join("cache"), DigestAlgorithm::Md5).unwrap();

        let names: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .filter_map(Result::ok)
            .map(|e| e.file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("demo.pyp")]);
    }

    #[test]
    fn listing_empty_root_succeeds() {
        let temp = TempDir::new().unwrap();
        list_caches(
            &temp.path().join("missing"),
            DigestAlgorithm::Md5,
            OutputFormat::Plain,
        )
        .unwrap();
    }
}
