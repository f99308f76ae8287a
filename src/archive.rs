//! Zip archive extraction for packages and their dependency archives

use crate::error::{LauncherError, LauncherResult};
use crate::interrupt::Interrupt;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use zip::result::ZipError;
use zip::ZipArchive;

/// Reserved name of the entry script at the package root
pub const ENTRY_SCRIPT: &str = "script.py";

/// Reserved name of the dependency directory at the package root
pub const DEPENDENCY_DIR: &str = "modules";

/// Directory under the extraction root that receives installed dependencies
pub const LIBRARY_DIR: &str = "site-packages";

/// Extension of package archives offered by the browser
pub const PACKAGE_EXTENSION: &str = "pyp";

/// Extension of installable dependency archives inside [`DEPENDENCY_DIR`]
pub const WHEEL_EXTENSION: &str = "whl";

/// An opened, validated zip container
pub struct PackageArchive {
    path: PathBuf,
    archive: ZipArchive<BufReader<File>>,
}

impl PackageArchive {
    /// Open and validate a zip-format archive
    pub fn open(path: &Path) -> LauncherResult<Self> {
        let file = File::open(path)
            .map_err(|e| LauncherError::io(format!("opening archive {}", path.display()), e))?;
        let archive =
            ZipArchive::new(BufReader::new(file)).map_err(|e| LauncherError::archive(path, e))?;

        debug!("Opened {} ({} entries)", path.display(), archive.len());
        Ok(Self {
            path: path.to_path_buf(),
            archive,
        })
    }

    /// Contents of the file entry stored under exactly `name`, if any
    pub fn read_entry(&mut self, name: &str) -> LauncherResult<Option<Vec<u8>>> {
        let mut entry = match self.archive.by_name(name) {
            Ok(entry) if entry.is_file() => entry,
            Ok(_) | Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(LauncherError::archive(&self.path, e)),
        };

        let mut contents = Vec::new();
        entry
            .read_to_end(&mut contents)
            .map_err(|e| LauncherError::io(format!("reading {} from {}", name, self.path.display()), e))?;
        Ok(Some(contents))
    }

    /// Expand every entry into `dest`, overwriting existing files.
    ///
    /// Returns the number of files written. Entries whose names would land
    /// outside `dest` are skipped. `interrupt` is checked before each entry.
    pub fn extract_to(&mut self, dest: &Path, interrupt: &Interrupt) -> LauncherResult<usize> {
        fs::create_dir_all(dest)
            .map_err(|e| LauncherError::io(format!("creating {}", dest.display()), e))?;

        let mut written = 0;
        for i in 0..self.archive.len() {
            interrupt.check()?;
            let mut entry = self
                .archive
                .by_index(i)
                .map_err(|e| LauncherError::archive(&self.path, e))?;

            let relative = match entry.enclosed_name() {
                Some(path) => path.to_path_buf(),
                None => {
                    warn!("Skipping entry with unsafe path: {}", entry.name());
                    continue;
                }
            };
            let dest_path = dest.join(&relative);

            if entry.is_dir() {
                fs::create_dir_all(&dest_path).map_err(|e| {
                    LauncherError::io(format!("creating {}", dest_path.display()), e)
                })?;
                continue;
            }

            if let Some(parent) = dest_path.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| LauncherError::io(format!("creating {}", parent.display()), e))?;
            }

            let mut outfile = File::create(&dest_path)
                .map_err(|e| LauncherError::io(format!("writing {}", dest_path.display()), e))?;
            io::copy(&mut entry, &mut outfile)
                .map_err(|e| LauncherError::io(format!("writing {}", dest_path.display()), e))?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = entry.unix_mode() {
                    // Keep the owner able to rewrite and clean up the file
                    let permissions = fs::Permissions::from_mode((mode & 0o7777) | 0o600);
                    fs::set_permissions(&dest_path, permissions).map_err(|e| {
                        LauncherError::io(format!("setting mode on {}", dest_path.display()), e)
                    })?;
                }
            }

            written += 1;
        }

        debug!("Extracted {} files into {}", written, dest.display());
        Ok(written)
    }
}

/// Expand a zip-format archive into `dest`
pub fn extract(archive_path: &Path, dest: &Path, interrupt: &Interrupt) -> LauncherResult<usize> {
    PackageArchive::open(archive_path)?.extract_to(dest, interrupt)
}

/// Whether `path` carries the given extension, case-insensitively
pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::fs::File;
    use std::io::Write;
    use std::path::Path;
    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    /// Write a zip archive with the given (name, contents) file entries
    pub fn write_zip<C: AsRef<[u8]>>(path: &Path, entries: &[(&str, C)]) {
        let file = File::create(path).unwrap();
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, contents) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(contents.as_ref()).unwrap();
        }
        zip.finish().unwrap();
    }

    /// Build a zip archive in memory
    pub fn zip_bytes<C: AsRef<[u8]>>(entries: &[(&str, C)]) -> Vec<u8> {
        let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, contents) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(contents.as_ref()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::write_zip;
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn extract_preserves_relative_paths() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("demo.pyp");
        write_zip(
            &archive,
            &[
                ("script.py", "print('hello')\n"),
                ("data/nested/values.csv", "a,b\n1,2\n"),
            ],
        );

        let dest = dir.path().join("out");
        let written = extract(&archive, &dest, &Interrupt::new()).unwrap();

        assert_eq!(written, 2);
        assert_eq!(
            fs::read_to_string(dest.join("script.py")).unwrap(),
            "print('hello')\n"
        );
        assert_eq!(
            fs::read_to_string(dest.join("data/nested/values.csv")).unwrap(),
            "a,b\n1,2\n"
        );
    }

    #[test]
    fn extract_overwrites_existing_files() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("demo.pyp");
        write_zip(&archive, &[("config.txt", "new")]);

        let dest = dir.path().join("out");
        fs::create_dir_all(&dest).unwrap();
        fs::write(dest.join("config.txt"), "old").unwrap();

        extract(&archive, &dest, &Interrupt::new()).unwrap();
        assert_eq!(fs::read_to_string(dest.join("config.txt")).unwrap(), "new");
    }

    #[test]
    fn rejects_non_zip_input() {
        let dir = TempDir::new().unwrap();
        let bogus = dir.path().join("bogus.pyp");
        fs::write(&bogus, "definitely not a zip file").unwrap();

        let err = PackageArchive::open(&bogus).err().unwrap();
        assert!(matches!(err, LauncherError::ArchiveFormat { .. }));
    }

    #[test]
    fn missing_archive_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = PackageArchive::open(&dir.path().join("absent.pyp"))
            .err()
            .unwrap();
        assert!(matches!(err, LauncherError::Io { .. }));
    }

    #[test]
    fn skips_entries_escaping_destination() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("evil.pyp");
        write_zip(
            &archive,
            &[("../escaped.txt", "nope"), ("script.py", "pass\n")],
        );

        let dest = dir.path().join("out");
        let written = extract(&archive, &dest, &Interrupt::new()).unwrap();

        assert_eq!(written, 1);
        assert!(!dir.path().join("escaped.txt").exists());
        assert!(dest.join("script.py").exists());
    }

    #[test]
    fn interrupted_extraction_stops_before_writing() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("demo.pyp");
        write_zip(&archive, &[("script.py", "pass\n"), ("data.txt", "x")]);

        let interrupt = Interrupt::new();
        interrupt.trigger();
        let dest = dir.path().join("out");
        let err = extract(&archive, &dest, &interrupt).unwrap_err();

        assert!(err.is_interrupted());
        assert!(!dest.join("script.py").exists());
    }

    #[test]
    fn read_entry_finds_root_files_only() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("demo.pyp");
        write_zip(
            &archive,
            &[("script.py", "print(1)\n"), ("nested/other.py", "pass\n")],
        );

        let mut opened = PackageArchive::open(&archive).unwrap();
        assert_eq!(
            opened.read_entry(ENTRY_SCRIPT).unwrap(),
            Some(b"print(1)\n".to_vec())
        );
        assert_eq!(opened.read_entry("other.py").unwrap(), None);
    }

    #[test]
    fn extension_matching() {
        assert!(has_extension(Path::new("a/b/demo.pyp"), PACKAGE_EXTENSION));
        assert!(has_extension(Path::new("LIB.WHL"), WHEEL_EXTENSION));
        assert!(!has_extension(Path::new("notes.txt"), WHEEL_EXTENSION));
        assert!(!has_extension(Path::new("whl"), WHEEL_EXTENSION));
    }
}
