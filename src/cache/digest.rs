//! Entry-script fingerprints used as cache keys
//!
//! The digest is a pure function of the script's bytes: two packages with an
//! identical `script.py` share one cache directory no matter what else they
//! carry.

use crate::error::{LauncherError, LauncherResult};
use md5::Md5;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Supported digest algorithms
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    /// MD5, 32 hex chars. Matches cache directories of existing installs.
    #[default]
    Md5,
    /// SHA-256, 64 hex chars
    Sha256,
}

impl DigestAlgorithm {
    /// Length of the hex string this algorithm produces
    pub fn hex_len(&self) -> usize {
        match self {
            Self::Md5 => 32,
            Self::Sha256 => 64,
        }
    }

    /// Hex digest of an in-memory buffer
    pub fn digest_bytes(&self, bytes: &[u8]) -> String {
        match self {
            Self::Md5 => hex::encode(Md5::digest(bytes)),
            Self::Sha256 => hex::encode(Sha256::digest(bytes)),
        }
    }

    /// Hex digest of a file's full contents
    pub fn digest_file(&self, path: &Path) -> LauncherResult<String> {
        let contents = fs::read(path)
            .map_err(|e| LauncherError::io(format!("reading {}", path.display()), e))?;
        Ok(self.digest_bytes(&contents))
    }

    /// Whether `name` looks like a digest this algorithm produced
    pub fn matches(&self, name: &str) -> bool {
        name.len() == self.hex_len() && name.bytes().all(|b| b.is_ascii_hexdigit())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = LauncherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(Self::Md5),
            "sha256" | "sha-256" => Ok(Self::Sha256),
            _ => Err(LauncherError::UnknownDigest(s.to_string())),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Md5 => "md5",
            Self::Sha256 => "sha256",
        };
        write!(f, "{}", name)
    }
}

/// Hex digest of a file using the default algorithm
pub fn digest(path: &Path) -> LauncherResult<String> {
    DigestAlgorithm::default().digest_file(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn md5_known_value() {
        assert_eq!(
            DigestAlgorithm::Md5.digest_bytes(b"print('hello')\n"),
            hex::encode(Md5::digest(b"print('hello')\n"))
        );
        assert_eq!(
            DigestAlgorithm::Md5.digest_bytes(b""),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
    }

    #[test]
    fn sha256_known_value() {
        assert_eq!(
            DigestAlgorithm::Sha256.digest_bytes(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn hash_deterministic() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("script.py");
        fs::write(&path, b"print('hello')\n").unwrap();

        let first = digest(&path).unwrap();
        let second = digest(&path).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 32);
        assert!(DigestAlgorithm::Md5.matches(&first));
    }

    #[test]
    fn identical_scripts_share_digest() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.py");
        let b = dir.path().join("b.py");
        fs::write(&a, b"import os\n").unwrap();
        fs::write(&b, b"import os\n").unwrap();

        for algorithm in [DigestAlgorithm::Md5, DigestAlgorithm::Sha256] {
            assert_eq!(
                algorithm.digest_file(&a).unwrap(),
                algorithm.digest_file(&b).unwrap()
            );
        }
    }

    #[test]
    fn hash_different_content() {
        assert_ne!(
            DigestAlgorithm::Sha256.digest_bytes(b"content 1"),
            DigestAlgorithm::Sha256.digest_bytes(b"content 2")
        );
    }

    #[test]
    fn unreadable_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = digest(&dir.path().join("missing.py")).unwrap_err();
        assert!(matches!(err, LauncherError::Io { .. }));
    }

    #[test]
    fn parse_algorithm_names() {
        assert_eq!("md5".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Md5);
        assert_eq!("SHA256".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha256);
        assert!("crc32".parse::<DigestAlgorithm>().is_err());
        assert_eq!(DigestAlgorithm::Sha256.to_string(), "sha256");
    }

    #[test]
    fn matches_rejects_foreign_names() {
        assert!(!DigestAlgorithm::Md5.matches("not-a-digest"));
        assert!(!DigestAlgorithm::Md5.matches(&"a".repeat(64)));
        assert!(DigestAlgorithm::Sha256.matches(&"a".repeat(64)));
    }
}
