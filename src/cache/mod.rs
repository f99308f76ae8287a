//! Persistent side-file cache
//!
//! Provides content-addressed storage keyed by the entry script's digest.
//! Every run of a package merges its side files into the directory named by
//! that digest, so the cache grows monotonically across runs.
//!
//! # Layout
//!
//! | Path | Contents |
//! |------|----------|
//! | `<root>/<digest>/` | Union of side files from every run with this digest |
//!
//! Concurrent launches of packages sharing a digest write to the same
//! directory without locking; the last copy of a given file wins.

pub mod digest;
pub mod side_files;
pub mod store;

pub use digest::{digest, DigestAlgorithm};
pub use side_files::{is_reserved, materialize, MaterializeReport};
pub use store::{cache_dir_for, list_caches, CacheEntry};
