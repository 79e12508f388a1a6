//! Seams between the export pipeline and the outside world.

use std::path::{Path, PathBuf};

use super::errors::{QueryError, TransferError};
use super::models::{LibraryItem, LibrarySection};

/// Read access to the media server's libraries.
pub trait LibraryQuery {
    /// Movie and show sections; other section types are left out.
    fn sections(&self) -> Result<Vec<LibrarySection>, QueryError>;

    /// Items of `section` in listing order. Items labelled `"Overlay"` are
    /// dropped unless `include_overlays` is set.
    fn items(
        &self,
        section: &LibrarySection,
        include_overlays: bool,
    ) -> Result<Vec<LibraryItem>, QueryError>;
}

/// Downloads one remote resource into `dir/filename`.
///
/// Implementations create `dir` when it is missing and write exactly one
/// file. The returned path is the file written.
pub trait AssetFetcher: Send + Sync {
    fn fetch(&self, accessor: &str, dir: &Path, filename: &str) -> Result<PathBuf, TransferError>;
}

pub trait FileProbe: Send + Sync {
    fn exists(&self, dir: &Path, filename: &str) -> bool;
}

/// Probe backed by the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

impl FileProbe for LocalFs {
    fn exists(&self, dir: &Path, filename: &str) -> bool {
        dir.join(filename).is_file()
    }
}
