use std::io::ErrorKind;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Reads changeset bodies. The runner only consumes this contract; where
/// the bodies actually live belongs to the implementation.
pub trait ChangesetReader: Send + Sync {
    /// Return the content of the changeset at `path`, relative to the
    /// reader's root. A missing file is a [`Error::ChangesetNotFound`].
    fn read(&self, path: &str) -> Result<String>;
}

/// [`ChangesetReader`] over a root directory (the file context).
pub struct DirReader {
    root: PathBuf,
}

impl DirReader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ChangesetReader for DirReader {
    fn read(&self, path: &str) -> Result<String> {
        let full = self.root.join(path);

        std::fs::read_to_string(&full).map_err(|e| match e.kind() {
            // Carry the resolved path so the operator sees which file is missing.
            ErrorKind::NotFound => Error::ChangesetNotFound(full),
            _ => Error::Io(e),
        })
    }
}
