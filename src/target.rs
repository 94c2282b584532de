//! The file under analysis.
//!
//! The content is memory-mapped once when the target is opened and shared
//! read-only by every structural step of one analysis.

use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use tracing::debug;

use crate::error::Result;

/// A file path plus its byte content.
pub struct AnalysisTarget {
    path: PathBuf,
    // None when the file size is zero; memmap cannot map empty files.
    mmap: Option<Mmap>,
}

impl AnalysisTarget {
    /// Open and map `path` read-only.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let size = file.metadata()?.len();

        debug!(path = %path.display(), size, "Opening analysis target");

        let mmap = if size == 0 {
            None
        } else {
            // Safety: read-only map of a regular file; the target is treated as
            // immutable for the duration of one analysis.
            Some(unsafe { Mmap::map(&file)? })
        };

        Ok(Self {
            path: path.to_path_buf(),
            mmap,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Full file content.
    pub fn bytes(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes().is_empty()
    }
}

impl std::fmt::Debug for AnalysisTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisTarget")
            .field("path", &self.path)
            .field("len", &self.len())
            .finish()
    }
}
