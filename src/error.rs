//! Error taxonomy for the merge pipeline.
//!
//! Four families, matching how failures are scoped at runtime:
//! validation errors abort the whole run before any worker starts,
//! configuration errors are fatal at startup or at the specific
//! interval × mode they affect, decode errors fail one interval's export
//! only, and export errors fail one artifact only. Nothing is retried.
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MergeError {
    /// Catalog references a segment file absent from the segment directory.
    #[error("catalog references '{file}' which is missing from {dir}")]
    MissingSegment { file: String, dir: PathBuf },

    /// Catalog rows are not sorted ascending by start time.
    #[error("catalog is not sorted by start time (row {row}: '{file}')")]
    UnsortedCatalog { row: usize, file: String },

    /// A catalog row could not be parsed.
    #[error("malformed catalog row {row}: {detail}")]
    Catalog { row: usize, detail: String },

    /// Bad arguments, missing catalog file, or a referencing-table mismatch.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The codec failed on one segment file.
    #[error("failed to decode '{file}': {source}")]
    Decode {
        file: String,
        #[source]
        source: anyhow::Error,
    },

    /// Two buffers in one interval cannot be concatenated.
    #[error("cannot concatenate segments: {0}")]
    Mismatch(String),

    /// The cleaning chain failed on one interval's merged buffer.
    #[error("filter chain failed: {0}")]
    Filter(#[source] anyhow::Error),

    /// Write failure for one output artifact.
    #[error("failed to export {path}: {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = MergeError> = std::result::Result<T, E>;
