//! Artifact export: deterministic naming + EDF serialisation.
//!
//! One artifact per (interval, reference mode):
//! `{patient}_night_{n}.{i}_scalp{suffix}.edf` with 1-based night and
//! interval numbers.
use std::path::{Path, PathBuf};

use crate::buffer::SignalBuffer;
use crate::edf;
use crate::error::{MergeError, Result};
use crate::montage::RefMode;

/// Artifact file name for one interval × mode.
pub fn artifact_name(patient: &str, night: usize, interval: usize, mode: RefMode) -> String {
    format!(
        "{patient}_night_{}.{}_scalp{}.edf",
        night + 1,
        interval + 1,
        mode.suffix()
    )
}

/// Write one buffer to its artifact path. Failure is scoped to this
/// artifact only.
pub fn export_artifact(
    buf: &SignalBuffer,
    patient: &str,
    out_dir: &Path,
    night: usize,
    interval: usize,
    mode: RefMode,
) -> Result<PathBuf> {
    let path = out_dir.join(artifact_name(patient, night, interval, mode));
    edf::write_edf(buf, patient, &path).map_err(|source| MergeError::Export {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}
