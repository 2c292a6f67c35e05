//! Per-segment loading: decode one file and canonicalise it.
//!
//! [`SegmentCodec`] is the narrow seam to the underlying file format; the
//! production codec is the native EDF reader. Canonicalisation applies the
//! scalp montage trim and decimates to the target rate, so every buffer a
//! reducer sees is directly concatenatable.
use std::path::{Path, PathBuf};

use crate::buffer::SignalBuffer;
use crate::error::{MergeError, Result};
use crate::{edf, montage, resample};

/// Decodes one segment file into a raw multi-channel buffer.
pub trait SegmentCodec: Send + Sync {
    fn decode(&self, path: &Path) -> anyhow::Result<SignalBuffer>;
}

/// Production codec: native EDF.
#[derive(Debug, Default)]
pub struct EdfCodec;

impl SegmentCodec for EdfCodec {
    fn decode(&self, path: &Path) -> anyhow::Result<SignalBuffer> {
        edf::read_edf(path)
    }
}

/// Loads segments from one directory and canonicalises them.
pub struct SegmentLoader<'a> {
    codec: &'a dyn SegmentCodec,
    dir: PathBuf,
    target_sfreq: f32,
}

impl<'a> SegmentLoader<'a> {
    pub fn new(codec: &'a dyn SegmentCodec, dir: &Path, target_sfreq: f32) -> Self {
        Self {
            codec,
            dir: dir.to_path_buf(),
            target_sfreq,
        }
    }

    /// Decode `file_name`, trim to the scalp montage, decimate to the
    /// target rate. Any failure is a decode error scoped to this segment.
    pub fn load(&self, file_name: &str) -> Result<SignalBuffer> {
        let path = self.dir.join(file_name);
        let raw = self.codec.decode(&path).map_err(|source| MergeError::Decode {
            file: file_name.to_string(),
            source,
        })?;
        let mut scalp = montage::scalp_montage(raw).map_err(|e| MergeError::Decode {
            file: file_name.to_string(),
            source: anyhow::anyhow!(e.to_string()),
        })?;
        if (scalp.sfreq - self.target_sfreq).abs() > 1e-3 {
            scalp.data = resample::resample(&scalp.data, scalp.sfreq, self.target_sfreq)
                .map_err(|source| MergeError::Decode {
                    file: file_name.to_string(),
                    source,
                })?;
            scalp.sfreq = self.target_sfreq;
        }
        Ok(scalp)
    }
}
