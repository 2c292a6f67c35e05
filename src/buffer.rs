//! In-memory multi-channel signal buffer.
//!
//! [`SignalBuffer`] is the unit of work everywhere downstream of the codec:
//! `[C, T]` samples plus channel names, sampling rate, and the wall-clock
//! start of the first sample. Each buffer is exclusively owned by the worker
//! processing one interval; buffers are never shared across intervals or
//! nights.
use chrono::NaiveDateTime;
use ndarray::{concatenate, Array2, Axis};

use crate::error::{MergeError, Result};

#[derive(Debug, Clone)]
pub struct SignalBuffer {
    pub ch_names: Vec<String>,
    /// Sampling rate in Hz.
    pub sfreq: f32,
    /// Wall-clock time of the first sample.
    pub start: NaiveDateTime,
    /// Samples, shape `[C, T]`.
    pub data: Array2<f32>,
}

impl SignalBuffer {
    pub fn n_channels(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_samples(&self) -> usize {
        self.data.ncols()
    }

    /// Index of a channel by exact name.
    pub fn channel_index(&self, name: &str) -> Option<usize> {
        self.ch_names.iter().position(|n| n == name)
    }

    /// Rename channels through `f`.
    pub fn rename_channels(&mut self, f: impl Fn(&str) -> String) {
        for name in &mut self.ch_names {
            *name = f(name);
        }
    }

    /// Keep only the channels at `keep` (in the given order).
    pub fn select_channels(&self, keep: &[usize]) -> SignalBuffer {
        let ch_names = keep.iter().map(|&i| self.ch_names[i].clone()).collect();
        let mut data = Array2::zeros((keep.len(), self.n_samples()));
        for (row, &i) in keep.iter().enumerate() {
            data.row_mut(row).assign(&self.data.row(i));
        }
        SignalBuffer {
            ch_names,
            sfreq: self.sfreq,
            start: self.start,
            data,
        }
    }

    /// Append `next` in time. Channel lists and sampling rates must match
    /// exactly; the merged buffer keeps `self`'s start time.
    pub fn append(&mut self, next: SignalBuffer) -> Result<()> {
        if self.ch_names != next.ch_names {
            return Err(MergeError::Mismatch(format!(
                "channel lists differ ({} vs {} channels)",
                self.n_channels(),
                next.n_channels()
            )));
        }
        if (self.sfreq - next.sfreq).abs() > 1e-3 {
            return Err(MergeError::Mismatch(format!(
                "sampling rates differ ({} vs {} Hz)",
                self.sfreq, next.sfreq
            )));
        }
        self.data = concatenate(Axis(1), &[self.data.view(), next.data.view()])
            .map_err(|e| MergeError::Mismatch(e.to_string()))?;
        Ok(())
    }
}
