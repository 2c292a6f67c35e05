//! The fixed signal-cleaning chain.
//!
//! Order is part of the contract: bandpass → line-noise notch →
//! per-channel constant detrend → amplitude scale. Design helpers live in
//! [`design`], the overlap-add convolution in [`apply`].

pub mod apply;
pub mod design;

pub use apply::{apply_fir_zero_phase, filter_1d};
pub use design::{auto_filter_length, auto_trans_bandwidth, design_bandpass, design_notch, firwin_lowpass, hamming};

use anyhow::Result;
use ndarray::Array2;

use crate::buffer::SignalBuffer;
use crate::MergeConfig;

/// Subtract each channel's mean (constant detrend).
pub fn detrend_constant_inplace(data: &mut Array2<f32>) {
    for mut row in data.rows_mut() {
        let m = row.mean().unwrap_or(0.0);
        row.mapv_inplace(|v| v - m);
    }
}

/// Run the full cleaning chain on one merged interval buffer.
pub fn apply_chain(buf: &mut SignalBuffer, cfg: &MergeConfig) -> Result<()> {
    let (lo, hi) = cfg.band;
    let bp = design_bandpass(lo, hi, buf.sfreq);
    apply_fir_zero_phase(&mut buf.data, &bp)?;

    let notch = design_notch(cfg.notch_freq, cfg.notch_width, buf.sfreq);
    apply_fir_zero_phase(&mut buf.data, &notch)?;

    detrend_constant_inplace(&mut buf.data);
    buf.data.mapv_inplace(|v| v * cfg.scale);
    Ok(())
}
