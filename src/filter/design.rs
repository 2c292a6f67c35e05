//! Windowed-sinc FIR design for the cleaning chain.
//!
//! Two filters are designed per run: a 0.5–80 Hz bandpass (difference of
//! two Hamming lowpasses) and a line-noise bandstop (spectral inversion of
//! a narrow bandpass around the notch centre). Transition bandwidths and
//! tap counts follow the `firwin` conventions: transition bandwidth
//! `min(max(0.25·f, 2.0), f)` at the band edge, tap count
//! `ceil(3.3 / trans_bw · sfreq)` rounded up to odd.
use std::f64::consts::PI;

/// Transition bandwidth for a band edge at `freq` Hz, clamped so it never
/// crosses DC or Nyquist.
pub fn auto_trans_bandwidth(freq: f32, sfreq: f32) -> f32 {
    (0.25 * freq).max(2.0).min(freq).min(sfreq / 2.0 - freq)
}

/// Number of FIR taps for a transition bandwidth, rounded up to odd
/// (linear phase requires symmetric taps around a centre).
pub fn auto_filter_length(trans_bw: f32, sfreq: f32) -> usize {
    let n = (3.3 / trans_bw * sfreq).ceil() as usize;
    if n % 2 == 0 {
        n + 1
    } else {
        n
    }
}

/// Hamming window of length `n`.
pub fn hamming(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f64 / (n - 1) as f64).cos())
        .collect()
}

/// Hamming-windowed sinc lowpass with unit DC gain. `n` must be odd.
pub fn firwin_lowpass(n: usize, cutoff_hz: f32, sfreq: f32) -> Vec<f64> {
    assert!(n % 2 == 1, "linear-phase FIR needs odd tap count");
    let alpha = (n - 1) as f64 / 2.0;
    let fc = cutoff_hz as f64 / (sfreq as f64 / 2.0); // normalised [0, 1]
    let win = hamming(n);

    let mut h: Vec<f64> = (0..n)
        .map(|i| {
            let x = i as f64 - alpha;
            let sinc = if x == 0.0 { fc } else { (PI * fc * x).sin() / (PI * x) };
            sinc * win[i]
        })
        .collect();

    let s: f64 = h.iter().sum();
    h.iter_mut().for_each(|v| *v /= s);
    h
}

/// Zero-phase bandpass covering `lo`–`hi` Hz: difference of two lowpasses
/// whose cutoffs sit at the midpoints of the transition bands.
pub fn design_bandpass(lo: f32, hi: f32, sfreq: f32) -> Vec<f32> {
    let tb_lo = auto_trans_bandwidth(lo, sfreq);
    let tb_hi = auto_trans_bandwidth(hi, sfreq);
    // The narrower transition dictates the tap count.
    let n = auto_filter_length(tb_lo.min(tb_hi), sfreq);

    let lp_hi = firwin_lowpass(n, hi + tb_hi / 2.0, sfreq);
    let lp_lo = firwin_lowpass(n, lo - tb_lo / 2.0, sfreq);

    lp_hi
        .iter()
        .zip(lp_lo.iter())
        .map(|(&a, &b)| (a - b) as f32)
        .collect()
}

/// Zero-phase bandstop notch centred at `center` Hz with a total stop width
/// of `width` Hz: spectral inversion of the narrow bandpass over the stop
/// band, using a 1 Hz transition.
pub fn design_notch(center: f32, width: f32, sfreq: f32) -> Vec<f32> {
    let trans_bw = 1.0_f32;
    let n = auto_filter_length(trans_bw, sfreq);
    let lo = center - width / 2.0;
    let hi = center + width / 2.0;

    let lp_hi = firwin_lowpass(n, hi + trans_bw / 2.0, sfreq);
    let lp_lo = firwin_lowpass(n, lo - trans_bw / 2.0, sfreq);

    // delta - bandpass: pass everything except the stop band.
    let mut h: Vec<f64> = lp_hi
        .iter()
        .zip(lp_lo.iter())
        .map(|(&a, &b)| -(a - b))
        .collect();
    h[n / 2] += 1.0;
    h.iter().map(|&v| v as f32).collect()
}
