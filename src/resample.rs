//! FFT-based resampler used to decimate acquisition-rate segments (2000 Hz)
//! down to the merge target rate (200 Hz).
//!
//! Per channel:
//!   1. reflect-limited pad to soften edge transients,
//!   2. forward FFT of the padded signal,
//!   3. truncate (downsampling) or zero-pad (upsampling) the half-spectrum,
//!      with the Nyquist bin doubled resp. halved for even lengths,
//!   4. inverse FFT at the new padded length, scaled by the length ratio,
//!   5. strip the resampled padding.
use anyhow::Result;
use ndarray::Array2;
use rustfft::{num_complex::Complex, FftPlanner};

/// Symmetric padding sizes that bring `n` up to the next power of two
/// (capped at 100 samples of intrinsic padding per side).
pub fn auto_npad(n: usize) -> (usize, usize) {
    let min_add = (n / 8).min(100) * 2;
    let next_pow2 = 1usize << (((n + min_add) as f64).log2().ceil() as u32);
    let total = next_pow2 - n;
    (total / 2, total - total / 2)
}

/// Resample `data` (`[C, T]`) from `src_sfreq` to `dst_sfreq`. Rates within
/// 1 mHz of each other pass the data through untouched.
pub fn resample(data: &Array2<f32>, src_sfreq: f32, dst_sfreq: f32) -> Result<Array2<f32>> {
    if (src_sfreq - dst_sfreq).abs() < 1e-3 {
        return Ok(data.clone());
    }
    let ratio = dst_sfreq as f64 / src_sfreq as f64;
    let n_in = data.ncols();
    let out_len = (ratio * n_in as f64).round() as usize;

    let (npad_l, npad_r) = auto_npad(n_in);
    let mut out = Array2::<f32>::zeros((data.nrows(), out_len));
    for (ch, row) in data.rows().into_iter().enumerate() {
        let x: Vec<f32> = row.to_vec();
        let y = resample_1d(&x, ratio, npad_l, npad_r)?;
        out.row_mut(ch).assign(&ndarray::ArrayView1::from(&y));
    }
    Ok(out)
}

/// Resample one channel with explicit (possibly asymmetric) padding.
pub fn resample_1d(x: &[f32], ratio: f64, npad_l: usize, npad_r: usize) -> Result<Vec<f32>> {
    let n_in = x.len();
    if n_in == 0 {
        return Ok(vec![]);
    }
    let out_len = (ratio * n_in as f64).round() as usize;

    // Reflect-limited padding; padding beyond n-1 is clamped.
    let pad_l = npad_l.min(n_in - 1);
    let pad_r = npad_r.min(n_in - 1);
    let old_len = n_in + pad_l + pad_r;

    let mut x_ext = Vec::with_capacity(old_len);
    for i in (1..=pad_l).rev() {
        x_ext.push(2.0 * x[0] - x[i]);
    }
    x_ext.extend_from_slice(x);
    let last = x[n_in - 1];
    for i in 1..=pad_r {
        let idx = (n_in - 1).saturating_sub(i);
        x_ext.push(2.0 * last - x[idx]);
    }

    let new_len = (ratio * old_len as f64).round() as usize;
    let shorter = new_len < old_len;
    let use_len = if shorter { new_len } else { old_len };

    // Forward FFT; only the half-spectrum is needed.
    let mut planner: FftPlanner<f64> = FftPlanner::new();
    let fft = planner.plan_fft_forward(old_len);
    let mut buf: Vec<Complex<f64>> = x_ext
        .iter()
        .map(|&v| Complex { re: v as f64, im: 0.0 })
        .collect();
    fft.process(&mut buf);

    let half_len = old_len / 2 + 1;
    let mut spec: Vec<Complex<f64>> = buf[..half_len].to_vec();

    // Nyquist bin compensation for even effective lengths.
    if use_len % 2 == 0 {
        let nyq = use_len / 2;
        if nyq < spec.len() {
            spec[nyq] *= if shorter { 2.0 } else { 0.5 };
        }
    }

    let scale = new_len as f64 / old_len as f64;
    for v in &mut spec {
        *v *= scale;
    }

    // Inverse FFT at the new length: truncates or zero-pads the spectrum,
    // with the upper half rebuilt by Hermitian symmetry.
    let new_half = new_len / 2 + 1;
    let mut inv_buf = vec![Complex::<f64>::default(); new_len];
    let n_copy = spec.len().min(new_half);
    inv_buf[..n_copy].copy_from_slice(&spec[..n_copy]);
    for i in 1..new_half {
        let idx = new_len - i;
        if idx >= new_half {
            inv_buf[idx] = inv_buf[i].conj();
        }
    }

    let ifft = planner.plan_fft_inverse(new_len);
    ifft.process(&mut inv_buf);
    let inv_scale = 1.0 / new_len as f64;

    // Strip the resampled padding.
    let strip_l = ((ratio * pad_l as f64).round() as usize).min(new_len);
    let strip_end = (strip_l + out_len).min(new_len);

    let mut result: Vec<f32> = inv_buf[strip_l..strip_end]
        .iter()
        .map(|c| (c.re * inv_scale) as f32)
        .collect();
    result.resize(out_len, 0.0);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_rates_pass_through() {
        let data = Array2::from_shape_fn((2, 400), |(_, t)| t as f32 / 400.0);
        let out = resample(&data, 200.0, 200.0).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn tenfold_decimation_length() {
        let data = Array2::zeros((3, 20_000));
        let out = resample(&data, 2000.0, 200.0).unwrap();
        assert_eq!(out.dim(), (3, 2000));
    }

    #[test]
    fn decimation_preserves_dc() {
        let data = Array2::from_elem((1, 20_000), 3.14_f32);
        let out = resample(&data, 2000.0, 200.0).unwrap();
        for &v in out.iter() {
            approx::assert_abs_diff_eq!(v, 3.14, epsilon = 1e-2);
        }
    }

    #[test]
    fn slow_sine_survives_decimation() {
        // 5 Hz sine at 2000 Hz is far below the 100 Hz post-decimation
        // Nyquist and must come through at 200 Hz with its amplitude intact.
        let data = Array2::from_shape_fn((1, 20_000), |(_, t)| {
            (2.0 * std::f32::consts::PI * 5.0 * t as f32 / 2000.0).sin()
        });
        let out = resample(&data, 2000.0, 200.0).unwrap();
        // Compare away from the edges.
        for t in 200..1800usize {
            let expected = (2.0 * std::f32::consts::PI * 5.0 * t as f32 / 200.0).sin();
            approx::assert_abs_diff_eq!(out[[0, t]], expected, epsilon = 5e-2);
        }
    }

    #[test]
    fn auto_npad_reaches_power_of_two() {
        for n in [1000usize, 15360, 20_000, 30720] {
            let (l, r) = auto_npad(n);
            let total = n + l + r;
            assert_eq!(total & (total - 1), 0, "{total} not a power of two");
        }
    }
}
