//! Minimal native EDF reader and writer.
//!
//! Covers exactly what segment files and merged artifacts need: the fixed
//! 256-byte header, per-signal headers, and 16-bit little-endian sample
//! records with linear digital→physical scaling. Annotation channels are
//! skipped on read. All retained signals must share one sampling rate;
//! mixed-rate files are rejected.
//!
//! Header layout (ASCII, fixed-width): version 8, patient 80, recording 80,
//! start date `dd.mm.yy` 8, start time `hh.mm.ss` 8, header length 8,
//! reserved 44, record count 8, record duration 8, signal count 4; then
//! field-major per-signal blocks (labels ×16, transducers ×80, dimensions
//! ×8, physical min/max ×8, digital min/max ×8, prefiltering ×80, samples
//! per record ×8, reserved ×32).
use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use ndarray::Array2;

use crate::buffer::SignalBuffer;

const ANNOTATION_LABEL: &str = "EDF Annotations";

fn ascii_field(bytes: &[u8], offset: usize, len: usize) -> Result<String> {
    let raw = bytes
        .get(offset..offset + len)
        .context("EDF header truncated")?;
    Ok(String::from_utf8_lossy(raw).trim().to_string())
}

fn numeric_field<T: std::str::FromStr>(bytes: &[u8], offset: usize, len: usize) -> Result<T> {
    let s = ascii_field(bytes, offset, len)?;
    s.parse()
        .map_err(|_| anyhow::anyhow!("bad numeric EDF field '{s}'"))
}

fn parse_start(date: &str, time: &str) -> Result<NaiveDateTime> {
    let d: Vec<u32> = date.split('.').map(|p| p.parse().unwrap_or(0)).collect();
    let t: Vec<u32> = time.split('.').map(|p| p.parse().unwrap_or(0)).collect();
    if d.len() != 3 || t.len() != 3 {
        bail!("bad EDF start stamp '{date} {time}'");
    }
    // Two-digit year pivot per the EDF convention.
    let year = if d[2] >= 85 { 1900 + d[2] } else { 2000 + d[2] } as i32;
    NaiveDate::from_ymd_opt(year, d[1], d[0])
        .and_then(|day| day.and_hms_opt(t[0], t[1], t[2]))
        .with_context(|| format!("bad EDF start stamp '{date} {time}'"))
}

/// Decode an EDF file into a [`SignalBuffer`].
pub fn read_edf(path: &Path) -> Result<SignalBuffer> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    if bytes.len() < 256 {
        bail!("file shorter than an EDF header");
    }

    let start = parse_start(
        &ascii_field(&bytes, 168, 8)?,
        &ascii_field(&bytes, 176, 8)?,
    )?;
    let header_len: usize = numeric_field(&bytes, 184, 8)?;
    let n_records: usize = numeric_field(&bytes, 236, 8)?;
    let record_dur: f64 = numeric_field(&bytes, 244, 8)?;
    let ns: usize = numeric_field(&bytes, 252, 4)?;
    if record_dur <= 0.0 {
        bail!("non-positive record duration");
    }
    if header_len != 256 + ns * 256 {
        bail!("header length {header_len} inconsistent with {ns} signals");
    }

    // Field-major per-signal blocks: `block_off` is the per-signal byte
    // offset of the field block, `width` the field width within it.
    let sig = |block_off: usize, width: usize, i: usize| 256 + block_off * ns + i * width;
    let mut labels = Vec::with_capacity(ns);
    let mut phys_min = Vec::with_capacity(ns);
    let mut phys_max = Vec::with_capacity(ns);
    let mut dig_min = Vec::with_capacity(ns);
    let mut dig_max = Vec::with_capacity(ns);
    let mut spr = Vec::with_capacity(ns);
    for i in 0..ns {
        labels.push(ascii_field(&bytes, sig(0, 16, i), 16)?);
        phys_min.push(numeric_field::<f64>(&bytes, sig(104, 8, i), 8)?);
        phys_max.push(numeric_field::<f64>(&bytes, sig(112, 8, i), 8)?);
        dig_min.push(numeric_field::<f64>(&bytes, sig(120, 8, i), 8)?);
        dig_max.push(numeric_field::<f64>(&bytes, sig(128, 8, i), 8)?);
        spr.push(numeric_field::<usize>(&bytes, sig(216, 8, i), 8)?);
    }

    let keep: Vec<usize> = (0..ns).filter(|&i| labels[i] != ANNOTATION_LABEL).collect();
    if keep.is_empty() {
        bail!("no signal channels");
    }
    let spr0 = spr[keep[0]];
    if keep.iter().any(|&i| spr[i] != spr0) {
        bail!("mixed per-signal sampling rates are not supported");
    }
    let sfreq = (spr0 as f64 / record_dur) as f32;

    let record_samples: usize = spr.iter().sum();
    let expected = header_len + n_records * record_samples * 2;
    if bytes.len() < expected {
        bail!("EDF data truncated: {} < {expected} bytes", bytes.len());
    }

    let mut data = Array2::<f32>::zeros((keep.len(), n_records * spr0));
    // Per-signal digital→physical affine scaling.
    let scales: Vec<(f64, f64)> = keep
        .iter()
        .map(|&i| {
            let span = dig_max[i] - dig_min[i];
            let gain = if span != 0.0 {
                (phys_max[i] - phys_min[i]) / span
            } else {
                1.0
            };
            (gain, phys_min[i] - dig_min[i] * gain)
        })
        .collect();

    // Sample offset of each signal within one data record.
    let sig_offset: Vec<usize> = (0..ns)
        .scan(0usize, |acc, i| {
            let off = *acc;
            *acc += spr[i];
            Some(off)
        })
        .collect();

    for rec in 0..n_records {
        let rec_base = header_len + rec * record_samples * 2;
        for (row, &i) in keep.iter().enumerate() {
            let base = rec_base + sig_offset[i] * 2;
            let (gain, offset) = scales[row];
            for s in 0..spr0 {
                let lo = bytes[base + s * 2];
                let hi = bytes[base + s * 2 + 1];
                let dig = i16::from_le_bytes([lo, hi]) as f64;
                data[[row, rec * spr0 + s]] = (dig * gain + offset) as f32;
            }
        }
    }

    Ok(SignalBuffer {
        ch_names: keep.iter().map(|&i| labels[i].clone()).collect(),
        sfreq,
        start,
        data,
    })
}

fn pad_field(s: &str, len: usize) -> Vec<u8> {
    let mut out: Vec<u8> = s.bytes().take(len).collect();
    out.resize(len, b' ');
    out
}

/// Format a number to fit the 8-character EDF numeric fields.
fn num8(v: f64) -> String {
    for prec in (0..=6).rev() {
        let s = format!("{v:.prec$}");
        if s.len() <= 8 {
            return s;
        }
    }
    format!("{v:.0}")
}

/// Encode a [`SignalBuffer`] as an EDF file.
///
/// One-second data records with per-channel physical ranges taken from the
/// data; the final partial record is zero-padded.
pub fn write_edf(buf: &SignalBuffer, patient: &str, path: &Path) -> Result<()> {
    let spr = buf.sfreq.round() as usize;
    if spr == 0 {
        bail!("sampling rate {} too low to encode", buf.sfreq);
    }
    let n_ch = buf.n_channels();
    let n_records = buf.n_samples().div_ceil(spr);

    // Physical ranges per channel, widened when degenerate so the digital
    // mapping stays invertible.
    let mut ranges = Vec::with_capacity(n_ch);
    for row in buf.data.rows() {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for &v in row.iter() {
            lo = lo.min(v as f64);
            hi = hi.max(v as f64);
        }
        if !lo.is_finite() || !hi.is_finite() || lo == hi {
            lo = lo.min(0.0) - 1.0;
            hi = hi.max(0.0) + 1.0;
        }
        ranges.push((lo, hi));
    }
    const DIG_MIN: f64 = -32768.0;
    const DIG_MAX: f64 = 32767.0;

    let mut header = Vec::with_capacity(256 + n_ch * 256);
    header.extend(pad_field("0", 8));
    header.extend(pad_field(patient, 80));
    header.extend(pad_field("nightfold merge", 80));
    header.extend(pad_field(
        &format!(
            "{:02}.{:02}.{:02}",
            buf.start.day(),
            buf.start.month(),
            buf.start.year().rem_euclid(100)
        ),
        8,
    ));
    header.extend(pad_field(
        &format!(
            "{:02}.{:02}.{:02}",
            buf.start.hour(),
            buf.start.minute(),
            buf.start.second()
        ),
        8,
    ));
    header.extend(pad_field(&format!("{}", 256 + n_ch * 256), 8));
    header.extend(pad_field("", 44));
    header.extend(pad_field(&format!("{n_records}"), 8));
    header.extend(pad_field("1", 8));
    header.extend(pad_field(&format!("{n_ch}"), 4));

    for name in &buf.ch_names {
        header.extend(pad_field(name, 16));
    }
    for _ in 0..n_ch {
        header.extend(pad_field("", 80)); // transducer
    }
    for _ in 0..n_ch {
        header.extend(pad_field("uV", 8));
    }
    for &(lo, _) in &ranges {
        header.extend(pad_field(&num8(lo), 8));
    }
    for &(_, hi) in &ranges {
        header.extend(pad_field(&num8(hi), 8));
    }
    for _ in 0..n_ch {
        header.extend(pad_field("-32768", 8));
    }
    for _ in 0..n_ch {
        header.extend(pad_field("32767", 8));
    }
    for _ in 0..n_ch {
        header.extend(pad_field("", 80)); // prefiltering
    }
    for _ in 0..n_ch {
        header.extend(pad_field(&format!("{spr}"), 8));
    }
    for _ in 0..n_ch {
        header.extend(pad_field("", 32));
    }

    let mut body = Vec::with_capacity(n_records * n_ch * spr * 2);
    for rec in 0..n_records {
        for ch in 0..n_ch {
            let (lo, hi) = ranges[ch];
            let gain = (DIG_MAX - DIG_MIN) / (hi - lo);
            for s in 0..spr {
                let t = rec * spr + s;
                let phys = if t < buf.n_samples() {
                    buf.data[[ch, t]] as f64
                } else {
                    0.0
                };
                let dig = ((phys.clamp(lo, hi) - lo) * gain + DIG_MIN).round() as i16;
                body.extend_from_slice(&dig.to_le_bytes());
            }
        }
    }

    let mut f = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    f.write_all(&header)?;
    f.write_all(&body)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::parse_time;

    fn tone_buffer() -> SignalBuffer {
        let names = ["POL Fp1-Ref", "POL F7-Ref", "POL EKG1-Ref"];
        let mut data = Array2::zeros((3, 450));
        for (c, mut row) in data.rows_mut().into_iter().enumerate() {
            for (t, v) in row.iter_mut().enumerate() {
                *v = ((t as f32 / 10.0) + c as f32).sin() * 40.0;
            }
        }
        SignalBuffer {
            ch_names: names.iter().map(|s| s.to_string()).collect(),
            sfreq: 200.0,
            start: parse_time("2021-06-01 21:30:05").unwrap(),
            data,
        }
    }

    #[test]
    fn writer_reader_agree_on_header_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seg_1.edf");
        let buf = tone_buffer();
        write_edf(&buf, "PR05", &path).unwrap();
        let back = read_edf(&path).unwrap();
        assert_eq!(back.ch_names, buf.ch_names);
        assert_eq!(back.sfreq, 200.0);
        assert_eq!(back.start, buf.start);
        // Zero-padded up to a whole record.
        assert_eq!(back.n_samples(), 600);
    }

    #[test]
    fn samples_survive_digital_quantisation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seg_1.edf");
        let buf = tone_buffer();
        write_edf(&buf, "PR05", &path).unwrap();
        let back = read_edf(&path).unwrap();
        for c in 0..3 {
            for t in 0..buf.n_samples() {
                approx::assert_abs_diff_eq!(
                    back.data[[c, t]],
                    buf.data[[c, t]],
                    epsilon = 0.01_f32
                );
            }
        }
    }

    #[test]
    fn truncated_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seg_1.edf");
        std::fs::write(&path, b"not an edf").unwrap();
        assert!(read_edf(&path).is_err());
    }
}
