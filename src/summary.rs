//! Human-readable run summary.
//!
//! `summary.txt` lives in the output directory: segment count, night
//! count, and per-night interval spans. Written once before the workers
//! start; append-safe afterwards (elapsed time is appended when the run
//! finishes). Nothing downstream consumes it.
use std::io::Write;
use std::path::Path;

use chrono::NaiveDateTime;

use crate::error::Result;
use crate::segmenter::Night;

const SPAN_FORMAT: &str = "%Y-%m-%d_%H.%M";

fn span(t: NaiveDateTime) -> String {
    t.format(SPAN_FORMAT).to_string()
}

/// Write the segmentation summary, replacing any previous file.
pub fn write_summary(path: &Path, n_segments: usize, nights: &[Night]) -> Result<()> {
    let mut f = std::fs::File::create(path)?;
    writeln!(f, "This run covers {n_segments} segment file(s).")?;
    writeln!(f, "This folder has {} night(s) of data:", nights.len())?;
    writeln!(f)?;
    for (n, night) in nights.iter().enumerate() {
        writeln!(f, "Night {} has {} interval(s):", n + 1, night.intervals.len())?;
        for (i, iv) in night.intervals.iter().enumerate() {
            writeln!(
                f,
                "Interval {} started at {} and ended at {}",
                i + 1,
                span(iv.t0),
                span(iv.tf)
            )?;
        }
        writeln!(f)?;
    }
    Ok(())
}

/// Append free-form lines to an existing summary.
pub fn append_lines(path: &Path, lines: &[String]) -> Result<()> {
    let mut f = std::fs::OpenOptions::new().append(true).create(true).open(path)?;
    for line in lines {
        writeln!(f, "{line}")?;
    }
    writeln!(f)?;
    Ok(())
}
