//! Per-night parallel driver.
//!
//! Nights are independent units of work fanned out over the rayon pool;
//! within one night, intervals run strictly in time order, each through
//! fold → filter chain → reference transform(s) → export. Workers share
//! only read-only state (the plan and the catalog-derived file names), so
//! no locking is involved.
//!
//! Failure scoping: a failed segment decode fails its interval only; a
//! failed artifact write fails that artifact only; sibling intervals,
//! modes, and nights proceed. There is no cross-worker cancellation and no
//! rollback of artifacts already written.
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{MergeError, Result};
use crate::filter;
use crate::loader::{SegmentCodec, SegmentLoader};
use crate::plan::WorkPlan;
use crate::reduce::fold_segments;
use crate::{export, MergeConfig};

/// Where artifacts land and how they are named.
#[derive(Debug, Clone)]
pub struct OutputTarget {
    pub patient: String,
    pub dir: PathBuf,
}

/// What happened to one night.
#[derive(Debug)]
pub struct NightReport {
    pub night: usize,
    /// Artifacts written, in interval-then-mode order.
    pub artifacts: Vec<PathBuf>,
    /// Failures, each tagged with its interval index.
    pub failures: Vec<(usize, MergeError)>,
}

impl NightReport {
    /// A night succeeded if anything in it was exported.
    pub fn succeeded(&self) -> bool {
        !self.artifacts.is_empty()
    }
}

/// Process every night of the plan in parallel. `segment_files` maps
/// catalog indices to file names; `segment_dir` is where they live.
pub fn process_nights(
    plan: &WorkPlan,
    segment_files: &[String],
    segment_dir: &Path,
    codec: &dyn SegmentCodec,
    cfg: &MergeConfig,
    out: &OutputTarget,
) -> Vec<NightReport> {
    (0..plan.n_nights())
        .into_par_iter()
        .map(|night| process_night(plan, segment_files, segment_dir, codec, cfg, out, night))
        .collect()
}

fn process_night(
    plan: &WorkPlan,
    segment_files: &[String],
    segment_dir: &Path,
    codec: &dyn SegmentCodec,
    cfg: &MergeConfig,
    out: &OutputTarget,
    night: usize,
) -> NightReport {
    let loader = SegmentLoader::new(codec, segment_dir, cfg.target_sfreq);
    let mut report = NightReport {
        night,
        artifacts: Vec::new(),
        failures: Vec::new(),
    };

    let intervals = plan.night_intervals(night);
    info!(night = night + 1, intervals = intervals.len(), "processing night");

    for (i, range) in intervals.iter().enumerate() {
        match process_interval(&loader, segment_files, cfg, out, night, i, range.start..range.end)
        {
            Ok(mut written) => {
                debug!(
                    night = night + 1,
                    interval = i + 1,
                    artifacts = written.len(),
                    "interval exported"
                );
                report.artifacts.append(&mut written);
            }
            Err(e) => {
                warn!(night = night + 1, interval = i + 1, error = %e, "interval failed");
                report.failures.push((i, e));
            }
        }
    }
    report
}

/// Fold, clean, re-reference, and export one interval. A per-mode failure
/// is reported without aborting the remaining modes; the interval fails
/// outright only when nothing could be exported.
fn process_interval(
    loader: &SegmentLoader<'_>,
    segment_files: &[String],
    cfg: &MergeConfig,
    out: &OutputTarget,
    night: usize,
    interval: usize,
    range: std::ops::Range<usize>,
) -> Result<Vec<PathBuf>> {
    let mut merged = fold_segments(range, |idx| loader.load(&segment_files[idx]))?;

    filter::apply_chain(&mut merged, cfg).map_err(MergeError::Filter)?;

    let mut written = Vec::with_capacity(cfg.modes.len());
    let mut last_err = None;
    for &mode in &cfg.modes {
        let result = mode
            .apply(&merged)
            .and_then(|buf| {
                export::export_artifact(&buf, &out.patient, &out.dir, night, interval, mode)
            });
        match result {
            Ok(path) => written.push(path),
            Err(e) => {
                warn!(night = night + 1, interval = interval + 1, mode = ?mode, error = %e,
                    "artifact failed");
                last_err = Some(e);
            }
        }
    }
    if written.is_empty() {
        if let Some(e) = last_err {
            return Err(e);
        }
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::parse_time;
    use crate::montage::RefMode;
    use crate::plan::WorkPlan;
    use crate::segmenter::{Interval, Night};
    use crate::SignalBuffer;
    use ndarray::Array2;
    use std::path::Path;

    /// Codec synthesising ten-second scalp segments.
    struct SynthCodec;

    impl SegmentCodec for SynthCodec {
        fn decode(&self, _path: &Path) -> anyhow::Result<SignalBuffer> {
            let names: Vec<String> = crate::montage::BIPOLAR_PAIRS
                .iter()
                .flat_map(|(c, a, _)| [c.to_string(), a.to_string()])
                .collect::<std::collections::BTreeSet<_>>()
                .into_iter()
                .collect();
            let mut names_ordered = vec!["Fp1-Ref".to_string()];
            names_ordered.extend(names.into_iter().filter(|n| n != "Fp1-Ref"));
            let n = names_ordered.len();
            let data = Array2::from_shape_fn((n, 2000), |(c, t)| {
                ((c + 1) as f32 * t as f32 / 100.0).sin()
            });
            Ok(SignalBuffer {
                ch_names: names_ordered,
                sfreq: 200.0,
                start: parse_time("2021-06-01 21:30:00").unwrap(),
                data,
            })
        }
    }

    fn night_plan(n_segments: usize) -> WorkPlan {
        let t = parse_time("2021-06-01 21:30:00").unwrap();
        WorkPlan::build(&[Night {
            intervals: vec![Interval { start: 0, end: n_segments, t0: t, tf: t }],
        }])
    }

    #[test]
    fn night_exports_one_artifact_per_mode() {
        let dir = tempfile::tempdir().unwrap();
        let files: Vec<String> = (0..3).map(|i| format!("p_{i}.edf")).collect();
        let cfg = MergeConfig {
            modes: vec![RefMode::Canonical, RefMode::Bipolar],
            ..MergeConfig::default()
        };
        let out = OutputTarget {
            patient: "PR05".into(),
            dir: dir.path().to_path_buf(),
        };
        let reports = process_nights(
            &night_plan(3),
            &files,
            Path::new("/nowhere"),
            &SynthCodec,
            &cfg,
            &out,
        );
        assert_eq!(reports.len(), 1);
        assert!(reports[0].succeeded());
        assert_eq!(reports[0].artifacts.len(), 2);
        assert!(dir.path().join("PR05_night_1.1_scalp.edf").exists());
        assert!(dir.path().join("PR05_night_1.1_scalp-bipolar.edf").exists());
    }

    #[test]
    fn decode_failure_scopes_to_the_interval() {
        struct FailCodec;
        impl SegmentCodec for FailCodec {
            fn decode(&self, _path: &Path) -> anyhow::Result<SignalBuffer> {
                anyhow::bail!("bad segment")
            }
        }
        let dir = tempfile::tempdir().unwrap();
        let files = vec!["p_0.edf".to_string()];
        let out = OutputTarget {
            patient: "PR05".into(),
            dir: dir.path().to_path_buf(),
        };
        let reports = process_nights(
            &night_plan(1),
            &files,
            Path::new("/nowhere"),
            &FailCodec,
            &MergeConfig::default(),
            &out,
        );
        assert!(!reports[0].succeeded());
        assert_eq!(reports[0].failures.len(), 1);
    }
}
