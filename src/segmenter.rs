//! Night segmentation: a single forward pass over the sorted catalog that
//! groups segments into nights and, within each night, into intervals of
//! mutually close segments.
//!
//! A *night* is a fixed clock window (start hour + duration) anchored to the
//! date of its first qualifying record. An *interval* is a maximal run of
//! segments whose inter-segment gap never exceeds the margin and whose
//! length stays under the per-interval cap. Records that start before the
//! active window (minus the margin) are skipped as pre-window noise.
//!
//! The pass is pure and deterministic: the same catalog and parameters
//! always produce the same structure. Auxiliary state is constant-size.
use chrono::{NaiveDateTime, TimeDelta};

use crate::catalog::CatalogRecord;

/// Half-open index range `[start, end)` into the catalog, plus the
/// wall-clock span it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: usize,
    pub end: usize,
    pub t0: NaiveDateTime,
    pub tf: NaiveDateTime,
}

/// One night's worth of intervals, ordered and non-overlapping in index
/// space.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Night {
    pub intervals: Vec<Interval>,
}

/// Segmentation parameters, usually derived from
/// [`MergeConfig`](crate::MergeConfig) via [`SegmenterParams::from_config`].
#[derive(Debug, Clone, Copy)]
pub struct SegmenterParams {
    /// Maximum gap between consecutive segments within one interval.
    /// A gap exactly equal to the margin does not split (strict `>`).
    pub margin: TimeDelta,
    /// Clock hour anchoring each night's window.
    pub start_hour: u32,
    /// Window length.
    pub duration: TimeDelta,
    /// Per-interval segment cap, `None` for unlimited.
    pub max_segments: Option<usize>,
}

impl SegmenterParams {
    pub fn from_config(cfg: &crate::MergeConfig) -> Self {
        Self {
            margin: cfg.margin(),
            start_hour: cfg.night_start_hour,
            duration: cfg.night_duration(),
            max_segments: cfg.max_segments,
        }
    }

    /// Night window `[start, end)` anchored to `t`'s date at `start_hour`.
    fn window_for(&self, t: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
        let start = t
            .date()
            .and_hms_opt(self.start_hour.min(23), 0, 0)
            .unwrap_or(t);
        (start, start + self.duration)
    }
}

/// Group sorted catalog records into nights.
///
/// Every record is either assigned to exactly one interval of one night or
/// skipped as pre-window noise. Empty input yields an empty night list.
pub fn segment_nights(records: &[CatalogRecord], params: &SegmenterParams) -> Vec<Night> {
    let mut nights = Vec::new();
    let Some(first) = records.first() else {
        return nights;
    };

    let (mut win_start, mut win_end) = params.window_for(first.start);
    let mut night = Night::default();

    let mut prev_end = first.start;
    let mut interval_start = 0usize;
    let mut interval_t0 = first.start;
    let mut count = 0usize;
    let mut open = false;

    for (i, rec) in records.iter().enumerate() {
        // Pre-window fast-forward: the record precedes the active window.
        if rec.start < win_start - params.margin {
            prev_end = rec.end;
            open = false;
            continue;
        }

        // A record at or past the window end closes the night (half-open
        // window) and re-anchors to the record's own date. The record is
        // then re-examined against the new window.
        if rec.start >= win_end {
            if open {
                night.intervals.push(Interval {
                    start: interval_start,
                    end: i,
                    t0: interval_t0,
                    tf: prev_end,
                });
            }
            nights.push(std::mem::take(&mut night));
            (win_start, win_end) = params.window_for(rec.start);
            open = false;
            count = 0;
            if rec.start < win_start - params.margin || rec.start >= win_end {
                // Daytime record between nights, or a window too short to
                // contain its own anchor: skip like pre-window noise.
                prev_end = rec.end;
                continue;
            }
        }

        if !open {
            // First qualifying record after a skip or a night boundary.
            interval_start = i;
            interval_t0 = rec.start;
            count = 0;
            open = true;
        } else if rec.start - prev_end > params.margin
            || params.max_segments.is_some_and(|k| count >= k)
        {
            night.intervals.push(Interval {
                start: interval_start,
                end: i,
                t0: interval_t0,
                tf: prev_end,
            });
            interval_start = i;
            interval_t0 = rec.start;
            count = 0;
        }

        prev_end = rec.end;
        count += 1;
    }

    // Flush the open tail unconditionally.
    if open && count > 0 {
        night.intervals.push(Interval {
            start: interval_start,
            end: records.len(),
            t0: interval_t0,
            tf: prev_end,
        });
    }
    if !night.intervals.is_empty() {
        nights.push(night);
    }
    nights
}
