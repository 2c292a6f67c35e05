//! Work distribution: a flat, read-only view of the night/interval
//! structure that per-night workers can index without touching the catalog.
//!
//! Intervals live in one arena; each night is an `(offset, count)` span
//! into it. The plan is built once after segmentation and then only shared
//! by reference, so workers need no locking.
use crate::segmenter::Night;

/// Catalog index range `[start, end)` of one interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalRange {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Copy)]
struct NightSpan {
    offset: usize,
    count: usize,
}

/// Flattened dispatch structure: interval arena + per-night spans.
#[derive(Debug, Clone)]
pub struct WorkPlan {
    intervals: Vec<IntervalRange>,
    nights: Vec<NightSpan>,
}

impl WorkPlan {
    pub fn build(nights: &[Night]) -> Self {
        let mut intervals = Vec::with_capacity(nights.iter().map(|n| n.intervals.len()).sum());
        let mut spans = Vec::with_capacity(nights.len());
        for night in nights {
            let offset = intervals.len();
            intervals.extend(night.intervals.iter().map(|iv| IntervalRange {
                start: iv.start,
                end: iv.end,
            }));
            spans.push(NightSpan {
                offset,
                count: night.intervals.len(),
            });
        }
        Self { intervals, nights: spans }
    }

    pub fn n_nights(&self) -> usize {
        self.nights.len()
    }

    pub fn n_intervals(&self) -> usize {
        self.intervals.len()
    }

    /// The interval ranges of one night, in time order.
    pub fn night_intervals(&self, night: usize) -> &[IntervalRange] {
        let span = &self.nights[night];
        &self.intervals[span.offset..span.offset + span.count]
    }
}
