//! Bounded-memory sequential reduction of one interval.
//!
//! Instead of decoding every segment of an interval and concatenating the
//! list at once, the fold keeps a single accumulator and decodes one
//! segment ahead: load, merge, drop. At most two decoded buffers are
//! resident at any instant, for any interval length — a resource contract,
//! not an implementation detail, and tested as such.
use std::ops::Range;

use crate::buffer::SignalBuffer;
use crate::error::{MergeError, Result};

/// A buffer that can absorb its successor in time.
pub trait Mergeable: Sized {
    fn merge(&mut self, next: Self) -> Result<()>;
}

impl Mergeable for SignalBuffer {
    fn merge(&mut self, next: Self) -> Result<()> {
        self.append(next)
    }
}

/// Fold the segments at `indices` into one buffer via `load`.
///
/// `load` is called once per index, strictly in ascending order; each
/// loaded buffer is merged into the accumulator and dropped before the
/// next load.
pub fn fold_segments<B, F>(indices: Range<usize>, mut load: F) -> Result<B>
where
    B: Mergeable,
    F: FnMut(usize) -> Result<B>,
{
    if indices.is_empty() {
        return Err(MergeError::Configuration(
            "cannot fold an empty interval".into(),
        ));
    }
    let mut acc = load(indices.start)?;
    for i in indices.start + 1..indices.end {
        let next = load(i)?;
        acc.merge(next)?;
    }
    Ok(acc)
}
