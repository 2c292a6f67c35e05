//! # nightfold — overnight EDF segment merger
//!
//! An overnight scalp recording arrives as hundreds of small time-stamped
//! EDF segment files plus a catalog listing each segment's wall-clock span.
//! `nightfold` reassembles them into a few clinically meaningful composites:
//! one merged, cleaned EDF per contiguous interval of each night.
//!
//! ## Pipeline overview
//!
//! ```text
//! {patient}_edf_catalog.csv
//!   │
//!   ├─ catalog::read_catalog()     parse + validate (existence, order)
//!   ├─ segmenter::segment_nights() nights → intervals (single pass)
//!   ├─ plan::WorkPlan::build()     flat read-only dispatch structure
//!   └─ orchestrate::process_nights()   one rayon worker per night
//!        └─ per interval:
//!             reduce::fold_segments()  load-merge-drop (≤ 2 buffers live)
//!             filter::apply_chain()    bandpass → notch → detrend → scale
//!             montage::RefMode::apply  canonical / bipolar / common average
//!             export::export_artifact  {patient}_night_{n}.{i}_scalp*.edf
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use std::path::Path;
//! use nightfold::{
//!     catalog, orchestrate, plan::WorkPlan, segmenter, loader::EdfCodec,
//!     MergeConfig, SegmenterParams,
//! };
//!
//! let cfg = MergeConfig::default();
//! let records = catalog::read_catalog(Path::new("PR05/PR05_edf_catalog.csv")).unwrap();
//! let nights = segmenter::segment_nights(&records, &SegmenterParams::from_config(&cfg));
//! let plan = WorkPlan::build(&nights);
//!
//! let files: Vec<String> = records.iter().map(|r| r.file_name.clone()).collect();
//! let out = orchestrate::OutputTarget {
//!     patient: "PR05".into(),
//!     dir: "out-PR05".into(),
//! };
//! let reports = orchestrate::process_nights(
//!     &plan, &files, Path::new("PR05/PR05"), &EdfCodec, &cfg, &out,
//! );
//! for r in &reports {
//!     println!("night {}: {} artifact(s)", r.night + 1, r.artifacts.len());
//! }
//! ```

pub mod buffer;
pub mod catalog;
pub mod config;
pub mod edf;
pub mod error;
pub mod export;
pub mod filter;
pub mod loader;
pub mod montage;
pub mod orchestrate;
pub mod plan;
pub mod reduce;
pub mod resample;
pub mod segmenter;
pub mod summary;

// ── Crate-root re-exports ─────────────────────────────────────────────────

pub use buffer::SignalBuffer;
pub use catalog::{read_catalog, CatalogRecord};
pub use config::MergeConfig;
pub use error::MergeError;
pub use loader::{EdfCodec, SegmentCodec};
pub use montage::RefMode;
pub use orchestrate::{process_nights, NightReport, OutputTarget};
pub use plan::WorkPlan;
pub use reduce::fold_segments;
pub use segmenter::{segment_nights, Interval, Night, SegmenterParams};
