//! Merge configuration.
//!
//! [`MergeConfig`] holds every tunable parameter for a run. All fields are
//! `pub` so a caller can use struct-update syntax:
//!
//! ```
//! use nightfold::MergeConfig;
//!
//! let cfg = MergeConfig {
//!     margin_secs: 30,          // tolerate larger inter-segment gaps
//!     max_segments: Some(64),   // cap interval length
//!     ..MergeConfig::default()
//! };
//! ```
//!
//! `MergeConfig::default()` is the production configuration: nights anchored
//! at 21:00 for 11 hours, a 15 second gap margin, no segment cap, 200 Hz
//! target rate, 0.5–80 Hz bandpass, 60 Hz notch with a 4 Hz stop width, and
//! bipolar export.
use chrono::TimeDelta;

use crate::error::MergeError;
use crate::montage::RefMode;

#[derive(Debug, Clone)]
pub struct MergeConfig {
    /// Clock hour (0–23) at which each night's window opens.
    ///
    /// Default: `21` (9 pm).
    pub night_start_hour: u32,

    /// Length of each night's window in hours.
    ///
    /// Default: `11`.
    pub night_hours: i64,

    /// Maximum gap in seconds between consecutive segments before a new
    /// interval is started. A gap exactly equal to the margin does not split.
    ///
    /// Default: `15`.
    pub margin_secs: i64,

    /// Maximum number of segments folded into one interval, `None` for
    /// unlimited.
    ///
    /// Default: `None`.
    pub max_segments: Option<usize>,

    /// Target sampling rate in Hz after decimation. Segments already at
    /// this rate pass through unchanged.
    ///
    /// Default: `200.0` (from 2000 Hz acquisition).
    pub target_sfreq: f32,

    /// Bandpass corner frequencies in Hz.
    ///
    /// Default: `(0.5, 80.0)`.
    pub band: (f32, f32),

    /// Line-noise notch centre frequency in Hz.
    ///
    /// Default: `60.0`.
    pub notch_freq: f32,

    /// Total stop-band width of the notch in Hz.
    ///
    /// Default: `4.0`.
    pub notch_width: f32,

    /// Amplitude scale applied after detrending (unit conversion to volts).
    ///
    /// Default: `1e-6`.
    pub scale: f32,

    /// Reference modes to export, one artifact per interval × mode.
    ///
    /// Default: `[RefMode::Bipolar]`.
    pub modes: Vec<RefMode>,

    /// Worker pool size for per-night parallelism, `None` for one per core.
    pub workers: Option<usize>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            night_start_hour: 21,
            night_hours: 11,
            margin_secs: 15,
            max_segments: None,
            target_sfreq: 200.0,
            band: (0.5, 80.0),
            notch_freq: 60.0,
            notch_width: 4.0,
            scale: 1e-6,
            modes: vec![RefMode::Bipolar],
            workers: None,
        }
    }
}

impl MergeConfig {
    /// Gap margin as a [`TimeDelta`].
    pub fn margin(&self) -> TimeDelta {
        TimeDelta::seconds(self.margin_secs)
    }

    /// Night window length as a [`TimeDelta`].
    pub fn night_duration(&self) -> TimeDelta {
        TimeDelta::hours(self.night_hours)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), MergeError> {
        if self.night_start_hour > 23 {
            return Err(MergeError::Configuration(format!(
                "night start hour {} out of range 0-23",
                self.night_start_hour
            )));
        }
        if self.night_hours <= 0 {
            return Err(MergeError::Configuration(
                "night duration must be positive".into(),
            ));
        }
        if self.margin_secs < 0 {
            return Err(MergeError::Configuration(
                "gap margin must be non-negative".into(),
            ));
        }
        if self.target_sfreq <= 0.0 {
            return Err(MergeError::Configuration(
                "target sampling rate must be positive".into(),
            ));
        }
        let (lo, hi) = self.band;
        if lo <= 0.0 || hi <= lo || hi >= self.target_sfreq / 2.0 {
            return Err(MergeError::Configuration(format!(
                "bandpass {lo}-{hi} Hz invalid for {} Hz data",
                self.target_sfreq
            )));
        }
        if self.modes.is_empty() {
            return Err(MergeError::Configuration(
                "at least one reference mode is required".into(),
            ));
        }
        Ok(())
    }
}
