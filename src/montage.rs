//! Channel selection and re-referencing.
//!
//! The canonical scalp montage is name-driven: acquisition prefixes are
//! stripped, a few polygraphy leads are renamed to stable names, everything
//! preceding `Fp1-Ref` in source order is dropped along with the cardiac
//! leads, and the result is the retained set all later stages operate on.
//!
//! Bipolar referencing is table-driven static domain knowledge (the
//! standard double-banana plus ocular/muscle cross pairs), not computed.
use std::str::FromStr;

use ndarray::{Array2, Axis};

use crate::buffer::SignalBuffer;
use crate::error::{MergeError, Result};

/// First canonical scalp channel; everything before it in source order is
/// acquisition bookkeeping.
pub const SCALP_FIRST: &str = "Fp1-Ref";

/// Non-scalp leads excluded from the montage even when they follow
/// [`SCALP_FIRST`].
pub const EXCLUDED: [&str; 2] = ["EKG1-Ref", "EKG2-Ref"];

/// Bipolar pairs: (cathode, anode, derived channel name).
pub const BIPOLAR_PAIRS: [(&str, &str, &str); 21] = [
    ("Fp1-Ref", "F7-Ref", "Fp1_F7"),
    ("F7-Ref", "T7-Ref", "F7_T7"),
    ("T7-Ref", "P7-Ref", "T7_P7"),
    ("P7-Ref", "O1-Ref", "P7_O1"),
    ("Fp1-Ref", "F3-Ref", "Fp1_F3"),
    ("F3-Ref", "C3-Ref", "F3_C3"),
    ("C3-Ref", "P3-Ref", "C3_P3"),
    ("P3-Ref", "O1-Ref", "P3_O1"),
    ("Fz-Ref", "Cz-Ref", "Fz_Cz"),
    ("Cz-Ref", "Pz-Ref", "Cz_Pz"),
    ("Fp2-Ref", "F4-Ref", "Fp2_F4"),
    ("F4-Ref", "C4-Ref", "F4_C4"),
    ("C4-Ref", "P4-Ref", "C4_P4"),
    ("P4-Ref", "O2-Ref", "P4_O2"),
    ("Fp2-Ref", "F8-Ref", "Fp2_F8"),
    ("F8-Ref", "T8-Ref", "F8_T8"),
    ("T8-Ref", "P8-Ref", "T8_P8"),
    ("P8-Ref", "O2-Ref", "P8_O2"),
    ("L_EOG-Ref", "A2-Ref", "L-EOG_A2"),
    ("R_EOG-Ref", "A1-Ref", "R-EOG_A1"),
    ("L_EMG-Ref", "R_EMG-Ref", "L-EMG_R-EMG"),
];

/// Normalise one acquisition channel name: strip the `POL ` prefix and map
/// the polygraphy leads onto stable names.
pub fn canonical_name(raw: &str) -> String {
    let name = raw.strip_prefix("POL ").unwrap_or(raw);
    match name {
        "EMG1-Ref" => "L_EMG-Ref".to_string(),
        "EMG2-Ref" => "R_EMG-Ref".to_string(),
        "L EOG-Ref" => "L_EOG-Ref".to_string(),
        "R EOG-Ref" => "R_EOG-Ref".to_string(),
        other => other.to_string(),
    }
}

/// Reduce a decoded buffer to the canonical scalp montage: rename, drop
/// everything before [`SCALP_FIRST`], drop the excluded leads.
pub fn scalp_montage(mut buf: SignalBuffer) -> Result<SignalBuffer> {
    buf.rename_channels(canonical_name);
    let first = buf.channel_index(SCALP_FIRST).ok_or_else(|| {
        MergeError::Mismatch(format!("channel '{SCALP_FIRST}' not present"))
    })?;
    let keep: Vec<usize> = (first..buf.n_channels())
        .filter(|&i| !EXCLUDED.contains(&buf.ch_names[i].as_str()))
        .collect();
    Ok(buf.select_channels(&keep))
}

/// Derive the bipolar montage: one channel per table pair, `anode − cathode`
/// per sample. Channels not named by the table are dropped.
///
/// A table pair referencing a channel absent from `buf` is a configuration
/// error.
pub fn bipolar_reference(buf: &SignalBuffer) -> Result<SignalBuffer> {
    let mut ch_names = Vec::with_capacity(BIPOLAR_PAIRS.len());
    let mut data = Array2::zeros((BIPOLAR_PAIRS.len(), buf.n_samples()));
    for (row, (cathode, anode, name)) in BIPOLAR_PAIRS.iter().enumerate() {
        let ci = buf.channel_index(cathode).ok_or_else(|| {
            MergeError::Configuration(format!("bipolar pair {name}: missing '{cathode}'"))
        })?;
        let ai = buf.channel_index(anode).ok_or_else(|| {
            MergeError::Configuration(format!("bipolar pair {name}: missing '{anode}'"))
        })?;
        let derived = &buf.data.row(ai) - &buf.data.row(ci);
        data.row_mut(row).assign(&derived);
        ch_names.push(name.to_string());
    }
    Ok(SignalBuffer {
        ch_names,
        sfreq: buf.sfreq,
        start: buf.start,
        data,
    })
}

/// Subtract the per-sample mean of all retained channels.
pub fn common_average_inplace(data: &mut Array2<f32>) {
    let Some(means) = data.mean_axis(Axis(0)) else {
        return; // no channels, nothing to reference
    };
    for mut row in data.rows_mut() {
        row -= &means;
    }
}

/// Output reference mode: one exported artifact per interval × mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefMode {
    /// Canonical montage as-is.
    Canonical,
    /// Table-driven bipolar montage.
    Bipolar,
    /// Common-average referenced canonical montage.
    CommonAverage,
    /// Bipolar montage, then common-average referenced.
    BipolarCommonAverage,
}

impl RefMode {
    /// Artifact name suffix for this mode.
    pub fn suffix(self) -> &'static str {
        match self {
            RefMode::Canonical => "",
            RefMode::Bipolar => "-bipolar",
            RefMode::CommonAverage => "-common-average",
            RefMode::BipolarCommonAverage => "-bipolar-common-average",
        }
    }

    /// Produce this mode's buffer from the canonical one.
    pub fn apply(self, canonical: &SignalBuffer) -> Result<SignalBuffer> {
        match self {
            RefMode::Canonical => Ok(canonical.clone()),
            RefMode::Bipolar => bipolar_reference(canonical),
            RefMode::CommonAverage => {
                let mut out = canonical.clone();
                common_average_inplace(&mut out.data);
                Ok(out)
            }
            RefMode::BipolarCommonAverage => {
                let mut out = bipolar_reference(canonical)?;
                common_average_inplace(&mut out.data);
                Ok(out)
            }
        }
    }
}

impl FromStr for RefMode {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "canonical" | "scalp" => Ok(RefMode::Canonical),
            "bipolar" => Ok(RefMode::Bipolar),
            "common-average" => Ok(RefMode::CommonAverage),
            "bipolar-common-average" => Ok(RefMode::BipolarCommonAverage),
            other => Err(MergeError::Configuration(format!(
                "unknown reference mode '{other}'"
            ))),
        }
    }
}
