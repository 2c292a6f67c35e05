//! End-to-end merge over a synthetic patient directory: EDF segments on
//! disk, a catalog describing them, and a full catalog → segmenter → plan
//! → parallel merge run.
use std::io::Write;
use std::path::Path;

use chrono::TimeDelta;
use ndarray::Array2;

use nightfold::{
    catalog, edf, orchestrate, plan::WorkPlan, segmenter, summary, EdfCodec, MergeConfig,
    RefMode, SegmenterParams, SignalBuffer,
};

const SEG_SECS: usize = 10;
const SFREQ: f32 = 200.0;

/// Source channel list as an acquisition system would label it: two
/// bookkeeping channels, the scalp montage, cardiac and polygraphy leads.
fn acquisition_channels() -> Vec<String> {
    let mut names = vec!["POL E".to_string(), "POL DC01".to_string()];
    for ch in [
        "Fp1-Ref", "F7-Ref", "T7-Ref", "P7-Ref", "O1-Ref", "F3-Ref", "C3-Ref", "P3-Ref",
        "Fz-Ref", "Cz-Ref", "Pz-Ref", "Fp2-Ref", "F4-Ref", "C4-Ref", "P4-Ref", "O2-Ref",
        "F8-Ref", "T8-Ref", "P8-Ref", "A1-Ref", "A2-Ref", "EKG1-Ref", "EKG2-Ref",
    ] {
        names.push(format!("POL {ch}"));
    }
    names.extend([
        "POL EMG1-Ref".to_string(),
        "POL EMG2-Ref".to_string(),
        "POL L EOG-Ref".to_string(),
        "POL R EOG-Ref".to_string(),
    ]);
    names
}

fn write_segment(dir: &Path, name: &str, start: chrono::NaiveDateTime) {
    let names = acquisition_channels();
    let n = names.len();
    let data = Array2::from_shape_fn((n, SEG_SECS * SFREQ as usize), |(c, t)| {
        30.0 * (2.0 * std::f32::consts::PI * 10.0 * t as f32 / SFREQ + c as f32).sin()
    });
    let buf = SignalBuffer {
        ch_names: names,
        sfreq: SFREQ,
        start,
        data,
    };
    edf::write_edf(&buf, "PR05", &dir.join(name)).unwrap();
}

/// Lay out segments with a 20 s recording gap after the third one, write
/// the catalog, and return (patient dir, segment dir, catalog path).
fn build_patient_dir(root: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
    let patient_dir = root.join("PR05");
    let segment_dir = patient_dir.join("PR05");
    std::fs::create_dir_all(&segment_dir).unwrap();

    let t0 = catalog::parse_time("2021-06-01 21:30:00").unwrap();
    let mut catalog_file =
        std::fs::File::create(patient_dir.join("PR05_edf_catalog.csv")).unwrap();
    writeln!(catalog_file, "name,index,start,end").unwrap();

    let mut start = t0;
    for i in 1..=6usize {
        if i == 4 {
            start += TimeDelta::seconds(20); // recording dropout
        }
        let end = start + TimeDelta::seconds(SEG_SECS as i64);
        let name = format!("PR05_{i}.edf");
        write_segment(&segment_dir, &name, start);
        writeln!(
            catalog_file,
            "{name},{i},{},{}",
            start.format("%Y-%m-%d %H:%M:%S%.6f"),
            end.format("%Y-%m-%d %H:%M:%S%.6f"),
        )
        .unwrap();
        start = end;
    }
    (patient_dir, segment_dir)
}

#[test]
fn full_run_produces_expected_artifacts() {
    let root = tempfile::tempdir().unwrap();
    let (patient_dir, segment_dir) = build_patient_dir(root.path());

    let cfg = MergeConfig {
        modes: vec![RefMode::Canonical, RefMode::Bipolar],
        ..MergeConfig::default()
    };

    let segment_files = catalog::list_segments(&segment_dir).unwrap();
    assert_eq!(segment_files.len(), 6);

    let records =
        catalog::read_catalog(&patient_dir.join("PR05_edf_catalog.csv")).unwrap();
    catalog::validate_against(&records, &segment_files, &segment_dir).unwrap();

    let nights = segmenter::segment_nights(&records, &SegmenterParams::from_config(&cfg));
    assert_eq!(nights.len(), 1);
    assert_eq!(nights[0].intervals.len(), 2, "20 s dropout splits the night");
    let plan = WorkPlan::build(&nights);

    let out_dir = root.path().join("out-PR05");
    std::fs::create_dir_all(&out_dir).unwrap();
    let files: Vec<String> = records.iter().map(|r| r.file_name.clone()).collect();
    let out = orchestrate::OutputTarget {
        patient: "PR05".into(),
        dir: out_dir.clone(),
    };
    let reports =
        orchestrate::process_nights(&plan, &files, &segment_dir, &EdfCodec, &cfg, &out);

    assert_eq!(reports.len(), 1);
    assert!(reports[0].succeeded());
    assert!(reports[0].failures.is_empty());
    // Two intervals × two modes.
    assert_eq!(reports[0].artifacts.len(), 4);
    for name in [
        "PR05_night_1.1_scalp.edf",
        "PR05_night_1.1_scalp-bipolar.edf",
        "PR05_night_1.2_scalp.edf",
        "PR05_night_1.2_scalp-bipolar.edf",
    ] {
        assert!(out_dir.join(name).exists(), "missing {name}");
    }
}

#[test]
fn merged_artifact_covers_the_interval() {
    let root = tempfile::tempdir().unwrap();
    let (patient_dir, segment_dir) = build_patient_dir(root.path());

    let cfg = MergeConfig {
        modes: vec![RefMode::Canonical],
        ..MergeConfig::default()
    };
    let records =
        catalog::read_catalog(&patient_dir.join("PR05_edf_catalog.csv")).unwrap();
    let nights = segmenter::segment_nights(&records, &SegmenterParams::from_config(&cfg));
    let plan = WorkPlan::build(&nights);

    let out_dir = root.path().join("out-PR05");
    std::fs::create_dir_all(&out_dir).unwrap();
    let files: Vec<String> = records.iter().map(|r| r.file_name.clone()).collect();
    let out = orchestrate::OutputTarget {
        patient: "PR05".into(),
        dir: out_dir.clone(),
    };
    orchestrate::process_nights(&plan, &files, &segment_dir, &EdfCodec, &cfg, &out);

    let merged = edf::read_edf(&out_dir.join("PR05_night_1.1_scalp.edf")).unwrap();
    // Three 10 s segments at 200 Hz.
    assert_eq!(merged.n_samples(), 3 * SEG_SECS * SFREQ as usize);
    assert_eq!(merged.sfreq, SFREQ);
    // Canonicalised names: prefix stripped, bookkeeping and cardiac gone,
    // polygraphy leads remapped.
    assert_eq!(merged.ch_names[0], "Fp1-Ref");
    assert!(merged.ch_names.contains(&"L_EMG-Ref".to_string()));
    assert!(!merged.ch_names.iter().any(|n| n.starts_with("POL ")));
    assert!(!merged.ch_names.contains(&"EKG1-Ref".to_string()));
    // The interval starts at the first segment's clock time.
    assert_eq!(merged.start, records[0].start);
    // Amplitudes are volt-scaled by the chain.
    let peak = merged.data.iter().map(|v| v.abs()).fold(0.0_f32, f32::max);
    assert!(peak < 1e-3, "peak {peak} not volt-scaled");
    assert!(peak > 0.0, "signal vanished");
}

#[test]
fn summary_reflects_segmentation() {
    let root = tempfile::tempdir().unwrap();
    let (patient_dir, _segment_dir) = build_patient_dir(root.path());

    let cfg = MergeConfig::default();
    let records =
        catalog::read_catalog(&patient_dir.join("PR05_edf_catalog.csv")).unwrap();
    let nights = segmenter::segment_nights(&records, &SegmenterParams::from_config(&cfg));

    let path = root.path().join("summary.txt");
    summary::write_summary(&path, records.len(), &nights).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("6 segment file(s)"));
    assert!(text.contains("1 night(s)"));
    assert!(text.contains("Night 1 has 2 interval(s):"));
}
