use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use nightfold::{
    catalog, orchestrate, segmenter, summary, EdfCodec, MergeConfig, RefMode, SegmenterParams,
    WorkPlan,
};

#[derive(Parser)]
#[command(name = "nightfold", about = "Merge overnight EDF segments into per-night composites")]
struct Args {
    /// Patient directory holding {patient}_edf_catalog.csv and a {patient}/
    /// subdirectory with the EDF segments
    patient_path: PathBuf,

    /// Tag appended to the output directory name
    #[arg(long)]
    tag: Option<String>,

    /// Output directory root (default: current directory)
    #[arg(long, default_value = ".")]
    out_root: PathBuf,

    /// Maximum inter-segment gap in seconds within one interval
    #[arg(long, default_value_t = 15)]
    margin_secs: i64,

    /// Maximum segments folded into one interval (unlimited if omitted)
    #[arg(long)]
    max_segments: Option<usize>,

    /// Clock hour (0-23) at which each night's window opens
    #[arg(long, default_value_t = 21)]
    night_start_hour: u32,

    /// Night window length in hours
    #[arg(long, default_value_t = 11)]
    night_hours: i64,

    /// Target sampling rate in Hz
    #[arg(long, default_value_t = 200.0)]
    target_sfreq: f32,

    /// Reference modes to export (comma-separated:
    /// canonical,bipolar,common-average,bipolar-common-average)
    #[arg(long, default_value = "bipolar")]
    modes: String,

    /// Worker pool size (default: one per core)
    #[arg(long)]
    workers: Option<usize>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    let args = Args::parse();
    let started = Instant::now();

    let modes: Vec<RefMode> = args
        .modes
        .split(',')
        .map(|m| m.trim().parse())
        .collect::<Result<_, _>>()?;

    let cfg = MergeConfig {
        night_start_hour: args.night_start_hour,
        night_hours: args.night_hours,
        margin_secs: args.margin_secs,
        max_segments: args.max_segments,
        target_sfreq: args.target_sfreq,
        modes,
        workers: args.workers,
        ..MergeConfig::default()
    };
    cfg.validate()?;

    // Directory conventions: the patient directory is named after the
    // patient and holds the catalog next to a same-named segment folder.
    let patient_path = args
        .patient_path
        .canonicalize()
        .with_context(|| format!("patient path {}", args.patient_path.display()))?;
    let patient = patient_path
        .file_name()
        .and_then(|n| n.to_str())
        .context("patient path has no terminal directory name")?
        .to_string();
    let catalog_path = patient_path.join(format!("{patient}_edf_catalog.csv"));
    let segment_dir = patient_path.join(&patient);
    if !segment_dir.is_dir() {
        bail!("segment directory {} not found", segment_dir.display());
    }

    let segment_files = catalog::list_segments(&segment_dir)?;
    info!(segments = segment_files.len(), "segment directory scanned");

    let records = catalog::read_catalog(&catalog_path)?;
    catalog::validate_against(&records, &segment_files, &segment_dir)?;
    info!(records = records.len(), "catalog validated");

    let nights = segmenter::segment_nights(&records, &SegmenterParams::from_config(&cfg));
    let plan = WorkPlan::build(&nights);
    info!(
        nights = plan.n_nights(),
        intervals = plan.n_intervals(),
        "segmentation complete"
    );

    // Output directory is recreated from scratch, as the artifacts are
    // derived data.
    let out_dir = match &args.tag {
        Some(tag) => args.out_root.join(format!("out-{patient}-{tag}")),
        None => args.out_root.join(format!("out-{patient}")),
    };
    if out_dir.exists() {
        std::fs::remove_dir_all(&out_dir)?;
    }
    std::fs::create_dir_all(&out_dir)?;

    let summary_path = out_dir.join("summary.txt");
    summary::write_summary(&summary_path, records.len(), &nights)?;

    if let Some(workers) = cfg.workers {
        rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build_global()
            .context("configuring worker pool")?;
    }

    let files: Vec<String> = records.iter().map(|r| r.file_name.clone()).collect();
    let out = orchestrate::OutputTarget {
        patient: patient.clone(),
        dir: out_dir.clone(),
    };
    let reports = orchestrate::process_nights(&plan, &files, &segment_dir, &EdfCodec, &cfg, &out);

    let mut n_artifacts = 0usize;
    let mut n_failed_nights = 0usize;
    for report in &reports {
        n_artifacts += report.artifacts.len();
        if !report.succeeded() {
            n_failed_nights += 1;
        }
        for (interval, e) in &report.failures {
            error!(night = report.night + 1, interval = interval + 1, error = %e,
                "interval lost");
        }
    }

    let elapsed = started.elapsed().as_secs_f64() / 60.0;
    summary::append_lines(
        &summary_path,
        &[format!("Time elapsed: {elapsed:.2} minutes")],
    )?;
    info!(
        artifacts = n_artifacts,
        failed_nights = n_failed_nights,
        "run complete in {elapsed:.2} min"
    );

    if n_artifacts == 0 && plan.n_nights() > 0 {
        bail!("no artifacts produced");
    }
    Ok(())
}
