//! Segment catalog parsing and validation.
//!
//! The catalog is a comma-delimited text file, `{patient}_edf_catalog.csv`,
//! with one header row and one data row per segment. Only four columns
//! matter: segment file name, an ignored column, start time, end time.
//! Timestamps are `YYYY-MM-DD HH:MM:SS` with an optional fractional part
//! that is discarded.
//!
//! Parsing fails fast: a malformed row, a referenced file missing from the
//! segment directory, or an out-of-order row aborts the run before any
//! worker starts. Sortedness is checked here so the segmenter can rely on
//! it.
use std::collections::HashSet;
use std::path::Path;

use chrono::NaiveDateTime;

use crate::error::{MergeError, Result};

/// One catalog row: a segment file and the wall-clock span it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRecord {
    pub file_name: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a catalog timestamp, discarding any fractional seconds.
pub fn parse_time(s: &str) -> Option<NaiveDateTime> {
    let whole = s.split('.').next().unwrap_or(s).trim();
    NaiveDateTime::parse_from_str(whole, TIME_FORMAT).ok()
}

fn parse_row(row: usize, line: &str) -> Result<CatalogRecord> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() < 4 {
        return Err(MergeError::Catalog {
            row,
            detail: format!("expected at least 4 columns, got {}", fields.len()),
        });
    }
    let start = parse_time(fields[2]).ok_or_else(|| MergeError::Catalog {
        row,
        detail: format!("bad start time '{}'", fields[2]),
    })?;
    let end = parse_time(fields[3]).ok_or_else(|| MergeError::Catalog {
        row,
        detail: format!("bad end time '{}'", fields[3]),
    })?;
    Ok(CatalogRecord {
        file_name: fields[0].trim().to_string(),
        start,
        end,
    })
}

/// Read the catalog file into records, verifying ascending start times.
pub fn read_catalog(path: &Path) -> Result<Vec<CatalogRecord>> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        MergeError::Configuration(format!("cannot read catalog {}: {e}", path.display()))
    })?;

    let mut records = Vec::new();
    for (row, line) in text.lines().enumerate().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        let rec = parse_row(row, line)?;
        if let Some(prev) = records.last() {
            let prev: &CatalogRecord = prev;
            if rec.start < prev.start {
                return Err(MergeError::UnsortedCatalog {
                    row,
                    file: rec.file_name,
                });
            }
        }
        records.push(rec);
    }
    Ok(records)
}

/// Verify every catalog record names a file present in the segment
/// directory listing.
pub fn validate_against(
    records: &[CatalogRecord],
    segment_files: &[String],
    dir: &Path,
) -> Result<()> {
    let present: HashSet<&str> = segment_files.iter().map(String::as_str).collect();
    for rec in records {
        if !present.contains(rec.file_name.as_str()) {
            return Err(MergeError::MissingSegment {
                file: rec.file_name.clone(),
                dir: dir.to_path_buf(),
            });
        }
    }
    Ok(())
}

/// List segment files in `dir` whose suffix after the last `_` and before
/// the extension is numeric, sorted by that numeric suffix.
pub fn list_segments(dir: &Path) -> Result<Vec<String>> {
    let mut named: Vec<(u64, String)> = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(seq) = numeric_suffix(&name) {
            named.push((seq, name));
        }
    }
    named.sort();
    Ok(named.into_iter().map(|(_, name)| name).collect())
}

/// Numeric suffix between the last `_` and the extension, e.g.
/// `PR05_2605.edf` → `2605`.
fn numeric_suffix(name: &str) -> Option<u64> {
    let stem = name.rsplit_once('.')?.0;
    let (_, tail) = stem.rsplit_once('_')?;
    tail.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn t(s: &str) -> NaiveDateTime {
        parse_time(s).unwrap()
    }

    #[test]
    fn parses_timestamps_with_and_without_fraction() {
        assert_eq!(
            parse_time("2021-03-04 21:05:06.123456"),
            parse_time("2021-03-04 21:05:06")
        );
        assert!(parse_time("yesterday").is_none());
    }

    #[test]
    fn reads_rows_and_skips_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cat.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "name,idx,start,end").unwrap();
        writeln!(f, "a_1.edf,0,2021-01-01 21:00:00,2021-01-01 21:00:10").unwrap();
        writeln!(f, "a_2.edf,1,2021-01-01 21:00:10.5,2021-01-01 21:00:20").unwrap();
        let recs = read_catalog(&path).unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].file_name, "a_1.edf");
        assert_eq!(recs[1].start, t("2021-01-01 21:00:10"));
    }

    #[test]
    fn unsorted_catalog_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cat.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "name,idx,start,end").unwrap();
        writeln!(f, "a_2.edf,0,2021-01-01 21:10:00,2021-01-01 21:10:10").unwrap();
        writeln!(f, "a_1.edf,1,2021-01-01 21:00:00,2021-01-01 21:00:10").unwrap();
        match read_catalog(&path) {
            Err(MergeError::UnsortedCatalog { row, file }) => {
                assert_eq!(row, 2);
                assert_eq!(file, "a_1.edf");
            }
            other => panic!("expected UnsortedCatalog, got {other:?}"),
        }
    }

    #[test]
    fn missing_segment_is_a_validation_error() {
        let recs = vec![CatalogRecord {
            file_name: "gone_7.edf".into(),
            start: t("2021-01-01 21:00:00"),
            end: t("2021-01-01 21:00:10"),
        }];
        let err = validate_against(&recs, &["here_1.edf".into()], Path::new("/tmp"));
        assert!(matches!(err, Err(MergeError::MissingSegment { .. })));
    }

    #[test]
    fn segment_listing_sorts_by_numeric_suffix() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["p_10.edf", "p_2.edf", "p_1.edf", "notes.txt", "p_x.edf"] {
            std::fs::File::create(dir.path().join(name)).unwrap();
        }
        let files = list_segments(dir.path()).unwrap();
        assert_eq!(files, vec!["p_1.edf", "p_2.edf", "p_10.edf"]);
    }
}
