//! File-listing and metadata-extraction collaborators
//!
//! Both are traits so the scanner stays independent of the archive layout
//! and file format. The default implementations cover the common case:
//! datasets laid out as facet directories of `.nc` files whose names carry
//! a `_YYYYMM-YYYYMM` (or `_YYYYMMDD-YYYYMMDD`) time-range suffix.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Days, Months, NaiveDate, NaiveDateTime};

use catalist_core::DatasetId;
use catalist_store::{CatalogEntry, Facet};

/// Resolves a dataset identifier to its constituent file paths.
pub trait FileLister {
    fn files(&self, id: &DatasetId) -> Result<Vec<PathBuf>>;
}

/// Extracts the catalog metadata record for one file.
///
/// Pure from the pipeline's perspective: reads the file, returns a record
/// or an error, no other side effects.
pub trait Extractor {
    fn extract(&self, id: &DatasetId, path: &Path) -> Result<CatalogEntry>;
}

/// Lists `.nc` files in the dataset's archive directory, sorted.
///
/// A missing directory yields an empty list: a dataset with no files on
/// disk is empty, not an error.
pub struct ArchiveLister {
    base_dir: PathBuf,
}

impl ArchiveLister {
    pub fn new(base_dir: &Path) -> Self {
        Self {
            base_dir: base_dir.to_path_buf(),
        }
    }
}

impl FileLister for ArchiveLister {
    fn files(&self, id: &DatasetId) -> Result<Vec<PathBuf>> {
        let pattern = id.directory(&self.base_dir).join("*.nc");
        let mut files: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())
            .context("invalid glob pattern")?
            .filter_map(|e| e.ok())
            .filter(|p| p.is_file())
            .collect();
        files.sort();
        Ok(files)
    }
}

/// Path-convention extractor: facets from the identifier, size from file
/// metadata, time bounds from the filename suffix.
pub struct FacetExtractor {
    base_dir: PathBuf,
    facet_rule: Vec<String>,
}

impl FacetExtractor {
    pub fn new(base_dir: &Path, facet_rule: &[String]) -> Self {
        Self {
            base_dir: base_dir.to_path_buf(),
            facet_rule: facet_rule.to_vec(),
        }
    }
}

impl Extractor for FacetExtractor {
    fn extract(&self, id: &DatasetId, path: &Path) -> Result<CatalogEntry> {
        let meta = fs::metadata(path)
            .with_context(|| format!("failed to stat {}", path.display()))?;

        let values: Vec<&str> = id.facets().collect();
        if values.len() != self.facet_rule.len() {
            anyhow::bail!(
                "dataset id {id} has {} facets, facet rule expects {}",
                values.len(),
                self.facet_rule.len()
            );
        }
        let facets = self
            .facet_rule
            .iter()
            .zip(&values)
            .map(|(name, value)| Facet {
                name: name.clone(),
                value: value.to_string(),
            })
            .collect();

        let rel = path.strip_prefix(&self.base_dir).unwrap_or(path);
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
        let (start_time, end_time) = match parse_time_range(stem) {
            Some((start, end)) => (Some(start), Some(end)),
            // No time suffix: time-invariant data
            None => (None, None),
        };

        Ok(CatalogEntry {
            ds_id: id.to_string(),
            path: rel.to_string_lossy().into_owned(),
            size: meta.len(),
            facets,
            start_time,
            end_time,
            bbox: String::new(),
            level: String::new(),
        })
    }
}

/// Parse the `_YYYYMM-YYYYMM` / `_YYYYMMDD-YYYYMMDD` suffix of a filename
/// stem into inclusive time bounds.
pub fn parse_time_range(stem: &str) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let range = stem.rsplit('_').next()?;
    let (start, end) = range.split_once('-')?;
    Some((parse_bound(start, false)?, parse_bound(end, true)?))
}

fn parse_bound(s: &str, end: bool) -> Option<NaiveDateTime> {
    if !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let year: i32 = s.get(0..4)?.parse().ok()?;
    let month: u32 = s.get(4..6)?.parse().ok()?;
    let date = match s.len() {
        // Month resolution: first or last day of the month
        6 => {
            let first = NaiveDate::from_ymd_opt(year, month, 1)?;
            if end {
                first
                    .checked_add_months(Months::new(1))?
                    .checked_sub_days(Days::new(1))?
            } else {
                first
            }
        }
        8 => {
            let day: u32 = s.get(6..8)?.parse().ok()?;
            NaiveDate::from_ymd_opt(year, month, day)?
        }
        _ => return None,
    };
    if end {
        date.and_hms_opt(23, 59, 59)
    } else {
        date.and_hms_opt(0, 0, 0)
    }
}
