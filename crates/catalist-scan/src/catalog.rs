//! Catalog export: compressed CSV plus a shared YAML index
//!
//! The CSV is one row per successful file record with a fixed column
//! order; the index document records, per project, where the export lives
//! and how to read it back.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use catalist_core::{ProjectConfig, ProjectId};
use catalist_store::CatalogEntry;

/// Sentinel written for the time bounds of time-invariant data.
///
/// Downstream readers reinterpret it as the minimum (start) or maximum
/// (end) representable datetime.
pub const TIME_UNDEFINED: &str = "undefined";

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Column order of the export: identifier, path, size, the facet rule,
/// then time bounds, bbox and level.
pub fn csv_columns(facet_rule: &[String]) -> Vec<String> {
    let mut columns = vec!["ds_id".to_string(), "path".to_string(), "size".to_string()];
    columns.extend(facet_rule.iter().cloned());
    columns.extend(
        ["start_time", "end_time", "bbox", "level"]
            .iter()
            .map(|s| s.to_string()),
    );
    columns
}

fn format_time(time: Option<NaiveDateTime>) -> String {
    match time {
        Some(t) => t.format(TIME_FORMAT).to_string(),
        None => TIME_UNDEFINED.to_string(),
    }
}

/// Parse a time cell from an export; the sentinel maps back to `None`.
pub fn parse_time_cell(cell: &str) -> Result<Option<NaiveDateTime>> {
    if cell == TIME_UNDEFINED {
        return Ok(None);
    }
    NaiveDateTime::parse_from_str(cell, TIME_FORMAT)
        .map(Some)
        .with_context(|| format!("invalid time cell: {cell:?}"))
}

/// Write all entries to `{csv_dir}/{project}_v{YYYYMMDD}.csv.gz`.
///
/// A same-day re-export overwrites the file; exports from earlier days
/// keep their version stamp and are never deleted here.
pub fn write_csv(
    entries: &[CatalogEntry],
    project: &ProjectId,
    config: &ProjectConfig,
) -> Result<(PathBuf, DateTime<Utc>)> {
    let stamp = Utc::now();
    let version = stamp.format("v%Y%m%d");

    fs::create_dir_all(&config.csv_dir).with_context(|| {
        format!("failed to create csv dir: {}", config.csv_dir.display())
    })?;
    let path = config.csv_dir.join(format!("{project}_{version}.csv.gz"));

    let file = fs::File::create(&path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    let gz = GzEncoder::new(file, Compression::default());
    let mut writer = csv::Writer::from_writer(gz);

    writer.write_record(&csv_columns(&config.facet_rule))?;
    for entry in entries {
        let mut row = vec![entry.ds_id.clone(), entry.path.clone(), entry.size.to_string()];
        for facet in &config.facet_rule {
            row.push(entry.facet(facet).unwrap_or("").to_string());
        }
        row.push(format_time(entry.start_time));
        row.push(format_time(entry.end_time));
        row.push(entry.bbox.clone());
        row.push(entry.level.clone());
        writer.write_record(&row)?;
    }

    let gz = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("failed to flush csv: {e}"))?;
    gz.finish()
        .with_context(|| format!("failed to finish gzip stream: {}", path.display()))?;

    log::info!("Wrote {} rows to {}", entries.len(), path.display());
    Ok((path, stamp))
}

/// Read parameters for one exported CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvKwargs {
    pub blocksize: Option<u64>,
    pub compression: String,
    /// Per-column type overrides; `level` is free-form text, never numeric.
    pub dtype: BTreeMap<String, String>,
}

impl Default for CsvKwargs {
    fn default() -> Self {
        Self {
            blocksize: None,
            compression: "gzip".to_string(),
            dtype: BTreeMap::from([("level".to_string(), "object".to_string())]),
        }
    }
}

/// Index entry for one project's export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSource {
    pub path: String,
    pub last_updated: String,
    pub csv_kwargs: CsvKwargs,
}

/// The shared index document, keyed by project name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogIndex {
    #[serde(default)]
    pub sources: BTreeMap<String, CatalogSource>,
}

impl CatalogIndex {
    pub fn path(catalog_dir: &Path) -> PathBuf {
        catalog_dir.join("catalog.yaml")
    }

    pub fn read_from(catalog_dir: &Path) -> Result<Self> {
        let path = Self::path(catalog_dir);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()))
            }
        };
        serde_yaml::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
    }
}

/// Insert or overwrite the index entry for `project`.
///
/// Other projects sharing the index are left untouched.
pub fn update_catalog(
    project: &ProjectId,
    csv_path: &Path,
    last_updated: DateTime<Utc>,
    catalog_dir: &Path,
) -> Result<PathBuf> {
    let mut index = CatalogIndex::read_from(catalog_dir)?;
    index.sources.insert(
        project.to_string(),
        CatalogSource {
            path: csv_path.to_string_lossy().into_owned(),
            last_updated: last_updated.format(TIME_FORMAT).to_string(),
            csv_kwargs: CsvKwargs::default(),
        },
    );

    fs::create_dir_all(catalog_dir)
        .with_context(|| format!("failed to create {}", catalog_dir.display()))?;
    let path = CatalogIndex::path(catalog_dir);
    let yaml = serde_yaml::to_string(&index).context("failed to serialize catalog index")?;
    fs::write(&path, yaml).with_context(|| format!("failed to write {}", path.display()))?;

    log::info!("Updated catalog index {}", path.display());
    Ok(path)
}
