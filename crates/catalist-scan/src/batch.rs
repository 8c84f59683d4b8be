//! Batch planning: partition a project's dataset list into units of work
//!
//! Batch files live at `{catalog_dir}/{project}/batches/batch_NNNN.txt`,
//! one dataset identifier per line, numbered from 1 with no gaps. The
//! partition is deterministic: an unchanged manifest and batch size always
//! reproduce byte-identical batch files, so batch numbers are stable
//! across re-runs.

use std::fs;
use std::path::PathBuf;

use catalist_core::{ConfigError, DatasetId, ProjectConfig, ProjectId};

pub struct BatchPlanner<'a> {
    project: &'a ProjectId,
    config: &'a ProjectConfig,
    n_per_batch: usize,
}

impl<'a> BatchPlanner<'a> {
    pub fn new(project: &'a ProjectId, config: &'a ProjectConfig, n_per_batch: usize) -> Self {
        Self {
            project,
            config,
            n_per_batch,
        }
    }

    pub fn batches_dir(&self) -> PathBuf {
        self.config
            .catalog_dir
            .join(self.project.as_str())
            .join("batches")
    }

    pub fn batch_path(&self, number: u32) -> PathBuf {
        self.batches_dir().join(format!("batch_{number:04}.txt"))
    }

    /// Read the manifest and write the batch files. Returns the batch count.
    ///
    /// Any batches from a previous planning run are removed first, so a
    /// shrunken manifest cannot leave stale batch numbers behind.
    pub fn create_batches(&self) -> Result<usize, ConfigError> {
        if self.n_per_batch < 1 {
            return Err(ConfigError::InvalidBatchSize(self.n_per_batch));
        }

        let manifest = &self.config.datasets_file;
        let text = match fs::read_to_string(manifest) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::MissingManifest(manifest.clone()))
            }
            Err(e) => return Err(ConfigError::io(manifest.clone(), e)),
        };

        let ids = parse_manifest(&text)?;

        let dir = self.batches_dir();
        if dir.exists() {
            fs::remove_dir_all(&dir).map_err(|e| ConfigError::io(dir.clone(), e))?;
        }
        fs::create_dir_all(&dir).map_err(|e| ConfigError::io(dir.clone(), e))?;

        let mut count = 0;
        for (i, chunk) in ids.chunks(self.n_per_batch).enumerate() {
            let number = (i + 1) as u32;
            let mut body = chunk
                .iter()
                .map(DatasetId::as_str)
                .collect::<Vec<_>>()
                .join("\n");
            body.push('\n');

            let path = self.batch_path(number);
            fs::write(&path, body).map_err(|e| ConfigError::io(path, e))?;
            count += 1;
        }

        log::info!(
            "Wrote {count} batches of up to {} datasets to {}",
            self.n_per_batch,
            dir.display()
        );
        Ok(count)
    }

    /// Read one batch back as dataset identifiers.
    pub fn load_batch(&self, number: u32) -> Result<Vec<DatasetId>, ConfigError> {
        let path = self.batch_path(number);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::NoSuchBatch(number))
            }
            Err(e) => return Err(ConfigError::io(path, e)),
        };
        parse_manifest(&text)
    }

    /// Numbers of all existing batches, ascending.
    pub fn list_batches(&self) -> Result<Vec<u32>, ConfigError> {
        let dir = self.batches_dir();
        let read = match fs::read_dir(&dir) {
            Ok(read) => read,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ConfigError::io(dir, e)),
        };

        let mut numbers = Vec::new();
        for entry in read {
            let entry = entry.map_err(|e| ConfigError::io(self.batches_dir(), e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(num) = name
                .strip_prefix("batch_")
                .and_then(|s| s.strip_suffix(".txt"))
                .and_then(|s| s.parse::<u32>().ok())
            {
                numbers.push(num);
            }
        }
        numbers.sort_unstable();
        Ok(numbers)
    }
}

/// Parse a manifest or batch body: one identifier per line, blanks ignored.
fn parse_manifest(text: &str) -> Result<Vec<DatasetId>, ConfigError> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(DatasetId::parse)
        .collect()
}
