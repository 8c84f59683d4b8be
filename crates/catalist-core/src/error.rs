//! Configuration error taxonomy
//!
//! Configuration problems are fatal to batch planning and pipeline startup:
//! no partial batch plan is safely usable, so these propagate all the way to
//! the CLI and surface as a nonzero exit.

use std::path::PathBuf;

/// Error raised for invalid or missing configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// No `[project.<name>]` section in the loaded configuration.
    UnknownProject(String),
    /// Project name contains characters unusable as a directory name.
    InvalidProjectId(String),
    /// A dataset identifier line could not be parsed.
    InvalidDatasetId(String),
    /// The dataset manifest file does not exist.
    MissingManifest(PathBuf),
    /// `n_per_batch` must be at least 1.
    InvalidBatchSize(usize),
    /// A batch number that was never created.
    NoSuchBatch(u32),
    /// I/O failure reading or writing a configuration-owned file.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownProject(name) => write!(f, "unknown project: {name}"),
            Self::InvalidProjectId(name) => {
                write!(f, "invalid project identifier: {name:?}")
            }
            Self::InvalidDatasetId(id) => {
                write!(f, "invalid dataset identifier: {id:?}")
            }
            Self::MissingManifest(path) => {
                write!(f, "dataset manifest not found: {}", path.display())
            }
            Self::InvalidBatchSize(n) => {
                write!(f, "n_per_batch must be >= 1, got {n}")
            }
            Self::NoSuchBatch(n) => write!(f, "no such batch: {n}"),
            Self::Io { path, source } => {
                write!(f, "{}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl ConfigError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_unknown_project() {
        let err = ConfigError::UnknownProject("cmip9".into());
        assert_eq!(err.to_string(), "unknown project: cmip9");
    }

    #[test]
    fn display_batch_size() {
        let err = ConfigError::InvalidBatchSize(0);
        assert!(err.to_string().contains(">= 1"));
    }

    #[test]
    fn io_error_has_source() {
        use std::error::Error;
        let err = ConfigError::io(
            "/tmp/x",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.source().is_some());
    }
}
