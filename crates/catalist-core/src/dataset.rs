//! Dataset and project identifiers
//!
//! A dataset identifier is a dot-delimited facet path, e.g.
//! `c3s-cmip6.CMIP.INM.INM-CM5-0.historical.r1i1p1f1.Amon.rlds.gr1.v20190610`.
//! The first facet names the project; the remaining facets map one-to-one
//! onto subdirectories of the project's archive base directory.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Validated project name, usable as a directory component and store scope.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProjectId(String);

impl ProjectId {
    /// Accepts ASCII alphanumerics, `-` and `_`.
    pub fn new(name: &str) -> Result<Self, ConfigError> {
        let ok = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if ok {
            Ok(Self(name.to_string()))
        } else {
            Err(ConfigError::InvalidProjectId(name.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable facet path naming one logical dataset within a project.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DatasetId(String);

impl DatasetId {
    /// Parse from dot- or slash-delimited text.
    ///
    /// Slash-delimited input is normalized to the canonical dot form.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let id = s.trim().replace('/', ".");
        if id.is_empty() || id.split('.').any(|facet| facet.is_empty()) {
            return Err(ConfigError::InvalidDatasetId(s.to_string()));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Facet values in identifier order.
    pub fn facets(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    pub fn facet_count(&self) -> usize {
        self.facets().count()
    }

    /// Archive directory for this dataset.
    ///
    /// The first facet is embodied by `base_dir` itself; the rest become
    /// path components below it.
    pub fn directory(&self, base_dir: &Path) -> PathBuf {
        let mut dir = base_dir.to_path_buf();
        for facet in self.facets().skip(1) {
            dir.push(facet);
        }
        dir
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
