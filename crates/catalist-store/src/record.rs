//! Processing record data model

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classification of a recorded failure.
///
/// `Scan` covers extraction/read failures for the file itself; `Write`
/// covers store-insertion failures after a successful extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Scan,
    Write,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scan => "scan",
            Self::Write => "write",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a previous processing attempt for a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    /// Never attempted.
    Absent,
    Success,
    Failure,
}

/// One named facet value, in facet-rule order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facet {
    pub name: String,
    pub value: String,
}

/// Extracted metadata for one successfully scanned file.
///
/// `start_time`/`end_time` are `None` for time-invariant data; the CSV
/// export writes the literal `undefined`, which downstream readers
/// reinterpret as the minimum/maximum representable datetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Full dataset identifier this file belongs to.
    pub ds_id: String,
    /// File path relative to the project base directory.
    pub path: String,
    /// File size in bytes.
    pub size: u64,
    /// Facet values in facet-rule order.
    pub facets: Vec<Facet>,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
    /// Formatted numeric bounding box, empty when unknown.
    pub bbox: String,
    /// Free-form level field, empty when inapplicable.
    pub level: String,
}

impl CatalogEntry {
    /// Look up a facet value by name.
    pub fn facet(&self, name: &str) -> Option<&str> {
        self.facets
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }
}

/// Success or failure payload of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    Success {
        content: CatalogEntry,
    },
    Failure {
        error_kind: FailureKind,
        message: String,
    },
}

/// The persisted outcome of attempting to extract metadata for one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingRecord {
    pub path: String,
    #[serde(flatten)]
    pub outcome: Outcome,
    pub recorded_at: DateTime<Utc>,
}

impl ProcessingRecord {
    pub fn success(path: &str, content: CatalogEntry) -> Self {
        Self {
            path: path.to_string(),
            outcome: Outcome::Success { content },
            recorded_at: Utc::now(),
        }
    }

    pub fn failure(path: &str, error_kind: FailureKind, message: &str) -> Self {
        Self {
            path: path.to_string(),
            outcome: Outcome::Failure {
                error_kind,
                message: message.to_string(),
            },
            recorded_at: Utc::now(),
        }
    }

    pub fn status(&self) -> RecordStatus {
        match self.outcome {
            Outcome::Success { .. } => RecordStatus::Success,
            Outcome::Failure { .. } => RecordStatus::Failure,
        }
    }

    pub fn content(&self) -> Option<&CatalogEntry> {
        match &self.outcome {
            Outcome::Success { content } => Some(content),
            Outcome::Failure { .. } => None,
        }
    }
}
