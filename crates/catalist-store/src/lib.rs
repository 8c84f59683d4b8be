//! catalist-store: durable per-file processing outcomes
//!
//! One record per scanned file path, scoped per project. The scanner is the
//! only writer; the catalog builder is a read-only consumer. Records are
//! plain JSON documents named by the blake3 hash of the path, so concurrent
//! workers touching disjoint paths touch disjoint files and need no locking.

pub mod record;
pub mod store;

pub use record::{CatalogEntry, Facet, FailureKind, Outcome, ProcessingRecord, RecordStatus};
pub use store::{ResultStore, StoreError};
