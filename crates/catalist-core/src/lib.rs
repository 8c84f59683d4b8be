//! Catalist Core - shared infrastructure for the catalog pipeline
//!
//! This crate provides the pieces every other catalist crate builds on:
//! dataset identifiers, project configuration, logging setup, and the
//! work queue used to distribute dataset scans across workers.

pub mod config;
pub mod dataset;
pub mod error;
pub mod logging;
pub mod work_queue;

// Re-exports for convenience
pub use config::{Config, ProjectConfig, WorkflowConfig};
pub use dataset::{DatasetId, ProjectId};
pub use error::ConfigError;
pub use logging::{init_logging, IndicatifLogger};
pub use work_queue::WorkQueue;
