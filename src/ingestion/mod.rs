//! Ingestion entrypoints and implementations.
//!
//! Most callers should use [`ingest_from_path`] (from [`unified`]) which:
//!
//! - auto-detects format by file extension (or you can override via [`IngestionOptions`])
//! - performs ingestion into an in-memory [`crate::types::DataSet`]
//!
//! Format-specific functions are also available under:
//! - [`csv`]
//! - [`json`]
//! - [`parquet`]
//! - [`frame`] (an in-memory Polars `DataFrame`)

pub mod csv;
pub mod frame;
pub mod json;
pub mod parquet;
pub mod unified;

pub use frame::dataset_from_frame;
pub use unified::{ingest_from_path, source_columns, IngestionFormat, IngestionOptions, IngestionRequest};
