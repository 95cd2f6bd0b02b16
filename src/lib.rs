//! `qbase-loader` packs tabular data into upload-ready record batches for a remote table API
//! and sends them.
//!
//! Each column of a [`types::DataSet`] is declared with a column type (for example `numeric`,
//! `duration:seconds` or `date:%m.%d.%Y`). The declared type selects a packer that converts every
//! raw value into the wire form the API accepts. Packed columns are assembled into records keyed
//! by destination field ID and split into batches of at most 20,000 records.
//!
//! ## Pipeline
//!
//! 1. **Ingest** a file with [`ingestion::ingest_from_path`] (CSV, JSON/NDJSON, Parquet), or
//!    convert an in-memory Polars frame with [`ingestion::dataset_from_frame`].
//! 2. **Transform** with [`processing::transform()`]: every column is validated against the
//!    [`registry::Registry`] and packed (columns in parallel).
//! 3. **Assemble** with [`processing::assemble()`]: one [`processing::Record`] per row, absent
//!    values omitted.
//! 4. **Batch** with [`processing::batch()`].
//! 5. **Upload** with [`transport::upload_batches`], sequentially or concurrently.
//!
//! [`transport::upload`] runs steps 2 to 5 in one call. Declarations and field IDs usually come
//! from a stored [`schema::TableSchema`] pulled from the remote table.
//!
//! ## Example
//!
//! ```rust
//! use std::collections::HashMap;
//!
//! use qbase_loader::processing::{assemble, transform, ColumnDeclaration};
//! use qbase_loader::types::{DataSet, Value};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), qbase_loader::LoaderError> {
//! let ds = DataSet::from_columns(vec![
//!     ("Phone".to_string(), vec![Value::Utf8("555.123.4567 x12".to_string())]),
//!     ("Notes".to_string(), vec![Value::Utf8("n/a".to_string())]),
//! ]);
//! let declarations = HashMap::from([
//!     ("Phone".to_string(), ColumnDeclaration::new("phone").with_arg("###.###.#### x##")),
//!     ("Notes".to_string(), ColumnDeclaration::drop_column()),
//! ]);
//! let field_ids = HashMap::from([("Phone".to_string(), "7".to_string())]);
//!
//! let records = assemble(&transform(&ds, &declarations)?, &field_ids)?;
//! assert_eq!(records[0].to_plain_json(), json!({"7": "(555) 123-4567 x12"}));
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`types`]: raw schema and in-memory dataset
//! - [`ingestion`]: file and dataframe sources
//! - [`pack`]: single-value packers
//! - [`registry`]: the column-type table
//! - [`processing`]: declarations, transform, assemble, batch
//! - [`transport`]: HTTP client, upload driver, observers, record fetch
//! - [`schema`], [`profiles`], [`config`]: local state under the base directory
//! - [`logging`]: subscriber setup for binaries
//! - [`error`]: error types

pub mod config;
pub mod error;
pub mod ingestion;
pub mod logging;
pub mod pack;
pub mod processing;
pub mod profiles;
pub mod registry;
pub mod schema;
pub mod transport;
pub mod types;

pub use error::{LoaderError, LoaderResult, PackError};
