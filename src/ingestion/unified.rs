//! Unified ingestion entrypoint.
//!
//! Most callers should use [`ingest_from_path`], which ingests a file into an in-memory
//! [`crate::types::DataSet`] using a provided [`crate::types::Schema`].
//!
//! If [`IngestionOptions::format`] is `None`, the ingestion format is inferred from the file
//! extension.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{LoaderError, LoaderResult};
use crate::types::{DataSet, Schema};

use super::{csv, json, parquet};

/// Supported ingestion formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionFormat {
    /// Comma-separated values.
    Csv,
    /// JSON array-of-objects or NDJSON.
    Json,
    /// Apache Parquet.
    Parquet,
}

impl IngestionFormat {
    /// Parse an ingestion format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" | "ndjson" => Some(Self::Json),
            "parquet" | "pq" => Some(Self::Parquet),
            _ => None,
        }
    }

    /// Resolve `explicit`, or infer the format from `path`'s extension.
    pub fn resolve(path: &Path, explicit: Option<Self>) -> LoaderResult<Self> {
        match explicit {
            Some(f) => Ok(f),
            None => infer_format_from_path(path),
        }
    }
}

/// Options controlling unified ingestion behavior.
///
/// Use [`Default`] for common cases.
#[derive(Debug, Clone, Default)]
pub struct IngestionOptions {
    /// If `None`, auto-detect format from file extension.
    pub format: Option<IngestionFormat>,
}

/// Unified ingestion entry point for path-based sources.
///
/// # Examples
///
/// ## CSV (auto-detect by extension)
///
/// ```no_run
/// use qbase_loader::ingestion::{ingest_from_path, IngestionOptions};
/// use qbase_loader::types::{DataType, Field, Schema};
///
/// # fn main() -> Result<(), qbase_loader::LoaderError> {
/// let schema = Schema::new(vec![
///     Field::new("id", DataType::Int64),
///     Field::new("name", DataType::Utf8),
/// ]);
///
/// // Uses `.csv` to select CSV ingestion.
/// let ds = ingest_from_path("people.csv", &schema, &IngestionOptions::default())?;
/// println!("rows={}", ds.row_count());
/// # Ok(())
/// # }
/// ```
///
/// ## Force a format explicitly (override extension inference)
///
/// ```no_run
/// use qbase_loader::ingestion::{ingest_from_path, IngestionFormat, IngestionOptions};
/// use qbase_loader::types::{DataType, Field, Schema};
///
/// # fn main() -> Result<(), qbase_loader::LoaderError> {
/// let schema = Schema::new(vec![Field::new("id", DataType::Int64)]);
///
/// let opts = IngestionOptions {
///     format: Some(IngestionFormat::Json),
/// };
///
/// // Useful when a file has no extension or you want to override inference.
/// let ds = ingest_from_path("export_without_extension", &schema, &opts)?;
/// println!("rows={}", ds.row_count());
/// # Ok(())
/// # }
/// ```
pub fn ingest_from_path(
    path: impl AsRef<Path>,
    schema: &Schema,
    options: &IngestionOptions,
) -> LoaderResult<DataSet> {
    let path = path.as_ref();
    let fmt = IngestionFormat::resolve(path, options.format)?;

    let result = match fmt {
        IngestionFormat::Csv => csv::ingest_csv_from_path(path, schema),
        IngestionFormat::Json => json::ingest_json_from_path(path, schema),
        IngestionFormat::Parquet => parquet::ingest_parquet_from_path(path, schema),
    };

    match &result {
        Ok(ds) => debug!(format = ?fmt, path = %path.display(), rows = ds.row_count(), "ingested"),
        Err(e) => warn!(format = ?fmt, path = %path.display(), error = %e, "ingestion failed"),
    }
    result
}

/// Column names of a source file, in file order.
///
/// CSV and Parquet read only the header/metadata. For JSON the keys of every top-level object
/// are collected in first-seen order (nested objects are not flattened).
pub fn source_columns(path: impl AsRef<Path>, format: Option<IngestionFormat>) -> LoaderResult<Vec<String>> {
    let path = path.as_ref();
    match IngestionFormat::resolve(path, format)? {
        IngestionFormat::Csv => csv::read_csv_headers(path),
        IngestionFormat::Json => json::read_json_keys(path),
        IngestionFormat::Parquet => parquet::read_parquet_columns(path),
    }
}

fn infer_format_from_path(path: &Path) -> LoaderResult<IngestionFormat> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| LoaderError::SchemaMismatch {
            message: format!(
                "cannot infer format: path has no extension ({})",
                path.display()
            ),
        })?;

    IngestionFormat::from_extension(ext).ok_or_else(|| LoaderError::SchemaMismatch {
        message: format!(
            "cannot infer format from extension '{ext}' for path ({})",
            path.display()
        ),
    })
}

/// Convenience helper for callers that want an owned request object.
#[derive(Debug, Clone)]
pub struct IngestionRequest {
    /// Path to the input file.
    pub path: PathBuf,
    /// Schema to validate/parse values into.
    pub schema: Schema,
    /// Options controlling ingestion.
    pub options: IngestionOptions,
}

impl IngestionRequest {
    /// Execute the request by calling [`ingest_from_path`].
    pub fn run(&self) -> LoaderResult<DataSet> {
        ingest_from_path(&self.path, &self.schema, &self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_are_case_insensitive() {
        assert_eq!(IngestionFormat::from_extension("CSV"), Some(IngestionFormat::Csv));
        assert_eq!(IngestionFormat::from_extension("ndjson"), Some(IngestionFormat::Json));
        assert_eq!(IngestionFormat::from_extension("pq"), Some(IngestionFormat::Parquet));
        assert_eq!(IngestionFormat::from_extension("xlsx"), None);
    }

    #[test]
    fn explicit_format_wins_over_extension() {
        let p = Path::new("data.csv");
        assert_eq!(
            IngestionFormat::resolve(p, Some(IngestionFormat::Json)).unwrap(),
            IngestionFormat::Json
        );
        assert!(IngestionFormat::resolve(Path::new("noext"), None).is_err());
    }
}
