use thiserror::Error;

/// Convenience result type used across the crate.
pub type LoaderResult<T> = Result<T, LoaderError>;

/// Error raised by a single packer call.
///
/// Packers never fall back to a default: every variant here aborts the whole column that
/// produced it (see [`LoaderError::Pack`]).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PackError {
    /// Duration unit other than `seconds` / `milliseconds`.
    #[error("'{unit}' is not a valid duration unit (expected 'seconds' or 'milliseconds')")]
    InvalidUnit { unit: String },

    /// The raw value has a scalar type the packer cannot accept.
    #[error("value {raw} of type {found} cannot be packed as {expected}")]
    WrongType {
        expected: &'static str,
        found: &'static str,
        raw: String,
    },

    /// A numeric value could not be coerced to an integer.
    #[error("value '{raw}' cannot be coerced to an integer: {message}")]
    NotAnInteger { raw: String, message: String },

    /// Seconds -> milliseconds conversion overflowed.
    #[error("duration {raw} overflows when converted to milliseconds")]
    DurationOverflow { raw: i64 },

    /// A date or datetime string did not match its format.
    #[error("could not parse '{raw}' with format '{format}': {message}")]
    DateParse {
        raw: String,
        format: String,
        message: String,
    },

    /// The raw phone string is longer than its template.
    #[error("could not parse '{raw}' with template '{template}': template is shorter than the value")]
    PhoneTemplate { raw: String, template: String },

    /// The characters at `#` positions were not all digits, or there were fewer than ten.
    #[error("could not parse '{raw}' with template '{template}': extracted '{digits}' is not a 10+ digit number")]
    PhoneDigits {
        raw: String,
        template: String,
        digits: String,
    },
}

/// Error type returned by ingestion, transform, assembly and upload operations.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV ingestion error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Parquet ingestion error.
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Polars dataframe error.
    #[error("polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON (de)serialization error for stored profiles/schemas or API payloads.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to read `config.toml`.
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    /// HTTP client error (connection, TLS, body decoding).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// A concurrent upload task panicked or was cancelled.
    #[error("upload task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// The input does not conform to the provided schema (missing required fields/columns, etc.).
    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// A value could not be parsed into the required [`crate::types::DataType`].
    #[error("failed to parse value at row {row} column '{column}': {message} (raw='{raw}')")]
    ParseError {
        row: usize,
        column: String,
        raw: String,
        message: String,
    },

    /// A declaration string such as `"duration:seconds"` is malformed.
    #[error("invalid column declaration: {message}")]
    Declaration { message: String },

    /// A dataset column has no column-type declaration.
    #[error("column '{column}' has no column type declaration (declare it as 'drop' to skip it)")]
    MissingDeclaration { column: String },

    /// The declared type name is not in the registry.
    #[error("column '{column}' declares unknown column type '{column_type}'")]
    UnknownColumnType { column: String, column_type: String },

    /// The declared type is recognised but has no packer.
    #[error("column '{column}' declares column type '{column_type}', which is not supported")]
    UnsupportedColumnType { column: String, column_type: String },

    /// Wrong number of declaration arguments for the column type.
    #[error("column '{column}' of type '{column_type}' expects {expected} argument(s) ({names}), got {found}")]
    ArgumentCount {
        column: String,
        column_type: String,
        expected: usize,
        names: String,
        found: usize,
    },

    /// A declaration argument is present but unusable (bad unit, format or template).
    #[error("column '{column}' of type '{column_type}' has invalid argument '{argument}': {message}")]
    InvalidArgument {
        column: String,
        column_type: String,
        argument: String,
        message: String,
    },

    /// A packer failed on a value of the column.
    #[error("failed packing column '{column}' with column type '{column_type}' at row {row}: {source}")]
    Pack {
        column: String,
        column_type: String,
        row: usize,
        #[source]
        source: PackError,
    },

    /// A packed column has no destination field ID.
    #[error("column '{column}' has no destination field id")]
    MissingFieldId { column: String },

    /// Batch size must be at least one record.
    #[error("invalid batch size {0}: must be at least 1")]
    InvalidBatchSize(usize),

    /// The remote API answered with a non-success status.
    #[error("request failed with status {status}: {body}")]
    Transport { status: u16, body: String },

    /// Profile is missing or unusable.
    #[error("profile error: {message}")]
    Profile { message: String },

    /// A stored table schema is missing or inconsistent.
    #[error("table schema error: {message}")]
    TableSchema { message: String },
}

impl LoaderError {
    /// Returns true for errors caused by caller configuration rather than data or transport.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Declaration { .. }
                | Self::MissingDeclaration { .. }
                | Self::UnknownColumnType { .. }
                | Self::UnsupportedColumnType { .. }
                | Self::ArgumentCount { .. }
                | Self::InvalidArgument { .. }
                | Self::MissingFieldId { .. }
                | Self::InvalidBatchSize(_)
                | Self::Profile { .. }
                | Self::TableSchema { .. }
                | Self::Config(_)
        )
    }
}
