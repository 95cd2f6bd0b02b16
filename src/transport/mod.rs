//! Transport to the remote records API.
//!
//! - [`RecordsClient`]: async HTTP client (`POST /v1/records`, `POST /v1/records/query`,
//!   `GET /v1/fields`)
//! - [`upload_batches`] / [`upload`]: send batches sequentially or concurrently and collect an
//!   [`UploadReport`]
//! - [`UploadObserver`]: hooks for batch success/failure/alerts
//! - [`fetch`]: query records by field label and unpack them into a dataset

pub mod client;
pub mod fetch;
pub mod observer;
pub mod upload;

pub use client::{
    Credentials, QueryField, QueryMetadata, QueryResponse, RecordsClient, RemoteField, SortField, SortOrder,
    UpsertMetadata, UpsertOptions, UpsertResponse, DEFAULT_BASE_URL,
};
pub use fetch::{fetch, unpack, FetchRequest};
pub use observer::{
    BatchContext, BatchStats, CompositeObserver, FileObserver, TracingObserver, UploadObserver, UploadSeverity,
};
pub use upload::{upload, upload_batches, BatchOutcome, UploadMode, UploadOptions, UploadReport};
