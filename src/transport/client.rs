//! HTTP client for the remote records API.

use std::collections::BTreeMap;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};

use crate::error::{LoaderError, LoaderResult};
use crate::processing::Record;

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.quickbase.com";

/// Realm header name.
pub const REALM_HEADER: &str = "QB-Realm-Hostname";

/// The three pieces of authorization context every request carries.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Realm hostname, e.g. `demo.quickbase.com`.
    pub realm_hostname: String,
    /// Caller-identifying user agent.
    pub user_agent: String,
    /// Full authorization header value, e.g. `QB-USER-TOKEN b12345_abc_0_...`.
    pub authorization: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("realm_hostname", &self.realm_hostname)
            .field("user_agent", &self.user_agent)
            .field("authorization", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    fn headers(&self) -> LoaderResult<HeaderMap> {
        let value = |name: &str, v: &str| {
            HeaderValue::from_str(v).map_err(|e| LoaderError::Profile {
                message: format!("invalid {name} header value: {e}"),
            })
        };

        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("qb-realm-hostname"),
            value(REALM_HEADER, &self.realm_hostname)?,
        );
        headers.insert(USER_AGENT, value("User-Agent", &self.user_agent)?);
        let mut auth = value("Authorization", &self.authorization)?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        Ok(headers)
    }
}

/// Optional per-request upsert parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpsertOptions {
    /// Field IDs whose values the API should echo back.
    pub fields_to_return: Vec<u64>,
    /// Field used to match existing records (the record ID field when `None`).
    pub merge_field_id: Option<u64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpsertBody<'a> {
    to: &'a str,
    data: &'a [Record],
    #[serde(skip_serializing_if = "Option::is_none")]
    fields_to_return: Option<&'a [u64]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    merge_field_id: Option<u64>,
}

/// Response metadata of one upsert request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpsertMetadata {
    pub created_record_ids: Vec<u64>,
    pub updated_record_ids: Vec<u64>,
    pub unchanged_record_ids: Vec<u64>,
    /// 1-based line in the batch -> messages for records the API rejected.
    pub line_errors: BTreeMap<String, Vec<String>>,
    pub total_number_of_records_processed: u64,
}

/// Parsed body of a successful upsert.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct UpsertResponse {
    /// Echoed records (only the requested `fields_to_return`).
    pub data: Vec<serde_json::Value>,
    pub metadata: UpsertMetadata,
}

/// One field of a remote table, as returned by the fields endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteField {
    pub id: u64,
    pub label: String,
    #[serde(rename = "fieldType")]
    pub field_type: String,
}

/// Sort direction of a query key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// One `sortBy` entry of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SortField {
    pub field_id: u64,
    pub order: SortOrder,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryBody<'a> {
    from: &'a str,
    select: &'a [u64],
    #[serde(skip_serializing_if = "Option::is_none")]
    sort_by: Option<&'a [SortField]>,
    options: QueryPaging,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryPaging {
    skip: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    top: Option<u64>,
    compare_with_app_local_time: bool,
}

/// A field described in a query response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QueryField {
    pub id: u64,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryMetadata {
    pub total_records: u64,
    pub num_records: u64,
    pub num_fields: u64,
    pub skip: u64,
}

/// Parsed body of a successful query.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct QueryResponse {
    /// One object per record: field ID -> `{"value": V}`.
    pub data: Vec<serde_json::Map<String, serde_json::Value>>,
    /// The selected fields, in column order.
    pub fields: Vec<QueryField>,
    pub metadata: QueryMetadata,
}

/// Async client for the records and fields endpoints.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct RecordsClient {
    client: reqwest::Client,
    base_url: String,
}

impl RecordsClient {
    /// Client against [`DEFAULT_BASE_URL`].
    pub fn new(credentials: &Credentials) -> LoaderResult<Self> {
        Self::with_base_url(credentials, DEFAULT_BASE_URL)
    }

    /// Client against another base URL (a proxy or a local test server).
    pub fn with_base_url(credentials: &Credentials, base_url: impl Into<String>) -> LoaderResult<Self> {
        let client = reqwest::Client::builder()
            .default_headers(credentials.headers()?)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Insert or update one batch of records in `table_id`.
    ///
    /// A non-success status is returned as [`LoaderError::Transport`]; nothing is retried.
    pub async fn upsert(
        &self,
        table_id: &str,
        records: &[Record],
        options: &UpsertOptions,
    ) -> LoaderResult<UpsertResponse> {
        let url = format!("{}/v1/records", self.base_url);
        let body = UpsertBody {
            to: table_id,
            data: records,
            fields_to_return: (!options.fields_to_return.is_empty())
                .then_some(options.fields_to_return.as_slice()),
            merge_field_id: options.merge_field_id,
        };

        tracing::debug!(%url, table_id, records = records.len(), "posting records");

        let response = self.client.post(&url).json(&body).send().await?;
        Self::handle_response(response).await
    }

    /// Query records of `table_id`.
    ///
    /// `select` lists field IDs in column order. `top = None` asks for every record after
    /// `skip`.
    pub async fn query(
        &self,
        table_id: &str,
        select: &[u64],
        sort: &[SortField],
        skip: u64,
        top: Option<u64>,
    ) -> LoaderResult<QueryResponse> {
        let url = format!("{}/v1/records/query", self.base_url);
        let body = QueryBody {
            from: table_id,
            select,
            sort_by: (!sort.is_empty()).then_some(sort),
            options: QueryPaging {
                skip,
                top,
                compare_with_app_local_time: false,
            },
        };

        tracing::debug!(%url, table_id, fields = select.len(), skip, ?top, "querying records");

        let response = self.client.post(&url).json(&body).send().await?;
        Self::handle_response(response).await
    }

    /// Fetch the field list of `table_id`.
    pub async fn fetch_fields(&self, table_id: &str) -> LoaderResult<Vec<RemoteField>> {
        let url = format!("{}/v1/fields", self.base_url);

        tracing::debug!(%url, table_id, "fetching fields");

        let response = self
            .client
            .get(&url)
            .query(&[("tableId", table_id), ("includeFieldPerms", "false")])
            .send()
            .await?;
        Self::handle_response(response).await
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> LoaderResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LoaderError::Transport {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}
