//! Record retrieval: query a table by field label and unpack the answer into a [`DataSet`].
//!
//! This is the reverse of the upload path. Labels are resolved to field IDs through a stored
//! [`TableSchema`], each `{"value": V}` cell is unwrapped, and the columns are named by the
//! labels the API returns. `date` fields become [`Value::Date`] and `timestamp` fields become
//! [`Value::DateTime`] (UTC, naive).

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value as Json;
use tracing::info;

use crate::error::{LoaderError, LoaderResult};
use crate::pack::DATE_WIRE_FORMAT;
use crate::registry::Registry;
use crate::schema::TableSchema;
use crate::types::{DataSet, DataType, Field, Schema, Value};

use super::client::{QueryField, QueryResponse, RecordsClient, SortField, SortOrder};

/// What to read from a table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchRequest {
    /// Field labels to select, in column order.
    pub columns: Vec<String>,
    /// `(label, order)` sort keys, most significant first.
    pub sort: Vec<(String, SortOrder)>,
    /// Records to skip from the top of the result.
    pub skip: u64,
    /// Maximum records to return; `None` returns all of them.
    pub limit: Option<u64>,
}

/// Query `table` and return the records as a dataset with one column per selected field.
///
/// Unknown labels fail before any request is sent.
pub async fn fetch(client: &RecordsClient, table: &TableSchema, request: &FetchRequest) -> LoaderResult<DataSet> {
    if request.columns.is_empty() {
        return Err(LoaderError::TableSchema {
            message: "select at least one field to fetch".to_string(),
        });
    }
    let select = request
        .columns
        .iter()
        .map(|label| table.field_id(label))
        .collect::<LoaderResult<Vec<_>>>()?;
    let sort = request
        .sort
        .iter()
        .map(|(label, order)| {
            Ok(SortField {
                field_id: table.field_id(label)?,
                order: *order,
            })
        })
        .collect::<LoaderResult<Vec<_>>>()?;

    let response = client
        .query(&table.table_id, &select, &sort, request.skip, request.limit)
        .await?;
    let dataset = unpack(&response)?;

    info!(
        table_id = %table.table_id,
        records = dataset.row_count(),
        total = response.metadata.total_records,
        "fetched records"
    );
    Ok(dataset)
}

/// Turn a query response into a dataset.
///
/// Columns follow `response.fields`; a record without an entry for a field reads as null.
/// Unparseable date or timestamp text is a [`LoaderError::ParseError`] with a 1-based record
/// number.
pub fn unpack(response: &QueryResponse) -> LoaderResult<DataSet> {
    let registry = Registry::builtin();
    let fields: Vec<Field> = response
        .fields
        .iter()
        .map(|f| Field::new(f.label.clone(), column_type(f, registry)))
        .collect();
    let ids: Vec<String> = response.fields.iter().map(|f| f.id.to_string()).collect();

    let rows = response
        .data
        .iter()
        .enumerate()
        .map(|(row0, record)| {
            fields
                .iter()
                .zip(&ids)
                .map(|(field, id)| {
                    let raw = record
                        .get(id)
                        .and_then(|cell| cell.get("value"))
                        .unwrap_or(&Json::Null);
                    unpack_value(raw, field.data_type).map_err(|message| LoaderError::ParseError {
                        row: row0 + 1,
                        column: field.name.clone(),
                        raw: raw.to_string(),
                        message,
                    })
                })
                .collect::<LoaderResult<Vec<_>>>()
        })
        .collect::<LoaderResult<Vec<_>>>()?;

    Ok(DataSet::new(Schema::new(fields), rows))
}

fn column_type(field: &QueryField, registry: &Registry) -> DataType {
    match registry.canonical_name(&field.field_type) {
        Some("date") => DataType::Date,
        Some("datetime") => DataType::DateTime,
        Some(name) => registry.get(name).map_or(DataType::Utf8, |info| info.ingest_as),
        None => DataType::Utf8,
    }
}

fn unpack_value(raw: &Json, data_type: DataType) -> Result<Value, String> {
    let temporal = matches!(data_type, DataType::Date | DataType::DateTime);
    Ok(match raw {
        Json::Null => Value::Null,
        Json::String(s) if temporal && s.is_empty() => Value::Null,
        Json::String(s) if data_type == DataType::Date => {
            Value::Date(NaiveDate::parse_from_str(s, DATE_WIRE_FORMAT).map_err(|e| e.to_string())?)
        }
        Json::String(s) if data_type == DataType::DateTime => Value::DateTime(parse_timestamp(s)?),
        Json::String(s) => Value::Utf8(s.clone()),
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Value::Int64(i),
            (None, Some(f)) => Value::Float64(f),
            (None, None) => Value::Utf8(n.to_string()),
        },
        // Users, multi-selects and addresses come back as structured values.
        other => Value::Utf8(other.to_string()),
    })
}

fn parse_timestamp(s: &str) -> Result<NaiveDateTime, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.naive_utc())
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .map_err(|e| e.to_string())
}
