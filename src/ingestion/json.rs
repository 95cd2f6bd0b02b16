//! JSON ingestion implementation.
//!
//! Supported inputs:
//! - A JSON array of objects: `[{"a":1}, {"a":2}]`
//! - A single JSON object (one row)
//! - Newline-delimited JSON (NDJSON): `{"a":1}\n{"a":2}\n`
//!
//! Nested fields are supported using dot paths in schema field names (e.g. `user.name`).
//! A field that is missing from an object is read as null.

use std::fs;
use std::path::Path;

use crate::error::{LoaderError, LoaderResult};
use crate::types::{DataSet, DataType, Schema, Value};

use super::csv::{parse_iso_date, parse_iso_datetime};

/// Ingest JSON into an in-memory `DataSet`.
pub fn ingest_json_from_path(path: impl AsRef<Path>, schema: &Schema) -> LoaderResult<DataSet> {
    let text = fs::read_to_string(path)?;
    ingest_json_from_str(&text, schema)
}

/// Ingest JSON from an in-memory string into a [`DataSet`].
pub fn ingest_json_from_str(input: &str, schema: &Schema) -> LoaderResult<DataSet> {
    let values = parse_objects(input)?;
    ingest_json_values(&values, schema)
}

/// Parse an array, a single object, or NDJSON into a list of JSON values.
fn parse_objects(input: &str) -> LoaderResult<Vec<serde_json::Value>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(LoaderError::SchemaMismatch {
            message: "json input is empty".to_string(),
        });
    }

    // First try parsing as a single JSON value (array or object).
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(trimmed) {
        return match v {
            serde_json::Value::Array(items) => Ok(items),
            serde_json::Value::Object(_) => Ok(vec![v]),
            _ => Err(LoaderError::SchemaMismatch {
                message: "json must be an object, an array of objects, or NDJSON".to_string(),
            }),
        };
    }

    // Fall back to NDJSON.
    let mut values = Vec::new();
    for (i, line) in trimmed.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let v = serde_json::from_str::<serde_json::Value>(line).map_err(|e| {
            LoaderError::SchemaMismatch {
                message: format!("invalid ndjson at line {}: {}", i + 1, e),
            }
        })?;
        values.push(v);
    }
    Ok(values)
}

/// Top-level keys of every object in a JSON/NDJSON file, in first-seen order.
pub fn read_json_keys(path: impl AsRef<Path>) -> LoaderResult<Vec<String>> {
    let text = fs::read_to_string(path)?;
    let objects = parse_objects(&text)?;
    let mut keys: Vec<String> = Vec::new();
    for obj in objects.iter().filter_map(serde_json::Value::as_object) {
        for k in obj.keys() {
            if !keys.iter().any(|seen| seen == k) {
                keys.push(k.clone());
            }
        }
    }
    Ok(keys)
}

fn ingest_json_values(values: &[serde_json::Value], schema: &Schema) -> LoaderResult<DataSet> {
    let mut rows: Vec<Vec<Value>> = Vec::with_capacity(values.len());

    for (idx0, v) in values.iter().enumerate() {
        let row_num = idx0 + 1;
        let obj = v.as_object().ok_or_else(|| LoaderError::SchemaMismatch {
            message: format!("row {row_num} is not a json object"),
        })?;

        let mut row: Vec<Value> = Vec::with_capacity(schema.fields.len());
        for field in &schema.fields {
            let value = match get_by_dot_path(obj, &field.name) {
                Some(jv) => convert_json_value(row_num, &field.name, field.data_type, jv)?,
                None => Value::Null,
            };
            row.push(value);
        }
        rows.push(row);
    }

    Ok(DataSet::new(schema.clone(), rows))
}

fn get_by_dot_path<'a>(
    root: &'a serde_json::Map<String, serde_json::Value>,
    path: &str,
) -> Option<&'a serde_json::Value> {
    // Exact key wins, so column names containing dots still resolve.
    if let Some(v) = root.get(path) {
        return Some(v);
    }

    let mut segments = path.split('.');
    let mut current = root.get(segments.next()?)?;
    for segment in segments {
        match current {
            serde_json::Value::Object(map) => current = map.get(segment)?,
            _ => return None,
        }
    }
    Some(current)
}

fn convert_json_value(
    row: usize,
    column: &str,
    data_type: DataType,
    v: &serde_json::Value,
) -> LoaderResult<Value> {
    if v.is_null() {
        return Ok(Value::Null);
    }

    let parse_err = |message: &str| LoaderError::ParseError {
        row,
        column: column.to_string(),
        raw: v.to_string(),
        message: message.to_string(),
    };

    match data_type {
        DataType::Utf8 => v
            .as_str()
            .map(|s| Value::Utf8(s.to_string()))
            .ok_or_else(|| parse_err("expected string")),
        DataType::Bool => v.as_bool().map(Value::Bool).ok_or_else(|| parse_err("expected bool")),
        DataType::Int64 => {
            if let Some(n) = v.as_i64() {
                Ok(Value::Int64(n))
            } else if let Some(n) = v.as_u64() {
                i64::try_from(n)
                    .map(Value::Int64)
                    .map_err(|_| parse_err("u64 out of range for i64"))
            } else {
                Err(parse_err("expected integer number"))
            }
        }
        DataType::Float64 => v.as_f64().map(Value::Float64).ok_or_else(|| parse_err("expected number")),
        DataType::Numeric => {
            if let Some(n) = v.as_i64() {
                Ok(Value::Int64(n))
            } else {
                v.as_f64().map(Value::Float64).ok_or_else(|| parse_err("expected number"))
            }
        }
        DataType::Date => {
            let s = v.as_str().ok_or_else(|| parse_err("expected date string"))?;
            parse_iso_date(s).map(Value::Date).map_err(|m| parse_err(&m))
        }
        DataType::DateTime => {
            let s = v.as_str().ok_or_else(|| parse_err("expected datetime string"))?;
            parse_iso_datetime(s).map(Value::DateTime).map_err(|m| parse_err(&m))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Field;

    #[test]
    fn nested_paths_and_missing_keys() {
        let schema = Schema::new(vec![
            Field::new("id", DataType::Numeric),
            Field::new("user.name", DataType::Utf8),
        ]);
        let ds = ingest_json_from_str(
            r#"[{"id": 1, "user": {"name": "Ada"}}, {"id": 2.5}]"#,
            &schema,
        )
        .unwrap();
        assert_eq!(ds.rows[0], vec![Value::Int64(1), Value::Utf8("Ada".to_string())]);
        assert_eq!(ds.rows[1], vec![Value::Float64(2.5), Value::Null]);
    }

    #[test]
    fn single_object_is_one_row() {
        let schema = Schema::new(vec![Field::new("a", DataType::Bool)]);
        let ds = ingest_json_from_str(r#"{"a": true}"#, &schema).unwrap();
        assert_eq!(ds.row_count(), 1);
    }

    #[test]
    fn scalar_top_level_is_rejected() {
        let schema = Schema::new(vec![Field::new("a", DataType::Bool)]);
        assert!(matches!(
            ingest_json_from_str("42", &schema),
            Err(LoaderError::SchemaMismatch { .. })
        ));
    }
}
