//! CSV ingestion implementation.

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{LoaderError, LoaderResult};
use crate::types::{DataSet, DataType, Schema, Value};

/// Ingest a CSV file into an in-memory [`DataSet`].
///
/// Rules:
///
/// - CSV must have headers.
/// - Headers must contain all schema fields (order can differ).
/// - Each value is parsed according to the schema field type; empty cells are null.
pub fn ingest_csv_from_path(path: impl AsRef<Path>, schema: &Schema) -> LoaderResult<DataSet> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)?;
    ingest_csv_from_reader(&mut rdr, schema)
}

/// Ingest CSV data from an existing CSV reader.
pub fn ingest_csv_from_reader<R: std::io::Read>(
    rdr: &mut csv::Reader<R>,
    schema: &Schema,
) -> LoaderResult<DataSet> {
    let headers = rdr.headers()?.clone();

    // Map schema fields -> CSV column indexes (allows re-ordered CSV columns).
    let mut col_idxs = Vec::with_capacity(schema.fields.len());
    for field in &schema.fields {
        match headers.iter().position(|h| h == field.name) {
            Some(idx) => col_idxs.push(idx),
            None => {
                return Err(LoaderError::SchemaMismatch {
                    message: format!(
                        "missing required column '{field}'. headers={:?}",
                        headers.iter().collect::<Vec<_>>(),
                        field = field.name
                    ),
                });
            }
        }
    }

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for (row_idx0, result) in rdr.records().enumerate() {
        // Report 1-based row number for users; +1 again because header is row 1.
        let user_row = row_idx0 + 2;
        let record = result?;

        let mut row: Vec<Value> = Vec::with_capacity(schema.fields.len());
        for (field, &csv_idx) in schema.fields.iter().zip(col_idxs.iter()) {
            let raw = record.get(csv_idx).unwrap_or("");
            row.push(parse_typed_value(user_row, &field.name, field.data_type, raw)?);
        }
        rows.push(row);
    }

    Ok(DataSet::new(schema.clone(), rows))
}

/// Read only the header row of a CSV file.
pub fn read_csv_headers(path: impl AsRef<Path>) -> LoaderResult<Vec<String>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)?;
    Ok(rdr.headers()?.iter().map(str::to_string).collect())
}

/// Parse one text cell as `data_type`. Shared by CSV and the string forms of JSON values.
pub(crate) fn parse_typed_value(
    row: usize,
    column: &str,
    data_type: DataType,
    raw: &str,
) -> LoaderResult<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }

    let parse_err = |message: String| LoaderError::ParseError {
        row,
        column: column.to_owned(),
        raw: raw.to_owned(),
        message,
    };

    match data_type {
        DataType::Utf8 => Ok(Value::Utf8(trimmed.to_owned())),
        DataType::Int64 => trimmed
            .parse::<i64>()
            .map(Value::Int64)
            .map_err(|e| parse_err(e.to_string())),
        DataType::Float64 => trimmed
            .parse::<f64>()
            .map(Value::Float64)
            .map_err(|e| parse_err(e.to_string())),
        DataType::Numeric => match trimmed.parse::<i64>() {
            Ok(v) => Ok(Value::Int64(v)),
            Err(_) => trimmed
                .parse::<f64>()
                .map(Value::Float64)
                .map_err(|e| parse_err(e.to_string())),
        },
        DataType::Bool => parse_bool(trimmed).map(Value::Bool).map_err(parse_err),
        DataType::Date => parse_iso_date(trimmed).map(Value::Date).map_err(parse_err),
        DataType::DateTime => parse_iso_datetime(trimmed)
            .map(Value::DateTime)
            .map_err(parse_err),
    }
}

fn parse_bool(s: &str) -> Result<bool, String> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" => Ok(true),
        "false" | "f" | "0" | "no" | "n" => Ok(false),
        _ => Err("expected bool (true/false/1/0/yes/no)".to_string()),
    }
}

pub(crate) fn parse_iso_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD date: {e}"))
}

pub(crate) fn parse_iso_datetime(s: &str) -> Result<NaiveDateTime, String> {
    let s = s.strip_suffix('Z').unwrap_or(s);
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| "expected ISO 8601 datetime (YYYY-MM-DD[T| ]HH:MM:SS)".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_prefers_integers() {
        assert_eq!(
            parse_typed_value(2, "n", DataType::Numeric, "42").unwrap(),
            Value::Int64(42)
        );
        assert_eq!(
            parse_typed_value(2, "n", DataType::Numeric, " 4.5 ").unwrap(),
            Value::Float64(4.5)
        );
        assert!(parse_typed_value(2, "n", DataType::Numeric, "x").is_err());
    }

    #[test]
    fn empty_cells_are_null_for_every_type() {
        for dt in [DataType::Utf8, DataType::Numeric, DataType::Bool, DataType::Date] {
            assert_eq!(parse_typed_value(2, "c", dt, "  ").unwrap(), Value::Null);
        }
    }

    #[test]
    fn iso_datetimes_with_and_without_zone_marker() {
        let expected = NaiveDate::from_ymd_opt(2022, 4, 5)
            .unwrap()
            .and_hms_opt(7, 30, 25)
            .unwrap();
        assert_eq!(parse_iso_datetime("2022-04-05T07:30:25Z").unwrap(), expected);
        assert_eq!(parse_iso_datetime("2022-04-05 07:30:25").unwrap(), expected);
        assert_eq!(
            parse_iso_datetime("2022-04-05").unwrap(),
            expected.date().and_hms_opt(0, 0, 0).unwrap()
        );
        assert!(parse_iso_datetime("05/04/2022").is_err());
    }

    #[test]
    fn parse_error_reports_row_and_column() {
        let err = parse_typed_value(7, "flag", DataType::Bool, "maybe").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("row 7"), "{msg}");
        assert!(msg.contains("'flag'"), "{msg}");
    }
}
