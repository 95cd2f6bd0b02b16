//! Parquet ingestion implementation.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::{DateTime, NaiveDate};
use parquet::file::reader::{ChunkReader, FileReader};
use parquet::file::serialized_reader::SerializedFileReader;
use parquet::record::Field;

use crate::error::{LoaderError, LoaderResult};
use crate::types::{DataSet, DataType, Schema, Value};

use super::csv::{parse_iso_date, parse_iso_datetime};

/// Days from 0001-01-01 (CE day 1) to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Ingest a Parquet file into an in-memory `DataSet`.
///
/// Notes:
/// - Validates that all schema fields exist as Parquet leaf columns (by column path string)
/// - Uses the Parquet record API (`RowIter`)
/// - `DATE` and `TIMESTAMP` columns become structured [`Value::Date`] / [`Value::DateTime`]
///   values, also when the schema asks for `Utf8`, so date packers can use them directly
pub fn ingest_parquet_from_path(path: impl AsRef<Path>, schema: &Schema) -> LoaderResult<DataSet> {
    let reader = SerializedFileReader::try_from(path.as_ref())?;

    let available_columns: HashSet<String> = parquet_leaf_column_paths(&reader).into_iter().collect();
    for field in &schema.fields {
        if !available_columns.contains(field.name.as_str()) {
            return Err(LoaderError::SchemaMismatch {
                message: format!("missing required column '{}'", field.name),
            });
        }
    }

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for (idx0, row_res) in reader.into_iter().enumerate() {
        let row_num = idx0 + 1;
        let row = row_res?;

        let map: HashMap<&str, &Field> = row
            .get_column_iter()
            .map(|(name, field)| (name.as_str(), field))
            .collect();

        let mut out_row: Vec<Value> = Vec::with_capacity(schema.fields.len());
        for f in &schema.fields {
            let v = map.get(f.name.as_str()).ok_or_else(|| LoaderError::SchemaMismatch {
                message: format!("row {row_num} missing required column '{}'", f.name),
            })?;
            out_row.push(convert_parquet_field(row_num, &f.name, f.data_type, v)?);
        }
        rows.push(out_row);
    }

    Ok(DataSet::new(schema.clone(), rows))
}

/// Leaf column paths of a Parquet file, in file order.
pub fn read_parquet_columns(path: impl AsRef<Path>) -> LoaderResult<Vec<String>> {
    let reader = SerializedFileReader::try_from(path.as_ref())?;
    Ok(parquet_leaf_column_paths(&reader))
}

fn parquet_leaf_column_paths<R: ChunkReader + 'static>(reader: &SerializedFileReader<R>) -> Vec<String> {
    reader
        .metadata()
        .file_metadata()
        .schema_descr()
        .columns()
        .iter()
        .map(|c| c.path().string())
        .collect()
}

fn temporal_value(f: &Field) -> Option<Value> {
    match f {
        Field::Date(days) => days
            .checked_add(UNIX_EPOCH_DAYS_FROM_CE)
            .and_then(NaiveDate::from_num_days_from_ce_opt)
            .map(Value::Date),
        Field::TimestampMillis(ms) => {
            DateTime::from_timestamp_millis(*ms).map(|dt| Value::DateTime(dt.naive_utc()))
        }
        Field::TimestampMicros(us) => {
            DateTime::from_timestamp_micros(*us).map(|dt| Value::DateTime(dt.naive_utc()))
        }
        _ => None,
    }
}

fn convert_parquet_field(
    row: usize,
    column: &str,
    data_type: DataType,
    f: &Field,
) -> LoaderResult<Value> {
    if matches!(f, Field::Null) {
        return Ok(Value::Null);
    }

    let parse_err = |message: &str| LoaderError::ParseError {
        row,
        column: column.to_string(),
        raw: f.to_string(),
        message: message.to_string(),
    };

    match data_type {
        DataType::Utf8 => match f {
            Field::Str(s) => Ok(Value::Utf8(s.clone())),
            _ => temporal_value(f).ok_or_else(|| parse_err("expected string")),
        },
        DataType::Bool => match f {
            Field::Bool(b) => Ok(Value::Bool(*b)),
            _ => Err(parse_err("expected bool")),
        },
        DataType::Int64 => integer_value(f)
            .ok_or_else(|| parse_err("expected integer"))?
            .map_err(|_| parse_err("u64 out of range for i64")),
        DataType::Float64 => match f {
            Field::Float(v) => Ok(Value::Float64(f64::from(*v))),
            Field::Double(v) => Ok(Value::Float64(*v)),
            _ => Err(parse_err("expected number")),
        },
        DataType::Numeric => match f {
            Field::Float(v) => Ok(Value::Float64(f64::from(*v))),
            Field::Double(v) => Ok(Value::Float64(*v)),
            _ => integer_value(f)
                .ok_or_else(|| parse_err("expected number"))?
                .map_err(|_| parse_err("u64 out of range for i64")),
        },
        DataType::Date => match f {
            Field::Str(s) => parse_iso_date(s).map(Value::Date).map_err(|m| parse_err(&m)),
            Field::Date(_) => temporal_value(f).ok_or_else(|| parse_err("date out of range")),
            _ => Err(parse_err("expected date")),
        },
        DataType::DateTime => match f {
            Field::Str(s) => parse_iso_datetime(s)
                .map(Value::DateTime)
                .map_err(|m| parse_err(&m)),
            _ => temporal_value(f).ok_or_else(|| parse_err("expected timestamp")),
        },
    }
}

/// `None` when `f` is not an integer; `Some(Err)` when it does not fit in `i64`.
fn integer_value(f: &Field) -> Option<Result<Value, std::num::TryFromIntError>> {
    let v = match f {
        Field::Byte(v) => i64::from(*v),
        Field::Short(v) => i64::from(*v),
        Field::Int(v) => i64::from(*v),
        Field::Long(v) => *v,
        Field::UByte(v) => i64::from(*v),
        Field::UShort(v) => i64::from(*v),
        Field::UInt(v) => i64::from(*v),
        Field::ULong(v) => return Some(i64::try_from(*v).map(Value::Int64)),
        _ => return None,
    };
    Some(Ok(Value::Int64(v)))
}
