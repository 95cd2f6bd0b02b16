//! Polars bridge: convert an in-memory [`DataFrame`] into a [`DataSet`].
//!
//! Lets callers that already hold a Polars frame feed it to the packing pipeline without writing
//! it to disk first.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::{AnyValue, DataFrame, DataType as PolarsType, TimeUnit};

use crate::error::{LoaderError, LoaderResult};
use crate::types::{DataSet, DataType, Field, Schema, Value};

/// Days from 0001-01-01 (CE day 1) to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Convert every column of `df` into a [`DataSet`] column of the matching [`DataType`].
///
/// Supported dtypes: booleans, integers, floats, strings, `Date` and `Datetime`. Any other dtype
/// is a [`LoaderError::SchemaMismatch`].
pub fn dataset_from_frame(df: &DataFrame) -> LoaderResult<DataSet> {
    let columns = df.columns();

    let fields = columns
        .iter()
        .map(|c| {
            let name = c.name().to_string();
            map_dtype(c.dtype())
                .map(|dt| Field::new(name.clone(), dt))
                .ok_or_else(|| LoaderError::SchemaMismatch {
                    message: format!("column '{name}' has unsupported dtype {}", c.dtype()),
                })
        })
        .collect::<LoaderResult<Vec<_>>>()?;

    let mut rows: Vec<Vec<Value>> = (0..df.height())
        .map(|_| Vec::with_capacity(columns.len()))
        .collect();
    for column in columns {
        for (idx, row) in rows.iter_mut().enumerate() {
            let av = column.get(idx)?;
            row.push(convert_any_value(idx + 1, column.name().as_str(), av)?);
        }
    }

    Ok(DataSet::new(Schema::new(fields), rows))
}

fn map_dtype(dtype: &PolarsType) -> Option<DataType> {
    match dtype {
        PolarsType::Boolean => Some(DataType::Bool),
        PolarsType::String => Some(DataType::Utf8),
        PolarsType::Int8
        | PolarsType::Int16
        | PolarsType::Int32
        | PolarsType::Int64
        | PolarsType::UInt8
        | PolarsType::UInt16
        | PolarsType::UInt32
        | PolarsType::UInt64 => Some(DataType::Int64),
        PolarsType::Float32 | PolarsType::Float64 => Some(DataType::Float64),
        PolarsType::Date => Some(DataType::Date),
        PolarsType::Datetime(_, _) => Some(DataType::DateTime),
        // All-null columns (e.g. read from an empty JSON field) carry no type information.
        PolarsType::Null => Some(DataType::Utf8),
        _ => None,
    }
}

fn convert_any_value(row: usize, column: &str, av: AnyValue<'_>) -> LoaderResult<Value> {
    let out_of_range = |raw: String| LoaderError::ParseError {
        row,
        column: column.to_string(),
        raw,
        message: "value out of range".to_string(),
    };

    Ok(match av {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(b),
        AnyValue::String(s) => Value::Utf8(s.to_string()),
        AnyValue::StringOwned(s) => Value::Utf8(s.to_string()),
        AnyValue::Int8(v) => Value::Int64(i64::from(v)),
        AnyValue::Int16(v) => Value::Int64(i64::from(v)),
        AnyValue::Int32(v) => Value::Int64(i64::from(v)),
        AnyValue::Int64(v) => Value::Int64(v),
        AnyValue::UInt8(v) => Value::Int64(i64::from(v)),
        AnyValue::UInt16(v) => Value::Int64(i64::from(v)),
        AnyValue::UInt32(v) => Value::Int64(i64::from(v)),
        AnyValue::UInt64(v) => {
            Value::Int64(i64::try_from(v).map_err(|_| out_of_range(v.to_string()))?)
        }
        AnyValue::Float32(v) => Value::Float64(f64::from(v)),
        AnyValue::Float64(v) => Value::Float64(v),
        AnyValue::Date(days) => days
            .checked_add(UNIX_EPOCH_DAYS_FROM_CE)
            .and_then(NaiveDate::from_num_days_from_ce_opt)
            .map(Value::Date)
            .ok_or_else(|| out_of_range(days.to_string()))?,
        AnyValue::Datetime(v, unit, _) | AnyValue::DatetimeOwned(v, unit, _) => {
            Value::DateTime(datetime_from_epoch(v, unit).ok_or_else(|| out_of_range(v.to_string()))?)
        }
        other => {
            return Err(LoaderError::ParseError {
                row,
                column: column.to_string(),
                raw: other.to_string(),
                message: format!("unsupported value of dtype {}", other.dtype()),
            });
        }
    })
}

fn datetime_from_epoch(v: i64, unit: TimeUnit) -> Option<NaiveDateTime> {
    let dt = match unit {
        TimeUnit::Nanoseconds => Some(DateTime::from_timestamp_nanos(v)),
        TimeUnit::Microseconds => DateTime::from_timestamp_micros(v),
        TimeUnit::Milliseconds => DateTime::from_timestamp_millis(v),
    };
    dt.map(|d| d.naive_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    #[test]
    fn converts_scalar_columns() {
        let df = df!(
            "nums" => [Some(1i64), None],
            "ratio" => [0.5f64, 1.5],
            "name" => ["a", "b"],
            "flag" => [true, false]
        )
        .unwrap();

        let ds = dataset_from_frame(&df).unwrap();
        assert_eq!(
            ds.schema.field_names().collect::<Vec<_>>(),
            vec!["nums", "ratio", "name", "flag"]
        );
        assert_eq!(ds.schema.fields[0].data_type, DataType::Int64);
        assert_eq!(
            ds.rows[0],
            vec![
                Value::Int64(1),
                Value::Float64(0.5),
                Value::Utf8("a".to_string()),
                Value::Bool(true)
            ]
        );
        assert_eq!(ds.rows[1][0], Value::Null);
    }

    #[test]
    fn epoch_units() {
        let expected = NaiveDate::from_ymd_opt(2022, 4, 5)
            .unwrap()
            .and_hms_opt(7, 30, 25)
            .unwrap();
        let ms = expected.and_utc().timestamp_millis();
        assert_eq!(datetime_from_epoch(ms, TimeUnit::Milliseconds), Some(expected));
        assert_eq!(datetime_from_epoch(ms * 1000, TimeUnit::Microseconds), Some(expected));
        assert_eq!(
            datetime_from_epoch(ms * 1_000_000, TimeUnit::Nanoseconds),
            Some(expected)
        );
    }
}
