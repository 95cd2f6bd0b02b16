//! Core data model for raw tabular input.
//!
//! Every source (CSV, JSON, Parquet, Polars) is ingested into an in-memory [`DataSet`], using a
//! [`Schema`] (a list of typed [`Field`]s). The dataset is read-only to the packing pipeline.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

/// Logical data type for a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point number.
    Float64,
    /// Integer when the input is integral, float otherwise.
    Numeric,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    Utf8,
    /// Calendar date without time zone.
    Date,
    /// Date and time without time zone.
    DateTime,
}

/// A single named, typed field in a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field/column name.
    pub name: String,
    /// Field data type.
    pub data_type: DataType,
}

impl Field {
    /// Create a new field.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// A list of fields describing the expected shape of incoming data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// Ordered list of fields.
    pub fields: Vec<Field>,
}

impl Schema {
    /// Create a new schema from fields.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Iterate field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns the index of a field by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// A single raw scalar in a [`DataSet`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 string.
    Utf8(String),
    /// Structured date.
    Date(NaiveDate),
    /// Structured date and time (naive, no zone).
    DateTime(NaiveDateTime),
}

impl Value {
    /// True for [`Value::Null`] and for a NaN float, both of which pack to the absent marker.
    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Float64(v) => v.is_nan(),
            _ => false,
        }
    }

    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int64(_) => "int64",
            Value::Float64(_) => "float64",
            Value::Bool(_) => "bool",
            Value::Utf8(_) => "utf8",
            Value::Date(_) => "date",
            Value::DateTime(_) => "datetime",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Utf8(s) => write!(f, "'{s}'"),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S%.f")),
        }
    }
}

/// In-memory tabular dataset.
///
/// Rows are stored as `Vec<Vec<Value>>` in the same order as the [`Schema`] fields. Columns are
/// aligned by row position.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSet {
    /// Schema describing row shape.
    pub schema: Schema,
    /// Row-major value storage.
    pub rows: Vec<Vec<Value>>,
}

impl DataSet {
    /// Create a dataset from schema and rows.
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        Self { schema, rows }
    }

    /// Build a dataset from named columns of equal length.
    ///
    /// The field type of each column is inferred from its first non-null value (`Utf8` if the
    /// column is entirely null).
    ///
    /// # Panics
    ///
    /// Panics if the columns have different lengths.
    pub fn from_columns(columns: Vec<(String, Vec<Value>)>) -> Self {
        let row_count = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
        for (name, values) in &columns {
            assert!(
                values.len() == row_count,
                "column '{name}' has {} values, expected {row_count}",
                values.len()
            );
        }

        let fields = columns
            .iter()
            .map(|(name, values)| Field::new(name.clone(), infer_data_type(values)))
            .collect();

        let mut rows: Vec<Vec<Value>> = (0..row_count)
            .map(|_| Vec::with_capacity(columns.len()))
            .collect();
        for (_, values) in columns {
            for (row, v) in rows.iter_mut().zip(values) {
                row.push(v);
            }
        }

        Self::new(Schema::new(fields), rows)
    }

    /// Number of rows in the dataset.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns (schema fields).
    pub fn column_count(&self) -> usize {
        self.schema.fields.len()
    }

    /// Iterate the values of column `idx` in row order.
    ///
    /// Rows shorter than the schema yield [`Value::Null`].
    pub fn column(&self, idx: usize) -> impl Iterator<Item = &Value> + '_ {
        static NULL: Value = Value::Null;
        self.rows.iter().map(move |row| row.get(idx).unwrap_or(&NULL))
    }

    /// Iterate the values of the named column, if present.
    pub fn column_by_name(&self, name: &str) -> Option<impl Iterator<Item = &Value> + '_> {
        self.schema.index_of(name).map(|idx| self.column(idx))
    }
}

fn infer_data_type(values: &[Value]) -> DataType {
    values
        .iter()
        .find_map(|v| match v {
            Value::Null => None,
            Value::Int64(_) => Some(DataType::Int64),
            Value::Float64(_) => Some(DataType::Float64),
            Value::Bool(_) => Some(DataType::Bool),
            Value::Utf8(_) => Some(DataType::Utf8),
            Value::Date(_) => Some(DataType::Date),
            Value::DateTime(_) => Some(DataType::DateTime),
        })
        .unwrap_or(DataType::Utf8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_dataset() -> DataSet {
        DataSet::from_columns(vec![
            ("nums".to_string(), vec![Value::Int64(1), Value::Null]),
            ("durr".to_string(), vec![Value::Int64(5), Value::Int64(10)]),
        ])
    }

    #[test]
    fn from_columns_builds_row_major_storage() {
        let ds = sample_dataset();
        assert_eq!(ds.row_count(), 2);
        assert_eq!(ds.column_count(), 2);
        assert_eq!(ds.rows[0], vec![Value::Int64(1), Value::Int64(5)]);
        assert_eq!(ds.rows[1], vec![Value::Null, Value::Int64(10)]);
        assert_eq!(ds.schema.fields[0], Field::new("nums", DataType::Int64));
    }

    #[test]
    fn column_iterates_in_row_order() {
        let ds = sample_dataset();
        let durr: Vec<&Value> = ds.column_by_name("durr").unwrap().collect();
        assert_eq!(durr, vec![&Value::Int64(5), &Value::Int64(10)]);
        assert!(ds.column_by_name("missing").is_none());
    }

    #[test]
    fn nan_counts_as_null() {
        assert!(Value::Float64(f64::NAN).is_null());
        assert!(Value::Null.is_null());
        assert!(!Value::Utf8(String::new()).is_null());
    }

    #[test]
    fn all_null_column_infers_utf8() {
        let ds = DataSet::from_columns(vec![("x".to_string(), vec![Value::Null])]);
        assert_eq!(ds.schema.fields[0].data_type, DataType::Utf8);
    }

    #[test]
    #[should_panic(expected = "has 1 values, expected 2")]
    fn from_columns_panics_on_ragged_columns() {
        let _ = DataSet::from_columns(vec![
            ("a".to_string(), vec![Value::Null, Value::Null]),
            ("b".to_string(), vec![Value::Null]),
        ]);
    }
}
