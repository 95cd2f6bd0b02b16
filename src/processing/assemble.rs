//! Record assembly: turns packed columns into per-row records keyed by destination field ID.

use std::collections::{BTreeMap, HashMap};

use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::debug;

use crate::error::{LoaderError, LoaderResult};
use crate::pack::PackedValue;

use super::transform::PackedDataSet;

/// Column name -> destination field ID (decimal string, e.g. `"6"`).
pub type FieldIdMap = HashMap<String, String>;

/// One row, ready to upload: field ID -> inner packed value.
///
/// Absent values are never stored. The [`Serialize`] impl produces the wire shape, where every
/// entry is wrapped as `{"value": V}`:
///
/// ```rust
/// use qbase_loader::processing::Record;
/// use serde_json::json;
///
/// let record: Record = [("6", json!(1)), ("9", json!(5000))].into_iter().collect();
/// assert_eq!(record.get("9"), Some(&json!(5000)));
/// assert_eq!(
///     serde_json::to_value(&record).unwrap(),
///     json!({"6": {"value": 1}, "9": {"value": 5000}})
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: BTreeMap<String, serde_json::Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `field_id` to `value`, replacing any previous value.
    pub fn insert(&mut self, field_id: impl Into<String>, value: serde_json::Value) {
        self.fields.insert(field_id.into(), value);
    }

    /// Inner value for `field_id`.
    pub fn get(&self, field_id: &str) -> Option<&serde_json::Value> {
        self.fields.get(field_id)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// `(field_id, inner value)` pairs ordered by field ID.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &serde_json::Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Unwrapped JSON object, `{"6": 1, ...}`.
    pub fn to_plain_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

impl<K: Into<String>> FromIterator<(K, serde_json::Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, serde_json::Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (field_id, value) in &self.fields {
            map.serialize_entry(field_id, &Wrapped(value))?;
        }
        map.end()
    }
}

struct Wrapped<'a>(&'a serde_json::Value);

impl Serialize for Wrapped<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("value", self.0)?;
        map.end()
    }
}

/// Build one [`Record`] per row of `packed`.
///
/// Every packed column must have an entry in `field_ids` and exactly `packed.row_count()`
/// values; entries for columns that are not in `packed` are ignored. Row order is preserved. A row whose values are all absent produces an
/// empty record.
pub fn assemble(packed: &PackedDataSet, field_ids: &FieldIdMap) -> LoaderResult<Vec<Record>> {
    let ids = packed
        .columns
        .iter()
        .map(|c| {
            field_ids
                .get(&c.name)
                .map(String::as_str)
                .ok_or_else(|| LoaderError::MissingFieldId {
                    column: c.name.clone(),
                })
        })
        .collect::<LoaderResult<Vec<_>>>()?;

    if let Some(ragged) = packed.columns.iter().find(|c| c.values.len() != packed.row_count()) {
        return Err(LoaderError::SchemaMismatch {
            message: format!(
                "packed column '{}' has {} values, expected {}",
                ragged.name,
                ragged.values.len(),
                packed.row_count()
            ),
        });
    }

    let records: Vec<Record> = (0..packed.row_count())
        .map(|row| {
            let mut record = Record::new();
            for (column, id) in packed.columns.iter().zip(&ids) {
                if let Some(PackedValue { value }) = &column.values[row] {
                    record.insert(*id, value.clone());
                }
            }
            record
        })
        .collect();

    debug!(
        records = records.len(),
        empty = records.iter().filter(|r| r.is_empty()).count(),
        "assembled records"
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::transform::PackedColumn;
    use serde_json::json;

    fn packed() -> PackedDataSet {
        PackedDataSet::new(
            vec![
                PackedColumn {
                    name: "nums".to_string(),
                    column_type: "numeric".to_string(),
                    values: vec![Some(PackedValue::new(1)), None],
                },
                PackedColumn {
                    name: "durr".to_string(),
                    column_type: "duration".to_string(),
                    values: vec![Some(PackedValue::new(5000)), Some(PackedValue::new(10000))],
                },
            ],
            2,
        )
    }

    fn ids(entries: &[(&str, &str)]) -> FieldIdMap {
        entries
            .iter()
            .map(|(c, id)| (c.to_string(), id.to_string()))
            .collect()
    }

    #[test]
    fn absent_values_are_omitted() {
        let records = assemble(&packed(), &ids(&[("nums", "6"), ("durr", "9")])).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].to_plain_json(), json!({"6": 1, "9": 5000}));
        assert_eq!(records[1].to_plain_json(), json!({"9": 10000}));
        assert_eq!(records[1].get("6"), None);
    }

    #[test]
    fn wire_shape_wraps_each_value() {
        let records = assemble(&packed(), &ids(&[("nums", "6"), ("durr", "9")])).unwrap();
        assert_eq!(
            serde_json::to_value(&records).unwrap(),
            json!([
                {"6": {"value": 1}, "9": {"value": 5000}},
                {"9": {"value": 10000}}
            ])
        );
    }

    #[test]
    fn missing_field_id_names_the_column() {
        let err = assemble(&packed(), &ids(&[("nums", "6")])).unwrap_err();
        assert!(matches!(err, LoaderError::MissingFieldId { ref column } if column == "durr"));
    }

    #[test]
    fn ragged_column_is_rejected() {
        let mut ds = packed();
        ds.columns[1].values.pop();
        let err = assemble(&ds, &ids(&[("nums", "6"), ("durr", "9")])).unwrap_err();
        match err {
            LoaderError::SchemaMismatch { message } => assert!(message.contains("'durr'"), "{message}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn extra_field_ids_are_ignored() {
        let records =
            assemble(&packed(), &ids(&[("nums", "6"), ("durr", "9"), ("gone", "12")])).unwrap();
        assert!(records.iter().all(|r| r.get("12").is_none()));
    }

    #[test]
    fn all_absent_row_is_an_empty_record() {
        let ds = PackedDataSet::new(
            vec![PackedColumn {
                name: "a".to_string(),
                column_type: "text".to_string(),
                values: vec![None],
            }],
            1,
        );
        let records = assemble(&ds, &ids(&[("a", "3")])).unwrap();
        assert_eq!(records, vec![Record::new()]);
        assert_eq!(serde_json::to_value(&records[0]).unwrap(), json!({}));
    }
}
