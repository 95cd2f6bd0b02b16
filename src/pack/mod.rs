//! Value packers: one pure function per semantic column type.
//!
//! Each packer converts a single raw [`Value`] into either the absent marker (`None`) or a
//! [`PackedValue`], whose wire shape is exactly `{"value": V}`. Null inputs (including a NaN
//! float) are always absent, whatever the other arguments are.
//!
//! | packer            | accepts                              | `V`                        |
//! | ----------------- | ------------------------------------ | -------------------------- |
//! | [`pack_default`]  | any scalar                           | the scalar, unchanged      |
//! | [`pack_duration`] | integer, float (truncated), int text | integer milliseconds       |
//! | [`pack_date`]     | date, datetime, string + format      | `"YYYY-MM-DD"`             |
//! | [`pack_datetime`] | date, datetime, string + format      | `"YYYY-MM-DDTHH:MM:SSZ"`   |
//! | [`pack_phone`]    | string + `#` template                | `"(AAA) BBB-CCCC[ xEXT]"`  |
//!
//! [`Packer`] pairs a packer with its bound per-column arguments, which is how the transform
//! engine stores a column plan.

mod duration;
mod phone;
mod temporal;

use serde::{Deserialize, Serialize};

use crate::error::PackError;
use crate::types::Value;

pub use duration::{pack_duration, DurationUnit};
pub use phone::{pack_phone, DEFAULT_PHONE_TEMPLATE};
pub use temporal::{pack_date, pack_datetime, DATETIME_WIRE_FORMAT, DATE_WIRE_FORMAT};

pub(crate) use phone::digit_slots;
pub(crate) use temporal::check_format;

/// Result of a single packer call: `Ok(None)` is the absent marker.
pub type PackResult = Result<Option<PackedValue>, PackError>;

/// A wire-ready packed value, serialized as `{"value": V}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackedValue {
    /// The inner, type-specific value.
    pub value: serde_json::Value,
}

impl PackedValue {
    /// Wrap an inner value.
    pub fn new(value: impl Into<serde_json::Value>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Unwrap the inner value.
    pub fn into_inner(self) -> serde_json::Value {
        self.value
    }
}

/// Pass any non-null scalar through unchanged.
///
/// Used for numeric, checkbox, text, email and every other type that needs no reformatting.
/// Structured dates are rendered with the date/datetime wire formats.
pub fn pack_default(raw: &Value) -> PackResult {
    if raw.is_null() {
        return Ok(None);
    }
    let inner = match raw {
        Value::Null => return Ok(None),
        Value::Int64(v) => serde_json::Value::from(*v),
        Value::Float64(v) => serde_json::Value::from(*v),
        Value::Bool(v) => serde_json::Value::from(*v),
        Value::Utf8(s) => serde_json::Value::from(s.as_str()),
        Value::Date(d) => serde_json::Value::from(d.format(DATE_WIRE_FORMAT).to_string()),
        Value::DateTime(dt) => serde_json::Value::from(dt.format(DATETIME_WIRE_FORMAT).to_string()),
    };
    Ok(Some(PackedValue::new(inner)))
}

/// A packer with its per-column arguments already bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packer {
    /// [`pack_default`].
    Default,
    /// [`pack_duration`] with a validated unit.
    Duration(DurationUnit),
    /// [`pack_date`] with a strftime-style parse format.
    Date(String),
    /// [`pack_datetime`] with a strftime-style parse format.
    DateTime(String),
    /// [`pack_phone`] with a `#` digit template.
    Phone(String),
}

impl Packer {
    /// Apply the bound packer to one raw value.
    pub fn pack(&self, raw: &Value) -> PackResult {
        match self {
            Packer::Default => pack_default(raw),
            Packer::Duration(unit) => duration::pack_duration_in(raw, *unit),
            Packer::Date(format) => pack_date(raw, format),
            Packer::DateTime(format) => pack_datetime(raw, format),
            Packer::Phone(template) => pack_phone(raw, template),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_passes_scalars_through() {
        assert_eq!(
            pack_default(&Value::Utf8("This is a value".to_string())).unwrap(),
            Some(PackedValue::new("This is a value"))
        );
        assert_eq!(
            pack_default(&Value::Int64(1)).unwrap(),
            Some(PackedValue::new(1))
        );
        assert_eq!(
            pack_default(&Value::Bool(false)).unwrap(),
            Some(PackedValue::new(false))
        );
    }

    #[test]
    fn default_null_and_nan_are_absent() {
        assert_eq!(pack_default(&Value::Null).unwrap(), None);
        assert_eq!(pack_default(&Value::Float64(f64::NAN)).unwrap(), None);
    }

    #[test]
    fn packed_value_serializes_as_single_key_wrapper() {
        let packed = PackedValue::new(5000);
        assert_eq!(serde_json::to_value(&packed).unwrap(), json!({"value": 5000}));
    }

    #[test]
    fn every_packer_returns_absent_for_null() {
        let packers = [
            Packer::Default,
            Packer::Duration(DurationUnit::Seconds),
            Packer::Date("%m.%d.%Y".to_string()),
            Packer::DateTime("unused".to_string()),
            Packer::Phone(DEFAULT_PHONE_TEMPLATE.to_string()),
        ];
        for packer in &packers {
            assert_eq!(packer.pack(&Value::Null).unwrap(), None, "{packer:?}");
        }
    }
}
