use std::fmt;
use std::str::FromStr;

use super::{PackResult, PackedValue};
use crate::error::PackError;
use crate::types::Value;

/// Unit of a raw duration column. The wire value is always milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationUnit {
    Seconds,
    Milliseconds,
}

impl FromStr for DurationUnit {
    type Err = PackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "seconds" => Ok(Self::Seconds),
            "milliseconds" => Ok(Self::Milliseconds),
            other => Err(PackError::InvalidUnit {
                unit: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for DurationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Seconds => "seconds",
            Self::Milliseconds => "milliseconds",
        })
    }
}

/// Pack a duration, converting `unit` (`"seconds"` or `"milliseconds"`) to milliseconds.
///
/// Floats are truncated toward zero before conversion; strings must hold an integer.
pub fn pack_duration(raw: &Value, unit: &str) -> PackResult {
    if raw.is_null() {
        return Ok(None);
    }
    pack_duration_in(raw, unit.parse()?)
}

pub(super) fn pack_duration_in(raw: &Value, unit: DurationUnit) -> PackResult {
    if raw.is_null() {
        return Ok(None);
    }

    let n = coerce_integer(raw)?;
    let millis = match unit {
        DurationUnit::Seconds => n
            .checked_mul(1000)
            .ok_or(PackError::DurationOverflow { raw: n })?,
        DurationUnit::Milliseconds => n,
    };
    Ok(Some(PackedValue::new(millis)))
}

fn coerce_integer(raw: &Value) -> Result<i64, PackError> {
    match raw {
        Value::Int64(v) => Ok(*v),
        Value::Float64(v) => {
            let t = v.trunc();
            if t.is_finite() && t >= i64::MIN as f64 && t <= i64::MAX as f64 {
                Ok(t as i64)
            } else {
                Err(PackError::NotAnInteger {
                    raw: v.to_string(),
                    message: "float out of range".to_string(),
                })
            }
        }
        Value::Utf8(s) => s.trim().parse::<i64>().map_err(|e| PackError::NotAnInteger {
            raw: s.clone(),
            message: e.to_string(),
        }),
        other => Err(PackError::WrongType {
            expected: "duration",
            found: other.type_name(),
            raw: other.to_string(),
        }),
    }
}
