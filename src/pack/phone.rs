use super::{PackResult, PackedValue};
use crate::error::PackError;
use crate::types::Value;

/// Template for a bare ten-digit number.
pub const DEFAULT_PHONE_TEMPLATE: &str = "##########";

/// Pack a phone number as `"(AAA) BBB-CCCC"`, with `" xDDDD"` appended for digits past the tenth.
///
/// `template` is walked position-by-position alongside `raw`: characters of `raw` at `#`
/// positions are collected as digits, every other position is ignored. `raw` may not be longer
/// than `template`.
pub fn pack_phone(raw: &Value, template: &str) -> PackResult {
    let s = match raw {
        _ if raw.is_null() => return Ok(None),
        Value::Utf8(s) => s,
        other => {
            return Err(PackError::WrongType {
                expected: "phone number string",
                found: other.type_name(),
                raw: other.to_string(),
            });
        }
    };

    let mut pattern = template.chars();
    let mut digits = String::with_capacity(s.len());
    for c in s.chars() {
        match pattern.next() {
            Some('#') => digits.push(c),
            Some(_) => {}
            None => {
                return Err(PackError::PhoneTemplate {
                    raw: s.clone(),
                    template: template.to_string(),
                });
            }
        }
    }

    if digits.len() < 10 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(PackError::PhoneDigits {
            raw: s.clone(),
            template: template.to_string(),
            digits,
        });
    }

    let mut out = format!("({}) {}-{}", &digits[0..3], &digits[3..6], &digits[6..10]);
    if digits.len() > 10 {
        out.push_str(" x");
        out.push_str(&digits[10..]);
    }
    Ok(Some(PackedValue::new(out)))
}

/// Number of digit slots (`#`) in a template.
pub(crate) fn digit_slots(template: &str) -> usize {
    template.chars().filter(|&c| c == '#').count()
}
