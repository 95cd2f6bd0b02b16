use chrono::format::{parse, Fixed, Item, Numeric, ParseError, ParseErrorKind, Parsed, StrftimeItems};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use super::{PackResult, PackedValue};
use crate::error::PackError;
use crate::types::Value;

/// Wire format for date fields.
pub const DATE_WIRE_FORMAT: &str = "%Y-%m-%d";

/// Wire format for datetime fields. Fractional seconds are dropped and `Z` is literal.
pub const DATETIME_WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Pack a date as `"YYYY-MM-DD"`.
///
/// Structured dates/datetimes are used directly; strings are parsed with `format`.
pub fn pack_date(raw: &Value, format: &str) -> PackResult {
    let date = match raw {
        _ if raw.is_null() => return Ok(None),
        Value::Date(d) => *d,
        Value::DateTime(dt) => dt.date(),
        Value::Utf8(s) => parse_naive(s, format)?.date(),
        other => return Err(wrong_type("date", other)),
    };
    Ok(Some(PackedValue::new(date.format(DATE_WIRE_FORMAT).to_string())))
}

/// Pack a datetime as `"YYYY-MM-DDTHH:MM:SSZ"`.
///
/// No timezone conversion happens: the naive value is rendered as-is with a literal `Z`.
pub fn pack_datetime(raw: &Value, format: &str) -> PackResult {
    let dt = match raw {
        _ if raw.is_null() => return Ok(None),
        Value::DateTime(dt) => *dt,
        Value::Date(d) => d.and_time(NaiveTime::MIN),
        Value::Utf8(s) => parse_naive(s, format)?,
        other => return Err(wrong_type("datetime", other)),
    };
    Ok(Some(PackedValue::new(
        dt.format(DATETIME_WIRE_FORMAT).to_string(),
    )))
}

/// Returns an error message if `format` contains an unrecognised strftime directive.
pub(crate) fn check_format(format: &str) -> Result<(), String> {
    if format.is_empty() {
        return Err("format is empty".to_string());
    }
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(format!("'{format}' is not a valid strftime format"));
    }
    Ok(())
}

/// strptime-style parse into a naive datetime. Missing time fields default to zero.
fn parse_naive(raw: &str, format: &str) -> Result<NaiveDateTime, PackError> {
    let err = |message: String| PackError::DateParse {
        raw: raw.to_string(),
        format: format.to_string(),
        message,
    };

    let parsed = parse_fields(raw, format).map_err(|e| err(e.to_string()))?;

    let date: NaiveDate = parsed.to_naive_date().map_err(|e| err(e.to_string()))?;
    let time = match parsed.to_naive_time() {
        Ok(t) => t,
        Err(e) if e.kind() == ParseErrorKind::NotEnough => {
            // Hour without minute/second (e.g. "%Y-%m-%d %H"): fill the rest with zero.
            let mut filled = parsed.clone();
            let _ = filled.set_minute(0);
            let _ = filled.set_second(0);
            match filled.to_naive_time() {
                Ok(t) => t,
                Err(e) if e.kind() == ParseErrorKind::NotEnough => NaiveTime::MIN,
                Err(e) => return Err(err(e.to_string())),
            }
        }
        Err(e) => return Err(err(e.to_string())),
    };
    Ok(date.and_time(time))
}

/// Parse `raw` into fields. A 24-hour `%H` wins over `%p`: when both are present and disagree,
/// the meridiem text is still matched but its value is ignored.
fn parse_fields(raw: &str, format: &str) -> Result<Parsed, ParseError> {
    let mut parsed = Parsed::new();
    match parse(&mut parsed, raw, StrftimeItems::new(format)) {
        Ok(()) => Ok(parsed),
        Err(e) if e.kind() == ParseErrorKind::Impossible && hour_with_meridiem(format) => {
            for meridiem in ["AM", "PM", "am", "pm"] {
                let items = StrftimeItems::new(format).map(|item| match item {
                    Item::Fixed(Fixed::UpperAmPm | Fixed::LowerAmPm) => Item::Literal(meridiem),
                    other => other,
                });
                let mut retry = Parsed::new();
                if parse(&mut retry, raw, items).is_ok() {
                    return Ok(retry);
                }
            }
            Err(e)
        }
        Err(e) => Err(e),
    }
}

fn hour_with_meridiem(format: &str) -> bool {
    let items: Vec<Item<'_>> = StrftimeItems::new(format).collect();
    items.iter().any(|i| matches!(i, Item::Numeric(Numeric::Hour, _)))
        && items
            .iter()
            .any(|i| matches!(i, Item::Fixed(Fixed::UpperAmPm | Fixed::LowerAmPm)))
}

fn wrong_type(expected: &'static str, raw: &Value) -> PackError {
    PackError::WrongType {
        expected,
        found: raw.type_name(),
        raw: raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packed(s: &str) -> Option<PackedValue> {
        Some(PackedValue::new(s))
    }

    #[test]
    fn date_from_string_with_format() {
        assert_eq!(
            pack_date(&Value::Utf8("11.22.1972".to_string()), "%m.%d.%Y").unwrap(),
            packed("1972-11-22")
        );
        assert_eq!(
            pack_date(&Value::Utf8("January 4, 1998".to_string()), "%B %d, %Y").unwrap(),
            packed("1998-01-04")
        );
    }

    #[test]
    fn date_from_structured_value_is_zero_padded() {
        let d = NaiveDate::from_ymd_opt(1754, 5, 10).unwrap();
        assert_eq!(pack_date(&Value::Date(d), "%m.%d.%Y").unwrap(), packed("1754-05-10"));

        let dt = NaiveDate::from_ymd_opt(2022, 4, 5)
            .unwrap()
            .and_hms_opt(7, 30, 25)
            .unwrap();
        assert_eq!(pack_date(&Value::DateTime(dt), "unused").unwrap(), packed("2022-04-05"));
    }

    #[test]
    fn datetime_truncates_fractional_seconds() {
        assert_eq!(
            pack_datetime(
                &Value::Utf8("30Nov1974:14:56:08.967".to_string()),
                "%d%b%Y:%H:%M:%S.%f"
            )
            .unwrap(),
            packed("1974-11-30T14:56:08Z")
        );

        let dt = NaiveDate::from_ymd_opt(2022, 4, 5)
            .unwrap()
            .and_hms_micro_opt(7, 30, 25, 256)
            .unwrap();
        assert_eq!(
            pack_datetime(&Value::DateTime(dt), "unused").unwrap(),
            packed("2022-04-05T07:30:25Z")
        );
    }

    #[test]
    fn datetime_month_names_are_case_insensitive() {
        assert_eq!(
            pack_datetime(
                &Value::Utf8("1OCT2022:0:45:13.000".to_string()),
                "%d%b%Y:%H:%M:%S.%f"
            )
            .unwrap(),
            packed("2022-10-01T00:45:13Z")
        );
    }

    #[test]
    fn datetime_from_date_only_format_is_midnight() {
        assert_eq!(
            pack_datetime(&Value::Utf8("2019-12-18".to_string()), "%Y-%m-%d").unwrap(),
            packed("2019-12-18T00:00:00Z")
        );
        let d = NaiveDate::from_ymd_opt(1754, 5, 10).unwrap();
        assert_eq!(
            pack_datetime(&Value::Date(d), "unused").unwrap(),
            packed("1754-05-10T00:00:00Z")
        );
    }

    #[test]
    fn twelve_hour_clock_parses() {
        assert_eq!(
            pack_datetime(
                &Value::Utf8("March 7 89 at 7:00 PM".to_string()),
                "%B %d %y at %I:%M %p"
            )
            .unwrap(),
            packed("1989-03-07T19:00:00Z")
        );
    }

    #[test]
    fn unparseable_string_is_a_date_parse_error() {
        let err = pack_date(&Value::Utf8("not a date".to_string()), "%m.%d.%Y").unwrap_err();
        assert!(matches!(err, PackError::DateParse { .. }));
        assert!(err.to_string().contains("not a date"));
    }

    #[test]
    fn non_temporal_types_are_rejected() {
        assert!(matches!(
            pack_date(&Value::Int64(20220101), "%Y%m%d"),
            Err(PackError::WrongType { expected: "date", .. })
        ));
        assert!(matches!(
            pack_datetime(&Value::Bool(true), "%Y"),
            Err(PackError::WrongType { expected: "datetime", .. })
        ));
    }

    #[test]
    fn null_is_absent() {
        assert_eq!(pack_date(&Value::Null, "%B %d, %Y").unwrap(), None);
        assert_eq!(pack_datetime(&Value::Null, "unused").unwrap(), None);
    }

    #[test]
    fn twenty_four_hour_clock_ignores_meridiem() {
        let format = "%A, %b %d, %Y at %H:%M %p";
        let dt = |s: &str| pack_datetime(&Value::Utf8(s.to_string()), format);
        assert_eq!(dt("Friday, Nov 11, 2022 at 21:30 PM").unwrap(), packed("2022-11-11T21:30:00Z"));
        assert_eq!(dt("Friday, Nov 11, 2022 at 09:30 PM").unwrap(), packed("2022-11-11T09:30:00Z"));
        assert_eq!(dt("Friday, Nov 11, 2022 at 09:30 AM").unwrap(), packed("2022-11-11T09:30:00Z"));
        assert!(matches!(
            dt("Friday, Nov 11, 2022 at 09:30 XM"),
            Err(PackError::DateParse { .. })
        ));

        assert_eq!(
            pack_datetime(&Value::Utf8("2022-11-11 09:30 PM".to_string()), "%Y-%m-%d %I:%M %p").unwrap(),
            packed("2022-11-11T21:30:00Z")
        );
    }

    #[test]
    fn check_format_rejects_bad_directives() {
        assert!(check_format("%m.%d.%Y").is_ok());
        assert!(check_format("%d%b%Y:%H:%M:%S.%f").is_ok());
        assert!(check_format("%Q").is_err());
        assert!(check_format("").is_err());
    }
}
