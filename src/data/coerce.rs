//! Cell coercion for the typed columns.
//!
//! Every function here is total: a value that cannot be interpreted becomes
//! `None` and the load carries on.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime};

use super::model::{format_datetime, CellValue};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// Largest spreadsheet serial that is still a valid date (9999-12-31).
const MAX_SERIAL: f64 = 2_958_466.0;

/// Empty cells and empty strings count as missing, not as coercion failures.
pub fn is_blank(cell: &CellValue) -> bool {
    match cell {
        CellValue::Null => true,
        CellValue::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Text columns: any non-blank cell, rendered as a string.
pub fn to_text(cell: &CellValue) -> Option<String> {
    match cell {
        CellValue::Null => None,
        CellValue::String(s) if s.is_empty() => None,
        CellValue::String(s) => Some(s.clone()),
        CellValue::DateTime(dt) => Some(format_datetime(dt)),
        other => Some(other.to_string()),
    }
}

/// Amounts: numbers, or plain numeric text. Currency symbols and thousands
/// separators make the value unparseable.
pub fn to_amount(cell: &CellValue) -> Option<f64> {
    let value = match cell {
        CellValue::Integer(i) => *i as f64,
        CellValue::Float(v) => *v,
        CellValue::String(s) => s.trim().parse::<f64>().ok()?,
        CellValue::Bool(_) | CellValue::DateTime(_) | CellValue::Null => return None,
    };
    value.is_finite().then_some(value)
}

/// Dates: native date cells, spreadsheet serials, epoch milliseconds, or text.
pub fn to_datetime(cell: &CellValue) -> Option<NaiveDateTime> {
    match cell {
        CellValue::DateTime(dt) => Some(*dt),
        CellValue::Integer(i) => numeric_to_datetime(*i as f64),
        CellValue::Float(v) => numeric_to_datetime(*v),
        CellValue::String(s) => parse_datetime(s.trim()),
        CellValue::Bool(_) | CellValue::Null => None,
    }
}

/// Small numbers are spreadsheet serials; very large ones are epoch millis
/// (the records-oriented JSON written by Pandas).
fn numeric_to_datetime(v: f64) -> Option<NaiveDateTime> {
    if !v.is_finite() {
        return None;
    }
    if (1.0..MAX_SERIAL).contains(&v) {
        serial_to_datetime(v)
    } else if v.abs() >= 1e11 {
        DateTime::from_timestamp_millis(v as i64).map(|dt| dt.naive_utc())
    } else {
        None
    }
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

fn serial_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .unwrap_or(NaiveDate::MIN)
        .and_time(NaiveTime::MIN)
}

/// Spreadsheet serial (days since 1899-12-30, fraction = time of day).
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    let days = serial.floor();
    let seconds = ((serial - days) * 86_400.0).round() as i64;
    serial_epoch()
        .checked_add_signed(Duration::days(days as i64))?
        .checked_add_signed(Duration::seconds(seconds))
}

/// Inverse of [`serial_to_datetime`], used when writing spreadsheets.
pub fn datetime_to_serial(dt: &NaiveDateTime) -> f64 {
    (*dt - serial_epoch()).num_seconds() as f64 / 86_400.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_time(NaiveTime::MIN)
    }

    #[test]
    fn amounts_accept_only_plain_numbers() {
        assert_eq!(to_amount(&CellValue::String(" 12500.25 ".into())), Some(12_500.25));
        assert_eq!(to_amount(&CellValue::String("$1,500".into())), None);
        assert_eq!(to_amount(&CellValue::String("12,500.25".into())), None);
        assert_eq!(to_amount(&CellValue::Integer(40)), Some(40.0));
        assert_eq!(to_amount(&CellValue::String("pending".into())), None);
        assert_eq!(to_amount(&CellValue::Float(f64::NAN)), None);
        assert_eq!(to_amount(&CellValue::Bool(true)), None);
    }

    #[test]
    fn dates_from_text_in_several_layouts() {
        let want = Some(ymd(2022, 5, 10));
        assert_eq!(to_datetime(&CellValue::String("2022-05-10".into())), want);
        assert_eq!(to_datetime(&CellValue::String("05/10/2022".into())), want);
        assert_eq!(
            to_datetime(&CellValue::String("2022-05-10 13:30:00".into())),
            NaiveDate::from_ymd_opt(2022, 5, 10).unwrap().and_hms_opt(13, 30, 0)
        );
        assert_eq!(to_datetime(&CellValue::String("TBD".into())), None);
    }

    #[test]
    fn dates_from_serials_and_epoch_millis() {
        // 44256 is 2021-03-01 in the 1900 date system
        assert_eq!(to_datetime(&CellValue::Integer(44_256)), Some(ymd(2021, 3, 1)));
        assert_eq!(to_datetime(&CellValue::Float(44_256.5)).map(|d| d.time()),
            NaiveTime::from_hms_opt(12, 0, 0));
        assert_eq!(
            to_datetime(&CellValue::Integer(1_614_556_800_000)),
            Some(ymd(2021, 3, 1))
        );
        assert_eq!(to_datetime(&CellValue::Integer(-5)), None);
    }

    #[test]
    fn serial_round_trips_through_datetime() {
        let dt = ymd(2022, 7, 20);
        assert_eq!(serial_to_datetime(datetime_to_serial(&dt)), Some(dt));
    }

    #[test]
    fn text_columns_stringify_non_text_cells() {
        assert_eq!(to_text(&CellValue::Integer(3)), Some("3".to_string()));
        assert_eq!(to_text(&CellValue::String(String::new())), None);
        assert_eq!(to_text(&CellValue::Null), None);
    }
}
