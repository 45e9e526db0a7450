//! Typed views over EDI text values
//!
//! EDI carries dates, times and numbers as plain text in fixed layouts.
//! [`EdiValue`] gives every text-bearing node the same typed accessors, and
//! the free functions here convert in both directions.

use crate::{Error, Result};
use chrono::{NaiveDate, NaiveTime, Timelike};

const MAX_FRACTION_DIGITS: usize = 9;

/// A node holding one textual value, with typed accessors derived from it
pub trait EdiValue {
    /// The raw text of this node, if any
    fn value(&self) -> Option<&str>;

    /// Replace the content of this node with a single value
    fn set_value(&mut self, value: String);

    /// The value parsed as a 6 (`yyMMdd`) or 8 (`yyyyMMdd`) digit date
    fn date_value(&self) -> Result<NaiveDate> {
        parse_date(self.value().unwrap_or_default())
    }

    /// The value parsed as an `HHmm`, `HHmmss` or `HHmmss` + fraction time
    fn time_value(&self) -> Result<NaiveTime> {
        parse_time(self.value().unwrap_or_default())
    }

    /// The value parsed as a real number
    fn real_value(&self) -> Result<f64> {
        parse_real(self.value().unwrap_or_default())
    }

    /// The value parsed as a numeric with `decimals` implied decimal places
    fn numeric_value(&self, decimals: u32) -> Result<f64> {
        parse_numeric(self.value().unwrap_or_default(), decimals)
    }

    /// The value as an ISO 8601 date (`YYYY-MM-DD`)
    fn iso_date(&self) -> Result<String> {
        iso_date(self.value().unwrap_or_default())
    }

    /// The value as an ISO 8601 time, keeping its precision
    fn iso_time(&self) -> Result<String> {
        iso_time(self.value().unwrap_or_default())
    }
}

fn digits(text: &str) -> String {
    text.chars().filter(char::is_ascii_digit).collect()
}

/// Parse a 6 or 8 digit date; non-digit characters are ignored
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    let stripped = digits(text);
    let format = match stripped.len() {
        6 => "%y%m%d",
        8 => "%Y%m%d",
        _ => return Err(Error::invalid_value(text, "date")),
    };
    NaiveDate::parse_from_str(&stripped, format).map_err(|_| Error::invalid_value(text, "date"))
}

/// Parse a 4, 6 or 6+fractional digit time; non-digit characters are ignored
pub fn parse_time(text: &str) -> Result<NaiveTime> {
    let stripped = digits(text);
    if stripped.len() != 4 && !(6..=6 + MAX_FRACTION_DIGITS).contains(&stripped.len()) {
        return Err(Error::invalid_value(text, "time"));
    }

    let field = |range: std::ops::Range<usize>| stripped.get(range).and_then(|s| s.parse::<u32>().ok());
    let hour = field(0..2);
    let minute = field(2..4);
    let second = if stripped.len() >= 6 { field(4..6) } else { Some(0) };
    let nanos = if stripped.len() > 6 {
        format!("{:0<width$}", &stripped[6..], width = MAX_FRACTION_DIGITS)
            .parse::<u32>()
            .ok()
    } else {
        Some(0)
    };

    match (hour, minute, second, nanos) {
        (Some(h), Some(m), Some(s), Some(n)) => NaiveTime::from_hms_nano_opt(h, m, s, n),
        _ => None,
    }
    .ok_or_else(|| Error::invalid_value(text, "time"))
}

/// Parse a real number. Any character other than a digit, `-` or `.` is read
/// as a decimal indicator, so `12,5` parses as 12.5.
pub fn parse_real(text: &str) -> Result<f64> {
    let normalized: String = text
        .trim()
        .chars()
        .map(|c| if c.is_ascii_digit() || c == '-' { c } else { '.' })
        .collect();
    normalized
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| Error::invalid_value(text, "real"))
}

/// Parse an implied-decimal numeric: `123` with 1 decimal place is 12.3
pub fn parse_numeric(text: &str, decimals: u32) -> Result<f64> {
    let trimmed = text.trim();
    let (sign, magnitude) = match trimmed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", trimmed),
    };
    if magnitude.is_empty() || !magnitude.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::invalid_value(text, "numeric"));
    }

    let decimals = decimals as usize;
    let padded = format!("{magnitude:0>width$}", width = decimals + 1);
    let point = padded.len() - decimals;
    format!("{sign}{}.{}", &padded[..point], &padded[point..])
        .parse::<f64>()
        .map_err(|_| Error::invalid_value(text, "numeric"))
}

/// Render a date as `YYYY-MM-DD`
pub fn iso_date(text: &str) -> Result<String> {
    Ok(parse_date(text)?.format("%Y-%m-%d").to_string())
}

/// Render a time as `HH:MM`, `HH:MM:SS` or `HH:MM:SS.f…` matching its precision
pub fn iso_time(text: &str) -> Result<String> {
    let time = parse_time(text)?;
    let width = digits(text).len();
    let rendered = match width {
        4 => time.format("%H:%M").to_string(),
        6 => time.format("%H:%M:%S").to_string(),
        _ => format!(
            "{}.{}",
            time.format("%H:%M:%S"),
            fraction(time, width - 6)
        ),
    };
    Ok(rendered)
}

fn fraction(time: NaiveTime, places: usize) -> String {
    let mut nanos = format!("{:09}", time.nanosecond());
    nanos.truncate(places);
    nanos
}

/// Format a date as EDI text of the given length (6 or 8)
pub fn format_date(length: usize, value: NaiveDate) -> Result<String> {
    match length {
        6 => Ok(value.format("%y%m%d").to_string()),
        8 => Ok(value.format("%Y%m%d").to_string()),
        _ => Err(Error::UnsupportedLength {
            kind: "date",
            length,
        }),
    }
}

/// Format a time as EDI text of the given length (4, or 6 plus fractional digits)
pub fn format_time(length: usize, value: NaiveTime) -> Result<String> {
    match length {
        4 => Ok(value.format("%H%M").to_string()),
        6..=15 => Ok(format!(
            "{}{}",
            value.format("%H%M%S"),
            fraction(value, length - 6)
        )),
        _ => Err(Error::UnsupportedLength {
            kind: "time",
            length,
        }),
    }
}

/// Format a number as an implied-decimal numeric: 12.3 with 2 places is `1230`
pub fn format_numeric(decimals: u32, value: f64) -> String {
    let fixed = format!("{:.*}", decimals as usize, value.abs());
    let formatted = fixed.replace('.', "");
    let formatted = formatted.trim_start_matches('0');
    if formatted.is_empty() {
        "0".to_string()
    } else if value < 0.0 {
        format!("-{formatted}")
    } else {
        formatted.to_string()
    }
}

/// Format a number as a real with no trailing zeros
pub fn format_real(value: f64) -> String {
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_lengths() {
        assert_eq!(
            parse_date("120315").unwrap(),
            NaiveDate::from_ymd_opt(2012, 3, 15).unwrap()
        );
        assert_eq!(
            parse_date("20120315").unwrap(),
            NaiveDate::from_ymd_opt(2012, 3, 15).unwrap()
        );
        assert_eq!(
            parse_date("2012-03-15").unwrap(),
            NaiveDate::from_ymd_opt(2012, 3, 15).unwrap()
        );
    }

    #[test]
    fn test_parse_date_rejects_malformed() {
        assert!(parse_date("1203").is_err());
        assert!(parse_date("20121315").is_err());
        assert!(parse_date("abc").unwrap_err().is_format_error());
    }

    #[test]
    fn test_parse_time_lengths() {
        assert_eq!(parse_time("1230").unwrap(), NaiveTime::from_hms_opt(12, 30, 0).unwrap());
        assert_eq!(parse_time("123045").unwrap(), NaiveTime::from_hms_opt(12, 30, 45).unwrap());
        assert_eq!(
            parse_time("12304525").unwrap(),
            NaiveTime::from_hms_milli_opt(12, 30, 45, 250).unwrap()
        );
        assert!(parse_time("12304").is_err());
        assert!(parse_time("2561").is_err());
    }

    #[test]
    fn test_parse_real() {
        assert_eq!(parse_real("12.3").unwrap(), 12.3);
        assert_eq!(parse_real("-12.30").unwrap(), -12.3);
        assert_eq!(parse_real("12,5").unwrap(), 12.5);
        assert!(parse_real("abc").is_err());
    }

    #[test]
    fn test_parse_numeric_implied_decimals() {
        assert_eq!(parse_numeric("123", 1).unwrap(), 12.3);
        assert_eq!(parse_numeric("123", 3).unwrap(), 0.123);
        assert_eq!(parse_numeric("123", 5).unwrap(), 0.00123);
        assert_eq!(parse_numeric("-123", 4).unwrap(), -0.0123);
        assert_eq!(parse_numeric("997", 0).unwrap(), 997.0);
        assert!(parse_numeric("12a", 2).is_err());
        assert!(parse_numeric("", 2).is_err());
    }

    #[test]
    fn test_iso_renderings() {
        assert_eq!(iso_date("120315").unwrap(), "2012-03-15");
        assert_eq!(iso_time("1230").unwrap(), "12:30");
        assert_eq!(iso_time("123045").unwrap(), "12:30:45");
        assert_eq!(iso_time("12304501").unwrap(), "12:30:45.01");
    }

    #[test]
    fn test_format_date_and_time() {
        let date = NaiveDate::from_ymd_opt(2012, 3, 15).unwrap();
        assert_eq!(format_date(6, date).unwrap(), "120315");
        assert_eq!(format_date(8, date).unwrap(), "20120315");
        assert!(format_date(7, date).is_err());

        let time = NaiveTime::from_hms_milli_opt(9, 5, 7, 120).unwrap();
        assert_eq!(format_time(4, time).unwrap(), "0905");
        assert_eq!(format_time(6, time).unwrap(), "090507");
        assert_eq!(format_time(8, time).unwrap(), "09050712");
        assert!(format_time(5, time).is_err());
    }

    #[test]
    fn test_format_numeric() {
        assert_eq!(format_numeric(2, 0.0), "0");
        assert_eq!(format_numeric(2, 12.3), "1230");
        assert_eq!(format_numeric(1, 99.7), "997");
        assert_eq!(format_numeric(3, 1.234), "1234");
        assert_eq!(format_numeric(2, -0.5), "-50");
        assert_eq!(format_numeric(0, 7.0), "7");
    }

    #[test]
    fn test_format_real() {
        assert_eq!(format_real(-12.3), "-12.3");
        assert_eq!(format_real(12.0), "12");
        assert_eq!(format_real(0.125), "0.125");
    }
}
