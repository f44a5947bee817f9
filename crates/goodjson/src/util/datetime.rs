//! RFC 3339 datetime parsing and formatting at millisecond precision.
//!
//! Datetimes are carried as milliseconds since the Unix epoch (UTC). The
//! formatter produces `YYYY-MM-DDTHH:MM:SS.sssZ` (with an expanded `±YYYYYY`
//! year outside `0000..=9999`); the parser also
//! accepts a space separator, any number of fractional digits (truncated to
//! milliseconds), a `±HH:MM` offset, no offset at all (UTC assumed) and a bare
//! `YYYY-MM-DD` date (midnight UTC).

use thiserror::Error;

const MILLISECONDS_PER_SECOND: i64 = 1_000;
const MILLISECONDS_PER_MINUTE: i64 = 60 * MILLISECONDS_PER_SECOND;
const MILLISECONDS_PER_HOUR: i64 = 60 * MILLISECONDS_PER_MINUTE;
const MILLISECONDS_PER_DAY: i64 = 24 * MILLISECONDS_PER_HOUR;

/// Error type for RFC 3339 parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DateTimeParseError {
    pub message: String,
}

impl DateTimeParseError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Parses a timezone offset string (Z, +HH:MM, -HH:MM) and returns offset in minutes.
fn parse_timezone_offset(offset: &str) -> Result<i64, DateTimeParseError> {
    if offset == "Z" || offset == "z" {
        return Ok(0);
    }

    let invalid = || DateTimeParseError::new(format!("Invalid timezone offset: {}", offset));

    if offset.len() != 6 || !offset.is_ascii() {
        return Err(invalid());
    }

    let sign = match offset.as_bytes()[0] {
        b'+' => 1i64,
        b'-' => -1i64,
        _ => return Err(invalid()),
    };

    if offset.as_bytes()[3] != b':' {
        return Err(invalid());
    }

    let hours: i64 = offset[1..3].parse().map_err(|_| invalid())?;
    let minutes: i64 = offset[4..6].parse().map_err(|_| invalid())?;

    // Allow 24:00 as special case for ±24:00
    if hours > 24 || (hours == 24 && minutes != 0) || minutes > 59 {
        return Err(invalid());
    }

    Ok(sign * (hours * 60 + minutes))
}

/// Parses fractional seconds and returns milliseconds, truncating extra digits.
fn parse_fractional_millis(frac: &str) -> i64 {
    let mut padded: String = frac.chars().take(3).collect();
    while padded.len() < 3 {
        padded.push('0');
    }
    padded.parse().unwrap_or(0)
}

/// Returns true if the given year is a leap year.
fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

/// Returns the number of days in a given month (1-indexed).
fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 0,
    }
}

/// Calculates days since Unix epoch for a given date (Howard Hinnant's algorithm).
fn date_to_days(year: i32, month: u32, day: u32) -> i64 {
    let y = if month <= 2 { year - 1 } else { year } as i64;
    let m = if month <= 2 {
        month as i64 + 9
    } else {
        month as i64 - 3
    };

    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = (y - era * 400) as u32; // year of era
    let doy = (153 * m as u32 + 2) / 5 + day - 1; // day of year
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy; // day of era

    era * 146097 + doe as i64 - 719468
}

/// Converts days since Unix epoch to (year, month, day).
fn days_to_date(days: i64) -> (i32, u32, u32) {
    let z = days + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = (z - era * 146097) as u32; // day of era
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365; // year of era
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100); // day of year
    let mp = (5 * doy + 2) / 153; // month index
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };

    let year = if m <= 2 { y + 1 } else { y } as i32;
    (year, m, d)
}

/// Returns the length of the date prefix: 10 for `YYYY-MM-DD`, longer for an
/// expanded `±YYYYYY-MM-DD` year.
fn date_part_len(input: &str) -> usize {
    match input.as_bytes().first() {
        Some(b'+' | b'-') => 1 + input[1..].bytes().take_while(u8::is_ascii_digit).count() + 6,
        _ => 10,
    }
}

/// Parses the date prefix and returns days since Unix epoch.
///
/// Years outside `0000..=9999` use the expanded form: a sign and 6 to 9 digits.
fn parse_date_part(input: &str, date_part: &str) -> Result<i64, DateTimeParseError> {
    let invalid = || DateTimeParseError::new(format!("Invalid RFC 3339 datetime: {}", input));
    let bytes = date_part.as_bytes();
    let year_len = bytes.len().checked_sub(6).ok_or_else(invalid)?;
    let expanded = matches!(bytes.first(), Some(b'+' | b'-'));
    let year_ok = if expanded {
        (7..=10).contains(&year_len)
    } else {
        year_len == 4
    };
    if !year_ok || bytes[year_len] != b'-' || bytes[year_len + 3] != b'-' {
        return Err(invalid());
    }
    if !bytes[usize::from(expanded)..year_len].iter().all(u8::is_ascii_digit) {
        return Err(DateTimeParseError::new(format!("Invalid year in datetime: {}", input)));
    }

    let year: i32 = date_part[..year_len]
        .parse()
        .map_err(|_| DateTimeParseError::new(format!("Invalid year in datetime: {}", input)))?;
    let month: u32 = date_part[year_len + 1..year_len + 3]
        .parse()
        .map_err(|_| DateTimeParseError::new(format!("Invalid month in datetime: {}", input)))?;
    let day: u32 = date_part[year_len + 4..]
        .parse()
        .map_err(|_| DateTimeParseError::new(format!("Invalid day in datetime: {}", input)))?;

    if !(1..=12).contains(&month) {
        return Err(DateTimeParseError::new(format!("Invalid month in datetime: {}", input)));
    }
    if day < 1 || day > days_in_month(year, month) {
        return Err(DateTimeParseError::new(format!("Invalid day in datetime: {}", input)));
    }

    Ok(date_to_days(year, month, day))
}

/// Parses an RFC 3339 datetime string and returns milliseconds since Unix epoch (UTC).
pub fn parse_datetime_millis(datetime_str: &str) -> Result<i64, DateTimeParseError> {
    if !datetime_str.is_ascii() {
        return Err(DateTimeParseError::new(format!(
            "Invalid RFC 3339 datetime: {}",
            datetime_str
        )));
    }

    let date_len = date_part_len(datetime_str);

    // Bare date: midnight UTC
    if datetime_str.len() == date_len {
        let days = parse_date_part(datetime_str, datetime_str)?;
        return to_epoch_millis(datetime_str, i128::from(days) * i128::from(MILLISECONDS_PER_DAY));
    }

    // The date must be followed by THH:MM:SS
    if datetime_str.len() < date_len + 9 {
        return Err(DateTimeParseError::new(format!(
            "Invalid RFC 3339 datetime: {}",
            datetime_str
        )));
    }

    let sep = datetime_str.as_bytes()[date_len];
    if sep != b'T' && sep != b't' && sep != b' ' {
        return Err(DateTimeParseError::new(format!(
            "Invalid RFC 3339 datetime: {}",
            datetime_str
        )));
    }

    let days = parse_date_part(datetime_str, &datetime_str[..date_len])?;

    let time_part = &datetime_str[date_len + 1..];
    let tb = time_part.as_bytes();
    if tb[2] != b':' || tb[5] != b':' {
        return Err(DateTimeParseError::new(format!(
            "Invalid RFC 3339 datetime: {}",
            datetime_str
        )));
    }

    let component = |range: std::ops::Range<usize>,
                     what: &str,
                     max: i64|
     -> Result<i64, DateTimeParseError> {
        let v: i64 = time_part[range].parse().map_err(|_| {
            DateTimeParseError::new(format!("Invalid {} in datetime: {}", what, datetime_str))
        })?;
        if v > max {
            return Err(DateTimeParseError::new(format!(
                "Invalid {} in datetime: {}",
                what, datetime_str
            )));
        }
        Ok(v)
    };
    let hours = component(0..2, "hours", 23)?;
    let minutes = component(3..5, "minutes", 59)?;
    let seconds = component(6..8, "seconds", 59)?;

    // Parse optional fractional seconds and timezone
    let rest = &time_part[8..];
    let (millis, offset_str) = if let Some(frac_rest) = rest.strip_prefix('.') {
        let frac_end = frac_rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(frac_rest.len());
        if frac_end == 0 {
            return Err(DateTimeParseError::new(format!(
                "Invalid fractional seconds in datetime: {}",
                datetime_str
            )));
        }
        let tz = &frac_rest[frac_end..];
        (
            parse_fractional_millis(&frac_rest[..frac_end]),
            if tz.is_empty() { None } else { Some(tz) },
        )
    } else if rest.is_empty() {
        (0, None)
    } else {
        (0, Some(rest))
    };

    let offset_min = match offset_str {
        Some(s) => parse_timezone_offset(s)?,
        None => 0,
    };

    let local_millis = i128::from(days) * i128::from(MILLISECONDS_PER_DAY)
        + i128::from(
            hours * MILLISECONDS_PER_HOUR
                + minutes * MILLISECONDS_PER_MINUTE
                + seconds * MILLISECONDS_PER_SECOND
                + millis,
        );

    // local time = UTC + offset, so UTC = local - offset
    to_epoch_millis(
        datetime_str,
        local_millis - i128::from(offset_min * MILLISECONDS_PER_MINUTE),
    )
}

fn to_epoch_millis(input: &str, millis: i128) -> Result<i64, DateTimeParseError> {
    i64::try_from(millis)
        .map_err(|_| DateTimeParseError::new(format!("Datetime out of range: {}", input)))
}

/// Formats milliseconds since Unix epoch as `YYYY-MM-DDTHH:MM:SS.sssZ`.
///
/// Years outside `0000..=9999` are written in the expanded `±YYYYYY` form,
/// which [`parse_datetime_millis`] reads back.
pub fn format_datetime_millis(epoch_millis: i64) -> String {
    let days = epoch_millis.div_euclid(MILLISECONDS_PER_DAY);
    let time_millis = epoch_millis.rem_euclid(MILLISECONDS_PER_DAY);

    let (year, month, day) = days_to_date(days);

    let hours = time_millis / MILLISECONDS_PER_HOUR;
    let minutes = (time_millis % MILLISECONDS_PER_HOUR) / MILLISECONDS_PER_MINUTE;
    let seconds = (time_millis % MILLISECONDS_PER_MINUTE) / MILLISECONDS_PER_SECOND;
    let millis = time_millis % MILLISECONDS_PER_SECOND;

    let year = if (0..=9999).contains(&year) {
        format!("{:04}", year)
    } else {
        format!("{:+07}", year)
    };
    format!(
        "{}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z",
        year, month, day, hours, minutes, seconds, millis
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_datetime_basic() {
        assert_eq!(parse_datetime_millis("1970-01-01T00:00:00Z").unwrap(), 0);
        assert_eq!(
            parse_datetime_millis("2024-03-15T14:30:00Z").unwrap(),
            1_710_513_000_000
        );
        assert_eq!(
            parse_datetime_millis("2024-03-15T14:30:00.123Z").unwrap(),
            1_710_513_000_123
        );
        // Extra precision is truncated
        assert_eq!(
            parse_datetime_millis("2024-03-15T14:30:00.123456Z").unwrap(),
            1_710_513_000_123
        );
        // Missing offset means UTC; space separator is accepted
        assert_eq!(
            parse_datetime_millis("2024-03-15 14:30:00").unwrap(),
            1_710_513_000_000
        );
    }

    #[test]
    fn test_parse_bare_date() {
        assert_eq!(parse_datetime_millis("1970-01-02").unwrap(), 86_400_000);
    }

    #[test]
    fn test_format_datetime() {
        assert_eq!(format_datetime_millis(0), "1970-01-01T00:00:00.000Z");
        assert_eq!(format_datetime_millis(1_710_513_000_123), "2024-03-15T14:30:00.123Z");
    }

    #[test]
    fn test_datetime_roundtrip() {
        for millis in [0i64, 1, 999, 1_710_513_000_123, 951_782_400_000, -1] {
            let formatted = format_datetime_millis(millis);
            assert_eq!(
                parse_datetime_millis(&formatted).unwrap(),
                millis,
                "Roundtrip failed for {}",
                formatted
            );
        }
    }

    #[test]
    fn test_datetime_with_offset() {
        // 2024-03-15T14:30:00+05:30 is 2024-03-15T09:00:00Z
        let with_offset = parse_datetime_millis("2024-03-15T14:30:00+05:30").unwrap();
        let utc = parse_datetime_millis("2024-03-15T09:00:00Z").unwrap();
        assert_eq!(with_offset, utc);
    }

    #[test]
    fn test_negative_epoch() {
        let millis = parse_datetime_millis("1969-12-31T23:59:59Z").unwrap();
        assert_eq!(millis, -1_000);
        assert_eq!(format_datetime_millis(millis), "1969-12-31T23:59:59.000Z");
    }

    #[test]
    fn test_expanded_years() {
        // First millisecond of year 10000
        let y10k = 253_402_300_800_000;
        assert_eq!(format_datetime_millis(y10k), "+010000-01-01T00:00:00.000Z");
        assert_eq!(parse_datetime_millis("+010000-01-01T00:00:00.000Z").unwrap(), y10k);
        assert_eq!(parse_datetime_millis("+010000-01-01").unwrap(), y10k);

        let before_year_zero = parse_datetime_millis("-000001-12-31T23:59:59.999Z").unwrap();
        assert_eq!(
            before_year_zero,
            parse_datetime_millis("0000-01-01T00:00:00Z").unwrap() - 1
        );
        assert_eq!(format_datetime_millis(before_year_zero), "-000001-12-31T23:59:59.999Z");

        for millis in [i64::MIN, i64::MAX, y10k - 1, -62_167_219_200_001] {
            let formatted = format_datetime_millis(millis);
            assert_eq!(
                parse_datetime_millis(&formatted).unwrap(),
                millis,
                "Roundtrip failed for {}",
                formatted
            );
        }
    }

    #[test]
    fn test_invalid_expanded_years() {
        assert!(parse_datetime_millis("10000-01-01T00:00:00Z").is_err()); // sign required
        assert!(parse_datetime_millis("+10000-01-01T00:00:00Z").is_err()); // too few digits
        assert!(parse_datetime_millis("+1234567890-01-01T00:00:00Z").is_err()); // too many digits
        assert!(parse_datetime_millis("+-00001-01-01T00:00:00Z").is_err());
        assert!(parse_datetime_millis("-").is_err());
        // Beyond the i64 millisecond range
        assert!(parse_datetime_millis("+999999999-12-31T23:59:59Z").is_err());
    }

    #[test]
    fn test_invalid_datetimes() {
        assert!(parse_datetime_millis("2024-13-01T00:00:00Z").is_err()); // invalid month
        assert!(parse_datetime_millis("2023-02-29T00:00:00Z").is_err()); // not a leap year
        assert!(parse_datetime_millis("2024-03-15T24:00:00Z").is_err()); // invalid hour
        assert!(parse_datetime_millis("2024-03-15T14:30:00+25:00").is_err());
        assert!(parse_datetime_millis("2024-03-15T14:30:00.Z").is_err());
        assert!(parse_datetime_millis("not a datetime").is_err());
        assert!(parse_datetime_millis("").is_err());
    }
}
