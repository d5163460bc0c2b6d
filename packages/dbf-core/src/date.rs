//! Date helpers for the DBF header, `D` fields and binary `T` fields.

use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, Timelike};

/// Julian day number of 1900-01-01.
pub const JULIAN_DAY_1900: i64 = 2_415_021;

/// Today's date in local time.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Renders `date` as the 8-byte `YYYYMMDD` field encoding.
///
/// Returns `None` for years that need more than four digits.
pub fn to_dbf_text(date: NaiveDate) -> Option<[u8; 8]> {
    let year = date.year();
    if !(0..=9999).contains(&year) {
        return None;
    }
    let text = format!("{:04}{:02}{:02}", year, date.month(), date.day());
    let mut out = [0u8; 8];
    out.copy_from_slice(text.as_bytes());
    Some(out)
}

/// Parses a `YYYYMMDD` field; blank or malformed text yields `None`.
pub fn parse_dbf_text(bytes: &[u8]) -> Option<NaiveDate> {
    if bytes.len() != 8 || !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let text = std::str::from_utf8(bytes).ok()?;
    NaiveDate::parse_from_str(text, "%Y%m%d").ok()
}

fn julian_epoch() -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(1900, 1, 1)?.and_hms_opt(0, 0, 0)
}

/// Encodes `value` as a `T` field: i32 LE Julian day, then i32 LE
/// milliseconds since midnight.
///
/// Returns `None` when the day number does not fit an i32.
pub fn to_julian_bytes(value: NaiveDateTime) -> Option<[u8; 8]> {
    let epoch = julian_epoch()?;
    let days = (value.date() - epoch.date()).num_days() + JULIAN_DAY_1900;
    let day = i32::try_from(days).ok()?;
    let time = value.time();
    // Leap seconds carry past 999 ms in the nanosecond field.
    let millis = time.num_seconds_from_midnight() * 1000 + time.nanosecond() / 1_000_000;

    let mut out = [0u8; 8];
    out[..4].copy_from_slice(&day.to_le_bytes());
    out[4..].copy_from_slice(&(millis as i32).to_le_bytes());
    Some(out)
}

/// A `T` field holding only spaces and NULs is null.
pub fn is_blank_datetime(bytes: &[u8]) -> bool {
    bytes.iter().all(|&b| b == b' ' || b == 0)
}

/// Decodes a `T` field; null or out-of-range values yield `None`.
pub fn parse_julian_bytes(bytes: &[u8]) -> Option<NaiveDateTime> {
    if bytes.len() != 8 || is_blank_datetime(bytes) {
        return None;
    }
    let day = i32::from_le_bytes(bytes[..4].try_into().ok()?);
    let millis = i32::from_le_bytes(bytes[4..].try_into().ok()?);
    julian_epoch()?
        .checked_add_signed(Duration::days(i64::from(day) - JULIAN_DAY_1900))?
        .checked_add_signed(Duration::milliseconds(i64::from(millis)))
}

/// Header date bytes: year % 100, month, day.
pub fn header_bytes(date: NaiveDate) -> [u8; 3] {
    [
        date.year().rem_euclid(100) as u8,
        date.month() as u8,
        date.day() as u8,
    ]
}
