// Utility helpers for parsing and display formatting.
//
// This module centralizes all the "dirty" spreadsheet number/date handling so
// the rest of the code can assume clean, typed values.
use crate::types::Cell;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use num_format::{Locale, ToFormattedString};

/// Parse a cell into `f64`, tolerating Brazilian number formatting.
///
/// - Native numbers pass through unchanged.
/// - Strings are trimmed, every `.` is dropped (thousands separator) and the
///   first `,` becomes the decimal point: `"1.234,5"` -> `1234.5`.
/// - Empty, unparseable and non-finite values yield `None`.
pub fn try_parse_number(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(n) => n.is_finite().then_some(*n),
        Cell::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Cell::Text(s) => {
            let cleaned = s.trim().replace('.', "").replacen(',', ".", 1);
            if cleaned.is_empty() {
                return None;
            }
            cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
        }
        Cell::Empty | Cell::DateTime(_) => None,
    }
}

/// Like [`try_parse_number`] but never fails: anything unusable becomes `default`.
pub fn parse_number(cell: &Cell, default: f64) -> f64 {
    try_parse_number(cell).unwrap_or(default)
}

/// Parse a cell into a timestamp.
///
/// Native date cells are returned as-is and native numbers are decoded as
/// spreadsheet serial dates. Text is tried against each format in turn and
/// the first match wins, so the order below matters: a bare number like
/// `"45000"` is only read as a serial date once every textual format failed.
pub fn parse_date(cell: &Cell) -> Option<NaiveDateTime> {
    match cell {
        Cell::DateTime(dt) => Some(*dt),
        Cell::Number(n) => from_serial_date(*n),
        Cell::Text(s) => parse_date_str(s),
        Cell::Empty | Cell::Bool(_) => None,
    }
}

pub fn parse_date_str(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    parse_day_first(s)
        .or_else(|| parse_year_first(s))
        .or_else(|| parse_day_first_with_time(s))
        .or_else(|| parse_iso8601(s))
        .or_else(|| parse_generic(s))
        .or_else(|| parse_serial_str(s))
}

/// `YYYY-MM-DD` key used for every interval membership test.
pub fn to_comparable_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day())
}

/// Decode a spreadsheet serial date (days since 1899-12-30, fraction = time).
pub fn from_serial_date(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(1.0..2_958_466.0).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let days = serial.trunc() as i64;
    let secs = (serial.fract() * 86_400.0).round() as i64;
    epoch.checked_add_signed(Duration::days(days) + Duration::seconds(secs))
}

// Splits `a?b?c` on `/`, `-` or `.` into three all-digit parts.
fn split_date_parts(s: &str) -> Option<[&str; 3]> {
    let parts: Vec<&str> = s.split(['/', '-', '.']).collect();
    if parts.len() != 3 {
        return None;
    }
    if parts
        .iter()
        .any(|p| p.is_empty() || !p.chars().all(|c| c.is_ascii_digit()))
    {
        return None;
    }
    Some([parts[0], parts[1], parts[2]])
}

fn expand_year(year: i32, digits: usize) -> i32 {
    if digits <= 2 {
        if year < 50 {
            2000 + year
        } else {
            1900 + year
        }
    } else {
        year
    }
}

fn day_first_date(s: &str) -> Option<NaiveDate> {
    let [d, m, y] = split_date_parts(s)?;
    if d.len() > 2 || m.len() > 2 || !(2..=4).contains(&y.len()) {
        return None;
    }
    let year = expand_year(y.parse().ok()?, y.len());
    NaiveDate::from_ymd_opt(year, m.parse().ok()?, d.parse().ok()?)
}

// DD/MM/YYYY, DD-MM-YYYY, DD.MM.YY
fn parse_day_first(s: &str) -> Option<NaiveDateTime> {
    day_first_date(s)?.and_hms_opt(0, 0, 0)
}

// YYYY-MM-DD, YYYY/MM/DD
fn parse_year_first(s: &str) -> Option<NaiveDateTime> {
    let [y, m, d] = split_date_parts(s)?;
    if y.len() != 4 || m.len() > 2 || d.len() > 2 {
        return None;
    }
    NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?)?
        .and_hms_opt(0, 0, 0)
}

// DD/MM/YYYY HH:MM[:SS]
fn parse_day_first_with_time(s: &str) -> Option<NaiveDateTime> {
    let mut tokens = s.split_whitespace();
    let (date_part, time_part) = (tokens.next()?, tokens.next()?);
    if tokens.next().is_some() {
        return None;
    }
    let date = day_first_date(date_part)?;

    let fields: Vec<&str> = time_part.split(':').collect();
    if !(2..=3).contains(&fields.len())
        || fields
            .iter()
            .any(|f| f.is_empty() || f.len() > 2 || !f.chars().all(|c| c.is_ascii_digit()))
    {
        return None;
    }
    let hour = fields[0].parse().ok()?;
    let minute = fields[1].parse().ok()?;
    let second = match fields.get(2) {
        Some(f) => f.parse().ok()?,
        None => 0,
    };
    Some(date.and_time(NaiveTime::from_hms_opt(hour, minute, second)?))
}

// YYYY-MM-DDTHH:MM:SS[.sss][Z]
fn parse_iso8601(s: &str) -> Option<NaiveDateTime> {
    let s = s.strip_suffix('Z').unwrap_or(s);
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

const GENERIC_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

fn parse_generic(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.naive_local());
    }
    GENERIC_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

fn parse_serial_str(s: &str) -> Option<NaiveDateTime> {
    if !s.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    from_serial_date(s.parse().ok()?)
}

/// Format with pt-BR separators: `1234567.891` -> `1.234.567,89`.
pub fn format_number(n: f64, decimals: usize) -> String {
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::pt);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push(',');
            res.push_str(frac);
        }
    }
    // "-0,00" reads as noise; only keep the sign when something non-zero is shown
    let shows_value = s.chars().any(|c| c.is_ascii_digit() && c != '0');
    if n < 0.0 && shows_value {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_currency(n: f64) -> String {
    let body = format_number(n.abs(), 2);
    if n < 0.0 && body != "0,00" {
        format!("-R$ {}", body)
    } else {
        format!("R$ {}", body)
    }
}

pub fn format_percent(n: f64) -> String {
    format!("{}%", format_number(n, 2))
}

pub fn format_mwh(n: f64) -> String {
    format!("{} MWh", format_number(n, 2))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::pt)
}
