//! Typed cell values.
//!
//! Every cell is normalized into a [`Cell`] once, when the sheet is loaded.
//! Field extraction only ever sees these variants.

use calamine::Data;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Timelike};

/// A normalized spreadsheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
    /// Excel error code such as `#N/A`.
    Error(String),
}

impl Cell {
    /// Text rendering used for field values and headers.
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => format_number(*n),
            Cell::Bool(b) => b.to_string(),
            Cell::DateTime(dt) => isoformat(dt),
            Cell::Error(code) => code.clone(),
        }
    }

    /// `true` for empty cells and whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// The cell as a timestamp: date cells directly, text cells when they parse.
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Cell::DateTime(dt) => Some(*dt),
            Cell::Text(s) => parse_datetime_text(s),
            _ => None,
        }
    }

    /// Copy with surrounding whitespace removed from text.
    pub(crate) fn trimmed(&self) -> Cell {
        match self {
            Cell::Text(s) => Cell::Text(s.trim().to_string()),
            other => other.clone(),
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Float(f) => Cell::Number(*f),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Bool(b) => Cell::Bool(*b),
            Data::Error(e) => Cell::Error(e.to_string()),
            Data::DateTime(dt) => excel_serial_to_datetime(dt.as_f64())
                .map(Cell::DateTime)
                .unwrap_or(Cell::Number(dt.as_f64())),
            Data::DateTimeIso(s) => parse_datetime_text(s)
                .map(Cell::DateTime)
                .unwrap_or_else(|| Cell::Text(s.clone())),
            Data::DurationIso(s) => Cell::Text(s.clone()),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s.to_string())
        }
    }
}

/// ISO-8601 rendering without offset; microseconds only when non-zero.
pub fn isoformat(dt: &NaiveDateTime) -> String {
    if dt.nanosecond() / 1_000 == 0 {
        dt.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        dt.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    }
}

/// Integral values print without a fractional part so numeric ids stay ids.
fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// Convert an Excel serial (1900 date system) to a timestamp.
fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    // Serials below 60 predate Excel's phantom 1900-02-29.
    let epoch = if serial < 60.0 {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };
    let micros = (serial * 86_400_000_000.0).round() as i64;
    epoch
        .and_hms_opt(0, 0, 0)?
        .checked_add_signed(TimeDelta::microseconds(micros))
}

/// Parse RFC 3339 or `YYYY-MM-DD[( |T)HH:MM:SS[.f]]` text.
fn parse_datetime_text(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
