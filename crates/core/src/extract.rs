//! Fallible parsing helpers for numeric and date cells.
//!
//! None of these raise: a value that does not parse is reported as `None` and
//! the caller treats it as "does not match".

use chrono::{Datelike, NaiveDate};

/// Returns the first maximal run of ASCII digits in `text`, parsed as an
/// integer. Values are 32-bit; a run that does not fit yields `None`.
pub fn first_integer(text: &str) -> Option<i64> {
    let start = text.find(|ch: char| ch.is_ascii_digit())?;
    let tail = &text[start..];
    let end = tail.find(|ch: char| !ch.is_ascii_digit()).unwrap_or(tail.len());
    tail[..end].parse::<i32>().ok().map(i64::from)
}

/// Salary cells share the 32-bit range of thresholds; larger values never
/// match a salary predicate.
pub fn parse_salary(cell: &str) -> Option<i64> {
    cell.trim().parse::<i32>().ok().map(i64::from)
}

pub fn parse_hire_date(cell: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(cell.trim(), "%Y-%m-%d").ok()
}

pub fn hire_year(cell: &str) -> Option<i32> {
    parse_hire_date(cell).map(|date| date.year())
}
