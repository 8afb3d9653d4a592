//! Loose `Y[-M[-D]]` date parsing and ISO-8601 formatting, both measured as
//! days since a fixed UTC epoch (1970-01-01, matching `chrono`'s own civil
//! calendar so no separate epoch bookkeeping is needed).

use chrono::NaiveDate;

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid epoch")
}

/// Parse `Y`, `Y-M`, or `Y-M-D` into days-since-epoch. A missing month
/// defaults to 1, a missing day to 1. Unparseable components return `None`
/// rather than panicking — the caller treats this as a Parse-warning, not a
/// hard error.
pub fn parse_date(text: &str) -> Option<i64> {
    let stripped = crate::strip_borders(text);
    let mut parts = stripped.split('-');
    let year: i32 = parts.next()?.parse().ok()?;
    let month: u32 = match parts.next() {
        Some(s) if !s.is_empty() => s.parse().ok()?,
        _ => 1,
    };
    let day: u32 = match parts.next() {
        Some(s) if !s.is_empty() => s.parse().ok()?,
        _ => 1,
    };
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(date.signed_duration_since(epoch()).num_days())
}

/// Format days-since-epoch as ISO-8601 `YYYY-MM-DD`.
pub fn format_date(day: i64) -> String {
    let date = epoch() + chrono::Duration::days(day);
    date.format("%Y-%m-%d").to_string()
}
