// 📅 Calendar helpers
// Month arithmetic follows "same day next month, clamped to month end",
// so Jan 31 + 1 month = Feb 28/29.

use chrono::{Datelike, Months, NaiveDate};

/// Output format for every date column
pub const YMD: &str = "%Y-%m-%d";

/// Day-level spellings accepted on input, tried in order
const DAY_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Parse a calendar date from a source cell.
///
/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD`, `MM/DD/YYYY`, month-only `YYYY-MM`
/// (read as the 1st), and any of those followed by a time part separated by
/// `T` or a space. The time part is dropped.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let date_part = trimmed
        .split(|c| c == 'T' || c == ' ')
        .next()
        .unwrap_or(trimmed);

    for fmt in DAY_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(date_part, fmt) {
            return Some(date);
        }
    }

    // Month-only: "2024-03"
    if date_part.len() == 7 {
        if let Ok(date) = NaiveDate::parse_from_str(&format!("{date_part}-01"), "%Y-%m-%d") {
            return Some(date);
        }
    }

    None
}

pub fn format_ymd(date: NaiveDate) -> String {
    date.format(YMD).to_string()
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Same day one calendar month later, clamped to the last day of that month
pub fn add_one_month(date: NaiveDate) -> NaiveDate {
    date.checked_add_months(Months::new(1))
        .unwrap_or(NaiveDate::MAX)
}

/// `date + 1 month - 1 day`; for a first-of-month date this is the month's last day
pub fn month_end_from(date: NaiveDate) -> NaiveDate {
    match date.checked_add_months(Months::new(1)) {
        Some(next) => next.pred_opt().unwrap_or(date),
        // Last representable month
        None => NaiveDate::MAX,
    }
}

pub fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    month_end_from(first_of_month(date))
}

pub fn is_month_start(date: NaiveDate) -> bool {
    date.day() == 1
}

pub fn is_month_end(date: NaiveDate) -> bool {
    date == last_day_of_month(date)
}
