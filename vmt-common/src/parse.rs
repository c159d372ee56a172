//! Lenient parsers for imported spreadsheets and submitted forms
//!
//! Spreadsheets exported from other tools write dates, odometer readings
//! and money in many shapes (`1/5/23`, `Jan 5, 2023`, `45.5k miles`,
//! `($12.50)`). Everything here returns `None` rather than an error so the
//! importer can decide per column what a bad value means.

use crate::{Error, Result};
use chrono::{NaiveDate, NaiveTime};

/// Highest odometer reading or mileage interval accepted anywhere
pub const MAX_MILEAGE: i64 = 10_000_000;

/// Sentinel stored when a record has no usable date
pub fn placeholder_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or_default()
}

pub fn is_placeholder_date(date: NaiveDate) -> bool {
    date == placeholder_date()
}

const MONTHS: [&str; 12] = [
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december",
];

fn month_from_name(token: &str) -> Option<u32> {
    if token.len() < 3 || !token.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let lower = token.to_ascii_lowercase();
    MONTHS
        .iter()
        .position(|name| name.starts_with(&lower))
        .map(|idx| idx as u32 + 1)
}

fn parse_year(token: &str) -> Option<i32> {
    let value: i32 = token.parse().ok()?;
    match token.len() {
        4 => Some(value),
        2 if value < 69 => Some(2000 + value),
        2 => Some(1900 + value),
        _ => None,
    }
}

fn is_number(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_digit())
}

/// Strip ordinal suffixes such as `5th` or `21st`
fn strip_ordinal(token: &str) -> &str {
    for suffix in ["st", "nd", "rd", "th"] {
        if let Some(stripped) = token.strip_suffix(suffix) {
            if is_number(stripped) {
                return stripped;
            }
        }
    }
    token
}

/// Parse a date written in any of the common spreadsheet forms
///
/// Month-first is assumed for all-numeric dates unless the first field
/// cannot be a month. Month + year without a day resolves to the 1st.
pub fn parse_date_flexible(input: &str) -> Option<NaiveDate> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    // ISO timestamps keep only the date part
    if let Some((date_part, _)) = s.split_once('T') {
        if let Ok(date) = NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
            return Some(date);
        }
    }

    let normalized: String = s
        .chars()
        .map(|c| if matches!(c, ',' | '/' | '-' | '.') { ' ' } else { c })
        .collect();
    let tokens: Vec<&str> = normalized
        .split_whitespace()
        .filter(|t| !t.contains(':'))
        .map(strip_ordinal)
        .collect();

    let (year, month, day) = match tokens.as_slice() {
        [single] if single.len() == 8 && is_number(single) => (
            single[0..4].parse().ok()?,
            single[4..6].parse().ok()?,
            single[6..8].parse().ok()?,
        ),
        [a, b, c] if is_number(a) && is_number(b) && is_number(c) => {
            if a.len() == 4 {
                (a.parse().ok()?, b.parse().ok()?, c.parse().ok()?)
            } else {
                let first: u32 = a.parse().ok()?;
                let second: u32 = b.parse().ok()?;
                let year = parse_year(c)?;
                if first > 12 && second <= 12 {
                    (year, second, first)
                } else {
                    (year, first, second)
                }
            }
        }
        [a, b, c] if is_number(a) && a.len() == 4 && is_number(c) => {
            (a.parse().ok()?, month_from_name(b)?, c.parse().ok()?)
        }
        [a, b, c] if is_number(b) && is_number(c) => {
            (parse_year(c)?, month_from_name(a)?, b.parse().ok()?)
        }
        [a, b, c] if is_number(a) && is_number(c) => {
            (parse_year(c)?, month_from_name(b)?, a.parse().ok()?)
        }
        [a, b] if is_number(a) && is_number(b) => {
            if a.len() == 4 {
                (a.parse().ok()?, b.parse().ok()?, 1)
            } else {
                (parse_year(b)?, a.parse().ok()?, 1)
            }
        }
        [a, b] if is_number(b) => (parse_year(b)?, month_from_name(a)?, 1),
        _ => return None,
    };

    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parse an odometer reading such as `45,123`, `45123 miles` or `45.5k`
pub fn parse_mileage_flexible(input: &str) -> Option<i64> {
    let mut s: String = input
        .trim()
        .to_ascii_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .collect();

    for suffix in ["miles", "mile", "mi"] {
        if let Some(stripped) = s.strip_suffix(suffix) {
            s = stripped.to_string();
            break;
        }
    }

    let (number, multiplier) = match s.strip_suffix('k') {
        Some(n) => (n, 1000.0),
        None => (s.as_str(), 1.0),
    };
    // Digits and a decimal point only, so exponent forms never parse
    if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }

    let value: f64 = number.parse().ok()?;
    let miles = (value * multiplier).round();
    if !(0.0..=MAX_MILEAGE as f64).contains(&miles) {
        return None;
    }
    Some(miles as i64)
}

pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Parse a money amount such as `$1,234.50`; accounting-style `(12.50)` is negative
pub fn parse_cost_flexible(input: &str) -> Option<f64> {
    let mut s: String = input
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '$' && *c != ',')
        .collect();

    let negative = s.len() >= 2 && s.starts_with('(') && s.ends_with(')');
    if negative {
        s = s[1..s.len() - 1].to_string();
    }
    if s.is_empty() {
        return None;
    }

    let value: f64 = s.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(round_cents(if negative { -value } else { value }))
}

/// Money typed into a form: everything but digits, `.` and `-` is dropped
pub fn parse_form_money(input: &str) -> Option<f64> {
    let cleaned: String = input
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(round_cents)
}

/// Date typed into a form: blank, `MM/DD/YYYY` or `YYYY-MM-DD`
pub fn normalize_form_date(input: &str) -> Result<Option<NaiveDate>> {
    let s = input.trim();
    if s.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%m/%d/%Y"))
        .map(Some)
        .map_err(|_| {
            Error::invalid(format!(
                "Invalid date format: {s}. Use MM/DD/YYYY or YYYY-MM-DD"
            ))
        })
}

/// Checkbox and flag values: `1`, `true`, `on`, `yes`
pub fn parse_checkbox(input: &str) -> bool {
    matches!(
        input.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "on" | "yes"
    )
}

/// 24-hour `HH:MM`
pub fn parse_time_hhmm(input: &str) -> Option<NaiveTime> {
    let s = input.trim();
    if s.len() != 5 {
        return None;
    }
    NaiveTime::parse_from_str(s, "%H:%M").ok()
}

/// `12345` -> `12,345`
pub fn format_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if value < 0 {
        out.insert(0, '-');
    }
    out
}

/// `MM/DD/YYYY`, blank for the placeholder date
pub fn format_us_date(date: NaiveDate) -> String {
    if is_placeholder_date(date) {
        String::new()
    } else {
        date.format("%m/%d/%Y").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn dates_in_common_spreadsheet_forms() {
        assert_eq!(parse_date_flexible("2023-01-05"), Some(ymd(2023, 1, 5)));
        assert_eq!(parse_date_flexible("01/05/2023"), Some(ymd(2023, 1, 5)));
        assert_eq!(parse_date_flexible("1/5/23"), Some(ymd(2023, 1, 5)));
        assert_eq!(parse_date_flexible("01-05-2023"), Some(ymd(2023, 1, 5)));
        assert_eq!(parse_date_flexible("2023/01/05"), Some(ymd(2023, 1, 5)));
        assert_eq!(parse_date_flexible("Jan 5, 2023"), Some(ymd(2023, 1, 5)));
        assert_eq!(parse_date_flexible("January 5th 2023"), Some(ymd(2023, 1, 5)));
        assert_eq!(parse_date_flexible("5 Jan 2023"), Some(ymd(2023, 1, 5)));
        assert_eq!(parse_date_flexible("2023-01-05T10:30:00"), Some(ymd(2023, 1, 5)));
        assert_eq!(parse_date_flexible("2023-01-05 10:30"), Some(ymd(2023, 1, 5)));
        assert_eq!(parse_date_flexible("20230105"), Some(ymd(2023, 1, 5)));
    }

    #[test]
    fn day_first_when_month_cannot_fit() {
        assert_eq!(parse_date_flexible("25/12/2022"), Some(ymd(2022, 12, 25)));
    }

    #[test]
    fn month_and_year_resolve_to_first_of_month() {
        assert_eq!(parse_date_flexible("03/2021"), Some(ymd(2021, 3, 1)));
        assert_eq!(parse_date_flexible("March 2021"), Some(ymd(2021, 3, 1)));
        assert_eq!(parse_date_flexible("2021-03"), Some(ymd(2021, 3, 1)));
    }

    #[test]
    fn two_digit_year_pivot() {
        assert_eq!(parse_date_flexible("6/1/68"), Some(ymd(2068, 6, 1)));
        assert_eq!(parse_date_flexible("6/1/99"), Some(ymd(1999, 6, 1)));
    }

    #[test]
    fn unparseable_dates() {
        assert_eq!(parse_date_flexible(""), None);
        assert_eq!(parse_date_flexible("   "), None);
        assert_eq!(parse_date_flexible("unknown"), None);
        assert_eq!(parse_date_flexible("13/13/2023"), None);
        assert_eq!(parse_date_flexible("02/30/2023"), None);
        assert_eq!(parse_date_flexible("2023"), None);
    }

    #[test]
    fn mileage_variants() {
        assert_eq!(parse_mileage_flexible("45123"), Some(45123));
        assert_eq!(parse_mileage_flexible("45,123"), Some(45123));
        assert_eq!(parse_mileage_flexible(" 45 123 miles"), Some(45123));
        assert_eq!(parse_mileage_flexible("45k"), Some(45000));
        assert_eq!(parse_mileage_flexible("45.5K"), Some(45500));
        assert_eq!(parse_mileage_flexible("120000 mi"), Some(120000));
        assert_eq!(parse_mileage_flexible("1 mile"), Some(1));
        assert_eq!(parse_mileage_flexible("45123.6"), Some(45124));
    }

    #[test]
    fn mileage_rejects_garbage() {
        assert_eq!(parse_mileage_flexible(""), None);
        assert_eq!(parse_mileage_flexible("k"), None);
        assert_eq!(parse_mileage_flexible("miles"), None);
        assert_eq!(parse_mileage_flexible("abc"), None);
        assert_eq!(parse_mileage_flexible("-5"), None);
        assert_eq!(parse_mileage_flexible("1e30"), None);
        assert_eq!(parse_mileage_flexible("inf"), None);
        assert_eq!(parse_mileage_flexible("NaN"), None);
        assert_eq!(parse_mileage_flexible("10000001"), None);
        assert_eq!(parse_mileage_flexible("10000k"), Some(MAX_MILEAGE));
    }

    #[test]
    fn cost_variants() {
        assert_eq!(parse_cost_flexible("$1,234.50"), Some(1234.5));
        assert_eq!(parse_cost_flexible("45"), Some(45.0));
        assert_eq!(parse_cost_flexible("($12.50)"), Some(-12.5));
        assert_eq!(parse_cost_flexible(" 19.999 "), Some(20.0));
        assert_eq!(parse_cost_flexible(""), None);
        assert_eq!(parse_cost_flexible("()"), None);
        assert_eq!(parse_cost_flexible("free"), None);
    }

    #[test]
    fn form_money_strips_symbols() {
        assert_eq!(parse_form_money("$45.678"), Some(45.68));
        assert_eq!(parse_form_money("USD 10"), Some(10.0));
        assert_eq!(parse_form_money(""), None);
        assert_eq!(parse_form_money("n/a"), None);
    }

    #[test]
    fn form_dates() {
        assert_eq!(normalize_form_date("").unwrap(), None);
        assert_eq!(normalize_form_date("2024-02-29").unwrap(), Some(ymd(2024, 2, 29)));
        assert_eq!(normalize_form_date("02/29/2024").unwrap(), Some(ymd(2024, 2, 29)));
        assert!(matches!(
            normalize_form_date("Feb 29 2024"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn checkbox_values() {
        for v in ["1", "true", "ON", "yes"] {
            assert!(parse_checkbox(v), "{v}");
        }
        for v in ["", "0", "off", "no", "false"] {
            assert!(!parse_checkbox(v), "{v}");
        }
    }

    #[test]
    fn times() {
        assert!(parse_time_hhmm("07:45").is_some());
        assert!(parse_time_hhmm("23:59").is_some());
        assert!(parse_time_hhmm("24:00").is_none());
        assert!(parse_time_hhmm("7:45").is_none());
    }

    #[test]
    fn display_helpers() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(12345), "12,345");
        assert_eq!(format_thousands(1234567), "1,234,567");
        assert_eq!(format_thousands(-4500), "-4,500");
        assert_eq!(format_us_date(ymd(2023, 1, 5)), "01/05/2023");
        assert_eq!(format_us_date(placeholder_date()), "");
    }
}
