//! Calendar/date utility layer
//!
//! Multi-format parsing, normalization and validation for the date strings
//! crossing the UI boundary. Storage is always Gregorian `YYYY-MM-DD`,
//! display is always Jalali `YYYY/MM/DD`; nothing at the boundary tags which
//! calendar a raw string is in, so the year-magnitude heuristic decides:
//! a year above 1500 is Gregorian, a year in 1300..=1500 is Jalali.
//!
//! The whole layer fails soft: malformed input yields a structured result or
//! an unchanged echo of the input, never a panic.

pub mod finance;

use crate::jalali::JalaliDate;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

/// Years above this are treated as Gregorian, years in
/// [`JALALI_MIN_YEAR`]..=[`JALALI_MAX_YEAR`] as Jalali.
pub const JALALI_MIN_YEAR: i32 = 1300;
pub const JALALI_MAX_YEAR: i32 = 1500;

/// Recognized wire forms for a date string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFormat {
    /// Jalali `YYYY/MM/DD` (what the UI shows).
    Display,
    /// Gregorian `YYYY-MM-DD` (what the database stores).
    Database,
    /// Jalali `YYYYMMDD`.
    Compact,
    /// Jalali `YYYYMMDDHHMMSS`.
    Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarKind {
    Jalali,
    Gregorian,
}

/// Errors for the finance-side date math. The messages are the
/// user-facing Persian strings the UI shows verbatim.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DateError {
    #[error("تاریخ نامعتبر است: {0}")]
    InvalidDate(String),
    #[error("تاریخ پایان نمی‌تواند قبل از تاریخ شروع باشد")]
    EndBeforeStart,
    #[error("تعداد اقساط باید بزرگ‌تر از صفر باشد")]
    ZeroInstallments,
    #[error("نام بازه نسبی ناشناخته است: {0}")]
    UnknownRelative(String),
}

#[derive(Debug, Default)]
pub struct ValidateOptions {
    pub skip_range_check: bool,
    pub min_year: Option<i32>,
    pub max_year: Option<i32>,
}

/// Structured validation result. `valid == false` always carries a
/// Persian `error` string; the remaining fields are Jalali-flavored
/// regardless of the input calendar.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateValidation {
    pub valid: bool,
    pub error: Option<String>,
    /// Normalized Jalali display form.
    pub date: Option<String>,
    pub calendar: Option<CalendarKind>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub month_name: Option<&'static str>,
    pub weekday: Option<u32>,
    pub weekday_name: Option<&'static str>,
    pub is_holiday: bool,
}

impl DateValidation {
    fn failure(error: String) -> Self {
        Self {
            valid: false,
            error: Some(error),
            date: None,
            calendar: None,
            year: None,
            month: None,
            day: None,
            month_name: None,
            weekday: None,
            weekday_name: None,
            is_holiday: false,
        }
    }

    /// The validated date, when `valid` (always Jalali).
    pub fn jalali(&self) -> Option<JalaliDate> {
        match (self.year, self.month, self.day) {
            (Some(y), Some(m), Some(d)) if self.valid => JalaliDate::new(y, m, d),
            _ => None,
        }
    }
}

static SLASH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})/(\d{1,2})/(\d{1,2})$").expect("valid pattern"));
static DASH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})$").expect("valid pattern"));
static COMPACT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{8}$").expect("valid pattern"));
static TIMESTAMP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{14}$").expect("valid pattern"));

/// Memoized normalization results, keyed by raw input plus target format.
static NORMALIZE_CACHE: Lazy<Mutex<HashMap<(String, Option<DateFormat>), String>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

const NORMALIZE_CACHE_CAP: usize = 4096;

/// Fold Persian (۰..۹) and Arabic-Indic (٠..٩) digits to ASCII.
pub fn fold_digits(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '\u{06F0}'..='\u{06F9}' => char::from(b'0' + (c as u32 - 0x06F0) as u8),
            '\u{0660}'..='\u{0669}' => char::from(b'0' + (c as u32 - 0x0660) as u8),
            _ => c,
        })
        .collect()
}

/// Pattern-match the cleaned input against the known wire forms.
/// Returns the cleaned string and `None` when nothing matches; never fails.
pub fn detect_format(input: &str) -> (String, Option<DateFormat>) {
    let cleaned = fold_digits(input.trim());
    // A trailing time part ("YYYY-MM-DD HH:MM:SS") does not change the
    // detected date format.
    let candidate = cleaned.split_whitespace().next().unwrap_or("");
    let format = if SLASH_RE.is_match(candidate) {
        Some(DateFormat::Display)
    } else if DASH_RE.is_match(candidate) {
        Some(DateFormat::Database)
    } else if COMPACT_RE.is_match(candidate) {
        Some(DateFormat::Compact)
    } else if TIMESTAMP_RE.is_match(candidate) {
        Some(DateFormat::Timestamp)
    } else {
        None
    };
    (cleaned, format)
}

/// Split a detected date string into raw (year, month, day) parts.
fn split_parts(cleaned: &str, format: DateFormat) -> Option<(i32, u32, u32)> {
    let candidate = cleaned.split_whitespace().next()?;
    let caps = match format {
        DateFormat::Display => SLASH_RE.captures(candidate)?,
        DateFormat::Database => DASH_RE.captures(candidate)?,
        DateFormat::Compact | DateFormat::Timestamp => {
            let y = candidate.get(0..4)?.parse().ok()?;
            let m = candidate.get(4..6)?.parse().ok()?;
            let d = candidate.get(6..8)?.parse().ok()?;
            return Some((y, m, d));
        }
    };
    Some((
        caps[1].parse().ok()?,
        caps[2].parse().ok()?,
        caps[3].parse().ok()?,
    ))
}

/// Resolve raw parts into a Jalali date, applying the year-magnitude
/// heuristic: above [`JALALI_MAX_YEAR`] the parts are Gregorian.
fn resolve_to_jalali(year: i32, month: u32, day: u32) -> Option<(JalaliDate, CalendarKind)> {
    if year > JALALI_MAX_YEAR {
        let g = NaiveDate::from_ymd_opt(year, month, day)?;
        Some((JalaliDate::from_gregorian(g), CalendarKind::Gregorian))
    } else {
        Some((JalaliDate::new(year, month, day)?, CalendarKind::Jalali))
    }
}

/// Render a Jalali date into a wire form.
pub fn render(date: &JalaliDate, format: DateFormat) -> String {
    match format {
        DateFormat::Display => date.to_string(),
        DateFormat::Database => date.to_gregorian().format("%Y-%m-%d").to_string(),
        DateFormat::Compact => format!("{:04}{:02}{:02}", date.year, date.month, date.day),
        DateFormat::Timestamp => {
            format!("{:04}{:02}{:02}000000", date.year, date.month, date.day)
        }
    }
}

/// Normalize an arbitrary date string into `target` (Jalali display form by
/// default). On any parse failure the cleaned input is echoed back
/// unchanged; callers treat an unrecognized echo as the failure signal.
pub fn normalize(input: &str, target: Option<DateFormat>) -> String {
    let key = (input.to_string(), target);
    if let Ok(cache) = NORMALIZE_CACHE.lock() {
        if let Some(hit) = cache.get(&key) {
            return hit.clone();
        }
    }

    let (cleaned, detected) = detect_format(input);
    let result = match detected
        .and_then(|f| split_parts(&cleaned, f))
        .and_then(|(y, m, d)| resolve_to_jalali(y, m, d))
    {
        Some((date, _)) => render(&date, target.unwrap_or(DateFormat::Display)),
        None => cleaned,
    };

    if let Ok(mut cache) = NORMALIZE_CACHE.lock() {
        if cache.len() >= NORMALIZE_CACHE_CAP {
            cache.clear();
        }
        cache.insert(key, result.clone());
    }
    result
}

/// The canonical validator. Detects the calendar by year magnitude,
/// checks calendar-correct day bounds (including the leap-year Esfand) and
/// reports a Persian error string for every rejection branch. The result
/// fields are always Jalali-flavored, also for Gregorian input.
pub fn validate_extended(input: &str, options: &ValidateOptions) -> DateValidation {
    let min_year = options.min_year.unwrap_or(JALALI_MIN_YEAR);
    let max_year = options.max_year.unwrap_or(JALALI_MAX_YEAR);

    let (cleaned, detected) = detect_format(input);
    if cleaned.is_empty() {
        return DateValidation::failure("تاریخ وارد نشده است".to_string());
    }
    let Some(format) = detected else {
        return DateValidation::failure(format!("فرمت تاریخ قابل تشخیص نیست: {cleaned}"));
    };
    let Some((year, month, day)) = split_parts(&cleaned, format) else {
        return DateValidation::failure(format!("فرمت تاریخ نامعتبر است: {cleaned}"));
    };

    let (date, calendar) = if (JALALI_MIN_YEAR..=JALALI_MAX_YEAR).contains(&year) {
        if !options.skip_range_check && !(min_year..=max_year).contains(&year) {
            return DateValidation::failure(format!(
                "سال باید بین {min_year} و {max_year} باشد"
            ));
        }
        if !(1..=12).contains(&month) {
            return DateValidation::failure("ماه باید بین 1 و 12 باشد".to_string());
        }
        let max_day = JalaliDate::days_in_month(year, month);
        if day == 0 || day > max_day {
            return DateValidation::failure(format!("روز باید بین 1 و {max_day} باشد"));
        }
        // Bounds were just checked.
        match JalaliDate::new(year, month, day) {
            Some(d) => (d, CalendarKind::Jalali),
            None => return DateValidation::failure("تاریخ شمسی نامعتبر است".to_string()),
        }
    } else {
        let Some(g) = NaiveDate::from_ymd_opt(year, month, day) else {
            return DateValidation::failure("تاریخ میلادی نامعتبر است".to_string());
        };
        (JalaliDate::from_gregorian(g), CalendarKind::Gregorian)
    };

    DateValidation {
        valid: true,
        error: None,
        date: Some(date.to_string()),
        calendar: Some(calendar),
        year: Some(date.year),
        month: Some(date.month),
        day: Some(date.day),
        month_name: Some(date.month_name()),
        weekday: Some(date.weekday()),
        weekday_name: Some(date.weekday_name()),
        is_holiday: finance::is_holiday(&date),
    }
}

/// Convert a date string into `target`. On invalid input the original
/// string is returned unchanged — callers must treat an unchanged echo as
/// the conversion-failure signal. `source` is an optional hint that skips
/// format detection.
pub fn convert(input: &str, target: DateFormat, source: Option<DateFormat>) -> String {
    let (cleaned, detected) = detect_format(input);
    let format = match source.or(detected) {
        Some(f) => f,
        None => return input.to_string(),
    };
    match split_parts(&cleaned, format).and_then(|(y, m, d)| resolve_to_jalali(y, m, d)) {
        Some((date, _)) => render(&date, target),
        None => input.to_string(),
    }
}

/// Parse a date string into a [`JalaliDate`], for the finance layer.
pub(crate) fn parse_jalali(input: &str) -> Result<JalaliDate, DateError> {
    let validation = validate_extended(
        input,
        &ValidateOptions {
            skip_range_check: true,
            ..Default::default()
        },
    );
    validation
        .jalali()
        .ok_or_else(|| DateError::InvalidDate(input.to_string()))
}
