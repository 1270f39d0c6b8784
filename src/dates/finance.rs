//! Finance-specific date arithmetic
//!
//! Due dates, installment schedules, simple daily-rate interest,
//! relative-date resolution against a configurable financial year, and
//! working-day math over the fixed Iranian holiday table.
//!
//! All day offsets are applied in Gregorian day arithmetic and rendered
//! back as Jalali, matching how the stored (Gregorian) dates move.

use super::{parse_jalali, DateError};
use crate::jalali::JalaliDate;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Fixed national holidays as (month, day, name). The religious holidays
/// that shift with the lunar calendar are intentionally absent; only the
/// year-stable entries are tracked.
pub const HOLIDAYS: [(u32, u32, &str); 10] = [
    (1, 1, "عید نوروز"),
    (1, 2, "عید نوروز"),
    (1, 3, "عید نوروز"),
    (1, 4, "عید نوروز"),
    (1, 12, "روز جمهوری اسلامی"),
    (1, 13, "روز طبیعت"),
    (3, 14, "رحلت امام خمینی"),
    (3, 15, "قیام ۱۵ خرداد"),
    (11, 22, "پیروزی انقلاب اسلامی"),
    (12, 29, "ملی شدن صنعت نفت"),
];

/// Friday as a Jalali weekday index.
pub const FRIDAY: u32 = 6;

/// Start of the financial year, default Farvardin 1.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FinancialYear {
    pub start_month: u32,
    pub start_day: u32,
}

impl Default for FinancialYear {
    fn default() -> Self {
        Self {
            start_month: 1,
            start_day: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelativeDate {
    Today,
    Yesterday,
    Tomorrow,
    FirstOfMonth,
    LastOfMonth,
    FirstOfYear,
    LastOfYear,
    FirstOfFinancialYear,
    LastOfFinancialYear,
}

impl FromStr for RelativeDate {
    type Err = DateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "today" => Ok(Self::Today),
            "yesterday" => Ok(Self::Yesterday),
            "tomorrow" => Ok(Self::Tomorrow),
            "first_of_month" => Ok(Self::FirstOfMonth),
            "last_of_month" => Ok(Self::LastOfMonth),
            "first_of_year" => Ok(Self::FirstOfYear),
            "last_of_year" => Ok(Self::LastOfYear),
            "first_of_financial_year" => Ok(Self::FirstOfFinancialYear),
            "last_of_financial_year" => Ok(Self::LastOfFinancialYear),
            other => Err(DateError::UnknownRelative(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DueDate {
    pub start_date: String,
    pub due_date: String,
    pub period_days: i64,
    pub grace_period: i64,
    pub is_overdue: bool,
    /// Signed; negative once the due date has passed.
    pub days_remaining: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Installment {
    pub number: u32,
    pub due_date: String,
    pub amount: f64,
    pub remaining_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interest {
    pub principal: f64,
    pub annual_rate: f64,
    pub days: i64,
    pub interest: f64,
    pub total: f64,
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_date: String,
    pub end_date: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HolidayEntry {
    pub date: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateReport {
    pub start_date: String,
    pub end_date: String,
    pub total_days: i64,
    pub working_days: i64,
    pub holiday_count: i64,
    pub holidays: Vec<HolidayEntry>,
}

/// Friday, or one of the fixed holidays — year-independent by design.
pub fn is_holiday(date: &JalaliDate) -> bool {
    if date.weekday() == FRIDAY {
        return true;
    }
    HOLIDAYS
        .iter()
        .any(|&(m, d, _)| m == date.month && d == date.day)
}

/// Name of the holiday a date falls on, Friday included.
pub fn holiday_name(date: &JalaliDate) -> Option<&'static str> {
    if let Some(&(_, _, name)) = HOLIDAYS
        .iter()
        .find(|&&(m, d, _)| m == date.month && d == date.day)
    {
        return Some(name);
    }
    if date.weekday() == FRIDAY {
        return Some("جمعه");
    }
    None
}

/// Due date after `period_days` plus `grace_period` days.
pub fn calculate_due_date(
    start_date: &str,
    period_days: i64,
    grace_period: i64,
) -> Result<DueDate, DateError> {
    let start = parse_jalali(start_date)?;
    let due_g = start.to_gregorian() + Duration::days(period_days + grace_period);
    let due = JalaliDate::from_gregorian(due_g);
    let today = JalaliDate::today().to_gregorian();
    Ok(DueDate {
        start_date: start.to_string(),
        due_date: due.to_string(),
        period_days,
        grace_period,
        is_overdue: today > due_g,
        days_remaining: (due_g - today).num_days(),
    })
}

/// Equal installments, due dates chained `interval_days` apart starting at
/// `start_date` itself. The per-installment amount is the naive
/// `total / count` division; the floating-point remainder is not
/// redistributed, so the last `remaining_amount` can drift off zero.
pub fn calculate_installments(
    start_date: &str,
    total_amount: f64,
    installment_count: u32,
    interval_days: i64,
) -> Result<Vec<Installment>, DateError> {
    if installment_count == 0 {
        return Err(DateError::ZeroInstallments);
    }
    let start = parse_jalali(start_date)?;
    let amount = total_amount / installment_count as f64;

    let mut schedule = Vec::with_capacity(installment_count as usize);
    let mut due = start.to_gregorian();
    for number in 1..=installment_count {
        schedule.push(Installment {
            number,
            due_date: JalaliDate::from_gregorian(due).to_string(),
            amount,
            remaining_amount: total_amount - amount * number as f64,
        });
        due += Duration::days(interval_days);
    }
    Ok(schedule)
}

/// Simple daily interest: `principal * (annual_rate / 36500) * days`.
/// `end_date` defaults to today.
pub fn calculate_interest(
    principal: f64,
    start_date: &str,
    end_date: Option<&str>,
    annual_rate: f64,
) -> Result<Interest, DateError> {
    let start = parse_jalali(start_date)?;
    let end = match end_date {
        Some(s) => parse_jalali(s)?,
        None => JalaliDate::today(),
    };
    let days = (end.to_gregorian() - start.to_gregorian()).num_days();
    if days < 0 {
        return Err(DateError::EndBeforeStart);
    }
    let interest = principal * (annual_rate / 36500.0) * days as f64;
    Ok(Interest {
        principal,
        annual_rate,
        days,
        interest,
        total: principal + interest,
        start_date: start.to_string(),
        end_date: end.to_string(),
    })
}

/// First day of the financial year the given date falls in.
fn financial_year_start(date: &JalaliDate, fy: &FinancialYear) -> JalaliDate {
    let year = if (date.month, date.day) >= (fy.start_month, fy.start_day) {
        date.year
    } else {
        date.year - 1
    };
    let day = fy
        .start_day
        .min(JalaliDate::days_in_month(year, fy.start_month));
    JalaliDate {
        year,
        month: fy.start_month,
        day,
    }
}

/// Resolve a symbolic date against today.
pub fn relative_date(relative: RelativeDate, fy: &FinancialYear) -> JalaliDate {
    relative_to(JalaliDate::today(), relative, fy)
}

fn relative_to(today: JalaliDate, relative: RelativeDate, fy: &FinancialYear) -> JalaliDate {
    match relative {
        RelativeDate::Today => today,
        RelativeDate::Yesterday => today.add_days(-1),
        RelativeDate::Tomorrow => today.add_days(1),
        RelativeDate::FirstOfMonth => today.first_of_month(),
        RelativeDate::LastOfMonth => today.last_of_month(),
        RelativeDate::FirstOfYear => JalaliDate {
            year: today.year,
            month: 1,
            day: 1,
        },
        RelativeDate::LastOfYear => JalaliDate {
            year: today.year,
            month: 12,
            day: JalaliDate::days_in_month(today.year, 12),
        },
        RelativeDate::FirstOfFinancialYear => financial_year_start(&today, fy),
        RelativeDate::LastOfFinancialYear => {
            let start = financial_year_start(&today, fy);
            let next = JalaliDate {
                year: start.year + 1,
                ..start
            };
            next.add_days(-1)
        }
    }
}

/// Inclusive day count minus holidays.
pub fn working_days(start_date: &str, end_date: &str) -> Result<i64, DateError> {
    let start = parse_jalali(start_date)?;
    let end = parse_jalali(end_date)?;
    let start_g = start.to_gregorian();
    let end_g = end.to_gregorian();
    if end_g < start_g {
        return Err(DateError::EndBeforeStart);
    }
    let total = (end_g - start_g).num_days() + 1;
    let mut holidays = 0;
    let mut cursor = start_g;
    while cursor <= end_g {
        if is_holiday(&JalaliDate::from_gregorian(cursor)) {
            holidays += 1;
        }
        cursor += Duration::days(1);
    }
    Ok(total - holidays)
}

/// First and last day of a Jalali month, defaulting to the current one.
/// Esfand honors the leap-year rule.
pub fn month_range(year: Option<i32>, month: Option<u32>) -> Result<DateRange, DateError> {
    let today = JalaliDate::today();
    let year = year.unwrap_or(today.year);
    let month = month.unwrap_or(today.month);
    let start = JalaliDate::new(year, month, 1)
        .ok_or_else(|| DateError::InvalidDate(format!("{year}/{month}")))?;
    let end = start.last_of_month();
    Ok(DateRange {
        start_date: start.to_string(),
        end_date: end.to_string(),
        description: format!("{} {}", start.month_name(), year),
    })
}

/// Aggregate day counts plus the enumerated holidays for a range.
pub fn date_report(start_date: &str, end_date: &str) -> Result<DateReport, DateError> {
    let start = parse_jalali(start_date)?;
    let end = parse_jalali(end_date)?;
    let start_g = start.to_gregorian();
    let end_g = end.to_gregorian();
    if end_g < start_g {
        return Err(DateError::EndBeforeStart);
    }
    let total_days = (end_g - start_g).num_days() + 1;
    let mut holidays = Vec::new();
    let mut cursor = start_g;
    while cursor <= end_g {
        let date = JalaliDate::from_gregorian(cursor);
        if let Some(name) = holiday_name(&date) {
            holidays.push(HolidayEntry {
                date: date.to_string(),
                name: name.to_string(),
            });
        }
        cursor += Duration::days(1);
    }
    let holiday_count = holidays.len() as i64;
    Ok(DateReport {
        start_date: start.to_string(),
        end_date: end.to_string(),
        total_days,
        working_days: total_days - holiday_count,
        holiday_count,
        holidays,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_holidays_fixed_table() {
        for day in 1..=4 {
            assert!(is_holiday(&JalaliDate::new(1403, 1, day).unwrap()));
            assert!(is_holiday(&JalaliDate::new(1404, 1, day).unwrap()));
        }
        assert!(is_holiday(&JalaliDate::new(1403, 11, 22).unwrap()));
        // An ordinary working day: 1403/02/04 was a Tuesday.
        assert!(!is_holiday(&JalaliDate::new(1403, 2, 4).unwrap()));
    }

    #[test]
    fn test_friday_is_holiday() {
        // 1403/01/03 fell on a Friday (2024-03-22).
        let date = JalaliDate::new(1403, 1, 3).unwrap();
        assert_eq!(date.weekday(), FRIDAY);
        assert!(is_holiday(&date));
        // Named by the fixed table, not by the weekday.
        assert_eq!(holiday_name(&date), Some("عید نوروز"));
        // 1403/01/10 also a Friday, not in the table.
        let date = JalaliDate::new(1403, 1, 10).unwrap();
        assert_eq!(holiday_name(&date), Some("جمعه"));
    }

    #[test]
    fn test_due_date_zero_period() {
        let due = calculate_due_date("1403/01/01", 0, 0).unwrap();
        assert_eq!(due.due_date, "1403/01/01");
        assert_eq!(due.due_date, due.start_date);
    }

    #[test]
    fn test_due_date_gregorian_arithmetic() {
        let due = calculate_due_date("1403/01/01", 30, 0).unwrap();
        // 2024-03-20 + 30 days = 2024-04-19 = 1403/01/31.
        assert_eq!(due.due_date, "1403/01/31");
        let due = calculate_due_date("1403/01/01", 30, 5).unwrap();
        assert_eq!(due.due_date, "1403/02/05");
    }

    #[test]
    fn test_due_date_invalid_start() {
        assert!(matches!(
            calculate_due_date("bogus", 30, 0),
            Err(DateError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_installments_split() {
        let schedule = calculate_installments("1403/01/01", 1_000_000.0, 4, 30).unwrap();
        assert_eq!(schedule.len(), 4);
        for entry in &schedule {
            assert_eq!(entry.amount, 250_000.0);
        }
        assert_eq!(schedule[0].due_date, "1403/01/01");
        // Chained 30 Gregorian days apart.
        assert_eq!(schedule[1].due_date, "1403/01/31");
        assert_eq!(schedule[2].due_date, "1403/02/30");
        assert_eq!(schedule[3].due_date, "1403/03/29");
        assert_eq!(schedule[3].remaining_amount, 0.0);
    }

    #[test]
    fn test_installments_zero_count() {
        assert!(matches!(
            calculate_installments("1403/01/01", 100.0, 0, 30),
            Err(DateError::ZeroInstallments)
        ));
    }

    #[test]
    fn test_interest_simple_daily() {
        let result =
            calculate_interest(1_000_000.0, "1403/01/01", Some("1403/01/31"), 18.0).unwrap();
        assert_eq!(result.days, 30);
        let expected = 1_000_000.0 * (18.0 / 36500.0) * 30.0;
        assert!((result.interest - expected).abs() < 1e-6);
        assert!((result.total - (1_000_000.0 + expected)).abs() < 1e-6);
    }

    #[test]
    fn test_interest_end_before_start() {
        assert_eq!(
            calculate_interest(1000.0, "1403/02/01", Some("1403/01/01"), 18.0),
            Err(DateError::EndBeforeStart)
        );
    }

    #[test]
    fn test_relative_dates() {
        let today = JalaliDate::new(1403, 5, 15).unwrap();
        let fy = FinancialYear::default();
        assert_eq!(
            relative_to(today, RelativeDate::FirstOfMonth, &fy),
            JalaliDate::new(1403, 5, 1).unwrap()
        );
        assert_eq!(
            relative_to(today, RelativeDate::LastOfMonth, &fy),
            JalaliDate::new(1403, 5, 31).unwrap()
        );
        assert_eq!(
            relative_to(today, RelativeDate::FirstOfYear, &fy),
            JalaliDate::new(1403, 1, 1).unwrap()
        );
        assert_eq!(
            relative_to(today, RelativeDate::LastOfYear, &fy),
            JalaliDate::new(1403, 12, 30).unwrap()
        );
        assert_eq!(
            relative_to(today, RelativeDate::Yesterday, &fy),
            JalaliDate::new(1403, 5, 14).unwrap()
        );
    }

    #[test]
    fn test_financial_year_custom_start() {
        // Financial year starting 1 Mehr.
        let fy = FinancialYear {
            start_month: 7,
            start_day: 1,
        };
        let before = JalaliDate::new(1403, 5, 15).unwrap();
        assert_eq!(
            relative_to(before, RelativeDate::FirstOfFinancialYear, &fy),
            JalaliDate::new(1402, 7, 1).unwrap()
        );
        let after = JalaliDate::new(1403, 8, 1).unwrap();
        assert_eq!(
            relative_to(after, RelativeDate::FirstOfFinancialYear, &fy),
            JalaliDate::new(1403, 7, 1).unwrap()
        );
        assert_eq!(
            relative_to(after, RelativeDate::LastOfFinancialYear, &fy),
            JalaliDate::new(1404, 6, 31).unwrap()
        );
    }

    #[test]
    fn test_relative_date_parsing() {
        assert_eq!(
            "first_of_financial_year".parse::<RelativeDate>().unwrap(),
            RelativeDate::FirstOfFinancialYear
        );
        assert!(matches!(
            "next_week".parse::<RelativeDate>(),
            Err(DateError::UnknownRelative(_))
        ));
    }

    #[test]
    fn test_month_range_leap_esfand() {
        let range = month_range(Some(1403), Some(12)).unwrap();
        assert_eq!(range.end_date, "1403/12/30");
        let range = month_range(Some(1402), Some(12)).unwrap();
        assert_eq!(range.end_date, "1402/12/29");
        assert_eq!(range.start_date, "1402/12/01");
        assert!(range.description.contains("اسفند"));
    }

    #[test]
    fn test_working_days() {
        // Farvardin 1403: days 1..=7 contain Nowruz 1-4 plus no other
        // Friday outside it (the 3rd was Friday and already a holiday).
        let days = working_days("1403/01/01", "1403/01/07").unwrap();
        assert_eq!(days, 3);
        assert!(matches!(
            working_days("1403/01/07", "1403/01/01"),
            Err(DateError::EndBeforeStart)
        ));
    }

    #[test]
    fn test_date_report() {
        let report = date_report("1403/01/01", "1403/01/07").unwrap();
        assert_eq!(report.total_days, 7);
        assert_eq!(report.holiday_count, 4);
        assert_eq!(report.working_days, 3);
        assert_eq!(report.holidays[0].name, "عید نوروز");
    }
}
