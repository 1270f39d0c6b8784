//! Jalali (Shamsi) calendar arithmetic
//!
//! Conversion between the Persian solar calendar and the proleptic Gregorian
//! calendar using the break-years algorithm (the same arithmetic the jalaali
//! family of libraries implements). Month lengths: 31 days for Farvardin
//! through Shahrivar, 30 for Mehr through Bahman, and 29 or 30 for Esfand
//! depending on the leap year.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Years in which the length of the 33-year leap cycle changes.
const BREAKS: [i32; 20] = [
    -61, 9, 38, 199, 426, 686, 756, 818, 1111, 1181, 1210, 1635, 2060, 2097, 2192, 2262, 2324,
    2394, 2456, 3178,
];

/// Julian day number of 0001-01-01 in the proleptic Gregorian calendar,
/// minus one (so that `jdn = days_from_ce + JDN_OFFSET`).
const JDN_OFFSET: i64 = 1_721_425;

pub const MONTH_NAMES: [&str; 12] = [
    "فروردین",
    "اردیبهشت",
    "خرداد",
    "تیر",
    "مرداد",
    "شهریور",
    "مهر",
    "آبان",
    "آذر",
    "دی",
    "بهمن",
    "اسفند",
];

/// Weekday names, Saturday first (weekday index 0..=6, Friday = 6).
pub const WEEKDAY_NAMES: [&str; 7] = [
    "شنبه",
    "یکشنبه",
    "دوشنبه",
    "سه‌شنبه",
    "چهارشنبه",
    "پنجشنبه",
    "جمعه",
];

/// A date in the Jalali calendar.
///
/// Field order gives chronological `Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JalaliDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

/// Leap flag, Gregorian year and the March day of 1 Farvardin for a
/// Jalali year. `leap == 0` means the year is a leap year.
fn jal_cal(jy: i32) -> (i32, i32, i32) {
    let gy = jy + 621;
    let mut leap_j = -14;
    let mut jp = BREAKS[0];
    let mut jump = 0;
    for &jm in &BREAKS[1..] {
        jump = jm - jp;
        if jy < jm {
            break;
        }
        leap_j += jump / 33 * 8 + jump % 33 / 4;
        jp = jm;
    }
    let mut n = jy - jp;
    leap_j += n / 33 * 8 + (n % 33 + 3) / 4;
    if jump % 33 == 4 && jump - n == 4 {
        leap_j += 1;
    }
    let leap_g = gy / 4 - (gy / 100 + 1) * 3 / 4 - 150;
    let march = 20 + leap_j - leap_g;
    if jump - n < 6 {
        n = n - jump + (jump + 4) / 33 * 33;
    }
    let mut leap = ((n + 1) % 33 - 1) % 4;
    if leap == -1 {
        leap = 4;
    }
    (leap, gy, march)
}

fn jdn_of(date: NaiveDate) -> i64 {
    date.num_days_from_ce() as i64 + JDN_OFFSET
}

/// Julian day number of 1 Farvardin of the given Jalali year.
fn first_of_year_jdn(jy: i32) -> i64 {
    let (_, gy, march) = jal_cal(jy);
    // The vernal equinox always lands on a valid March day.
    jdn_of(NaiveDate::from_ymd_opt(gy, 3, march as u32).expect("equinox day is a valid date"))
}

impl JalaliDate {
    /// Build a date, rejecting out-of-calendar month/day combinations.
    pub fn new(year: i32, month: u32, day: u32) -> Option<Self> {
        if !(1..=12).contains(&month) || day == 0 || day > Self::days_in_month(year, month) {
            return None;
        }
        Some(Self { year, month, day })
    }

    /// True if the Jalali year has a 30-day Esfand.
    pub fn is_leap_year(year: i32) -> bool {
        jal_cal(year).0 == 0
    }

    pub fn days_in_month(year: i32, month: u32) -> u32 {
        match month {
            1..=6 => 31,
            7..=11 => 30,
            12 => {
                if Self::is_leap_year(year) {
                    30
                } else {
                    29
                }
            }
            _ => 0,
        }
    }

    pub fn from_gregorian(date: NaiveDate) -> Self {
        let jdn = jdn_of(date);
        let mut jy = date.year() - 621;
        let (leap, _, _) = jal_cal(jy);
        let mut k = jdn - first_of_year_jdn(jy);
        if k >= 0 {
            if k <= 185 {
                return Self {
                    year: jy,
                    month: 1 + (k / 31) as u32,
                    day: (k % 31) as u32 + 1,
                };
            }
            k -= 186;
        } else {
            jy -= 1;
            k += 179;
            if leap == 1 {
                k += 1;
            }
        }
        Self {
            year: jy,
            month: 7 + (k / 30) as u32,
            day: (k % 30) as u32 + 1,
        }
    }

    pub fn to_gregorian(&self) -> NaiveDate {
        let m = self.month as i64;
        let jdn =
            first_of_year_jdn(self.year) + (m - 1) * 31 - m / 7 * (m - 7) + self.day as i64 - 1;
        NaiveDate::from_num_days_from_ce_opt((jdn - JDN_OFFSET) as i32)
            .expect("Jalali date maps into chrono's range")
    }

    pub fn today() -> Self {
        Self::from_gregorian(chrono::Local::now().date_naive())
    }

    /// Weekday with Saturday = 0 .. Friday = 6.
    pub fn weekday(&self) -> u32 {
        (self.to_gregorian().weekday().num_days_from_sunday() + 1) % 7
    }

    pub fn weekday_name(&self) -> &'static str {
        WEEKDAY_NAMES[self.weekday() as usize]
    }

    pub fn month_name(&self) -> &'static str {
        MONTH_NAMES[(self.month - 1) as usize]
    }

    pub fn first_of_month(&self) -> Self {
        Self {
            day: 1,
            ..*self
        }
    }

    pub fn last_of_month(&self) -> Self {
        Self {
            day: Self::days_in_month(self.year, self.month),
            ..*self
        }
    }

    /// Offset by whole days (Gregorian day arithmetic).
    pub fn add_days(&self, days: i64) -> Self {
        Self::from_gregorian(self.to_gregorian() + Duration::days(days))
    }
}

impl fmt::Display for JalaliDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}/{:02}/{:02}", self.year, self.month, self.day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_equinox() {
        // 1 Farvardin 1403 fell on 2024-03-20.
        let j = JalaliDate::new(1403, 1, 1).unwrap();
        assert_eq!(j.to_gregorian(), NaiveDate::from_ymd_opt(2024, 3, 20).unwrap());
        let back = JalaliDate::from_gregorian(NaiveDate::from_ymd_opt(2024, 3, 20).unwrap());
        assert_eq!(back, j);

        // 1 Farvardin 1402 fell on 2023-03-21.
        let j = JalaliDate::new(1402, 1, 1).unwrap();
        assert_eq!(j.to_gregorian(), NaiveDate::from_ymd_opt(2023, 3, 21).unwrap());
    }

    #[test]
    fn test_leap_years() {
        assert!(JalaliDate::is_leap_year(1403));
        assert!(JalaliDate::is_leap_year(1399));
        assert!(!JalaliDate::is_leap_year(1400));
        assert!(!JalaliDate::is_leap_year(1401));
        assert!(!JalaliDate::is_leap_year(1402));
        assert!(!JalaliDate::is_leap_year(1404));
    }

    #[test]
    fn test_esfand_length() {
        assert_eq!(JalaliDate::days_in_month(1403, 12), 30);
        assert_eq!(JalaliDate::days_in_month(1402, 12), 29);
        assert_eq!(JalaliDate::days_in_month(1403, 6), 31);
        assert_eq!(JalaliDate::days_in_month(1403, 7), 30);
    }

    #[test]
    fn test_roundtrip_range() {
        // Every day of two full Jalali years survives the round trip.
        for year in [1402, 1403] {
            for month in 1..=12 {
                for day in 1..=JalaliDate::days_in_month(year, month) {
                    let j = JalaliDate::new(year, month, day).unwrap();
                    assert_eq!(JalaliDate::from_gregorian(j.to_gregorian()), j);
                }
            }
        }
    }

    #[test]
    fn test_gregorian_roundtrip() {
        let mut d = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        while d < end {
            let j = JalaliDate::from_gregorian(d);
            assert_eq!(j.to_gregorian(), d, "round trip failed for {}", d);
            d += Duration::days(1);
        }
    }

    #[test]
    fn test_weekday() {
        // 2024-03-20 was a Wednesday; in the Jalali week that is index 4.
        let j = JalaliDate::new(1403, 1, 1).unwrap();
        assert_eq!(j.weekday(), 4);
        assert_eq!(j.weekday_name(), "چهارشنبه");
        // 2024-03-22 was a Friday.
        let j = JalaliDate::new(1403, 1, 3).unwrap();
        assert_eq!(j.weekday(), 6);
        assert_eq!(j.weekday_name(), "جمعه");
    }

    #[test]
    fn test_new_rejects_invalid() {
        assert!(JalaliDate::new(1403, 0, 1).is_none());
        assert!(JalaliDate::new(1403, 13, 1).is_none());
        assert!(JalaliDate::new(1402, 12, 30).is_none());
        assert!(JalaliDate::new(1403, 12, 30).is_some());
        assert!(JalaliDate::new(1403, 7, 31).is_none());
    }

    #[test]
    fn test_display() {
        let j = JalaliDate::new(1403, 2, 5).unwrap();
        assert_eq!(j.to_string(), "1403/02/05");
    }

    #[test]
    fn test_add_days_crosses_year() {
        let j = JalaliDate::new(1402, 12, 29).unwrap();
        assert_eq!(j.add_days(1), JalaliDate::new(1403, 1, 1).unwrap());
        assert_eq!(j.add_days(-1), JalaliDate::new(1402, 12, 28).unwrap());
    }
}
