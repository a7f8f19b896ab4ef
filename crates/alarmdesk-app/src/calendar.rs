// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Calendar arithmetic over plain `day month year` triples.
//!
//! The picker works on [`PickerDate`] rather than timestamps so that every
//! comparison is explicit and there is no time-of-day component to leak in.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use time::{Date, Month, OffsetDateTime, UtcOffset};

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PickerDate {
    pub day: u8,
    pub month: u8,
    pub year: i32,
}

impl PickerDate {
    pub const fn new(day: u8, month: u8, year: i32) -> Self {
        Self { day, month, year }
    }

    /// Builds a date from raw text-input fields, pulling each component into
    /// its valid range instead of rejecting it.
    pub fn clamped(day: u32, month: u32, year: i32) -> Self {
        let month = month.clamp(1, 12) as u8;
        let max_day = u32::from(days_in_month(year, month));
        let day = day.clamp(1, max_day) as u8;
        Self { day, month, year }
    }

    pub fn is_on_or_before(&self, other: &Self) -> bool {
        if self.year != other.year {
            return self.year < other.year;
        }
        if self.month != other.month {
            return self.month < other.month;
        }
        self.day <= other.day
    }

    pub fn format(&self) -> String {
        format!("{} {} {}", self.day, month_abbreviation(self.month), self.year)
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split_whitespace();
        let day = parts.next()?.parse::<u8>().ok()?;
        let month_label = parts.next()?;
        let year = parts.next()?.parse::<i32>().ok()?;
        if parts.next().is_some() {
            return None;
        }

        let month = MONTH_ABBREVIATIONS
            .iter()
            .position(|label| label.eq_ignore_ascii_case(month_label))
            .map(|index| (index + 1) as u8)?;
        if day == 0 || day > days_in_month(year, month) {
            return None;
        }
        Some(Self { day, month, year })
    }

    pub fn to_date(self) -> Option<Date> {
        let month = Month::try_from(self.month).ok()?;
        Date::from_calendar_date(self.year, month, self.day).ok()
    }
}

impl Ord for PickerDate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.year
            .cmp(&other.year)
            .then(self.month.cmp(&other.month))
            .then(self.day.cmp(&other.day))
    }
}

impl PartialOrd for PickerDate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<Date> for PickerDate {
    fn from(value: Date) -> Self {
        Self {
            day: value.day(),
            month: u8::from(value.month()),
            year: value.year(),
        }
    }
}

impl fmt::Display for PickerDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

/// Inclusive date span with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawDateRange")]
pub struct DateRange {
    start: PickerDate,
    end: PickerDate,
}

#[derive(Deserialize)]
struct RawDateRange {
    start: PickerDate,
    end: PickerDate,
}

impl TryFrom<RawDateRange> for DateRange {
    type Error = String;

    fn try_from(raw: RawDateRange) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end)
            .ok_or_else(|| format!("date range has start after end ({} - {})", raw.start, raw.end))
    }
}

impl DateRange {
    pub fn new(start: PickerDate, end: PickerDate) -> Option<Self> {
        start.is_on_or_before(&end).then_some(Self { start, end })
    }

    pub fn ordered(first: PickerDate, second: PickerDate) -> Self {
        if first.is_on_or_before(&second) {
            Self {
                start: first,
                end: second,
            }
        } else {
            Self {
                start: second,
                end: first,
            }
        }
    }

    pub const fn single(date: PickerDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    /// The `days` most recent days ending at `today`, inclusive.
    pub fn trailing_days(today: PickerDate, days: u16) -> Self {
        let back = time::Duration::days(i64::from(days.saturating_sub(1)));
        let start = today
            .to_date()
            .and_then(|date| date.checked_sub(back))
            .map_or(today, PickerDate::from);
        Self::ordered(start, today)
    }

    pub const fn start(&self) -> PickerDate {
        self.start
    }

    pub const fn end(&self) -> PickerDate {
        self.end
    }

    pub fn contains(&self, date: PickerDate) -> bool {
        self.start.is_on_or_before(&date) && date.is_on_or_before(&self.end)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.start, self.end)
    }
}

pub fn days_in_month(year: i32, month: u8) -> u8 {
    match month.clamp(1, 12) {
        2 if time::util::is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Weekday of the 1st of the month, 0 = Monday through 6 = Sunday.
pub fn first_weekday_of_month(year: i32, month: u8) -> u8 {
    let Some(first) = PickerDate::new(1, month, year).to_date() else {
        return 0;
    };
    match first.weekday().number_days_from_sunday() {
        0 => 6,
        native => native - 1,
    }
}

pub fn month_abbreviation(month: u8) -> &'static str {
    usize::from(month)
        .checked_sub(1)
        .and_then(|index| MONTH_ABBREVIATIONS.get(index))
        .copied()
        .unwrap_or("???")
}

pub fn month_name(month: u8) -> &'static str {
    match Month::try_from(month) {
        Ok(Month::January) => "January",
        Ok(Month::February) => "February",
        Ok(Month::March) => "March",
        Ok(Month::April) => "April",
        Ok(Month::May) => "May",
        Ok(Month::June) => "June",
        Ok(Month::July) => "July",
        Ok(Month::August) => "August",
        Ok(Month::September) => "September",
        Ok(Month::October) => "October",
        Ok(Month::November) => "November",
        Ok(Month::December) => "December",
        Err(_) => "?",
    }
}

/// Moves a `(year, month)` page by `delta` months.
pub fn shift_month(year: i32, month: u8, delta: i32) -> (i32, u8) {
    let total = i32::from(month.clamp(1, 12)) - 1 + delta;
    (year + total.div_euclid(12), (total.rem_euclid(12) + 1) as u8)
}

/// The local UTC offset, or UTC when it cannot be determined. `time` refuses
/// to read the local offset once other threads exist, so call this at startup
/// and carry the result.
pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

pub fn today(offset_days: i64) -> PickerDate {
    today_at(local_offset(), offset_days)
}

pub fn today_at(utc_offset: UtcOffset, offset_days: i64) -> PickerDate {
    today_from(OffsetDateTime::now_utc().to_offset(utc_offset).date(), offset_days)
}

/// Shifts `now` by `offset_days`, crossing at most one month boundary:
/// overshooting the month lands on the 1st of the next month, undershooting
/// lands on the last day of the previous one.
pub fn today_from(now: Date, offset_days: i64) -> PickerDate {
    let origin = PickerDate::from(now);
    let length = i64::from(days_in_month(origin.year, origin.month));
    let shifted = i64::from(origin.day)
        .checked_add(offset_days)
        .unwrap_or(if offset_days > 0 { i64::MAX } else { i64::MIN });

    if shifted > length {
        let (year, month) = shift_month(origin.year, origin.month, 1);
        PickerDate::new(1, month, year)
    } else if shifted < 1 {
        let (year, month) = shift_month(origin.year, origin.month, -1);
        PickerDate::new(days_in_month(year, month), month, year)
    } else {
        PickerDate::new(shifted as u8, origin.month, origin.year)
    }
}
