// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::calendar::{
    DateRange, PickerDate, days_in_month, first_weekday_of_month, shift_month,
};

pub const GRID_WEEKS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Endpoint {
    Start,
    End,
}

impl Endpoint {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
        }
    }
}

/// Range selection behind the history date picker.
///
/// A press never produces an inverted range: depending on where the pressed
/// day falls it moves whichever bound keeps `start <= end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRangePicker {
    active: Endpoint,
    start: PickerDate,
    end: PickerDate,
    view_year: i32,
    view_month: u8,
}

impl DateRangePicker {
    pub fn new(today: PickerDate, start: Option<PickerDate>, end: Option<PickerDate>) -> Self {
        let range = DateRange::ordered(start.unwrap_or(today), end.unwrap_or(today));
        Self {
            active: Endpoint::Start,
            start: range.start(),
            end: range.end(),
            view_year: range.end().year,
            view_month: range.end().month,
        }
    }

    pub fn from_range(range: DateRange) -> Self {
        Self {
            active: Endpoint::Start,
            start: range.start(),
            end: range.end(),
            view_year: range.end().year,
            view_month: range.end().month,
        }
    }

    pub const fn active(&self) -> Endpoint {
        self.active
    }

    pub const fn start(&self) -> PickerDate {
        self.start
    }

    pub const fn end(&self) -> PickerDate {
        self.end
    }

    pub const fn view(&self) -> (i32, u8) {
        (self.view_year, self.view_month)
    }

    pub fn set_active(&mut self, endpoint: Endpoint) {
        self.active = endpoint;
        let focus = match endpoint {
            Endpoint::Start => self.start,
            Endpoint::End => self.end,
        };
        self.view_year = focus.year;
        self.view_month = focus.month;
    }

    pub fn toggle_active(&mut self) {
        let next = match self.active {
            Endpoint::Start => Endpoint::End,
            Endpoint::End => Endpoint::Start,
        };
        self.set_active(next);
    }

    pub fn press(&mut self, day: PickerDate) {
        if self.active == Endpoint::End && self.start.is_on_or_before(&day) {
            self.end = day;
        } else if day.is_on_or_before(&self.end) {
            self.start = day;
        } else {
            self.end = day;
        }
    }

    pub fn next_month(&mut self) {
        (self.view_year, self.view_month) = shift_month(self.view_year, self.view_month, 1);
    }

    pub fn prev_month(&mut self) {
        (self.view_year, self.view_month) = shift_month(self.view_year, self.view_month, -1);
    }

    pub fn show_month(&mut self, year: i32, month: u8) {
        self.view_year = year;
        self.view_month = month.clamp(1, 12);
    }

    pub fn range(&self) -> DateRange {
        DateRange::ordered(self.start, self.end)
    }

    pub fn in_range(&self, day: PickerDate) -> bool {
        self.range().contains(day)
    }

    /// Weeks of the displayed month, Monday first. Cells outside the month are
    /// `None`.
    pub fn month_grid(&self) -> [[Option<u8>; 7]; GRID_WEEKS] {
        month_grid(self.view_year, self.view_month)
    }

    /// Final range for the caller, with neither bound later than `today`.
    pub fn confirm(&self, today: PickerDate) -> DateRange {
        let clamp = |date: PickerDate| {
            if date.is_on_or_before(&today) {
                date
            } else {
                today
            }
        };
        DateRange::ordered(clamp(self.start), clamp(self.end))
    }
}

pub fn month_grid(year: i32, month: u8) -> [[Option<u8>; 7]; GRID_WEEKS] {
    let mut grid = [[None; 7]; GRID_WEEKS];
    let offset = usize::from(first_weekday_of_month(year, month));
    for day in 1..=days_in_month(year, month) {
        let cell = offset + usize::from(day) - 1;
        if let Some(week) = grid.get_mut(cell / 7) {
            week[cell % 7] = Some(day);
        }
    }
    grid
}

#[cfg(test)]
mod tests {
    use super::{DateRangePicker, Endpoint, month_grid};
    use crate::PickerDate;

    fn june(day: u8) -> PickerDate {
        PickerDate::new(day, 6, 2024)
    }

    #[test]
    fn bounds_default_to_today() {
        let picker = DateRangePicker::new(june(10), None, None);
        assert_eq!(picker.start(), june(10));
        assert_eq!(picker.end(), june(10));
        assert_eq!(picker.active(), Endpoint::Start);
        assert_eq!(picker.view(), (2024, 6));
    }

    #[test]
    fn supplied_bounds_are_kept_in_order() {
        let picker = DateRangePicker::new(june(20), Some(june(12)), Some(june(3)));
        assert_eq!(picker.start(), june(3));
        assert_eq!(picker.end(), june(12));
    }

    #[test]
    fn press_before_start_while_selecting_end_moves_start() {
        let mut picker = DateRangePicker::new(june(10), None, None);
        picker.set_active(Endpoint::End);

        picker.press(june(5));
        assert_eq!(picker.start(), june(5));
        assert_eq!(picker.end(), june(10));
    }

    #[test]
    fn press_after_start_while_selecting_end_extends_end() {
        let mut picker = DateRangePicker::new(june(10), Some(june(2)), None);
        picker.set_active(Endpoint::End);

        picker.press(june(4));
        assert_eq!(picker.start(), june(2));
        assert_eq!(picker.end(), june(4));

        picker.press(june(25));
        assert_eq!(picker.end(), june(25));
    }

    #[test]
    fn press_while_selecting_start_moves_start_within_range() {
        let mut picker = DateRangePicker::new(june(30), Some(june(1)), Some(june(20)));

        picker.press(june(7));
        assert_eq!(picker.start(), june(7));
        assert_eq!(picker.end(), june(20));
    }

    #[test]
    fn press_past_end_while_selecting_start_moves_end() {
        let mut picker = DateRangePicker::new(june(30), Some(june(1)), Some(june(20)));

        picker.press(june(25));
        assert_eq!(picker.start(), june(1));
        assert_eq!(picker.end(), june(25));
    }

    #[test]
    fn range_stays_ordered_across_press_sequences() {
        let presses = [28, 3, 17, 1, 30, 15, 15, 2];
        for endpoint in [Endpoint::Start, Endpoint::End] {
            let mut picker = DateRangePicker::new(june(10), None, None);
            for (index, day) in presses.iter().enumerate() {
                if index % 3 == 0 {
                    picker.set_active(endpoint);
                } else {
                    picker.toggle_active();
                }
                picker.press(june(*day));
                assert!(picker.start() <= picker.end(), "after pressing {day}");
            }
        }
    }

    #[test]
    fn confirm_clamps_future_bounds_to_today() {
        let today = june(10);
        let mut picker = DateRangePicker::new(today, Some(june(8)), None);
        picker.set_active(Endpoint::End);
        picker.press(june(24));

        let range = picker.confirm(today);
        assert_eq!(range.start(), june(8));
        assert_eq!(range.end(), today);

        let future = DateRangePicker::new(today, Some(june(20)), Some(june(22)));
        let clamped = future.confirm(today);
        assert_eq!(clamped.start(), today);
        assert_eq!(clamped.end(), today);
    }

    #[test]
    fn month_navigation_wraps_years() {
        let mut picker = DateRangePicker::new(PickerDate::new(15, 12, 2024), None, None);
        picker.next_month();
        assert_eq!(picker.view(), (2025, 1));
        picker.prev_month();
        picker.prev_month();
        assert_eq!(picker.view(), (2024, 11));
    }

    #[test]
    fn grid_places_first_day_on_its_weekday() {
        // January 2024 starts on a Monday.
        let january = month_grid(2024, 1);
        assert_eq!(january[0][0], Some(1));
        assert_eq!(january[4][2], Some(31));
        assert_eq!(january[4][3], None);

        // September 2024 starts on a Sunday and needs six rows.
        let september = month_grid(2024, 9);
        assert_eq!(september[0][5], None);
        assert_eq!(september[0][6], Some(1));
        assert_eq!(september[5][0], Some(30));
    }
}
