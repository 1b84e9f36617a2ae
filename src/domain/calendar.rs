//! Calendar grid. Expands a session window into classified days and addressable cells.
//!
//! Holiday classification takes precedence over the weekly day off. Non-schedulable days
//! carry no cells (they render as one merged span) and cannot be selected.

use super::entities::{Cell, DayKind, Holiday, SessionWindow, SlotPosition};
use super::errors::{CellRejection, DomainError};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Recurring weekdays excluded from scheduling. Sunday by default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyOff {
    days: Vec<Weekday>,
}

impl WeeklyOff {
    pub fn new(days: impl IntoIterator<Item = Weekday>) -> Self {
        let mut unique: Vec<Weekday> = Vec::new();
        for day in days {
            if !unique.contains(&day) {
                unique.push(day);
            }
        }
        Self { days: unique }
    }

    pub fn sunday() -> Self {
        Self::new([Weekday::Sun])
    }

    /// No weekly day off.
    pub fn none() -> Self {
        Self { days: Vec::new() }
    }

    pub fn is_off(&self, date: NaiveDate) -> bool {
        self.days.contains(&date.weekday())
    }

    pub fn days(&self) -> &[Weekday] {
        &self.days
    }
}

impl Default for WeeklyOff {
    fn default() -> Self {
        Self::sunday()
    }
}

/// One row of the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridDay {
    pub date: NaiveDate,
    pub kind: DayKind,
    /// Four cells in slot order when schedulable, empty otherwise.
    pub cells: Vec<Cell>,
}

impl GridDay {
    pub fn is_schedulable(&self) -> bool {
        self.kind == DayKind::Schedulable
    }
}

/// Counts used for logging and display headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GridSummary {
    pub schedulable_days: usize,
    pub schedulable_cells: usize,
    pub holidays: usize,
    pub weekly_off_days: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarGrid {
    window: SessionWindow,
    days: Vec<GridDay>,
}

impl CalendarGrid {
    /// Build the grid for `window`. Dates iterate from start to end inclusive; an inverted
    /// window yields no days.
    pub fn generate(window: &SessionWindow, holidays: &[Holiday], weekly_off: &WeeklyOff) -> Self {
        let holiday_dates: HashSet<NaiveDate> = holidays.iter().map(|h| h.date).collect();

        let days = window
            .start_date
            .iter_days()
            .take_while(|d| *d <= window.end_date)
            .map(|date| {
                let kind = classify(date, &holiday_dates, weekly_off);
                let cells = if kind == DayKind::Schedulable {
                    SlotPosition::ALL
                        .iter()
                        .map(|&position| Cell {
                            date,
                            position,
                            slot: window.slot(position),
                        })
                        .collect()
                } else {
                    Vec::new()
                };
                GridDay { date, kind, cells }
            })
            .collect();

        Self {
            window: window.clone(),
            days,
        }
    }

    pub fn window(&self) -> &SessionWindow {
        &self.window
    }

    pub fn days(&self) -> &[GridDay] {
        &self.days
    }

    /// All schedulable cells in date then slot order.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.days.iter().flat_map(|d| d.cells.iter())
    }

    pub fn day(&self, date: NaiveDate) -> Option<&GridDay> {
        if !self.window.contains(date) {
            return None;
        }
        let offset = (date - self.window.start_date).num_days();
        usize::try_from(offset).ok().and_then(|i| self.days.get(i))
    }

    /// Precondition check for a user selection. Rejects holiday, weekly-off and
    /// out-of-window dates with `InvalidCell`.
    pub fn select(&self, date: NaiveDate, position: SlotPosition) -> Result<Cell, DomainError> {
        let day = self.day(date).ok_or(DomainError::InvalidCell {
            date,
            reason: CellRejection::OutsideSession,
        })?;
        match day.kind {
            DayKind::Schedulable => Ok(day.cells[position.index()]),
            DayKind::Holiday => Err(DomainError::InvalidCell {
                date,
                reason: CellRejection::Holiday,
            }),
            DayKind::WeeklyOff => Err(DomainError::InvalidCell {
                date,
                reason: CellRejection::WeeklyOff,
            }),
        }
    }

    pub fn summary(&self) -> GridSummary {
        self.days
            .iter()
            .fold(GridSummary::default(), |mut acc, day| {
                match day.kind {
                    DayKind::Schedulable => {
                        acc.schedulable_days += 1;
                        acc.schedulable_cells += day.cells.len();
                    }
                    DayKind::Holiday => acc.holidays += 1,
                    DayKind::WeeklyOff => acc.weekly_off_days += 1,
                }
                acc
            })
    }
}

fn classify(date: NaiveDate, holidays: &HashSet<NaiveDate>, weekly_off: &WeeklyOff) -> DayKind {
    if holidays.contains(&date) {
        DayKind::Holiday
    } else if weekly_off.is_off(date) {
        DayKind::WeeklyOff
    } else {
        DayKind::Schedulable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    /// Monday 2025-01-06 through Sunday 2025-01-12, holiday on Wednesday.
    fn one_week() -> (SessionWindow, Vec<Holiday>) {
        (
            SessionWindow::with_default_slots(d(2025, 1, 6), d(2025, 1, 12)),
            vec![Holiday::new(d(2025, 1, 8))],
        )
    }

    #[test]
    fn week_with_holiday_and_sunday() {
        let (window, holidays) = one_week();
        let grid = CalendarGrid::generate(&window, &holidays, &WeeklyOff::sunday());

        assert_eq!(
            grid.summary(),
            GridSummary {
                schedulable_days: 5,
                schedulable_cells: 20,
                holidays: 1,
                weekly_off_days: 1,
            }
        );
        assert_eq!(grid.days().len(), 7);
        assert_eq!(grid.day(d(2025, 1, 8)).unwrap().kind, DayKind::Holiday);
        assert!(grid.day(d(2025, 1, 8)).unwrap().cells.is_empty());
        assert_eq!(grid.day(d(2025, 1, 12)).unwrap().kind, DayKind::WeeklyOff);
        assert!(grid.day(d(2025, 1, 12)).unwrap().cells.is_empty());
    }

    #[test]
    fn cells_follow_date_then_slot_order() {
        let (window, holidays) = one_week();
        let grid = CalendarGrid::generate(&window, &holidays, &WeeklyOff::sunday());
        let cells: Vec<&Cell> = grid.cells().collect();
        assert_eq!(cells[0].date, d(2025, 1, 6));
        assert_eq!(cells[0].position, SlotPosition::Morning1);
        assert_eq!(cells[3].position, SlotPosition::Afternoon2);
        assert_eq!(cells[4].date, d(2025, 1, 7));
        assert_eq!(cells[8].date, d(2025, 1, 9));
    }

    #[test]
    fn holiday_wins_over_weekly_off() {
        let window = SessionWindow::with_default_slots(d(2025, 1, 12), d(2025, 1, 12));
        let grid = CalendarGrid::generate(
            &window,
            &[Holiday::new(d(2025, 1, 12))],
            &WeeklyOff::sunday(),
        );
        assert_eq!(grid.days()[0].kind, DayKind::Holiday);
    }

    #[test]
    fn never_marks_excluded_days_schedulable() {
        let window = SessionWindow::with_default_slots(d(2025, 1, 1), d(2025, 3, 31));
        let holidays = vec![Holiday::new(d(2025, 1, 1)), Holiday::new(d(2025, 3, 3))];
        let off = WeeklyOff::new([Weekday::Sat, Weekday::Sun]);
        let grid = CalendarGrid::generate(&window, &holidays, &off);
        for day in grid.days().iter().filter(|d| d.is_schedulable()) {
            assert!(!off.is_off(day.date));
            assert!(!holidays.iter().any(|h| h.date == day.date));
        }
    }

    #[test]
    fn generation_is_idempotent() {
        let (window, holidays) = one_week();
        let a = CalendarGrid::generate(&window, &holidays, &WeeklyOff::sunday());
        let b = CalendarGrid::generate(&window, &holidays, &WeeklyOff::sunday());
        assert_eq!(a, b);
    }

    #[test]
    fn select_rejects_excluded_cells_before_allocation() {
        let (window, holidays) = one_week();
        let grid = CalendarGrid::generate(&window, &holidays, &WeeklyOff::sunday());

        let cell = grid.select(d(2025, 1, 6), SlotPosition::Afternoon1).unwrap();
        assert_eq!(cell.slot.to_string(), "14:00 - 16:00");

        assert_eq!(
            grid.select(d(2025, 1, 8), SlotPosition::Morning1),
            Err(DomainError::InvalidCell {
                date: d(2025, 1, 8),
                reason: CellRejection::Holiday
            })
        );
        assert_eq!(
            grid.select(d(2025, 1, 12), SlotPosition::Morning1),
            Err(DomainError::InvalidCell {
                date: d(2025, 1, 12),
                reason: CellRejection::WeeklyOff
            })
        );
        assert_eq!(
            grid.select(d(2025, 1, 20), SlotPosition::Morning1),
            Err(DomainError::InvalidCell {
                date: d(2025, 1, 20),
                reason: CellRejection::OutsideSession
            })
        );
    }

    #[test]
    fn inverted_window_is_empty() {
        let window = SessionWindow::with_default_slots(d(2025, 2, 1), d(2025, 1, 1));
        let grid = CalendarGrid::generate(&window, &[], &WeeklyOff::none());
        assert!(grid.days().is_empty());
    }
}
