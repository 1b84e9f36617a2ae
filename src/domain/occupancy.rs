//! Slot occupancy index: (date, start, end) -> number of exams already scheduled.
//!
//! Display signal only. It does not stop a second exam from landing in the same room;
//! the coordinator handles room conflicts within one flow.

use super::calendar::CalendarGrid;
use super::entities::{Cell, DayKind};
use chrono::{NaiveDate, NaiveTime};
use std::collections::HashMap;

/// Lookup key matching how the exam store is queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellKey {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl From<&Cell> for CellKey {
    fn from(cell: &Cell) -> Self {
        Self {
            date: cell.date,
            start: cell.slot.start,
            end: cell.slot.end,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SlotOccupancyIndex {
    counts: HashMap<CellKey, u32>,
}

impl SlotOccupancyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached count for `cell`; 0 when never recorded.
    pub fn count_for(&self, cell: &Cell) -> u32 {
        self.counts.get(&CellKey::from(cell)).copied().unwrap_or(0)
    }

    pub fn record(&mut self, cell: &Cell, count: u32) {
        self.counts.insert(CellKey::from(cell), count);
    }

    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }

    pub fn occupied_cells(&self) -> usize {
        self.counts.values().filter(|&&c| c > 0).count()
    }

    /// Pair every grid day with per-cell counts, keeping the day classification.
    pub fn annotate(&self, grid: &CalendarGrid) -> Vec<AnnotatedDay> {
        grid.days()
            .iter()
            .map(|day| AnnotatedDay {
                date: day.date,
                kind: day.kind,
                cells: day
                    .cells
                    .iter()
                    .map(|cell| (*cell, self.count_for(cell)))
                    .collect(),
            })
            .collect()
    }
}

/// A grid row annotated with exam counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedDay {
    pub date: NaiveDate,
    pub kind: DayKind,
    pub cells: Vec<(Cell, u32)>,
}
