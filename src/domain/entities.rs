//! Domain entities. Pure data structures for exam scheduling.
//!
//! No wire/HTTP types here. Adapters validate remote records and map them into these.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

pub type DepartmentId = i64;
pub type TeacherId = i64;
pub type OptionId = i64;
pub type ModuleId = i64;
pub type SessionId = i64;

/// Room identifier as issued by the remote catalog.
///
/// Ordering is numeric when both ids are integers ("9" < "10"), lexicographic otherwise;
/// numeric ids sort before non-numeric ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Ord for RoomId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.0.parse::<u64>(), other.0.parse::<u64>()) {
            (Ok(a), Ok(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Ok(_), Err(_)) => Ordering::Less,
            (Err(_), Ok(_)) => Ordering::Greater,
            (Err(_), Err(_)) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for RoomId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A physical exam room. Owned by the external catalog; read-only here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    /// Seating capacity. Always > 0 for records accepted at the adapter boundary.
    pub capacity: u32,
    #[serde(rename = "type")]
    pub kind: RoomType,
}

impl Room {
    pub fn new(
        id: impl Into<RoomId>,
        name: impl Into<String>,
        capacity: u32,
        kind: RoomType,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            capacity,
            kind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomType {
    ClassRoom,
    Amphitheater,
}

/// One daily exam window, e.g. 08:00 to 10:00.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeSlot {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Build from hour/minute pairs. Out-of-range values fall back to midnight.
    pub fn hm(start: (u32, u32), end: (u32, u32)) -> Self {
        Self {
            start: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap_or_default(),
            end: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap_or_default(),
        }
    }

    pub fn start_hhmm(&self) -> String {
        self.start.format("%H:%M").to_string()
    }

    pub fn end_hhmm(&self) -> String {
        self.end.format("%H:%M").to_string()
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.start_hhmm(), self.end_hhmm())
    }
}

/// Position of a slot within the day. The four positions are fixed and ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotPosition {
    Morning1,
    Morning2,
    Afternoon1,
    Afternoon2,
}

impl SlotPosition {
    pub const ALL: [SlotPosition; 4] = [
        SlotPosition::Morning1,
        SlotPosition::Morning2,
        SlotPosition::Afternoon1,
        SlotPosition::Afternoon2,
    ];

    pub fn index(self) -> usize {
        match self {
            SlotPosition::Morning1 => 0,
            SlotPosition::Morning2 => 1,
            SlotPosition::Afternoon1 => 2,
            SlotPosition::Afternoon2 => 3,
        }
    }
}

/// Exam session calendar window with its four daily slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionWindow {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Ordered: morning1, morning2, afternoon1, afternoon2.
    pub slots: [TimeSlot; 4],
}

impl SessionWindow {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate, slots: [TimeSlot; 4]) -> Self {
        Self {
            start_date,
            end_date,
            slots,
        }
    }

    /// Window using the default daily slots (08-10, 10-12, 14-16, 16-18).
    pub fn with_default_slots(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self::new(start_date, end_date, Self::default_slots())
    }

    pub fn default_slots() -> [TimeSlot; 4] {
        [
            TimeSlot::hm((8, 0), (10, 0)),
            TimeSlot::hm((10, 0), (12, 0)),
            TimeSlot::hm((14, 0), (16, 0)),
            TimeSlot::hm((16, 0), (18, 0)),
        ]
    }

    pub fn slot(&self, position: SlotPosition) -> TimeSlot {
        self.slots[position.index()]
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }
}

/// A listed non-schedulable date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Holiday {
    pub date: NaiveDate,
}

impl Holiday {
    pub fn new(date: NaiveDate) -> Self {
        Self { date }
    }
}

/// Classification of a calendar day inside a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayKind {
    Schedulable,
    Holiday,
    WeeklyOff,
}

impl fmt::Display for DayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayKind::Schedulable => f.write_str("schedulable"),
            DayKind::Holiday => f.write_str("holiday"),
            DayKind::WeeklyOff => f.write_str("weekly off"),
        }
    }
}

/// The atomic schedulable unit: one slot on one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub date: NaiveDate,
    pub position: SlotPosition,
    pub slot: TimeSlot,
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.date, self.slot)
    }
}

/// Explicit session context for one scheduling workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulingContext {
    pub session_id: SessionId,
}

impl SchedulingContext {
    pub fn new(session_id: SessionId) -> Self {
        Self { session_id }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationMode {
    Automatic,
    Manual,
}

/// Input to the capacity allocator for one user action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationRequest {
    pub required_seats: u32,
    pub mode: AllocationMode,
    /// Only consulted in manual mode.
    pub manual_room_ids: BTreeSet<RoomId>,
}

impl AllocationRequest {
    pub fn automatic(required_seats: u32) -> Self {
        Self {
            required_seats,
            mode: AllocationMode::Automatic,
            manual_room_ids: BTreeSet::new(),
        }
    }

    pub fn manual(required_seats: u32, room_ids: impl IntoIterator<Item = RoomId>) -> Self {
        Self {
            required_seats,
            mode: AllocationMode::Manual,
            manual_room_ids: room_ids.into_iter().collect(),
        }
    }
}

/// Rooms chosen for an exam. `total_capacity >= required seats`; `rooms` non-empty with unique ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationResult {
    pub rooms: Vec<Room>,
    pub total_capacity: u32,
    pub excess: u32,
}

impl AllocationResult {
    pub fn room_ids(&self) -> Vec<RoomId> {
        self.rooms.iter().map(|r| r.id.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: DepartmentId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teacher {
    pub id: TeacherId,
    pub name: String,
    #[serde(default)]
    pub department_id: Option<DepartmentId>,
}

/// Academic track / cohort. `enrolled` is the registered headcount, the source of required seats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseOption {
    pub id: OptionId,
    pub name: String,
    #[serde(default)]
    pub year: Option<u32>,
    #[serde(default)]
    pub enrolled: Option<u32>,
    #[serde(default)]
    pub department_id: Option<DepartmentId>,
}

impl fmt::Display for CourseOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.year {
            Some(year) => write!(f, "{} {}", self.name, year),
            None => f.write_str(&self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub id: ModuleId,
    pub name: String,
    #[serde(default)]
    pub option_id: Option<OptionId>,
}

/// Who and what an exam is for; chosen by the user alongside the option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExamAssignment {
    pub department: DepartmentId,
    pub teacher: TeacherId,
    pub module: ModuleId,
}

/// Exam record assembled by the coordinator and handed to the external store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamBooking {
    pub date: NaiveDate,
    pub slot: TimeSlot,
    pub option: OptionId,
    pub module: ModuleId,
    pub teacher: TeacherId,
    pub department: DepartmentId,
    pub rooms: Vec<Room>,
}

/// An exam already present in the store, as listed for one cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookedExam {
    #[serde(default)]
    pub id: Option<i64>,
    pub date: NaiveDate,
    pub slot: TimeSlot,
    pub module: String,
    pub teacher: String,
    pub room_ids: Vec<RoomId>,
    pub room_names: Vec<String>,
}
