//! Core domain layer. No external I/O dependencies.
//!
//! Entities, the capacity allocator, the calendar grid and the occupancy index live here.
//! Dependencies flow inward.

pub mod allocator;
pub mod calendar;
pub mod entities;
pub mod errors;
pub mod occupancy;

pub use calendar::{CalendarGrid, GridDay, GridSummary, WeeklyOff};
pub use entities::{
    AllocationMode, AllocationRequest, AllocationResult, BookedExam, Cell, CourseOption, DayKind,
    Department, DepartmentId, ExamAssignment, ExamBooking, Holiday, Module, ModuleId, OptionId,
    Room, RoomId, RoomType, SchedulingContext, SessionId, SessionWindow, SlotPosition, Teacher,
    TeacherId, TimeSlot,
};
pub use errors::{CellRejection, DomainError, ErrorKind};
pub use occupancy::{AnnotatedDay, CellKey, SlotOccupancyIndex};
