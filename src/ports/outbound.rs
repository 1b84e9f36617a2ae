//! Outbound ports. Application calls into the remote exam service.
//!
//! Implemented by adapters (HTTP client, in-memory store). Every collaborator is read-only
//! to the core except `ExamStorePort::create_exam`.

use crate::domain::{
    BookedExam, CourseOption, Department, DepartmentId, DomainError, ExamBooking, Holiday, Module,
    OptionId, Room, SessionId, SessionWindow, Teacher, TimeSlot,
};
use chrono::NaiveDate;

/// Room catalog. A snapshot per call; the core never mutates rooms.
#[async_trait::async_trait]
pub trait RoomCatalogPort: Send + Sync {
    /// List rooms. `available_only` filters to rooms flagged available by the store.
    async fn list_rooms(&self, available_only: bool) -> Result<Vec<Room>, DomainError>;
}

/// Exam sessions and the holiday list.
#[async_trait::async_trait]
pub trait SessionPort: Send + Sync {
    async fn get_session_window(&self, session_id: SessionId) -> Result<SessionWindow, DomainError>;

    async fn list_holidays(&self) -> Result<Vec<Holiday>, DomainError>;
}

/// Course-option registry. Source of the required seat count.
#[async_trait::async_trait]
pub trait OptionRegistryPort: Send + Sync {
    /// Fetch an option. `Ok(None)` when the store does not know it.
    async fn get_option(&self, option_id: OptionId) -> Result<Option<CourseOption>, DomainError>;
}

/// Exam store: occupancy queries and exam creation.
#[async_trait::async_trait]
pub trait ExamStorePort: Send + Sync {
    /// Number of exams matching (date, start, end).
    async fn count_exams(&self, date: NaiveDate, slot: &TimeSlot) -> Result<u32, DomainError>;

    /// Exams matching (date, start, end).
    async fn list_bookings(
        &self,
        date: NaiveDate,
        slot: &TimeSlot,
    ) -> Result<Vec<BookedExam>, DomainError>;

    /// Submit a new exam for `session_id`.
    ///
    /// # Errors
    /// `SubmissionRejected` when the store refuses the record, `Transport` when it could
    /// not be reached.
    async fn create_exam(
        &self,
        session_id: SessionId,
        booking: &ExamBooking,
    ) -> Result<(), DomainError>;
}

/// Read-only lookups that drive the selection pickers.
#[async_trait::async_trait]
pub trait AcademicDirectoryPort: Send + Sync {
    async fn list_departments(&self) -> Result<Vec<Department>, DomainError>;

    async fn list_teachers(&self, department: DepartmentId) -> Result<Vec<Teacher>, DomainError>;

    async fn list_options(
        &self,
        department: DepartmentId,
    ) -> Result<Vec<CourseOption>, DomainError>;

    async fn list_modules(&self, option: OptionId) -> Result<Vec<Module>, DomainError>;
}
