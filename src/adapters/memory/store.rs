//! In-memory exam service. Implements every outbound port over a fixture.
//!
//! Used for offline runs (`EXAMGRID_FIXTURE_PATH`) and by the use-case tests. Enforces the
//! same server-side rule the remote store does: a room holds at most one exam per slot.

use crate::domain::{
    BookedExam, CourseOption, Department, DepartmentId, DomainError, ExamBooking, Holiday, Module,
    OptionId, Room, SessionId, SessionWindow, Teacher, TimeSlot,
};
use crate::ports::{
    AcademicDirectoryPort, ExamStorePort, OptionRegistryPort, RoomCatalogPort, SessionPort,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Fixture file layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub sessions: Vec<SessionRecord>,
    #[serde(default)]
    pub holidays: Vec<Holiday>,
    #[serde(default)]
    pub rooms: Vec<CatalogRoom>,
    #[serde(default)]
    pub departments: Vec<Department>,
    #[serde(default)]
    pub teachers: Vec<Teacher>,
    #[serde(default)]
    pub options: Vec<CourseOption>,
    #[serde(default)]
    pub modules: Vec<Module>,
    #[serde(default)]
    pub exams: Vec<StoredExam>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: SessionId,
    #[serde(flatten)]
    pub window: SessionWindow,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogRoom {
    #[serde(flatten)]
    pub room: Room,
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredExam {
    pub session_id: SessionId,
    pub booking: ExamBooking,
}

/// Fixture-backed implementation of the remote exam service.
pub struct InMemoryExamService {
    data: RwLock<Fixture>,
    /// When set, every submission is refused with this reason.
    reject_with: Option<String>,
    /// Simulated latency on submission.
    delay: Duration,
}

impl InMemoryExamService {
    pub fn new() -> Self {
        Self::from_fixture(Fixture::default())
    }

    /// Rooms without seats are dropped; the remote catalog rejects them the same way.
    pub fn from_fixture(mut fixture: Fixture) -> Self {
        fixture.rooms.retain(|r| {
            if r.room.capacity > 0 {
                return true;
            }
            warn!(room_id = %r.room.id, "dropping fixture room with no capacity");
            false
        });
        Self {
            data: RwLock::new(fixture),
            reject_with: None,
            delay: Duration::ZERO,
        }
    }

    /// Load a JSON fixture from disk.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| DomainError::InvalidRecord(format!("read {}: {}", path.display(), e)))?;
        let fixture: Fixture = serde_json::from_str(&raw)
            .map_err(|e| DomainError::InvalidRecord(format!("parse {}: {}", path.display(), e)))?;
        info!(
            path = %path.display(),
            rooms = fixture.rooms.len(),
            exams = fixture.exams.len(),
            "loaded fixture"
        );
        Ok(Self::from_fixture(fixture))
    }

    pub fn with_session(mut self, id: SessionId, window: SessionWindow) -> Self {
        self.data.get_mut().sessions.push(SessionRecord { id, window });
        self
    }

    pub fn with_holiday(mut self, date: NaiveDate) -> Self {
        self.data.get_mut().holidays.push(Holiday::new(date));
        self
    }

    pub fn with_room(mut self, room: Room) -> Self {
        self.data.get_mut().rooms.push(CatalogRoom {
            room,
            available: true,
        });
        self
    }

    pub fn with_unavailable_room(mut self, room: Room) -> Self {
        self.data.get_mut().rooms.push(CatalogRoom {
            room,
            available: false,
        });
        self
    }

    pub fn with_department(mut self, department: Department) -> Self {
        self.data.get_mut().departments.push(department);
        self
    }

    pub fn with_teacher(mut self, teacher: Teacher) -> Self {
        self.data.get_mut().teachers.push(teacher);
        self
    }

    pub fn with_option(mut self, option: CourseOption) -> Self {
        self.data.get_mut().options.push(option);
        self
    }

    pub fn with_module(mut self, module: Module) -> Self {
        self.data.get_mut().modules.push(module);
        self
    }

    pub fn with_exam(mut self, session_id: SessionId, booking: ExamBooking) -> Self {
        self.data
            .get_mut()
            .exams
            .push(StoredExam { session_id, booking });
        self
    }

    /// Refuse every submission with `reason`.
    pub fn rejecting(mut self, reason: impl Into<String>) -> Self {
        self.reject_with = Some(reason.into());
        self
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay = Duration::from_millis(delay_ms);
        self
    }

    /// Snapshot of stored exams.
    pub async fn exams(&self) -> Vec<StoredExam> {
        self.data.read().await.exams.clone()
    }
}

impl Default for InMemoryExamService {
    fn default() -> Self {
        Self::new()
    }
}

fn same_cell(booking: &ExamBooking, date: NaiveDate, slot: &TimeSlot) -> bool {
    booking.date == date && booking.slot == *slot
}

#[async_trait::async_trait]
impl RoomCatalogPort for InMemoryExamService {
    async fn list_rooms(&self, available_only: bool) -> Result<Vec<Room>, DomainError> {
        let data = self.data.read().await;
        Ok(data
            .rooms
            .iter()
            .filter(|r| r.available || !available_only)
            .map(|r| r.room.clone())
            .collect())
    }
}

#[async_trait::async_trait]
impl SessionPort for InMemoryExamService {
    async fn get_session_window(
        &self,
        session_id: SessionId,
    ) -> Result<SessionWindow, DomainError> {
        let data = self.data.read().await;
        data.sessions
            .iter()
            .find(|s| s.id == session_id)
            .map(|s| s.window.clone())
            .ok_or_else(|| DomainError::InvalidRecord(format!("unknown session {}", session_id)))
    }

    async fn list_holidays(&self) -> Result<Vec<Holiday>, DomainError> {
        Ok(self.data.read().await.holidays.clone())
    }
}

#[async_trait::async_trait]
impl OptionRegistryPort for InMemoryExamService {
    async fn get_option(&self, option_id: OptionId) -> Result<Option<CourseOption>, DomainError> {
        let data = self.data.read().await;
        Ok(data.options.iter().find(|o| o.id == option_id).cloned())
    }
}

#[async_trait::async_trait]
impl ExamStorePort for InMemoryExamService {
    async fn count_exams(&self, date: NaiveDate, slot: &TimeSlot) -> Result<u32, DomainError> {
        let data = self.data.read().await;
        let count = data
            .exams
            .iter()
            .filter(|e| same_cell(&e.booking, date, slot))
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn list_bookings(
        &self,
        date: NaiveDate,
        slot: &TimeSlot,
    ) -> Result<Vec<BookedExam>, DomainError> {
        let data = self.data.read().await;
        let booked = data
            .exams
            .iter()
            .enumerate()
            .filter(|(_, e)| same_cell(&e.booking, date, slot))
            .map(|(i, e)| {
                let b = &e.booking;
                let module = data
                    .modules
                    .iter()
                    .find(|m| m.id == b.module)
                    .map(|m| m.name.clone())
                    .unwrap_or_else(|| b.module.to_string());
                let teacher = data
                    .teachers
                    .iter()
                    .find(|t| t.id == b.teacher)
                    .map(|t| t.name.clone())
                    .unwrap_or_else(|| b.teacher.to_string());
                BookedExam {
                    id: Some(i as i64 + 1),
                    date: b.date,
                    slot: b.slot,
                    module,
                    teacher,
                    room_ids: b.rooms.iter().map(|r| r.id.clone()).collect(),
                    room_names: b.rooms.iter().map(|r| r.name.clone()).collect(),
                }
            })
            .collect();
        Ok(booked)
    }

    async fn create_exam(
        &self,
        session_id: SessionId,
        booking: &ExamBooking,
    ) -> Result<(), DomainError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(reason) = &self.reject_with {
            return Err(DomainError::SubmissionRejected(reason.clone()));
        }

        let mut data = self.data.write().await;
        let clash = data
            .exams
            .iter()
            .filter(|e| same_cell(&e.booking, booking.date, &booking.slot))
            .flat_map(|e| e.booking.rooms.iter())
            .find(|r| booking.rooms.iter().any(|b| b.id == r.id));
        if let Some(room) = clash {
            return Err(DomainError::SubmissionRejected(format!(
                "room {} already holds an exam at {} {}",
                room.id, booking.date, booking.slot
            )));
        }

        data.exams.push(StoredExam {
            session_id,
            booking: booking.clone(),
        });
        debug!(
            session_id,
            date = %booking.date,
            slot = %booking.slot,
            rooms = booking.rooms.len(),
            "stored exam"
        );
        Ok(())
    }
}

#[async_trait::async_trait]
impl AcademicDirectoryPort for InMemoryExamService {
    async fn list_departments(&self) -> Result<Vec<Department>, DomainError> {
        Ok(self.data.read().await.departments.clone())
    }

    async fn list_teachers(&self, department: DepartmentId) -> Result<Vec<Teacher>, DomainError> {
        let data = self.data.read().await;
        Ok(data
            .teachers
            .iter()
            .filter(|t| t.department_id == Some(department))
            .cloned()
            .collect())
    }

    async fn list_options(
        &self,
        department: DepartmentId,
    ) -> Result<Vec<CourseOption>, DomainError> {
        let data = self.data.read().await;
        Ok(data
            .options
            .iter()
            .filter(|o| o.department_id == Some(department))
            .cloned()
            .collect())
    }

    async fn list_modules(&self, option: OptionId) -> Result<Vec<Module>, DomainError> {
        let data = self.data.read().await;
        Ok(data
            .modules
            .iter()
            .filter(|m| m.option_id == Some(option))
            .cloned()
            .collect())
    }
}
