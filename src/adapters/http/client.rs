//! HTTP adapter for the remote exam service. Implements every outbound port over its REST API.
//!
//! Status mapping: connection errors, timeouts and 5xx are `Transport`; a 4xx on exam creation
//! is `SubmissionRejected`; a 4xx on a read is `InvalidRecord`. Unknown options (404) are `None`.

use super::dto::{
    CountDto, DepartmentDto, ExamDto, ExamPayload, HolidayDto, ModuleDto, OptionDto, RoomDto,
    SessionDto, TeacherDto, format_time,
};
use crate::domain::{
    BookedExam, CourseOption, Department, DepartmentId, DomainError, ExamBooking, Holiday, Module,
    OptionId, Room, SessionId, SessionWindow, Teacher, TimeSlot,
};
use crate::ports::{
    AcademicDirectoryPort, ExamStorePort, OptionRegistryPort, RoomCatalogPort, SessionPort,
};
use chrono::NaiveDate;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Longest response-body excerpt carried into an error message.
const BODY_SNIPPET: usize = 200;

pub struct HttpExamService {
    client: Client,
    base_url: String,
}

impl HttpExamService {
    /// # Arguments
    /// * `base_url` - API root, e.g. "http://localhost:8088/api"
    /// * `timeout` - per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, DomainError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::Transport(format!("build HTTP client: {}", e)))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        info!(
            base_url = %base_url,
            timeout_ms = timeout.as_millis() as u64,
            "exam service client ready"
        );
        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Response, DomainError> {
        debug!(path, "GET");
        self.client
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .map_err(|e| DomainError::Transport(format!("GET {}: {}", path, e)))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, DomainError> {
        let response = self.get(path, query).await?;
        if !response.status().is_success() {
            return Err(read_failure(path, response).await);
        }
        decode(path, response).await
    }

    /// Like `get_json`, but a 404 yields `None`.
    async fn get_optional<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Option<T>, DomainError> {
        let response = self.get(path, &[]).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(read_failure(path, response).await);
        }
        decode(path, response).await.map(Some)
    }
}

fn cell_query(date: NaiveDate, slot: &TimeSlot) -> [(&'static str, String); 3] {
    [
        ("date", date.format("%Y-%m-%d").to_string()),
        ("startTime", format_time(slot.start)),
        ("endTime", format_time(slot.end)),
    ]
}

async fn decode<T: DeserializeOwned>(path: &str, response: Response) -> Result<T, DomainError> {
    let text = response
        .text()
        .await
        .map_err(|e| DomainError::Transport(format!("read {}: {}", path, e)))?;
    serde_json::from_str(&text).map_err(|e| {
        warn!(path, error = %e, body = %snippet(&text), "malformed response");
        DomainError::InvalidRecord(format!("{}: {}", path, e))
    })
}

async fn read_failure(path: &str, response: Response) -> DomainError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    warn!(path, status = %status, body = %snippet(&text), "exam service returned error");
    if status.is_server_error() {
        DomainError::Transport(format!("{} {}: {}", path, status, snippet(&text)))
    } else {
        DomainError::InvalidRecord(format!("{} {}: {}", path, status, snippet(&text)))
    }
}

fn snippet(text: &str) -> String {
    text.chars().take(BODY_SNIPPET).collect()
}

#[async_trait::async_trait]
impl RoomCatalogPort for HttpExamService {
    async fn list_rooms(&self, available_only: bool) -> Result<Vec<Room>, DomainError> {
        let query: Vec<(&str, String)> = if available_only {
            vec![("disponible", "true".to_string())]
        } else {
            Vec::new()
        };
        let records: Vec<RoomDto> = self.get_json("/locaux", &query).await?;
        let total = records.len();
        let mut rooms = Vec::with_capacity(total);
        for dto in records {
            if available_only && !dto.is_available() {
                continue;
            }
            match Room::try_from(dto) {
                Ok(room) => rooms.push(room),
                Err(e) => warn!(error = %e, "skipping room record"),
            }
        }
        debug!(total, kept = rooms.len(), available_only, "room catalog fetched");
        Ok(rooms)
    }
}

#[async_trait::async_trait]
impl SessionPort for HttpExamService {
    async fn get_session_window(
        &self,
        session_id: SessionId,
    ) -> Result<SessionWindow, DomainError> {
        let path = format!("/session/{}", session_id);
        let dto: Option<SessionDto> = self.get_optional(&path).await?;
        let dto = dto
            .ok_or_else(|| DomainError::InvalidRecord(format!("unknown session {}", session_id)))?;
        SessionWindow::try_from(dto)
    }

    async fn list_holidays(&self) -> Result<Vec<Holiday>, DomainError> {
        let records: Vec<HolidayDto> = self.get_json("/session/holidays", &[]).await?;
        records.into_iter().map(Holiday::try_from).collect()
    }
}

#[async_trait::async_trait]
impl OptionRegistryPort for HttpExamService {
    async fn get_option(&self, option_id: OptionId) -> Result<Option<CourseOption>, DomainError> {
        let dto: Option<OptionDto> = self.get_optional(&format!("/options/{}", option_id)).await?;
        dto.map(CourseOption::try_from).transpose()
    }
}

#[async_trait::async_trait]
impl ExamStorePort for HttpExamService {
    async fn count_exams(&self, date: NaiveDate, slot: &TimeSlot) -> Result<u32, DomainError> {
        let count: CountDto = self
            .get_json("/exams/count", &cell_query(date, slot))
            .await?;
        Ok(count.value())
    }

    async fn list_bookings(
        &self,
        date: NaiveDate,
        slot: &TimeSlot,
    ) -> Result<Vec<BookedExam>, DomainError> {
        let records: Vec<ExamDto> = self
            .get_json("/exams/search", &cell_query(date, slot))
            .await?;
        records.into_iter().map(BookedExam::try_from).collect()
    }

    async fn create_exam(
        &self,
        session_id: SessionId,
        booking: &ExamBooking,
    ) -> Result<(), DomainError> {
        let payload = ExamPayload::from_booking(session_id, booking);
        info!(
            session_id,
            date = %payload.date,
            start = %payload.start_time,
            rooms = payload.locaux_ids.len(),
            "submitting exam"
        );

        let response = self
            .client
            .post(self.url("/exams"))
            .json(&payload)
            .send()
            .await
            .map_err(|e| DomainError::Transport(format!("POST /exams: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let text = response.text().await.unwrap_or_default();
        warn!(status = %status, body = %snippet(&text), "exam submission refused");
        if status.is_server_error() {
            Err(DomainError::Transport(format!(
                "POST /exams {}: {}",
                status,
                snippet(&text)
            )))
        } else {
            let reason = if text.trim().is_empty() {
                status.to_string()
            } else {
                snippet(&text)
            };
            Err(DomainError::SubmissionRejected(reason))
        }
    }
}

#[async_trait::async_trait]
impl AcademicDirectoryPort for HttpExamService {
    async fn list_departments(&self) -> Result<Vec<Department>, DomainError> {
        let records: Vec<DepartmentDto> = self.get_json("/departements", &[]).await?;
        Ok(records.into_iter().map(Department::from).collect())
    }

    async fn list_teachers(&self, department: DepartmentId) -> Result<Vec<Teacher>, DomainError> {
        let path = format!("/departements/{}/enseignants", department);
        let records: Vec<TeacherDto> = self.get_json(&path, &[]).await?;
        Ok(records.into_iter().map(Teacher::from).collect())
    }

    async fn list_options(
        &self,
        department: DepartmentId,
    ) -> Result<Vec<CourseOption>, DomainError> {
        let path = format!("/departements/{}/options", department);
        let records: Vec<OptionDto> = self.get_json(&path, &[]).await?;
        records.into_iter().map(CourseOption::try_from).collect()
    }

    async fn list_modules(&self, option: OptionId) -> Result<Vec<Module>, DomainError> {
        let path = format!("/options/{}/modules", option);
        let records: Vec<ModuleDto> = self.get_json(&path, &[]).await?;
        Ok(records.into_iter().map(Module::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalised() {
        let svc =
            HttpExamService::new("http://localhost:8088/api/", Duration::from_secs(1)).unwrap();
        assert_eq!(svc.url("/locaux"), "http://localhost:8088/api/locaux");
    }

    #[test]
    fn cell_query_uses_hhmm_times() {
        let query = cell_query(
            NaiveDate::from_ymd_opt(2025, 1, 7).unwrap(),
            &TimeSlot::hm((8, 0), (10, 0)),
        );
        assert_eq!(query[0], ("date", "2025-01-07".to_string()));
        assert_eq!(query[1], ("startTime", "08:00".to_string()));
        assert_eq!(query[2], ("endTime", "10:00".to_string()));
    }

    #[tokio::test]
    async fn unreachable_service_is_a_retryable_transport_failure() {
        let svc = HttpExamService::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let err = svc.list_rooms(true).await.unwrap_err();
        assert!(matches!(err, DomainError::Transport(_)));
        assert!(err.is_retryable());
    }
}
