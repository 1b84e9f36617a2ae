//! Wire records of the remote exam service and their mapping into domain types.
//!
//! Field names follow the service (`nom`, `taille`, `nbrInscrit`, ...). Everything is
//! validated here; the core only ever sees well-formed domain values.

use crate::domain::{
    BookedExam, CourseOption, Department, DomainError, ExamBooking, Holiday, Module, Room, RoomId,
    RoomType, SessionId, SessionWindow, Teacher, TimeSlot,
};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Identifier that the service sends either as a number or as a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireId {
    Num(i64),
    Text(String),
}

impl WireId {
    pub fn into_room_id(self) -> RoomId {
        match self {
            WireId::Num(n) => RoomId::new(n.to_string()),
            WireId::Text(s) => RoomId::new(s),
        }
    }

    /// Numeric form when the id parses as an integer.
    pub fn from_room_id(id: &RoomId) -> Self {
        match id.as_str().parse::<i64>() {
            Ok(n) => WireId::Num(n),
            Err(_) => WireId::Text(id.to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdRef {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoomDto {
    pub id: WireId,
    pub nom: String,
    pub taille: i64,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub disponible: Option<bool>,
}

impl RoomDto {
    pub fn is_available(&self) -> bool {
        self.disponible.unwrap_or(true)
    }
}

impl TryFrom<RoomDto> for Room {
    type Error = DomainError;

    fn try_from(dto: RoomDto) -> Result<Self, Self::Error> {
        let capacity = u32::try_from(dto.taille)
            .ok()
            .filter(|c| *c > 0)
            .ok_or_else(|| {
                DomainError::InvalidRecord(format!(
                    "room {:?}: capacity must be positive, got {}",
                    dto.id, dto.taille
                ))
            })?;
        let kind = match dto.kind.as_deref() {
            Some(k) if k.to_ascii_lowercase().starts_with("amphi") => RoomType::Amphitheater,
            _ => RoomType::ClassRoom,
        };
        Ok(Room::new(dto.id.into_room_id(), dto.nom, capacity, kind))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HolidayDto {
    pub date: String,
}

impl TryFrom<HolidayDto> for Holiday {
    type Error = DomainError;

    fn try_from(dto: HolidayDto) -> Result<Self, Self::Error> {
        Ok(Holiday::new(parse_date(&dto.date)?))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDto {
    #[serde(default)]
    pub id: Option<SessionId>,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub morning_start1: Option<String>,
    #[serde(default)]
    pub morning_end1: Option<String>,
    #[serde(default)]
    pub morning_start2: Option<String>,
    #[serde(default)]
    pub morning_end2: Option<String>,
    #[serde(default)]
    pub afternoon_start1: Option<String>,
    #[serde(default)]
    pub afternoon_end1: Option<String>,
    #[serde(default)]
    pub afternoon_start2: Option<String>,
    #[serde(default)]
    pub afternoon_end2: Option<String>,
}

impl TryFrom<SessionDto> for SessionWindow {
    type Error = DomainError;

    /// Slots the session leaves out fall back to the default daily slots. A slot with
    /// only one bound is rejected.
    fn try_from(dto: SessionDto) -> Result<Self, Self::Error> {
        let pairs = [
            (&dto.morning_start1, &dto.morning_end1),
            (&dto.morning_start2, &dto.morning_end2),
            (&dto.afternoon_start1, &dto.afternoon_end1),
            (&dto.afternoon_start2, &dto.afternoon_end2),
        ];
        let mut slots = SessionWindow::default_slots();
        for (i, pair) in pairs.into_iter().enumerate() {
            match pair {
                (Some(start), Some(end)) => {
                    slots[i] = TimeSlot::new(parse_time(start)?, parse_time(end)?);
                }
                (None, None) => {}
                _ => {
                    return Err(DomainError::InvalidRecord(format!(
                        "session slot {}: start and end must both be set",
                        i + 1
                    )));
                }
            }
        }
        Ok(SessionWindow::new(
            parse_date(&dto.start_date)?,
            parse_date(&dto.end_date)?,
            slots,
        ))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionDto {
    pub id: i64,
    #[serde(default)]
    pub nom_de_filiere: Option<String>,
    #[serde(default)]
    pub annee: Option<u32>,
    #[serde(default)]
    pub nbr_inscrit: Option<i64>,
    #[serde(default)]
    pub department: Option<IdRef>,
}

impl TryFrom<OptionDto> for CourseOption {
    type Error = DomainError;

    fn try_from(dto: OptionDto) -> Result<Self, Self::Error> {
        let enrolled = match dto.nbr_inscrit {
            None => None,
            Some(n) => Some(u32::try_from(n).map_err(|_| {
                DomainError::InvalidRecord(format!(
                    "option {}: headcount {} out of range",
                    dto.id, n
                ))
            })?),
        };
        Ok(CourseOption {
            id: dto.id,
            name: dto.nom_de_filiere.unwrap_or_else(|| format!("option {}", dto.id)),
            year: dto.annee,
            enrolled,
            department_id: dto.department.map(|d| d.id),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentDto {
    pub id: i64,
    pub department_name: String,
}

impl From<DepartmentDto> for Department {
    fn from(dto: DepartmentDto) -> Self {
        Department {
            id: dto.id,
            name: dto.department_name,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeacherDto {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub department: Option<IdRef>,
}

impl From<TeacherDto> for Teacher {
    fn from(dto: TeacherDto) -> Self {
        Teacher {
            id: dto.id,
            name: dto.name,
            department_id: dto.department.map(|d| d.id),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDto {
    pub id: i64,
    pub nom_module: String,
    #[serde(default)]
    pub option: Option<IdRef>,
}

impl From<ModuleDto> for Module {
    fn from(dto: ModuleDto) -> Self {
        Module {
            id: dto.id,
            name: dto.nom_module,
            option_id: dto.option.map(|o| o.id),
        }
    }
}

/// A display label that arrives either as plain text or as a nested record.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LabelDto {
    Text(String),
    Num(i64),
    Record {
        #[serde(default)]
        id: Option<WireId>,
        #[serde(default, alias = "nomModule", alias = "nom", alias = "departmentName")]
        name: Option<String>,
    },
}

impl LabelDto {
    fn into_label(self) -> String {
        match self {
            LabelDto::Text(s) => s,
            LabelDto::Num(n) => n.to_string(),
            LabelDto::Record { name: Some(name), .. } => name,
            LabelDto::Record { id: Some(id), .. } => id.into_room_id().to_string(),
            LabelDto::Record { .. } => String::new(),
        }
    }
}

/// Room reference inside an exam record: a bare id, a name, or `{id, nom}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RoomRefDto {
    Num(i64),
    Text(String),
    Record {
        id: WireId,
        #[serde(default)]
        nom: Option<String>,
    },
}

impl RoomRefDto {
    fn into_parts(self) -> (RoomId, String) {
        match self {
            RoomRefDto::Num(n) => (RoomId::new(n.to_string()), n.to_string()),
            RoomRefDto::Text(s) => (RoomId::new(s.clone()), s),
            RoomRefDto::Record { id, nom } => {
                let id = id.into_room_id();
                let name = nom.unwrap_or_else(|| id.to_string());
                (id, name)
            }
        }
    }
}

/// One exam as returned by the search endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamDto {
    #[serde(default)]
    pub id: Option<i64>,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub module: Option<LabelDto>,
    #[serde(default)]
    pub enseignant: Option<LabelDto>,
    #[serde(default)]
    pub locaux: Vec<RoomRefDto>,
}

impl TryFrom<ExamDto> for BookedExam {
    type Error = DomainError;

    fn try_from(dto: ExamDto) -> Result<Self, Self::Error> {
        let (room_ids, room_names) = dto.locaux.into_iter().map(RoomRefDto::into_parts).unzip();
        Ok(BookedExam {
            id: dto.id,
            date: parse_date(&dto.date)?,
            slot: TimeSlot::new(parse_time(&dto.start_time)?, parse_time(&dto.end_time)?),
            module: dto.module.map(LabelDto::into_label).unwrap_or_default(),
            teacher: dto.enseignant.map(LabelDto::into_label).unwrap_or_default(),
            room_ids,
            room_names,
        })
    }
}

/// Count response: a bare number or `{"count": n}`.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub enum CountDto {
    Bare(u32),
    Wrapped { count: u32 },
}

impl CountDto {
    pub fn value(self) -> u32 {
        match self {
            CountDto::Bare(n) | CountDto::Wrapped { count: n } => n,
        }
    }
}

/// Body of the exam-creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamPayload {
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub departement: i64,
    pub enseignant: i64,
    pub option: i64,
    pub module: i64,
    pub locaux_ids: Vec<WireId>,
    pub session_id: SessionId,
}

impl ExamPayload {
    pub fn from_booking(session_id: SessionId, booking: &ExamBooking) -> Self {
        Self {
            date: booking.date.format("%Y-%m-%d").to_string(),
            start_time: format_time(booking.slot.start),
            end_time: format_time(booking.slot.end),
            departement: booking.department,
            enseignant: booking.teacher,
            option: booking.option,
            module: booking.module,
            locaux_ids: booking
                .rooms
                .iter()
                .map(|r| WireId::from_room_id(&r.id))
                .collect(),
            session_id,
        }
    }
}

/// Accepts `HH:mm` and `HH:mm:ss`.
pub fn parse_time(raw: &str) -> Result<NaiveTime, DomainError> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(|e| DomainError::InvalidRecord(format!("time {:?}: {}", raw, e)))
}

pub fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Accepts `YYYY-MM-DD`, ignoring any `T...` time suffix.
pub fn parse_date(raw: &str) -> Result<NaiveDate, DomainError> {
    let day = raw.trim().split('T').next().unwrap_or_default();
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|e| DomainError::InvalidRecord(format!("date {:?}: {}", raw, e)))
}
