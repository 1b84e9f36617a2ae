//! Domain errors. Used by ports and use cases.
//!
//! Adapters map infrastructure errors into these. Every error is terminal for the
//! scheduling action that produced it; nothing in the core retries.

use super::entities::{OptionId, RoomId};
use chrono::NaiveDate;
use std::fmt;
use thiserror::Error;

/// Why a selected cell was refused before allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellRejection {
    Holiday,
    WeeklyOff,
    OutsideSession,
}

impl fmt::Display for CellRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellRejection::Holiday => f.write_str("holiday"),
            CellRejection::WeeklyOff => f.write_str("weekly day off"),
            CellRejection::OutsideSession => f.write_str("outside the session window"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("cell on {date} is not schedulable: {reason}")]
    InvalidCell {
        date: NaiveDate,
        reason: CellRejection,
    },

    #[error("insufficient capacity: {required} seats required, {available} available")]
    InsufficientCapacity { required: u32, available: u32 },

    #[error("no rooms selected")]
    EmptySelection,

    #[error("no registered headcount for option {option_id}")]
    MissingEnrollment { option_id: OptionId },

    /// Room already holds an exam in the chosen cell.
    #[error("room {room_id} is already booked in this slot")]
    RoomConflict { room_id: RoomId },

    #[error("exam store rejected the booking: {0}")]
    SubmissionRejected(String),

    #[error("transport failure: {0}")]
    Transport(String),

    /// Remote record failed validation at the adapter boundary.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// Coordinator step invoked from the wrong state.
    #[error("out of order: {0}")]
    OutOfOrder(String),

    #[error("request cancelled")]
    Cancelled,

    #[error("export failed: {0}")]
    Export(String),

    #[error("UI error: {0}")]
    Ui(String),
}

/// Coarse classification of [`DomainError`], for callers deciding what to show or retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidCell,
    InsufficientCapacity,
    EmptySelection,
    MissingEnrollment,
    RoomConflict,
    SubmissionRejected,
    TransportFailure,
    InvalidRecord,
    OutOfOrder,
    Cancelled,
    Export,
    Ui,
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::InvalidCell { .. } => ErrorKind::InvalidCell,
            DomainError::InsufficientCapacity { .. } => ErrorKind::InsufficientCapacity,
            DomainError::EmptySelection => ErrorKind::EmptySelection,
            DomainError::MissingEnrollment { .. } => ErrorKind::MissingEnrollment,
            DomainError::RoomConflict { .. } => ErrorKind::RoomConflict,
            DomainError::SubmissionRejected(_) => ErrorKind::SubmissionRejected,
            DomainError::Transport(_) => ErrorKind::TransportFailure,
            DomainError::InvalidRecord(_) => ErrorKind::InvalidRecord,
            DomainError::OutOfOrder(_) => ErrorKind::OutOfOrder,
            DomainError::Cancelled => ErrorKind::Cancelled,
            DomainError::Export(_) => ErrorKind::Export,
            DomainError::Ui(_) => ErrorKind::Ui,
        }
    }

    /// True only for transport failures: resending the same request may succeed.
    /// Domain failures will fail again with identical input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DomainError::Transport(_))
    }
}
