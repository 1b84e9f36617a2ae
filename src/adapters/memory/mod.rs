//! In-memory adapter. Fixture-backed implementation of every outbound port.

pub mod store;

pub use store::{CatalogRoom, Fixture, InMemoryExamService, SessionRecord, StoredExam};
