//! Application use cases. Orchestrate domain logic via ports.

pub mod grid_service;
pub mod scheduling_coordinator;

pub use grid_service::GridService;
pub use scheduling_coordinator::{ExamSchedulingCoordinator, FlowStage, FlowState};
