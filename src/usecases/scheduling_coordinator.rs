//! Exam scheduling coordinator. Drives one scheduling action at a time:
//!
//! `Idle -> SlotChosen -> SeatsResolved -> Allocated -> Submitted`, with `Failed` reachable
//! from any step. Failures are terminal for the action; `reset` starts over from `Idle`.
//!
//! - Rejects non-schedulable cells before any allocation work
//! - Required seats come from the option's registered headcount
//! - Automatic mode re-allocates whenever seats or the candidate rooms change; manual mode
//!   validates the user's selection at submission
//! - Rooms already booked in the chosen cell are never candidates
//! - Submission is the single cancellable network call

use crate::domain::allocator;
use crate::domain::{
    AllocationMode, AllocationRequest, AllocationResult, CalendarGrid, Cell, DomainError,
    ExamAssignment, ExamBooking, OptionId, Room, RoomId, SchedulingContext, SlotPosition,
};
use crate::ports::{ExamStorePort, OptionRegistryPort, RoomCatalogPort};
use crate::usecases::grid_service::GridService;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    SlotChosen {
        cell: Cell,
    },
    SeatsResolved {
        cell: Cell,
        option_id: OptionId,
        required_seats: u32,
    },
    Allocated {
        cell: Cell,
        option_id: OptionId,
        required_seats: u32,
        allocation: AllocationResult,
    },
    Submitted {
        booking: ExamBooking,
    },
    Failed {
        error: DomainError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStage {
    Idle,
    SlotChosen,
    SeatsResolved,
    Allocated,
    Submitted,
    Failed,
}

impl FlowState {
    pub fn stage(&self) -> FlowStage {
        match self {
            FlowState::Idle => FlowStage::Idle,
            FlowState::SlotChosen { .. } => FlowStage::SlotChosen,
            FlowState::SeatsResolved { .. } => FlowStage::SeatsResolved,
            FlowState::Allocated { .. } => FlowStage::Allocated,
            FlowState::Submitted { .. } => FlowStage::Submitted,
            FlowState::Failed { .. } => FlowStage::Failed,
        }
    }
}

const IN_CELL: &[FlowStage] = &[
    FlowStage::SlotChosen,
    FlowStage::SeatsResolved,
    FlowStage::Allocated,
];
const SEATS_KNOWN: &[FlowStage] = &[FlowStage::SeatsResolved, FlowStage::Allocated];

pub struct ExamSchedulingCoordinator {
    rooms: Arc<dyn RoomCatalogPort>,
    options: Arc<dyn OptionRegistryPort>,
    exams: Arc<dyn ExamStorePort>,
    grid: Arc<GridService>,
    available_rooms_only: bool,
    state: FlowState,
    mode: AllocationMode,
    manual_selection: BTreeSet<RoomId>,
    /// Catalog snapshot for the chosen cell, minus rooms already booked there.
    candidates: Vec<Room>,
    booked: BTreeSet<RoomId>,
}

impl ExamSchedulingCoordinator {
    pub fn new(
        rooms: Arc<dyn RoomCatalogPort>,
        options: Arc<dyn OptionRegistryPort>,
        exams: Arc<dyn ExamStorePort>,
        grid: Arc<GridService>,
        available_rooms_only: bool,
    ) -> Self {
        Self {
            rooms,
            options,
            exams,
            grid,
            available_rooms_only,
            state: FlowState::Idle,
            mode: AllocationMode::Automatic,
            manual_selection: BTreeSet::new(),
            candidates: Vec::new(),
            booked: BTreeSet::new(),
        }
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn stage(&self) -> FlowStage {
        self.state.stage()
    }

    pub fn mode(&self) -> AllocationMode {
        self.mode
    }

    pub fn candidates(&self) -> &[Room] {
        &self.candidates
    }

    pub fn allocation(&self) -> Option<&AllocationResult> {
        match &self.state {
            FlowState::Allocated { allocation, .. } => Some(allocation),
            _ => None,
        }
    }

    /// Abandon the current action and return to `Idle` in automatic mode.
    pub fn reset(&mut self) {
        self.state = FlowState::Idle;
        self.mode = AllocationMode::Automatic;
        self.manual_selection.clear();
        self.candidates.clear();
        self.booked.clear();
    }

    /// `Idle -> SlotChosen`. The cell is validated against the grid before anything else.
    pub async fn choose_cell(
        &mut self,
        grid: &CalendarGrid,
        date: NaiveDate,
        position: SlotPosition,
    ) -> Result<Cell, DomainError> {
        self.require_stage(&[FlowStage::Idle], "choose a cell")?;
        let cell = match grid.select(date, position) {
            Ok(cell) => cell,
            Err(e) => return Err(self.fail(e)),
        };
        self.state = FlowState::SlotChosen { cell };
        if let Err(e) = self.load_candidates(&cell).await {
            return Err(self.fail(e));
        }
        info!(
            cell = %cell,
            candidates = self.candidates.len(),
            booked = self.booked.len(),
            "slot chosen"
        );
        Ok(cell)
    }

    /// `SlotChosen -> SeatsResolved` (and on to `Allocated` in automatic mode).
    /// Choosing another option later re-resolves and re-allocates.
    pub async fn resolve_seats(&mut self, option_id: OptionId) -> Result<u32, DomainError> {
        self.require_stage(IN_CELL, "resolve seats")?;
        let cell = self.current_cell()?;
        let option = match self.options.get_option(option_id).await {
            Ok(option) => option,
            Err(e) => return Err(self.fail(e)),
        };
        let Some(required_seats) = option.and_then(|o| o.enrolled) else {
            return Err(self.fail(DomainError::MissingEnrollment { option_id }));
        };

        self.state = FlowState::SeatsResolved {
            cell,
            option_id,
            required_seats,
        };
        info!(option_id, required_seats, "seats resolved");

        if self.mode == AllocationMode::Automatic {
            self.run_allocation()?;
        }
        Ok(required_seats)
    }

    /// Switch allocation mode. Clears any manual selection; automatic mode re-allocates
    /// immediately when seats are known.
    pub fn set_mode(&mut self, mode: AllocationMode) -> Result<(), DomainError> {
        self.require_stage(
            &[
                FlowStage::Idle,
                FlowStage::SlotChosen,
                FlowStage::SeatsResolved,
                FlowStage::Allocated,
            ],
            "change mode",
        )?;
        self.mode = mode;
        self.manual_selection.clear();
        debug!(?mode, "allocation mode set");

        if SEATS_KNOWN.contains(&self.stage()) {
            let (cell, option_id, required_seats) = self.resolved()?;
            self.state = FlowState::SeatsResolved {
                cell,
                option_id,
                required_seats,
            };
            if mode == AllocationMode::Automatic {
                self.run_allocation()?;
            }
        }
        Ok(())
    }

    /// Record the user's manual room choice. Validation of emptiness and capacity waits
    /// for submission; a room already booked in the cell is refused now.
    pub fn select_rooms(
        &mut self,
        room_ids: impl IntoIterator<Item = RoomId>,
    ) -> Result<(), DomainError> {
        self.require_stage(IN_CELL, "select rooms")?;
        if self.mode != AllocationMode::Manual {
            return Err(DomainError::OutOfOrder(
                "room selection requires manual mode".into(),
            ));
        }
        let selection: BTreeSet<RoomId> = room_ids.into_iter().collect();
        if let Some(room_id) = self.first_booked(&selection) {
            return Err(self.fail(DomainError::RoomConflict { room_id }));
        }
        self.manual_selection = selection;

        if self.stage() == FlowStage::Allocated {
            let (cell, option_id, required_seats) = self.resolved()?;
            self.state = FlowState::SeatsResolved {
                cell,
                option_id,
                required_seats,
            };
        }
        Ok(())
    }

    /// Reload the room catalog and the cell's bookings. Automatic mode re-allocates when the
    /// candidate set changed.
    pub async fn refresh_candidates(&mut self) -> Result<(), DomainError> {
        self.require_stage(IN_CELL, "refresh rooms")?;
        let cell = self.current_cell()?;
        let changed = match self.load_candidates(&cell).await {
            Ok(changed) => changed,
            Err(e) => return Err(self.fail(e)),
        };
        if changed
            && self.mode == AllocationMode::Automatic
            && SEATS_KNOWN.contains(&self.stage())
        {
            self.run_allocation()?;
        }
        Ok(())
    }

    /// `SeatsResolved -> Allocated` on demand.
    pub fn allocate(&mut self) -> Result<AllocationResult, DomainError> {
        self.require_stage(SEATS_KNOWN, "allocate")?;
        self.run_allocation()
    }

    /// `Allocated -> Submitted`. Manual selections are allocated (and validated) here.
    /// Cancelling `cancel` discards the in-flight request and fails the action with
    /// `Cancelled`; nothing is undone on the store side.
    pub async fn submit(
        &mut self,
        ctx: &SchedulingContext,
        assignment: ExamAssignment,
        cancel: &CancellationToken,
    ) -> Result<ExamBooking, DomainError> {
        self.require_stage(SEATS_KNOWN, "submit")?;
        let current = match (&self.state, self.mode) {
            (FlowState::Allocated { allocation, .. }, AllocationMode::Automatic) => {
                Some(allocation.clone())
            }
            _ => None,
        };
        let allocation = match current {
            Some(allocation) => allocation,
            None => self.run_allocation()?,
        };
        let (cell, option_id, _) = self.resolved()?;

        let booking = ExamBooking {
            date: cell.date,
            slot: cell.slot,
            option: option_id,
            module: assignment.module,
            teacher: assignment.teacher,
            department: assignment.department,
            rooms: allocation.rooms,
        };

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DomainError::Cancelled),
            res = self.exams.create_exam(ctx.session_id, &booking) => res,
        };
        if let Err(e) = outcome {
            return Err(self.fail(e));
        }

        info!(
            session_id = ctx.session_id,
            cell = %cell,
            option_id,
            rooms = booking.rooms.len(),
            "exam submitted"
        );
        if let Err(e) = self.grid.refresh_cell(&cell).await {
            warn!(cell = %cell, error = %e, "occupancy refresh failed after submission");
        }
        self.state = FlowState::Submitted {
            booking: booking.clone(),
        };
        Ok(booking)
    }

    fn run_allocation(&mut self) -> Result<AllocationResult, DomainError> {
        let (cell, option_id, required_seats) = self.resolved()?;
        let request = match self.mode {
            AllocationMode::Automatic => AllocationRequest::automatic(required_seats),
            AllocationMode::Manual => {
                let conflict = self.first_booked(&self.manual_selection);
                if let Some(room_id) = conflict {
                    return Err(self.fail(DomainError::RoomConflict { room_id }));
                }
                AllocationRequest::manual(required_seats, self.manual_selection.iter().cloned())
            }
        };

        match allocator::allocate(&request, &self.candidates) {
            Ok(allocation) => {
                info!(
                    mode = ?self.mode,
                    required_seats,
                    rooms = allocation.rooms.len(),
                    total_capacity = allocation.total_capacity,
                    excess = allocation.excess,
                    "rooms allocated"
                );
                self.state = FlowState::Allocated {
                    cell,
                    option_id,
                    required_seats,
                    allocation: allocation.clone(),
                };
                Ok(allocation)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Fetch the catalog and the cell's bookings; returns whether the candidate set changed.
    async fn load_candidates(&mut self, cell: &Cell) -> Result<bool, DomainError> {
        let catalog = self.rooms.list_rooms(self.available_rooms_only).await?;
        let bookings = self.exams.list_bookings(cell.date, &cell.slot).await?;
        let booked: BTreeSet<RoomId> = bookings.into_iter().flat_map(|b| b.room_ids).collect();
        let candidates: Vec<Room> = catalog
            .into_iter()
            .filter(|r| !booked.contains(&r.id))
            .collect();
        let changed = candidates != self.candidates;
        debug!(
            cell = %cell,
            candidates = candidates.len(),
            booked = booked.len(),
            changed,
            "candidate rooms loaded"
        );
        self.candidates = candidates;
        self.booked = booked;
        Ok(changed)
    }

    /// First room of `selection` already holding an exam in the chosen cell.
    fn first_booked(&self, selection: &BTreeSet<RoomId>) -> Option<RoomId> {
        selection.iter().find(|id| self.booked.contains(*id)).cloned()
    }

    fn current_cell(&self) -> Result<Cell, DomainError> {
        match &self.state {
            FlowState::SlotChosen { cell }
            | FlowState::SeatsResolved { cell, .. }
            | FlowState::Allocated { cell, .. } => Ok(*cell),
            other => Err(DomainError::OutOfOrder(format!(
                "no cell chosen ({:?})",
                other.stage()
            ))),
        }
    }

    fn resolved(&self) -> Result<(Cell, OptionId, u32), DomainError> {
        match &self.state {
            FlowState::SeatsResolved {
                cell,
                option_id,
                required_seats,
            }
            | FlowState::Allocated {
                cell,
                option_id,
                required_seats,
                ..
            } => Ok((*cell, *option_id, *required_seats)),
            other => Err(DomainError::OutOfOrder(format!(
                "seats not resolved ({:?})",
                other.stage()
            ))),
        }
    }

    fn require_stage(&self, allowed: &[FlowStage], action: &str) -> Result<(), DomainError> {
        let stage = self.stage();
        if allowed.contains(&stage) {
            Ok(())
        } else {
            Err(DomainError::OutOfOrder(format!(
                "cannot {} while {:?}",
                action, stage
            )))
        }
    }

    fn fail(&mut self, error: DomainError) -> DomainError {
        warn!(stage = ?self.stage(), error = %error, "scheduling action failed");
        self.state = FlowState::Failed {
            error: error.clone(),
        };
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryExamService;
    use crate::domain::{CourseOption, RoomType, SessionWindow, WeeklyOff};

    const SESSION: i64 = 1;
    const OPT_75: OptionId = 10;
    const OPT_95: OptionId = 11;
    const OPT_NO_HEADCOUNT: OptionId = 12;
    const OPT_HUGE: OptionId = 13;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, day).unwrap()
    }

    fn option(id: OptionId, enrolled: Option<u32>) -> CourseOption {
        CourseOption {
            id,
            name: format!("Option {}", id),
            year: Some(1),
            enrolled,
            department_id: Some(1),
        }
    }

    fn room(id: &str, capacity: u32) -> Room {
        Room::new(id, format!("Salle {}", id), capacity, RoomType::ClassRoom)
    }

    /// Monday 6th to Sunday 12th January 2025, holiday on the 8th.
    fn store() -> InMemoryExamService {
        InMemoryExamService::new()
            .with_session(SESSION, SessionWindow::with_default_slots(d(6), d(12)))
            .with_holiday(d(8))
            .with_room(room("r1", 50))
            .with_room(room("r2", 40))
            .with_room(room("r3", 30))
            .with_room(room("r4", 20))
            .with_room(room("r5", 10))
            .with_option(option(OPT_75, Some(75)))
            .with_option(option(OPT_95, Some(95)))
            .with_option(option(OPT_NO_HEADCOUNT, None))
            .with_option(option(OPT_HUGE, Some(500)))
    }

    struct Harness {
        store: Arc<InMemoryExamService>,
        grid_service: Arc<GridService>,
        grid: CalendarGrid,
        coordinator: ExamSchedulingCoordinator,
    }

    async fn harness(store: InMemoryExamService) -> Harness {
        let store = Arc::new(store);
        let grid_service = Arc::new(GridService::new(
            store.clone(),
            store.clone(),
            WeeklyOff::sunday(),
        ));
        let grid = grid_service
            .load_grid(&SchedulingContext::new(SESSION))
            .await
            .unwrap();
        grid_service.refresh_occupancy(&grid).await.unwrap();
        let coordinator = ExamSchedulingCoordinator::new(
            store.clone(),
            store.clone(),
            store.clone(),
            grid_service.clone(),
            true,
        );
        Harness {
            store,
            grid_service,
            grid,
            coordinator,
        }
    }

    fn assignment() -> ExamAssignment {
        ExamAssignment {
            department: 1,
            teacher: 2,
            module: 3,
        }
    }

    fn ids(rooms: &[Room]) -> Vec<&str> {
        rooms.iter().map(|r| r.id.as_str()).collect()
    }

    #[tokio::test]
    async fn automatic_flow_submits_and_refreshes_occupancy() {
        let mut h = harness(store()).await;
        let cell = h
            .coordinator
            .choose_cell(&h.grid, d(6), SlotPosition::Morning1)
            .await
            .unwrap();
        assert_eq!(h.coordinator.stage(), FlowStage::SlotChosen);

        let seats = h.coordinator.resolve_seats(OPT_75).await.unwrap();
        assert_eq!(seats, 75);
        assert_eq!(h.coordinator.stage(), FlowStage::Allocated);
        let allocation = h.coordinator.allocation().unwrap();
        assert_eq!(ids(&allocation.rooms), vec!["r1", "r2"]);
        assert_eq!(allocation.excess, 15);

        let booking = h
            .coordinator
            .submit(
                &SchedulingContext::new(SESSION),
                assignment(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(booking.date, d(6));
        assert_eq!(booking.option, OPT_75);
        assert_eq!(booking.module, 3);
        assert_eq!(h.coordinator.stage(), FlowStage::Submitted);
        assert_eq!(h.store.exams().await.len(), 1);
        assert_eq!(h.grid_service.count_for(&cell).await, 1);
    }

    #[tokio::test]
    async fn excluded_cells_fail_before_allocation() {
        let mut h = harness(store()).await;
        let err = h
            .coordinator
            .choose_cell(&h.grid, d(8), SlotPosition::Morning1)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidCell { .. }));
        assert_eq!(h.coordinator.stage(), FlowStage::Failed);
        assert!(h.coordinator.candidates().is_empty());

        h.coordinator.reset();
        let err = h
            .coordinator
            .choose_cell(&h.grid, d(12), SlotPosition::Afternoon2)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidCell { .. }));
    }

    #[tokio::test]
    async fn missing_headcount_fails_the_action() {
        for option_id in [OPT_NO_HEADCOUNT, 999] {
            let mut h = harness(store()).await;
            h.coordinator
                .choose_cell(&h.grid, d(7), SlotPosition::Morning1)
                .await
                .unwrap();
            let err = h.coordinator.resolve_seats(option_id).await.unwrap_err();
            assert_eq!(err, DomainError::MissingEnrollment { option_id });
            assert_eq!(
                h.coordinator.state(),
                &FlowState::Failed {
                    error: DomainError::MissingEnrollment { option_id }
                }
            );
        }
    }

    #[tokio::test]
    async fn insufficient_catalog_fails_automatic_allocation() {
        let mut h = harness(store()).await;
        h.coordinator
            .choose_cell(&h.grid, d(7), SlotPosition::Morning1)
            .await
            .unwrap();
        let err = h.coordinator.resolve_seats(OPT_HUGE).await.unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientCapacity {
                required: 500,
                available: 150
            }
        );
        assert_eq!(h.coordinator.stage(), FlowStage::Failed);
    }

    #[tokio::test]
    async fn changing_option_reallocates_automatically() {
        let mut h = harness(store()).await;
        h.coordinator
            .choose_cell(&h.grid, d(7), SlotPosition::Morning1)
            .await
            .unwrap();
        h.coordinator.resolve_seats(OPT_75).await.unwrap();
        h.coordinator.resolve_seats(OPT_95).await.unwrap();
        let allocation = h.coordinator.allocation().unwrap();
        assert_eq!(ids(&allocation.rooms), vec!["r2", "r3", "r4", "r5"]);
        assert_eq!(allocation.total_capacity, 100);
    }

    #[tokio::test]
    async fn manual_mode_validates_selection_at_submission() {
        let mut h = harness(store()).await;
        h.coordinator.set_mode(AllocationMode::Manual).unwrap();
        h.coordinator
            .choose_cell(&h.grid, d(9), SlotPosition::Afternoon1)
            .await
            .unwrap();
        h.coordinator.resolve_seats(OPT_75).await.unwrap();
        assert_eq!(h.coordinator.stage(), FlowStage::SeatsResolved);

        let err = h
            .coordinator
            .submit(
                &SchedulingContext::new(SESSION),
                assignment(),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::EmptySelection);
        assert!(h.store.exams().await.is_empty());
    }

    #[tokio::test]
    async fn mode_survives_the_flow_until_reset() {
        let mut h = harness(store()).await;
        assert_eq!(h.coordinator.mode(), AllocationMode::Automatic);
        h.coordinator.set_mode(AllocationMode::Manual).unwrap();
        h.coordinator
            .choose_cell(&h.grid, d(9), SlotPosition::Afternoon1)
            .await
            .unwrap();
        h.coordinator.resolve_seats(OPT_75).await.unwrap();
        assert_eq!(h.coordinator.mode(), AllocationMode::Manual);
        assert!(h.coordinator.allocation().is_none());

        h.coordinator.reset();
        assert_eq!(h.coordinator.mode(), AllocationMode::Automatic);
        assert_eq!(h.coordinator.stage(), FlowStage::Idle);
    }

    #[tokio::test]
    async fn manual_selection_is_submitted_in_allocation_order() {
        let mut h = harness(store()).await;
        h.coordinator
            .choose_cell(&h.grid, d(9), SlotPosition::Afternoon1)
            .await
            .unwrap();
        h.coordinator.resolve_seats(OPT_75).await.unwrap();
        h.coordinator.set_mode(AllocationMode::Manual).unwrap();
        assert_eq!(h.coordinator.stage(), FlowStage::SeatsResolved);

        h.coordinator
            .select_rooms([RoomId::from("r4"), RoomId::from("r1"), RoomId::from("r5")])
            .unwrap();
        let booking = h
            .coordinator
            .submit(
                &SchedulingContext::new(SESSION),
                assignment(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(ids(&booking.rooms), vec!["r1", "r4", "r5"]);
    }

    #[tokio::test]
    async fn rooms_booked_in_the_cell_are_not_candidates() {
        let window = SessionWindow::with_default_slots(d(6), d(12));
        let existing = ExamBooking {
            date: d(7),
            slot: window.slots[0],
            option: 99,
            module: 99,
            teacher: 99,
            department: 1,
            rooms: vec![room("r1", 50)],
        };
        let mut h = harness(store().with_exam(SESSION, existing)).await;
        h.coordinator
            .choose_cell(&h.grid, d(7), SlotPosition::Morning1)
            .await
            .unwrap();
        assert_eq!(h.coordinator.candidates().len(), 4);

        h.coordinator.resolve_seats(OPT_75).await.unwrap();
        let allocation = h.coordinator.allocation().unwrap();
        assert_eq!(ids(&allocation.rooms), vec!["r2", "r3", "r4"]);

        h.coordinator.set_mode(AllocationMode::Manual).unwrap();
        let err = h
            .coordinator
            .select_rooms([RoomId::from("r1")])
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::RoomConflict {
                room_id: RoomId::from("r1")
            }
        );
    }

    #[tokio::test]
    async fn refresh_reallocates_when_candidates_change() {
        let mut h = harness(store()).await;
        let cell = h
            .coordinator
            .choose_cell(&h.grid, d(10), SlotPosition::Morning2)
            .await
            .unwrap();
        h.coordinator.resolve_seats(OPT_75).await.unwrap();
        assert_eq!(
            ids(&h.coordinator.allocation().unwrap().rooms),
            vec!["r1", "r2"]
        );

        // Someone else books r1 in the same cell meanwhile.
        let other = ExamBooking {
            date: cell.date,
            slot: cell.slot,
            option: 99,
            module: 99,
            teacher: 99,
            department: 1,
            rooms: vec![room("r1", 50)],
        };
        h.store.create_exam(SESSION, &other).await.unwrap();

        h.coordinator.refresh_candidates().await.unwrap();
        assert_eq!(
            ids(&h.coordinator.allocation().unwrap().rooms),
            vec!["r2", "r3", "r4"]
        );
    }

    #[tokio::test]
    async fn store_rejection_is_surfaced() {
        let mut h = harness(store().rejecting("module already examined")).await;
        h.coordinator
            .choose_cell(&h.grid, d(6), SlotPosition::Morning1)
            .await
            .unwrap();
        h.coordinator.resolve_seats(OPT_75).await.unwrap();
        let err = h
            .coordinator
            .submit(
                &SchedulingContext::new(SESSION),
                assignment(),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::SubmissionRejected("module already examined".into())
        );
        assert!(!err.is_retryable());
        assert_eq!(h.coordinator.stage(), FlowStage::Failed);
    }

    #[tokio::test]
    async fn cancelled_submission_is_discarded() {
        let mut h = harness(store().with_delay(5_000)).await;
        h.coordinator
            .choose_cell(&h.grid, d(6), SlotPosition::Morning1)
            .await
            .unwrap();
        h.coordinator.resolve_seats(OPT_75).await.unwrap();

        let token = CancellationToken::new();
        token.cancel();
        let err = h
            .coordinator
            .submit(&SchedulingContext::new(SESSION), assignment(), &token)
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::Cancelled);
        assert!(h.store.exams().await.is_empty());
    }

    #[tokio::test]
    async fn steps_out_of_order_leave_state_untouched() {
        let mut h = harness(store()).await;
        let err = h
            .coordinator
            .submit(
                &SchedulingContext::new(SESSION),
                assignment(),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::OutOfOrder(_)));
        assert_eq!(h.coordinator.stage(), FlowStage::Idle);

        let err = h.coordinator.resolve_seats(OPT_75).await.unwrap_err();
        assert!(matches!(err, DomainError::OutOfOrder(_)));
        assert_eq!(h.coordinator.stage(), FlowStage::Idle);
    }

    #[tokio::test]
    async fn failed_action_restarts_from_idle() {
        let mut h = harness(store()).await;
        h.coordinator
            .choose_cell(&h.grid, d(8), SlotPosition::Morning1)
            .await
            .unwrap_err();
        assert!(
            h.coordinator
                .choose_cell(&h.grid, d(9), SlotPosition::Morning1)
                .await
                .is_err()
        );

        h.coordinator.reset();
        h.coordinator
            .choose_cell(&h.grid, d(9), SlotPosition::Morning1)
            .await
            .unwrap();
        assert_eq!(h.coordinator.stage(), FlowStage::SlotChosen);
    }
}
