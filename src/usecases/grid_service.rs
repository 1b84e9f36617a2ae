//! Grid service: load the session calendar and keep the occupancy index fresh.
//!
//! - Fetches the session window and holidays once per scheduling session
//! - Builds the `CalendarGrid` with the configured weekly day off
//! - Queries the exam store per schedulable cell to annotate counts

use crate::domain::{
    AnnotatedDay, BookedExam, CalendarGrid, Cell, DomainError, SchedulingContext,
    SlotOccupancyIndex, WeeklyOff,
};
use crate::ports::{ExamStorePort, SessionPort};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

pub struct GridService {
    sessions: Arc<dyn SessionPort>,
    exams: Arc<dyn ExamStorePort>,
    weekly_off: WeeklyOff,
    occupancy: RwLock<SlotOccupancyIndex>,
}

impl GridService {
    pub fn new(
        sessions: Arc<dyn SessionPort>,
        exams: Arc<dyn ExamStorePort>,
        weekly_off: WeeklyOff,
    ) -> Self {
        Self {
            sessions,
            exams,
            weekly_off,
            occupancy: RwLock::new(SlotOccupancyIndex::new()),
        }
    }

    /// Fetch the session window and holidays, then generate the grid.
    pub async fn load_grid(&self, ctx: &SchedulingContext) -> Result<CalendarGrid, DomainError> {
        let window = self.sessions.get_session_window(ctx.session_id).await?;
        let holidays = self.sessions.list_holidays().await?;
        let grid = CalendarGrid::generate(&window, &holidays, &self.weekly_off);
        let summary = grid.summary();
        info!(
            session_id = ctx.session_id,
            start = %window.start_date,
            end = %window.end_date,
            schedulable_days = summary.schedulable_days,
            cells = summary.schedulable_cells,
            holidays = summary.holidays,
            weekly_off = summary.weekly_off_days,
            "calendar grid generated"
        );
        Ok(grid)
    }

    /// Re-count every schedulable cell. Cells are queried sequentially; the index is
    /// replaced only once all counts are in.
    pub async fn refresh_occupancy(&self, grid: &CalendarGrid) -> Result<(), DomainError> {
        let mut fresh = SlotOccupancyIndex::new();
        for cell in grid.cells() {
            let count = self.exams.count_exams(cell.date, &cell.slot).await?;
            fresh.record(cell, count);
        }
        let total = fresh.total();
        *self.occupancy.write().await = fresh;
        info!(total_exams = total, "occupancy refreshed");
        Ok(())
    }

    /// Re-count one cell (after a submission).
    pub async fn refresh_cell(&self, cell: &Cell) -> Result<u32, DomainError> {
        let count = self.exams.count_exams(cell.date, &cell.slot).await?;
        self.occupancy.write().await.record(cell, count);
        debug!(cell = %cell, count, "cell occupancy refreshed");
        Ok(count)
    }

    pub async fn count_for(&self, cell: &Cell) -> u32 {
        self.occupancy.read().await.count_for(cell)
    }

    pub async fn annotate(&self, grid: &CalendarGrid) -> Vec<AnnotatedDay> {
        self.occupancy.read().await.annotate(grid)
    }

    pub async fn bookings_in(&self, cell: &Cell) -> Result<Vec<BookedExam>, DomainError> {
        self.exams.list_bookings(cell.date, &cell.slot).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryExamService;
    use crate::domain::{DayKind, ExamBooking, Room, RoomType, SessionWindow, SlotPosition};
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, day).unwrap()
    }

    fn service(store: InMemoryExamService) -> GridService {
        let store = Arc::new(store);
        GridService::new(store.clone(), store, WeeklyOff::sunday())
    }

    #[tokio::test]
    async fn loads_grid_and_annotates_counts() {
        let window = SessionWindow::with_default_slots(d(6), d(12));
        let booked = ExamBooking {
            date: d(7),
            slot: window.slots[1],
            option: 1,
            module: 1,
            teacher: 1,
            department: 1,
            rooms: vec![Room::new("1", "A1", 40, RoomType::ClassRoom)],
        };
        let svc = service(
            InMemoryExamService::new()
                .with_session(1, window)
                .with_holiday(d(8))
                .with_exam(1, booked),
        );

        let ctx = SchedulingContext::new(1);
        let grid = svc.load_grid(&ctx).await.unwrap();
        svc.refresh_occupancy(&grid).await.unwrap();

        let cell = grid.select(d(7), SlotPosition::Morning2).unwrap();
        assert_eq!(svc.count_for(&cell).await, 1);
        assert_eq!(svc.bookings_in(&cell).await.unwrap().len(), 1);

        let days = svc.annotate(&grid).await;
        assert_eq!(days.len(), 7);
        assert_eq!(days[2].kind, DayKind::Holiday);
        assert_eq!(days[6].kind, DayKind::WeeklyOff);
        let total: u32 = days.iter().flat_map(|d| d.cells.iter()).map(|(_, n)| n).sum();
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn unknown_session_surfaces_error() {
        let svc = service(InMemoryExamService::new());
        let err = svc.load_grid(&SchedulingContext::new(42)).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidRecord(_)));
    }
}
