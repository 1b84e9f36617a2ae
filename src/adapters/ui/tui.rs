//! Implements InputPort. Inquire-based interactive prompts.
//!
//! Main menu: schedule an exam, show the grid, list a cell's exams, export the grid.
//! Esc or Ctrl-C inside a prompt backs out to the menu.
//!
//! A single SIGINT listener is installed for the whole session, which replaces the default
//! handler. It cancels the submission in flight; with nothing in flight (a reload, say) it
//! exits the process with status 130.

use crate::adapters::export::GridCsvExporter;
use crate::domain::{
    AllocationMode, CalendarGrid, Cell, DayKind, DomainError, ExamAssignment, Room, RoomType,
    SchedulingContext,
};
use crate::ports::{AcademicDirectoryPort, InputPort};
use crate::usecases::{ExamSchedulingCoordinator, GridService};
use async_trait::async_trait;
use inquire::{Confirm, InquireError, MultiSelect, Select};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const PAGE_SIZE: usize = 12;
const SIGINT_EXIT_CODE: i32 = 130;

/// Hands SIGINT to the submission in flight, if any.
#[derive(Clone, Default)]
struct InterruptRouter {
    active: Arc<Mutex<Option<CancellationToken>>>,
}

impl InterruptRouter {
    /// Fresh token that the next interrupt cancels.
    async fn arm(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.active.lock().await = Some(token.clone());
        token
    }

    async fn disarm(&self) {
        self.active.lock().await.take();
    }

    /// Cancels the armed token. `false` when nothing was armed.
    async fn interrupt(&self) -> bool {
        match self.active.lock().await.take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    fn listen(&self) -> tokio::task::JoinHandle<()> {
        let router = self.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if router.interrupt().await {
                    info!("submission interrupted");
                    continue;
                }
                warn!("interrupted outside a submission, exiting");
                std::process::exit(SIGINT_EXIT_CODE);
            }
        })
    }
}

/// Labelled value for inquire pickers.
struct Choice<T> {
    label: String,
    value: T,
}

impl<T> Choice<T> {
    fn new(label: impl Into<String>, value: T) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

impl<T> fmt::Display for Choice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuItem {
    Schedule,
    ShowGrid,
    ShowCell,
    Export,
    Reload,
    Quit,
}

impl MenuItem {
    const ALL: [MenuItem; 6] = [
        MenuItem::Schedule,
        MenuItem::ShowGrid,
        MenuItem::ShowCell,
        MenuItem::Export,
        MenuItem::Reload,
        MenuItem::Quit,
    ];
}

impl fmt::Display for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MenuItem::Schedule => "Schedule an exam",
            MenuItem::ShowGrid => "Show session grid",
            MenuItem::ShowCell => "Show exams in a slot",
            MenuItem::Export => "Export grid (CSV)",
            MenuItem::Reload => "Reload calendar and counts",
            MenuItem::Quit => "Quit",
        };
        f.write_str(label)
    }
}

/// `Ok(None)` when the user backed out of the prompt.
fn answered<T>(result: Result<T, InquireError>) -> Result<Option<T>, DomainError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(e) => Err(DomainError::Ui(e.to_string())),
    }
}

fn pick<T>(message: &str, choices: Vec<Choice<T>>) -> Result<Option<T>, DomainError> {
    if choices.is_empty() {
        println!("  (nothing to choose for: {})", message);
        return Ok(None);
    }
    let picked = answered(Select::new(message, choices).with_page_size(PAGE_SIZE).prompt())?;
    Ok(picked.map(|c| c.value))
}

fn room_label(room: &Room) -> String {
    let kind = match room.kind {
        RoomType::ClassRoom => "room",
        RoomType::Amphitheater => "amphi",
    };
    format!("{} ({} seats, {})", room.name, room.capacity, kind)
}

/// TUI adapter. Inquire prompts.
pub struct TuiInputPort {
    ctx: SchedulingContext,
    grid_service: Arc<GridService>,
    coordinator: Mutex<ExamSchedulingCoordinator>,
    directory: Arc<dyn AcademicDirectoryPort>,
    exporter: GridCsvExporter,
    interrupts: InterruptRouter,
}

impl TuiInputPort {
    pub fn new(
        ctx: SchedulingContext,
        grid_service: Arc<GridService>,
        coordinator: ExamSchedulingCoordinator,
        directory: Arc<dyn AcademicDirectoryPort>,
        exporter: GridCsvExporter,
    ) -> Self {
        Self {
            ctx,
            grid_service,
            coordinator: Mutex::new(coordinator),
            directory,
            exporter,
            interrupts: InterruptRouter::default(),
        }
    }

    async fn load(&self) -> Result<CalendarGrid, DomainError> {
        let grid = self.grid_service.load_grid(&self.ctx).await?;
        self.grid_service.refresh_occupancy(&grid).await?;
        Ok(grid)
    }

    /// Schedulable cells with their current exam counts.
    async fn cell_choices(&self, grid: &CalendarGrid) -> Vec<Choice<Cell>> {
        let mut choices = Vec::new();
        for day in self.grid_service.annotate(grid).await {
            for (cell, count) in day.cells {
                let label = format!(
                    "{} {}  {}  [{} exam{}]",
                    cell.date,
                    cell.date.format("%a"),
                    cell.slot,
                    count,
                    if count == 1 { "" } else { "s" }
                );
                choices.push(Choice::new(label, cell));
            }
        }
        choices
    }

    async fn schedule(&self, grid: &CalendarGrid) -> Result<(), DomainError> {
        let mut coordinator = self.coordinator.lock().await;
        coordinator.reset();

        let Some(cell) = pick("Exam slot", self.cell_choices(grid).await)? else {
            return Ok(());
        };
        coordinator.choose_cell(grid, cell.date, cell.position).await?;
        println!(
            "  {} candidate room(s) free in {}",
            coordinator.candidates().len(),
            cell
        );

        let departments = self.directory.list_departments().await?;
        let Some(department) = pick(
            "Department",
            departments
                .into_iter()
                .map(|d| Choice::new(d.name.clone(), d.id))
                .collect(),
        )?
        else {
            return Ok(());
        };

        let teachers = self.directory.list_teachers(department).await?;
        let Some(teacher) = pick(
            "Teacher",
            teachers
                .into_iter()
                .map(|t| Choice::new(t.name.clone(), t.id))
                .collect(),
        )?
        else {
            return Ok(());
        };

        let options = self.directory.list_options(department).await?;
        let Some(option_id) = pick(
            "Option",
            options
                .into_iter()
                .map(|o| {
                    let label = match o.enrolled {
                        Some(n) => format!("{} ({} enrolled)", o, n),
                        None => format!("{} (no headcount)", o),
                    };
                    Choice::new(label, o.id)
                })
                .collect(),
        )?
        else {
            return Ok(());
        };

        let modules = self.directory.list_modules(option_id).await?;
        let Some(module) = pick(
            "Module",
            modules
                .into_iter()
                .map(|m| Choice::new(m.name.clone(), m.id))
                .collect(),
        )?
        else {
            return Ok(());
        };

        let Some(mode) = pick(
            "Room allocation",
            vec![
                Choice::new("Automatic (least unused seats)", AllocationMode::Automatic),
                Choice::new("Manual", AllocationMode::Manual),
            ],
        )?
        else {
            return Ok(());
        };
        coordinator.set_mode(mode)?;

        let required = coordinator.resolve_seats(option_id).await?;
        println!("  {} seat(s) required", required);

        match coordinator.mode() {
            AllocationMode::Automatic => {
                if let Some(allocation) = coordinator.allocation() {
                    println!(
                        "  Rooms: {}  (capacity {}, {} unused)",
                        allocation
                            .rooms
                            .iter()
                            .map(|r| r.name.as_str())
                            .collect::<Vec<_>>()
                            .join(", "),
                        allocation.total_capacity,
                        allocation.excess
                    );
                }
            }
            AllocationMode::Manual => {
                let choices: Vec<Choice<Room>> = coordinator
                    .candidates()
                    .iter()
                    .map(|r| Choice::new(room_label(r), r.clone()))
                    .collect();
                let Some(selected) = answered(
                    MultiSelect::new("Rooms", choices)
                        .with_page_size(PAGE_SIZE)
                        .prompt(),
                )?
                else {
                    return Ok(());
                };
                coordinator.select_rooms(selected.into_iter().map(|c| c.value.id))?;
            }
        }

        let confirmed = answered(
            Confirm::new("Submit this exam?")
                .with_default(true)
                .prompt(),
        )?;
        if confirmed != Some(true) {
            coordinator.reset();
            return Ok(());
        }

        let cancel = self.interrupts.arm().await;
        let assignment = ExamAssignment {
            department,
            teacher,
            module,
        };
        let outcome = coordinator.submit(&self.ctx, assignment, &cancel).await;
        self.interrupts.disarm().await;

        let booking = outcome?;
        println!(
            "  Exam booked on {} {} in {}",
            booking.date,
            booking.slot,
            booking
                .rooms
                .iter()
                .map(|r| r.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(())
    }

    async fn show_grid(&self, grid: &CalendarGrid) {
        let window = grid.window();
        let summary = grid.summary();
        println!(
            "\nSession {}: {} to {}  ({} schedulable days, {} holidays, {} weekly off)",
            self.ctx.session_id,
            window.start_date,
            window.end_date,
            summary.schedulable_days,
            summary.holidays,
            summary.weekly_off_days
        );
        let mut header = format!("{:<16}", "");
        for slot in &window.slots {
            header.push_str(&format!("{:^15}", slot.to_string()));
        }
        println!("{}", header);

        for day in self.grid_service.annotate(grid).await {
            let mut line = format!("{:<16}", format!("{} {}", day.date, day.date.format("%a")));
            match day.kind {
                DayKind::Schedulable => {
                    for (_, count) in &day.cells {
                        line.push_str(&format!("{:^15}", count));
                    }
                }
                DayKind::Holiday => line.push_str(&format!("{:^60}", "--- holiday ---")),
                DayKind::WeeklyOff => line.push_str(&format!("{:^60}", "--- weekly day off ---")),
            }
            println!("{}", line);
        }
        println!();
    }

    async fn show_cell(&self, grid: &CalendarGrid) -> Result<(), DomainError> {
        let Some(cell) = pick("Slot", self.cell_choices(grid).await)? else {
            return Ok(());
        };
        let bookings = self.grid_service.bookings_in(&cell).await?;
        if bookings.is_empty() {
            println!("  No exams in {}", cell);
            return Ok(());
        }
        println!("  Exams in {}:", cell);
        for exam in bookings {
            println!(
                "  - {} | {} | {}",
                exam.module,
                exam.teacher,
                exam.room_names.join(", ")
            );
        }
        Ok(())
    }

    async fn export(&self, grid: &CalendarGrid) -> Result<(), DomainError> {
        let days = self.grid_service.annotate(grid).await;
        let path = self
            .exporter
            .export(self.ctx.session_id, &days, grid.window())
            .await?;
        println!("  Grid written to {}", path.display());
        Ok(())
    }
}

#[async_trait]
impl InputPort for TuiInputPort {
    async fn run(&self) -> Result<(), DomainError> {
        let listener = self.interrupts.listen();
        let mut grid = match self.load().await {
            Ok(grid) => grid,
            Err(e) => {
                listener.abort();
                return Err(e);
            }
        };
        info!(session_id = self.ctx.session_id, "interactive session started");

        loop {
            let item = match answered(Select::new("Menu", MenuItem::ALL.to_vec()).prompt()) {
                Ok(Some(item)) => item,
                Ok(None) => break,
                Err(e) => {
                    listener.abort();
                    return Err(e);
                }
            };
            let outcome = match item {
                MenuItem::Schedule => self.schedule(&grid).await,
                MenuItem::ShowGrid => {
                    self.show_grid(&grid).await;
                    Ok(())
                }
                MenuItem::ShowCell => self.show_cell(&grid).await,
                MenuItem::Export => self.export(&grid).await,
                MenuItem::Reload => match self.load().await {
                    Ok(fresh) => {
                        grid = fresh;
                        Ok(())
                    }
                    Err(e) => Err(e),
                },
                MenuItem::Quit => break,
            };
            if let Err(e) = outcome {
                warn!(kind = ?e.kind(), error = %e, "action failed");
                let hint = if e.is_retryable() { " (retry possible)" } else { "" };
                println!("  x {}{}", e, hint);
            }
        }
        listener.abort();
        info!("interactive session ended");
        Ok(())
    }
}
