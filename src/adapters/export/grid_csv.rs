//! Annotated grid to CSV. Uses the `csv` crate for quoting.
//!
//! Format: `Date;Day;Status;<one column per slot>`. Schedulable rows carry the exam count
//! per slot; holiday and weekly-off rows repeat their status across the slot columns.

use crate::domain::{AnnotatedDay, DayKind, DomainError, SessionId, SessionWindow};
use std::path::PathBuf;
use tokio::fs;
use tracing::info;

fn status_label(kind: DayKind) -> &'static str {
    match kind {
        DayKind::Schedulable => "SCHEDULABLE",
        DayKind::Holiday => "HOLIDAY",
        DayKind::WeeklyOff => "WEEKLY_OFF",
    }
}

/// Render the annotated grid as semicolon-delimited CSV with a header row.
pub fn grid_to_csv(days: &[AnnotatedDay], window: &SessionWindow) -> Result<String, csv::Error> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .from_writer(Vec::new());

    let mut header = vec!["Date".to_string(), "Day".to_string(), "Status".to_string()];
    header.extend(window.slots.iter().map(|slot| slot.to_string()));
    wtr.write_record(&header)?;

    for day in days {
        let mut row = vec![
            day.date.format("%Y-%m-%d").to_string(),
            day.date.format("%a").to_string(),
            status_label(day.kind).to_string(),
        ];
        if day.kind == DayKind::Schedulable {
            row.extend(day.cells.iter().map(|(_, count)| count.to_string()));
        } else {
            row.extend(window.slots.iter().map(|_| status_label(day.kind).to_string()));
        }
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    let bytes = wtr.into_inner().map_err(|e| {
        csv::Error::from(std::io::Error::new(
            std::io::ErrorKind::Other,
            e.to_string(),
        ))
    })?;
    String::from_utf8(bytes).map_err(|e| {
        csv::Error::from(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            e.to_string(),
        ))
    })
}

/// Writes grid exports into a directory, one file per session.
pub struct GridCsvExporter {
    dir: PathBuf,
}

impl GridCsvExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Write `grid_session_<id>.csv` and return its path.
    pub async fn export(
        &self,
        session_id: SessionId,
        days: &[AnnotatedDay],
        window: &SessionWindow,
    ) -> Result<PathBuf, DomainError> {
        let csv = grid_to_csv(days, window)
            .map_err(|e| DomainError::Export(format!("render grid: {}", e)))?;

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| DomainError::Export(format!("create export dir: {}", e)))?;
        let path = self.dir.join(format!("grid_session_{}.csv", session_id));
        fs::write(&path, csv)
            .await
            .map_err(|e| DomainError::Export(format!("write {}: {}", path.display(), e)))?;

        info!(path = %path.display(), days = days.len(), "grid exported");
        Ok(path)
    }
}
