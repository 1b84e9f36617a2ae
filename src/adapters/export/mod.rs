//! Grid export. Writes the annotated calendar grid to disk.

pub mod grid_csv;

pub use grid_csv::{GridCsvExporter, grid_to_csv};
