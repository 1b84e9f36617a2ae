pub mod tui;

pub use tui::TuiInputPort;
