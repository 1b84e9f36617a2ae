//! Infrastructure adapters. Implement ports.
//!
//! Remote exam service (HTTP), in-memory fixture store, CSV export, terminal UI.
//! Map errors to DomainError.

pub mod export;
pub mod http;
pub mod memory;
pub mod ui;
