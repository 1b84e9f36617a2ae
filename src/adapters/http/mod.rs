//! Remote exam service over HTTP (reqwest + serde_json).

pub mod client;
pub mod dto;

pub use client::HttpExamService;
