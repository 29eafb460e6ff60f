//! Price ladder — multi-stage retail pricing with bidirectional editing.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod engine;
pub mod format;
pub mod commentary;
pub mod dashboard;
