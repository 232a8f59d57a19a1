//! Execution Monitoring Module
//!
//! Records the event log of each execution.
//!
//! # Components
//!
//! - [`ExecutionLog`]: Ordered task and workflow events with timing

pub mod timeline;

pub use timeline::{EventType, ExecutionLog, LogEntry};
