//! Workflow Execution Module
//!
//! Provides the engine that runs provisioning workflows, the transport
//! contract it calls through, and the record it keeps of each run.
//!
//! # Architecture
//!
//! - [`engine`]: Main execution engine orchestrating workflow runs
//! - [`invoker`]: Remote operation transport contract
//! - [`store`]: Shared in-memory record of executions
//! - [`report`]: Execution summaries

pub mod engine;
pub mod invoker;
pub mod report;
pub mod store;

pub use engine::Engine;
pub use invoker::{EchoInvoker, Invoker};
pub use report::{ExecutionReport, TaskStats};
pub use store::ExecutionStore;
