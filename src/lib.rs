//! CloudRunner - Cloud Provisioning Workflow Engine
//!
//! Runs declarative provisioning workflows: ordered sets of interdependent
//! tasks, each invoking one remote cloud operation. Candidate workflows
//! drafted by an untrusted generator are first reconciled against a
//! registry of real services and operations.
//!
//! # Architecture
//!
//! The library is organized into these modules:
//!
//! - [`workflow`]: Data model, loading, lint, scheduling and placeholder resolution
//! - [`execution`]: Sequential execution engine with timeouts and retries
//! - [`reconcile`]: Registry validation and the generator correction loop
//! - [`monitoring`]: Per-execution event log
//! - [`config`]: Runtime settings
//! - [`error`]: Error types
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use cloudrunner::config::Settings;
//! use cloudrunner::execution::{EchoInvoker, Engine, ExecutionStore};
//! use cloudrunner::load_workflow;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load a workflow from YAML
//!     let workflow = load_workflow("network.yaml")?;
//!
//!     // Create execution engine
//!     let settings = Settings::load_or_default("cloudrunner.yaml");
//!     let engine = Engine::new(Arc::new(EchoInvoker::new()), ExecutionStore::new(), settings.engine);
//!
//!     // Execute the workflow
//!     let report = engine.execute(workflow).await;
//!     println!("{}", serde_json::to_string_pretty(&report)?);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod execution;
pub mod monitoring;
pub mod reconcile;
pub mod workflow;

// Re-export commonly used types
pub use execution::engine::Engine;
pub use execution::report::ExecutionReport;
pub use reconcile::{Reconciler, ServiceRegistry};
pub use workflow::model::{Task, Workflow};
pub use workflow::parser::load_workflow;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "CloudRunner";

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::{EngineSettings, ReconcileSettings};
    use crate::execution::{EchoInvoker, ExecutionStore};
    use crate::reconcile::ServiceInfo;
    use tempfile::tempdir;

    #[test]
    fn test_module_exports_task() {
        let task = Task::new("list", "ecs", "list_servers");
        assert_eq!(task.name, "list");
        assert_eq!(task.target(), "ecs.list_servers");
    }

    #[test]
    fn test_load_workflow_from_root() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("network.yaml");
        std::fs::write(
            &path,
            "name: network\ntasks:\n  - name: vpc\n    service: vpc\n    operation: create_vpc\n",
        )
        .unwrap();

        let workflow: Workflow = load_workflow(path.to_str().unwrap()).unwrap();
        assert_eq!(workflow.name, "network");
        assert_eq!(workflow.len(), 1);
    }

    #[tokio::test]
    async fn test_root_exports_reconcile_and_execute() {
        let registry = Arc::new(ServiceRegistry::new(vec![ServiceInfo::new(
            "vpc",
            ["create_vpc"],
        )]));
        let reconciler = Reconciler::new(registry, None, ReconcileSettings::default());

        let mut workflow = Workflow::new("wf");
        workflow.add_task(Task::new("vpc", "VPC", "create_vpc"));
        let outcome = reconciler.reconcile(workflow).await;
        assert!(outcome.is_clean());

        let engine = Engine::new(
            Arc::new(EchoInvoker::new()),
            ExecutionStore::new(),
            EngineSettings::default(),
        );
        let report: ExecutionReport = engine.execute(outcome.workflow).await;
        assert!(report.is_success());
        assert_eq!(report.outputs["vpc"]["service"], "vpc");
    }
}
