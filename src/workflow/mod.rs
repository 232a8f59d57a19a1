//! Workflow Definition Module
//!
//! Provides data structures and utilities for defining, loading, ordering
//! and parameterizing provisioning workflows.
//!
//! # Structure
//!
//! - [`model`]: Core data structures (Task, Workflow, statuses)
//! - [`parser`]: JSON/YAML loading and generator candidate parsing
//! - [`validator`]: Advisory structural lint
//! - [`planner`]: Dependency-ordered scheduling
//! - [`resolver`]: Placeholder resolution against variables and outputs

pub mod model;
pub mod parser;
pub mod planner;
pub mod resolver;
pub mod validator;

pub use model::{RetryPolicy, Task, TaskKind, TaskStatus, Workflow, WorkflowStatus};
pub use parser::{load_workflow, parse_candidate, save_workflow};
pub use planner::{schedule, Schedule};
pub use resolver::{find_placeholders, ExecutionContext, PlaceholderMode, Resolver};
pub use validator::{lint, lint_issues, LintIssue};
