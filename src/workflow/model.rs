//! Workflow Data Model
//!
//! Core data structures representing a provisioning workflow, its tasks,
//! and their lifecycle statuses.
//!
//! # Example JSON Format
//!
//! ```json
//! {
//!   "name": "network",
//!   "variables": { "cidr": "10.0.0.0/16" },
//!   "tasks": [
//!     {
//!       "name": "create_vpc",
//!       "type": "remote_operation",
//!       "service": "vpc",
//!       "operation": "create_vpc",
//!       "parameters": { "cidr": "{{ variables.cidr }}" }
//!     },
//!     {
//!       "name": "create_subnet",
//!       "service": "vpc",
//!       "operation": "create_subnet",
//!       "parameters": { "vpc_id": "{{ outputs.create_vpc.vpc.id }}" },
//!       "depends_on": ["create_vpc"],
//!       "retry_policy": { "max_attempts": 3 }
//!     }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Lifecycle status of a single task.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not yet started
    #[default]
    Pending,
    /// An attempt is in flight
    Running,
    /// Completed with an output
    Success,
    /// Last attempt failed
    Failed,
    /// Not executed by policy
    Skipped,
    /// Last attempt exceeded the task timeout
    Timeout,
}

impl TaskStatus {
    /// Returns true once the task can no longer change state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Success | Self::Failed | Self::Skipped | Self::Timeout
        )
    }

    /// Returns true for the statuses that count as a failed task.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::Timeout)
    }
}

/// Overall status of a workflow.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    #[default]
    Draft,
    Ready,
    Running,
    Success,
    PartialSuccess,
    Failed,
    Cancelled,
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Draft => "draft",
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Success => "success",
            Self::PartialSuccess => "partial_success",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(text)
    }
}

/// Kind of work a task performs.
///
/// Only [`TaskKind::RemoteOperation`] is executable; the other kinds are
/// reserved and fail at the engine's task boundary.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    #[default]
    #[serde(alias = "huaweicloud_api")]
    RemoteOperation,
    Conditional,
    Loop,
    Wait,
    Parallel,
    Script,
}

impl TaskKind {
    pub fn is_executable(&self) -> bool {
        matches!(self, Self::RemoteOperation)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RemoteOperation => "remote_operation",
            Self::Conditional => "conditional",
            Self::Loop => "loop",
            Self::Wait => "wait",
            Self::Parallel => "parallel",
            Self::Script => "script",
        }
    }
}

/// How often a failing task is attempted.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Overrides the engine's backoff base for this task
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_base: Option<f64>,
}

fn default_max_attempts() -> u32 {
    1
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff_base: None,
        }
    }
}

fn empty_parameters() -> Value {
    Value::Object(Map::new())
}

/// A single unit of work targeting one (service, operation) pair.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Task {
    /// Unique identifier (generated when absent)
    #[serde(default)]
    pub id: String,

    /// Addressable key for dependencies and output references
    #[serde(default)]
    pub name: String,

    #[serde(rename = "type", default)]
    pub kind: TaskKind,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub service: Option<String>,

    #[serde(default)]
    pub operation: Option<String>,

    /// Parameter tree, possibly containing placeholders
    #[serde(default = "empty_parameters")]
    pub parameters: Value,

    /// Names of tasks that must run first
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Reserved; not evaluated by the engine
    #[serde(default)]
    pub condition: Option<String>,

    #[serde(default)]
    pub retry_policy: Option<RetryPolicy>,

    /// Timeout in seconds
    #[serde(default)]
    pub timeout: Option<u64>,

    #[serde(default)]
    pub status: TaskStatus,

    #[serde(default)]
    pub output: Option<Value>,

    #[serde(default)]
    pub error: Option<String>,

    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub attempts: u32,
}

impl Task {
    /// Creates a remote-operation task.
    ///
    /// # Example
    ///
    /// ```
    /// use cloudrunner::workflow::{RetryPolicy, Task};
    /// use serde_json::json;
    ///
    /// let task = Task::new("create_subnet", "vpc", "create_subnet")
    ///     .with_parameters(json!({ "vpc_id": "{{ outputs.create_vpc.vpc.id }}" }))
    ///     .depends_on("create_vpc")
    ///     .with_retry(RetryPolicy::new(3));
    /// ```
    pub fn new(
        name: impl Into<String>,
        service: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into().trim().to_string(),
            kind: TaskKind::RemoteOperation,
            description: String::new(),
            service: Some(service.into()),
            operation: Some(operation.into()),
            parameters: empty_parameters(),
            depends_on: Vec::new(),
            condition: None,
            retry_policy: None,
            timeout: None,
            status: TaskStatus::Pending,
            output: None,
            error: None,
            start_time: None,
            end_time: None,
            attempts: 0,
        }
    }

    pub fn with_kind(mut self, kind: TaskKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = parameters;
        self
    }

    /// Adds a dependency on another task, by name.
    pub fn depends_on(mut self, task_name: impl Into<String>) -> Self {
        self.depends_on.push(task_name.into());
        self
    }

    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Sets the timeout in seconds.
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = Some(seconds);
        self
    }

    /// Returns `service.operation` for log lines.
    pub fn target(&self) -> String {
        format!(
            "{}.{}",
            self.service.as_deref().unwrap_or("?"),
            self.operation.as_deref().unwrap_or("?")
        )
    }

    /// Returns true when the retry policy allows another attempt.
    pub fn can_retry(&self) -> bool {
        self.retry_policy
            .as_ref()
            .map(|policy| self.attempts < policy.max_attempts)
            .unwrap_or(false)
    }
}

fn default_version() -> String {
    "1.0".to_string()
}

/// A named, versioned collection of tasks with shared variables.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Workflow {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default = "default_version")]
    pub version: String,

    /// Static inputs referenced by `{{ variables.<key> }}`
    #[serde(default)]
    pub variables: BTreeMap<String, Value>,

    /// Tasks in declaration order (not execution order)
    #[serde(default)]
    pub tasks: Vec<Task>,

    #[serde(default)]
    pub status: WorkflowStatus,

    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
}

impl Workflow {
    /// Creates a new empty draft workflow.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            description: String::new(),
            version: default_version(),
            variables: BTreeMap::new(),
            tasks: Vec::new(),
            status: WorkflowStatus::Draft,
            start_time: None,
            end_time: None,
        }
    }

    /// Sets a workflow variable.
    pub fn with_variable(mut self, key: impl Into<String>, value: Value) -> Self {
        self.variables.insert(key.into(), value);
        self
    }

    /// Appends a task. Dependencies are not checked here.
    pub fn add_task(&mut self, task: Task) {
        self.tasks.push(task);
    }

    /// Returns the problems that make this workflow unfit for execution.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.tasks.is_empty() {
            errors.push("Workflow must contain at least one task".to_string());
        }
        errors
    }

    /// Gets a task by name.
    pub fn get_task(&self, name: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.name == name)
    }

    /// Gets a mutable reference to a task by name.
    pub fn get_task_mut(&mut self, name: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.name == name)
    }

    /// Computes the overall status from the task statuses.
    pub fn determine_final_status(&self) -> WorkflowStatus {
        let statuses = || self.tasks.iter().map(|t| t.status);

        if statuses().any(|s| s == TaskStatus::Running) {
            return WorkflowStatus::Running;
        }
        if statuses().all(|s| s == TaskStatus::Success) {
            return WorkflowStatus::Success;
        }

        let has_failure = statuses().any(|s| s.is_failure());
        let has_success = statuses().any(|s| s == TaskStatus::Success);

        if has_failure && has_success {
            WorkflowStatus::PartialSuccess
        } else {
            WorkflowStatus::Failed
        }
    }

    /// Serializes to the wire form exchanged with generators.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Returns the number of tasks in the workflow.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns true if the workflow has no tasks.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl Default for Workflow {
    fn default() -> Self {
        Self::new("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn workflow_with_statuses(statuses: &[TaskStatus]) -> Workflow {
        let mut workflow = Workflow::new("statuses");
        for (i, status) in statuses.iter().enumerate() {
            let mut task = Task::new(format!("t{}", i), "ecs", "list_servers");
            task.status = *status;
            workflow.add_task(task);
        }
        workflow
    }

    #[test]
    fn test_task_creation() {
        let task = Task::new("create_vpc", "vpc", "create_vpc")
            .with_parameters(json!({"name": "main"}))
            .with_timeout(30);

        assert_eq!(task.name, "create_vpc");
        assert_eq!(task.kind, TaskKind::RemoteOperation);
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.timeout, Some(30));
        assert!(!task.id.is_empty());
        assert_eq!(task.target(), "vpc.create_vpc");
    }

    #[test]
    fn test_task_depends_on_multiple() {
        let task = Task::new("server", "ecs", "create_servers")
            .depends_on("subnet")
            .depends_on("security_group");

        assert_eq!(task.depends_on, vec!["subnet", "security_group"]);
    }

    #[test]
    fn test_can_retry() {
        let mut task = Task::new("t", "ecs", "op").with_retry(RetryPolicy::new(2));
        task.attempts = 1;
        assert!(task.can_retry());
        task.attempts = 2;
        assert!(!task.can_retry());

        let no_policy = Task::new("t", "ecs", "op");
        assert!(!no_policy.can_retry());
    }

    #[test]
    fn test_validate_empty_workflow() {
        let workflow = Workflow::new("empty");
        let errors = workflow.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("at least one task"));
    }

    #[test]
    fn test_add_task_accepts_unknown_dependency() {
        let mut workflow = Workflow::new("wf");
        workflow.add_task(Task::new("a", "ecs", "op").depends_on("ghost"));
        assert_eq!(workflow.len(), 1);
        assert!(workflow.validate().is_empty());
    }

    #[test]
    fn test_final_status_all_success() {
        let workflow = workflow_with_statuses(&[TaskStatus::Success, TaskStatus::Success]);
        assert_eq!(workflow.determine_final_status(), WorkflowStatus::Success);
    }

    #[test]
    fn test_final_status_partial_success() {
        let workflow = workflow_with_statuses(&[TaskStatus::Success, TaskStatus::Failed]);
        assert_eq!(
            workflow.determine_final_status(),
            WorkflowStatus::PartialSuccess
        );
    }

    #[test]
    fn test_final_status_all_failed() {
        let workflow = workflow_with_statuses(&[TaskStatus::Failed, TaskStatus::Failed]);
        assert_eq!(workflow.determine_final_status(), WorkflowStatus::Failed);
    }

    #[test]
    fn test_final_status_running_wins() {
        let workflow = workflow_with_statuses(&[
            TaskStatus::Success,
            TaskStatus::Failed,
            TaskStatus::Running,
        ]);
        assert_eq!(workflow.determine_final_status(), WorkflowStatus::Running);
    }

    #[test]
    fn test_final_status_timeout_counts_as_failure() {
        let workflow = workflow_with_statuses(&[TaskStatus::Success, TaskStatus::Timeout]);
        assert_eq!(
            workflow.determine_final_status(),
            WorkflowStatus::PartialSuccess
        );
    }

    #[test]
    fn test_final_status_halted_after_failure() {
        let workflow = workflow_with_statuses(&[
            TaskStatus::Success,
            TaskStatus::Failed,
            TaskStatus::Pending,
        ]);
        assert_eq!(
            workflow.determine_final_status(),
            WorkflowStatus::PartialSuccess
        );
    }

    #[test]
    fn test_task_kind_accepts_legacy_tag() {
        let task: Task = serde_json::from_value(json!({
            "name": "t",
            "type": "huaweicloud_api"
        }))
        .unwrap();
        assert_eq!(task.kind, TaskKind::RemoteOperation);
    }

    #[test]
    fn test_task_kind_rejects_unknown_tag() {
        let result: Result<Task, _> = serde_json::from_value(json!({
            "name": "t",
            "type": "teleport"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_wire_shape() {
        let mut workflow = Workflow::new("wire");
        workflow.add_task(Task::new("a", "ecs", "op").with_retry(RetryPolicy::new(3)));

        let value = workflow.to_json();
        for field in [
            "id", "name", "description", "version", "variables", "tasks", "status",
            "start_time", "end_time",
        ] {
            assert!(value.get(field).is_some(), "missing workflow field {}", field);
        }

        let task = &value["tasks"][0];
        for field in [
            "id", "name", "type", "description", "service", "operation", "parameters",
            "depends_on", "condition", "retry_policy", "timeout", "output", "error",
            "start_time", "end_time", "attempts",
        ] {
            assert!(task.get(field).is_some(), "missing task field {}", field);
        }
        assert_eq!(task["type"], "remote_operation");
        assert_eq!(task["retry_policy"]["max_attempts"], 3);
        assert_eq!(value["status"], "draft");
    }

    #[test]
    fn test_task_defaults_from_sparse_json() {
        let task: Task = serde_json::from_value(json!({"name": "sparse"})).unwrap();
        assert_eq!(task.parameters, json!({}));
        assert!(task.depends_on.is_empty());
        assert_eq!(task.attempts, 0);
        assert_eq!(task.status, TaskStatus::Pending);
    }

    #[test]
    fn test_get_task_mut() {
        let mut workflow = Workflow::new("wf");
        workflow.add_task(Task::new("a", "ecs", "op"));

        workflow.get_task_mut("a").unwrap().service = Some("vpc".to_string());
        assert_eq!(workflow.get_task("a").unwrap().service.as_deref(), Some("vpc"));
        assert!(workflow.get_task("missing").is_none());
    }
}
