//! Execution Report
//!
//! Summary returned by the engine after a run, a dry run, or a status
//! query.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::workflow::{TaskStatus, Workflow};

/// Status string used by dry runs.
pub const VALIDATED: &str = "validated";

/// Task counts by status.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskStats {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub timeout: usize,
    pub skipped: usize,
    pub pending: usize,
}

impl TaskStats {
    pub fn from_workflow(workflow: &Workflow) -> Self {
        let count = |status: TaskStatus| {
            workflow
                .tasks
                .iter()
                .filter(|t| t.status == status)
                .count()
        };

        Self {
            total: workflow.tasks.len(),
            success: count(TaskStatus::Success),
            failed: count(TaskStatus::Failed),
            timeout: count(TaskStatus::Timeout),
            skipped: count(TaskStatus::Skipped),
            pending: count(TaskStatus::Pending),
        }
    }
}

/// Outcome of one execution.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ExecutionReport {
    pub execution_id: String,
    pub workflow_id: String,
    pub workflow_name: String,
    /// A workflow status name, or `validated` for a dry run
    pub status: String,
    pub task_stats: TaskStats,
    /// Non-null outputs keyed by task name
    pub outputs: BTreeMap<String, Value>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_secs: f64,
    pub errors: Vec<String>,
}

impl ExecutionReport {
    /// Builds a report from a workflow snapshot.
    pub fn from_workflow(execution_id: &str, workflow: &Workflow) -> Self {
        let outputs = workflow
            .tasks
            .iter()
            .filter(|t| !t.name.is_empty())
            .filter_map(|t| match &t.output {
                Some(output) if !output.is_null() => Some((t.name.clone(), output.clone())),
                _ => None,
            })
            .collect();

        let duration_secs = match (workflow.start_time, workflow.end_time) {
            (Some(start), Some(end)) => (end - start).num_milliseconds() as f64 / 1000.0,
            _ => 0.0,
        };

        Self {
            execution_id: execution_id.to_string(),
            workflow_id: workflow.id.clone(),
            workflow_name: workflow.name.clone(),
            status: workflow.status.to_string(),
            task_stats: TaskStats::from_workflow(workflow),
            outputs,
            start_time: workflow.start_time,
            end_time: workflow.end_time,
            duration_secs,
            errors: workflow
                .tasks
                .iter()
                .filter_map(|t| t.error.clone())
                .collect(),
        }
    }

    /// Report for a workflow that was rejected before any task ran.
    pub fn rejected(execution_id: &str, workflow: &Workflow, errors: Vec<String>) -> Self {
        let mut report = Self::from_workflow(execution_id, workflow);
        report.status = crate::workflow::WorkflowStatus::Failed.to_string();
        report.errors = errors;
        report
    }

    /// Report for a dry run that passed validation.
    pub fn validated(execution_id: &str, workflow: &Workflow) -> Self {
        let mut report = Self::from_workflow(execution_id, workflow);
        report.status = VALIDATED.to_string();
        report
    }

    pub fn is_success(&self) -> bool {
        self.status == "success" || self.status == VALIDATED
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{Task, WorkflowStatus};
    use serde_json::json;

    #[test]
    fn test_report_counts_and_outputs() {
        let mut workflow = Workflow::new("report");
        let mut a = Task::new("a", "ecs", "op");
        a.status = TaskStatus::Success;
        a.output = Some(json!({"id": 1}));
        let mut b = Task::new("b", "ecs", "op");
        b.status = TaskStatus::Success;
        b.output = Some(Value::Null);
        let mut c = Task::new("c", "ecs", "op");
        c.status = TaskStatus::Timeout;
        c.error = Some("timed out".to_string());
        let d = Task::new("d", "ecs", "op");
        for t in [a, b, c, d] {
            workflow.add_task(t);
        }
        workflow.status = WorkflowStatus::PartialSuccess;

        let report = ExecutionReport::from_workflow("e1", &workflow);
        assert_eq!(report.status, "partial_success");
        assert_eq!(
            report.task_stats,
            TaskStats {
                total: 4,
                success: 2,
                failed: 0,
                timeout: 1,
                skipped: 0,
                pending: 1,
            }
        );
        assert_eq!(report.outputs.len(), 1);
        assert_eq!(report.outputs["a"], json!({"id": 1}));
        assert_eq!(report.errors, vec!["timed out"]);
        assert_eq!(report.duration_secs, 0.0);
    }

    #[test]
    fn test_duration_from_times() {
        let mut workflow = Workflow::new("timed");
        let start = Utc::now();
        workflow.start_time = Some(start);
        workflow.end_time = Some(start + chrono::Duration::milliseconds(1500));

        let report = ExecutionReport::from_workflow("e1", &workflow);
        assert_eq!(report.duration_secs, 1.5);
    }

    #[test]
    fn test_validated_and_rejected() {
        let workflow = Workflow::new("wf");
        assert_eq!(ExecutionReport::validated("e", &workflow).status, VALIDATED);

        let rejected = ExecutionReport::rejected("e", &workflow, vec!["bad".to_string()]);
        assert_eq!(rejected.status, "failed");
        assert_eq!(rejected.errors, vec!["bad"]);
        assert!(!rejected.is_success());
    }
}
