//! Workflow Lint
//!
//! Structural checks that go beyond [`Workflow::validate`]:
//! - Duplicate task names
//! - Dependencies on unknown tasks, and on the task itself
//! - Remote operations missing a service or operation
//! - Tasks that cannot be scheduled because of a dependency cycle
//!
//! Lint findings are advisory. Only `Workflow::validate` decides whether a
//! workflow may execute; the scheduler copes with cycles and unknown
//! dependencies on its own.

use std::collections::HashSet;

use log::{debug, info};

use super::model::Workflow;
use super::planner::schedule;

/// A structural problem found by [`lint_issues`].
#[derive(Debug, Clone, PartialEq)]
pub enum LintIssue {
    /// A problem reported by `Workflow::validate`
    Invalid(String),
    EmptyTaskName,
    DuplicateTaskName(String),
    UnknownDependency { task: String, dependency: String },
    SelfDependency(String),
    MissingService(String),
    MissingOperation(String),
    DependencyCycle(String),
}

impl std::fmt::Display for LintIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(message) => write!(f, "{}", message),
            Self::EmptyTaskName => write!(f, "A task has an empty name"),
            Self::DuplicateTaskName(name) => write!(f, "Duplicate task name: '{}'", name),
            Self::UnknownDependency { task, dependency } => {
                write!(f, "Task '{}' depends on unknown task '{}'", task, dependency)
            }
            Self::SelfDependency(task) => write!(f, "Task '{}' depends on itself", task),
            Self::MissingService(task) => write!(f, "Task '{}' has no service specified", task),
            Self::MissingOperation(task) => {
                write!(f, "Task '{}' has no operation specified", task)
            }
            Self::DependencyCycle(task) => write!(
                f,
                "Task '{}' is part of (or waits on) a dependency cycle",
                task
            ),
        }
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(|s| s.trim().is_empty()).unwrap_or(true)
}

/// Runs every structural check and returns the findings.
pub fn lint_issues(workflow: &Workflow) -> Vec<LintIssue> {
    let mut issues: Vec<LintIssue> = workflow
        .validate()
        .into_iter()
        .map(LintIssue::Invalid)
        .collect();

    let names: HashSet<&str> = workflow.tasks.iter().map(|t| t.name.as_str()).collect();
    let mut seen: HashSet<&str> = HashSet::new();

    for task in &workflow.tasks {
        if task.name.trim().is_empty() {
            issues.push(LintIssue::EmptyTaskName);
        } else if !seen.insert(task.name.as_str()) {
            issues.push(LintIssue::DuplicateTaskName(task.name.clone()));
        }

        for dep in &task.depends_on {
            if *dep == task.name {
                issues.push(LintIssue::SelfDependency(task.name.clone()));
            } else if !names.contains(dep.as_str()) {
                issues.push(LintIssue::UnknownDependency {
                    task: task.name.clone(),
                    dependency: dep.clone(),
                });
            }
        }

        if task.kind.is_executable() {
            if is_blank(&task.service) {
                issues.push(LintIssue::MissingService(task.name.clone()));
            }
            if is_blank(&task.operation) {
                issues.push(LintIssue::MissingOperation(task.name.clone()));
            }
        }
    }

    // Unknown dependencies also leave tasks unscheduled; those were reported above.
    let plan = schedule(&workflow.tasks);
    for &index in &plan.unresolved {
        let task = &workflow.tasks[index];
        let all_known = task
            .depends_on
            .iter()
            .all(|dep| names.contains(dep.as_str()) && *dep != task.name);
        if all_known {
            issues.push(LintIssue::DependencyCycle(task.name.clone()));
        }
    }

    if issues.is_empty() {
        info!("Workflow '{}' passed lint ({} tasks)", workflow.name, workflow.len());
    } else {
        debug!("Workflow '{}' has {} lint findings", workflow.name, issues.len());
    }

    issues
}

/// Runs every structural check and returns the findings as messages.
pub fn lint(workflow: &Workflow) -> Vec<String> {
    lint_issues(workflow).iter().map(|i| i.to_string()).collect()
}
