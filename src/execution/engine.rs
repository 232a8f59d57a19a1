//! Workflow Execution Engine
//!
//! Runs a workflow's tasks one at a time in dependency order:
//! - Parameter placeholders resolved against variables and earlier outputs
//! - Per-task timeouts and retries with exponential backoff
//! - Halt on the first terminal failure unless configured otherwise
//! - A panicking invoker fails its task instead of the whole execution
//! - Every state change published to the [`ExecutionStore`]

use std::any::Any;
use std::sync::Arc;

use chrono::Utc;
use log::{error, info, warn};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use super::invoker::Invoker;
use super::report::ExecutionReport;
use super::store::ExecutionStore;
use crate::config::EngineSettings;
use crate::error::TaskError;
use crate::monitoring::{EventType, ExecutionLog, LogEntry};
use crate::workflow::{
    schedule, ExecutionContext, PlaceholderMode, Resolver, Task, TaskStatus, Workflow,
    WorkflowStatus,
};

/// How a task's attempt loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskEnd {
    Finished,
    Cancelled,
}

/// Workflow execution engine.
///
/// The engine owns no cloud client: remote operations go through the
/// injected [`Invoker`], and every execution is recorded in the injected
/// [`ExecutionStore`].
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use cloudrunner::config::EngineSettings;
/// use cloudrunner::execution::{EchoInvoker, Engine, ExecutionStore};
/// use cloudrunner::load_workflow;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let workflow = load_workflow("network.yaml")?;
///     let engine = Engine::new(
///         Arc::new(EchoInvoker::new()),
///         ExecutionStore::new(),
///         EngineSettings::default(),
///     );
///
///     let report = engine.execute(workflow).await;
///     println!("{}: {}", report.execution_id, report.status);
///     Ok(())
/// }
/// ```
pub struct Engine {
    invoker: Arc<dyn Invoker>,
    store: ExecutionStore,
    settings: EngineSettings,
    resolver: Resolver,
}

impl Engine {
    /// Creates an engine over a transport and a store.
    pub fn new(invoker: Arc<dyn Invoker>, store: ExecutionStore, settings: EngineSettings) -> Self {
        let mode = if settings.strict_placeholders {
            PlaceholderMode::Strict
        } else {
            PlaceholderMode::BestEffort
        };

        Self {
            invoker,
            store,
            settings,
            resolver: Resolver::new(mode),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn store(&self) -> &ExecutionStore {
        &self.store
    }

    /// Executes a workflow to completion.
    pub async fn execute(&self, workflow: Workflow) -> ExecutionReport {
        self.execute_with_cancel(workflow, CancellationToken::new())
            .await
    }

    /// Executes a workflow, stopping before the next task once `cancel`
    /// fires.
    ///
    /// A cancelled execution keeps the statuses its tasks reached and ends
    /// with status `cancelled`, including when the token fires while a
    /// task waits to retry. A workflow that fails validation is stored
    /// and reported as `failed` without running any task.
    pub async fn execute_with_cancel(
        &self,
        mut workflow: Workflow,
        cancel: CancellationToken,
    ) -> ExecutionReport {
        let execution_id = uuid::Uuid::new_v4().to_string();
        info!(
            "Starting workflow '{}' (execution {})",
            workflow.name, execution_id
        );

        let errors = workflow.validate();
        if !errors.is_empty() {
            error!(
                "Workflow '{}' failed validation: {}",
                workflow.name,
                errors.join("; ")
            );
            workflow.status = WorkflowStatus::Failed;
            self.store.insert(&execution_id, workflow.clone());
            return ExecutionReport::rejected(&execution_id, &workflow, errors);
        }

        let mut context = ExecutionContext::new(workflow.variables.clone());
        workflow.status = WorkflowStatus::Running;
        workflow.start_time = Some(Utc::now());
        workflow.end_time = None;
        self.store.insert(&execution_id, workflow.clone());
        self.log(
            &execution_id,
            EventType::WorkflowStarted,
            json!({
                "workflow_id": workflow.id,
                "workflow_name": workflow.name,
                "task_count": workflow.tasks.len(),
            }),
        );

        let plan = schedule(&workflow.tasks);
        let mut cancelled = false;

        for index in plan.order {
            if cancel.is_cancelled() {
                warn!("Execution {} cancelled", execution_id);
                cancelled = true;
                break;
            }

            let end = self
                .run_task(&execution_id, &mut workflow, index, &mut context, &cancel)
                .await;
            if end == TaskEnd::Cancelled {
                cancelled = true;
                break;
            }

            let task = &workflow.tasks[index];
            if task.status.is_failure() && !self.settings.continue_on_failure {
                warn!(
                    "Halting workflow '{}' after task '{}' ended {:?}",
                    workflow.name, task.name, task.status
                );
                break;
            }
        }

        workflow.status = if cancelled {
            WorkflowStatus::Cancelled
        } else {
            workflow.determine_final_status()
        };
        workflow.end_time = Some(Utc::now());
        self.store.update(&execution_id, &workflow);

        let report = ExecutionReport::from_workflow(&execution_id, &workflow);
        self.log(
            &execution_id,
            EventType::WorkflowFinished,
            json!({
                "status": report.status,
                "duration_secs": report.duration_secs,
            }),
        );

        info!(
            "Workflow '{}' finished: {} ({}/{} tasks succeeded)",
            workflow.name, report.status, report.task_stats.success, report.task_stats.total
        );
        report
    }

    /// Validates a workflow without invoking anything or recording it.
    pub fn dry_run(&self, workflow: &Workflow) -> ExecutionReport {
        let execution_id = uuid::Uuid::new_v4().to_string();

        let errors = workflow.validate();
        if !errors.is_empty() {
            warn!("Dry run of '{}' failed validation", workflow.name);
            return ExecutionReport::rejected(&execution_id, workflow, errors);
        }

        let plan = schedule(&workflow.tasks);
        for (position, &index) in plan.order.iter().enumerate() {
            let task = &workflow.tasks[index];
            info!(
                "[DRY RUN] {}. {} ({})",
                position + 1,
                task.name,
                task.target()
            );
        }

        info!("Workflow '{}' validated", workflow.name);
        ExecutionReport::validated(&execution_id, workflow)
    }

    /// Returns the current report of an execution, if known.
    pub fn get_status(&self, execution_id: &str) -> Option<ExecutionReport> {
        self.store
            .workflow(execution_id)
            .map(|workflow| ExecutionReport::from_workflow(execution_id, &workflow))
    }

    /// Returns the event log of an execution, if known.
    pub fn get_log(&self, execution_id: &str) -> Option<ExecutionLog> {
        self.store.log(execution_id)
    }

    /// Reports of the most recent executions, oldest first.
    pub fn list_executions(&self, limit: usize) -> Vec<ExecutionReport> {
        let ids = self.store.ids();
        let skip = ids.len().saturating_sub(limit);

        ids[skip..]
            .iter()
            .filter_map(|id| self.get_status(id))
            .collect()
    }

    fn log(&self, execution_id: &str, event: EventType, data: Value) {
        self.store.append(execution_id, LogEntry::new(event, data));
    }

    /// Runs one task through all of its attempts.
    async fn run_task(
        &self,
        execution_id: &str,
        workflow: &mut Workflow,
        index: usize,
        context: &mut ExecutionContext,
        cancel: &CancellationToken,
    ) -> TaskEnd {
        loop {
            let task = {
                let task = &mut workflow.tasks[index];
                task.status = TaskStatus::Running;
                task.attempts += 1;
                task.start_time = Some(Utc::now());
                task.end_time = None;
                task.clone()
            };
            self.store.update(execution_id, workflow);

            info!(
                "Executing task: {} ({}) attempt {}",
                task.name,
                task.target(),
                task.attempts
            );
            self.log(
                execution_id,
                EventType::TaskStarted,
                json!({
                    "task_id": task.id,
                    "task_name": task.name,
                    "service": task.service,
                    "operation": task.operation,
                    "attempt": task.attempts,
                }),
            );

            let outcome = self.attempt(&task, context).await;
            let slot = &mut workflow.tasks[index];
            slot.end_time = Some(Utc::now());

            let err = match outcome {
                Ok(output) => {
                    let output_size = output.to_string().len();
                    slot.status = TaskStatus::Success;
                    slot.output = Some(output.clone());
                    slot.error = None;
                    if !task.name.is_empty() {
                        context.record_output(task.name.clone(), output);
                    }
                    self.store.update(execution_id, workflow);

                    info!("Task '{}' completed", task.name);
                    self.log(
                        execution_id,
                        EventType::TaskCompleted,
                        json!({
                            "task_id": task.id,
                            "task_name": task.name,
                            "status": "success",
                            "attempt": task.attempts,
                            "output_size": output_size,
                        }),
                    );
                    return TaskEnd::Finished;
                }
                Err(err) => err,
            };

            let message = err.to_string();
            slot.status = match err {
                TaskError::Timeout(_) => TaskStatus::Timeout,
                _ => TaskStatus::Failed,
            };
            slot.error = Some(message.clone());
            let retry = err.is_retryable() && slot.can_retry();
            self.store.update(execution_id, workflow);

            error!(
                "Task '{}' failed (attempt {}): {}",
                task.name, task.attempts, message
            );
            self.log(
                execution_id,
                EventType::TaskFailed,
                json!({
                    "task_id": task.id,
                    "task_name": task.name,
                    "error": message,
                    "attempt": task.attempts,
                }),
            );

            if !retry {
                return TaskEnd::Finished;
            }

            let base = task
                .retry_policy
                .as_ref()
                .and_then(|policy| policy.backoff_base)
                .unwrap_or(self.settings.backoff_base);
            let delay = self.settings.backoff_delay(base, task.attempts);

            info!(
                "Retrying task '{}' in {:?} (attempt {} done)",
                task.name, delay, task.attempts
            );
            self.log(
                execution_id,
                EventType::TaskRetry,
                json!({
                    "task_id": task.id,
                    "task_name": task.name,
                    "attempt": task.attempts,
                    "delay_ms": delay.as_millis() as u64,
                }),
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => {
                    warn!("Cancelled while waiting to retry '{}'", task.name);
                    return TaskEnd::Cancelled;
                }
            }
        }
    }

    /// Performs a single attempt of a task.
    async fn attempt(&self, task: &Task, context: &ExecutionContext) -> Result<Value, TaskError> {
        if !task.kind.is_executable() {
            return Err(TaskError::UnsupportedKind(task.kind.as_str().to_string()));
        }

        let service = non_blank(&task.service).ok_or(TaskError::MissingTarget("service"))?;
        let operation = non_blank(&task.operation).ok_or(TaskError::MissingTarget("operation"))?;

        let parameters = self.resolver.resolve(&task.parameters, context)?;
        let limit = task
            .timeout
            .map(std::time::Duration::from_secs)
            .unwrap_or_else(|| self.settings.default_timeout());

        let invoker = Arc::clone(&self.invoker);
        let (service, operation) = (service.to_string(), operation.to_string());
        let mut handle = tokio::spawn(async move {
            invoker
                .invoke(&service, &operation, parameters, limit)
                .await
        });

        let outcome = tokio::time::timeout(limit, &mut handle).await;
        match outcome {
            Ok(Ok(result)) => Ok(result?),
            Ok(Err(join_error)) if join_error.is_panic() => {
                Err(TaskError::Internal(panic_message(join_error.into_panic())))
            }
            Ok(Err(join_error)) => Err(TaskError::Internal(join_error.to_string())),
            Err(_) => {
                handle.abort();
                Err(TaskError::Timeout(limit))
            }
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
