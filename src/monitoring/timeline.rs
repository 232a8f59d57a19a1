//! Execution Log
//!
//! Append-only record of what happened during one execution, used for
//! status queries and timing reports.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Type of log event.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    WorkflowStarted,
    /// An attempt of a task began
    TaskStarted,
    TaskCompleted,
    /// An attempt of a task failed
    TaskFailed,
    /// A failed task will be attempted again after a delay
    TaskRetry,
    WorkflowFinished,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WorkflowStarted => "workflow_started",
            Self::TaskStarted => "task_started",
            Self::TaskCompleted => "task_completed",
            Self::TaskFailed => "task_failed",
            Self::TaskRetry => "task_retry",
            Self::WorkflowFinished => "workflow_finished",
        }
    }
}

/// A single entry in the execution log.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub event: EventType,
    /// Event payload; task events carry `task_id` and `task_name`
    pub data: Value,
}

impl LogEntry {
    pub fn new(event: EventType, data: Value) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
            data,
        }
    }

    /// Returns the `task_name` carried by task events.
    pub fn task_name(&self) -> Option<&str> {
        self.data.get("task_name").and_then(Value::as_str)
    }
}

/// Ordered log of one execution.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct ExecutionLog {
    entries: Vec<LogEntry>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event stamped with the current time.
    pub fn record(&mut self, event: EventType, data: Value) {
        self.push(LogEntry::new(event, data));
    }

    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Counts entries of one type.
    pub fn count(&self, event: EventType) -> usize {
        self.entries.iter().filter(|e| e.event == event).count()
    }

    /// Entries concerning one task, in order.
    pub fn for_task<'a>(&'a self, task_name: &'a str) -> impl Iterator<Item = &'a LogEntry> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.task_name() == Some(task_name))
    }

    /// Returns task durations in milliseconds.
    ///
    /// A task's duration runs from its first start to its last completion
    /// or failure, so retries and backoff are included.
    pub fn durations(&self) -> HashMap<String, i64> {
        let mut starts: HashMap<&str, DateTime<Utc>> = HashMap::new();
        let mut durations: HashMap<String, i64> = HashMap::new();

        for entry in &self.entries {
            let Some(name) = entry.task_name() else {
                continue;
            };

            match entry.event {
                EventType::TaskStarted => {
                    starts.entry(name).or_insert(entry.timestamp);
                }
                EventType::TaskCompleted | EventType::TaskFailed => {
                    if let Some(start) = starts.get(name) {
                        let elapsed = (entry.timestamp - *start).num_milliseconds();
                        durations.insert(name.to_string(), elapsed);
                    }
                }
                _ => {}
            }
        }

        durations
    }

    /// Renders a plain-text summary, one line per entry.
    pub fn render(&self) -> String {
        let mut output = String::from("\nExecution Log:\n\n");

        for entry in &self.entries {
            let subject = entry.task_name().unwrap_or("-");
            output.push_str(&format!(
                "{} {:18} {}\n",
                entry.timestamp.format("%H:%M:%S%.3f"),
                entry.event.as_str(),
                subject
            ));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn entry_at(offset_ms: i64, event: EventType, task: &str) -> LogEntry {
        let base = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        LogEntry {
            timestamp: base + Duration::milliseconds(offset_ms),
            event,
            data: json!({"task_id": format!("id-{}", task), "task_name": task}),
        }
    }

    #[test]
    fn test_log_creation() {
        let log = ExecutionLog::new();
        assert!(log.is_empty());
    }

    #[test]
    fn test_record_and_count() {
        let mut log = ExecutionLog::new();
        log.record(EventType::WorkflowStarted, json!({"workflow_name": "wf"}));
        log.record(EventType::TaskStarted, json!({"task_name": "a"}));
        log.record(EventType::TaskFailed, json!({"task_name": "a", "error": "boom"}));
        log.record(EventType::TaskRetry, json!({"task_name": "a", "attempt": 1}));

        assert_eq!(log.len(), 4);
        assert_eq!(log.count(EventType::TaskRetry), 1);
        assert_eq!(log.for_task("a").count(), 3);
    }

    #[test]
    fn test_durations_span_retries() {
        let mut log = ExecutionLog::new();
        log.push(entry_at(0, EventType::TaskStarted, "a"));
        log.push(entry_at(100, EventType::TaskFailed, "a"));
        log.push(entry_at(150, EventType::TaskStarted, "a"));
        log.push(entry_at(400, EventType::TaskCompleted, "a"));
        log.push(entry_at(400, EventType::TaskStarted, "b"));
        log.push(entry_at(450, EventType::TaskCompleted, "b"));

        let durations = log.durations();
        assert_eq!(durations["a"], 400);
        assert_eq!(durations["b"], 50);
    }

    #[test]
    fn test_durations_only_started() {
        let mut log = ExecutionLog::new();
        log.push(entry_at(0, EventType::TaskStarted, "a"));
        assert!(log.durations().is_empty());
    }

    #[test]
    fn test_event_serializes_snake_case() {
        let entry = entry_at(0, EventType::TaskRetry, "a");
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["event"], "task_retry");
        assert_eq!(value["data"]["task_name"], "a");
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_render_lists_entries() {
        let mut log = ExecutionLog::new();
        log.push(entry_at(0, EventType::TaskStarted, "create_vpc"));
        let text = log.render();
        assert!(text.contains("task_started"));
        assert!(text.contains("create_vpc"));
    }
}
