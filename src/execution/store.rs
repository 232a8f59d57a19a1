//! Execution Store
//!
//! In-memory record of every execution: the latest workflow snapshot and
//! the append-only event log. Cloning a store shares the underlying map,
//! so an engine and its observers can hold the same store.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::warn;

use crate::monitoring::{ExecutionLog, LogEntry};
use crate::workflow::Workflow;

#[derive(Debug, Clone)]
struct ExecutionRecord {
    workflow: Workflow,
    log: ExecutionLog,
}

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<String, ExecutionRecord>,
    /// Execution ids in insertion order
    order: Vec<String>,
}

/// Thread-safe map from execution id to workflow snapshot and log.
#[derive(Debug, Clone, Default)]
pub struct ExecutionStore {
    inner: Arc<RwLock<Inner>>,
}

impl ExecutionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|poisoned| {
            warn!("Execution store lock was poisoned; continuing");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|poisoned| {
            warn!("Execution store lock was poisoned; continuing");
            poisoned.into_inner()
        })
    }

    /// Registers a new execution with an empty log.
    ///
    /// Re-inserting an existing id replaces its snapshot and clears its log.
    pub fn insert(&self, execution_id: &str, workflow: Workflow) {
        let mut inner = self.write();
        let record = ExecutionRecord {
            workflow,
            log: ExecutionLog::new(),
        };
        if inner.records.insert(execution_id.to_string(), record).is_none() {
            inner.order.push(execution_id.to_string());
        }
    }

    /// Replaces the workflow snapshot of a known execution.
    ///
    /// Returns false when the id is unknown.
    pub fn update(&self, execution_id: &str, workflow: &Workflow) -> bool {
        match self.write().records.get_mut(execution_id) {
            Some(record) => {
                record.workflow = workflow.clone();
                true
            }
            None => false,
        }
    }

    /// Appends a log entry to a known execution.
    pub fn append(&self, execution_id: &str, entry: LogEntry) -> bool {
        match self.write().records.get_mut(execution_id) {
            Some(record) => {
                record.log.push(entry);
                true
            }
            None => false,
        }
    }

    /// Returns a copy of the latest workflow snapshot.
    pub fn workflow(&self, execution_id: &str) -> Option<Workflow> {
        self.read()
            .records
            .get(execution_id)
            .map(|r| r.workflow.clone())
    }

    /// Returns a copy of the execution log.
    pub fn log(&self, execution_id: &str) -> Option<ExecutionLog> {
        self.read().records.get(execution_id).map(|r| r.log.clone())
    }

    /// Execution ids, oldest first.
    pub fn ids(&self) -> Vec<String> {
        self.read().order.clone()
    }

    pub fn len(&self) -> usize {
        self.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::EventType;
    use serde_json::json;

    #[test]
    fn test_insert_and_query() {
        let store = ExecutionStore::new();
        store.insert("e1", Workflow::new("first"));

        assert_eq!(store.workflow("e1").unwrap().name, "first");
        assert!(store.log("e1").unwrap().is_empty());
        assert!(store.workflow("missing").is_none());
    }

    #[test]
    fn test_update_and_append_unknown_id() {
        let store = ExecutionStore::new();
        assert!(!store.update("ghost", &Workflow::new("x")));
        assert!(!store.append("ghost", LogEntry::new(EventType::TaskStarted, json!({}))));
    }

    #[test]
    fn test_clones_share_state() {
        let store = ExecutionStore::new();
        let observer = store.clone();

        store.insert("e1", Workflow::new("wf"));
        store.append("e1", LogEntry::new(EventType::WorkflowStarted, json!({})));

        let mut renamed = Workflow::new("renamed");
        renamed.id = "same".to_string();
        store.update("e1", &renamed);

        assert_eq!(observer.log("e1").unwrap().len(), 1);
        assert_eq!(observer.workflow("e1").unwrap().name, "renamed");
    }

    #[test]
    fn test_ids_keep_insertion_order() {
        let store = ExecutionStore::new();
        for id in ["c", "a", "b"] {
            store.insert(id, Workflow::new(id));
        }
        store.insert("a", Workflow::new("again"));

        assert_eq!(store.ids(), vec!["c", "a", "b"]);
        assert_eq!(store.len(), 3);
    }
}
