//! Execution Planner
//!
//! Orders tasks so that every task runs after the tasks it depends on.
//!
//! Ordering is best effort: a dependency cycle, or a dependency naming a
//! task that does not exist, never aborts planning. Tasks that cannot be
//! placed are appended in declaration order and reported as unresolved.

use std::collections::HashSet;

use log::{debug, warn};

use super::model::Task;

/// Execution order produced by [`schedule`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schedule {
    /// Indices into the task slice, in execution order
    pub order: Vec<usize>,
    /// Indices appended without their dependencies being satisfied
    pub unresolved: Vec<usize>,
}

impl Schedule {
    /// Returns true when every dependency was satisfied.
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Computes an execution order for `tasks`.
///
/// Tasks without dependencies come first, in declaration order. The
/// remaining tasks are scanned repeatedly; each scan moves every task whose
/// dependencies are already placed, keeping declaration order among tasks
/// that become eligible together. A scan that moves nothing ends planning.
pub fn schedule(tasks: &[Task]) -> Schedule {
    let mut order: Vec<usize> = Vec::with_capacity(tasks.len());
    let mut placed: HashSet<&str> = HashSet::new();
    let mut dependent: Vec<usize> = Vec::new();

    for (index, task) in tasks.iter().enumerate() {
        if task.depends_on.is_empty() {
            order.push(index);
            if !task.name.is_empty() {
                placed.insert(task.name.as_str());
            }
        } else {
            dependent.push(index);
        }
    }

    while !dependent.is_empty() {
        let mut progressed = false;
        let mut still_waiting = Vec::with_capacity(dependent.len());

        for index in dependent {
            let task = &tasks[index];
            if task.depends_on.iter().all(|dep| placed.contains(dep.as_str())) {
                order.push(index);
                if !task.name.is_empty() {
                    placed.insert(task.name.as_str());
                }
                progressed = true;
            } else {
                still_waiting.push(index);
            }
        }

        dependent = still_waiting;
        if !progressed {
            break;
        }
    }

    if !dependent.is_empty() {
        let names: Vec<&str> = dependent.iter().map(|&i| tasks[i].name.as_str()).collect();
        warn!(
            "Unresolvable dependencies (cycle or unknown task) for: {:?}; appending in declaration order",
            names
        );
        order.extend(dependent.iter().copied());
    }

    debug!(
        "Execution order: {:?}",
        order.iter().map(|&i| tasks[i].name.as_str()).collect::<Vec<_>>()
    );

    Schedule {
        order,
        unresolved: dependent,
    }
}
