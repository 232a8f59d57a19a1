//! Registry Validation
//!
//! Checks every remote-operation task's service and operation against a
//! [`Registry`], fixing what can be fixed safely:
//!
//! 1. Exact match ignoring case: the name is rewritten to its canonical
//!    spelling without being reported.
//! 2. Substring match in either direction: with auto-correct on, the name
//!    is rewritten to the first match in registry order and reported as an
//!    auto-correction; with it off, the task is reported as needing a fix
//!    and the matches are listed.
//! 3. No match: reported as needing a fix. No name is guessed.
//!
//! The operation is only checked once the service resolves.

use log::{debug, info, warn};

use super::registry::{Registry, ServiceInfo};
use crate::workflow::Workflow;

/// Findings of one validation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistryValidation {
    /// Rewrites applied to the workflow
    pub auto_corrected: Vec<String>,
    /// Problems left for the generator (or the caller)
    pub needs_fix: Vec<String>,
}

impl RegistryValidation {
    pub fn is_clean(&self) -> bool {
        self.needs_fix.is_empty()
    }
}

/// Names that contain `name`, or are contained in it, ignoring ASCII case
/// (the same folding [`Registry::lookup_service`] uses).
fn fuzzy_matches<'a>(name: &str, known: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let needle = name.to_ascii_lowercase();
    known
        .filter(|candidate| {
            let candidate = candidate.to_ascii_lowercase();
            candidate.contains(&needle) || needle.contains(&candidate)
        })
        .collect()
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value.as_deref().filter(|s| !s.is_empty()).map(str::to_string)
}

/// Validates and (optionally) auto-corrects a workflow in place.
pub fn validate_against_registry(
    workflow: &mut Workflow,
    registry: &dyn Registry,
    auto_correct: bool,
) -> RegistryValidation {
    let mut result = RegistryValidation::default();

    for task in &mut workflow.tasks {
        if !task.kind.is_executable() {
            continue;
        }
        let Some(service) = non_blank(&task.service) else {
            continue;
        };

        let info: &ServiceInfo = match registry.lookup_service(&service) {
            Some(info) => info,
            None => {
                let candidates = fuzzy_matches(
                    &service,
                    registry.services().iter().map(|s| s.name.as_str()),
                );

                let chosen = match candidates.first() {
                    None => {
                        result.needs_fix.push(format!(
                            "Task '{}': service '{}' does not exist in the registry",
                            task.name, service
                        ));
                        continue;
                    }
                    Some(_) if !auto_correct => {
                        result.needs_fix.push(format!(
                            "Task '{}': service '{}' does not exist, candidates: {}",
                            task.name,
                            service,
                            candidates.join(", ")
                        ));
                        continue;
                    }
                    Some(first) => *first,
                };

                result.auto_corrected.push(format!(
                    "Task '{}': service '{}' -> '{}'",
                    task.name, service, chosen
                ));
                match registry.lookup_service(chosen) {
                    Some(info) => info,
                    None => continue,
                }
            }
        };

        if task.service.as_deref() != Some(info.name.as_str()) {
            debug!("Task '{}': service normalized to '{}'", task.name, info.name);
            task.service = Some(info.name.clone());
        }

        let Some(operation) = non_blank(&task.operation) else {
            continue;
        };

        if let Some(canonical) = info
            .operations
            .iter()
            .find(|op| op.eq_ignore_ascii_case(&operation))
        {
            if *canonical != operation {
                debug!("Task '{}': operation normalized to '{}'", task.name, canonical);
                task.operation = Some(canonical.clone());
            }
            continue;
        }

        let candidates = fuzzy_matches(&operation, info.operations.iter().map(String::as_str));
        match candidates.first() {
            Some(first) if auto_correct => {
                result.auto_corrected.push(format!(
                    "Task '{}': operation '{}' -> '{}'",
                    task.name, operation, first
                ));
                task.operation = Some(first.to_string());
            }
            Some(_) => result.needs_fix.push(format!(
                "Task '{}': operation '{}' is not in service '{}', candidates: {}",
                task.name,
                operation,
                info.name,
                candidates.join(", ")
            )),
            None => result.needs_fix.push(format!(
                "Task '{}': operation '{}' is not a known operation of service '{}'",
                task.name, operation, info.name
            )),
        }
    }

    for message in &result.auto_corrected {
        info!("Auto-corrected: {}", message);
    }
    for message in &result.needs_fix {
        warn!("Registry mismatch: {}", message);
    }

    result
}
