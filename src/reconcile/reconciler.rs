//! Reconciliation Loop
//!
//! Drives a candidate workflow toward one whose every (service, operation)
//! pair exists in the registry. Local fixes come first; whatever is left is
//! sent back to the generator for a bounded number of correction rounds.

use std::sync::Arc;

use log::{info, warn};
use serde_json::Value;

use super::generator::Generator;
use super::registry::Registry;
use super::validation::validate_against_registry;
use crate::config::ReconcileSettings;
use crate::error::PlanError;
use crate::workflow::{parse_candidate, Workflow};

/// Result of reconciliation.
///
/// Exhausting the round budget is not an error: callers inspect
/// `remaining_errors` to decide whether the workflow is usable.
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    /// Best candidate obtained
    pub workflow: Workflow,
    /// Rewrites applied to `workflow`
    pub auto_corrected: Vec<String>,
    /// Problems still present in `workflow`
    pub remaining_errors: Vec<String>,
    /// Generator correction rounds used
    pub rounds: usize,
}

impl ReconcileOutcome {
    pub fn is_clean(&self) -> bool {
        self.remaining_errors.is_empty()
    }
}

/// Reconciles candidate workflows against a registry.
pub struct Reconciler {
    registry: Arc<dyn Registry>,
    generator: Option<Arc<dyn Generator>>,
    settings: ReconcileSettings,
}

impl Reconciler {
    /// Creates a reconciler. Without a generator only local fixes apply.
    pub fn new(
        registry: Arc<dyn Registry>,
        generator: Option<Arc<dyn Generator>>,
        settings: ReconcileSettings,
    ) -> Self {
        Self {
            registry,
            generator,
            settings,
        }
    }

    pub fn settings(&self) -> &ReconcileSettings {
        &self.settings
    }

    /// Validates `workflow`, then asks the generator to fix what remains.
    ///
    /// Stops as soon as nothing remains, when the generator has no answer
    /// or an unparseable one, or after `max_rounds` rounds.
    pub async fn reconcile(&self, mut workflow: Workflow) -> ReconcileOutcome {
        let auto_correct = self.settings.auto_correct;
        let first = validate_against_registry(&mut workflow, self.registry.as_ref(), auto_correct);

        let mut outcome = ReconcileOutcome {
            workflow,
            auto_corrected: first.auto_corrected,
            remaining_errors: first.needs_fix,
            rounds: 0,
        };

        let Some(generator) = &self.generator else {
            return outcome;
        };

        while !outcome.remaining_errors.is_empty() && outcome.rounds < self.settings.max_rounds {
            outcome.rounds += 1;
            info!(
                "Correction round {}/{}: {} problems outstanding",
                outcome.rounds,
                self.settings.max_rounds,
                outcome.remaining_errors.len()
            );

            let current = outcome.workflow.to_json();
            let Some(answer) = generator.correct(&current, &outcome.remaining_errors).await else {
                warn!("Correction round {} produced no candidate", outcome.rounds);
                break;
            };

            let mut candidate = match parse_candidate(answer) {
                Ok(candidate) => candidate,
                Err(e) => {
                    warn!("Correction round {} produced an unusable candidate: {}", outcome.rounds, e);
                    break;
                }
            };

            let result =
                validate_against_registry(&mut candidate, self.registry.as_ref(), auto_correct);
            outcome.workflow = candidate;
            outcome.auto_corrected = result.auto_corrected;
            outcome.remaining_errors = result.needs_fix;
        }

        if outcome.is_clean() {
            info!("Workflow '{}' matches the registry", outcome.workflow.name);
        } else {
            warn!(
                "Workflow '{}' still has {} registry problems after {} rounds",
                outcome.workflow.name,
                outcome.remaining_errors.len(),
                outcome.rounds
            );
        }
        outcome
    }

    /// Drafts a workflow from a requirement and reconciles it.
    pub async fn plan(
        &self,
        requirement: &str,
        context: Option<&Value>,
    ) -> Result<ReconcileOutcome, PlanError> {
        let generator = self.generator.as_ref().ok_or(PlanError::NoCandidate)?;

        let answer = generator
            .generate(requirement, context)
            .await
            .ok_or(PlanError::NoCandidate)?;
        let workflow = parse_candidate(answer)?;

        for problem in workflow.validate() {
            warn!("Generated workflow '{}': {}", workflow.name, problem);
        }

        Ok(self.reconcile(workflow).await)
    }
}
