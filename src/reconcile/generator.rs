//! Generator Contract
//!
//! A generator drafts candidate workflows from natural-language
//! requirements and revises them when told what is wrong. Answers are
//! untrusted: they are parsed and reconciled before anything runs.

use async_trait::async_trait;
use serde_json::Value;

/// Source of candidate workflows.
///
/// `None` means "no candidate this time" and is never treated as fatal.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Drafts a candidate for a requirement.
    async fn generate(&self, requirement: &str, context: Option<&Value>) -> Option<Value>;

    /// Revises a candidate given the problems found in it.
    async fn correct(&self, candidate: &Value, errors: &[String]) -> Option<Value>;
}
