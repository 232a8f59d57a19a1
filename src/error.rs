//! Error Types
//!
//! Typed errors for the fallible edges of the crate. Unknown services,
//! fuzzy matches, exhausted retries and dependency cycles are not errors:
//! they surface as lists and statuses in the returned reports.

use std::time::Duration;

use thiserror::Error;

/// Errors raised while loading, parsing or saving a workflow.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("failed to read workflow file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse workflow JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to parse workflow YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("malformed workflow: {0}")]
    Malformed(String),
}

/// Errors raised while materializing task parameters.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("unresolved placeholders: {}", .0.join(", "))]
    Unresolved(Vec<String>),

    #[error("parameters are not valid JSON after substitution: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Failure reported by a remote operation transport.
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("unsupported service: {0}")]
    UnsupportedService(String),

    #[error("{service}.{operation} failed: {message}")]
    Remote {
        service: String,
        operation: String,
        message: String,
    },
}

/// Why a single task attempt failed.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("unsupported task kind: {0}")]
    UnsupportedKind(String),

    #[error("task has no {0} specified")]
    MissingTarget(&'static str),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Invoke(#[from] InvokeError),

    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("invoker panicked: {0}")]
    Internal(String),
}

impl TaskError {
    /// Returns false for failures another attempt cannot fix.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::UnsupportedKind(_) | Self::MissingTarget(_) | Self::Internal(_)
        )
    }
}

/// Errors raised while loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Errors raised while planning a workflow from a requirement.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("generator returned no candidate workflow")]
    NoCandidate,

    #[error("generator returned an unusable candidate: {0}")]
    InvalidCandidate(#[from] WorkflowError),
}
