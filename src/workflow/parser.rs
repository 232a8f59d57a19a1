//! Workflow Parser
//!
//! Loads workflow definitions from JSON or YAML files and turns generator
//! candidates into workflows.
//!
//! Generators may answer with a JSON object or with free text wrapping one
//! (for example inside a fenced code block). Both forms are accepted by
//! [`parse_candidate`].

use std::fs;
use std::path::Path;

use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::model::{Workflow, WorkflowStatus};
use crate::error::WorkflowError;

/// Name given to generated workflows that arrive without one.
pub const DEFAULT_CANDIDATE_NAME: &str = "generated workflow";

static TRAILING_COMMA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*([}\]])").expect("trailing comma pattern is valid"));

/// Loads a workflow from a JSON or YAML file.
///
/// Files ending in `.json` are read as JSON; everything else is read as
/// YAML. The workflow is returned as written: statuses, ids and task order
/// are not touched.
///
/// # Example
///
/// ```rust,no_run
/// use cloudrunner::workflow::load_workflow;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let workflow = load_workflow("network.yaml")?;
///     println!("Loaded {} tasks", workflow.tasks.len());
///     Ok(())
/// }
/// ```
pub fn load_workflow(path: &str) -> Result<Workflow, WorkflowError> {
    info!("Loading workflow from: {}", path);

    let content = fs::read_to_string(path).map_err(|source| WorkflowError::Io {
        path: path.to_string(),
        source,
    })?;

    debug!("Workflow content loaded ({} bytes)", content.len());

    let workflow: Workflow = if is_json_path(path) {
        serde_json::from_str(&content)?
    } else {
        serde_yaml::from_str(&content)?
    };

    info!(
        "Parsed workflow '{}' with {} tasks",
        workflow.name,
        workflow.tasks.len()
    );

    Ok(workflow)
}

/// Saves a workflow as JSON or YAML, chosen by the file extension.
pub fn save_workflow(workflow: &Workflow, path: &str) -> Result<(), WorkflowError> {
    let content = if is_json_path(path) {
        serde_json::to_string_pretty(workflow)?
    } else {
        serde_yaml::to_string(workflow)?
    };

    fs::write(path, content).map_err(|source| WorkflowError::Io {
        path: path.to_string(),
        source,
    })?;

    info!("Workflow saved to: {}", path);
    Ok(())
}

/// Converts a generator's answer into a ready-to-run workflow.
///
/// Missing workflow and task ids are generated, a missing name gets
/// [`DEFAULT_CANDIDATE_NAME`], and the status is set to `ready`. Unknown
/// task types are rejected.
pub fn parse_candidate(candidate: Value) -> Result<Workflow, WorkflowError> {
    let candidate = match candidate {
        Value::String(text) => extract_json(&text).ok_or_else(|| {
            WorkflowError::Malformed("candidate text contains no JSON object".to_string())
        })?,
        other => other,
    };

    if !candidate.is_object() {
        return Err(WorkflowError::Malformed(format!(
            "candidate must be a JSON object, got {}",
            json_kind(&candidate)
        )));
    }

    let mut workflow: Workflow = serde_json::from_value(candidate)?;

    if workflow.id.trim().is_empty() {
        workflow.id = uuid::Uuid::new_v4().to_string();
    }
    if workflow.name.trim().is_empty() {
        workflow.name = DEFAULT_CANDIDATE_NAME.to_string();
    }
    for task in &mut workflow.tasks {
        if task.id.trim().is_empty() {
            task.id = uuid::Uuid::new_v4().to_string();
        }
    }
    workflow.status = WorkflowStatus::Ready;

    debug!(
        "Parsed candidate '{}' with {} tasks",
        workflow.name,
        workflow.tasks.len()
    );
    Ok(workflow)
}

/// Pulls a JSON object out of free text.
///
/// Looks inside a ```` ```json ```` (or bare ```` ``` ````) fence first, then
/// falls back to the outermost braces. Trailing commas are tolerated.
pub fn extract_json(text: &str) -> Option<Value> {
    let body = fenced_block(text).unwrap_or(text).trim();

    if let Ok(value) = serde_json::from_str::<Value>(body) {
        return Some(value);
    }

    let start = body.find('{')?;
    let end = body.rfind('}')?;
    if end <= start {
        return None;
    }
    let object = &body[start..=end];

    serde_json::from_str(object)
        .or_else(|_| serde_json::from_str(&TRAILING_COMMA.replace_all(object, "$1")))
        .map_err(|e| warn!("Could not parse JSON from candidate text: {}", e))
        .ok()
}

fn fenced_block(text: &str) -> Option<&str> {
    let (_, rest) = text
        .split_once("```json")
        .or_else(|| text.split_once("```"))?;
    Some(rest.split("```").next().unwrap_or(rest))
}

fn is_json_path(path: &str) -> bool {
    Path::new(path)
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
