//! Parameter Reference Resolution
//!
//! Replaces placeholders inside a task's parameter tree with workflow
//! variables or with outputs of tasks that already ran.
//!
//! Two forms are recognized, both with dot-separated paths:
//!
//! - `{{ variables.<key> }}`
//! - `{{ outputs.<task_name>.<key> }}`
//!
//! Substitution is textual: the tree is serialized to JSON, placeholders are
//! replaced in the text, and the text is parsed back. A placeholder that is
//! the whole of a string value is replaced by the referenced JSON value, so
//! numbers, booleans and objects keep their type. A placeholder embedded in
//! a longer string is replaced by the value's string form.
//!
//! In [`PlaceholderMode::BestEffort`] an unresolvable placeholder is left in
//! place verbatim. [`PlaceholderMode::Strict`] reports it as an error.

use std::collections::{BTreeMap, HashMap};

use log::debug;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

use crate::error::ResolveError;

/// Placeholder occupying an entire JSON string value (or object key).
static WHOLE_VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(^|[\[{:,])"\{\{\s*((?:variables|outputs)(?:\.[\w-]+)+)\s*\}\}""#)
        .expect("whole-value placeholder pattern is valid")
});

/// Placeholder anywhere in the text.
static EMBEDDED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*((?:variables|outputs)(?:\.[\w-]+)+)\s*\}\}")
        .expect("embedded placeholder pattern is valid")
});

/// What to do with placeholders that cannot be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaceholderMode {
    /// Leave the placeholder text in place
    #[default]
    BestEffort,
    /// Fail with [`ResolveError::Unresolved`]
    Strict,
}

/// Values placeholders can refer to during one execution.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    /// The workflow's static variables
    pub variables: BTreeMap<String, Value>,
    /// Outputs of completed tasks, keyed by task name
    pub outputs: HashMap<String, Value>,
}

impl ExecutionContext {
    pub fn new(variables: BTreeMap<String, Value>) -> Self {
        Self {
            variables,
            outputs: HashMap::new(),
        }
    }

    /// Records a task's output for later references.
    pub fn record_output(&mut self, task_name: impl Into<String>, output: Value) {
        self.outputs.insert(task_name.into(), output);
    }

    /// Looks up a dotted path such as `outputs.create_vpc.vpc.id`.
    ///
    /// Object members are addressed by key, array elements by index.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let root = segments.next()?;
        let first = segments.next()?;

        let mut current = match root {
            "variables" => self.variables.get(first)?,
            "outputs" => self.outputs.get(first)?,
            _ => return None,
        };

        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }

        Some(current)
    }
}

/// Resolves placeholders in parameter trees.
#[derive(Debug, Clone, Copy, Default)]
pub struct Resolver {
    mode: PlaceholderMode,
}

impl Resolver {
    pub fn new(mode: PlaceholderMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> PlaceholderMode {
        self.mode
    }

    /// Returns a copy of `parameters` with every resolvable placeholder
    /// replaced.
    pub fn resolve(
        &self,
        parameters: &Value,
        context: &ExecutionContext,
    ) -> Result<Value, ResolveError> {
        let text = serde_json::to_string(parameters)?;
        if !text.contains("{{") {
            return Ok(parameters.clone());
        }

        let typed = WHOLE_VALUE.replace_all(&text, |caps: &Captures| {
            let Some(value) = context.lookup(&caps[2]) else {
                return caps[0].to_string();
            };
            let is_key = caps
                .get(0)
                .map(|m| text[m.end()..].starts_with(':'))
                .unwrap_or(false);

            let replacement = if is_key {
                format!("\"{}\"", escape_fragment(&string_form(value)))
            } else {
                value.to_string()
            };
            format!("{}{}", &caps[1], replacement)
        });

        let mut unresolved = Vec::new();
        let substituted = EMBEDDED.replace_all(&typed, |caps: &Captures| {
            match context.lookup(&caps[1]) {
                Some(value) => escape_fragment(&string_form(value)),
                None => {
                    unresolved.push(caps[1].to_string());
                    caps[0].to_string()
                }
            }
        });

        if !unresolved.is_empty() {
            debug!("Unresolved placeholders: {:?}", unresolved);
            if self.mode == PlaceholderMode::Strict {
                unresolved.dedup();
                return Err(ResolveError::Unresolved(unresolved));
            }
        }

        Ok(serde_json::from_str(&substituted)?)
    }
}

/// Lists the placeholder paths found anywhere in a parameter tree.
pub fn find_placeholders(parameters: &Value) -> Vec<String> {
    let mut found = Vec::new();
    collect_placeholders(parameters, &mut found);
    found
}

fn collect_placeholders(value: &Value, found: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            found.extend(EMBEDDED.captures_iter(s).map(|caps| caps[1].to_string()));
        }
        Value::Array(items) => items.iter().for_each(|v| collect_placeholders(v, found)),
        Value::Object(map) => {
            for (key, v) in map {
                found.extend(EMBEDDED.captures_iter(key).map(|caps| caps[1].to_string()));
                collect_placeholders(v, found);
            }
        }
        _ => {}
    }
}

/// Text a value contributes when embedded in a longer string.
fn string_form(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Escapes text for insertion inside a JSON string literal.
fn escape_fragment(text: &str) -> String {
    let quoted = Value::String(text.to_string()).to_string();
    quoted
        .strip_prefix('"')
        .and_then(|q| q.strip_suffix('"'))
        .unwrap_or(text)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> ExecutionContext {
        let mut variables = BTreeMap::new();
        variables.insert("region".to_string(), json!("eu-west-1"));
        variables.insert("count".to_string(), json!(3));
        variables.insert("public".to_string(), json!(true));

        let mut ctx = ExecutionContext::new(variables);
        ctx.record_output("create_vpc", json!({"vpc": {"id": "v-1", "cidr": "10.0.0.0/16"}}));
        ctx.record_output("create_subnets", json!({"subnets": [{"id": "s-1"}, {"id": "s-2"}]}));
        ctx
    }

    #[test]
    fn test_resolves_nested_output() {
        let resolver = Resolver::default();
        let params = json!({"vpc_id": "{{ outputs.create_vpc.vpc.id }}"});

        let resolved = resolver.resolve(&params, &context()).unwrap();
        assert_eq!(resolved, json!({"vpc_id": "v-1"}));
    }

    #[test]
    fn test_resolves_variables_without_spaces() {
        let resolver = Resolver::default();
        let params = json!({"region": "{{variables.region}}"});

        let resolved = resolver.resolve(&params, &context()).unwrap();
        assert_eq!(resolved, json!({"region": "eu-west-1"}));
    }

    #[test]
    fn test_whole_value_keeps_number_and_bool_types() {
        let resolver = Resolver::default();
        let params = json!({
            "count": "{{ variables.count }}",
            "flags": ["{{ variables.public }}", "{{ variables.count }}"]
        });

        let resolved = resolver.resolve(&params, &context()).unwrap();
        assert_eq!(resolved, json!({"count": 3, "flags": [true, 3]}));
    }

    #[test]
    fn test_whole_value_object_reference() {
        let resolver = Resolver::default();
        let params = json!({"network": "{{ outputs.create_vpc.vpc }}"});

        let resolved = resolver.resolve(&params, &context()).unwrap();
        assert_eq!(resolved["network"]["id"], "v-1");
    }

    #[test]
    fn test_embedded_placeholder_uses_string_form() {
        let resolver = Resolver::default();
        let params = json!({"name": "web-{{ variables.region }}-{{ variables.count }}"});

        let resolved = resolver.resolve(&params, &context()).unwrap();
        assert_eq!(resolved, json!({"name": "web-eu-west-1-3"}));
    }

    #[test]
    fn test_array_index_path() {
        let resolver = Resolver::default();
        let params = json!({"subnet_id": "{{ outputs.create_subnets.subnets.1.id }}"});

        let resolved = resolver.resolve(&params, &context()).unwrap();
        assert_eq!(resolved, json!({"subnet_id": "s-2"}));
    }

    #[test]
    fn test_undefined_variable_left_verbatim() {
        let resolver = Resolver::default();
        let params = json!({
            "zone": "{{ variables.zone }}",
            "label": "az-{{ variables.zone }}"
        });

        let resolved = resolver.resolve(&params, &context()).unwrap();
        assert_eq!(resolved, params);
    }

    #[test]
    fn test_missing_output_key_left_verbatim() {
        let resolver = Resolver::default();
        let params = json!({"gw": "{{ outputs.create_vpc.gateway }}"});

        let resolved = resolver.resolve(&params, &context()).unwrap();
        assert_eq!(resolved, params);
    }

    #[test]
    fn test_strict_mode_reports_unresolved() {
        let resolver = Resolver::new(PlaceholderMode::Strict);
        let params = json!({"zone": "{{ variables.zone }}", "vpc": "{{ outputs.create_vpc.vpc.id }}"});

        match resolver.resolve(&params, &context()) {
            Err(ResolveError::Unresolved(paths)) => {
                assert_eq!(paths, vec!["variables.zone".to_string()]);
            }
            other => panic!("expected unresolved error, got {:?}", other),
        }
    }

    #[test]
    fn test_resolution_is_idempotent_on_resolved_tree() {
        let resolver = Resolver::default();
        let params = json!({"a": 1, "b": ["x", {"c": null}], "d": "plain"});

        let once = resolver.resolve(&params, &context()).unwrap();
        let twice = resolver.resolve(&once, &context()).unwrap();
        assert_eq!(once, params);
        assert_eq!(twice, once);
    }

    #[test]
    fn test_values_with_quotes_are_escaped() {
        let mut ctx = context();
        ctx.variables
            .insert("motd".to_string(), json!("say \"hi\"\nbye"));
        let resolver = Resolver::default();
        let params = json!({"banner": "[{{ variables.motd }}]"});

        let resolved = resolver.resolve(&params, &ctx).unwrap();
        assert_eq!(resolved, json!({"banner": "[say \"hi\"\nbye]"}));
    }

    #[test]
    fn test_placeholder_after_escaped_quote_stays_string() {
        let resolver = Resolver::default();
        let params = json!({"note": "count=\"{{ variables.count }}\""});

        let resolved = resolver.resolve(&params, &context()).unwrap();
        assert_eq!(resolved, json!({"note": "count=\"3\""}));
    }

    #[test]
    fn test_placeholder_as_object_key() {
        let resolver = Resolver::default();
        let params = json!({"{{ variables.count }}": "{{ variables.public }}"});

        let resolved = resolver.resolve(&params, &context()).unwrap();
        assert_eq!(resolved, json!({"3": true}));
    }

    #[test]
    fn test_find_placeholders() {
        let params = json!({
            "a": "{{ variables.region }}",
            "b": [{"c": "x-{{ outputs.create_vpc.vpc.id }}"}],
            "d": 5
        });
        let found = find_placeholders(&params);
        assert_eq!(
            found,
            vec!["variables.region".to_string(), "outputs.create_vpc.vpc.id".to_string()]
        );
    }

    #[test]
    fn test_lookup_rejects_unknown_root() {
        let ctx = context();
        assert!(ctx.lookup("secrets.password").is_none());
        assert!(ctx.lookup("variables").is_none());
        assert_eq!(ctx.lookup("variables.count"), Some(&json!(3)));
    }
}
