//! Service Registry
//!
//! Catalog of the services and operations that actually exist. Candidate
//! workflows are checked against it before they run.
//!
//! # Example JSON Format
//!
//! ```json
//! [
//!   { "name": "ecs", "description": "Elastic Cloud Server",
//!     "operations": ["create_servers", "list_servers"] },
//!   { "name": "vpc", "operations": ["create_vpc", "create_subnet"] }
//! ]
//! ```

use std::fs;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;

/// One registered service.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ServiceInfo {
    /// Canonical name
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Canonical operation names
    #[serde(default, alias = "common_operations")]
    pub operations: Vec<String>,
}

impl ServiceInfo {
    pub fn new<I, S>(name: impl Into<String>, operations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            description: String::new(),
            operations: operations.into_iter().map(Into::into).collect(),
        }
    }
}

/// Read access to a service catalog.
///
/// Iteration order of [`Registry::services`] decides fuzzy-match
/// tie-breaks, so implementations should keep it stable.
pub trait Registry: Send + Sync {
    fn services(&self) -> &[ServiceInfo];

    /// Finds a service by name, ignoring case.
    fn lookup_service(&self, name: &str) -> Option<&ServiceInfo> {
        self.services()
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    /// Returns the canonical spelling of an operation, ignoring case.
    fn lookup_operation(&self, service: &str, operation: &str) -> Option<&str> {
        self.lookup_service(service)?
            .operations
            .iter()
            .find(|op| op.eq_ignore_ascii_case(operation))
            .map(String::as_str)
    }
}

/// Registry held in memory, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceRegistry {
    services: Vec<ServiceInfo>,
}

impl ServiceRegistry {
    pub fn new(services: Vec<ServiceInfo>) -> Self {
        Self { services }
    }

    pub fn add(&mut self, service: ServiceInfo) {
        self.services.push(service);
    }

    /// Loads a registry from a JSON list of services.
    pub fn from_json(content: &str) -> Result<Self, WorkflowError> {
        let services: Vec<ServiceInfo> = serde_json::from_str(content)?;
        Ok(Self::new(services))
    }

    /// Loads a registry file (JSON, or YAML for other extensions).
    pub fn load(path: &str) -> Result<Self, WorkflowError> {
        let content = fs::read_to_string(path).map_err(|source| WorkflowError::Io {
            path: path.to_string(),
            source,
        })?;

        let is_json = Path::new(path)
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let registry = if is_json {
            Self::from_json(&content)?
        } else {
            Self::new(serde_yaml::from_str(&content)?)
        };

        info!(
            "Loaded registry from {} ({} services)",
            path,
            registry.services.len()
        );
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl Registry for ServiceRegistry {
    fn services(&self) -> &[ServiceInfo] {
        &self.services
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn registry() -> ServiceRegistry {
        ServiceRegistry::new(vec![
            ServiceInfo::new("ecs", ["create_servers", "ListServers"]),
            ServiceInfo::new("vpc", ["create_vpc", "create_subnet"]),
        ])
    }

    #[test]
    fn test_lookup_ignores_case() {
        let registry = registry();
        assert_eq!(registry.lookup_service("ECS").unwrap().name, "ecs");
        assert!(registry.lookup_service("obs").is_none());
    }

    #[test]
    fn test_lookup_operation_returns_canonical() {
        let registry = registry();
        assert_eq!(
            registry.lookup_operation("Ecs", "listservers"),
            Some("ListServers")
        );
        assert!(registry.lookup_operation("ecs", "create_vpc").is_none());
        assert!(registry.lookup_operation("rds", "create_vpc").is_none());
    }

    #[test]
    fn test_from_json_accepts_common_operations() {
        let registry = ServiceRegistry::from_json(
            r#"[{"name": "obs", "description": "Object storage", "common_operations": ["create_bucket"]}]"#,
        )
        .unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.services()[0].operations, vec!["create_bucket"]);
    }

    #[test]
    fn test_load_yaml() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("registry.yaml");
        std::fs::write(
            &path,
            "- name: ecs\n  operations: [list_servers]\n- name: vpc\n",
        )
        .unwrap();

        let registry = ServiceRegistry::load(path.to_str().unwrap()).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.services()[1].operations.is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            ServiceRegistry::load("/nonexistent/registry.json"),
            Err(WorkflowError::Io { .. })
        ));
    }
}
