//! Remote Operation Transport
//!
//! The engine never talks to a cloud API directly. Each remote operation
//! goes through an [`Invoker`], which turns a (service, operation,
//! parameters) request into a JSON result or an error.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde_json::{json, Value};

use crate::error::InvokeError;

/// Executes one remote operation.
///
/// The engine enforces `timeout` itself; it is passed along so transports
/// can size their own deadlines.
#[async_trait]
pub trait Invoker: Send + Sync {
    async fn invoke(
        &self,
        service: &str,
        operation: &str,
        parameters: Value,
        timeout: Duration,
    ) -> Result<Value, InvokeError>;
}

/// Local transport that answers every request with the request itself.
///
/// Used to rehearse a workflow end to end without touching a cloud
/// account. An optional service allow-list makes unknown services fail.
#[derive(Debug, Clone, Default)]
pub struct EchoInvoker {
    services: Option<Vec<String>>,
}

impl EchoInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only answers for the given services (case-insensitive).
    pub fn with_services<I, S>(services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            services: Some(services.into_iter().map(Into::into).collect()),
        }
    }

    fn supports(&self, service: &str) -> bool {
        self.services
            .as_ref()
            .map(|known| known.iter().any(|s| s.eq_ignore_ascii_case(service)))
            .unwrap_or(true)
    }
}

#[async_trait]
impl Invoker for EchoInvoker {
    async fn invoke(
        &self,
        service: &str,
        operation: &str,
        parameters: Value,
        _timeout: Duration,
    ) -> Result<Value, InvokeError> {
        if !self.supports(service) {
            return Err(InvokeError::UnsupportedService(service.to_string()));
        }

        debug!("Echoing {}.{}", service, operation);
        Ok(json!({
            "service": service,
            "operation": operation,
            "parameters": parameters,
        }))
    }
}
