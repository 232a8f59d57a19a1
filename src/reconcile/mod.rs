//! Registry Reconciliation Module
//!
//! Matches candidate workflows against the catalog of real services and
//! operations, fixing safe mismatches locally and escalating the rest to a
//! generator.
//!
//! # Components
//!
//! - [`registry`]: Service catalog contract and in-memory registry
//! - [`generator`]: Candidate workflow source contract
//! - [`validation`]: Single validation and auto-correction pass
//! - [`reconciler`]: Bounded correction loop

pub mod generator;
pub mod reconciler;
pub mod registry;
pub mod validation;

pub use generator::Generator;
pub use reconciler::{ReconcileOutcome, Reconciler};
pub use registry::{Registry, ServiceInfo, ServiceRegistry};
pub use validation::{validate_against_registry, RegistryValidation};
