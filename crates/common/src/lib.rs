//! ResQ Common Library
//!
//! Shared types, the dashboard backend client, and the analysis utilities
//! used by the ResQ verification harness.

pub mod api;
pub mod error;
pub mod fairness;
pub mod scenario;
pub mod types;

// Re-export commonly used types
pub use api::BackendClient;
pub use error::{Error, Result};
pub use fairness::{AuditConfig, FairnessAuditor, FairnessReport, ProtectedAttribute};
pub use scenario::{EvacuationScenario, ScenarioBuilder};
pub use types::*;

/// ResQ version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
