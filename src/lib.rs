//! SCIM 2.0 conformance toolkit for Rust.
//!
//! Validates SCIM resources (including the draft Agent and AgenticApplication
//! extension) offline, and probes live SCIM servers for protocol conformance.
//!
//! # Core Components
//!
//! - [`SchemaRegistry`] - Immutable schema and resource type definitions
//! - [`Validator`] - Schema-driven validation of resources and PATCH documents
//! - [`ScimClient`] - SCIM HTTP client with 429 retry and per-request timeouts
//! - [`ProbeEngine`] - Live conformance probe with guaranteed cleanup
//! - [`ProbeReport`] - Versioned, machine-consumable probe report
//!
//! # Quick Start
//!
//! ```rust
//! use scim_conformance::{SchemaRegistry, Validator};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = SchemaRegistry::new()?;
//! let errors = Validator::new(&registry).validate_resource(&json!({
//!     "schemas": ["urn:ietf:params:scim:schemas:core:2.0:Agent"],
//!     "name": "build-agent"
//! }));
//! assert!(errors.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod probe;
pub mod report;
pub mod schema;
pub mod validator;

// Re-export commonly used types for convenience
pub use client::{HttpTransport, ScimClient, ScimTransport};
pub use config::{ProbeConfig, ProbeConfigBuilder, ValidationMode};
pub use error::{
    ClientError, ProbeErrorKind, ScimError, ScimResult, ValidationError, ValidationErrorKind,
};
pub use probe::{CheckStatus, ProbeCheck, ProbeEngine, ProbeOutcome};
pub use report::{ProbeReport, ProbeSummary, ValidationReport};
pub use schema::{ResourceKind, Schema, SchemaRegistry};
pub use validator::{DocumentKind, Validator};
