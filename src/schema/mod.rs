//! Schema definitions for SCIM resources.
//!
//! This module provides the embedded schema table implementing the RFC 7643
//! core schemas, the enterprise User extension and the draft Agent extension.
//!
//! # Key Types
//!
//! - [`Schema`] - SCIM schema definition with attributes and metadata
//! - [`SchemaRegistry`] - Immutable table of resource type definitions
//! - [`ResourceKind`] - The closed set of resource types
//!
//! # Examples
//!
//! ```rust
//! use scim_conformance::schema::{ResourceKind, SchemaRegistry, USER_URN};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = SchemaRegistry::new()?;
//! assert_eq!(registry.resolve_resource_type(&[USER_URN])?, ResourceKind::User);
//! # Ok(())
//! # }
//! ```

pub mod embedded;
pub mod registry;
pub mod types;


pub use registry::{
    AGENT_URN, AGENTIC_APPLICATION_URN, ENTERPRISE_USER_URN, ERROR_URN, GROUP_URN,
    LIST_RESPONSE_URN, PATCH_OP_URN, ResourceTypeDefinition, SCHEMA_TABLE_VERSION,
    SchemaRegistry, SchemaResolutionError, USER_URN,
};
pub use types::{AttributeDefinition, AttributeType, Mutability, ResourceKind, Returned, Schema};
