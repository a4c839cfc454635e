//! Static validation of SCIM documents.
//!
//! Validation is pure: a payload and a [`SchemaRegistry`] go in, an ordered
//! list of [`ValidationError`]s comes out. Nothing fails fast, so a single
//! run reports every problem in the document.
//!
//! Errors are ordered as follows: the `schemas` error (if any) first, then
//! attribute errors in document order, then missing required attributes.
//!
//! # Examples
//!
//! ```rust
//! use scim_conformance::schema::SchemaRegistry;
//! use scim_conformance::validator::Validator;
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = SchemaRegistry::new()?;
//! let validator = Validator::new(&registry);
//! let errors = validator.validate_resource(&json!({
//!     "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
//!     "userName": "bjensen@example.com"
//! }));
//! assert!(errors.is_empty());
//! # Ok(())
//! # }
//! ```

mod patch;
mod resource;

pub use patch::{PatchDocument, PatchOp, PatchOperation};

use serde::Serialize;
use serde_json::Value;
use std::io::Read;

use crate::error::{ScimResult, ValidationError};
use crate::schema::SchemaRegistry;
use resource::ResourceRules;

/// What kind of document is being validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    #[default]
    Resource,
    Patch,
}

/// Schema-driven validator over a borrowed registry.
#[derive(Debug, Clone, Copy)]
pub struct Validator<'a> {
    registry: &'a SchemaRegistry,
}

impl<'a> Validator<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Validate a full resource representation (POST/PUT body).
    pub fn validate_resource(&self, payload: &Value) -> Vec<ValidationError> {
        ResourceRules::new(self.registry).check(payload)
    }

    /// Validate a PatchOp message.
    pub fn validate_patch(&self, payload: &Value) -> Vec<ValidationError> {
        match PatchDocument::parse(payload) {
            Ok(_) => Vec::new(),
            Err(errors) => errors,
        }
    }

    pub fn validate(&self, payload: &Value, kind: DocumentKind) -> Vec<ValidationError> {
        match kind {
            DocumentKind::Resource => self.validate_resource(payload),
            DocumentKind::Patch => self.validate_patch(payload),
        }
    }

    /// Parse and validate JSON text. Malformed JSON is a single `InvalidJson` error.
    pub fn validate_str(&self, input: &str, kind: DocumentKind) -> Vec<ValidationError> {
        match serde_json::from_str::<Value>(input) {
            Ok(payload) => self.validate(&payload, kind),
            Err(e) => vec![ValidationError::invalid_json(format!(
                "Document is not valid JSON: {}",
                e
            ))],
        }
    }

    /// Read a whole document and validate it. Only read failures are errors.
    pub fn validate_reader<R: Read>(
        &self,
        mut reader: R,
        kind: DocumentKind,
    ) -> ScimResult<Vec<ValidationError>> {
        let mut input = String::new();
        reader.read_to_string(&mut input)?;
        Ok(self.validate_str(&input, kind))
    }
}
