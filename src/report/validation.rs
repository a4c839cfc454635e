//! Report for one statically validated document.

use serde::Serialize;
use std::fmt;

use super::REPORT_VERSION;
use crate::error::{ScimResult, ValidationError};
use crate::validator::DocumentKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub version: &'static str,
    pub document: DocumentKind,
    /// File path, or `-` for stdin
    pub source: String,
    pub valid: bool,
    pub errors: Vec<ValidationError>,
}

impl ValidationReport {
    pub fn new(source: impl Into<String>, document: DocumentKind, errors: Vec<ValidationError>) -> Self {
        Self {
            version: REPORT_VERSION,
            document,
            source: source.into(),
            valid: errors.is_empty(),
            errors,
        }
    }

    pub fn to_json(&self) -> ScimResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn exit_code(&self) -> i32 {
        if self.valid { 0 } else { 1 }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let document = match self.document {
            DocumentKind::Resource => "resource",
            DocumentKind::Patch => "PATCH request",
        };
        if self.valid {
            return writeln!(f, "{}: valid {}", self.source, document);
        }

        writeln!(
            f,
            "{}: invalid {}, found {} error(s):",
            self.source,
            document,
            self.errors.len()
        )?;
        for error in &self.errors {
            writeln!(f, "  [{}] {}", error.kind, error)?;
        }
        Ok(())
    }
}
