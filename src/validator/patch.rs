//! SCIM PATCH documents (RFC 7644 §3.5.2).
//!
//! [`PatchDocument`] is both the parsed form used by the validator and the
//! builder the probe uses to send PATCH requests.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::fmt;

use crate::error::ValidationError;
use crate::schema::PATCH_OP_URN;

/// PATCH operation verbs; matched case-insensitively when parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Remove,
    Replace,
}

impl PatchOp {
    pub fn parse(op: &str) -> Option<Self> {
        match op.to_ascii_lowercase().as_str() {
            "add" => Some(Self::Add),
            "remove" => Some(Self::Remove),
            "replace" => Some(Self::Replace),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Replace => "replace",
        }
    }
}

impl fmt::Display for PatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single entry of a PATCH document's `Operations` array.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatchOperation {
    pub op: PatchOp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl PatchOperation {
    pub fn add(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: PatchOp::Add,
            path: Some(path.into()),
            value: Some(value),
        }
    }

    pub fn replace(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: PatchOp::Replace,
            path: Some(path.into()),
            value: Some(value),
        }
    }

    pub fn remove(path: impl Into<String>) -> Self {
        Self {
            op: PatchOp::Remove,
            path: Some(path.into()),
            value: None,
        }
    }
}

/// A complete PatchOp message.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PatchDocument {
    pub operations: Vec<PatchOperation>,
}

impl PatchDocument {
    pub fn new(operations: Vec<PatchOperation>) -> Self {
        Self { operations }
    }

    /// Wire representation with the PatchOp message schema
    pub fn to_value(&self) -> Value {
        json!({
            "schemas": [PATCH_OP_URN],
            "Operations": self.operations,
        })
    }

    /// Parse and validate a PATCH document, collecting every violation.
    ///
    /// Resource-type rules do not apply to PATCH documents; only the message
    /// schema and the operation grammar are checked.
    pub fn parse(document: &Value) -> Result<Self, Vec<ValidationError>> {
        let mut errors = Vec::new();

        let Some(object) = document.as_object() else {
            return Err(vec![ValidationError::invalid_json(
                "PATCH document must be a JSON object",
            )]);
        };

        let has_patch_schema = object
            .get("schemas")
            .and_then(Value::as_array)
            .is_some_and(|schemas| schemas.iter().any(|s| s.as_str() == Some(PATCH_OP_URN)));
        if !has_patch_schema {
            errors.push(ValidationError::invalid_schema(format!(
                "PATCH document 'schemas' must contain '{}'",
                PATCH_OP_URN
            )));
        }

        let operations: &[Value] = match object.get("Operations") {
            Some(Value::Array(operations)) if !operations.is_empty() => operations.as_slice(),
            Some(Value::Array(_)) => {
                errors.push(ValidationError::invalid_patch(
                    "Operations",
                    "'Operations' must contain at least one operation",
                ));
                &[]
            }
            Some(_) => {
                errors.push(ValidationError::invalid_patch(
                    "Operations",
                    "'Operations' must be an array of operation objects",
                ));
                &[]
            }
            None => {
                errors.push(ValidationError::invalid_patch(
                    "Operations",
                    "Missing required 'Operations' array",
                ));
                &[]
            }
        };

        let mut parsed = Vec::with_capacity(operations.len());
        let mut seen_paths: HashMap<&str, usize> = HashMap::new();

        for (index, operation) in operations.iter().enumerate() {
            let at = format!("Operations[{}]", index);

            let Some(fields) = operation.as_object() else {
                errors.push(ValidationError::invalid_patch(
                    at,
                    "Each operation must be a JSON object",
                ));
                continue;
            };

            let op = match fields.get("op") {
                Some(Value::String(op)) => match PatchOp::parse(op) {
                    Some(op) => Some(op),
                    None => {
                        errors.push(ValidationError::invalid_patch(
                            format!("{}.op", at),
                            format!("Unknown op '{}'; use add, remove or replace", op),
                        ));
                        None
                    }
                },
                Some(_) => {
                    errors.push(ValidationError::invalid_patch(
                        format!("{}.op", at),
                        "'op' must be one of the strings add, remove or replace",
                    ));
                    None
                }
                None => {
                    errors.push(ValidationError::invalid_patch(
                        format!("{}.op", at),
                        "Missing required 'op'; use add, remove or replace",
                    ));
                    None
                }
            };

            let path = match fields.get("path") {
                Some(Value::String(path)) => Some(path.as_str()),
                Some(_) => {
                    errors.push(ValidationError::invalid_patch(
                        format!("{}.path", at),
                        "'path' must be a string attribute path",
                    ));
                    None
                }
                None => None,
            };
            let value = fields.get("value");

            match op {
                Some(PatchOp::Remove) if fields.get("path").is_none() => {
                    errors.push(ValidationError::invalid_patch(
                        format!("{}.path", at),
                        "'remove' operations require a 'path'",
                    ));
                }
                Some(op @ (PatchOp::Add | PatchOp::Replace)) if value.is_none() => {
                    errors.push(ValidationError::invalid_patch(
                        format!("{}.value", at),
                        format!("'{}' operations require a 'value'", op),
                    ));
                }
                _ => {}
            }

            if let Some(path) = path {
                let count = seen_paths.entry(path).or_insert(0);
                *count += 1;
                if *count == 2 {
                    let occurrences = operations
                        .iter()
                        .filter(|o| o.get("path").and_then(Value::as_str) == Some(path))
                        .count();
                    errors.push(ValidationError::duplicate_path(
                        format!("{}.path", at),
                        path,
                        occurrences,
                    ));
                }
            }

            if let Some(op) = op {
                parsed.push(PatchOperation {
                    op,
                    path: path.map(str::to_string),
                    value: value.cloned(),
                });
            }
        }

        if errors.is_empty() {
            Ok(Self { operations: parsed })
        } else {
            Err(errors)
        }
    }
}
