//! Validation of what a server sends back.
//!
//! The static validator checks what a client sends; this module checks server
//! responses: status codes, content negotiation, server-assigned attributes,
//! header consistency, leaked writeOnly attributes and the list/error message
//! envelopes. Each finding is graded through the [`DeviationPolicy`].

use serde_json::{Map, Value};

use super::checks::RootCause;
use super::deviation::{self, DeviationPolicy, Severity};
use crate::client::{JSON_CONTENT_TYPE, SCIM_CONTENT_TYPE, ScimResponse};
use crate::error::ProbeErrorKind;
use crate::schema::{
    ERROR_URN, LIST_RESPONSE_URN, Mutability, ResourceKind, Returned, SchemaRegistry,
};

/// One discrepancy found in a server response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub message: String,
    pub path: Option<String>,
    pub severity: Severity,
    pub kind: ProbeErrorKind,
    pub cause: RootCause,
}

impl Finding {
    fn unexpected_status(expected: u16, actual: u16, section: &str) -> Self {
        Self {
            message: format!("Expected HTTP {}, got {} ({})", expected, actual, section),
            path: None,
            severity: Severity::Fail,
            kind: ProbeErrorKind::UnexpectedStatus,
            cause: RootCause::UnexpectedStatus(actual),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.severity == Severity::Fail
    }

    /// Message with the attribute path appended, when there is one
    pub fn describe(&self) -> String {
        match &self.path {
            Some(path) => format!("{} at {}", self.message, path),
            None => self.message.clone(),
        }
    }
}

/// Grades server responses against RFC 7643/7644.
#[derive(Debug, Clone, Copy)]
pub struct ResponseValidator<'a> {
    policy: DeviationPolicy,
    registry: &'a SchemaRegistry,
}

impl<'a> ResponseValidator<'a> {
    pub fn new(policy: DeviationPolicy, registry: &'a SchemaRegistry) -> Self {
        Self { policy, registry }
    }

    pub fn policy(&self) -> &DeviationPolicy {
        &self.policy
    }

    fn deviation(&self, rule: &'static str, message: impl Into<String>) -> Finding {
        let severity = self.policy.severity(rule);
        Finding {
            message: message.into(),
            path: None,
            severity,
            kind: severity.probe_kind(),
            cause: RootCause::Rule(rule),
        }
    }

    fn deviation_at(&self, rule: &'static str, path: &str, message: impl Into<String>) -> Finding {
        Finding {
            path: Some(path.to_string()),
            ..self.deviation(rule, message)
        }
    }

    /// Check the `Content-Type` of a response that carries SCIM JSON.
    ///
    /// A missing header is not reported.
    pub fn content_type(&self, response: &ScimResponse) -> Option<Finding> {
        let content_type = response.content_type()?;
        if content_type.contains(SCIM_CONTENT_TYPE) {
            return None;
        }
        let rule = if content_type.contains(JSON_CONTENT_TYPE) {
            deviation::CONTENT_TYPE_MISMATCH
        } else {
            deviation::CONTENT_TYPE_UNSUPPORTED
        };
        Some(self.deviation(
            rule,
            format!(
                "Content-Type should be {}, got '{}' (RFC 7644 §8.1)",
                SCIM_CONTENT_TYPE, content_type
            ),
        ))
    }

    /// Validate a response carrying a single resource of `kind`.
    pub fn resource(
        &self,
        response: &ScimResponse,
        expected_status: u16,
        kind: ResourceKind,
    ) -> Vec<Finding> {
        let mut findings = Vec::new();

        if response.status != expected_status {
            findings.push(Finding::unexpected_status(
                expected_status,
                response.status,
                "RFC 7644 §3.3",
            ));
            // An error body lacks id/meta/schemas by definition
            if response.status >= 400 {
                return findings;
            }
        }

        let body = response.json();
        let Some(resource) = body.as_ref().and_then(Value::as_object) else {
            if expected_status != 204 {
                let message = if response.has_body() {
                    "Response body is not a JSON object"
                } else {
                    "Response body is empty"
                };
                findings.push(self.deviation(deviation::BODY_EMPTY, message));
            }
            return findings;
        };

        findings.extend(self.content_type(response));

        let schemas: Vec<&str> = match resource.get("schemas").and_then(Value::as_array) {
            Some(schemas) if !schemas.is_empty() => {
                schemas.iter().filter_map(Value::as_str).collect()
            }
            _ => {
                findings.push(self.deviation(
                    deviation::RESOURCE_SCHEMAS_MISSING,
                    "Response missing 'schemas' array (RFC 7643 §3)",
                ));
                return findings;
            }
        };

        if !resource.contains_key("id") {
            findings.push(self.deviation_at(
                deviation::RESOURCE_ID_MISSING,
                "id",
                "Server response missing required attribute 'id' (RFC 7643 §3.1)",
            ));
        }

        match resource.get("meta") {
            None | Some(Value::Null) => findings.push(self.deviation_at(
                deviation::RESOURCE_META_MISSING,
                "meta",
                "Server response missing required attribute 'meta' (RFC 7643 §3.1)",
            )),
            Some(Value::Object(meta)) => self.check_meta(response, meta, kind, &mut findings),
            Some(_) => findings.push(self.deviation_at(
                deviation::RESOURCE_META_MISSING,
                "meta",
                "meta must be a complex attribute (RFC 7643 §3.1)",
            )),
        }

        self.check_write_only(resource, &schemas, &mut findings);
        findings
    }

    fn check_meta(
        &self,
        response: &ScimResponse,
        meta: &Map<String, Value>,
        kind: ResourceKind,
        findings: &mut Vec<Finding>,
    ) {
        for field in ["resourceType", "created", "lastModified"] {
            if !meta.contains_key(field) {
                let path = format!("meta.{}", field);
                findings.push(self.deviation_at(
                    deviation::META_ATTRIBUTE_MISSING,
                    &path,
                    format!("{} must be present in server response (RFC 7643 §3.1)", path),
                ));
            }
        }

        let version = match meta.get("version") {
            None | Some(Value::Null) => None,
            Some(Value::String(version)) => Some(version.as_str()),
            Some(other) => {
                findings.push(self.deviation_at(
                    deviation::META_VERSION_TYPE,
                    "meta.version",
                    format!(
                        "meta.version must be a string, got {} (RFC 7643 §3.1)",
                        json_type(other)
                    ),
                ));
                None
            }
        };

        if let (Some(etag), Some(version)) = (response.header("ETag"), version) {
            if !etag.is_empty() && !version.is_empty() && etag.trim_matches('"') != version.trim_matches('"') {
                findings.push(self.deviation(
                    deviation::ETAG_VERSION_MISMATCH,
                    format!(
                        "ETag header '{}' does not match meta.version '{}' (RFC 7644 §3.14)",
                        etag, version
                    ),
                ));
            }
        }

        if response.status == 201 {
            let meta_location = meta.get("location").and_then(Value::as_str);
            match (response.header("Location"), meta_location) {
                (Some(header), Some(location)) if header != location => {
                    findings.push(self.deviation(
                        deviation::LOCATION_MISMATCH,
                        format!(
                            "Location header '{}' does not match meta.location '{}' (RFC 7644 §3.3)",
                            header, location
                        ),
                    ));
                }
                (None, _) => findings.push(self.deviation(
                    deviation::LOCATION_MISSING,
                    "Location header should be present on 201 Created (RFC 7644 §3.3)",
                )),
                _ => {}
            }
        }

        if let Some(resource_type) = meta.get("resourceType").and_then(Value::as_str) {
            if kind != ResourceKind::Unknown && resource_type != kind.name() {
                findings.push(self.deviation_at(
                    deviation::RESOURCE_TYPE_MISMATCH,
                    "meta.resourceType",
                    format!(
                        "meta.resourceType '{}' does not match expected '{}'",
                        resource_type, kind
                    ),
                ));
            }
        }
    }

    fn check_write_only(
        &self,
        resource: &Map<String, Value>,
        schemas: &[&str],
        findings: &mut Vec<Finding>,
    ) {
        for urn in schemas {
            let Some(schema) = self.registry.schema(urn) else {
                continue;
            };
            let data = if self.registry.extension(urn).is_some() {
                match resource.get(*urn).and_then(Value::as_object) {
                    Some(data) => data,
                    None => continue,
                }
            } else {
                resource
            };
            let hidden = schema.attributes.iter().filter(|a| {
                a.returned == Returned::Never || a.mutability == Mutability::WriteOnly
            });
            for attribute in hidden {
                if data.keys().any(|key| key.eq_ignore_ascii_case(&attribute.name)) {
                    findings.push(self.deviation_at(
                        deviation::WRITE_ONLY_RETURNED,
                        &attribute.name,
                        format!(
                            "writeOnly attribute '{}' must not appear in server response (RFC 7643 §7)",
                            attribute.name
                        ),
                    ));
                }
            }
        }
    }

    /// Validate a ListResponse (RFC 7644 §3.4.2).
    pub fn list(&self, response: &ScimResponse) -> Vec<Finding> {
        let mut findings = Vec::new();

        if response.status != 200 {
            findings.push(Finding::unexpected_status(200, response.status, "RFC 7644 §3.4.2"));
            if response.status >= 400 {
                return findings;
            }
        }

        let body = response.json();
        let Some(list) = body.as_ref().and_then(Value::as_object) else {
            findings.push(self.deviation(deviation::BODY_EMPTY, "Response body is empty"));
            return findings;
        };

        findings.extend(self.content_type(response));

        let has_schema = list
            .get("schemas")
            .and_then(Value::as_array)
            .is_some_and(|schemas| schemas.iter().any(|s| s.as_str() == Some(LIST_RESPONSE_URN)));
        if !has_schema {
            findings.push(self.deviation(
                deviation::LIST_SCHEMA_MISSING,
                format!(
                    "ListResponse must include schema '{}' (RFC 7644 §3.4.2)",
                    LIST_RESPONSE_URN
                ),
            ));
        }

        match list.get("totalResults") {
            None => findings.push(self.deviation_at(
                deviation::LIST_TOTAL_RESULTS_MISSING,
                "totalResults",
                "ListResponse missing required attribute 'totalResults' (RFC 7644 §3.4.2)",
            )),
            Some(value) if !is_integer(value) => findings.push(self.deviation_at(
                deviation::LIST_INTEGER_TYPE,
                "totalResults",
                format!(
                    "totalResults must be an integer, got {} (RFC 7644 §3.4.2)",
                    json_type(value)
                ),
            )),
            Some(_) => {}
        }

        if list.get("Resources").is_some_and(|r| !r.is_array()) {
            findings.push(self.deviation_at(
                deviation::LIST_RESOURCES_NOT_ARRAY,
                "Resources",
                "'Resources' must be an array",
            ));
        }

        for field in ["startIndex", "itemsPerPage"] {
            if list.get(field).is_some_and(|value| !is_integer(value)) {
                findings.push(self.deviation_at(
                    deviation::LIST_INTEGER_TYPE,
                    field,
                    format!("'{}' must be an integer", field),
                ));
            }
        }

        findings
    }

    /// Validate an error response (RFC 7644 §3.12).
    pub fn error(&self, response: &ScimResponse, expected_status: u16) -> Vec<Finding> {
        let mut findings = Vec::new();

        if response.status != expected_status {
            findings.push(Finding::unexpected_status(
                expected_status,
                response.status,
                "RFC 7644 §3.12",
            ));
        }

        let body = response.json();
        let Some(error) = body.as_ref().and_then(Value::as_object) else {
            findings.push(self.deviation(
                deviation::ERROR_BODY_EMPTY,
                "Error response body is empty (RFC 7644 §3.12)",
            ));
            return findings;
        };

        let has_schema = error
            .get("schemas")
            .and_then(Value::as_array)
            .is_some_and(|schemas| schemas.iter().any(|s| s.as_str() == Some(ERROR_URN)));
        if !has_schema {
            findings.push(self.deviation(
                deviation::ERROR_SCHEMA_MISSING,
                format!("Error response must include schema '{}' (RFC 7644 §3.12)", ERROR_URN),
            ));
        }

        if !error.contains_key("status") {
            findings.push(self.deviation_at(
                deviation::ERROR_STATUS_MISSING,
                "status",
                "Error response missing required attribute 'status' (RFC 7644 §3.12)",
            ));
        }

        findings
    }

    /// Validate a DELETE response (RFC 7644 §3.6).
    pub fn delete(&self, response: &ScimResponse) -> Vec<Finding> {
        let mut findings = Vec::new();
        if response.status != 204 {
            findings.push(Finding::unexpected_status(204, response.status, "RFC 7644 §3.6"));
        }
        if response.has_body() {
            findings.push(self.deviation(
                deviation::DELETE_BODY_PRESENT,
                "DELETE 204 response should have no body (RFC 7644 §3.6)",
            ));
        }
        findings
    }
}

fn is_integer(value: &Value) -> bool {
    value.is_i64() || value.is_u64()
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
