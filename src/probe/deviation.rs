//! Deviation policy: how observed protocol discrepancies are graded.
//!
//! Every discrepancy the probe can recognise has a [`DeviationRule`] with a
//! strict and a compat severity. Rules that real servers commonly break
//! without harming clients warn in compat mode; rules whose violation breaks
//! conformant clients outright fail in both modes.

use serde::Serialize;
use std::fmt;

use crate::config::ValidationMode;
use crate::error::ProbeErrorKind;

/// Version of the built-in rule table
pub const DEVIATION_TABLE_VERSION: &str = "1";

pub const CONTENT_TYPE_MISMATCH: &str = "content-type-mismatch";
pub const CONTENT_TYPE_UNSUPPORTED: &str = "content-type-unsupported";
pub const CONTENT_TYPE_REJECTION: &str = "content-type-rejection";
pub const DELETE_BODY_PRESENT: &str = "delete-body-present";
pub const LOCATION_MISMATCH: &str = "location-mismatch";
pub const LOCATION_MISSING: &str = "location-missing";
pub const ETAG_VERSION_MISMATCH: &str = "etag-version-mismatch";
pub const META_VERSION_TYPE: &str = "meta-version-type";
pub const ERROR_SCHEMA_MISSING: &str = "error-schema-missing";
pub const ERROR_STATUS_MISSING: &str = "error-status-missing";
pub const ERROR_BODY_EMPTY: &str = "error-body-empty";
pub const LIST_SCHEMA_MISSING: &str = "list-schema-missing";
pub const LIST_TOTAL_RESULTS_MISSING: &str = "list-total-results-missing";
pub const LIST_INTEGER_TYPE: &str = "list-integer-type";
pub const LIST_RESOURCES_NOT_ARRAY: &str = "list-resources-not-array";
pub const RESOURCE_SCHEMAS_MISSING: &str = "resource-schemas-missing";
pub const RESOURCE_ID_MISSING: &str = "resource-id-missing";
pub const RESOURCE_META_MISSING: &str = "resource-meta-missing";
pub const META_ATTRIBUTE_MISSING: &str = "meta-attribute-missing";
pub const WRITE_ONLY_RETURNED: &str = "write-only-returned";
pub const RESOURCE_TYPE_MISMATCH: &str = "resource-type-mismatch";
pub const BODY_EMPTY: &str = "body-empty";
pub const PAGINATION_COUNT_IGNORED: &str = "pagination-count-ignored";
pub const COUNT_ZERO_RESOURCES: &str = "count-zero-resources";
pub const FILTER_UNSUPPORTED: &str = "filter-unsupported";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warn,
    Fail,
}

impl Severity {
    pub fn probe_kind(&self) -> ProbeErrorKind {
        match self {
            Self::Warn => ProbeErrorKind::DeviationWarning,
            Self::Fail => ProbeErrorKind::DeviationFailure,
        }
    }
}

/// Broad area a discrepancy belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviationClass {
    ContentNegotiation,
    Headers,
    ResourceRepresentation,
    ErrorResponse,
    ListResponse,
    Delete,
    Query,
}

impl fmt::Display for DeviationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ContentNegotiation => "content negotiation",
            Self::Headers => "headers",
            Self::ResourceRepresentation => "resource representation",
            Self::ErrorResponse => "error response",
            Self::ListResponse => "list response",
            Self::Delete => "delete",
            Self::Query => "query",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviationRule {
    pub id: &'static str,
    pub class: DeviationClass,
    pub strict: Severity,
    pub compat: Severity,
    pub explanation: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rfc: Option<&'static str>,
}

impl DeviationRule {
    const fn tolerated(
        id: &'static str,
        class: DeviationClass,
        explanation: &'static str,
        rfc: &'static str,
    ) -> Self {
        Self {
            id,
            class,
            strict: Severity::Fail,
            compat: Severity::Warn,
            explanation,
            rfc: Some(rfc),
        }
    }

    const fn always_fail(
        id: &'static str,
        class: DeviationClass,
        explanation: &'static str,
        rfc: Option<&'static str>,
    ) -> Self {
        Self {
            id,
            class,
            strict: Severity::Fail,
            compat: Severity::Fail,
            explanation,
            rfc,
        }
    }

    const fn advisory(
        id: &'static str,
        class: DeviationClass,
        explanation: &'static str,
        rfc: &'static str,
    ) -> Self {
        Self {
            id,
            class,
            strict: Severity::Warn,
            compat: Severity::Warn,
            explanation,
            rfc: Some(rfc),
        }
    }

    pub fn severity(&self, mode: ValidationMode) -> Severity {
        match mode {
            ValidationMode::Strict => self.strict,
            ValidationMode::Compat => self.compat,
        }
    }

    /// True when the rule fails regardless of mode
    pub fn is_always_fail(&self) -> bool {
        self.strict == Severity::Fail && self.compat == Severity::Fail
    }
}

use DeviationClass::*;

/// The built-in rule table.
pub static DEFAULT_RULES: &[DeviationRule] = &[
    DeviationRule::tolerated(
        CONTENT_TYPE_MISMATCH,
        ContentNegotiation,
        "Response uses application/json instead of application/scim+json",
        "RFC 7644 §8.1",
    ),
    DeviationRule::always_fail(
        CONTENT_TYPE_UNSUPPORTED,
        ContentNegotiation,
        "Response Content-Type is neither application/scim+json nor application/json",
        Some("RFC 7644 §8.1"),
    ),
    DeviationRule::always_fail(
        CONTENT_TYPE_REJECTION,
        ContentNegotiation,
        "Server rejects requests sent as application/scim+json but accepts application/json",
        Some("RFC 7644 §8.2"),
    ),
    DeviationRule::tolerated(
        DELETE_BODY_PRESENT,
        Delete,
        "DELETE 204 response carries a body",
        "RFC 7644 §3.6",
    ),
    DeviationRule::tolerated(
        LOCATION_MISMATCH,
        Headers,
        "Location header differs from meta.location",
        "RFC 7644 §3.3",
    ),
    DeviationRule::tolerated(
        LOCATION_MISSING,
        Headers,
        "201 Created response has no Location header",
        "RFC 7644 §3.3",
    ),
    DeviationRule::tolerated(
        ETAG_VERSION_MISMATCH,
        Headers,
        "ETag header differs from meta.version",
        "RFC 7644 §3.14",
    ),
    DeviationRule::always_fail(
        META_VERSION_TYPE,
        ResourceRepresentation,
        "meta.version is not a string",
        Some("RFC 7643 §3.1"),
    ),
    DeviationRule::tolerated(
        ERROR_SCHEMA_MISSING,
        ErrorResponse,
        "Error body lacks the urn:ietf:params:scim:api:messages:2.0:Error schema",
        "RFC 7644 §3.12",
    ),
    DeviationRule::tolerated(
        ERROR_STATUS_MISSING,
        ErrorResponse,
        "Error body lacks the status attribute",
        "RFC 7644 §3.12",
    ),
    DeviationRule::tolerated(
        ERROR_BODY_EMPTY,
        ErrorResponse,
        "Error response has an empty body",
        "RFC 7644 §3.12",
    ),
    DeviationRule::always_fail(
        LIST_SCHEMA_MISSING,
        ListResponse,
        "ListResponse lacks the urn:ietf:params:scim:api:messages:2.0:ListResponse schema",
        Some("RFC 7644 §3.4.2"),
    ),
    DeviationRule::always_fail(
        LIST_TOTAL_RESULTS_MISSING,
        ListResponse,
        "ListResponse lacks totalResults",
        Some("RFC 7644 §3.4.2"),
    ),
    DeviationRule::tolerated(
        LIST_INTEGER_TYPE,
        ListResponse,
        "totalResults, startIndex or itemsPerPage is not an integer",
        "RFC 7644 §3.4.2",
    ),
    DeviationRule::always_fail(
        LIST_RESOURCES_NOT_ARRAY,
        ListResponse,
        "ListResponse Resources is not an array",
        Some("RFC 7644 §3.4.2"),
    ),
    DeviationRule::always_fail(
        RESOURCE_SCHEMAS_MISSING,
        ResourceRepresentation,
        "Returned resource has no schemas array",
        Some("RFC 7643 §3"),
    ),
    DeviationRule::always_fail(
        RESOURCE_ID_MISSING,
        ResourceRepresentation,
        "Returned resource has no id",
        Some("RFC 7643 §3.1"),
    ),
    DeviationRule::always_fail(
        RESOURCE_META_MISSING,
        ResourceRepresentation,
        "Returned resource has no meta",
        Some("RFC 7643 §3.1"),
    ),
    DeviationRule::always_fail(
        META_ATTRIBUTE_MISSING,
        ResourceRepresentation,
        "meta lacks resourceType, created or lastModified",
        Some("RFC 7643 §3.1"),
    ),
    DeviationRule::always_fail(
        WRITE_ONLY_RETURNED,
        ResourceRepresentation,
        "A writeOnly or returned:never attribute appears in a response",
        Some("RFC 7643 §7"),
    ),
    DeviationRule::always_fail(
        RESOURCE_TYPE_MISMATCH,
        ResourceRepresentation,
        "meta.resourceType differs from the endpoint's resource type",
        None,
    ),
    DeviationRule::always_fail(
        BODY_EMPTY,
        ResourceRepresentation,
        "Response that should carry a resource is empty",
        Some("RFC 7644 §3.3"),
    ),
    DeviationRule::advisory(
        PAGINATION_COUNT_IGNORED,
        Query,
        "itemsPerPage exceeds the requested count",
        "RFC 7644 §3.4.2.4",
    ),
    DeviationRule::advisory(
        COUNT_ZERO_RESOURCES,
        Query,
        "count=0 returned resources",
        "RFC 7644 §3.4.2.4",
    ),
    DeviationRule::advisory(
        FILTER_UNSUPPORTED,
        Query,
        "Server rejected a simple eq filter",
        "RFC 7644 §3.4.2.2",
    ),
];

/// A rule table bound to a validation mode.
#[derive(Debug, Clone, Copy)]
pub struct DeviationPolicy {
    mode: ValidationMode,
    rules: &'static [DeviationRule],
}

impl DeviationPolicy {
    pub fn new(mode: ValidationMode) -> Self {
        Self {
            mode,
            rules: DEFAULT_RULES,
        }
    }

    /// Use an alternate rule table
    pub fn with_rules(mode: ValidationMode, rules: &'static [DeviationRule]) -> Self {
        Self { mode, rules }
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    pub fn version(&self) -> &'static str {
        DEVIATION_TABLE_VERSION
    }

    pub fn rules(&self) -> &'static [DeviationRule] {
        self.rules
    }

    pub fn rule(&self, id: &str) -> Option<&'static DeviationRule> {
        self.rules.iter().find(|rule| rule.id == id)
    }

    /// Severity of a rule in the current mode. Unknown rule ids fail.
    pub fn severity(&self, id: &str) -> Severity {
        self.rule(id)
            .map_or(Severity::Fail, |rule| rule.severity(self.mode))
    }
}
