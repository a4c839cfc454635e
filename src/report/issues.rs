//! Fix summary: failing checks grouped by root cause.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::probe::checks::{ProbeCheck, RootCause};
use crate::probe::deviation::*;

/// A group of failing checks sharing one root cause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    /// `P1` is the most fundamental; `?` marks failures without a known cause
    pub priority: String,
    pub title: String,
    pub fix: String,
    pub rationale: String,
    pub affected_tests: usize,
    /// Names of the affected checks, in run order
    pub checks: Vec<String>,
}

/// Known root causes in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Cause {
    Discovery,
    Unreachable,
    ContentTypeRejection,
    ContentType,
    Representation,
    MetaAttributes,
    Location,
    Versioning,
    WriteOnlyLeak,
    ResourceTypeMismatch,
    NotPersisted,
    UnexpectedStatus,
    RateLimit,
    ErrorBody,
    ListResponse,
    DeleteBody,
    Query,
}

impl Cause {
    fn of(cause: &RootCause) -> Option<Self> {
        let cause = match cause {
            RootCause::Discovery => Self::Discovery,
            RootCause::Transport | RootCause::Timeout => Self::Unreachable,
            RootCause::RateLimit => Self::RateLimit,
            RootCause::NotPersisted => Self::NotPersisted,
            RootCause::UnexpectedStatus(_) => Self::UnexpectedStatus,
            RootCause::Rule(rule) => match *rule {
                CONTENT_TYPE_REJECTION => Self::ContentTypeRejection,
                CONTENT_TYPE_MISMATCH | CONTENT_TYPE_UNSUPPORTED => Self::ContentType,
                RESOURCE_SCHEMAS_MISSING | RESOURCE_ID_MISSING | RESOURCE_META_MISSING
                | BODY_EMPTY => Self::Representation,
                META_ATTRIBUTE_MISSING => Self::MetaAttributes,
                LOCATION_MISSING | LOCATION_MISMATCH => Self::Location,
                ETAG_VERSION_MISMATCH | META_VERSION_TYPE => Self::Versioning,
                WRITE_ONLY_RETURNED => Self::WriteOnlyLeak,
                RESOURCE_TYPE_MISMATCH => Self::ResourceTypeMismatch,
                ERROR_SCHEMA_MISSING | ERROR_STATUS_MISSING | ERROR_BODY_EMPTY => Self::ErrorBody,
                LIST_SCHEMA_MISSING | LIST_TOTAL_RESULTS_MISSING | LIST_INTEGER_TYPE
                | LIST_RESOURCES_NOT_ARRAY => Self::ListResponse,
                DELETE_BODY_PRESENT => Self::DeleteBody,
                PAGINATION_COUNT_IGNORED | COUNT_ZERO_RESOURCES | FILTER_UNSUPPORTED => {
                    Self::Query
                }
                _ => return None,
            },
        };
        Some(cause)
    }

    /// (title, fix, rationale)
    fn describe(&self) -> (&'static str, &'static str, &'static str) {
        match self {
            Self::Discovery => (
                "Discovery endpoints not implemented",
                "Implement GET /ServiceProviderConfig, /Schemas, and /ResourceTypes",
                "Enterprise IdPs query these endpoints before provisioning to learn server \
                 capabilities; without them clients must hardcode assumptions or fail before \
                 sending a single user or group.",
            ),
            Self::Unreachable => (
                "Server unreachable or too slow during the run",
                "Check network reachability, TLS settings and server load; raise --timeout if responses are slow",
                "Requests that never complete cannot be graded, so every dependent check is lost.",
            ),
            Self::ContentTypeRejection => (
                "Server rejects application/scim+json request bodies",
                "Accept Content-Type: application/scim+json on all POST, PUT and PATCH requests",
                "Compliant clients always send the SCIM media type; a server that only accepts \
                 application/json cannot be provisioned by them at all.",
            ),
            Self::ContentType => (
                "Wrong Content-Type on SCIM responses",
                "Set Content-Type: application/scim+json on all responses served from the SCIM base URL",
                "Compliant clients inspect Content-Type before parsing; every response is \
                 rejected regardless of whether the body is otherwise correct.",
            ),
            Self::Representation => (
                "Incomplete resource representations",
                "Return schemas, id and meta in every resource representation",
                "Clients need id to address the resource again and schemas to interpret it; \
                 without them a successful create is unusable.",
            ),
            Self::MetaAttributes => (
                "Missing meta attributes on resource responses",
                "Include meta.resourceType, meta.created and meta.lastModified in all resource representations",
                "Without meta.lastModified, incremental sync is impossible; meta.created is \
                 required for audit trails in regulated environments.",
            ),
            Self::Location => (
                "Missing or inconsistent Location header on 201 Created",
                "Return Location: <base>/<resource>/<id> matching meta.location in all create responses",
                "Clients that treat a missing Location as a failed create silently discard \
                 newly provisioned resources.",
            ),
            Self::Versioning => (
                "Inconsistent resource versioning",
                "Return meta.version as a string and send the same value in the ETag header",
                "Conditional updates depend on the version; a mismatch makes every If-Match \
                 request fail or, worse, succeed against stale data.",
            ),
            Self::WriteOnlyLeak => (
                "writeOnly attributes returned in responses",
                "Never return attributes such as password in any response",
                "Returning secrets exposes them to every client with read access.",
            ),
            Self::ResourceTypeMismatch => (
                "meta.resourceType does not match the endpoint",
                "Set meta.resourceType to the resource type served by the endpoint",
                "Clients dispatch on resourceType; a wrong value routes the resource to the wrong handler.",
            ),
            Self::NotPersisted => (
                "Updates acknowledged but not persisted",
                "Apply PUT and PATCH changes before answering with success",
                "A client cannot detect a lost write that was acknowledged, so directories drift apart.",
            ),
            Self::UnexpectedStatus => (
                "Unexpected HTTP status codes",
                "Return the status codes defined by RFC 7644 §3 for each operation",
                "Clients decide success and retry behavior from the status code alone.",
            ),
            Self::RateLimit => (
                "Rate limiting never relents",
                "Raise the rate limit for provisioning clients or send a realistic Retry-After",
                "Provisioning runs in bursts; a limit that outlasts several retries stalls every sync.",
            ),
            Self::ErrorBody => (
                "Non-conformant error response bodies",
                "Return the Error schema URN and a \"status\" field in every SCIM error body",
                "Programmatic error parsers that expect the SCIM error format fall back to less \
                 specific handling or fail outright.",
            ),
            Self::ListResponse => (
                "Non-conformant ListResponse bodies",
                "Return the ListResponse schema URN, an integer totalResults and a Resources array",
                "Clients page through results using totalResults and Resources; malformed lists \
                 hide resources from sync.",
            ),
            Self::DeleteBody => (
                "DELETE does not answer 204 No Content",
                "Answer successful DELETE requests with 204 and an empty body",
                "Clients that expect 204 may treat other answers as a failed deprovisioning.",
            ),
            Self::Query => (
                "Incomplete query support",
                "Support eq filters and honor count and startIndex on list endpoints",
                "Clients use filters to find existing resources before creating them; without \
                 filtering they create duplicates.",
            ),
        }
    }
}

/// Group `fail` and `error` checks into issues, most fundamental first.
///
/// Checks without a recognised cause end up in one catch-all issue with
/// priority `?`, placed last.
pub fn build_issues(checks: &[ProbeCheck]) -> Vec<Issue> {
    let mut grouped: BTreeMap<Cause, Vec<&ProbeCheck>> = BTreeMap::new();
    let mut unmatched = Vec::new();

    for check in checks.iter().filter(|check| check.status.is_failure()) {
        match check.cause.as_ref().and_then(Cause::of) {
            Some(cause) => grouped.entry(cause).or_default().push(check),
            None => unmatched.push(check),
        }
    }

    let mut issues: Vec<Issue> = grouped
        .into_iter()
        .enumerate()
        .map(|(index, (cause, affected))| {
            let (title, fix, rationale) = cause.describe();
            Issue {
                priority: format!("P{}", index + 1),
                title: title.to_string(),
                fix: fix.to_string(),
                rationale: rationale.to_string(),
                affected_tests: affected.len(),
                checks: affected.iter().map(|check| check.name.clone()).collect(),
            }
        })
        .collect();

    if !unmatched.is_empty() {
        issues.push(Issue {
            priority: "?".to_string(),
            title: format!(
                "{} failure(s) not matched to a known root cause",
                unmatched.len()
            ),
            fix: "Review the individual check output for specific error messages".to_string(),
            rationale: "These failures did not match any known issue pattern and require \
                        individual investigation."
                .to_string(),
            affected_tests: unmatched.len(),
            checks: unmatched.iter().map(|check| check.name.clone()).collect(),
        });
    }

    issues
}
