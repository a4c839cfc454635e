//! Discovery, rapid lifecycle, search and error-handling phases.

use log::{debug, info};
use serde_json::{Value, json};
use std::collections::BTreeSet;

use super::driver::{ProbeEngine, SERVICE_PROVIDER_CONFIG};
use crate::client::{HttpMethod, ScimResponse, ScimTransport, item_path};
use crate::config::MAX_RAPID_AGENTS;
use crate::error::{ClientError, ProbeErrorKind};
use crate::probe::checks::{Phase, ProbeCheck, RootCause};
use crate::probe::deviation::{COUNT_ZERO_RESOURCES, FILTER_UNSUPPORTED, PAGINATION_COUNT_IGNORED};
use crate::schema::{ResourceKind, USER_URN};

const SCHEMAS: &str = "/Schemas";
const RESOURCE_TYPES: &str = "/ResourceTypes";

const USERS: &str = "/Users";
const NO_MATCH_FILTER: &str = "/Users?filter=userName%20eq%20%22nonexistent%40test.invalid%22";
const FIRST_PAGE: &str = "/Users?startIndex=1&count=1";
const EMPTY_PAGE: &str = "/Users?count=0";
const NONEXISTENT_USER: &str = "/Users/nonexistent-id-000000";

/// Resource types advertised by a `/ResourceTypes` body.
///
/// Accepts a ListResponse or a bare array. Falls back to User and Group only
/// when the body is missing or holds no list; an advertised list is taken as
/// is, even when it names none of the probed types.
pub fn supported_kinds(body: Option<&Value>) -> BTreeSet<ResourceKind> {
    let entries = body.and_then(|body| {
        body.as_array()
            .or_else(|| body.get("Resources").and_then(Value::as_array))
    });

    match entries {
        Some(entries) => entries
            .iter()
            .filter_map(|entry| entry.get("name").and_then(Value::as_str))
            .filter_map(ResourceKind::from_name)
            .collect(),
        None => [ResourceKind::User, ResourceKind::Group].into_iter().collect(),
    }
}

impl<T: ScimTransport> ProbeEngine<T> {
    /// Phase 1. `preflight` is the already received `/ServiceProviderConfig` response.
    pub(super) async fn discovery(&mut self, preflight: Option<Result<ScimResponse, ClientError>>) {
        let phase = Phase::Discovery;
        let mut preflight = preflight;
        let mut resource_types = None;

        for path in [SERVICE_PROVIDER_CONFIG, SCHEMAS, RESOURCE_TYPES] {
            let name = format!("GET {}", path);
            self.begin(&name, phase);

            let result = match preflight.take() {
                Some(result) if path == SERVICE_PROVIDER_CONFIG => result,
                _ => self.client.get(path).await,
            };
            let response = match result {
                Ok(response) => response,
                Err(error) => {
                    self.record_client_failure(&name, phase, &error);
                    continue;
                }
            };

            let evidence = self.evidence(HttpMethod::Get, path, None).with_response(&response);
            if response.status == 200 {
                let findings: Vec<_> = self.responses().content_type(&response).into_iter().collect();
                self.record(&name, phase, &findings, None, evidence);
                if path == RESOURCE_TYPES {
                    resource_types = response.json();
                }
            } else {
                self.checks.push(
                    ProbeCheck::fail(&name, phase)
                        .with_message(format!(
                            "Expected 200, got {}; discovery endpoints are required (RFC 7644 §4)",
                            response.status
                        ))
                        .with_kind(ProbeErrorKind::UnexpectedStatus)
                        .with_cause(RootCause::Discovery)
                        .with_evidence(evidence),
                );
            }
        }

        self.supported = supported_kinds(resource_types.as_ref());
        info!(
            "Supported resource types: {}",
            self.supported
                .iter()
                .map(ResourceKind::name)
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    /// Phase 4c: create and immediately delete a batch of Agents.
    pub(super) async fn rapid_lifecycle(&mut self) {
        let phase = Phase::AgentRapidLifecycle;
        let count = self.config.rapid_agent_count.min(MAX_RAPID_AGENTS);
        let name = format!("Rapid create/delete {} agents", count);

        if let Some(reason) = self.lifecycle_skip_reason(ResourceKind::Agent) {
            self.checks.push(ProbeCheck::skip(name, phase).with_message(reason));
            return;
        }
        if count == 0 {
            self.checks.push(
                ProbeCheck::skip(name, phase).with_message("Skipped: rapid lifecycle count is 0"),
            );
            return;
        }

        self.begin(&name, phase);
        let mut succeeded = 0;
        for _ in 0..count {
            if self.rapid_cycle().await {
                succeeded += 1;
            }
        }

        let check = if succeeded == count {
            ProbeCheck::pass(&name, phase).with_message(format!("{}/{} succeeded", succeeded, count))
        } else {
            ProbeCheck::fail(&name, phase)
                .with_message(format!(
                    "{}/{} succeeded, {} failed",
                    succeeded,
                    count,
                    count - succeeded
                ))
                .with_kind(ProbeErrorKind::UnexpectedStatus)
        };
        self.checks.push(check);
    }

    /// One create/delete round trip; true when the server answered 201 then 204
    async fn rapid_cycle(&mut self) -> bool {
        let kind = ResourceKind::Agent;
        let payload = self.factory.agent();

        let response = match self.client.post(kind.endpoint(), &payload).await {
            Ok(response) => response,
            Err(error) => {
                debug!("Rapid create failed: {}", error);
                return false;
            }
        };
        let Some(id) = response.resource_id().filter(|_| response.is_success()) else {
            debug!("Rapid create returned {} without an id", response.status);
            return false;
        };
        let created = response.status == 201;
        self.created.record(kind, id.clone());

        let path = item_path(kind.endpoint(), &id);
        match self.client.delete(&path).await {
            Ok(response) if response.is_success() || response.status == 404 => {
                self.created.confirm_deleted(kind, &id);
                created && response.status == 204
            }
            Ok(response) => {
                debug!("Rapid delete of {} returned {}", path, response.status);
                false
            }
            Err(error) => {
                debug!("Rapid delete of {} failed: {}", path, error);
                false
            }
        }
    }

    /// Phase 5: list, filter and pagination on `/Users`.
    pub(super) async fn search(&mut self) {
        let phase = Phase::Search;

        let name = "GET /Users (ListResponse)";
        self.begin(name, phase);
        match self.client.get(USERS).await {
            Ok(response) => {
                let findings = self.responses().list(&response);
                let evidence = self.evidence(HttpMethod::Get, USERS, None).with_response(&response);
                self.record(name, phase, &findings, None, evidence);
            }
            Err(error) => self.record_client_failure(name, phase, &error),
        }

        let name = "GET /Users?filter (no match)";
        self.begin(name, phase);
        match self.client.get(NO_MATCH_FILTER).await {
            Ok(response) => {
                let evidence = self
                    .evidence(HttpMethod::Get, NO_MATCH_FILTER, None)
                    .with_response(&response);
                let check = match response.status {
                    200 if total_results(&response) == Some(0) => {
                        ProbeCheck::pass(name, phase).with_message("totalResults=0")
                    }
                    200 => ProbeCheck::pass(name, phase)
                        .with_message("Filter returned results (server may ignore filter)"),
                    400 => self.deviation_check(
                        name,
                        phase,
                        FILTER_UNSUPPORTED,
                        "400 on a simple eq filter; filtering appears partially supported (RFC 7644 §3.4.2.2)",
                    ),
                    status => Self::status_check(name, phase, "200", status),
                };
                self.checks.push(check.with_evidence(evidence));
            }
            Err(error) => self.record_client_failure(name, phase, &error),
        }

        let name = "GET /Users?startIndex=1&count=1";
        self.begin(name, phase);
        match self.client.get(FIRST_PAGE).await {
            Ok(response) => {
                let evidence = self
                    .evidence(HttpMethod::Get, FIRST_PAGE, None)
                    .with_response(&response);
                if response.status != 200 {
                    let check = Self::status_check(name, phase, "200", response.status);
                    self.checks.push(check.with_evidence(evidence));
                } else {
                    let items = response
                        .json()
                        .and_then(|body| body.get("itemsPerPage").and_then(Value::as_u64));
                    self.checks.push(
                        ProbeCheck::pass(name, phase).with_evidence(evidence.clone()),
                    );
                    if let Some(items) = items.filter(|items| *items > 1) {
                        let check = self.deviation_check(
                            "Pagination: itemsPerPage honors count",
                            phase,
                            PAGINATION_COUNT_IGNORED,
                            format!("Requested count=1 but itemsPerPage={} (RFC 7644 §3.4.2.4)", items),
                        );
                        self.checks.push(check.with_evidence(evidence));
                    }
                }
            }
            Err(error) => self.record_client_failure(name, phase, &error),
        }

        let name = "GET /Users?count=0 (boundary)";
        self.begin(name, phase);
        match self.client.get(EMPTY_PAGE).await {
            Ok(response) => {
                let evidence = self
                    .evidence(HttpMethod::Get, EMPTY_PAGE, None)
                    .with_response(&response);
                let returned = response
                    .json()
                    .and_then(|body| body.get("Resources").and_then(Value::as_array).map(Vec::len))
                    .unwrap_or(0);
                let check = match response.status {
                    200 if returned == 0 => {
                        ProbeCheck::pass(name, phase).with_message("No resources returned")
                    }
                    200 => self.deviation_check(
                        name,
                        phase,
                        COUNT_ZERO_RESOURCES,
                        format!("count=0 returned {} resources (RFC 7644 §3.4.2.4)", returned),
                    ),
                    status => self.deviation_check(
                        name,
                        phase,
                        COUNT_ZERO_RESOURCES,
                        format!("count=0 answered with {}; expected 200 with no resources", status),
                    ),
                };
                self.checks.push(check.with_evidence(evidence));
            }
            Err(error) => self.record_client_failure(name, phase, &error),
        }
    }

    /// Phase 6: requests the server must refuse with a SCIM error body.
    pub(super) async fn error_handling(&mut self) {
        let phase = Phase::ErrorHandling;

        let name = "GET /Users/nonexistent (expect 404)";
        self.begin(name, phase);
        match self.client.get(NONEXISTENT_USER).await {
            Ok(response) => {
                let findings = self.responses().error(&response, 404);
                let evidence = self
                    .evidence(HttpMethod::Get, NONEXISTENT_USER, None)
                    .with_response(&response);
                self.record(name, phase, &findings, None, evidence);
            }
            Err(error) => self.record_client_failure(name, phase, &error),
        }

        let invalid = json!({"not": "a scim resource"});
        self.expect_rejection("POST /Users invalid body (expect 400)", &invalid)
            .await;

        let missing_user_name = json!({"schemas": [USER_URN]});
        self.expect_rejection("POST /Users missing userName (expect 400)", &missing_user_name)
            .await;
    }

    async fn expect_rejection(&mut self, name: &str, body: &Value) {
        let phase = Phase::ErrorHandling;
        self.begin(name, phase);

        let response = match self.client.post(USERS, body).await {
            Ok(response) => response,
            Err(error) => return self.record_client_failure(name, phase, &error),
        };
        // Register anything the server accepted so cleanup removes it
        if response.is_success() {
            if let Some(id) = response.resource_id() {
                self.created.record(ResourceKind::User, id);
            }
        }

        let findings = self.responses().error(&response, 400);
        let evidence = self.evidence(HttpMethod::Post, USERS, None).with_response(&response);
        self.record(name, phase, &findings, None, evidence);
    }
}

fn total_results(response: &ScimResponse) -> Option<u64> {
    response
        .json()
        .and_then(|body| body.get("totalResults").and_then(Value::as_u64))
}
