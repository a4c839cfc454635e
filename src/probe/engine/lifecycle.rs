//! CRUD lifecycle of one resource type.
//!
//! `POST → GET → PUT → GET → PATCH → GET → [Group: PATCH add member, PATCH
//! remove members] → DELETE → GET (expect 404)`. A failing step skips the rest
//! of the sequence.

use log::{info, warn};
use serde_json::{Value, json};

use super::driver::ProbeEngine;
use crate::client::{
    Headers, HttpMethod, JSON_CONTENT_TYPE, SCIM_CONTENT_TYPE, ScimResponse, ScimTransport, item_path,
};
use crate::error::ProbeErrorKind;
use crate::probe::checks::{Phase, ProbeCheck, RootCause};
use crate::probe::create::{CreateAttempt, CreateOutcome};
use crate::probe::deviation::CONTENT_TYPE_REJECTION;
use crate::probe::payload::PayloadFactory;
use crate::schema::ResourceKind;
use crate::validator::PatchOperation;

/// One step of a resource lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Create,
    Read,
    Replace,
    VerifyReplace,
    Patch,
    VerifyPatch,
    AddMember,
    RemoveMembers,
    Delete,
    VerifyDelete,
}

impl Step {
    const STANDARD: [Step; 8] = [
        Step::Create,
        Step::Read,
        Step::Replace,
        Step::VerifyReplace,
        Step::Patch,
        Step::VerifyPatch,
        Step::Delete,
        Step::VerifyDelete,
    ];

    const GROUP: [Step; 10] = [
        Step::Create,
        Step::Read,
        Step::Replace,
        Step::VerifyReplace,
        Step::Patch,
        Step::VerifyPatch,
        Step::AddMember,
        Step::RemoveMembers,
        Step::Delete,
        Step::VerifyDelete,
    ];

    pub fn sequence(kind: ResourceKind) -> &'static [Step] {
        match kind {
            ResourceKind::Group => &Self::GROUP,
            _ => &Self::STANDARD,
        }
    }

    /// Check name, e.g. `GET /Users/{id} after PUT`
    pub fn name(&self, kind: ResourceKind) -> String {
        let endpoint = kind.endpoint();
        match self {
            Step::Create => format!("POST {}", endpoint),
            Step::Read => format!("GET {}/{{id}}", endpoint),
            Step::Replace => format!("PUT {}/{{id}}", endpoint),
            Step::VerifyReplace => format!("GET {}/{{id}} after PUT", endpoint),
            Step::Patch => format!("PATCH {}/{{id}}", endpoint),
            Step::VerifyPatch => format!("GET {}/{{id}} after PATCH", endpoint),
            Step::AddMember => format!("PATCH {}/{{id}} add member", endpoint),
            Step::RemoveMembers => format!("PATCH {}/{{id}} remove members", endpoint),
            Step::Delete => format!("DELETE {}/{{id}}", endpoint),
            Step::VerifyDelete => format!("GET {}/{{id}} after DELETE (expect 404)", endpoint),
        }
    }
}

/// What earlier steps learned about the resource under test.
#[derive(Debug, Default)]
struct Subject {
    id: Option<String>,
    representation: Option<Value>,
    display_name: Option<String>,
    /// User added to and removed from a Group
    member: Option<String>,
}

impl Subject {
    fn path(&self, kind: ResourceKind) -> String {
        item_path(kind.endpoint(), self.id.as_deref().unwrap_or_default())
    }

    /// First 8 characters of the id, used in replacement names
    fn short_id(&self) -> String {
        self.id
            .as_deref()
            .unwrap_or_default()
            .chars()
            .take(8)
            .collect()
    }
}

enum Flow {
    Next,
    /// Skip the remaining steps with this reason
    Stop(String),
}

impl<T: ScimTransport> ProbeEngine<T> {
    /// Why the lifecycle of `kind` does not run, if it does not
    pub(super) fn lifecycle_skip_reason(&self, kind: ResourceKind) -> Option<String> {
        if !self.config.includes(kind) {
            Some(format!("Skipped: {} excluded by resource filter", kind))
        } else if !self.supported.contains(&kind) {
            Some(format!("Skipped: {} not advertised by /ResourceTypes", kind))
        } else {
            None
        }
    }

    pub(super) async fn lifecycle(&mut self, kind: ResourceKind, phase: Phase) {
        let steps = Step::sequence(kind);

        if let Some(reason) = self.lifecycle_skip_reason(kind) {
            info!("{}: {}", phase, reason);
            for step in steps {
                self.checks
                    .push(ProbeCheck::skip(step.name(kind), phase).with_message(reason.clone()));
            }
            return;
        }

        let mut subject = Subject::default();
        if kind == ResourceKind::Group {
            subject.member = self.member_fixture(phase).await;
        }

        for (index, step) in steps.iter().enumerate() {
            let name = step.name(kind);
            self.begin(&name, phase);
            let mark = self.checks.len();

            let reason = match self.run_step(kind, phase, *step, &name, &mut subject).await {
                Flow::Stop(reason) => Some(reason),
                Flow::Next if self.failed_since(mark) => {
                    Some(format!("Skipped: depends on failed step '{}'", name))
                }
                Flow::Next => None,
            };

            if let Some(reason) = reason {
                for rest in &steps[index + 1..] {
                    self.checks
                        .push(ProbeCheck::skip(rest.name(kind), phase).with_message(reason.clone()));
                }
                break;
            }
        }
    }

    async fn run_step(
        &mut self,
        kind: ResourceKind,
        phase: Phase,
        step: Step,
        name: &str,
        subject: &mut Subject,
    ) -> Flow {
        match step {
            Step::Create => self.create(kind, phase, name, subject).await,
            Step::Read => {
                let path = subject.path(kind);
                self.expect_resource(HttpMethod::Get, &path, None, 200, kind, name, phase)
                    .await;
                Flow::Next
            }
            Step::Replace => {
                let display_name = format!("Updated-{}", subject.short_id());
                let mut body = subject.representation.clone().unwrap_or_else(|| json!({}));
                if let Some(object) = body.as_object_mut() {
                    object.remove("meta");
                    object.insert("displayName".into(), json!(display_name));
                }
                subject.display_name = Some(display_name);

                let path = subject.path(kind);
                self.expect_resource(HttpMethod::Put, &path, Some(&body), 200, kind, name, phase)
                    .await;
                Flow::Next
            }
            Step::VerifyReplace => {
                self.verify_replace(kind, phase, name, subject).await;
                Flow::Next
            }
            Step::Patch => {
                let operation = match kind {
                    ResourceKind::Group => PatchOperation::replace(
                        "displayName",
                        json!(format!("Patched-{}", subject.short_id())),
                    ),
                    _ => PatchOperation::replace("active", json!(false)),
                };
                let body = PayloadFactory::patch(vec![operation]);
                let path = subject.path(kind);
                self.patch_resource(kind, phase, name, &path, &body).await;
                Flow::Next
            }
            Step::VerifyPatch => {
                self.verify_patch(kind, phase, name, subject).await;
                Flow::Next
            }
            Step::AddMember | Step::RemoveMembers => {
                let Some(member) = subject.member.clone() else {
                    self.checks.push(
                        ProbeCheck::skip(name, phase)
                            .with_message("Skipped: no member User could be created"),
                    );
                    return Flow::Next;
                };
                let operation = match step {
                    Step::AddMember => PatchOperation::add("members", json!([{ "value": member }])),
                    _ => PatchOperation::remove("members"),
                };
                let body = PayloadFactory::patch(vec![operation]);
                let path = subject.path(kind);
                self.membership_change(phase, name, &path, &body).await;
                Flow::Next
            }
            Step::Delete => {
                self.delete_resource(kind, phase, name, subject).await;
                Flow::Next
            }
            Step::VerifyDelete => {
                self.verify_delete(kind, phase, name, subject).await;
                Flow::Next
            }
        }
    }

    async fn create(
        &mut self,
        kind: ResourceKind,
        phase: Phase,
        name: &str,
        subject: &mut Subject,
    ) -> Flow {
        let Some(payload) = self.factory.for_kind(kind) else {
            return Flow::Stop(format!("Skipped: no payload for {}", kind));
        };
        let endpoint = kind.endpoint();
        let mark = self.checks.len();

        let outcome = CreateAttempt::new(
            &self.client,
            kind,
            &payload,
            self.config.transient_retry_delay,
        )
        .run(&mut self.created)
        .await;

        match outcome {
            CreateOutcome::Response(response) => {
                self.created_response(kind, phase, name, &response, subject);
            }
            CreateOutcome::Recovered { retried } => {
                let evidence = self
                    .evidence(HttpMethod::Post, endpoint, None)
                    .with_response(&retried);
                self.checks.push(
                    ProbeCheck::warn(name, phase)
                        .with_message(format!(
                            "Server returned 500 on first attempt but succeeded on retry after {:.1}s; \
                             the server may be unstable under load",
                            self.config.transient_retry_delay.as_secs_f64()
                        ))
                        .with_kind(ProbeErrorKind::TransientInstability)
                        .with_evidence(evidence),
                );
                self.created_response(kind, phase, name, &retried, subject);
            }
            CreateOutcome::ContentTypeRejection {
                diagnostic_id,
                deleted,
            } => {
                let mut message = format!(
                    "Server rejected Content-Type: {} with 500 but accepted {}; \
                     server MUST accept {} per RFC 7644 §8.2",
                    SCIM_CONTENT_TYPE, JSON_CONTENT_TYPE, SCIM_CONTENT_TYPE
                );
                if let (Some(id), false) = (&diagnostic_id, deleted) {
                    message.push_str(&format!(
                        "; diagnostic resource {}/{} left for cleanup",
                        endpoint, id
                    ));
                }
                let headers = Headers::new().with("Content-Type", JSON_CONTENT_TYPE);
                let evidence = self.evidence(HttpMethod::Post, endpoint, Some(&headers));
                self.checks.push(
                    ProbeCheck::fail(name, phase)
                        .with_message(message)
                        .with_kind(ProbeErrorKind::ContentTypeRejection)
                        .with_cause(RootCause::Rule(CONTENT_TYPE_REJECTION))
                        .with_evidence(evidence),
                );
            }
            CreateOutcome::ServerError(response) => {
                let findings = self.responses().resource(&response, 201, kind);
                let evidence = self
                    .evidence(HttpMethod::Post, endpoint, None)
                    .with_response(&response);
                self.record(name, phase, &findings, None, evidence);
            }
            CreateOutcome::ClientFailure(error) => {
                self.record_client_failure(name, phase, &error);
            }
        }

        if subject.id.is_none() && !self.failed_since(mark) {
            return Flow::Stop("Skipped: no id returned from POST".to_string());
        }
        Flow::Next
    }

    fn created_response(
        &mut self,
        kind: ResourceKind,
        phase: Phase,
        name: &str,
        response: &ScimResponse,
        subject: &mut Subject,
    ) {
        if response.is_success() {
            if let Some(id) = response.resource_id() {
                self.created.record(kind, id.clone());
                subject.id = Some(id);
                subject.representation = response.json();
            }
        }

        let findings = self.responses().resource(response, 201, kind);
        let evidence = self
            .evidence(HttpMethod::Post, kind.endpoint(), None)
            .with_response(response);
        self.record(name, phase, &findings, None, evidence);
    }

    /// Send a request and validate the single-resource response
    #[allow(clippy::too_many_arguments)]
    async fn expect_resource(
        &mut self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
        expected_status: u16,
        kind: ResourceKind,
        name: &str,
        phase: Phase,
    ) {
        match self.client.execute(method, path, body, None).await {
            Ok(response) => {
                let findings = self.responses().resource(&response, expected_status, kind);
                let evidence = self.evidence(method, path, None).with_response(&response);
                self.record(name, phase, &findings, None, evidence);
            }
            Err(error) => self.record_client_failure(name, phase, &error),
        }
    }

    async fn verify_replace(&mut self, kind: ResourceKind, phase: Phase, name: &str, subject: &Subject) {
        let path = subject.path(kind);
        let response = match self.client.get(&path).await {
            Ok(response) => response,
            Err(error) => return self.record_client_failure(name, phase, &error),
        };
        if response.status != 200 {
            let check = Self::status_check(name, phase, "200", response.status);
            self.checks.push(check);
            return;
        }

        let expected = subject.display_name.as_deref().unwrap_or_default();
        let actual = response
            .json()
            .and_then(|body| body.get("displayName").and_then(Value::as_str).map(str::to_string));
        let check = if actual.as_deref() == Some(expected) {
            ProbeCheck::pass(name, phase).with_message(format!("displayName='{}' confirmed", expected))
        } else {
            ProbeCheck::fail(name, phase)
                .with_message(format!(
                    "Expected displayName='{}', got '{}'",
                    expected,
                    actual.unwrap_or_default()
                ))
                .with_kind(ProbeErrorKind::UnexpectedStatus)
                .with_cause(RootCause::NotPersisted)
        };
        let evidence = self.evidence(HttpMethod::Get, &path, None).with_response(&response);
        self.checks.push(check.with_evidence(evidence));
    }

    async fn patch_resource(&mut self, kind: ResourceKind, phase: Phase, name: &str, path: &str, body: &Value) {
        let response = match self.client.patch(path, body).await {
            Ok(response) => response,
            Err(error) => return self.record_client_failure(name, phase, &error),
        };
        let evidence = self
            .evidence(HttpMethod::Patch, path, None)
            .with_response(&response);

        if response.status == 204 {
            self.checks.push(
                ProbeCheck::pass(name, phase)
                    .with_message("204 No Content")
                    .with_evidence(evidence),
            );
        } else {
            let findings = self.responses().resource(&response, 200, kind);
            self.record(name, phase, &findings, None, evidence);
        }
    }

    async fn verify_patch(&mut self, kind: ResourceKind, phase: Phase, name: &str, subject: &Subject) {
        let path = subject.path(kind);
        let response = match self.client.get(&path).await {
            Ok(response) => response,
            Err(error) => return self.record_client_failure(name, phase, &error),
        };
        let evidence = self.evidence(HttpMethod::Get, &path, None).with_response(&response);

        let check = if response.status != 200 {
            Self::status_check(name, phase, "200", response.status)
        } else if kind == ResourceKind::Group {
            ProbeCheck::pass(name, phase).with_message("200 OK confirmed")
        } else {
            let active = response
                .json()
                .and_then(|body| body.get("active").cloned());
            match active {
                Some(Value::Bool(false)) => {
                    ProbeCheck::pass(name, phase).with_message("active=false confirmed")
                }
                other => ProbeCheck::fail(name, phase)
                    .with_message(format!(
                        "Expected active=false, got {}",
                        other.map(|value| value.to_string()).unwrap_or_else(|| "nothing".into())
                    ))
                    .with_kind(ProbeErrorKind::UnexpectedStatus)
                    .with_cause(RootCause::NotPersisted),
            }
        };
        self.checks.push(check.with_evidence(evidence));
    }

    async fn membership_change(&mut self, phase: Phase, name: &str, path: &str, body: &Value) {
        let response = match self.client.patch(path, body).await {
            Ok(response) => response,
            Err(error) => return self.record_client_failure(name, phase, &error),
        };
        let check = match response.status {
            200 | 204 => ProbeCheck::pass(name, phase).with_message(format!("{} accepted", response.status)),
            status => Self::status_check(name, phase, "200 or 204", status),
        };
        let evidence = self
            .evidence(HttpMethod::Patch, path, None)
            .with_response(&response);
        self.checks.push(check.with_evidence(evidence));
    }

    async fn delete_resource(&mut self, kind: ResourceKind, phase: Phase, name: &str, subject: &Subject) {
        let path = subject.path(kind);
        let response = match self.client.delete(&path).await {
            Ok(response) => response,
            Err(error) => return self.record_client_failure(name, phase, &error),
        };
        if response.is_success() {
            if let Some(id) = subject.id.as_deref() {
                self.created.confirm_deleted(kind, id);
            }
        }
        let findings = self.responses().delete(&response);
        let evidence = self
            .evidence(HttpMethod::Delete, &path, None)
            .with_response(&response);
        self.record(name, phase, &findings, Some("204 No Content"), evidence);
    }

    async fn verify_delete(&mut self, kind: ResourceKind, phase: Phase, name: &str, subject: &Subject) {
        let path = subject.path(kind);
        let response = match self.client.get(&path).await {
            Ok(response) => response,
            Err(error) => return self.record_client_failure(name, phase, &error),
        };
        let check = match response.status {
            404 => ProbeCheck::pass(name, phase).with_message("404 confirmed; resource no longer exists"),
            status => Self::status_check(name, phase, "404", status),
        };
        let evidence = self.evidence(HttpMethod::Get, &path, None).with_response(&response);
        self.checks.push(check.with_evidence(evidence));
    }

    /// Create the User that the Group lifecycle adds as a member
    async fn member_fixture(&mut self, phase: Phase) -> Option<String> {
        if !self.supported.contains(&ResourceKind::User) {
            return None;
        }
        let name = "POST /Users (group member fixture)";
        self.begin(name, phase);

        let payload = self.factory.user();
        let endpoint = ResourceKind::User.endpoint();
        match self.client.post(endpoint, &payload).await {
            Ok(response) if response.is_success() => {
                let id = response.resource_id()?;
                self.created.record(ResourceKind::User, id.clone());
                self.checks.push(
                    ProbeCheck::pass(name, phase).with_message(format!("member {} created", id)),
                );
                Some(id)
            }
            Ok(response) => {
                warn!("Group member fixture not created ({})", response.status);
                self.checks.push(
                    ProbeCheck::warn(name, phase)
                        .with_message(format!(
                            "Expected 201, got {}; membership steps will be skipped",
                            response.status
                        ))
                        .with_kind(ProbeErrorKind::UnexpectedStatus),
                );
                None
            }
            Err(error) => {
                warn!("Group member fixture not created: {}", error);
                self.checks.push(
                    ProbeCheck::warn(name, phase)
                        .with_message(format!("{}; membership steps will be skipped", error))
                        .with_kind(ProbeErrorKind::from(&error)),
                );
                None
            }
        }
    }
}
