//! Probe check records.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use super::response::Finding;
use crate::client::{HttpMethod, ScimResponse};
use crate::error::{ClientError, ProbeErrorKind};
use crate::schema::ResourceKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
    Skip,
    /// The check could not be carried out (transport failure)
    Error,
}

impl CheckStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Fail | Self::Error)
    }

    /// Fixed-width label used by the terminal report
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Warn => "WARN",
            Self::Fail => "FAIL",
            Self::Skip => "SKIP",
            Self::Error => "ERR ",
        }
    }
}

/// Probe phases in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Discovery,
    UserLifecycle,
    GroupLifecycle,
    AgentLifecycle,
    AgenticApplicationLifecycle,
    AgentRapidLifecycle,
    Search,
    ErrorHandling,
    Cleanup,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Discovery => "Phase 1: Discovery",
            Self::UserLifecycle => "Phase 2: User CRUD Lifecycle",
            Self::GroupLifecycle => "Phase 3: Group CRUD Lifecycle",
            Self::AgentLifecycle => "Phase 4: Agent CRUD Lifecycle",
            Self::AgenticApplicationLifecycle => "Phase 4b: AgenticApplication CRUD Lifecycle",
            Self::AgentRapidLifecycle => "Phase 4c: Agent Rapid Lifecycle",
            Self::Search => "Phase 5: Search",
            Self::ErrorHandling => "Phase 6: Error Handling",
            Self::Cleanup => "Phase 7: Cleanup",
        }
    }

    pub fn lifecycle(kind: ResourceKind) -> Option<Self> {
        match kind {
            ResourceKind::User => Some(Self::UserLifecycle),
            ResourceKind::Group => Some(Self::GroupLifecycle),
            ResourceKind::Agent => Some(Self::AgentLifecycle),
            ResourceKind::AgenticApplication => Some(Self::AgenticApplicationLifecycle),
            ResourceKind::Unknown => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Root-cause signature used to group failing checks into issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RootCause {
    /// A discovery endpoint is missing or broken
    Discovery,
    /// A deviation rule id, see [`super::deviation`]
    Rule(&'static str),
    UnexpectedStatus(u16),
    RateLimit,
    Timeout,
    Transport,
    /// A write was acknowledged but not reflected on read-back
    NotPersisted,
}

impl From<&ClientError> for RootCause {
    fn from(error: &ClientError) -> Self {
        match error {
            ClientError::Timeout { .. } => Self::Timeout,
            ClientError::RateLimitExhausted { .. } => Self::RateLimit,
            ClientError::Transport { .. } => Self::Transport,
        }
    }
}

/// Request/response facts attached to a check. Credentials are redacted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evidence {
    pub method: HttpMethod,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub request_headers: BTreeMap<String, String>,
}

impl Evidence {
    pub fn with_response(mut self, response: &ScimResponse) -> Self {
        self.status = Some(response.status);
        self.content_type = response.content_type().map(str::to_string);
        self
    }
}

/// One probe result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeCheck {
    pub name: String,
    pub phase: Phase,
    pub status: CheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ProbeErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<RootCause>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<Evidence>,
}

impl ProbeCheck {
    pub fn new(name: impl Into<String>, phase: Phase, status: CheckStatus) -> Self {
        Self {
            name: name.into(),
            phase,
            status,
            message: None,
            kind: None,
            cause: None,
            evidence: None,
        }
    }

    pub fn pass(name: impl Into<String>, phase: Phase) -> Self {
        Self::new(name, phase, CheckStatus::Pass)
    }

    pub fn warn(name: impl Into<String>, phase: Phase) -> Self {
        Self::new(name, phase, CheckStatus::Warn)
    }

    pub fn fail(name: impl Into<String>, phase: Phase) -> Self {
        Self::new(name, phase, CheckStatus::Fail)
    }

    pub fn skip(name: impl Into<String>, phase: Phase) -> Self {
        Self::new(name, phase, CheckStatus::Skip)
    }

    pub fn error(name: impl Into<String>, phase: Phase) -> Self {
        Self::new(name, phase, CheckStatus::Error)
    }

    /// Record a client failure: timeouts and exhausted rate limits fail, other
    /// transport problems are errors.
    pub fn client_failure(name: impl Into<String>, phase: Phase, error: &ClientError) -> Self {
        let check = match error {
            ClientError::Transport { .. } => Self::error(name, phase),
            _ => Self::fail(name, phase),
        };
        check
            .with_message(error.to_string())
            .with_kind(ProbeErrorKind::from(error))
            .with_cause(RootCause::from(error))
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_kind(mut self, kind: ProbeErrorKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_cause(mut self, cause: RootCause) -> Self {
        self.cause = Some(cause);
        self
    }

    pub fn with_evidence(mut self, evidence: Evidence) -> Self {
        self.evidence = Some(evidence);
        self
    }
}

/// Append-only, execution-ordered list of checks.
#[derive(Debug, Clone, Default)]
pub struct CheckLog {
    checks: Vec<ProbeCheck>,
}

impl CheckLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, check: ProbeCheck) {
        self.checks.push(check);
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    pub fn as_slice(&self) -> &[ProbeCheck] {
        &self.checks
    }

    pub fn into_vec(self) -> Vec<ProbeCheck> {
        self.checks
    }
}

impl Extend<ProbeCheck> for CheckLog {
    fn extend<I: IntoIterator<Item = ProbeCheck>>(&mut self, iter: I) {
        self.checks.extend(iter);
    }
}

/// Turn response findings into checks named `name`.
///
/// The first check passes unless a finding fails, in which case it carries the
/// failing messages and the cause of the first failure. Each warning finding
/// becomes an extra `warn` check under the same name.
pub fn checks_from_findings(
    name: &str,
    phase: Phase,
    findings: &[Finding],
    pass_message: Option<&str>,
) -> Vec<ProbeCheck> {
    let (failures, warnings): (Vec<&Finding>, Vec<&Finding>) =
        findings.iter().partition(|finding| finding.is_failure());

    let main = match failures.first() {
        Some(first) => ProbeCheck::fail(name, phase)
            .with_message(
                failures
                    .iter()
                    .map(|finding| finding.describe())
                    .collect::<Vec<_>>()
                    .join("; "),
            )
            .with_kind(first.kind)
            .with_cause(first.cause),
        None => {
            let check = ProbeCheck::pass(name, phase);
            match pass_message {
                Some(message) => check.with_message(message),
                None => check,
            }
        }
    };

    let mut checks = vec![main];
    checks.extend(warnings.into_iter().map(|finding| {
        ProbeCheck::warn(name, phase)
            .with_message(finding.describe())
            .with_kind(finding.kind)
            .with_cause(finding.cause)
    }));
    checks
}
