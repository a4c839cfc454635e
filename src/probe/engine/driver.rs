//! Core probe engine structure and the phase driver.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::time::Instant;

use crate::client::{Headers, HttpMethod, HttpTransport, ScimClient, ScimResponse, ScimTransport};
use crate::config::{ProbeConfig, ValidationMode};
use crate::error::{ClientError, ProbeErrorKind, ScimError, ScimResult};
use crate::probe::checks::{
    CheckLog, Evidence, Phase, ProbeCheck, RootCause, checks_from_findings,
};
use crate::probe::deviation::{DeviationPolicy, Severity};
use crate::probe::payload::PayloadFactory;
use crate::probe::registry::{CreationRegistry, TestResource};
use crate::probe::response::{Finding, ResponseValidator};
use crate::schema::{ResourceKind, SchemaRegistry};

pub(super) const SERVICE_PROVIDER_CONFIG: &str = "/ServiceProviderConfig";

/// Unit of work bounded by the run deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Stage {
    Discovery,
    Lifecycle(ResourceKind, Phase),
    RapidLifecycle,
    Search,
    ErrorHandling,
}

impl Stage {
    pub(super) const ORDER: [Stage; 8] = [
        Stage::Discovery,
        Stage::Lifecycle(ResourceKind::User, Phase::UserLifecycle),
        Stage::Lifecycle(ResourceKind::Group, Phase::GroupLifecycle),
        Stage::Lifecycle(ResourceKind::Agent, Phase::AgentLifecycle),
        Stage::Lifecycle(
            ResourceKind::AgenticApplication,
            Phase::AgenticApplicationLifecycle,
        ),
        Stage::RapidLifecycle,
        Stage::Search,
        Stage::ErrorHandling,
    ];

    pub(super) fn phase(&self) -> Phase {
        match self {
            Stage::Discovery => Phase::Discovery,
            Stage::Lifecycle(_, phase) => *phase,
            Stage::RapidLifecycle => Phase::AgentRapidLifecycle,
            Stage::Search => Phase::Search,
            Stage::ErrorHandling => Phase::ErrorHandling,
        }
    }
}

/// Result of a completed probe run.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub target: String,
    pub mode: ValidationMode,
    pub started_at: DateTime<Utc>,
    pub checks: Vec<ProbeCheck>,
    /// Test resources still on the server after cleanup
    pub orphans: Vec<TestResource>,
}

impl ProbeOutcome {
    pub fn has_failures(&self) -> bool {
        self.checks.iter().any(|check| check.status.is_failure())
    }
}

/// Conformance probe bound to one target server.
///
/// The engine owns its client and the registry of created resources; both are
/// used from a single task only. Consume it with [`ProbeEngine::run`].
pub struct ProbeEngine<T> {
    pub(super) client: ScimClient<T>,
    pub(super) config: ProbeConfig,
    pub(super) schemas: Arc<SchemaRegistry>,
    pub(super) policy: DeviationPolicy,
    pub(super) factory: PayloadFactory,
    pub(super) checks: CheckLog,
    pub(super) created: CreationRegistry,
    /// Resource types advertised by `/ResourceTypes`
    pub(super) supported: BTreeSet<ResourceKind>,
    /// Step currently awaiting the server, reported if the run deadline hits
    pub(super) in_flight: Option<(String, Phase)>,
}

impl ProbeEngine<HttpTransport> {
    /// Create an engine talking HTTP to the configured target
    pub fn connect(config: ProbeConfig) -> ScimResult<Self> {
        config.validate()?;
        let transport = HttpTransport::new(&config.client)?;
        Self::new(transport, config)
    }
}

impl<T: ScimTransport> ProbeEngine<T> {
    /// Create an engine over an arbitrary transport.
    ///
    /// # Errors
    ///
    /// Returns [`ScimError::Configuration`] if the configuration is invalid.
    pub fn new(transport: T, config: ProbeConfig) -> ScimResult<Self> {
        Self::with_schemas(transport, config, Arc::new(SchemaRegistry::new()?))
    }

    /// Create an engine sharing an already loaded schema registry
    pub fn with_schemas(
        transport: T,
        config: ProbeConfig,
        schemas: Arc<SchemaRegistry>,
    ) -> ScimResult<Self> {
        config.validate()?;

        let client = ScimClient::new(transport, &config.client);
        let policy = DeviationPolicy::new(config.mode);
        let factory = PayloadFactory::new(config.name_prefix.clone());

        Ok(Self {
            client,
            config,
            schemas,
            policy,
            factory,
            checks: CheckLog::new(),
            created: CreationRegistry::new(),
            supported: BTreeSet::new(),
            in_flight: None,
        })
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    pub fn client(&self) -> &ScimClient<T> {
        &self.client
    }

    pub fn policy(&self) -> &DeviationPolicy {
        &self.policy
    }

    pub fn checks(&self) -> &[ProbeCheck] {
        self.checks.as_slice()
    }

    /// Live test resources in creation order
    pub fn created(&self) -> &[TestResource] {
        self.created.remaining()
    }

    /// Run every phase, then clean up.
    ///
    /// # Errors
    ///
    /// * [`ScimError::ConsentRequired`] if side effects were not acknowledged;
    ///   no request is sent in that case
    /// * [`ScimError::Transport`] if the target cannot be reached at all
    pub async fn run(mut self) -> ScimResult<ProbeOutcome> {
        let target = self.config.client.display_target();
        if !self.config.accept_side_effects {
            return Err(ScimError::consent_required(self.consent_message(&target)));
        }

        let started_at = Utc::now();
        info!(
            "Probing {} in {} mode (deviation table v{})",
            target,
            self.config.mode,
            self.policy.version()
        );

        let preflight = match self.client.get(SERVICE_PROVIDER_CONFIG).await {
            Err(error @ (ClientError::Transport { .. } | ClientError::Timeout { .. })) => {
                warn!("Target unreachable: {}", error);
                return Err(error.into());
            }
            other => other,
        };

        let deadline = self.config.run_timeout.map(|timeout| Instant::now() + timeout);
        let mut preflight = Some(preflight);
        for (index, stage) in Stage::ORDER.iter().enumerate() {
            let work = self.run_stage(*stage, preflight.take());
            let completed = match deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, work).await.is_ok(),
                None => {
                    work.await;
                    true
                }
            };
            if !completed {
                self.deadline_exceeded(*stage, &Stage::ORDER[index + 1..]);
                break;
            }
        }

        self.cleanup().await;

        let outcome = ProbeOutcome {
            target,
            mode: self.config.mode,
            started_at,
            orphans: self.created.remaining().to_vec(),
            checks: self.checks.into_vec(),
        };
        info!(
            "Probe finished: {} checks, {} orphaned resources",
            outcome.checks.len(),
            outcome.orphans.len()
        );
        Ok(outcome)
    }

    async fn run_stage(
        &mut self,
        stage: Stage,
        preflight: Option<Result<ScimResponse, ClientError>>,
    ) {
        info!("{}", stage.phase());
        self.in_flight = None;
        match stage {
            Stage::Discovery => self.discovery(preflight).await,
            Stage::Lifecycle(kind, phase) => self.lifecycle(kind, phase).await,
            Stage::RapidLifecycle => self.rapid_lifecycle().await,
            Stage::Search => self.search().await,
            Stage::ErrorHandling => self.error_handling().await,
        }
    }

    fn deadline_exceeded(&mut self, stage: Stage, remaining: &[Stage]) {
        let (name, phase) = self
            .in_flight
            .take()
            .unwrap_or_else(|| (stage.phase().label().to_string(), stage.phase()));
        let timeout = self.config.run_timeout.unwrap_or_default();
        warn!("Run deadline of {:?} exceeded during '{}'", timeout, name);

        self.checks.push(
            ProbeCheck::fail(name, phase)
                .with_message(format!(
                    "Run deadline of {:?} exceeded; remaining phases skipped",
                    timeout
                ))
                .with_kind(ProbeErrorKind::Timeout)
                .with_cause(RootCause::Timeout),
        );
        for stage in remaining {
            self.checks.push(
                ProbeCheck::skip(stage.phase().label(), stage.phase())
                    .with_message("Skipped: run deadline exceeded"),
            );
        }
    }

    fn consent_message(&self, target: &str) -> String {
        format!(
            "The probe creates, modifies and deletes test resources on {}. \
             Every test resource name starts with '{}'. \
             Acknowledge side effects (--i-accept-side-effects) to proceed.",
            target, self.config.name_prefix
        )
    }

    /// Mark the step about to wait on the server
    pub(super) fn begin(&mut self, name: &str, phase: Phase) {
        debug!("{}: {}", phase, name);
        self.in_flight = Some((name.to_string(), phase));
    }

    pub(super) fn responses(&self) -> ResponseValidator<'_> {
        ResponseValidator::new(self.policy, &self.schemas)
    }

    /// Request facts for a check, credentials redacted
    pub(super) fn evidence(
        &self,
        method: HttpMethod,
        path: &str,
        extra: Option<&Headers>,
    ) -> Evidence {
        let headers = match extra {
            Some(extra) => self.client.default_headers().merged(extra),
            None => self.client.default_headers(),
        };
        Evidence {
            method,
            url: self.client.url(path),
            status: None,
            content_type: None,
            request_headers: headers.redacted(),
        }
    }

    /// Record the checks for a validated response
    pub(super) fn record(
        &mut self,
        name: &str,
        phase: Phase,
        findings: &[Finding],
        pass_message: Option<&str>,
        evidence: Evidence,
    ) {
        for check in checks_from_findings(name, phase, findings, pass_message) {
            self.checks.push(check.with_evidence(evidence.clone()));
        }
    }

    pub(super) fn record_client_failure(&mut self, name: &str, phase: Phase, error: &ClientError) {
        warn!("{} failed: {}", name, error);
        self.checks
            .push(ProbeCheck::client_failure(name, phase, error));
    }

    /// A check graded by the deviation policy for `rule`
    pub(super) fn deviation_check(
        &self,
        name: &str,
        phase: Phase,
        rule: &'static str,
        message: impl Into<String>,
    ) -> ProbeCheck {
        let severity = self.policy.severity(rule);
        let check = match severity {
            Severity::Fail => ProbeCheck::fail(name, phase),
            Severity::Warn => ProbeCheck::warn(name, phase),
        };
        check
            .with_message(message)
            .with_kind(severity.probe_kind())
            .with_cause(RootCause::Rule(rule))
    }

    /// A failing check for a status other than the one expected
    pub(super) fn status_check(name: &str, phase: Phase, expected: &str, actual: u16) -> ProbeCheck {
        ProbeCheck::fail(name, phase)
            .with_message(format!("Expected {}, got {}", expected, actual))
            .with_kind(ProbeErrorKind::UnexpectedStatus)
            .with_cause(RootCause::UnexpectedStatus(actual))
    }

    /// Whether any check recorded since `mark` failed
    pub(super) fn failed_since(&self, mark: usize) -> bool {
        self.checks.as_slice()[mark..]
            .iter()
            .any(|check| check.status.is_failure())
    }
}
