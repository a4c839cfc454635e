//! Non-conformant and unreliable servers: deviations, retries and deadlines.

use std::time::Duration;
use tokio::time::Instant;

use scim_conformance::client::{HttpMethod, JSON_CONTENT_TYPE, SCIM_CONTENT_TYPE, ScimClient};
use scim_conformance::config::ValidationMode;
use scim_conformance::probe::{Phase, RootCause, deviation};
use scim_conformance::schema::ResourceKind;
use scim_conformance::{CheckStatus, ClientError, ProbeErrorKind};

use crate::assert_check_status;
use crate::common::{
    MockBehavior, MockScimServer, checks_in, find_check, probe_config, run_probe, statuses,
};

#[tokio::test(start_paused = true)]
async fn test_content_type_rejection_is_diagnosed() {
    let server = MockScimServer::with_behavior(MockBehavior {
        reject_scim_content_type: true,
        ..MockBehavior::default()
    });
    let config = probe_config(ValidationMode::Compat)
        .with_resource_filter(ResourceKind::Agent)
        .build()
        .unwrap();
    let outcome = run_probe(&server, config).await;

    let create = find_check(&outcome, "POST /Agents");
    assert_eq!(create.status, CheckStatus::Fail);
    assert_eq!(create.kind, Some(ProbeErrorKind::ContentTypeRejection));
    assert_eq!(create.cause, Some(RootCause::Rule(deviation::CONTENT_TYPE_REJECTION)));
    assert!(create.message.as_deref().unwrap_or_default().contains("RFC 7644 §8.2"));

    let rest: Vec<_> = checks_in(&outcome, Phase::AgentLifecycle).into_iter().skip(1).collect();
    assert_eq!(rest.len(), 7);
    assert!(rest.iter().all(|check| check.status == CheckStatus::Skip));
    assert_eq!(
        rest[0].message.as_deref(),
        Some("Skipped: depends on failed step 'POST /Agents'")
    );

    // Two conformant attempts, one diagnostic attempt, then the diagnostic delete
    let requests = server.requests().await;
    let agent_requests: Vec<_> = requests
        .iter()
        .filter(|r| r.url.contains("/Agents"))
        .take(4)
        .collect();
    let content_types: Vec<Option<&str>> = agent_requests
        .iter()
        .take(3)
        .map(|r| r.headers.get("Content-Type"))
        .collect();
    assert_eq!(
        content_types,
        vec![Some(SCIM_CONTENT_TYPE), Some(SCIM_CONTENT_TYPE), Some(JSON_CONTENT_TYPE)]
    );
    assert_eq!(agent_requests[3].method, HttpMethod::Delete);
    assert_eq!(server.count("/Agents").await, 0);
    assert!(outcome.orphans.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_transient_500_recovers_with_warning() {
    let server = MockScimServer::with_behavior(MockBehavior {
        transient_create_failures: 1,
        ..MockBehavior::default()
    });
    let config = probe_config(ValidationMode::Strict)
        .with_resource_filter(ResourceKind::Agent)
        .build()
        .unwrap();

    let started = Instant::now();
    let outcome = run_probe(&server, config).await;
    assert!(started.elapsed() >= Duration::from_secs(2));

    let create = find_check(&outcome, "POST /Agents");
    assert_eq!(create.status, CheckStatus::Warn);
    assert_eq!(create.kind, Some(ProbeErrorKind::TransientInstability));
    assert_check_status!(outcome, "DELETE /Agents/{id}", Pass);
    assert_check_status!(outcome, "GET /Agents/{id} after DELETE (expect 404)", Pass);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_exhaustion_honors_retry_after() {
    let server = MockScimServer::with_behavior(MockBehavior {
        throttle_count: usize::MAX,
        retry_after: Some("2"),
        ..MockBehavior::default()
    });
    let config = probe_config(ValidationMode::Strict).build().unwrap();
    let client = ScimClient::new(server.clone(), &config.client);

    let started = Instant::now();
    let error = client.get("/Users").await.unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(error, ClientError::RateLimitExhausted { attempts: 4, .. }), "{:?}", error);
    assert!(elapsed >= Duration::from_secs(6), "{:?}", elapsed);
    assert!(elapsed < Duration::from_secs(7), "{:?}", elapsed);
    assert_eq!(server.requests().await.len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_recovers() {
    let server = MockScimServer::with_behavior(MockBehavior {
        throttle_count: 2,
        retry_after: Some("1"),
        ..MockBehavior::default()
    });
    let config = probe_config(ValidationMode::Strict).build().unwrap();
    let client = ScimClient::new(server.clone(), &config.client);

    let response = tokio_test::assert_ok!(client.get("/Users").await);
    assert_eq!(response.status, 200);
    assert_eq!(server.requests().await.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_discovery_is_recorded() {
    let server = MockScimServer::with_behavior(MockBehavior {
        throttle_count: 4,
        ..MockBehavior::default()
    });
    let config = probe_config(ValidationMode::Strict)
        .with_resource_filter(ResourceKind::User)
        .build()
        .unwrap();
    let outcome = run_probe(&server, config).await;

    let preflight = find_check(&outcome, "GET /ServiceProviderConfig");
    assert_eq!(preflight.status, CheckStatus::Fail);
    assert_eq!(preflight.kind, Some(ProbeErrorKind::RateLimitExhausted));
    // The throttle is over by the time the remaining checks run
    assert_check_status!(outcome, "GET /Schemas", Pass);
    assert_check_status!(outcome, "POST /Users", Pass);
}

#[tokio::test]
async fn test_content_type_mode_sensitivity() {
    let behavior = MockBehavior {
        content_type_json: true,
        ..MockBehavior::default()
    };

    let strict = run_probe(
        &MockScimServer::with_behavior(behavior.clone()),
        probe_config(ValidationMode::Strict).build().unwrap(),
    )
    .await;
    let compat = run_probe(
        &MockScimServer::with_behavior(behavior),
        probe_config(ValidationMode::Compat).build().unwrap(),
    )
    .await;

    // Tolerated deviations are reported as a warning next to the passing check
    let name = "GET /ServiceProviderConfig";
    assert_eq!(statuses(&strict, name), vec![CheckStatus::Fail]);
    assert_eq!(statuses(&compat, name), vec![CheckStatus::Pass, CheckStatus::Warn]);

    let warning = compat
        .checks
        .iter()
        .find(|check| check.name == name && check.status == CheckStatus::Warn)
        .unwrap();
    assert_eq!(warning.cause, Some(RootCause::Rule(deviation::CONTENT_TYPE_MISMATCH)));
    assert_eq!(warning.kind, Some(ProbeErrorKind::DeviationWarning));

    assert!(strict.has_failures());
    assert!(!compat.has_failures());
    assert!(statuses(&compat, "POST /Users").contains(&CheckStatus::Warn));
}

#[tokio::test]
async fn test_rejected_filters_are_tolerated_in_compat() {
    let server = MockScimServer::with_behavior(MockBehavior {
        reject_filters: true,
        ..MockBehavior::default()
    });
    let config = probe_config(ValidationMode::Compat).build().unwrap();
    let outcome = run_probe(&server, config).await;

    let filter = find_check(&outcome, "GET /Users?filter (no match)");
    assert_eq!(filter.status, CheckStatus::Warn);
    assert_eq!(filter.cause, Some(RootCause::Rule(deviation::FILTER_UNSUPPORTED)));
    assert!(!outcome.has_failures());
}

#[tokio::test]
async fn test_write_only_leak_always_fails() {
    let server = MockScimServer::with_behavior(MockBehavior {
        password_in_response: true,
        ..MockBehavior::default()
    });
    let config = probe_config(ValidationMode::Compat)
        .with_resource_filter(ResourceKind::User)
        .build()
        .unwrap();
    let outcome = run_probe(&server, config).await;

    let create = find_check(&outcome, "POST /Users");
    assert_eq!(create.status, CheckStatus::Fail);
    assert_eq!(create.cause, Some(RootCause::Rule(deviation::WRITE_ONLY_RETURNED)));
    assert!(create.message.as_deref().unwrap_or_default().contains("password"));
}

#[tokio::test]
async fn test_missing_meta_attributes_fail_in_both_modes() {
    for mode in [ValidationMode::Strict, ValidationMode::Compat] {
        let server = MockScimServer::with_behavior(MockBehavior {
            missing_meta_fields: true,
            ..MockBehavior::default()
        });
        let config = probe_config(mode)
            .with_resource_filter(ResourceKind::Group)
            .build()
            .unwrap();
        let outcome = run_probe(&server, config).await;

        let create = find_check(&outcome, "POST /Groups");
        assert_eq!(create.status, CheckStatus::Fail, "{} mode", mode);
        let message = create.message.as_deref().unwrap_or_default();
        assert!(message.contains("meta.created"), "{}", message);
        assert!(message.contains("meta.lastModified"), "{}", message);
    }
}

#[tokio::test(start_paused = true)]
async fn test_run_deadline_skips_remaining_phases() {
    let server = MockScimServer::with_behavior(MockBehavior {
        latency: Some(Duration::from_secs(1)),
        ..MockBehavior::default()
    });
    let config = probe_config(ValidationMode::Strict)
        .with_run_timeout(Duration::from_millis(2500))
        .build()
        .unwrap();
    let outcome = run_probe(&server, config).await;

    let timed_out = find_check(&outcome, "POST /Users");
    assert_eq!(timed_out.status, CheckStatus::Fail);
    assert_eq!(timed_out.kind, Some(ProbeErrorKind::Timeout));
    assert_eq!(timed_out.cause, Some(RootCause::Timeout));

    let skipped: Vec<Phase> = outcome
        .checks
        .iter()
        .filter(|check| check.message.as_deref() == Some("Skipped: run deadline exceeded"))
        .map(|check| check.phase)
        .collect();
    assert_eq!(
        skipped,
        vec![
            Phase::GroupLifecycle,
            Phase::AgentLifecycle,
            Phase::AgenticApplicationLifecycle,
            Phase::AgentRapidLifecycle,
            Phase::Search,
            Phase::ErrorHandling,
        ]
    );
    assert_eq!(server.count("/Users").await, 0);
}
