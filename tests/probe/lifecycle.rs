//! Full probe runs and phase selection.

use scim_conformance::config::ValidationMode;
use scim_conformance::probe::{Phase, ProbeEngine};
use scim_conformance::schema::ResourceKind;
use scim_conformance::{CheckStatus, ScimError};

use crate::assert_check_status;
use crate::common::{
    MockBehavior, MockScimServer, checks_in, probe_config, run_probe,
};

#[tokio::test]
async fn test_conformant_server_passes_every_phase() {
    let server = MockScimServer::new();
    let config = probe_config(ValidationMode::Strict).build().unwrap();
    let outcome = run_probe(&server, config).await;

    let problems: Vec<_> = outcome
        .checks
        .iter()
        .filter(|check| check.status != CheckStatus::Pass)
        .collect();
    assert!(problems.is_empty(), "unexpected non-passing checks: {:#?}", problems);
    assert!(!outcome.has_failures());
    assert!(outcome.orphans.is_empty());

    for phase in [
        Phase::Discovery,
        Phase::UserLifecycle,
        Phase::GroupLifecycle,
        Phase::AgentLifecycle,
        Phase::AgenticApplicationLifecycle,
        Phase::AgentRapidLifecycle,
        Phase::Search,
        Phase::ErrorHandling,
    ] {
        assert!(!checks_in(&outcome, phase).is_empty(), "no checks for {}", phase);
    }

    assert_check_status!(outcome, "GET /Users/{id} after PUT", Pass);
    assert_check_status!(outcome, "PATCH /Groups/{id} add member", Pass);
    assert_check_status!(outcome, "GET /Agents/{id} after PATCH", Pass);
    assert_check_status!(outcome, "Rapid create/delete 10 agents", Pass);
    assert_check_status!(outcome, "POST /Users missing userName (expect 400)", Pass);

    for endpoint in ["/Users", "/Groups", "/Agents", "/AgenticApplications"] {
        assert_eq!(server.count(endpoint).await, 0, "{} left behind", endpoint);
    }
}

#[tokio::test]
async fn test_checks_follow_phase_order() {
    let server = MockScimServer::new();
    let config = probe_config(ValidationMode::Compat).build().unwrap();
    let outcome = run_probe(&server, config).await;

    let phases: Vec<Phase> = outcome.checks.iter().map(|check| check.phase).collect();
    let mut sorted = phases.clone();
    sorted.sort();
    assert_eq!(phases, sorted);
    assert_eq!(outcome.checks[0].name, "GET /ServiceProviderConfig");
}

#[tokio::test]
async fn test_test_resources_carry_the_prefix() {
    let server = MockScimServer::new();
    let config = probe_config(ValidationMode::Strict)
        .with_resource_filter(ResourceKind::Agent)
        .build()
        .unwrap();
    run_probe(&server, config).await;

    let requests = server.requests().await;
    let agent_posts: Vec<_> = requests
        .iter()
        .filter(|r| r.url.ends_with("/Agents") && r.body.is_some())
        .collect();
    assert!(!agent_posts.is_empty());
    for request in agent_posts {
        let name = request.body.as_ref().and_then(|b| b["name"].as_str()).unwrap_or_default();
        assert!(name.starts_with("scim-sanity-test-"), "{}", name);
    }
}

#[tokio::test]
async fn test_resource_filter_limits_lifecycles() {
    let server = MockScimServer::new();
    let config = probe_config(ValidationMode::Strict)
        .with_resource_filter(ResourceKind::Agent)
        .build()
        .unwrap();
    let outcome = run_probe(&server, config).await;

    for phase in [
        Phase::UserLifecycle,
        Phase::GroupLifecycle,
        Phase::AgenticApplicationLifecycle,
    ] {
        let checks = checks_in(&outcome, phase);
        assert!(!checks.is_empty());
        assert!(checks.iter().all(|check| check.status == CheckStatus::Skip));
        assert!(
            checks[0]
                .message
                .as_deref()
                .is_some_and(|m| m.contains("excluded by resource filter"))
        );
    }
    assert!(
        checks_in(&outcome, Phase::AgentLifecycle)
            .iter()
            .all(|check| check.status == CheckStatus::Pass)
    );
    assert!(
        !server
            .requests()
            .await
            .iter()
            .any(|r| r.url.contains("/Groups"))
    );
}

#[tokio::test]
async fn test_unadvertised_types_are_skipped() {
    let server = MockScimServer::with_behavior(MockBehavior {
        resource_types: vec!["User", "Group"],
        ..MockBehavior::default()
    });
    let config = probe_config(ValidationMode::Strict).build().unwrap();
    let outcome = run_probe(&server, config).await;

    let agent_checks = checks_in(&outcome, Phase::AgentLifecycle);
    assert!(agent_checks.iter().all(|check| check.status == CheckStatus::Skip));
    assert_eq!(
        agent_checks[0].message.as_deref(),
        Some("Skipped: Agent not advertised by /ResourceTypes")
    );
    assert!(
        checks_in(&outcome, Phase::AgentRapidLifecycle)
            .iter()
            .all(|check| check.status == CheckStatus::Skip)
    );
    assert!(!outcome.has_failures());
    assert!(!server.requests().await.iter().any(|r| r.url.contains("/Agents")));
}

#[tokio::test]
async fn test_advertised_types_without_probed_kinds_skip_every_lifecycle() {
    let server = MockScimServer::with_behavior(MockBehavior {
        resource_types: vec!["Device"],
        ..MockBehavior::default()
    });
    let config = probe_config(ValidationMode::Strict).build().unwrap();
    let outcome = run_probe(&server, config).await;

    for phase in [
        Phase::UserLifecycle,
        Phase::GroupLifecycle,
        Phase::AgentLifecycle,
        Phase::AgenticApplicationLifecycle,
    ] {
        let checks = checks_in(&outcome, phase);
        assert!(!checks.is_empty());
        assert!(checks.iter().all(|check| check.status == CheckStatus::Skip));
    }
    assert_check_status!(outcome, "POST /Users", Skip);
    assert!(!server.requests().await.iter().any(|r| r.url.contains("/Groups")));
    assert_eq!(server.count("/Users").await, 0);
}

#[tokio::test]
async fn test_ids_needing_encoding_address_the_right_resource() {
    let server = MockScimServer::with_behavior(MockBehavior {
        id_prefix: "team a/",
        ..MockBehavior::default()
    });
    let config = probe_config(ValidationMode::Strict).build().unwrap();
    let outcome = run_probe(&server, config).await;

    assert_check_status!(outcome, "POST /Users", Pass);
    assert!(outcome.orphans.is_empty());
    for endpoint in ["/Users", "/Groups", "/Agents", "/AgenticApplications"] {
        assert_eq!(server.count(endpoint).await, 0, "{} left behind", endpoint);
    }
    assert!(
        server
            .requests()
            .await
            .iter()
            .any(|request| request.url.contains("/Users/team%20a%2F"))
    );
}

#[tokio::test]
async fn test_missing_discovery_fails_and_falls_back() {
    let server = MockScimServer::with_behavior(MockBehavior {
        no_discovery: true,
        ..MockBehavior::default()
    });
    let config = probe_config(ValidationMode::Compat).build().unwrap();
    let outcome = run_probe(&server, config).await;

    let discovery = checks_in(&outcome, Phase::Discovery);
    assert_eq!(discovery.len(), 3);
    assert!(discovery.iter().all(|check| check.status == CheckStatus::Fail));

    // Users and Groups are still probed without /ResourceTypes
    assert_check_status!(outcome, "POST /Users", Pass);
    assert_check_status!(outcome, "POST /Groups", Pass);
    assert_check_status!(outcome, "POST /Agents", Skip);
}

#[tokio::test]
async fn test_consent_is_required_before_any_request() {
    let server = MockScimServer::new();
    let config = probe_config(ValidationMode::Strict)
        .accept_side_effects(false)
        .build()
        .unwrap();

    let result = ProbeEngine::new(server.clone(), config).unwrap().run().await;

    match result {
        Err(ScimError::ConsentRequired { message }) => {
            assert!(message.contains("scim-sanity-test-"));
            assert!(message.contains("--i-accept-side-effects"));
        }
        other => panic!("expected consent refusal, got {:?}", other.map(|o| o.checks.len())),
    }
    assert!(server.requests().await.is_empty());
}

#[tokio::test]
async fn test_reduced_rapid_count() {
    let server = MockScimServer::new();
    let config = probe_config(ValidationMode::Strict)
        .with_resource_filter(ResourceKind::Agent)
        .with_rapid_agent_count(3)
        .build()
        .unwrap();
    let outcome = run_probe(&server, config).await;

    let rapid = crate::common::find_check(&outcome, "Rapid create/delete 3 agents");
    assert_eq!(rapid.status, CheckStatus::Pass);
    assert_eq!(rapid.message.as_deref(), Some("3/3 succeeded"));
}
