//! Common test utilities for validation and probe testing.
//!
//! This module provides builders, RFC fixtures, an in-memory SCIM server and
//! assertion macros shared by the integration suite.

#![allow(dead_code)]

use serde_json::Value;

use scim_conformance::config::{ProbeConfig, ProbeConfigBuilder, ValidationMode};
use scim_conformance::probe::{Phase, ProbeCheck, ProbeEngine, ProbeOutcome};
use scim_conformance::{
    CheckStatus, SchemaRegistry, ValidationError, ValidationErrorKind, Validator,
};

pub mod mock_server;

pub use mock_server::{MOCK_BASE_URL, MockBehavior, MockScimServer};

/// Assert the exact sequence of error kinds produced by a validation run
#[macro_export]
macro_rules! assert_error_kinds {
    ($errors:expr, [$($kind:ident),* $(,)?]) => {{
        let actual: Vec<scim_conformance::ValidationErrorKind> =
            $errors.iter().map(|e| e.kind).collect();
        let expected = vec![$(scim_conformance::ValidationErrorKind::$kind),*];
        assert_eq!(actual, expected, "unexpected validation errors: {:#?}", $errors);
    }};
}

/// Assert the status of a named probe check
#[macro_export]
macro_rules! assert_check_status {
    ($outcome:expr, $name:expr, $status:ident) => {{
        let check = $crate::common::find_check(&$outcome, $name);
        assert_eq!(
            check.status,
            scim_conformance::CheckStatus::$status,
            "check '{}': {:?}",
            $name,
            check.message
        );
    }};
}

pub fn registry() -> SchemaRegistry {
    SchemaRegistry::new().expect("embedded schemas load")
}

pub fn validate(payload: &Value) -> Vec<ValidationError> {
    let registry = registry();
    Validator::new(&registry).validate_resource(payload)
}

pub fn validate_patch(payload: &Value) -> Vec<ValidationError> {
    let registry = registry();
    Validator::new(&registry).validate_patch(payload)
}

/// Errors as comparable `(kind, path)` pairs
pub fn error_pairs(errors: &[ValidationError]) -> Vec<(ValidationErrorKind, String)> {
    errors.iter().map(|e| (e.kind, e.path.clone())).collect()
}

/// Probe configuration aimed at the mock server, side effects acknowledged
pub fn probe_config(mode: ValidationMode) -> ProbeConfigBuilder {
    ProbeConfig::builder(MOCK_BASE_URL)
        .with_bearer_token("test-token")
        .with_mode(mode)
        .accept_side_effects(true)
}

pub async fn run_probe(server: &MockScimServer, config: ProbeConfig) -> ProbeOutcome {
    ProbeEngine::new(server.clone(), config)
        .expect("valid probe configuration")
        .run()
        .await
        .expect("probe run completes")
}

pub fn find_check<'a>(outcome: &'a ProbeOutcome, name: &str) -> &'a ProbeCheck {
    outcome
        .checks
        .iter()
        .find(|check| check.name == name)
        .unwrap_or_else(|| {
            let names: Vec<&str> = outcome.checks.iter().map(|c| c.name.as_str()).collect();
            panic!("no check named '{}' in {:#?}", name, names)
        })
}

/// Statuses of every check carrying `name`, in report order
pub fn statuses(outcome: &ProbeOutcome, name: &str) -> Vec<CheckStatus> {
    outcome
        .checks
        .iter()
        .filter(|check| check.name == name)
        .map(|check| check.status)
        .collect()
}

pub fn checks_in(outcome: &ProbeOutcome, phase: Phase) -> Vec<&ProbeCheck> {
    outcome.checks.iter().filter(|check| check.phase == phase).collect()
}
