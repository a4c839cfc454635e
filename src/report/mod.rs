//! Probe and validation reports.
//!
//! A [`ProbeReport`] is the versioned public contract of a probe run. Fields
//! are only ever added within a major `version`; existing fields keep their
//! name and meaning. Counters in [`ProbeSummary`] are derived from the check
//! list every time, never tracked separately.
//!
//! # Module Organization
//!
//! * [`issues`] - Grouping of failures by root cause into a fix summary
//! * [`terminal`] - Plain-text rendering grouped by phase
//! * [`validation`] - Report for a single statically validated document

pub mod issues;
pub mod terminal;
pub mod validation;

pub use issues::{Issue, build_issues};
pub use terminal::TerminalReport;
pub use validation::ValidationReport;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::ValidationMode;
use crate::error::ScimResult;
use crate::probe::deviation::DEVIATION_TABLE_VERSION;
use crate::probe::{CheckStatus, ProbeCheck, ProbeOutcome, TestResource};

/// Version of the report format.
pub const REPORT_VERSION: &str = "1.0";

/// Version of this tool, as reported in `tool_version`.
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Counts by status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ProbeSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub warnings: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl ProbeSummary {
    pub fn from_checks(checks: &[ProbeCheck]) -> Self {
        let count = |status: CheckStatus| checks.iter().filter(|c| c.status == status).count();
        Self {
            total: checks.len(),
            passed: count(CheckStatus::Pass),
            failed: count(CheckStatus::Fail),
            warnings: count(CheckStatus::Warn),
            skipped: count(CheckStatus::Skip),
            errors: count(CheckStatus::Error),
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed + self.errors > 0
    }
}

/// Structured result of a probe run.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub version: &'static str,
    pub tool_version: &'static str,
    pub mode: ValidationMode,
    pub timestamp: DateTime<Utc>,
    /// Base URL with any user-info removed
    pub target: String,
    pub deviation_table_version: &'static str,
    pub summary: ProbeSummary,
    pub issues: Vec<Issue>,
    pub results: Vec<ProbeCheck>,
    /// Test resources cleanup could not remove
    pub orphaned: Vec<TestResource>,
}

impl ProbeReport {
    pub fn new(outcome: ProbeOutcome) -> Self {
        let summary = ProbeSummary::from_checks(&outcome.checks);
        let issues = build_issues(&outcome.checks);
        Self {
            version: REPORT_VERSION,
            tool_version: TOOL_VERSION,
            mode: outcome.mode,
            timestamp: outcome.started_at,
            target: outcome.target,
            deviation_table_version: DEVIATION_TABLE_VERSION,
            summary,
            issues,
            results: outcome.checks,
            orphaned: outcome.orphans,
        }
    }

    pub fn to_json(&self) -> ScimResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn render_text(&self) -> String {
        TerminalReport::new(self).to_string()
    }

    /// 0 when nothing failed, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.summary.has_failures() { 1 } else { 0 }
    }
}

impl From<ProbeOutcome> for ProbeReport {
    fn from(outcome: ProbeOutcome) -> Self {
        Self::new(outcome)
    }
}
