//! Plain-text rendering of a probe report.

use std::fmt;

use super::ProbeReport;

const RULE: &str = "==================================================";
const SUB_RULE: &str = "----------------------------------------";
const DETAIL_INDENT: &str = "         ";

/// Terminal view of a [`ProbeReport`]: checks grouped by phase, the summary
/// line, the fix summary and a one-line verdict.
pub struct TerminalReport<'a> {
    report: &'a ProbeReport,
}

impl<'a> TerminalReport<'a> {
    pub fn new(report: &'a ProbeReport) -> Self {
        Self { report }
    }
}

impl fmt::Display for TerminalReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.report;

        writeln!(f)?;
        writeln!(f, "SCIM Server Conformance Probe")?;
        writeln!(f, "{}", RULE)?;
        writeln!(
            f,
            "  scim-conformance {}  |  mode: {}  |  {}",
            report.tool_version,
            report.mode,
            report.timestamp.format("%Y-%m-%dT%H:%M:%SZ")
        )?;
        writeln!(f, "  target: {}", report.target)?;

        let mut current = None;
        for check in &report.results {
            if current != Some(check.phase) {
                current = Some(check.phase);
                writeln!(f)?;
                writeln!(f, "  {}", check.phase)?;
                writeln!(f, "  {}", SUB_RULE)?;
            }
            writeln!(f, "  [{}] {}", check.status.label(), check.name)?;
            if let Some(message) = &check.message {
                // One finding per line
                let wrapped = message.replace("; ", &format!(";\n{}", DETAIL_INDENT));
                writeln!(f, "{}{}", DETAIL_INDENT, wrapped)?;
            }
        }

        let summary = &report.summary;
        writeln!(f)?;
        writeln!(f, "{}", RULE)?;
        let mut parts = Vec::new();
        for (count, label) in [
            (summary.passed, "passed"),
            (summary.failed, "failed"),
            (summary.errors, "errors"),
            (summary.warnings, "warnings"),
            (summary.skipped, "skipped"),
        ] {
            if count > 0 {
                parts.push(format!("{} {}", count, label));
            }
        }
        parts.push(format!("{} total", summary.total));
        writeln!(f, "  {}", parts.join(", "))?;

        if !report.orphaned.is_empty() {
            writeln!(f)?;
            writeln!(f, "  Left on the server:")?;
            for resource in &report.orphaned {
                writeln!(f, "    {}", resource.path())?;
            }
        }

        if !report.issues.is_empty() {
            writeln!(f)?;
            writeln!(f, "  Fix Summary")?;
            writeln!(f, "  {}", SUB_RULE)?;
            for issue in &report.issues {
                let noun = if issue.affected_tests == 1 { "test" } else { "tests" };
                writeln!(
                    f,
                    "  [{}] Trouble: {} ({} {} affected)",
                    issue.priority, issue.title, issue.affected_tests, noun
                )?;
                writeln!(f, "       Fix: {}", issue.fix)?;
                writeln!(f, "       Rationale: {}", issue.rationale)?;
            }
        }

        writeln!(f)?;
        writeln!(f, "  {}", SUB_RULE)?;
        let known: Vec<_> = report.issues.iter().filter(|i| i.priority != "?").collect();
        if !summary.has_failures() {
            writeln!(f, "  Result: All tests passed.")?;
        } else if let Some(first) = known.first() {
            let causes = if known.len() == 1 { "root cause" } else { "root causes" };
            writeln!(
                f,
                "  Result: {} {} account for the failures. Resolve {} first.",
                known.len(),
                causes,
                first.priority
            )?;
        } else {
            writeln!(
                f,
                "  Result: {} failure(s); review individual test output for details.",
                summary.failed + summary.errors
            )?;
        }
        Ok(())
    }
}
