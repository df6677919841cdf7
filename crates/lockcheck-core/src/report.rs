//! Reporting — human-readable text and a machine-readable JSON record

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write;
use uuid::Uuid;

use crate::expectation::ExpectationTable;
use crate::verdict::SuiteVerdict;

const RULE_WIDTH: usize = 60;

/// Render a verdict for the console
pub fn render_text(verdict: &SuiteVerdict, expectations: &ExpectationTable) -> String {
    let rule = "═".repeat(RULE_WIDTH);
    let mut out = String::new();

    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "LOCKDOWN PROBES");
    let _ = writeln!(out, "{rule}");

    for result in verdict.results() {
        let expected = match expectations.should_succeed(result.name()) {
            Ok(true) => "must work",
            Ok(false) => "must be denied",
            Err(_) => "no expectation",
        };
        let _ = writeln!(
            out,
            "  {} {:<13} {:<18} ({})",
            result.outcome().marker(),
            result.outcome(),
            result.name(),
            expected
        );
        if !result.detail().is_empty() {
            let _ = writeln!(out, "      {}", result.detail());
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Total: {}/{} probes correct (threshold {})",
        verdict.passed_count(),
        verdict.total_count(),
        verdict.threshold()
    );
    if verdict.is_healthy() {
        let _ = writeln!(out, "  ✓ Lockdown appears to be working correctly");
    } else {
        let _ = writeln!(out, "  ⚠ Lockdown may not be fully active");
    }
    out
}

/// A complete run, as emitted by `--json`
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub healthy: bool,
    pub exit_code: u8,
    pub verdict: SuiteVerdict,
}

impl RunReport {
    pub fn new(verdict: SuiteVerdict, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at,
            finished_at: Utc::now(),
            healthy: verdict.is_healthy(),
            exit_code: verdict.exit_code(),
            verdict,
        }
    }
}
