//! Verdict — folds probe results into a single lockdown-health decision

use serde::Serialize;
use tracing::{info, warn};

use crate::error::ConfigError;
use crate::expectation::ExpectationTable;
use crate::result::ProbeResult;

/// Count results whose outcome matches the expected polarity. Pure and
/// independent of result order.
pub fn count_correct(
    results: &[ProbeResult],
    expectations: &ExpectationTable,
) -> Result<usize, ConfigError> {
    let mut correct = 0;
    for result in results {
        let should_succeed = expectations.should_succeed(result.name())?;
        if result.outcome().is_correct(should_succeed) {
            correct += 1;
        }
    }
    Ok(correct)
}

/// Outcome of a full suite run
#[derive(Debug, Clone, Serialize)]
pub struct SuiteVerdict {
    results: Vec<ProbeResult>,
    passed_count: usize,
    total_count: usize,
    threshold: usize,
    healthy: bool,
}

impl SuiteVerdict {
    /// Judge a completed run. `healthy` holds when at least `threshold`
    /// results are correct.
    pub fn aggregate(
        results: Vec<ProbeResult>,
        expectations: &ExpectationTable,
        threshold: usize,
    ) -> Result<Self, ConfigError> {
        let passed_count = count_correct(&results, expectations)?;
        let total_count = results.len();
        let verdict = Self {
            results,
            passed_count,
            total_count,
            threshold,
            healthy: passed_count >= threshold,
        };

        if verdict.healthy {
            info!("Lockdown verdict: healthy ({})", verdict.summary());
        } else {
            warn!("Lockdown verdict: unhealthy ({})", verdict.summary());
        }
        Ok(verdict)
    }

    pub fn results(&self) -> &[ProbeResult] {
        &self.results
    }

    pub fn passed_count(&self) -> usize {
        self.passed_count
    }

    pub fn total_count(&self) -> usize {
        self.total_count
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy
    }

    pub fn exit_code(&self) -> u8 {
        if self.healthy { 0 } else { 1 }
    }

    pub fn summary(&self) -> String {
        format!(
            "{}/{} probes correct, threshold {}",
            self.passed_count, self.total_count, self.threshold
        )
    }
}
