//! Probe results — one immutable record per probe run

use serde::{Deserialize, Serialize};

use crate::probe::AttemptKind;

/// Judged outcome of a probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    BlockedAsExpected,
    AllowedAsExpected,
    Violation,
    Indeterminate,
}

impl Outcome {
    /// Judge an attempt against the expected polarity of its capability.
    pub fn judge(kind: AttemptKind, should_succeed: bool) -> Self {
        match (kind, should_succeed) {
            (AttemptKind::Succeeded, true) => Outcome::AllowedAsExpected,
            (AttemptKind::Denied, false) => Outcome::BlockedAsExpected,
            (AttemptKind::Succeeded, false) | (AttemptKind::Denied, true) => Outcome::Violation,
            (AttemptKind::Inconclusive, _) => Outcome::Indeterminate,
        }
    }

    /// Whether this outcome counts toward the health threshold for a probe
    /// with the given polarity.
    pub fn is_correct(self, should_succeed: bool) -> bool {
        matches!(
            (self, should_succeed),
            (Outcome::AllowedAsExpected, true) | (Outcome::BlockedAsExpected, false)
        )
    }

    pub fn marker(self) -> &'static str {
        match self {
            Outcome::BlockedAsExpected | Outcome::AllowedAsExpected => "✓",
            Outcome::Violation => "✗",
            Outcome::Indeterminate => "?",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::BlockedAsExpected => write!(f, "BLOCKED"),
            Outcome::AllowedAsExpected => write!(f, "ALLOWED"),
            Outcome::Violation => write!(f, "VIOLATION"),
            Outcome::Indeterminate => write!(f, "INDETERMINATE"),
        }
    }
}

/// Result of a single probe run. Fields are read-only once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    name: String,
    outcome: Outcome,
    detail: String,
    #[serde(default)]
    duration_ms: u64,
}

impl ProbeResult {
    pub fn new(name: impl Into<String>, outcome: Outcome, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome,
            detail: detail.into(),
            duration_ms: 0,
        }
    }

    pub(crate) fn with_duration(mut self, elapsed: std::time::Duration) -> Self {
        self.duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }
}
