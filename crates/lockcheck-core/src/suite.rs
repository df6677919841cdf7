//! Probe suite — runs every probe once, in order, and judges each attempt

use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::HarnessConfig;
use crate::error::ConfigError;
use crate::expectation::ExpectationTable;
use crate::probe::{self, Attempt, Probe};
use crate::result::{Outcome, ProbeResult};

struct Registered {
    probe: Box<dyn Probe>,
    should_succeed: bool,
}

/// Ordered probes with their polarities resolved up front, so a run can
/// never hit a missing expectation halfway through.
pub struct ProbeSuite {
    probes: Vec<Registered>,
    expectations: ExpectationTable,
}

impl ProbeSuite {
    /// Pair probes with their expectations. Fails if names are duplicated or
    /// if either side has an entry the other lacks.
    pub fn new(
        probes: Vec<Box<dyn Probe>>,
        expectations: ExpectationTable,
    ) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for probe in &probes {
            if !seen.insert(probe.name().to_string()) {
                return Err(ConfigError::DuplicateProbe(probe.name().to_string()));
            }
        }
        expectations.check_coverage(probes.iter().map(|p| p.name()))?;

        let probes = probes
            .into_iter()
            .map(|probe| {
                let should_succeed = expectations.should_succeed(probe.name())?;
                Ok(Registered {
                    probe,
                    should_succeed,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self {
            probes,
            expectations,
        })
    }

    /// The fixed lockdown battery, with the config validated against it
    pub fn lockdown(config: &HarnessConfig) -> Result<Self, ConfigError> {
        let suite = Self::new(probe::lockdown_probes(config), ExpectationTable::lockdown())?;
        config.validate(suite.len())?;
        Ok(suite)
    }

    pub fn expectations(&self) -> &ExpectationTable {
        &self.expectations
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.probes.iter().map(|r| r.probe.name())
    }

    pub fn len(&self) -> usize {
        self.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    /// Run every probe exactly once, sequentially. Always yields one result
    /// per probe.
    pub fn run(&self) -> Vec<ProbeResult> {
        info!("Running {} lockdown probes...", self.probes.len());
        self.probes
            .iter()
            .map(|r| run_probe(r.probe.as_ref(), r.should_succeed))
            .collect()
    }
}

/// Run one probe and judge it. A panicking probe becomes `Indeterminate`.
pub fn run_probe(probe: &dyn Probe, should_succeed: bool) -> ProbeResult {
    let started = Instant::now();
    let attempt = panic::catch_unwind(AssertUnwindSafe(|| probe.attempt())).unwrap_or_else(
        |payload| Attempt::inconclusive(format!("probe panicked: {}", panic_message(&*payload))),
    );
    let elapsed = started.elapsed();

    let outcome = Outcome::judge(attempt.kind, should_succeed);
    debug!(
        "{}: {:?} -> {} in {:?} ({})",
        probe.name(),
        attempt.kind,
        outcome,
        elapsed,
        attempt.detail
    );
    match outcome {
        Outcome::Violation => warn!("{}: violation: {}", probe.name(), attempt.detail),
        Outcome::Indeterminate => warn!("{}: indeterminate: {}", probe.name(), attempt.detail),
        _ => {}
    }

    ProbeResult::new(probe.name(), outcome, attempt.detail).with_duration(elapsed)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expectation::ExpectationEntry;

    struct FixedProbe {
        name: &'static str,
        attempt: Attempt,
    }

    impl Probe for FixedProbe {
        fn name(&self) -> &str {
            self.name
        }
        fn description(&self) -> &str {
            "fixed"
        }
        fn attempt(&self) -> Attempt {
            self.attempt.clone()
        }
    }

    struct PanickingProbe;

    impl Probe for PanickingProbe {
        fn name(&self) -> &str {
            "panicking"
        }
        fn description(&self) -> &str {
            "always panics"
        }
        fn attempt(&self) -> Attempt {
            panic!("forced internal failure")
        }
    }

    fn fixed(name: &'static str, attempt: Attempt) -> Box<dyn Probe> {
        Box::new(FixedProbe { name, attempt })
    }

    #[test]
    fn test_panicking_probe_yields_indeterminate() {
        let result = run_probe(&PanickingProbe, true);
        assert_eq!(result.name(), "panicking");
        assert_eq!(result.outcome(), Outcome::Indeterminate);
        assert!(result.detail().contains("forced internal failure"));
    }

    #[test]
    fn test_suite_survives_panicking_probe() {
        let suite = ProbeSuite::new(
            vec![
                Box::new(PanickingProbe) as Box<dyn Probe>,
                fixed("after", Attempt::succeeded("fine")),
            ],
            ExpectationTable::new(vec![
                ExpectationEntry::new("panicking", false),
                ExpectationEntry::new("after", true),
            ])
            .unwrap(),
        )
        .unwrap();

        let results = suite.run();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].outcome(), Outcome::Indeterminate);
        assert_eq!(results[1].outcome(), Outcome::AllowedAsExpected);
    }

    #[test]
    fn test_results_keep_suite_order() {
        let suite = ProbeSuite::new(
            vec![
                fixed("b", Attempt::denied("no")),
                fixed("a", Attempt::succeeded("yes")),
            ],
            ExpectationTable::new(vec![
                ExpectationEntry::new("a", true),
                ExpectationEntry::new("b", false),
            ])
            .unwrap(),
        )
        .unwrap();

        let names: Vec<String> = suite.run().iter().map(|r| r.name().to_string()).collect();
        assert_eq!(names, ["b", "a"]);
    }

    #[test]
    fn test_missing_expectation_aborts_construction() {
        let err = ProbeSuite::new(
            vec![fixed("a", Attempt::succeeded("yes")), fixed("b", Attempt::denied("no"))],
            ExpectationTable::new(vec![ExpectationEntry::new("a", true)]).unwrap(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, ConfigError::MissingExpectation(name) if name == "b"));
    }

    #[test]
    fn test_orphan_expectation_aborts_construction() {
        let err = ProbeSuite::new(
            vec![fixed("a", Attempt::succeeded("yes"))],
            ExpectationTable::new(vec![
                ExpectationEntry::new("a", true),
                ExpectationEntry::new("ghost", false),
            ])
            .unwrap(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, ConfigError::OrphanExpectation(name) if name == "ghost"));
    }

    #[test]
    fn test_duplicate_probe_rejected() {
        let err = ProbeSuite::new(
            vec![fixed("a", Attempt::succeeded("1")), fixed("a", Attempt::succeeded("2"))],
            ExpectationTable::new(vec![ExpectationEntry::new("a", true)]).unwrap(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, ConfigError::DuplicateProbe(_)));
    }

    #[test]
    fn test_lockdown_suite_covers_table() {
        let suite = ProbeSuite::lockdown(&HarnessConfig::default()).unwrap();
        assert_eq!(suite.len(), 7);
        assert_eq!(suite.expectations().len(), 7);
        assert!(suite.expectations().check_coverage(suite.names()).is_ok());
    }

    #[test]
    fn test_lockdown_rejects_threshold_above_suite() {
        let config = HarnessConfig {
            health_threshold: 8,
            ..HarnessConfig::default()
        };
        assert!(matches!(
            ProbeSuite::lockdown(&config),
            Err(ConfigError::InvalidThreshold { threshold: 8, total: 7 })
        ));
    }
}
