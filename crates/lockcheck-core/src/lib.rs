//! lockcheck-core — empirical lockdown verification for sandboxed environments
//!
//! Runs a fixed battery of capability probes from inside a sandbox, judges
//! each attempt against a declarative expectation table and folds the
//! outcomes into a single health verdict.

pub mod config;
pub mod error;
pub mod expectation;
pub mod probe;
pub mod report;
pub mod result;
pub mod suite;
pub mod verdict;

pub use config::HarnessConfig;
pub use error::ConfigError;
pub use expectation::{ExpectationEntry, ExpectationTable};
pub use probe::{Attempt, AttemptKind, Probe};
pub use report::{RunReport, render_text};
pub use result::{Outcome, ProbeResult};
pub use suite::ProbeSuite;
pub use verdict::SuiteVerdict;
