//! Expectation table — which capabilities must work and which must be denied

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::ConfigError;
use crate::probe::names;

/// Declared polarity for one probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectationEntry {
    pub probe_name: String,
    pub should_succeed: bool,
}

impl ExpectationEntry {
    pub fn new(probe_name: impl Into<String>, should_succeed: bool) -> Self {
        Self {
            probe_name: probe_name.into(),
            should_succeed,
        }
    }
}

/// Polarities of the fixed lockdown suite, in suite order
const LOCKDOWN_EXPECTATIONS: &[(&str, bool)] = &[
    (names::SPAWN_PROCESS, false),
    (names::SHELL_COMMAND, false),
    (names::FORK_PROCESS, false),
    (names::OUTBOUND_NETWORK, false),
    (names::CONTROL_PLANE, true),
    (names::FILE_IO, true),
    (names::LOCAL_COMPUTATION, true),
];

/// Static mapping from probe name to expected polarity. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpectationTable {
    entries: Vec<ExpectationEntry>,
}

impl ExpectationTable {
    /// Build a table, rejecting duplicate probe names
    pub fn new(entries: Vec<ExpectationEntry>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.probe_name.as_str()) {
                return Err(ConfigError::DuplicateExpectation(entry.probe_name.clone()));
            }
        }
        Ok(Self { entries })
    }

    /// The table for the fixed lockdown suite: process creation and outbound
    /// network denied; control plane, file I/O and computation allowed.
    pub fn lockdown() -> Self {
        Self {
            entries: LOCKDOWN_EXPECTATIONS
                .iter()
                .map(|(name, should_succeed)| ExpectationEntry::new(*name, *should_succeed))
                .collect(),
        }
    }

    /// Look up the polarity for a probe. A missing name is a harness defect.
    pub fn should_succeed(&self, probe_name: &str) -> Result<bool, ConfigError> {
        self.entries
            .iter()
            .find(|e| e.probe_name == probe_name)
            .map(|e| e.should_succeed)
            .ok_or_else(|| ConfigError::MissingExpectation(probe_name.to_string()))
    }

    /// Check that the given probe names and this table cover each other
    /// exactly, with no orphans in either direction.
    pub fn check_coverage<'a, I>(&self, probe_names: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let probe_names: HashSet<&str> = probe_names.into_iter().collect();
        for name in &probe_names {
            self.should_succeed(name)?;
        }
        if let Some(orphan) = self
            .entries
            .iter()
            .find(|e| !probe_names.contains(e.probe_name.as_str()))
        {
            return Err(ConfigError::OrphanExpectation(orphan.probe_name.clone()));
        }
        Ok(())
    }

    pub fn entries(&self) -> &[ExpectationEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
