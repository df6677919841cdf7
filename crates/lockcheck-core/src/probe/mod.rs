//! Capability probes
//!
//! Each probe exercises one capability and reports what happened as an
//! [`Attempt`]. Probes carry no polarity: whether a denial is good news is
//! decided by the [`ExpectationTable`](crate::expectation::ExpectationTable).

pub mod local;
pub mod network;
pub mod process;

use serde::{Deserialize, Serialize};

use crate::config::HarnessConfig;

pub use local::{ComputationProbe, FileIoProbe};
pub use network::{ControlPlaneProbe, ControlRequest, OutboundProbe, response_preview};
pub use process::{ForkProbe, ShellProbe, SpawnProbe};

/// Probe names, in suite order
pub mod names {
    pub const SPAWN_PROCESS: &str = "spawn_process";
    pub const SHELL_COMMAND: &str = "shell_command";
    pub const FORK_PROCESS: &str = "fork_process";
    pub const OUTBOUND_NETWORK: &str = "outbound_network";
    pub const CONTROL_PLANE: &str = "control_plane";
    pub const FILE_IO: &str = "file_io";
    pub const LOCAL_COMPUTATION: &str = "local_computation";

    pub const ALL: &[&str] = &[
        SPAWN_PROCESS,
        SHELL_COMMAND,
        FORK_PROCESS,
        OUTBOUND_NETWORK,
        CONTROL_PLANE,
        FILE_IO,
        LOCAL_COMPUTATION,
    ];
}

/// What happened when a capability was exercised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptKind {
    /// The capability worked
    Succeeded,
    /// The system refused or the attempt did not complete
    Denied,
    /// The probe hit a condition it does not know how to classify
    Inconclusive,
}

/// Raw observation from a probe, before judgment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub kind: AttemptKind,
    pub detail: String,
}

impl Attempt {
    pub fn succeeded(detail: impl Into<String>) -> Self {
        Self {
            kind: AttemptKind::Succeeded,
            detail: detail.into(),
        }
    }

    pub fn denied(detail: impl Into<String>) -> Self {
        Self {
            kind: AttemptKind::Denied,
            detail: detail.into(),
        }
    }

    pub fn inconclusive(detail: impl Into<String>) -> Self {
        Self {
            kind: AttemptKind::Inconclusive,
            detail: detail.into(),
        }
    }
}

/// A single capability check.
///
/// `attempt` must return for every input: errors from the underlying
/// operation are classified into the returned [`Attempt`], and any resource
/// the probe acquires is released before it returns.
pub trait Probe {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn attempt(&self) -> Attempt;
}

/// The fixed lockdown battery, in suite order
pub fn lockdown_probes(config: &HarnessConfig) -> Vec<Box<dyn Probe>> {
    vec![
        Box::new(SpawnProbe::default()),
        Box::new(ShellProbe::default()),
        Box::new(ForkProbe),
        Box::new(OutboundProbe::new(
            config.outbound_target,
            config.outbound_timeout(),
        )),
        Box::new(ControlPlaneProbe::from_config(config)),
        Box::new(FileIoProbe::new(config.scratch_dir.clone())),
        Box::new(ComputationProbe),
    ]
}
