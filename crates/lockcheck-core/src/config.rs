//! Harness configuration — resolved once at startup and passed to the probes

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::error::ConfigError;

/// Environment variable carrying the control-plane port override.
pub const PORT_ENV_VAR: &str = "SENTRA_PORT";

pub const DEFAULT_CONTROL_PORT: u16 = 9999;

/// Largest single control-plane read the harness will allocate for.
pub const MAX_RESPONSE_LIMIT: usize = 65536;

/// Default minimum number of correct probes for a healthy verdict.
pub const DEFAULT_HEALTH_THRESHOLD: usize = 5;

/// Configuration for a lockcheck run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarnessConfig {
    #[serde(default = "default_control_port")]
    pub control_port: u16,
    #[serde(default = "default_control_timeout_secs")]
    pub control_timeout_secs: u64,
    #[serde(default = "default_outbound_target")]
    pub outbound_target: SocketAddr,
    #[serde(default = "default_outbound_timeout_secs")]
    pub outbound_timeout_secs: u64,
    #[serde(default = "default_health_threshold")]
    pub health_threshold: usize,
    /// Upper bound on a single control-plane response read
    #[serde(default = "default_response_limit")]
    pub response_limit: usize,
    /// Characters of the control-plane response kept in the report
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
    #[serde(default = "default_request_code")]
    pub request_code: String,
    #[serde(default = "default_request_profile")]
    pub request_profile: String,
    /// Directory for the file I/O probe. When unset the system temp dir is
    /// used, which consults `TMPDIR`; set this to avoid that lookup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<PathBuf>,
}

fn default_control_port() -> u16 {
    DEFAULT_CONTROL_PORT
}
fn default_control_timeout_secs() -> u64 {
    5
}
fn default_outbound_target() -> SocketAddr {
    SocketAddr::from(([8, 8, 8, 8], 53))
}
fn default_outbound_timeout_secs() -> u64 {
    2
}
fn default_health_threshold() -> usize {
    DEFAULT_HEALTH_THRESHOLD
}
fn default_response_limit() -> usize {
    MAX_RESPONSE_LIMIT
}
fn default_preview_chars() -> usize {
    200
}
fn default_request_code() -> String {
    "print('Hello from sandbox!')".to_string()
}
fn default_request_profile() -> String {
    "python_sandbox".to_string()
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            control_port: default_control_port(),
            control_timeout_secs: default_control_timeout_secs(),
            outbound_target: default_outbound_target(),
            outbound_timeout_secs: default_outbound_timeout_secs(),
            health_threshold: default_health_threshold(),
            response_limit: default_response_limit(),
            preview_chars: default_preview_chars(),
            request_code: default_request_code(),
            request_profile: default_request_profile(),
            scratch_dir: None,
        }
    }
}

impl HarnessConfig {
    /// Resolve the configuration: defaults, then the optional TOML file, then
    /// the port from the environment. This is the only environment read.
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        let env_port = std::env::var(PORT_ENV_VAR).ok();
        config.apply_port_override(env_port.as_deref(), PORT_ENV_VAR)?;
        Ok(config)
    }

    /// Load a config file; missing keys fall back to defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply a raw port value (from the environment or a flag). `None` leaves
    /// the current port untouched.
    pub fn apply_port_override(
        &mut self,
        raw: Option<&str>,
        source_name: &str,
    ) -> Result<(), ConfigError> {
        let Some(raw) = raw else {
            return Ok(());
        };
        let port: u16 = raw
            .trim()
            .parse()
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| ConfigError::InvalidPort {
                value: raw.to_string(),
                source_name: source_name.to_string(),
            })?;
        debug!("Control-plane port {} from {}", port, source_name);
        self.control_port = port;
        Ok(())
    }

    /// Check policy values against the size of the suite they will govern
    pub fn validate(&self, suite_size: usize) -> Result<(), ConfigError> {
        if self.health_threshold == 0 || self.health_threshold > suite_size {
            return Err(ConfigError::InvalidThreshold {
                threshold: self.health_threshold,
                total: suite_size,
            });
        }
        if self.control_timeout_secs == 0 {
            return Err(ConfigError::ZeroLimit {
                field: "control_timeout_secs",
            });
        }
        if self.outbound_timeout_secs == 0 {
            return Err(ConfigError::ZeroLimit {
                field: "outbound_timeout_secs",
            });
        }
        if self.response_limit == 0 {
            return Err(ConfigError::ZeroLimit {
                field: "response_limit",
            });
        }
        if self.response_limit > MAX_RESPONSE_LIMIT {
            return Err(ConfigError::ResponseLimitTooLarge {
                limit: self.response_limit,
                max: MAX_RESPONSE_LIMIT,
            });
        }
        Ok(())
    }

    pub fn control_addr(&self) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], self.control_port))
    }

    pub fn control_timeout(&self) -> Duration {
        Duration::from_secs(self.control_timeout_secs)
    }

    pub fn outbound_timeout(&self) -> Duration {
        Duration::from_secs(self.outbound_timeout_secs)
    }
}
