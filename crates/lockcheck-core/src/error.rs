//! Configuration errors — defects in the harness itself, never sandbox properties

use std::path::PathBuf;

/// Raised before any probe runs. A `ConfigError` means the harness is
/// misconfigured; it is never turned into a probe outcome.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("probe '{0}' has no expectation entry")]
    MissingExpectation(String),

    #[error("expectation entry '{0}' does not match any probe in the suite")]
    OrphanExpectation(String),

    #[error("expectation for '{0}' is declared more than once")]
    DuplicateExpectation(String),

    #[error("probe '{0}' is registered more than once")]
    DuplicateProbe(String),

    #[error("health threshold {threshold} is out of range (suite has {total} probes)")]
    InvalidThreshold { threshold: usize, total: usize },

    #[error("invalid control-plane port '{value}' in {source_name}")]
    InvalidPort { value: String, source_name: String },

    #[error("{field} must be greater than zero")]
    ZeroLimit { field: &'static str },

    #[error("response_limit {limit} exceeds the maximum of {max} bytes")]
    ResponseLimitTooLarge { limit: usize, max: usize },

    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
