//! Coordinator and engine configuration.
//!
//! The network timeout is the only value read from the environment; everything
//! else is supplied by the caller.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, VerifyError};

/// Environment variable holding the engine network timeout in milliseconds.
pub const NETWORK_TIMEOUT_ENV: &str = "VERIKIT_NETWORK_TIMEOUT";

/// Coordinator configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Root of the verified-contracts repository
    pub repository_path: PathBuf,
    /// Network timeout for engine operations; `None` means engine default
    pub network_timeout: Option<Duration>,
}

impl CoordinatorConfig {
    /// Creates a configuration with the engine's default network timeout.
    pub fn new(repository_path: impl Into<PathBuf>) -> Self {
        Self {
            repository_path: repository_path.into(),
            network_timeout: None,
        }
    }

    /// Creates a configuration, reading the network timeout from
    /// [`NETWORK_TIMEOUT_ENV`].
    pub fn from_env(repository_path: impl Into<PathBuf>) -> Self {
        let raw = std::env::var(NETWORK_TIMEOUT_ENV).ok();
        Self {
            repository_path: repository_path.into(),
            network_timeout: parse_network_timeout(raw.as_deref()),
        }
    }

    /// Sets the network timeout.
    pub fn with_network_timeout(mut self, timeout: Duration) -> Self {
        self.network_timeout = Some(timeout);
        self
    }

    /// Checks the configuration once, before any engine is built.
    ///
    /// # Errors
    ///
    /// Returns `VerifyError::Config` if the repository path is empty.
    pub fn validate(&self) -> Result<()> {
        if self.repository_path.as_os_str().is_empty() {
            return Err(VerifyError::Config(
                "repository path must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parses a millisecond timeout.
///
/// Absent, blank, zero, or non-numeric values yield `None`.
pub fn parse_network_timeout(raw: Option<&str>) -> Option<Duration> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<u64>() {
        Ok(0) => None,
        Ok(ms) => Some(Duration::from_millis(ms)),
        Err(e) => {
            tracing::warn!(
                value = raw,
                error = %e,
                "Ignoring non-numeric {}, using engine default",
                NETWORK_TIMEOUT_ENV
            );
            None
        }
    }
}

/// Configuration snapshot handed to the engine factory.
///
/// Built once per construction attempt and never changed afterwards.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Repository root, taken from the repository store
    pub repository_path: PathBuf,
    /// Network timeout, `None` for the engine default
    pub network_timeout: Option<Duration>,
    /// Span the engine should log under
    pub logger: tracing::Span,
}
