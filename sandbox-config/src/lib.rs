//! Sandbox Config - Pure configuration data structures
//!
//! This crate contains only data structures, no logic or global state.
//! It serves as the shared configuration vocabulary across all sandbox crates.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Environment variable consulted by [`Environment::from_env`]
pub const ENVIRONMENT_VAR: &str = "SANDBOX_ENV";

/// Build/runtime environment the sandbox is served from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    /// Origin every host-bound message is posted to
    pub fn host_origin(&self) -> &'static str {
        match self {
            Environment::Development => "http://codesandbox.dev",
            Environment::Production => "https://codesandbox.io",
        }
    }

    /// Parse an environment flag; anything but `development` is production
    pub fn from_flag(flag: &str) -> Self {
        if flag.eq_ignore_ascii_case("development") {
            Environment::Development
        } else {
            Environment::Production
        }
    }

    /// Read the environment from [`ENVIRONMENT_VAR`]
    pub fn from_env() -> Self {
        std::env::var(ENVIRONMENT_VAR)
            .map(|flag| Self::from_flag(&flag))
            .unwrap_or_default()
    }
}

/// Configuration for dependency bundle loading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleConfig {
    /// Interval between bundle availability checks, in milliseconds
    pub poll_interval_ms: u64,
    /// Script file appended to the bundle url
    pub script_name: String,
}

impl BundleConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Script reference injected for a bundle url
    pub fn script_url(&self, bundle_url: &str) -> String {
        format!("{}/{}", bundle_url, self.script_name)
    }
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            script_name: "dll.js".to_string(),
        }
    }
}

/// Configuration for render verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Substring whose presence in a module's source marks it as a UI-framework module
    pub ui_marker: String,
    /// Entry points ending in this suffix are exempt from the change check
    pub markup_entry_suffix: String,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            ui_marker: "React".to_string(),
            markup_entry_suffix: ".html".to_string(),
        }
    }
}

/// Configuration for dependency manifest caching
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DependencyConfig {
    /// Dependencies whose name contains this marker carry no runtime semantics
    pub type_only_marker: String,
}

impl Default for DependencyConfig {
    fn default() -> Self {
        Self {
            type_only_marker: "@types".to_string(),
        }
    }
}

/// Top-level sandbox configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    pub environment: Environment,
    pub bundle: BundleConfig,
    pub verifier: VerifierConfig,
    pub dependencies: DependencyConfig,
}

/// Error raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("bundle poll interval must be greater than zero")]
    ZeroPollInterval,
}

impl SandboxConfig {
    /// Parse a JSON configuration document; missing fields take their defaults
    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        let config: SandboxConfig = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bundle.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        Ok(())
    }

    /// Origin host-bound messages are posted to
    pub fn host_origin(&self) -> &'static str {
        self.environment.host_origin()
    }
}

/// Execution phase enum for phase-specific log filtering
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Bridge,
    Compile,
    Deps,
    Verify,
    History,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::Bridge,
        Phase::Compile,
        Phase::Deps,
        Phase::Verify,
        Phase::History,
    ];

    /// Get the string name of the phase
    pub const fn as_str(&self) -> &'static str {
        match self {
            Phase::Bridge => "bridge",
            Phase::Compile => "compile",
            Phase::Deps => "deps",
            Phase::Verify => "verify",
            Phase::History => "history",
        }
    }

    /// Get the log target name for this phase
    pub const fn target(&self) -> &'static str {
        match self {
            Phase::Bridge => "sandbox::bridge",
            Phase::Compile => "sandbox::compile",
            Phase::Deps => "sandbox::deps",
            Phase::Verify => "sandbox::verify",
            Phase::History => "sandbox::history",
        }
    }
}
