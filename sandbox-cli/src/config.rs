//! CLI log configuration
//!
//! A global level plus optional per-phase overrides.

use sandbox_config::Phase;
use thiserror::Error;
use tracing::metadata::ParseLevelError;
use tracing::Level;

/// A rejected `--log` override
#[derive(Debug, Error)]
pub enum LogConfigError {
    #[error("expected PHASE=LEVEL, got '{0}'")]
    Malformed(String),

    #[error("unknown phase '{0}'")]
    UnknownPhase(String),

    #[error("invalid level for '{phase}'")]
    InvalidLevel {
        phase: String,
        #[source]
        source: ParseLevelError,
    },
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub global: Level,
    pub bridge: Option<Level>,
    pub compile: Option<Level>,
    pub deps: Option<Level>,
    pub verify: Option<Level>,
    pub history: Option<Level>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            global: Level::WARN,
            bridge: None,
            compile: None,
            deps: None,
            verify: None,
            history: None,
        }
    }
}

impl LogConfig {
    pub fn new(global: Level) -> Self {
        Self {
            global,
            ..Self::default()
        }
    }

    /// Get log level for a specific phase
    pub fn level_for(&self, phase: Phase) -> Level {
        let level = match phase {
            Phase::Bridge => self.bridge,
            Phase::Compile => self.compile,
            Phase::Deps => self.deps,
            Phase::Verify => self.verify,
            Phase::History => self.history,
        };
        level.unwrap_or(self.global)
    }

    pub fn set(&mut self, phase: Phase, level: Level) {
        let slot = match phase {
            Phase::Bridge => &mut self.bridge,
            Phase::Compile => &mut self.compile,
            Phase::Deps => &mut self.deps,
            Phase::Verify => &mut self.verify,
            Phase::History => &mut self.history,
        };
        *slot = Some(level);
    }

    /// Apply a `phase=level` override such as `compile=debug`
    pub fn apply_override(&mut self, directive: &str) -> Result<(), LogConfigError> {
        let (name, level) = directive
            .split_once('=')
            .ok_or_else(|| LogConfigError::Malformed(directive.to_string()))?;
        let name = name.trim();
        let phase = Phase::ALL
            .into_iter()
            .find(|phase| phase.as_str() == name)
            .ok_or_else(|| LogConfigError::UnknownPhase(name.to_string()))?;
        let level = level
            .trim()
            .parse::<Level>()
            .map_err(|source| LogConfigError::InvalidLevel {
                phase: name.to_string(),
                source,
            })?;
        self.set(phase, level);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_for_falls_back_to_global() {
        let mut config = LogConfig::new(Level::INFO);
        config.set(Phase::Compile, Level::TRACE);
        assert_eq!(config.level_for(Phase::Compile), Level::TRACE);
        assert_eq!(config.level_for(Phase::Bridge), Level::INFO);
    }

    #[test]
    fn test_apply_override() {
        let mut config = LogConfig::default();
        config.apply_override("history=debug").unwrap();
        assert_eq!(config.level_for(Phase::History), Level::DEBUG);

        assert!(matches!(
            config.apply_override("lexer=debug"),
            Err(LogConfigError::UnknownPhase(name)) if name == "lexer"
        ));
        assert!(matches!(
            config.apply_override("verify"),
            Err(LogConfigError::Malformed(_))
        ));
        assert!(matches!(
            config.apply_override("verify=loud"),
            Err(LogConfigError::InvalidLevel { phase, .. }) if phase == "verify"
        ));
        assert_eq!(config.level_for(Phase::Verify), Level::WARN);
    }
}
