//! Configuration for reasoners and external solvers, persisted as TOML.
//!
//! ```toml
//! [reasoner]
//! algorithm = "skolem_chase"
//! timeout_seconds = 60
//!
//! [clingo]
//! binary = "/opt/clingo/bin/clingo"
//! ```

use std::path::Path;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::reasoner::{Algorithm, LogLevel, RuleRewriteStrategy};
use crate::solver::SolverKind;

/// Errors from configuration files.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(chaseward::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {message}")]
    #[diagnostic(
        code(chaseward::config::parse),
        help("Check the TOML syntax and the section names ([reasoner], [clingo], [dlv]).")
    )]
    Parse { path: String, message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(chaseward::config::write),
        help("Ensure you have write permissions to the target directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{field} must be strictly positive")]
    #[diagnostic(
        code(chaseward::config::non_positive_timeout),
        help("Remove the field for no timeout, or give a positive number of seconds.")
    )]
    NonPositiveTimeout { field: &'static str },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Reasoner settings applied before loading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasonerConfig {
    pub algorithm: Algorithm,
    pub rule_rewrite_strategy: RuleRewriteStrategy,
    /// Backend-enforced reasoning timeout. `None` runs to the fixpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
    pub log_level: LogLevel,
}

/// How to launch one external solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    pub binary: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Bound on waiting for the solver to exit. `None` waits indefinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
    /// Drain the solver's stderr on a dedicated thread.
    #[serde(default)]
    pub separate_diagnostics: bool,
}

impl SolverConfig {
    pub fn clingo() -> Self {
        Self {
            binary: "clingo".into(),
            args: vec![
                "--configuration=tweety".into(),
                "--time-limit=30".into(),
                "--quiet=2,2,2".into(),
            ],
            timeout_seconds: None,
            separate_diagnostics: false,
        }
    }

    pub fn dlv() -> Self {
        Self {
            binary: "dlv".into(),
            args: vec!["--stdin".into()],
            timeout_seconds: None,
            separate_diagnostics: true,
        }
    }

    pub fn for_kind(kind: SolverKind) -> Self {
        match kind {
            SolverKind::Clingo => Self::clingo(),
            SolverKind::Dlv => Self::dlv(),
        }
    }

    /// The command line as one string, for logs and error messages.
    pub fn command_line(&self) -> String {
        std::iter::once(self.binary.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChasewardConfig {
    pub reasoner: ReasonerConfig,
    pub clingo: SolverConfig,
    pub dlv: SolverConfig,
}

impl Default for ChasewardConfig {
    fn default() -> Self {
        Self {
            reasoner: ReasonerConfig::default(),
            clingo: SolverConfig::clingo(),
            dlv: SolverConfig::dlv(),
        }
    }
}

impl ChasewardConfig {
    pub fn solver(&self, kind: SolverKind) -> &SolverConfig {
        match kind {
            SolverKind::Clingo => &self.clingo,
            SolverKind::Dlv => &self.dlv,
        }
    }

    /// Reject zero timeouts.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.reasoner.timeout_seconds == Some(0) {
            return Err(ConfigError::NonPositiveTimeout {
                field: "reasoner.timeout_seconds",
            });
        }
        if self.clingo.timeout_seconds == Some(0) {
            return Err(ConfigError::NonPositiveTimeout {
                field: "clingo.timeout_seconds",
            });
        }
        if self.dlv.timeout_seconds == Some(0) {
            return Err(ConfigError::NonPositiveTimeout {
                field: "dlv.timeout_seconds",
            });
        }
        Ok(())
    }

    /// Load and validate a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_solver_command_lines() {
        let config = ChasewardConfig::default();
        assert_eq!(
            config.clingo.command_line(),
            "clingo --configuration=tweety --time-limit=30 --quiet=2,2,2"
        );
        assert_eq!(config.dlv.command_line(), "dlv --stdin");
        assert!(config.dlv.separate_diagnostics);
        assert!(!config.clingo.separate_diagnostics);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: ChasewardConfig = toml::from_str(
            r#"
            [reasoner]
            algorithm = "skolem_chase"
            timeout_seconds = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.reasoner.algorithm, Algorithm::SkolemChase);
        assert_eq!(config.reasoner.timeout_seconds, Some(5));
        assert_eq!(config.reasoner.log_level, LogLevel::Warning);
        assert_eq!(config.clingo, SolverConfig::clingo());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("chaseward.toml");

        let mut config = ChasewardConfig::default();
        config.dlv.binary = "/opt/dlv/dlv".into();
        config.save(&path).unwrap();

        let loaded = ChasewardConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn zero_timeout_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("chaseward.toml");
        std::fs::write(&path, "[reasoner]\ntimeout_seconds = 0\n").unwrap();
        let err = ChasewardConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::NonPositiveTimeout { .. }));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = ChasewardConfig::load(Path::new("/nonexistent/chaseward.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
