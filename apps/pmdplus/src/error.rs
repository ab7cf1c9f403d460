//! Error types for settings, validation, PMD execution, and CSV parsing.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Raised before any subprocess starts when the run configuration is unusable.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// None of the configured rulesets resolved to an existing file.
    #[error("PMD+ could not find any valid rulesets in the configuration")]
    NoValidRulesets,
    /// The PMD install directory does not exist.
    #[error("PMD+ could not find or access the PMD executable at {}", path.display())]
    ExecutableNotFound {
        /// Directory that was checked.
        path: PathBuf,
    },
}

/// Failures of a single PMD invocation.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The launcher could not be started.
    #[error("failed to start {}", program.display())]
    Spawn {
        /// Launcher that was invoked.
        program: PathBuf,
        /// Underlying OS error.
        source: io::Error,
    },
    /// PMD exited abnormally and reported a ruleset it could not load.
    #[error("PMD+ failed to execute PMD due to a problem with a ruleset{}. Please read the logs for details.", ruleset.as_deref().map(|r| format!(" ({r})")).unwrap_or_default())]
    RulesetLoad {
        /// Ruleset named in stderr, when it could be extracted.
        ruleset: Option<String>,
    },
    /// PMD exited abnormally without producing any output.
    #[error("PMD+ failed to execute PMD (exit code {}). Please read the logs for details.", code.map_or_else(|| "none".to_string(), |c| c.to_string()))]
    Execution {
        /// Exit code, absent when the process was terminated by a signal.
        code: Option<i32>,
    },
    /// One of the output streams exceeded the configured buffer.
    #[error("PMD output exceeded the {limit} byte buffer")]
    BufferOverflow {
        /// Ceiling in bytes.
        limit: usize,
    },
    /// Reading a stream or waiting on the child failed.
    #[error("PMD process I/O failed during {operation}")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Source IO error.
        source: io::Error,
    },
}

/// The PMD output could not be tokenized at all.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The CSV reader rejected the input.
    #[error("failed to parse PMD results")]
    Csv(#[from] csv::Error),
}

/// Failures while loading a `pmdplus.{toml,yaml,yml}` file.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The config file exists but could not be read.
    #[error("failed to read {}", path.display())]
    Read {
        /// Config file path.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// The TOML document is invalid.
    #[error("{} is not valid TOML", path.display())]
    Toml {
        /// Config file path.
        path: PathBuf,
        /// Parser error.
        source: toml::de::Error,
    },
    /// The YAML document is invalid.
    #[error("{} is not valid YAML", path.display())]
    Yaml {
        /// Config file path.
        path: PathBuf,
        /// Parser error.
        source: serde_yaml::Error,
    },
}

/// Top-level error used by the binary.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Runner(#[from] RunnerError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
