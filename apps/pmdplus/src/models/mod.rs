//! Shared data models for parsed PMD output and committed diagnostics.

pub mod batch;
pub mod violation;

pub use batch::DiagnosticBatch;
pub use violation::ViolationRecord;

use serde::Serialize;
use std::path::PathBuf;

/// Source tag attached to every diagnostic.
pub const DIAGNOSTIC_SOURCE: &str = "PMD+";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
/// Diagnostic severity derived from a PMD priority.
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    /// Classify a PMD priority (1 = most severe) against the configured thresholds.
    ///
    /// `p <= error` is an error, `error < p <= warn` a warning, anything else info.
    pub fn classify(priority: i64, error_threshold: i64, warn_threshold: i64) -> Self {
        if priority <= error_threshold {
            Severity::Error
        } else if priority <= warn_threshold {
            Severity::Warning
        } else {
            Severity::Info
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
/// Zero-based line/character position.
pub struct Position {
    pub line: usize,
    pub character: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Rule identifier plus the documentation page it links to.
pub struct RuleCode {
    pub value: String,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// A single diagnostic ready to hand to a diagnostic store.
pub struct Diagnostic {
    pub file: PathBuf,
    pub range: Range,
    pub message: String,
    pub severity: Severity,
    pub code: RuleCode,
    pub source: &'static str,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
/// Aggregated counts used by printers.
pub struct Summary {
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
    pub files: usize,
}

impl Summary {
    pub fn tally<'a>(files: usize, diagnostics: impl IntoIterator<Item = &'a Diagnostic>) -> Self {
        let mut summary = Summary {
            files,
            ..Summary::default()
        };
        for d in diagnostics {
            match d.severity {
                Severity::Error => summary.errors += 1,
                Severity::Warning => summary.warnings += 1,
                Severity::Info => summary.infos += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.errors + self.warnings + self.infos
    }
}
