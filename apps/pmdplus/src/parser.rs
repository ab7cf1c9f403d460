//! PMD CSV report parsing.
//!
//! Turns the raw report into a `DiagnosticBatch`: rows for ignored files or
//! tooling directories are dropped, priorities are classified against the
//! configured thresholds, and each diagnostic spans its source line from the
//! first non-whitespace character to the end of the line.

use crate::error::ParseError;
use crate::models::{
    Diagnostic, DiagnosticBatch, Position, Range, RuleCode, Severity, ViolationRecord,
    DIAGNOSTIC_SOURCE,
};
use crate::validate::RunConfiguration;
use csv::{ReaderBuilder, StringRecord};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info};

/// Paths containing this marker belong to Salesforce CLI tooling and are never reported.
pub const TOOLING_DIR_MARKER: &str = ".sfdx";

/// Split the report into records, skipping the header line.
///
/// Rows with a different column count are kept; only a tokenizer failure
/// is an error.
pub fn tokenize(raw: &str) -> Result<Vec<StringRecord>, ParseError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(raw.as_bytes());
    let records = reader.records().collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

/// Source lines read during one parse call, keyed by reported path.
#[derive(Default)]
struct SourceCache {
    files: HashMap<String, Option<Vec<String>>>,
}

impl SourceCache {
    async fn line(&mut self, file: &str, index: usize) -> Option<&str> {
        if !self.files.contains_key(file) {
            let lines = match tokio::fs::read_to_string(file).await {
                Ok(text) => Some(text.lines().map(str::to_string).collect()),
                Err(e) => {
                    debug!(file, error = %e, "could not read source file");
                    None
                }
            };
            self.files.insert(file.to_string(), lines);
        }
        self.files
            .get(file)?
            .as_ref()?
            .get(index)
            .map(String::as_str)
    }
}

/// Span from the first non-whitespace character to the end of the line.
/// A blank line yields an empty span at its end.
pub fn line_range(line: usize, text: &str) -> Range {
    let len = text.chars().count();
    let first = text
        .chars()
        .position(|c| !c.is_whitespace())
        .unwrap_or(len);
    Range {
        start: Position {
            line,
            character: first,
        },
        end: Position {
            line,
            character: len,
        },
    }
}

/// Parse a PMD CSV report into per-file diagnostics.
pub async fn parse(raw: &str, config: &RunConfiguration) -> Result<DiagnosticBatch, ParseError> {
    let records = tokenize(raw)?;
    let mut batch = DiagnosticBatch::new();
    let mut sources = SourceCache::default();

    for record in &records {
        let Some(violation) = ViolationRecord::from_record(record) else {
            debug!(row = ?record, "skipping malformed PMD row");
            continue;
        };
        if config.ignore().is_ignored(&violation.file)
            || violation.file.contains(TOOLING_DIR_MARKER)
        {
            continue;
        }
        let Some(index) = violation.line.checked_sub(1) else {
            debug!(file = %violation.file, "skipping PMD row with line 0");
            continue;
        };
        let Some(text) = sources.line(&violation.file, index).await else {
            debug!(
                file = %violation.file,
                line = violation.line,
                "skipping PMD row outside readable source"
            );
            continue;
        };
        let range = line_range(index, text);
        batch.push(Diagnostic {
            file: PathBuf::from(&violation.file),
            range,
            message: violation.message(),
            severity: Severity::classify(
                violation.priority,
                config.error_threshold(),
                config.warn_threshold(),
            ),
            code: RuleCode {
                value: violation.rule.clone(),
                target: violation.documentation_url(),
            },
            source: DIAGNOSTIC_SOURCE,
        });
    }

    info!("PMD+ found {} issues.", batch.issue_count());
    Ok(batch)
}
