//! Output rendering for check runs and the ruleset listing.
//!
//! Supports `human` (default) and `json` outputs. The JSON form carries
//! per-file diagnostics plus a top-level summary, status, and failure.

use crate::models::{Diagnostic, Severity, Summary};
use crate::orchestrator::RunReport;
use owo_colors::OwoColorize;
use serde_json::json;
use serde_json::Value as JsonVal;
use std::path::{Path, PathBuf};

fn use_colors(output: &str) -> bool {
    output != "json" && std::env::var_os("NO_COLOR").is_none()
}

/// Path shown to the user: relative to the workspace when possible.
pub fn display_path(file: &Path, root: &Path) -> String {
    match pathdiff::diff_paths(file, root) {
        Some(rel) if !rel.starts_with("..") => rel.to_string_lossy().replace('\\', "/"),
        _ => file.to_string_lossy().to_string(),
    }
}

fn severity_label(severity: Severity, color: bool) -> (String, String) {
    let (icon, label) = match severity {
        Severity::Error => ("✖", "⟦error⟧"),
        Severity::Warning => ("▲", "⟦warn⟧"),
        Severity::Info => ("◆", "⟦info⟧"),
    };
    if !color {
        return (icon.to_string(), label.to_string());
    }
    match severity {
        Severity::Error => (icon.red().to_string(), label.red().bold().to_string()),
        Severity::Warning => (icon.yellow().to_string(), label.yellow().bold().to_string()),
        Severity::Info => (icon.blue().to_string(), label.blue().bold().to_string()),
    }
}

/// One human line per diagnostic; positions are printed 1-based.
pub fn format_diagnostic(d: &Diagnostic, root: &Path, color: bool) -> String {
    let (icon, sev) = severity_label(d.severity, color);
    let location = format!(
        "{}:{}:{}",
        display_path(&d.file, root),
        d.range.start.line + 1,
        d.range.start.character + 1
    );
    let location = if color {
        location.bold().to_string()
    } else {
        location
    };
    format!("{icon} {sev} {location} ❲{}❳ {}", d.code.value, d.message)
}

pub fn compose_report_json(report: &RunReport, entries: &[(PathBuf, Vec<Diagnostic>)]) -> JsonVal {
    let files: Vec<_> = entries
        .iter()
        .map(|(file, diagnostics)| json!({ "file": file, "diagnostics": diagnostics }))
        .collect();
    let summary = Summary::tally(entries.len(), entries.iter().flat_map(|(_, d)| d));
    json!({
        "files": files,
        "summary": summary,
        "status": report.status,
        "cancelled": report.cancelled,
        "failure": report.failure,
    })
}

/// Print the diagnostics held for a run together with its summary and status.
pub fn print_report(
    report: &RunReport,
    entries: &[(PathBuf, Vec<Diagnostic>)],
    root: &Path,
    output: &str,
) {
    match output {
        "json" => println!("{}", compose_report_json(report, entries)),
        _ => {
            let color = use_colors(output);
            for (_, diagnostics) in entries {
                for d in diagnostics {
                    println!("{}", format_diagnostic(d, root, color));
                }
            }
            if let Some(failure) = &report.failure {
                if color {
                    eprintln!("{} {}", "error:".red().bold(), failure);
                } else {
                    eprintln!("error: {}", failure);
                }
            }
            let s = Summary::tally(entries.len(), entries.iter().flat_map(|(_, d)| d));
            let summary = format!(
                "Summary: errors={} warnings={} infos={} files={}",
                s.errors, s.warnings, s.infos, s.files
            );
            if color {
                println!("{}", summary.bold());
            } else {
                println!("{}", summary);
            }
            println!("{}", report.status.text());
        }
    }
}

pub fn print_rulesets(rulesets: &[PathBuf], root: &Path, output: &str) {
    match output {
        "json" => println!("{}", json!({ "rulesets": rulesets })),
        _ => {
            for r in rulesets {
                println!("{}", display_path(r, root));
            }
        }
    }
}

/// Configuration errors go to stderr in human mode and stdout in json mode.
pub fn print_error(err: &dyn std::error::Error, output: &str) {
    let message = crate::orchestrator::error_chain(err);
    match output {
        "json" => println!("{}", json!({ "error": message })),
        _ => {
            if use_colors(output) {
                eprintln!("{} {}", "error:".red().bold(), message);
            } else {
                eprintln!("error: {}", message);
            }
        }
    }
}
