//! PMD+ CLI binary entry point.
//! Resolves settings, installs logging, and drives the orchestrator.

use clap::Parser;
use pmdplus::cli::{Cli, Commands};
use pmdplus::config::{self, Settings};
use pmdplus::error::ConfigurationError;
use pmdplus::logging::{init_logging, LoggingConfig, DEFAULT_LOG_LEVEL};
use pmdplus::models::Severity;
use pmdplus::orchestrator::{Orchestrator, ProgressSink, RunReport};
use pmdplus::output;
use pmdplus::status::{language_for_path, StatusIndicator};
use pmdplus::store::MemoryStore;
use pmdplus::validate::RunConfiguration;
use pmdplus::watch::{ReportSink, Watcher};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Logs commit progress as a running percentage.
#[derive(Default)]
struct LogProgress {
    done: Mutex<f64>,
}

impl ProgressSink for LogProgress {
    fn report(&self, message: Option<&str>, increment: Option<f64>) {
        if let Some(m) = message {
            debug!("{}", m.trim_end());
        }
        if let Some(i) = increment {
            let mut done = self.done.lock().unwrap_or_else(|e| e.into_inner());
            *done += i;
            debug!(percent = done.min(100.0), "committing diagnostics");
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    std::process::exit(run(cli).await);
}

async fn run(cli: Cli) -> i32 {
    if let Commands::Version = cli.cmd {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return 0;
    }
    let out = cli.output().to_string();
    let level = cli
        .global
        .log_level
        .clone()
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
    let logging = LoggingConfig {
        level: &level,
        format: cli.global.log_format.unwrap_or_default(),
    };
    if let Err(e) = init_logging(&logging) {
        eprintln!("{e}");
    }

    let settings = match config::resolve_settings(&cli.overrides()) {
        Ok(s) => s,
        Err(e) => {
            output::print_error(&e, &out);
            return 2;
        }
    };

    match cli.cmd {
        Commands::Version => 0,
        Commands::Rulesets { .. } => match RunConfiguration::build(&settings) {
            Ok(cfg) => {
                output::print_rulesets(cfg.rulesets(), &settings.workspace_root, &out);
                0
            }
            Err(e) => {
                output::print_error(&e, &out);
                2
            }
        },
        Commands::Check { target, .. } => {
            let target = resolve_target(target.as_deref(), &settings.workspace_root);
            check(settings, &target, &out).await
        }
        Commands::Watch { target, .. } => {
            let target = resolve_target(target.as_deref(), &settings.workspace_root);
            watch(settings, &target, out).await;
            0
        }
    }
}

/// Relative targets are taken from the current directory; default is the workspace.
fn resolve_target(target: Option<&Path>, workspace_root: &Path) -> PathBuf {
    let Some(t) = target else {
        return workspace_root.to_path_buf();
    };
    let abs = if t.is_absolute() {
        t.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|d| d.join(t))
            .unwrap_or_else(|_| t.to_path_buf())
    };
    abs.canonicalize().unwrap_or(abs)
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let t = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted; cancelling");
            t.cancel();
        }
    });
    token
}

fn status_for(target: &Path) -> Arc<StatusIndicator> {
    let status = Arc::new(StatusIndicator::new(target.is_dir()));
    if target.is_file() {
        status.update_for_language(language_for_path(target));
    }
    status
}

async fn check(settings: Settings, target: &Path, out: &str) -> i32 {
    let root = settings.workspace_root.clone();
    let store = Arc::new(MemoryStore::new());
    let orch = Orchestrator::new(settings, store.clone(), status_for(target));
    let progress = LogProgress::default();

    match orch.run(target, Some(&progress), Some(cancel_on_ctrl_c())).await {
        Ok(report) => {
            let entries = store.snapshot();
            output::print_report(&report, &entries, &root, out);
            let has_errors = entries
                .iter()
                .flat_map(|(_, d)| d)
                .any(|d| d.severity == Severity::Error);
            if has_errors || report.failure.is_some() {
                1
            } else {
                0
            }
        }
        Err(e) => {
            output::print_error(&e, out);
            2
        }
    }
}

async fn watch(settings: Settings, target: &Path, out: String) {
    let root = settings.workspace_root.clone();
    let store = Arc::new(MemoryStore::new());
    let orch = Arc::new(Orchestrator::new(settings, store.clone(), status_for(target)));

    let sink: ReportSink = Arc::new(move |result: Result<RunReport, ConfigurationError>| match result {
        Ok(report) => {
            let entries: Vec<_> = store
                .snapshot()
                .into_iter()
                .filter(|(file, _)| file.starts_with(&report.target))
                .collect();
            output::print_report(&report, &entries, &root, &out);
        }
        Err(e) => output::print_error(&e, &out),
    });

    Watcher::new(orch, target, sink).run(cancel_on_ctrl_c()).await;
}
