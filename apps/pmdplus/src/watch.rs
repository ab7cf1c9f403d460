//! Polling watch mode.
//!
//! Sources under the target are enumerated with `glob` and their
//! modification times compared on every tick. A changed file is fed into
//! its own `Debouncer`, which runs the orchestrator on that file once the
//! configured quiet period passes.

use crate::debounce::Debouncer;
use crate::error::ConfigurationError;
use crate::orchestrator::{Orchestrator, RunReport};
use crate::runner::AnalysisRunner;
use crate::status::language_for_path;
use crate::store::DiagnosticStore;
use glob::{glob, Pattern};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Apex and Visualforce sources picked up in a directory target.
pub const SOURCE_PATTERNS: [&str; 4] = ["**/*.cls", "**/*.trigger", "**/*.page", "**/*.component"];
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Receives every finished run, including configuration failures.
pub type ReportSink = Arc<dyn Fn(Result<RunReport, ConfigurationError>) + Send + Sync>;

/// Sorted source files for `target`; a file target is returned as-is.
pub fn enumerate_sources(target: &Path) -> Vec<PathBuf> {
    if target.is_file() {
        return vec![target.to_path_buf()];
    }
    let root = Pattern::escape(&target.to_string_lossy());
    let mut found = BTreeSet::new();
    for pat in SOURCE_PATTERNS {
        let pattern = format!("{root}/{pat}");
        match glob(&pattern) {
            Ok(paths) => found.extend(paths.flatten().filter(|p| p.is_file())),
            Err(e) => warn!(pattern = %pattern, error = %e, "invalid source pattern"),
        }
    }
    found.into_iter().collect()
}

pub fn modification_times(files: &[PathBuf]) -> HashMap<PathBuf, SystemTime> {
    files
        .iter()
        .filter_map(|f| {
            let modified = fs::metadata(f).and_then(|m| m.modified()).ok()?;
            Some((f.clone(), modified))
        })
        .collect()
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Changes {
    /// New files and files whose mtime moved.
    pub changed: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
}

pub fn diff_times(
    previous: &HashMap<PathBuf, SystemTime>,
    current: &HashMap<PathBuf, SystemTime>,
) -> Changes {
    let mut changes = Changes::default();
    for (path, modified) in current {
        if previous.get(path) != Some(modified) {
            changes.changed.push(path.clone());
        }
    }
    for path in previous.keys() {
        if !current.contains_key(path) {
            changes.removed.push(path.clone());
        }
    }
    changes.changed.sort();
    changes.removed.sort();
    changes
}

pub struct Watcher<S: DiagnosticStore + 'static, R: AnalysisRunner + 'static> {
    orchestrator: Arc<Orchestrator<S, R>>,
    target: PathBuf,
    interval: Duration,
    sink: ReportSink,
    mtimes: HashMap<PathBuf, SystemTime>,
    debouncers: HashMap<PathBuf, Debouncer>,
}

impl<S: DiagnosticStore + 'static, R: AnalysisRunner + 'static> Watcher<S, R> {
    /// Take the baseline snapshot; nothing runs until `run` is called.
    pub fn new(orchestrator: Arc<Orchestrator<S, R>>, target: &Path, sink: ReportSink) -> Self {
        let mtimes = modification_times(&enumerate_sources(target));
        Watcher {
            orchestrator,
            target: target.to_path_buf(),
            interval: DEFAULT_POLL_INTERVAL,
            sink,
            mtimes,
            debouncers: HashMap::new(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn watched(&self) -> usize {
        self.mtimes.len()
    }

    /// Poll until `cancel` fires. Runs the whole target first when
    /// run-on-open is enabled.
    pub async fn run(mut self, cancel: CancellationToken) {
        let settings = self.orchestrator.settings();
        info!(
            target_path = %self.target.display(),
            files = self.mtimes.len(),
            "watching for changes"
        );
        if settings.run_on_file_open {
            let result = self
                .orchestrator
                .run(&self.target, None, Some(cancel.clone()))
                .await;
            (self.sink)(result);
        }
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
            self.poll(&cancel);
        }
        let paths: Vec<_> = self.debouncers.keys().cloned().collect();
        for path in paths {
            self.forget(&path);
        }
        info!("watch stopped");
    }

    /// Drop the file's debouncer. Its task is aborted mid-run, so the run
    /// is cancelled in the orchestrator first to release its registration.
    fn forget(&mut self, path: &Path) {
        if self.debouncers.remove(path).is_some() {
            self.orchestrator.cancel(path);
        }
    }

    fn poll(&mut self, cancel: &CancellationToken) {
        let current = modification_times(&enumerate_sources(&self.target));
        let changes = diff_times(&self.mtimes, &current);
        self.mtimes = current;

        for path in changes.removed {
            debug!(file = %path.display(), "source removed");
            self.forget(&path);
            self.orchestrator.store().delete(&path);
        }

        let settings = self.orchestrator.settings();
        if !(settings.run_on_file_save || settings.run_on_file_change) {
            return;
        }
        for path in changes.changed {
            debug!(file = %path.display(), "source changed");
            self.debouncer_for(&path, settings.debounce, cancel).trigger();
        }
    }

    fn debouncer_for(
        &mut self,
        path: &Path,
        delay: Duration,
        cancel: &CancellationToken,
    ) -> &Debouncer {
        self.debouncers.entry(path.to_path_buf()).or_insert_with(|| {
            let orchestrator = self.orchestrator.clone();
            let sink = self.sink.clone();
            let file = path.to_path_buf();
            let cancel = cancel.clone();
            Debouncer::spawn(delay, cancel.clone(), move || {
                let orchestrator = orchestrator.clone();
                let sink = sink.clone();
                let file = file.clone();
                let cancel = cancel.clone();
                async move {
                    orchestrator
                        .status()
                        .update_for_language(language_for_path(&file));
                    let result = orchestrator.run(&file, None, Some(cancel)).await;
                    sink(result);
                }
            })
        })
    }
}
