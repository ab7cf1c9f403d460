//! Run orchestration: validate, execute PMD, parse, and commit diagnostics.
//!
//! One run moves through `Validating → Running → {Committing | Clearing}`.
//! Configuration errors are returned to the caller; runner and parser
//! failures are logged, recorded on the `RunReport`, and turned into a
//! diagnostics clear for the target plus an OK status.

use crate::config::Settings;
use crate::error::{ConfigurationError, Error};
use crate::models::Summary;
use crate::parser;
use crate::runner::{AnalysisRunner, Execution, PmdRunner};
use crate::status::{StatusIndicator, StatusState};
use crate::store::DiagnosticStore;
use crate::validate::RunConfiguration;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Receives progress updates; `increment` is a percentage of the commit phase.
pub trait ProgressSink: Send + Sync {
    fn report(&self, message: Option<&str>, increment: Option<f64>);
}

/// Per-run state owned by the orchestrator.
pub struct RunContext<'a> {
    target: PathBuf,
    progress: Option<&'a dyn ProgressSink>,
    token: CancellationToken,
    cancelled: bool,
}

impl<'a> RunContext<'a> {
    fn new(target: &Path, progress: Option<&'a dyn ProgressSink>, token: CancellationToken) -> Self {
        RunContext {
            target: target.to_path_buf(),
            progress,
            token,
            cancelled: false,
        }
    }

    /// Latch the token state; the flag is set once and never reset.
    fn observe_cancellation(&mut self) -> bool {
        if !self.cancelled && self.token.is_cancelled() {
            self.cancelled = true;
            info!(target_path = %self.target.display(), "PMD+ run cancelled");
        }
        self.cancelled
    }

    fn report(&self, message: Option<&str>, increment: Option<f64>) {
        if let Some(p) = self.progress {
            p.report(message, increment);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Outcome of one run as observed by the caller.
pub struct RunReport {
    pub target: PathBuf,
    pub files_committed: usize,
    pub issues_committed: usize,
    pub summary: Summary,
    pub status: StatusState,
    pub cancelled: bool,
    /// Cancelled because a newer run on the same target took over.
    pub superseded: bool,
    /// Runner or parser failure that was swallowed into a clear.
    pub failure: Option<String>,
}

impl RunReport {
    fn new(target: &Path) -> Self {
        RunReport {
            target: target.to_path_buf(),
            files_committed: 0,
            issues_committed: 0,
            summary: Summary::default(),
            status: StatusState::Ok,
            cancelled: false,
            superseded: false,
            failure: None,
        }
    }
}

/// Active runs keyed by target; a newer run cancels the older one.
#[derive(Debug, Default)]
struct RunRegistry {
    next_id: AtomicU64,
    active: Mutex<HashMap<PathBuf, (u64, CancellationToken)>>,
}

impl RunRegistry {
    fn register(&self, target: &Path, token: CancellationToken) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if let Some((old_id, old)) = active.insert(target.to_path_buf(), (id, token)) {
            debug!(target_path = %target.display(), superseded = old_id, "cancelling older run");
            old.cancel();
        }
        id
    }

    fn is_current(&self, target: &Path, id: u64) -> bool {
        let active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        active.get(target).is_some_and(|(cur, _)| *cur == id)
    }

    fn cancel(&self, target: &Path) -> bool {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        match active.remove(target) {
            Some((_, token)) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    fn len(&self) -> usize {
        self.active.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn release(&self, target: &Path, id: u64) {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if active.get(target).is_some_and(|(cur, _)| *cur == id) {
            active.remove(target);
        }
    }
}

/// Render an error and its source chain on one line.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut cur = err.source();
    while let Some(e) = cur {
        out.push_str(": ");
        out.push_str(&e.to_string());
        cur = e.source();
    }
    out
}

pub struct Orchestrator<S: DiagnosticStore, R: AnalysisRunner = PmdRunner> {
    settings: RwLock<Arc<Settings>>,
    runner: R,
    store: Arc<S>,
    status: Arc<StatusIndicator>,
    registry: RunRegistry,
}

impl<S: DiagnosticStore> Orchestrator<S, PmdRunner> {
    pub fn new(settings: Settings, store: Arc<S>, status: Arc<StatusIndicator>) -> Self {
        Self::with_runner(settings, PmdRunner, store, status)
    }
}

impl<S: DiagnosticStore, R: AnalysisRunner> Orchestrator<S, R> {
    pub fn with_runner(
        settings: Settings,
        runner: R,
        store: Arc<S>,
        status: Arc<StatusIndicator>,
    ) -> Self {
        Orchestrator {
            settings: RwLock::new(Arc::new(settings)),
            runner,
            store,
            status,
            registry: RunRegistry::default(),
        }
    }

    /// Current settings snapshot.
    pub fn settings(&self) -> Arc<Settings> {
        self.settings
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Swap in new settings; runs already in flight keep their snapshot.
    pub fn replace_settings(&self, settings: Settings) {
        *self.settings.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(settings);
    }

    pub fn status(&self) -> &Arc<StatusIndicator> {
        &self.status
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Cancel and forget the active run on `target`, if any.
    ///
    /// Used when the caller drops a run future without awaiting it to
    /// completion, so the registry does not keep its entry.
    pub fn cancel(&self, target: &Path) -> bool {
        self.registry.cancel(target)
    }

    /// Number of targets with a run in flight.
    pub fn active_runs(&self) -> usize {
        self.registry.len()
    }

    /// Analyse `target` (a file or the workspace root) and commit the results.
    ///
    /// Only configuration errors are returned; everything else ends in a
    /// clean state and is described by the report.
    pub async fn run(
        &self,
        target: &Path,
        progress: Option<&dyn ProgressSink>,
        cancel: Option<CancellationToken>,
    ) -> Result<RunReport, ConfigurationError> {
        let settings = self.settings();
        let config = RunConfiguration::build(&settings).map_err(|e| {
            error!(target_path = %target.display(), error = %e, "PMD+ configuration is invalid");
            self.status.ok();
            e
        })?;

        let token = cancel.map(|c| c.child_token()).unwrap_or_default();
        let run_id = self.registry.register(target, token.clone());
        let mut ctx = RunContext::new(target, progress, token);

        info!(
            " ================== Starting PMD+ analysis of {} ================== ",
            target.display()
        );
        self.status.thinking();

        let report = self.execute(&mut ctx, &config, run_id).await;
        self.registry.release(target, run_id);
        Ok(report)
    }

    async fn execute(
        &self,
        ctx: &mut RunContext<'_>,
        config: &RunConfiguration,
        run_id: u64,
    ) -> RunReport {
        let mut report = RunReport::new(&ctx.target);

        let output = match self
            .runner
            .execute(&ctx.target, config, ctx.token.clone())
            .await
        {
            Ok(Execution::Completed(out)) => out,
            Ok(Execution::Cancelled) => return self.stand_down(ctx, report, run_id),
            Err(e) => return self.fail(ctx, report, run_id, e.into()),
        };

        let batch = match parser::parse(&output, config).await {
            Ok(b) => b,
            Err(e) => return self.fail(ctx, report, run_id, e.into()),
        };

        // A newer run may have registered while this one was parsing
        if ctx.observe_cancellation() || !self.registry.is_current(&ctx.target, run_id) {
            return self.stand_down(ctx, report, run_id);
        }

        if batch.is_empty() {
            self.store.delete(&ctx.target);
            self.status.ok();
            report.status = self.status.state();
            return report;
        }

        self.status.errors();
        ctx.report(
            Some(format!("PMD+ is processing {} issues. ", batch.issue_count()).as_str()),
            None,
        );
        let increment = 100.0 / batch.len() as f64;
        let mut committed = Vec::new();
        for (file, diagnostics) in batch {
            if ctx.observe_cancellation() {
                break;
            }
            ctx.report(None, Some(increment));
            committed.extend(diagnostics.iter().cloned());
            report.files_committed += 1;
            self.store.set(&file, diagnostics);
        }

        report.summary = Summary::tally(report.files_committed, &committed);
        report.issues_committed = report.summary.total();
        report.cancelled = ctx.cancelled;
        report.superseded = ctx.cancelled && !self.registry.is_current(&ctx.target, run_id);
        report.status = self.status.state();
        report
    }

    /// End a cancelled run without committing or clearing. Only a run that
    /// is still current resets the status.
    fn stand_down(
        &self,
        ctx: &mut RunContext<'_>,
        mut report: RunReport,
        run_id: u64,
    ) -> RunReport {
        report.cancelled = ctx.observe_cancellation();
        report.superseded = !self.registry.is_current(&ctx.target, run_id);
        if !report.superseded {
            self.status.ok();
        }
        report.status = self.status.state();
        report
    }

    fn fail(
        &self,
        ctx: &RunContext<'_>,
        mut report: RunReport,
        run_id: u64,
        err: Error,
    ) -> RunReport {
        let chain = error_chain(&err);
        error!(target_path = %ctx.target.display(), error = %chain, "PMD+ run failed; clearing diagnostics");
        if self.registry.is_current(&ctx.target, run_id) {
            self.store.delete(&ctx.target);
            self.status.ok();
        }
        report.status = self.status.state();
        report.failure = Some(chain);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RunnerError;
    use crate::models::{Diagnostic, Position, Range, RuleCode, Severity, DIAGNOSTIC_SOURCE};
    use crate::store::MemoryStore;
    use crate::validate::testing;
    use async_trait::async_trait;
    use std::fs;
    use std::sync::atomic::AtomicUsize;
    use tempfile::tempdir;

    const HEADER: &str =
        "\"Problem\",\"Package\",\"File\",\"Priority\",\"Line\",\"Description\",\"Rule set\",\"Rule\"\n";

    type Respond = Box<dyn Fn(usize) -> Result<Execution, RunnerError> + Send + Sync>;

    struct CannedRunner {
        calls: AtomicUsize,
        respond: Respond,
    }

    impl CannedRunner {
        fn new(f: impl Fn(usize) -> Result<Execution, RunnerError> + Send + Sync + 'static) -> Self {
            CannedRunner {
                calls: AtomicUsize::new(0),
                respond: Box::new(f),
            }
        }
    }

    #[async_trait]
    impl AnalysisRunner for CannedRunner {
        async fn execute(
            &self,
            _target: &Path,
            _config: &RunConfiguration,
            _cancel: CancellationToken,
        ) -> Result<Execution, RunnerError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            (self.respond)(n)
        }
    }

    /// Blocks the first call until cancelled; later calls answer at once.
    struct BlockingFirstRunner {
        calls: AtomicUsize,
        output: String,
    }

    #[async_trait]
    impl AnalysisRunner for BlockingFirstRunner {
        async fn execute(
            &self,
            _target: &Path,
            _config: &RunConfiguration,
            cancel: CancellationToken,
        ) -> Result<Execution, RunnerError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                cancel.cancelled().await;
                return Ok(Execution::Cancelled);
            }
            Ok(Execution::Completed(self.output.clone()))
        }
    }

    /// First call finishes only once released, ignoring its token, so it
    /// returns after a later run has already committed.
    struct GatedRunner {
        calls: AtomicUsize,
        release: tokio::sync::Notify,
        first: String,
        later: String,
    }

    #[async_trait]
    impl AnalysisRunner for GatedRunner {
        async fn execute(
            &self,
            _target: &Path,
            _config: &RunConfiguration,
            _cancel: CancellationToken,
        ) -> Result<Execution, RunnerError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                self.release.notified().await;
                return Ok(Execution::Completed(self.first.clone()));
            }
            Ok(Execution::Completed(self.later.clone()))
        }
    }

    /// Cancels the run token after a fixed number of commits.
    struct CancellingStore {
        inner: MemoryStore,
        after: usize,
        sets: AtomicUsize,
        token: CancellationToken,
    }

    impl DiagnosticStore for CancellingStore {
        fn set(&self, path: &Path, diagnostics: Vec<Diagnostic>) {
            self.inner.set(path, diagnostics);
            if self.sets.fetch_add(1, Ordering::SeqCst) + 1 == self.after {
                self.token.cancel();
            }
        }
        fn delete(&self, path: &Path) {
            self.inner.delete(path);
        }
        fn clear(&self) {
            self.inner.clear();
        }
    }

    #[derive(Default)]
    struct RecordingProgress {
        messages: Mutex<Vec<String>>,
        increments: Mutex<Vec<f64>>,
    }

    impl ProgressSink for RecordingProgress {
        fn report(&self, message: Option<&str>, increment: Option<f64>) {
            if let Some(m) = message {
                self.messages.lock().unwrap().push(m.to_string());
            }
            if let Some(i) = increment {
                self.increments.lock().unwrap().push(i);
            }
        }
    }

    fn source_files(root: &Path, names: &[&str]) -> (Vec<PathBuf>, String) {
        let mut raw = HEADER.to_string();
        let mut paths = Vec::new();
        for (i, name) in names.iter().enumerate() {
            let path = root.join(name);
            fs::write(&path, "public class X {\n  void y() {}\n}\n").unwrap();
            raw.push_str(&format!(
                "\"{i}\",\"\",\"{}\",\"1\",\"2\",\"desc\",\"Design\",\"Rule{i}\"\n",
                path.display()
            ));
            paths.push(path);
        }
        (paths, raw)
    }

    fn stale(file: &Path) -> Diagnostic {
        let p = Position {
            line: 0,
            character: 0,
        };
        Diagnostic {
            file: file.to_path_buf(),
            range: Range { start: p, end: p },
            message: "stale".into(),
            severity: Severity::Error,
            code: RuleCode {
                value: "Old".into(),
                target: String::new(),
            },
            source: DIAGNOSTIC_SOURCE,
        }
    }

    #[tokio::test]
    async fn test_issues_found_commits_in_order_and_sets_error_status() {
        let dir = tempdir().unwrap();
        let settings = testing::workspace(dir.path());
        let (paths, raw) = source_files(dir.path(), &["A.cls", "B.cls"]);
        let store = Arc::new(MemoryStore::new());
        let status = Arc::new(StatusIndicator::new(true));
        let orch = Orchestrator::with_runner(
            settings,
            CannedRunner::new(move |_| Ok(Execution::Completed(raw.clone()))),
            store.clone(),
            status.clone(),
        );
        let progress = RecordingProgress::default();

        let report = orch.run(dir.path(), Some(&progress), None).await.unwrap();
        assert_eq!(report.files_committed, 2);
        assert_eq!(report.issues_committed, 2);
        assert_eq!(report.summary.errors, 2);
        assert_eq!(report.status, StatusState::Error);
        assert_eq!(status.state(), StatusState::Error);
        assert!(status.is_visible());
        assert!(store.get(&paths[0]).is_some());
        assert!(store.get(&paths[1]).is_some());
        assert_eq!(
            progress.messages.lock().unwrap().as_slice(),
            ["PMD+ is processing 2 issues. "]
        );
        assert_eq!(progress.increments.lock().unwrap().as_slice(), [50.0, 50.0]);
    }

    #[tokio::test]
    async fn test_header_only_clears_target_and_sets_ok() {
        let dir = tempdir().unwrap();
        let settings = testing::workspace(dir.path());
        let target = dir.path().join("A.cls");
        let store = Arc::new(MemoryStore::new());
        store.set(&target, vec![stale(&target)]);
        let status = Arc::new(StatusIndicator::new(true));
        status.errors();
        let orch = Orchestrator::with_runner(
            settings,
            CannedRunner::new(|_| Ok(Execution::Completed(HEADER.to_string()))),
            store.clone(),
            status.clone(),
        );

        let report = orch.run(&target, None, None).await.unwrap();
        assert_eq!(report.status, StatusState::Ok);
        assert_eq!(status.state(), StatusState::Ok);
        assert!(store.get(&target).is_none());
        assert!(report.failure.is_none());
    }

    #[tokio::test]
    async fn test_runner_failure_clears_and_is_reported_not_raised() {
        let dir = tempdir().unwrap();
        let settings = testing::workspace(dir.path());
        let target = dir.path().join("A.cls");
        let store = Arc::new(MemoryStore::new());
        store.set(&target, vec![stale(&target)]);
        let status = Arc::new(StatusIndicator::new(true));
        let orch = Orchestrator::with_runner(
            settings,
            CannedRunner::new(|_| {
                Err(RunnerError::RulesetLoad {
                    ruleset: Some("bad.xml".into()),
                })
            }),
            store.clone(),
            status.clone(),
        );

        let report = orch.run(&target, None, None).await.unwrap();
        assert!(store.get(&target).is_none());
        assert_eq!(status.state(), StatusState::Ok);
        assert!(report.failure.unwrap().contains("bad.xml"));
    }

    #[tokio::test]
    async fn test_configuration_error_is_raised_and_runner_untouched() {
        let dir = tempdir().unwrap();
        let mut settings = testing::workspace(dir.path());
        settings.rulesets = vec!["missing.xml".into()];
        let target = dir.path().join("A.cls");
        let store = Arc::new(MemoryStore::new());
        store.set(&target, vec![stale(&target)]);
        let status = Arc::new(StatusIndicator::new(true));
        status.errors();
        let orch = Orchestrator::with_runner(
            settings,
            CannedRunner::new(|_| Ok(Execution::Completed(String::new()))),
            store.clone(),
            status.clone(),
        );

        let err = orch.run(&target, None, None).await.unwrap_err();
        assert!(matches!(err, ConfigurationError::NoValidRulesets));
        assert_eq!(orch.runner.calls.load(Ordering::SeqCst), 0);
        assert!(store.get(&target).is_some());
        assert_eq!(status.state(), StatusState::Ok);
    }

    #[tokio::test]
    async fn test_cancel_after_n_of_m_commits() {
        let dir = tempdir().unwrap();
        let settings = testing::workspace(dir.path());
        let (paths, raw) = source_files(dir.path(), &["A.cls", "B.cls", "C.cls", "D.cls"]);
        let token = CancellationToken::new();
        let store = Arc::new(CancellingStore {
            inner: MemoryStore::new(),
            after: 2,
            sets: AtomicUsize::new(0),
            token: token.clone(),
        });
        let orch = Orchestrator::with_runner(
            settings,
            CannedRunner::new(move |_| Ok(Execution::Completed(raw.clone()))),
            store.clone(),
            Arc::new(StatusIndicator::new(true)),
        );

        let report = orch.run(dir.path(), None, Some(token)).await.unwrap();
        assert!(report.cancelled);
        assert_eq!(report.files_committed, 2);
        assert_eq!(store.sets.load(Ordering::SeqCst), 2);
        assert!(store.inner.get(&paths[0]).is_some());
        assert!(store.inner.get(&paths[1]).is_some());
        assert!(store.inner.get(&paths[2]).is_none());
        assert!(store.inner.get(&paths[3]).is_none());
    }

    #[tokio::test]
    async fn test_cancelled_execution_commits_nothing() {
        let dir = tempdir().unwrap();
        let settings = testing::workspace(dir.path());
        let target = dir.path().join("A.cls");
        let store = Arc::new(MemoryStore::new());
        store.set(&target, vec![stale(&target)]);
        let orch = Orchestrator::with_runner(
            settings,
            CannedRunner::new(|_| Ok(Execution::Cancelled)),
            store.clone(),
            Arc::new(StatusIndicator::new(true)),
        );
        let token = CancellationToken::new();
        token.cancel();

        let report = orch.run(&target, None, Some(token)).await.unwrap();
        assert!(report.cancelled);
        assert!(!report.superseded);
        assert_eq!(report.status, StatusState::Ok);
        assert_eq!(store.get(&target).unwrap()[0].message, "stale");
    }

    #[tokio::test]
    async fn test_newer_run_on_same_target_supersedes_older() {
        let dir = tempdir().unwrap();
        let settings = testing::workspace(dir.path());
        let (paths, raw) = source_files(dir.path(), &["A.cls"]);
        let store = Arc::new(MemoryStore::new());
        let status = Arc::new(StatusIndicator::new(true));
        let orch = Orchestrator::with_runner(
            settings,
            BlockingFirstRunner {
                calls: AtomicUsize::new(0),
                output: raw,
            },
            store.clone(),
            status.clone(),
        );

        let (first, second) = tokio::join!(
            orch.run(&paths[0], None, None),
            orch.run(&paths[0], None, None)
        );
        let (first, second) = (first.unwrap(), second.unwrap());
        // Whichever run started first blocks until the other one supersedes it
        let (older, newer) = if first.cancelled {
            (first, second)
        } else {
            (second, first)
        };
        assert!(older.cancelled);
        assert!(older.superseded);
        assert!(!newer.cancelled);
        assert_eq!(newer.files_committed, 1);
        assert!(store.get(&paths[0]).is_some());
        assert_eq!(status.state(), StatusState::Error);
    }

    async fn superseded_after_runner_returned(first: String) {
        let dir = tempdir().unwrap();
        let settings = testing::workspace(dir.path());
        let (paths, raw) = source_files(dir.path(), &["A.cls"]);
        let store = Arc::new(MemoryStore::new());
        let status = Arc::new(StatusIndicator::new(true));
        let orch = Arc::new(Orchestrator::with_runner(
            settings,
            GatedRunner {
                calls: AtomicUsize::new(0),
                release: tokio::sync::Notify::new(),
                first,
                later: raw,
            },
            store.clone(),
            status.clone(),
        ));

        let file = paths[0].clone();
        let older = tokio::spawn({
            let orch = orch.clone();
            let file = file.clone();
            async move { orch.run(&file, None, None).await }
        });
        while orch.runner.calls.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let newer = orch.run(&file, None, None).await.unwrap();
        assert_eq!(newer.files_committed, 1);
        orch.runner.release.notify_one();
        let older = older.await.unwrap().unwrap();

        assert!(older.superseded);
        assert!(older.cancelled);
        assert_eq!(older.files_committed, 0);
        assert!(store.get(&file).is_some());
        assert_eq!(status.state(), StatusState::Error);
        assert_eq!(orch.active_runs(), 0);
    }

    #[tokio::test]
    async fn test_stale_empty_result_keeps_newer_diagnostics() {
        superseded_after_runner_returned(HEADER.to_string()).await;
    }

    #[tokio::test]
    async fn test_stale_issue_result_commits_nothing() {
        let dir = tempdir().unwrap();
        let (_, raw) = source_files(dir.path(), &["Other.cls"]);
        superseded_after_runner_returned(raw).await;
    }

    #[tokio::test]
    async fn test_cancel_forgets_active_run() {
        let dir = tempdir().unwrap();
        let settings = testing::workspace(dir.path());
        let target = dir.path().join("A.cls");
        let orch = Arc::new(Orchestrator::with_runner(
            settings,
            BlockingFirstRunner {
                calls: AtomicUsize::new(0),
                output: HEADER.to_string(),
            },
            Arc::new(MemoryStore::new()),
            Arc::new(StatusIndicator::new(true)),
        ));
        let task = tokio::spawn({
            let orch = orch.clone();
            let target = target.clone();
            async move { orch.run(&target, None, None).await }
        });
        while orch.active_runs() == 0 {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        assert!(orch.cancel(&target));
        assert_eq!(orch.active_runs(), 0);
        assert!(!orch.cancel(&target));
        let report = task.await.unwrap().unwrap();
        assert!(report.cancelled);
    }

    #[tokio::test]
    async fn test_replaced_settings_apply_to_next_run() {
        let dir = tempdir().unwrap();
        let settings = testing::workspace(dir.path());
        let mut broken = settings.clone();
        broken.pmd_root = dir.path().join("gone");
        let orch = Orchestrator::with_runner(
            settings,
            CannedRunner::new(|_| Ok(Execution::Completed(HEADER.to_string()))),
            Arc::new(MemoryStore::new()),
            Arc::new(StatusIndicator::new(true)),
        );
        assert!(orch.run(dir.path(), None, None).await.is_ok());
        orch.replace_settings(broken);
        assert!(matches!(
            orch.run(dir.path(), None, None).await,
            Err(ConfigurationError::ExecutableNotFound { .. })
        ));
    }

    #[test]
    fn test_error_chain_includes_sources() {
        let err = Error::from(RunnerError::Io {
            operation: "read stdout",
            source: std::io::Error::new(std::io::ErrorKind::Other, "pipe closed"),
        });
        let chain = error_chain(&err);
        assert!(chain.contains("read stdout"));
        assert!(chain.ends_with("pipe closed"));
    }
}
