//! PMD subprocess execution.
//!
//! The command is built as an argument vector (no shell), stdout and stderr
//! are drained concurrently under a per-stream byte ceiling, and the child is
//! killed as soon as the cancellation token fires.

use crate::error::RunnerError;
use crate::validate::RunConfiguration;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Exit code for a clean run.
pub const EXIT_OK: i32 = 0;
/// Exit code PMD uses when violations were found.
pub const EXIT_VIOLATIONS: i32 = 4;
/// Marker PMD prints on stderr when a ruleset cannot be loaded.
pub const RULESET_FAILURE_MARKER: &str = "Cannot load ruleset";

const PATH_LIST_DELIMITER: &str = if cfg!(windows) { ";" } else { ":" };
const PATH_ENV_KEY: &str = if cfg!(windows) { "Path" } else { "PATH" };
const LAUNCHER: &str = if cfg!(windows) { "pmd.bat" } else { "pmd" };
const READ_CHUNK: usize = 8 * 1024;

static RULESET_FAILURE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"Cannot load ruleset\s+([^:\r\n]+)").ok());

#[derive(Debug, Clone, PartialEq, Eq)]
/// Result of a PMD invocation that did not fail.
pub enum Execution {
    /// The process exited; holds the collected stdout.
    Completed(String),
    /// The token fired before exit and the child was killed.
    Cancelled,
}

/// Seam between the orchestrator and the PMD process.
#[async_trait]
pub trait AnalysisRunner: Send + Sync {
    async fn execute(
        &self,
        target: &Path,
        config: &RunConfiguration,
        cancel: CancellationToken,
    ) -> Result<Execution, RunnerError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Program, arguments, and environment overrides for one PMD run.
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub env: Vec<(OsString, OsString)>,
}

impl CommandSpec {
    /// Build the `pmd check` invocation for `target`.
    pub fn for_target(target: &Path, config: &RunConfiguration) -> Self {
        let program = config.pmd_root().join("bin").join(LAUNCHER);

        let mut args: Vec<OsString> = vec!["check".into(), "--no-progress".into()];
        match config.cache_path() {
            Some(cache) => {
                args.push("--cache".into());
                args.push(cache.into());
            }
            None => args.push("--no-cache".into()),
        }
        args.push("--format".into());
        args.push("csv".into());
        args.push("-d".into());
        args.push(target.into());
        args.push("-R".into());
        args.push(join_os(config.rulesets().iter().map(|p| p.as_os_str()), ","));

        let mut env = vec![(OsString::from("CLASSPATH"), classpath(config))];
        if let Some(jre) = config.jre_path() {
            let mut path = jre.join("bin").into_os_string();
            if let Some(inherited) = std::env::var_os("PATH") {
                path.push(PATH_LIST_DELIMITER);
                path.push(inherited);
            }
            env.push((OsString::from(PATH_ENV_KEY), path));
        }

        CommandSpec { program, args, env }
    }

    /// Shell-quoted rendering for logs only; never executed.
    pub fn display(&self) -> String {
        let words: Vec<String> = std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .map(|w| w.to_string_lossy().into_owned())
            .collect();
        shell_words::join(words)
    }
}

fn classpath(config: &RunConfiguration) -> OsString {
    let wildcard = config.workspace_root().join("*");
    join_os(
        std::iter::once(wildcard.as_os_str())
            .chain(config.additional_class_paths().iter().map(|p| p.as_os_str())),
        PATH_LIST_DELIMITER,
    )
}

fn join_os<'a>(parts: impl Iterator<Item = &'a OsStr>, sep: &str) -> OsString {
    let mut out = OsString::new();
    for (i, p) in parts.enumerate() {
        if i > 0 {
            out.push(sep);
        }
        out.push(p);
    }
    out
}

/// Apply the exit-code policy to a finished process.
///
/// `0` and `4` are successes. Any other code (or a signal, `None`) fails with
/// `RulesetLoad` when stderr carries the ruleset marker, with `Execution`
/// when stdout is empty, and otherwise still returns the partial stdout.
pub fn interpret_exit(
    code: Option<i32>,
    stdout: String,
    stderr: &str,
) -> Result<Execution, RunnerError> {
    if matches!(code, Some(EXIT_OK) | Some(EXIT_VIOLATIONS)) {
        return Ok(Execution::Completed(stdout));
    }
    warn!(code = ?code, "PMD+ got a failed exit code");
    if stderr.contains(RULESET_FAILURE_MARKER) {
        let ruleset = RULESET_FAILURE
            .as_ref()
            .and_then(|re| re.captures(stderr))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string());
        return Err(RunnerError::RulesetLoad { ruleset });
    }
    if stdout.is_empty() {
        return Err(RunnerError::Execution { code });
    }
    Ok(Execution::Completed(stdout))
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    fn label(self) -> &'static str {
        match self {
            Stream::Stdout => "stdout",
            Stream::Stderr => "stderr",
        }
    }

    fn operation(self) -> &'static str {
        match self {
            Stream::Stdout => "read stdout",
            Stream::Stderr => "read stderr",
        }
    }
}

/// Read a stream to the end, logging each chunk verbatim as it arrives.
async fn drain<R>(mut reader: R, stream: Stream, limit: usize) -> Result<String, RunnerError>
where
    R: AsyncRead + Unpin,
{
    let mut collected = Vec::new();
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        let n = reader
            .read(&mut chunk)
            .await
            .map_err(|source| RunnerError::Io {
                operation: stream.operation(),
                source,
            })?;
        if n == 0 {
            break;
        }
        debug!(
            target: "pmdplus::pmd",
            "{}: {}",
            stream.label(),
            String::from_utf8_lossy(&chunk[..n])
        );
        if collected.len() + n > limit {
            return Err(RunnerError::BufferOverflow { limit });
        }
        collected.extend_from_slice(&chunk[..n]);
    }
    Ok(String::from_utf8_lossy(&collected).into_owned())
}

async fn terminate(child: &mut Child) {
    if let Err(e) = child.kill().await {
        debug!(error = %e, "PMD process already gone");
    }
}

fn not_captured(stream: Stream) -> RunnerError {
    RunnerError::Io {
        operation: stream.operation(),
        source: io::Error::new(io::ErrorKind::BrokenPipe, "stream was not captured"),
    }
}

#[derive(Debug, Clone, Copy, Default)]
/// Runs the PMD launcher found under the configured install directory.
pub struct PmdRunner;

#[async_trait]
impl AnalysisRunner for PmdRunner {
    async fn execute(
        &self,
        target: &Path,
        config: &RunConfiguration,
        cancel: CancellationToken,
    ) -> Result<Execution, RunnerError> {
        let spec = CommandSpec::for_target(target, config);
        debug!(command = %spec.display(), "PMD command");
        for (k, v) in &spec.env {
            debug!(key = %k.to_string_lossy(), value = %v.to_string_lossy(), "PMD environment");
        }

        let mut child = Command::new(&spec.program)
            .args(&spec.args)
            .envs(spec.env.iter().map(|(k, v)| (k, v)))
            .current_dir(config.workspace_root())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RunnerError::Spawn {
                program: spec.program.clone(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| not_captured(Stream::Stdout))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| not_captured(Stream::Stderr))?;
        let limit = config.buffer_limit();

        let streams = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            res = async {
                tokio::try_join!(
                    drain(stdout, Stream::Stdout, limit),
                    drain(stderr, Stream::Stderr, limit)
                )
            } => Some(res),
        };
        let (out, err) = match streams {
            None => {
                terminate(&mut child).await;
                return Ok(Execution::Cancelled);
            }
            Some(Err(e)) => {
                terminate(&mut child).await;
                return Err(e);
            }
            Some(Ok(v)) => v,
        };

        let status = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            status = child.wait() => Some(status),
        };
        let status = match status {
            None => {
                terminate(&mut child).await;
                return Ok(Execution::Cancelled);
            }
            Some(s) => s.map_err(|source| RunnerError::Io {
                operation: "wait for PMD",
                source,
            })?,
        };

        interpret_exit(status.code(), out, &err)
    }
}
