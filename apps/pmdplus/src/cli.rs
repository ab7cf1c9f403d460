//! CLI argument parsing via `clap`.

use crate::config::CliOverrides;
use crate::logging::LogFormat;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "pmdplus",
    version,
    about = "PMD+ (PMD static analysis for Salesforce Apex and Visualforce)",
    long_about = "PMD+ runs the PMD analyzer over Apex and Visualforce sources and reports its findings as diagnostics.\n\nConfiguration precedence: CLI > pmdplus.toml/pmdplus.yaml > defaults.",
    after_help = "Examples:\n  pmdplus check force-app\n  pmdplus check force-app/main/default/classes/Foo.cls --output json\n  pmdplus watch . --debounce-ms 1000\n  pmdplus rulesets --ruleset rulesets/custom.xml",
    arg_required_else_help = true
)]
/// Top-level CLI options and subcommands.
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Args, Debug, Clone, Default)]
/// Flags shared by every subcommand.
pub struct GlobalArgs {
    #[arg(long, global = true, help = "Workspace root (default: detected from current dir)")]
    pub workspace_root: Option<PathBuf>,
    #[arg(long, global = true, help = "Directory holding the bundled bin/pmd and rulesets/")]
    pub bundle_root: Option<PathBuf>,
    #[arg(long, global = true, help = "Output mode: human|json (default: human)")]
    pub output: Option<String>,
    #[arg(long, global = true, help = "Log level when RUST_LOG is unset (default: info)")]
    pub log_level: Option<String>,
    #[arg(long, global = true, value_enum, help = "Log format: pretty|json (default: pretty)")]
    pub log_format: Option<LogFormat>,
}

#[derive(Args, Debug, Clone, Default)]
/// Overrides for the analysis settings.
pub struct RunArgs {
    #[arg(long = "ruleset", help = "Ruleset path or `default` (repeatable)")]
    pub rulesets: Vec<String>,
    #[arg(long, help = "PMD install directory (holds bin/pmd)")]
    pub pmd: Option<PathBuf>,
    #[arg(long, help = "Java runtime directory to put first on PATH")]
    pub jre: Option<PathBuf>,
    #[arg(long, action = clap::ArgAction::SetTrue, help = "Disable the PMD incremental cache")]
    pub no_cache: bool,
    #[arg(long, help = "Highest priority reported as an error (default: 2)")]
    pub error_threshold: Option<i64>,
    #[arg(long, help = "Highest priority reported as a warning (default: 4)")]
    pub warn_threshold: Option<i64>,
    #[arg(long, help = "Per-stream output buffer in MiB (default: 64)")]
    pub buffer_mib: Option<usize>,
}

#[derive(Subcommand)]
/// Supported subcommands.
pub enum Commands {
    /// Show version
    #[command(about = "Show version", long_about = "Print the current pmdplus version.")]
    Version,
    /// Analyse a file or directory once
    #[command(
        about = "Run PMD once",
        long_about = "Run PMD over a file or directory and print the resulting diagnostics. Exits 1 when any error-level diagnostic is found or the run fails, 2 on configuration errors.",
        after_help = "Examples:\n  pmdplus check force-app\n  pmdplus check Foo.cls --ruleset default --ruleset rulesets/extra.xml"
    )]
    Check {
        #[arg(help = "File or directory to analyse (default: workspace root)")]
        target: Option<PathBuf>,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Re-run PMD on files as they change
    #[command(
        about = "Watch sources",
        long_about = "Poll Apex and Visualforce sources under the target and re-run PMD on each changed file after a quiet period. Stop with Ctrl-C."
    )]
    Watch {
        #[arg(help = "File or directory to watch (default: workspace root)")]
        target: Option<PathBuf>,
        #[arg(long, help = "Quiet period in milliseconds before a changed file is analysed (default: 3000)")]
        debounce_ms: Option<u64>,
        #[command(flatten)]
        run: RunArgs,
    },
    /// List the rulesets a run would use
    #[command(
        about = "Show resolved rulesets",
        long_about = "Resolve and validate the configured rulesets and print the ones that exist."
    )]
    Rulesets {
        #[command(flatten)]
        run: RunArgs,
    },
}

impl Cli {
    /// Overrides for settings resolution; `Version` yields the globals only.
    pub fn overrides(&self) -> CliOverrides {
        let mut o = CliOverrides {
            workspace_root: self.global.workspace_root.clone(),
            bundle_root: self.global.bundle_root.clone(),
            ..CliOverrides::default()
        };
        let (run, debounce_ms) = match &self.cmd {
            Commands::Version => return o,
            Commands::Check { run, .. } | Commands::Rulesets { run } => (run, None),
            Commands::Watch {
                run, debounce_ms, ..
            } => (run, *debounce_ms),
        };
        o.rulesets = run.rulesets.clone();
        o.pmd = run.pmd.clone();
        o.jre = run.jre.clone();
        o.no_cache = run.no_cache;
        o.error_threshold = run.error_threshold;
        o.warn_threshold = run.warn_threshold;
        o.buffer_mib = run.buffer_mib;
        o.debounce_ms = debounce_ms;
        o
    }

    pub fn output(&self) -> &str {
        self.global.output.as_deref().unwrap_or("human")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_flags_map_to_overrides() {
        let cli = Cli::parse_from([
            "pmdplus",
            "check",
            "force-app",
            "--ruleset",
            "default",
            "--ruleset",
            "rules/extra.xml",
            "--no-cache",
            "--error-threshold",
            "1",
            "--output",
            "json",
        ]);
        let o = cli.overrides();
        assert_eq!(o.rulesets, vec!["default", "rules/extra.xml"]);
        assert!(o.no_cache);
        assert_eq!(o.error_threshold, Some(1));
        assert_eq!(o.debounce_ms, None);
        assert_eq!(cli.output(), "json");
        match cli.cmd {
            Commands::Check { target, .. } => assert_eq!(target, Some(PathBuf::from("force-app"))),
            _ => panic!("expected check"),
        }
    }

    #[test]
    fn test_watch_debounce_and_global_flags() {
        let cli = Cli::parse_from([
            "pmdplus",
            "--workspace-root",
            "/ws",
            "watch",
            "--debounce-ms",
            "250",
            "--log-format",
            "json",
        ]);
        let o = cli.overrides();
        assert_eq!(o.debounce_ms, Some(250));
        assert_eq!(o.workspace_root, Some(PathBuf::from("/ws")));
        assert_eq!(cli.global.log_format, Some(LogFormat::Json));
        assert_eq!(cli.output(), "human");
    }

    #[test]
    fn test_version_takes_no_run_flags() {
        let cli = Cli::parse_from(["pmdplus", "version"]);
        assert!(cli.overrides().rulesets.is_empty());
        assert!(Cli::try_parse_from(["pmdplus", "version", "--no-cache"]).is_err());
    }
}
