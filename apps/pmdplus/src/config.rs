//! Configuration discovery and effective settings resolution.
//!
//! PMD+ reads `pmdplus.toml|yaml|yml` from the workspace root (or closest
//! ancestor) and merges it with CLI flags to produce a `Settings` snapshot.
//! Defaults:
//! - `rulesets`: `<workspace>/rulesets/apex_ruleset.xml`
//! - `pathToPmdExecutable`: `<bundle>/bin/pmd`
//! - `enableCache`: true (cache at `<workspace>/.pmdcache`)
//! - `priorityErrorThreshold` / `priorityWarnThreshold`: 2 / 4
//! - `runOnFileOpen|Save|Change`: true / true / false
//! - `onFileChangeDebounce`: 3000 ms
//! - `commandBufferSize`: 64 MiB
//!
//! Overrides precedence: CLI > config file > defaults.

use crate::error::SettingsError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the directory with the bundled PMD and rulesets.
pub const BUNDLE_ROOT_ENV: &str = "PMDPLUS_HOME";
pub const IGNORE_FILE_NAME: &str = ".forceignore";
pub const CACHE_DIR_NAME: &str = ".pmdcache";

const CONFIG_FILES: [&str; 3] = ["pmdplus.toml", "pmdplus.yaml", "pmdplus.yml"];

#[derive(Debug, Default, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
/// Root configuration loaded from `pmdplus.toml|yaml`.
pub struct PmdPlusConfig {
    pub bundle_root: Option<String>,
    pub rulesets: Option<Vec<String>>,
    pub additional_class_paths: Option<Vec<String>>,
    pub path_to_pmd_executable: Option<String>,
    pub jre_path: Option<String>,
    pub enable_cache: Option<bool>,
    pub priority_error_threshold: Option<i64>,
    pub priority_warn_threshold: Option<i64>,
    pub run_on_file_open: Option<bool>,
    pub run_on_file_save: Option<bool>,
    pub run_on_file_change: Option<bool>,
    /// Milliseconds.
    pub on_file_change_debounce: Option<u64>,
    /// MiB.
    pub command_buffer_size: Option<usize>,
}

#[derive(Debug, Default, Clone)]
/// Values supplied on the command line; `None` defers to the config file.
pub struct CliOverrides {
    pub workspace_root: Option<PathBuf>,
    pub bundle_root: Option<PathBuf>,
    pub rulesets: Vec<String>,
    pub pmd: Option<PathBuf>,
    pub jre: Option<PathBuf>,
    pub no_cache: bool,
    pub error_threshold: Option<i64>,
    pub warn_threshold: Option<i64>,
    pub buffer_mib: Option<usize>,
    pub debounce_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
/// Fully-defaulted, not yet validated settings snapshot.
///
/// Ruleset entries are kept as configured; `validate` resolves them.
pub struct Settings {
    pub workspace_root: PathBuf,
    pub bundle_root: PathBuf,
    pub rulesets: Vec<String>,
    pub additional_class_paths: Vec<PathBuf>,
    pub pmd_root: PathBuf,
    pub jre_path: Option<PathBuf>,
    pub enable_cache: bool,
    pub cache_path: PathBuf,
    pub error_threshold: i64,
    pub warn_threshold: i64,
    pub run_on_file_open: bool,
    pub run_on_file_save: bool,
    pub run_on_file_change: bool,
    pub debounce: Duration,
    pub buffer_mib: usize,
}

impl Settings {
    /// Defaults for a workspace, without consulting any config file.
    pub fn defaults(workspace_root: &Path, bundle_root: &Path) -> Self {
        Settings {
            workspace_root: workspace_root.to_path_buf(),
            bundle_root: bundle_root.to_path_buf(),
            rulesets: Vec::new(),
            additional_class_paths: Vec::new(),
            pmd_root: bundle_root.join("bin").join("pmd"),
            jre_path: None,
            enable_cache: true,
            cache_path: workspace_root.join(CACHE_DIR_NAME),
            error_threshold: 2,
            warn_threshold: 4,
            run_on_file_open: true,
            run_on_file_save: true,
            run_on_file_change: false,
            debounce: Duration::from_millis(3000),
            buffer_mib: 64,
        }
    }

    pub fn ignore_file(&self) -> PathBuf {
        self.workspace_root.join(IGNORE_FILE_NAME)
    }
}

/// Walk upward from `start` to detect the workspace root.
///
/// Stops at a `pmdplus.toml|yaml|yml`, an `sfdx-project.json`, or a `.git`
/// directory.
pub fn detect_workspace_root(start: &Path) -> PathBuf {
    let mut cur = start;
    loop {
        if CONFIG_FILES.iter().any(|f| cur.join(f).exists()) {
            return cur.to_path_buf();
        }
        if cur.join("sfdx-project.json").exists() || cur.join(".git").exists() {
            return cur.to_path_buf();
        }
        match cur.parent() {
            Some(p) => cur = p,
            None => return start.to_path_buf(),
        }
    }
}

/// Load `PmdPlusConfig` from `pmdplus.toml` or `pmdplus.yaml|yml` if present.
pub fn load_config(root: &Path) -> Result<Option<PmdPlusConfig>, SettingsError> {
    for name in CONFIG_FILES {
        let path = root.join(name);
        if !path.is_file() {
            continue;
        }
        let s = fs::read_to_string(&path).map_err(|source| SettingsError::Read {
            path: path.clone(),
            source,
        })?;
        let cfg = if name.ends_with(".toml") {
            toml::from_str(&s).map_err(|source| SettingsError::Toml { path, source })?
        } else {
            serde_yaml::from_str(&s).map_err(|source| SettingsError::Yaml { path, source })?
        };
        return Ok(Some(cfg));
    }
    Ok(None)
}

/// Resolve the directory holding the bundled `bin/pmd` and `rulesets/`.
fn resolve_bundle_root(cli: Option<&Path>, cfg: Option<&str>, workspace: &Path) -> PathBuf {
    if let Some(p) = cli {
        return absolutize(workspace, p);
    }
    if let Some(p) = cfg {
        return absolutize(workspace, Path::new(p));
    }
    if let Some(p) = std::env::var_os(BUNDLE_ROOT_ENV) {
        return PathBuf::from(p);
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| workspace.to_path_buf())
}

pub(crate) fn absolutize(base: &Path, p: &Path) -> PathBuf {
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}

/// Resolve `Settings` by merging CLI flags, discovered config, and defaults.
pub fn resolve_settings(cli: &CliOverrides) -> Result<Settings, SettingsError> {
    let start = cli
        .workspace_root
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    let start = fs::canonicalize(&start).unwrap_or(start);
    let workspace = detect_workspace_root(&start);
    let cfg = load_config(&workspace)?.unwrap_or_default();
    Ok(merge(cli, cfg, workspace))
}

fn merge(cli: &CliOverrides, cfg: PmdPlusConfig, workspace: PathBuf) -> Settings {
    let bundle = resolve_bundle_root(
        cli.bundle_root.as_deref(),
        cfg.bundle_root.as_deref(),
        &workspace,
    );
    let mut s = Settings::defaults(&workspace, &bundle);

    s.rulesets = if !cli.rulesets.is_empty() {
        cli.rulesets.clone()
    } else {
        cfg.rulesets.unwrap_or_default()
    };
    s.additional_class_paths = cfg
        .additional_class_paths
        .unwrap_or_default()
        .iter()
        .map(|p| absolutize(&workspace, Path::new(p)))
        .collect();
    // An empty configured path falls back to the bundled PMD
    if let Some(p) = cli.pmd.clone().or_else(|| {
        cfg.path_to_pmd_executable
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
    }) {
        s.pmd_root = absolutize(&workspace, &p);
    }
    s.jre_path = cli
        .jre
        .clone()
        .or_else(|| cfg.jre_path.filter(|p| !p.trim().is_empty()).map(PathBuf::from))
        .map(|p| absolutize(&workspace, &p));
    s.enable_cache = !cli.no_cache && cfg.enable_cache.unwrap_or(s.enable_cache);
    s.error_threshold = cli
        .error_threshold
        .or(cfg.priority_error_threshold)
        .unwrap_or(s.error_threshold);
    s.warn_threshold = cli
        .warn_threshold
        .or(cfg.priority_warn_threshold)
        .unwrap_or(s.warn_threshold);
    s.run_on_file_open = cfg.run_on_file_open.unwrap_or(s.run_on_file_open);
    s.run_on_file_save = cfg.run_on_file_save.unwrap_or(s.run_on_file_save);
    s.run_on_file_change = cfg.run_on_file_change.unwrap_or(s.run_on_file_change);
    if let Some(ms) = cli.debounce_ms.or(cfg.on_file_change_debounce) {
        s.debounce = Duration::from_millis(ms);
    }
    s.buffer_mib = cli
        .buffer_mib
        .or(cfg.command_buffer_size)
        .unwrap_or(s.buffer_mib);
    s
}
