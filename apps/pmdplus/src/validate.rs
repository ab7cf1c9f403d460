//! Validation of a settings snapshot into an immutable `RunConfiguration`.
//!
//! `RunConfiguration::build` is the only way to obtain a configuration; it
//! resolves rulesets, checks the PMD install directory and every ruleset
//! concurrently, and fails before any subprocess is started.

use crate::config::{absolutize, Settings};
use crate::error::ConfigurationError;
use crate::ignore::IgnoreList;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Keyword that selects the ruleset bundled with PMD+.
pub const DEFAULT_RULESET_TOKEN: &str = "default";

/// Location of the bundled ruleset below the bundle root.
pub fn bundled_ruleset(bundle_root: &Path) -> PathBuf {
    bundle_root.join("rulesets").join("apex_ruleset.xml")
}

/// Resolve one configured ruleset entry to a path.
///
/// `default` (any case) maps to the bundled ruleset; relative paths are
/// joined to the workspace root; absolute paths are kept.
pub fn resolve_ruleset(entry: &str, workspace_root: &Path, bundle_root: &Path) -> PathBuf {
    if entry.trim().eq_ignore_ascii_case(DEFAULT_RULESET_TOKEN) {
        return bundled_ruleset(bundle_root);
    }
    absolutize(workspace_root, Path::new(entry.trim()))
}

/// Resolve all configured rulesets, falling back to the workspace ruleset
/// when none are configured.
pub fn resolve_rulesets(settings: &Settings) -> Vec<PathBuf> {
    if settings.rulesets.is_empty() {
        return vec![settings
            .workspace_root
            .join("rulesets")
            .join("apex_ruleset.xml")];
    }
    settings
        .rulesets
        .iter()
        .map(|r| resolve_ruleset(r, &settings.workspace_root, &settings.bundle_root))
        .collect()
}

#[derive(Debug, Clone)]
/// A validated, immutable snapshot used for exactly one run.
pub struct RunConfiguration {
    workspace_root: PathBuf,
    pmd_root: PathBuf,
    jre_path: Option<PathBuf>,
    rulesets: Vec<PathBuf>,
    additional_class_paths: Vec<PathBuf>,
    cache_path: Option<PathBuf>,
    error_threshold: i64,
    warn_threshold: i64,
    buffer_mib: usize,
    debounce: Duration,
    ignore: IgnoreList,
}

impl RunConfiguration {
    /// Validate `settings` and build a configuration.
    ///
    /// Each missing ruleset is logged individually. The executable check is
    /// reported first when both checks fail.
    pub fn build(settings: &Settings) -> Result<Self, ConfigurationError> {
        let candidates = resolve_rulesets(settings);
        let (pmd_ok, rulesets) = rayon::join(
            || settings.pmd_root.is_dir(),
            || {
                candidates
                    .par_iter()
                    .filter(|p| p.is_file())
                    .cloned()
                    .collect::<Vec<_>>()
            },
        );

        for missing in candidates.iter().filter(|p| !rulesets.contains(p)) {
            warn!(
                ruleset = %missing.display(),
                "PMD+ could not find or access the ruleset file"
            );
        }

        if !pmd_ok {
            return Err(ConfigurationError::ExecutableNotFound {
                path: settings.pmd_root.clone(),
            });
        }
        if rulesets.is_empty() {
            return Err(ConfigurationError::NoValidRulesets);
        }

        Ok(RunConfiguration {
            workspace_root: settings.workspace_root.clone(),
            pmd_root: settings.pmd_root.clone(),
            jre_path: settings.jre_path.clone(),
            rulesets,
            additional_class_paths: settings.additional_class_paths.clone(),
            cache_path: settings
                .enable_cache
                .then(|| settings.cache_path.clone()),
            error_threshold: settings.error_threshold,
            warn_threshold: settings.warn_threshold,
            buffer_mib: settings.buffer_mib,
            debounce: settings.debounce,
            ignore: IgnoreList::load(&settings.workspace_root, &settings.ignore_file()),
        })
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn pmd_root(&self) -> &Path {
        &self.pmd_root
    }

    pub fn jre_path(&self) -> Option<&Path> {
        self.jre_path.as_deref()
    }

    /// Validated rulesets, never empty.
    pub fn rulesets(&self) -> &[PathBuf] {
        &self.rulesets
    }

    pub fn additional_class_paths(&self) -> &[PathBuf] {
        &self.additional_class_paths
    }

    /// `Some` when caching is enabled.
    pub fn cache_path(&self) -> Option<&Path> {
        self.cache_path.as_deref()
    }

    pub fn error_threshold(&self) -> i64 {
        self.error_threshold
    }

    pub fn warn_threshold(&self) -> i64 {
        self.warn_threshold
    }

    /// Per-stream output ceiling in bytes; at least 1 MiB, saturating at `usize::MAX`.
    pub fn buffer_limit(&self) -> usize {
        self.buffer_mib.max(1).saturating_mul(1024 * 1024)
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn ignore(&self) -> &IgnoreList {
        &self.ignore
    }
}
