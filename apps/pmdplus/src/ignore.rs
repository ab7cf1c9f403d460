//! `.forceignore` handling.
//!
//! Every non-blank, non-comment line is an exact-match exclusion, checked
//! against the reported path and against the path relative to the workspace.
//! A `!path` line re-includes a path excluded earlier; the last matching line
//! wins.

use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Entry {
    Exclude(String),
    Include(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreList {
    root: PathBuf,
    entries: Vec<Entry>,
}

impl IgnoreList {
    /// Parse ignore file contents relative to `root`.
    pub fn parse(root: &Path, contents: &str) -> Self {
        let entries = contents
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(|l| match l.strip_prefix('!') {
                Some(rest) => Entry::Include(normalize(rest.trim())),
                None => Entry::Exclude(normalize(l)),
            })
            .collect();
        IgnoreList {
            root: root.to_path_buf(),
            entries,
        }
    }

    /// Read the ignore file; a missing or unreadable file yields an empty list.
    pub fn load(root: &Path, file: &Path) -> Self {
        match std::fs::read_to_string(file) {
            Ok(s) => Self::parse(root, &s),
            Err(e) => {
                debug!(file = %file.display(), error = %e, "no ignore file loaded");
                IgnoreList {
                    root: root.to_path_buf(),
                    entries: Vec::new(),
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_ignored(&self, file: &str) -> bool {
        let full = normalize(file);
        let relative = Path::new(file)
            .strip_prefix(&self.root)
            .ok()
            .map(|p| normalize(&p.to_string_lossy()));
        let matches = |pat: &str| pat == full || relative.as_deref() == Some(pat);

        let mut ignored = false;
        for entry in &self.entries {
            match entry {
                Entry::Exclude(p) if matches(p) => ignored = true,
                Entry::Include(p) if matches(p) => ignored = false,
                _ => {}
            }
        }
        ignored
    }
}

fn normalize(p: &str) -> String {
    p.replace('\\', "/").trim_start_matches("./").to_string()
}
