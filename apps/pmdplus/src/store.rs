//! Diagnostic store boundary.
//!
//! The pipeline only writes through `DiagnosticStore`; `MemoryStore` is the
//! in-process implementation used by the CLI.

use crate::models::Diagnostic;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

pub trait DiagnosticStore: Send + Sync {
    /// Replace the diagnostics for `path`.
    fn set(&self, path: &Path, diagnostics: Vec<Diagnostic>);
    fn delete(&self, path: &Path);
    fn clear(&self);
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<PathBuf, Vec<Diagnostic>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<PathBuf, Vec<Diagnostic>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, path: &Path) -> Option<Vec<Diagnostic>> {
        self.lock().get(path).cloned()
    }

    /// Every stored entry, ordered by path.
    pub fn snapshot(&self) -> Vec<(PathBuf, Vec<Diagnostic>)> {
        self.lock()
            .iter()
            .map(|(p, d)| (p.clone(), d.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl DiagnosticStore for MemoryStore {
    fn set(&self, path: &Path, diagnostics: Vec<Diagnostic>) {
        let mut entries = self.lock();
        if diagnostics.is_empty() {
            entries.remove(path);
        } else {
            entries.insert(path.to_path_buf(), diagnostics);
        }
    }

    fn delete(&self, path: &Path) {
        self.lock().remove(path);
    }

    fn clear(&self) {
        self.lock().clear();
    }
}
