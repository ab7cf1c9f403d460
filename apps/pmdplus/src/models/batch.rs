//! Insertion-ordered per-file grouping of diagnostics.

use super::Diagnostic;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Diagnostics grouped by file, preserving first-seen file order and
/// per-file parse order. A file is only present with at least one entry.
pub struct DiagnosticBatch {
    entries: Vec<(PathBuf, Vec<Diagnostic>)>,
    positions: HashMap<PathBuf, usize>,
}

impl DiagnosticBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        match self.positions.get(&diagnostic.file) {
            Some(&idx) => self.entries[idx].1.push(diagnostic),
            None => {
                let file = diagnostic.file.clone();
                self.positions.insert(file.clone(), self.entries.len());
                self.entries.push((file, vec![diagnostic]));
            }
        }
    }

    pub fn get(&self, file: &Path) -> Option<&[Diagnostic]> {
        self.positions
            .get(file)
            .map(|&idx| self.entries[idx].1.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of files.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn issue_count(&self) -> usize {
        self.entries.iter().map(|(_, d)| d.len()).sum()
    }

    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(|(f, _)| f.as_path())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &[Diagnostic])> {
        self.entries
            .iter()
            .map(|(f, d)| (f.as_path(), d.as_slice()))
    }
}

impl IntoIterator for DiagnosticBatch {
    type Item = (PathBuf, Vec<Diagnostic>);
    type IntoIter = std::vec::IntoIter<(PathBuf, Vec<Diagnostic>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
