//! Per-file Result Bookkeeping
//!
//! Tracks which files were analyzed successfully and which were not. A file
//! that failed once stays failed for the rest of the batch, even when another
//! tool later succeeds on it.

use std::collections::HashSet;

/// Two disjoint sets of file paths.
#[derive(Debug, Clone, Default)]
pub struct ResultSets {
    analyzed: HashSet<String>,
    not_analyzed: HashSet<String>,
}

impl ResultSets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything recorded so far.
    pub fn clear(&mut self) {
        self.analyzed.clear();
        self.not_analyzed.clear();
    }

    /// Record a successful run. Ignored when the file already failed.
    pub fn mark_analyzed(&mut self, file_path: &str) {
        if !self.not_analyzed.contains(file_path) {
            self.analyzed.insert(file_path.to_string());
        }
    }

    /// Record a failed run, moving the file out of the analyzed set.
    pub fn mark_not_analyzed(&mut self, file_path: &str) {
        self.analyzed.remove(file_path);
        self.not_analyzed.insert(file_path.to_string());
    }

    pub fn is_analyzed(&self, file_path: &str) -> bool {
        self.analyzed.contains(file_path)
    }

    pub fn is_not_analyzed(&self, file_path: &str) -> bool {
        self.not_analyzed.contains(file_path)
    }

    pub fn analyzed_count(&self) -> usize {
        self.analyzed.len()
    }

    pub fn not_analyzed_count(&self) -> usize {
        self.not_analyzed.len()
    }

    /// Analyzed files, sorted for stable output
    pub fn analyzed_files(&self) -> Vec<String> {
        let mut files: Vec<String> = self.analyzed.iter().cloned().collect();
        files.sort();
        files
    }

    /// Files that could not be analyzed, sorted for stable output
    pub fn not_analyzed_files(&self) -> Vec<String> {
        let mut files: Vec<String> = self.not_analyzed.iter().cloned().collect();
        files.sort();
        files
    }
}
