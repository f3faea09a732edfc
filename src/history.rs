//! Command history: bounded, deduplicated, append-only persisted log.

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("failed to read history file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write history file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

const DEDUP_WINDOW: usize = 50;

/// Ordered sequence of executed commands. Invariants: no two consecutive
/// entries are equal; bounded to `max_entries`, evicting the oldest on
/// overflow. Within the last `DEDUP_WINDOW` entries, an exact duplicate of
/// the newly appended command has its earlier occurrence removed (both
/// the strict-consecutive rule and the within-window rule are honored).
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<String>,
    max_entries: usize,
    path: Option<PathBuf>,
    file: Option<File>,
}

impl History {
    pub fn new(max_entries: usize) -> Self {
        History {
            entries: VecDeque::new(),
            max_entries: max_entries.max(1),
            path: None,
            file: None,
        }
    }

    /// Load history from `path` (if it exists), folding duplicates on
    /// load, and open it for append so subsequent `append` calls persist
    /// incrementally.
    pub fn load(path: impl AsRef<Path>, max_entries: usize) -> Result<Self, HistoryError> {
        let path = path.as_ref().to_path_buf();
        let mut history = History::new(max_entries);

        if path.exists() {
            let f = File::open(&path).map_err(|e| HistoryError::Read {
                path: path.clone(),
                source: e,
            })?;
            for line in BufReader::new(f).lines() {
                let line = line.map_err(|e| HistoryError::Read {
                    path: path.clone(),
                    source: e,
                })?;
                if !line.is_empty() {
                    history.push_in_memory(line);
                }
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| HistoryError::Write {
                path: path.clone(),
                source: e,
            })?;

        history.path = Some(path);
        history.file = Some(file);
        Ok(history)
    }

    /// Add an entry to the in-memory log only (used during load, where we
    /// don't want to re-append to the file we're reading from).
    fn push_in_memory(&mut self, entry: String) {
        if self.entries.back() == Some(&entry) {
            return;
        }
        let window_start = self.entries.len().saturating_sub(DEDUP_WINDOW);
        if let Some(pos) = self.entries.iter().skip(window_start).position(|e| e == &entry) {
            self.entries.remove(window_start + pos);
        }
        self.entries.push_back(entry);
        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
    }

    /// Add a new command to history and, if a file is attached, append it
    /// immediately. No-op if it equals the most recent entry (consecutive
    /// dedup) — matches `push_in_memory`'s rule.
    pub fn add(&mut self, entry: impl Into<String>) -> Result<(), HistoryError> {
        let entry = entry.into();
        if entry.is_empty() {
            return Ok(());
        }
        let was_new_tail = self.entries.back() != Some(&entry);
        self.push_in_memory(entry.clone());
        if was_new_tail {
            if let (Some(file), Some(path)) = (self.file.as_mut(), self.path.as_ref()) {
                writeln!(file, "{entry}").map_err(|e| HistoryError::Write {
                    path: path.clone(),
                    source: e,
                })?;
                file.flush().map_err(|e| HistoryError::Write {
                    path: path.clone(),
                    source: e,
                })?;
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Iterate from oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Iterate from newest to oldest — the order the editor and
    /// reverse-i-search walk history in.
    pub fn iter_newest_first(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().rev().map(String::as_str)
    }

    /// Last N entries (default all), with their 1-based index, for the
    /// `history` built-in.
    pub fn last_n(&self, n: Option<usize>) -> Vec<(usize, &str)> {
        let total = self.entries.len();
        let take = n.unwrap_or(total).min(total);
        let skip = total - take;
        self.entries
            .iter()
            .enumerate()
            .skip(skip)
            .map(|(i, s)| (i + 1, s.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn no_two_consecutive_entries_equal() {
        let mut h = History::new(1000);
        h.add("ls").unwrap();
        h.add("ls").unwrap();
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn bounded_evicts_oldest() {
        let mut h = History::new(3);
        h.add("a").unwrap();
        h.add("b").unwrap();
        h.add("c").unwrap();
        h.add("d").unwrap();
        assert_eq!(h.len(), 3);
        assert_eq!(h.iter().collect::<Vec<_>>(), vec!["b", "c", "d"]);
    }

    #[test]
    fn within_window_duplicate_is_moved_to_end() {
        let mut h = History::new(1000);
        h.add("git status").unwrap();
        h.add("ls").unwrap();
        h.add("git status").unwrap();
        assert_eq!(h.len(), 2);
        assert_eq!(h.iter().collect::<Vec<_>>(), vec!["ls", "git status"]);
    }

    #[test]
    fn persists_and_reloads_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history");
        {
            let mut h = History::load(&path, 1000).unwrap();
            h.add("echo one").unwrap();
            h.add("echo two").unwrap();
        }
        let h2 = History::load(&path, 1000).unwrap();
        assert_eq!(h2.iter().collect::<Vec<_>>(), vec!["echo one", "echo two"]);
    }

    #[test]
    fn last_n_returns_one_based_indices() {
        let mut h = History::new(1000);
        h.add("a").unwrap();
        h.add("b").unwrap();
        h.add("c").unwrap();
        assert_eq!(h.last_n(Some(2)), vec![(2, "b"), (3, "c")]);
    }
}
