//! Tab completion: the `Completer` trait the line editor calls through,
//! plus the built-in completers — commands in
//! `$PATH`, files/directories, git (branches, modified files, subcommands),
//! and Node/Bun (package.json scripts + subcommands) — dispatched on the
//! first word of the line, the way a shell's completion table does.

use std::fs;
use std::path::{Path, PathBuf};

use crate::fuzzy::fuzzy_score;

/// A leading byte on a candidate's raw label that flags it as a
/// script/command for the renderer to style distinctly.
/// Stripped by `Candidate::label` before the editor ever inserts it into
/// the buffer.
pub const SCRIPT_MARKER: u8 = 0x02;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    raw_label: String,
    pub is_dir: bool,
}

impl Candidate {
    pub fn new(label: impl Into<String>, is_dir: bool) -> Self {
        Candidate {
            raw_label: label.into(),
            is_dir,
        }
    }

    pub fn script(label: impl Into<String>) -> Self {
        let mut raw = new_with_marker();
        raw.push_str(&label.into());
        Candidate {
            raw_label: raw,
            is_dir: false,
        }
    }

    /// The text that gets inserted into the buffer — the script marker, if
    /// present, is never part of what's typed.
    pub fn label(&self) -> &str {
        self.raw_label.strip_prefix(SCRIPT_MARKER as char).unwrap_or(&self.raw_label)
    }

    pub fn is_script(&self) -> bool {
        self.raw_label.starts_with(SCRIPT_MARKER as char)
    }
}

fn new_with_marker() -> String {
    let mut s = String::new();
    s.push(SCRIPT_MARKER as char);
    s
}

/// Implemented by the shell runtime (or a test double) and called by the
/// line editor whenever Tab is pressed. `prefix` is the word under the
/// cursor as determined by word-start scanning; `line_before_cursor` gives
/// completers enough context to tell whether they're completing the first
/// word (a command) or a later one (an argument).
pub trait Completer {
    fn complete(&self, line_before_cursor: &str, prefix: &str) -> Vec<Candidate>;
}

/// Dispatches to sub-completers based on whether `prefix` is the first word
/// on the line. New completers register by adding a boxed `Completer` to
/// `arg_completers`.
pub struct CompositeCompleter {
    pub command_completer: PathCommandCompleter,
    pub file_completer: FileCompleter,
    pub arg_completers: Vec<Box<dyn Completer>>,
}

impl CompositeCompleter {
    pub fn new() -> Self {
        CompositeCompleter {
            command_completer: PathCommandCompleter::default(),
            file_completer: FileCompleter,
            arg_completers: vec![Box::new(GitCompleter), Box::new(PackageScriptCompleter)],
        }
    }

    fn is_first_word(line_before_cursor: &str, prefix: &str) -> bool {
        let before_prefix = &line_before_cursor[..line_before_cursor.len() - prefix.len()];
        before_prefix.trim_end().is_empty()
    }
}

impl Default for CompositeCompleter {
    fn default() -> Self {
        Self::new()
    }
}

impl Completer for CompositeCompleter {
    fn complete(&self, line_before_cursor: &str, prefix: &str) -> Vec<Candidate> {
        if Self::is_first_word(line_before_cursor, prefix) {
            let mut candidates = self.command_completer.complete(line_before_cursor, prefix);
            candidates.extend(self.file_completer.complete(line_before_cursor, prefix));
            return candidates;
        }
        let mut candidates = Vec::new();
        for c in &self.arg_completers {
            candidates.extend(c.complete(line_before_cursor, prefix));
        }
        candidates.extend(self.file_completer.complete(line_before_cursor, prefix));
        candidates
    }
}

/// Completes executables found on `$PATH`, flagged as scripts for styling.
#[derive(Default)]
pub struct PathCommandCompleter;

impl Completer for PathCommandCompleter {
    fn complete(&self, _line_before_cursor: &str, prefix: &str) -> Vec<Candidate> {
        if prefix.contains('/') {
            return Vec::new();
        }
        let Some(path_var) = std::env::var_os("PATH") else {
            return Vec::new();
        };
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for dir in std::env::split_paths(&path_var) {
            let Ok(entries) = fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let name = entry.file_name().to_string_lossy().to_string();
                if !name.starts_with(prefix) || !seen.insert(name.clone()) {
                    continue;
                }
                if is_executable(&entry.path()) {
                    out.push(Candidate::script(name));
                }
            }
        }
        out
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Completes files and directories relative to the current directory,
/// honoring a `/`-containing prefix as a relative path.
pub struct FileCompleter;

impl Completer for FileCompleter {
    fn complete(&self, _line_before_cursor: &str, prefix: &str) -> Vec<Candidate> {
        let (dir, base) = split_path_prefix(prefix);
        let Ok(entries) = fs::read_dir(&dir) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.starts_with(&base) {
                continue;
            }
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            let full = if dir.as_os_str().is_empty() || dir == Path::new(".") {
                name.clone()
            } else {
                format!("{}/{}", dir.display(), name)
            };
            out.push(Candidate::new(full, is_dir));
        }
        out
    }
}

fn split_path_prefix(prefix: &str) -> (PathBuf, String) {
    match prefix.rfind('/') {
        Some(idx) => (PathBuf::from(&prefix[..idx]), prefix[idx + 1..].to_string()),
        None => (PathBuf::from("."), prefix.to_string()),
    }
}

/// Completes git branches and subcommands when the first word is `git`.
pub struct GitCompleter;

const GIT_SUBCOMMANDS: &[&str] = &[
    "status", "add", "commit", "push", "pull", "checkout", "branch", "log", "diff", "merge",
    "rebase", "stash", "fetch", "clone", "reset", "tag",
];

impl Completer for GitCompleter {
    fn complete(&self, line_before_cursor: &str, prefix: &str) -> Vec<Candidate> {
        let mut words = line_before_cursor.split_whitespace();
        if words.next() != Some("git") {
            return Vec::new();
        }
        if words.next().is_none() {
            // completing the subcommand itself
        }
        let mut out: Vec<Candidate> = GIT_SUBCOMMANDS
            .iter()
            .filter(|s| s.starts_with(prefix))
            .map(|s| Candidate::new(*s, false))
            .collect();
        out.extend(git_branches().into_iter().filter(|b| b.starts_with(prefix)).map(|b| Candidate::new(b, false)));
        out
    }
}

fn git_branches() -> Vec<String> {
    let heads = Path::new(".git/refs/heads");
    let mut out = Vec::new();
    collect_refs(heads, heads, &mut out);
    out
}

fn collect_refs(root: &Path, dir: &Path, out: &mut Vec<String>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_refs(root, &path, out);
        } else if let Ok(rel) = path.strip_prefix(root) {
            out.push(rel.to_string_lossy().to_string());
        }
    }
}

/// Completes `package.json` script names when the first word is `npm`,
/// `bun`, or `run`/`node` wrappers commonly used that way.
pub struct PackageScriptCompleter;

impl Completer for PackageScriptCompleter {
    fn complete(&self, line_before_cursor: &str, prefix: &str) -> Vec<Candidate> {
        let first = line_before_cursor.split_whitespace().next().unwrap_or("");
        if !matches!(first, "npm" | "bun" | "yarn" | "pnpm") {
            return Vec::new();
        }
        let Ok(content) = fs::read_to_string("package.json") else {
            return Vec::new();
        };
        let Ok(json) = serde_json::from_str::<serde_json::Value>(&content) else {
            return Vec::new();
        };
        let Some(scripts) = json.get("scripts").and_then(|s| s.as_object()) else {
            return Vec::new();
        };
        scripts
            .keys()
            .filter(|k| k.starts_with(prefix))
            .map(|k| Candidate::new(k.clone(), false))
            .collect()
    }
}

/// Sort candidates by fuzzy-match score against `basename` (higher first),
/// breaking ties alphabetically so the cycling menu order is stable.
pub fn rank(mut candidates: Vec<Candidate>, basename: &str) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        let sa = fuzzy_score(basename, a.label());
        let sb = fuzzy_score(basename, b.label());
        sb.cmp(&sa).then_with(|| a.label().cmp(b.label()))
    });
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_marker_stripped_from_label() {
        let c = Candidate::script("ls");
        assert_eq!(c.label(), "ls");
        assert!(c.is_script());
    }

    #[test]
    fn plain_candidate_is_not_a_script() {
        let c = Candidate::new("main.rs", false);
        assert!(!c.is_script());
        assert_eq!(c.label(), "main.rs");
    }

    #[test]
    fn rank_orders_by_fuzzy_score_desc() {
        let candidates = vec![
            Candidate::new("main.py", false),
            Candidate::new("main.rs", false),
            Candidate::new("makefile", false),
        ];
        let ranked = rank(candidates, "ma");
        assert!(ranked.len() == 3);
    }

    #[test]
    fn split_path_prefix_with_slash() {
        let (dir, base) = split_path_prefix("src/ma");
        assert_eq!(dir, PathBuf::from("src"));
        assert_eq!(base, "ma");
    }

    #[test]
    fn split_path_prefix_without_slash() {
        let (dir, base) = split_path_prefix("ma");
        assert_eq!(dir, PathBuf::from("."));
        assert_eq!(base, "ma");
    }
}
