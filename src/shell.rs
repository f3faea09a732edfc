//! Shell runtime: the single `Shell` struct that owns every table the
//! parser/expander/executor/builtins need, passed by exclusive reference
//! into their entry points. The line editor is kept separate (it owns its
//! own kill ring and undo stack) and only ever sees the shell through an
//! immutable history/completion reference.

use std::collections::VecDeque;
use std::env;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::Config;
use crate::env::{AliasTable, ArrayTable, Environment};
use crate::executor::ExecError;
use crate::expander::{ExpandError, ExpansionContext};
use crate::history::{History, HistoryError};
use crate::jobs::JobTable;
use crate::lexer::LexError;
use crate::parser::ParseError;

pub const MIN_DIR_STACK_SLOTS: usize = 32;
pub const MIN_POSITIONAL_SLOTS: usize = 64;

/// Crate-wide error, chaining every subsystem's error type at the REPL
/// boundary: errors are caught here and never abort the shell outright.
#[derive(Error, Debug)]
pub enum ShellError {
    #[error("parse error: {0}")]
    Lex(#[from] LexError),
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("{0}")]
    Expand(#[from] ExpandError),
    #[error("{0}")]
    Exec(#[from] ExecError),
    #[error("{0}")]
    History(#[from] HistoryError),
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// Central coordinator owning environment, aliases, arrays, history, jobs,
/// and the current-directory/positional-parameter bookkeeping the builtins
/// and expander both need.
pub struct Shell {
    pub env: Environment,
    pub aliases: AliasTable,
    pub arrays: ArrayTable,
    pub history: History,
    pub jobs: JobTable,
    pub config: Config,
    pub cwd: PathBuf,
    pub oldpwd: Option<PathBuf>,
    pub dir_stack: VecDeque<PathBuf>,
    pub positional: Vec<String>,
    pub shell_name: String,
    pub last_exit_code: i32,
    pub last_arg: String,
    pub last_background_pid: Option<u32>,
    pub shell_pid: u32,
    pub set_e: bool,
}

impl Shell {
    /// Build a shell for interactive or script use: seeds the environment
    /// from the process, loads (or defaults) config, and opens the history
    /// file for append.
    pub fn new(shell_name: impl Into<String>, positional: Vec<String>) -> Result<Self, ShellError> {
        let config = crate::config::load().unwrap_or_default();
        let history = History::load(config.history_file(), config.history.max_entries)?;
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));

        let mut env_table = Environment::from_process();
        for entry in &config.environment.variables {
            env_table.set(entry.name.clone(), entry.value.clone());
            env_table.export(&entry.name);
            env::set_var(&entry.name, &entry.value);
        }
        env_table.set("PWD", cwd.to_string_lossy().to_string());
        env_table.export("PWD");

        let mut aliases = AliasTable::default();
        for a in &config.aliases.custom {
            aliases.set(a.name.clone(), a.command.clone());
        }

        Ok(Shell {
            env: env_table,
            aliases,
            arrays: ArrayTable::default(),
            history,
            jobs: JobTable::default(),
            config,
            cwd,
            oldpwd: None,
            dir_stack: VecDeque::new(),
            positional,
            shell_name: shell_name.into(),
            last_exit_code: 0,
            last_arg: String::new(),
            last_background_pid: None,
            shell_pid: std::process::id(),
            set_e: false,
        })
    }

    pub fn expansion_context(&self) -> ExpansionContext<'_> {
        ExpansionContext {
            env: &self.env,
            arrays: &self.arrays,
            aliases: &self.aliases,
            positional: &self.positional,
            shell_name: &self.shell_name,
            last_exit_code: self.last_exit_code,
            shell_pid: self.shell_pid,
            last_background_pid: self.last_background_pid,
            last_arg: &self.last_arg,
            cwd: &self.cwd,
        }
    }

    /// Change the current directory, updating `$PWD`/`$OLDPWD`.
    pub fn change_dir(&mut self, target: &Path) -> std::io::Result<()> {
        let canonical = if target.is_absolute() {
            target.to_path_buf()
        } else {
            self.cwd.join(target)
        };
        env::set_current_dir(&canonical)?;
        let resolved = env::current_dir().unwrap_or(canonical);
        let old = self.cwd.clone();
        self.oldpwd = Some(old.clone());
        self.env.set("OLDPWD", old.to_string_lossy().to_string());
        env::set_var("OLDPWD", old.to_string_lossy().as_ref());
        self.cwd = resolved;
        self.env.set("PWD", self.cwd.to_string_lossy().to_string());
        env::set_var("PWD", self.cwd.to_string_lossy().as_ref());
        Ok(())
    }

    /// Record a completed command into history, applying `ignore_space`
    /// on top of `History`'s own consecutive/window dedup.
    pub fn record_history(&mut self, line: &str) -> Result<(), HistoryError> {
        if self.config.history.ignore_space && line.starts_with(' ') {
            return Ok(());
        }
        if line.trim().is_empty() {
            return Ok(());
        }
        self.history.add(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_shell() -> Shell {
        let dir = tempdir().unwrap();
        std::env::set_var("HOME", dir.path());
        Shell::new("den", vec![]).unwrap()
    }

    #[test]
    fn new_shell_seeds_pwd_from_cwd() {
        let shell = test_shell();
        assert_eq!(shell.env.get("PWD"), Some(shell.cwd.to_string_lossy().as_ref()));
    }

    #[test]
    fn record_history_skips_leading_space_when_configured() {
        let mut shell = test_shell();
        shell.config.history.ignore_space = true;
        shell.record_history(" secret").unwrap();
        assert_eq!(shell.history.len(), 0);
        shell.record_history("ls").unwrap();
        assert_eq!(shell.history.len(), 1);
    }
}
