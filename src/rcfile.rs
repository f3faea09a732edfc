//! Startup file loading: sources `~/.denrc` before the first interactive
//! prompt, the same way the `source` builtin executes a script (line by
//! line, non-empty non-comment lines only). Grounded on the teacher's
//! `rcfile.rs`, which loads `~/.hsabrc` before its REPL loop starts.

use std::fs;
use std::path::PathBuf;

use crate::builtins::run_line_in_shell;
use crate::shell::Shell;

/// The default rc file path, `$HOME/.denrc`. Returns `None` if `HOME`
/// cannot be resolved.
pub fn denrc_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".denrc"))
}

/// Source `~/.denrc` into `shell` if it exists. A missing file is not an
/// error; a read failure or a line that fails is reported to stderr and
/// does not abort startup.
pub fn load_denrc(shell: &mut Shell) {
    let Some(path) = denrc_path() else { return };
    let content = match fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                eprintln!("den: {}: {e}", path.display());
            }
            return;
        }
    };
    for (line_num, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let code = run_line_in_shell(shell, trimmed);
        if code != 0 {
            tracing::warn!(line = line_num + 1, path = %path.display(), "denrc line exited non-zero");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_denrc_is_not_an_error() {
        let dir = tempdir().unwrap();
        std::env::set_var("HOME", dir.path());
        let mut shell = Shell::new("den", vec![]).unwrap();
        load_denrc(&mut shell);
        assert_eq!(shell.last_exit_code, 0);
    }

    #[test]
    fn denrc_is_sourced_line_by_line() {
        let dir = tempdir().unwrap();
        std::env::set_var("HOME", dir.path());
        fs::write(dir.path().join(".denrc"), "export GREETING=hi\n# a comment\n").unwrap();
        let mut shell = Shell::new("den", vec![]).unwrap();
        load_denrc(&mut shell);
        assert_eq!(shell.env.get("GREETING"), Some("hi"));
    }
}
