//! Prompt rendering. A `PromptRenderer` trait
//! consumes a `PromptContext` snapshot and produces a styled string for the
//! editor to draw; `DefaultPromptRenderer` honors `prompt.format` and
//! `prompt.right_prompt` from config using `%`-style placeholders, with a
//! short-lived cache keyed on cwd so a cheap `git` shell-out doesn't run on
//! every redraw.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::config::PromptConfig;

/// Everything the renderer needs to know about shell state at render time.
pub struct PromptContext<'a> {
    pub cwd: &'a Path,
    pub last_exit_code: i32,
    pub job_count: usize,
    pub shell_name: &'a str,
}

pub trait PromptRenderer {
    fn render_left(&mut self, ctx: &PromptContext) -> String;
    fn render_right(&mut self, ctx: &PromptContext) -> Option<String>;
}

struct GitCacheEntry {
    cwd: PathBuf,
    branch: Option<String>,
    at: Instant,
}

const GIT_CACHE_TTL: Duration = Duration::from_millis(500);

/// Default renderer driven entirely by `config.prompt`. Recognized
/// placeholders: `%u` user, `%h` hostname, `%c` cwd (home-relativized),
/// `%C` cwd basename, `%$` `$`/`#` for non-root/root, `%?` last exit code,
/// `%j` job count, `%g` git branch (empty string if not a repo), `%%` a
/// literal `%`.
pub struct DefaultPromptRenderer {
    format: String,
    right_format: Option<String>,
    git_cache: Option<GitCacheEntry>,
}

impl DefaultPromptRenderer {
    pub fn new(config: &PromptConfig) -> Self {
        DefaultPromptRenderer {
            format: config.format.clone(),
            right_format: config.right_prompt.clone(),
            git_cache: None,
        }
    }

    fn git_branch(&mut self, cwd: &Path) -> String {
        if let Some(entry) = &self.git_cache {
            if entry.cwd == cwd && entry.at.elapsed() < GIT_CACHE_TTL {
                return entry.branch.clone().unwrap_or_default();
            }
        }
        let branch = std::process::Command::new("git")
            .args(["rev-parse", "--abbrev-ref", "HEAD"])
            .current_dir(cwd)
            .output()
            .ok()
            .filter(|o| o.status.success())
            .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string());
        self.git_cache = Some(GitCacheEntry {
            cwd: cwd.to_path_buf(),
            branch: branch.clone(),
            at: Instant::now(),
        });
        branch.unwrap_or_default()
    }

    fn expand(&mut self, fmt: &str, ctx: &PromptContext) -> String {
        let mut out = String::with_capacity(fmt.len());
        let mut chars = fmt.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '%' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('u') => out.push_str(&std::env::var("USER").unwrap_or_default()),
                Some('h') => out.push_str(
                    &hostname::get()
                        .map(|h| h.to_string_lossy().to_string())
                        .unwrap_or_default(),
                ),
                Some('c') => out.push_str(&display_cwd(ctx.cwd)),
                Some('C') => out.push_str(
                    &ctx.cwd
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_else(|| "/".to_string()),
                ),
                Some('$') => out.push(if is_root() { '#' } else { '$' }),
                Some('?') => out.push_str(&ctx.last_exit_code.to_string()),
                Some('j') => out.push_str(&ctx.job_count.to_string()),
                Some('g') => out.push_str(&self.git_branch(ctx.cwd)),
                Some('%') => out.push('%'),
                Some(other) => {
                    out.push('%');
                    out.push(other);
                }
                None => out.push('%'),
            }
        }
        out
    }
}

impl PromptRenderer for DefaultPromptRenderer {
    fn render_left(&mut self, ctx: &PromptContext) -> String {
        let fmt = self.format.clone();
        self.expand(&fmt, ctx)
    }

    fn render_right(&mut self, ctx: &PromptContext) -> Option<String> {
        let fmt = self.right_format.clone()?;
        Some(self.expand(&fmt, ctx))
    }
}

fn display_cwd(cwd: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(rel) = cwd.strip_prefix(&home) {
            return if rel.as_os_str().is_empty() {
                "~".to_string()
            } else {
                format!("~/{}", rel.display())
            };
        }
    }
    cwd.display().to_string()
}

#[cfg(unix)]
fn is_root() -> bool {
    nix::unistd::Uid::effective().is_root()
}

#[cfg(not(unix))]
fn is_root() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(cwd: &Path) -> PromptContext {
        PromptContext {
            cwd,
            last_exit_code: 0,
            job_count: 0,
            shell_name: "den",
        }
    }

    #[test]
    fn expands_literal_percent() {
        let config = PromptConfig {
            format: "100%% done> ".to_string(),
            right_prompt: None,
        };
        let mut renderer = DefaultPromptRenderer::new(&config);
        let cwd = PathBuf::from("/tmp");
        assert_eq!(renderer.render_left(&ctx(&cwd)), "100% done> ");
    }

    #[test]
    fn expands_exit_code_and_job_count() {
        let config = PromptConfig {
            format: "[%? %j]> ".to_string(),
            right_prompt: None,
        };
        let mut renderer = DefaultPromptRenderer::new(&config);
        let cwd = PathBuf::from("/tmp");
        let mut c = ctx(&cwd);
        c.last_exit_code = 42;
        c.job_count = 2;
        assert_eq!(renderer.render_left(&c), "[42 2]> ");
    }

    #[test]
    fn right_prompt_absent_when_unconfigured() {
        let config = PromptConfig {
            format: "$ ".to_string(),
            right_prompt: None,
        };
        let mut renderer = DefaultPromptRenderer::new(&config);
        let cwd = PathBuf::from("/tmp");
        assert_eq!(renderer.render_right(&ctx(&cwd)), None);
    }

    #[test]
    fn home_relative_cwd_display() {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/root"));
        let sub = home.join("projects");
        assert_eq!(display_cwd(&sub), "~/projects");
        assert_eq!(display_cwd(&home), "~");
    }
}
