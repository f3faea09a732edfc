//! Configuration loading: search a fixed list of JSONC paths for the first
//! hit, strip comments/trailing commas by hand (JSONC is not valid JSON), and
//! deserialize with `serde_json` into a fully-defaulted `Config`. Out-of-range
//! numeric values are warnings, not hard failures — the value is still
//! applied.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub max_entries: usize,
    pub file: Option<String>,
    pub ignore_duplicates: bool,
    pub ignore_space: bool,
    pub search_mode: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        HistoryConfig {
            max_entries: 1000,
            file: None,
            ignore_duplicates: true,
            ignore_space: false,
            search_mode: "fuzzy".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CompletionCacheConfig {
    pub enabled: bool,
    pub max_entries: usize,
    pub ttl: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub max_suggestions: usize,
    pub cache: CompletionCacheConfig,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        CompletionConfig {
            max_suggestions: 50,
            cache: CompletionCacheConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ThemeColors {
    pub primary: Option<String>,
    pub secondary: Option<String>,
    pub success: Option<String>,
    pub warning: Option<String>,
    pub error: Option<String>,
    pub info: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ThemeSymbols {
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ThemeConfig {
    pub name: Option<String>,
    pub colors: ThemeColors,
    pub symbols: ThemeSymbols,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub format: String,
    pub right_prompt: Option<String>,
}

impl Default for PromptConfig {
    fn default() -> Self {
        PromptConfig {
            format: "%u@%h %c %$ ".to_string(),
            right_prompt: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ExpansionCacheLimits {
    pub glob: Option<usize>,
    pub variable: Option<usize>,
    pub exec: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ExpansionConfig {
    pub cache_limits: ExpansionCacheLimits,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomAlias {
    pub name: String,
    pub command: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuffixAlias {
    pub extension: String,
    pub command: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AliasesConfig {
    pub custom: Vec<CustomAlias>,
    pub suffix: Vec<SuffixAlias>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomKeybinding {
    pub key: String,
    pub action: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct KeybindingsConfig {
    pub custom: Vec<CustomKeybinding>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnvVarEntry {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub variables: Vec<EnvVarEntry>,
}

/// Deserialized shape of a `den.jsonc` (or `package.jsonc`'s `"den"` key).
/// Every field carries a default so a partial or absent file still yields a
/// fully-populated `Config`.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub history: HistoryConfig,
    pub completion: CompletionConfig,
    pub theme: ThemeConfig,
    pub prompt: PromptConfig,
    pub expansion: ExpansionConfig,
    pub aliases: AliasesConfig,
    pub keybindings: KeybindingsConfig,
    pub environment: EnvironmentConfig,
}

impl Config {
    pub fn history_file(&self) -> PathBuf {
        if let Some(path) = &self.history.file {
            return expand_tilde(path);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".den_history")
    }

    /// Clamp/validate numeric fields to their documented ranges, logging a
    /// warning (and keeping the applied, possibly out-of-range value) rather
    /// than erroring.
    fn validate(&self) {
        if self.history.max_entries == 0 {
            tracing::warn!(
                "history.max_entries must be > 0, got 0; treating as unbounded is not supported, using 1"
            );
        }
        if self.completion.max_suggestions == 0 {
            tracing::warn!("completion.max_suggestions must be >= 1, got 0");
        }
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Fixed search order: the first existing path wins. Two of the
/// entries live under a `"den"` key inside an otherwise-unrelated
/// `package.jsonc` file.
fn search_candidates() -> Vec<(PathBuf, bool)> {
    let mut out = vec![
        (PathBuf::from("den.jsonc"), false),
        (PathBuf::from("package.jsonc"), true),
        (PathBuf::from("config/den.jsonc"), false),
        (PathBuf::from(".config/den.jsonc"), false),
    ];
    if let Some(home) = dirs::home_dir() {
        out.push((home.join(".config/den.jsonc"), false));
        out.push((home.join("package.jsonc"), true));
    }
    out
}

/// Load configuration from the first matching path in the search order,
/// falling back to defaults when nothing is found. Parse errors in a found
/// file are propagated (the file exists but is malformed); a missing file is
/// not an error.
pub fn load() -> Result<Config, ConfigError> {
    for (path, nested) in search_candidates() {
        if !path.is_file() {
            continue;
        }
        let config = load_from(&path, nested)?;
        return Ok(config);
    }
    Ok(Config::default())
}

fn load_from(path: &Path, nested_under_den_key: bool) -> Result<Config, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let stripped = strip_jsonc_comments(&raw);
    let config = if nested_under_den_key {
        let value: serde_json::Value =
            serde_json::from_str(&stripped).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        match value.get("den") {
            Some(den) => serde_json::from_value(den.clone()).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?,
            None => Config::default(),
        }
    } else {
        serde_json::from_str(&stripped).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?
    };
    config.validate();
    Ok(config)
}

/// Strip `//` line comments and `/* */` block comments, and trailing commas
/// before `}`/`]`, honoring string literals (comment markers and commas
/// inside quoted strings are left alone). JSONC has no other syntactic
/// difference from JSON, so the result is handed straight to `serde_json`.
fn strip_jsonc_comments(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;
    let mut in_string = false;
    let mut escaped = false;

    while i < chars.len() {
        let c = chars[i];
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
                i += 1;
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i + 1 < chars.len() && !(chars[i] == '*' && chars[i + 1] == '/') {
                    i += 1;
                }
                i += 2;
            }
            ',' => {
                let mut j = i + 1;
                while j < chars.len() && chars[j].is_whitespace() {
                    j += 1;
                }
                if j < chars.len() && (chars[j] == '}' || chars[j] == ']') {
                    // trailing comma: drop it
                } else {
                    out.push(c);
                }
                i += 1;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = Config::default();
        assert_eq!(cfg.history.max_entries, 1000);
        assert!(cfg.history.ignore_duplicates);
        assert_eq!(cfg.completion.max_suggestions, 50);
    }

    #[test]
    fn strips_line_and_block_comments() {
        let src = r#"{
            // a comment
            "history": { "max_entries": 42 /* inline */ }
        }"#;
        let stripped = strip_jsonc_comments(src);
        let parsed: Config = serde_json::from_str(&stripped).unwrap();
        assert_eq!(parsed.history.max_entries, 42);
    }

    #[test]
    fn strips_trailing_commas() {
        let src = r#"{"history": {"max_entries": 5,},}"#;
        let stripped = strip_jsonc_comments(src);
        let parsed: Config = serde_json::from_str(&stripped).unwrap();
        assert_eq!(parsed.history.max_entries, 5);
    }

    #[test]
    fn comment_markers_inside_strings_are_preserved() {
        let src = r#"{"prompt": {"format": "a // not a comment"}}"#;
        let stripped = strip_jsonc_comments(src);
        let parsed: Config = serde_json::from_str(&stripped).unwrap();
        assert_eq!(parsed.prompt.format, "a // not a comment");
    }

    #[test]
    fn load_from_missing_path_is_not_attempted_by_load() {
        // load() silently falls back to defaults when nothing on disk matches;
        // this just documents that contract without touching the real FS search.
        let cfg = Config::default();
        assert_eq!(cfg.theme.name, None);
    }

    #[test]
    fn history_file_expands_tilde() {
        let mut cfg = Config::default();
        cfg.history.file = Some("~/.custom_history".to_string());
        let path = cfg.history_file();
        assert!(path.ends_with(".custom_history"));
        assert!(!path.to_string_lossy().contains('~'));
    }
}
