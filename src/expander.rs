//! Expander: variable/positional/special, brace, glob, and alias
//! expansion, applied in that order to each argument.

use std::path::Path;

use thiserror::Error;

use crate::env::{AliasTable, ArrayTable, Environment};
use crate::model::{
    CommandChain, ExpandedChain, ExpandedCommand, ParsedCommand, RedirKind, Redirection, Token,
    WordSegment,
};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ExpandError {
    #[error("bad variable syntax: {0}")]
    BadVariableSyntax(String),
    #[error("malformed brace expression: {0}")]
    MalformedBrace(String),
    #[error("too many expansions (possible brace/glob blowup)")]
    TooManyExpansions,
}

const MAX_EXPANSIONS: usize = 10_000;

/// A string paired with a per-character "quoted" mask, carried through
/// brace/glob expansion so single- and double-quoted spans stay literal
/// (spec §4.4: brace expansion applies only outside single quotes; this
/// crate's `WordSegment` doc extends that to double quotes too — only
/// `Bare` runs are glob/brace syntax, `Single`/`Double` runs are literal
/// text that happens to have already gone through variable expansion).
#[derive(Debug, Clone, Default)]
struct Guarded {
    chars: Vec<char>,
    quoted: Vec<bool>,
}

impl Guarded {
    fn new() -> Self {
        Guarded::default()
    }

    fn from_plain(s: &str) -> Self {
        let mut g = Guarded::new();
        g.push_str(s, false);
        g
    }

    fn push_str(&mut self, s: &str, quoted: bool) {
        for c in s.chars() {
            self.chars.push(c);
            self.quoted.push(quoted);
        }
    }

    fn push_char(&mut self, c: char, quoted: bool) {
        self.chars.push(c);
        self.quoted.push(quoted);
    }

    fn extend_from(&mut self, other: &Guarded) {
        self.chars.extend_from_slice(&other.chars);
        self.quoted.extend_from_slice(&other.quoted);
    }

    fn len(&self) -> usize {
        self.chars.len()
    }

    fn slice(&self, range: std::ops::Range<usize>) -> Guarded {
        Guarded {
            chars: self.chars[range.clone()].to_vec(),
            quoted: self.quoted[range].to_vec(),
        }
    }

    fn to_string(&self) -> String {
        self.chars.iter().collect()
    }
}

/// Everything the expander needs to resolve `$...` references, borrowed
/// immutably — the expander never mutates shell state itself.
pub struct ExpansionContext<'a> {
    pub env: &'a Environment,
    pub arrays: &'a ArrayTable,
    pub aliases: &'a AliasTable,
    pub positional: &'a [String],
    pub shell_name: &'a str,
    pub last_exit_code: i32,
    pub shell_pid: u32,
    pub last_background_pid: Option<u32>,
    pub last_arg: &'a str,
    pub cwd: &'a Path,
}

/// Expand a full [`CommandChain`] into an [`ExpandedChain`] of plain
/// strings, ready for built-in dispatch or execution.
pub fn expand_chain(
    chain: &CommandChain,
    ctx: &ExpansionContext,
) -> Result<ExpandedChain, ExpandError> {
    let mut commands = Vec::with_capacity(chain.commands.len());
    for cmd in &chain.commands {
        commands.push(expand_command(cmd, ctx)?);
    }
    Ok(ExpandedChain {
        commands,
        operators: chain.operators.clone(),
    })
}

fn expand_command(
    cmd: &ParsedCommand,
    ctx: &ExpansionContext,
) -> Result<ExpandedCommand, ExpandError> {
    // Command names are variable-expanded only (no brace/glob), then
    // alias-expanded exactly once. An alias's replacement text may itself
    // be multiple words (`alias ll='ls -la'`); the first word becomes the
    // new command name and the rest are prepended to the argument list,
    // exactly as a real shell re-reads the alias in command position.
    let raw_name = expand_variables_in_token(&cmd.name, ctx)?.to_string();
    let (name, mut args) = match ctx.aliases.get(&raw_name) {
        Some(replacement) => {
            let mut words = replacement.split_whitespace();
            let name = words.next().unwrap_or("").to_string();
            let extra: Vec<String> = words.map(str::to_string).collect();
            (name, extra)
        }
        None => (raw_name, Vec::new()),
    };

    for arg in &cmd.args {
        let var_expanded = expand_variables_in_token(arg, ctx)?;
        let braced = brace_expand(&var_expanded)?;
        for piece in braced {
            args.extend(glob_expand(&piece, ctx.cwd));
        }
    }

    let mut redirections = Vec::new();
    for (kind, target) in &cmd.redirections {
        // Redirection targets are variable-expanded only.
        let target = expand_variables_in_token(target, ctx)?.to_string();
        redirections.push(Redirection {
            kind: *kind,
            target,
        });
    }

    Ok(ExpandedCommand {
        name,
        args,
        redirections,
    })
}

/// Stage 1: variable / positional / special expansion, respecting quote
/// context (single-quoted segments are passed through literally; double-
/// quoted segments still undergo variable expansion). The result keeps a
/// per-character quoted mask so stages 2 and 3 know which spans came from
/// a quoted segment and must stay literal rather than being read as
/// brace/glob syntax.
fn expand_variables_in_token(tok: &Token, ctx: &ExpansionContext) -> Result<Guarded, ExpandError> {
    let segs = match tok {
        Token::Word(segs) => segs,
        _ => return Ok(Guarded::new()),
    };
    let mut out = Guarded::new();
    for seg in segs {
        match seg {
            WordSegment::Single(s) => out.push_str(s, true),
            WordSegment::Double(s) => out.push_str(&expand_variables_str(s, ctx)?, true),
            WordSegment::Bare(s) => out.push_str(&expand_variables_str(s, ctx)?, false),
        }
    }
    Ok(out)
}

fn expand_variables_str(input: &str, ctx: &ExpansionContext) -> Result<String, ExpandError> {
    let mut out = String::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '$' {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        // lone trailing `$`
        if i + 1 >= chars.len() {
            out.push('$');
            break;
        }
        let next = chars[i + 1];
        if next == '{' {
            let close = chars[i..]
                .iter()
                .position(|&c| c == '}')
                .map(|p| i + p)
                .ok_or_else(|| ExpandError::BadVariableSyntax(input.to_string()))?;
            let inner: String = chars[i + 2..close].iter().collect();
            out.push_str(&resolve_braced(&inner, ctx)?);
            i = close + 1;
        } else if next == '(' {
            // `$(cmd)` command substitution is stubbed: the text passes
            // through unchanged rather than spawning a subshell here (the
            // executor handles real subshell forms where needed).
            let mut depth = 1;
            let mut j = i + 2;
            while j < chars.len() && depth > 0 {
                match chars[j] {
                    '(' => depth += 1,
                    ')' => depth -= 1,
                    _ => {}
                }
                j += 1;
            }
            let inner: String = chars[i + 2..j.saturating_sub(1)].iter().collect();
            out.push_str("$(");
            out.push_str(&inner);
            out.push(')');
            i = j;
        } else if next.is_ascii_digit() {
            let idx: usize = next.to_digit(10).unwrap() as usize;
            if idx == 0 {
                out.push_str(ctx.shell_name);
            } else {
                out.push_str(ctx.positional.get(idx - 1).map(String::as_str).unwrap_or(""));
            }
            i += 2;
        } else {
            match next {
                '@' | '*' => {
                    out.push_str(&ctx.positional.join(" "));
                    i += 2;
                }
                '#' => {
                    out.push_str(&ctx.positional.len().to_string());
                    i += 2;
                }
                '?' => {
                    out.push_str(&ctx.last_exit_code.to_string());
                    i += 2;
                }
                '$' => {
                    out.push_str(&ctx.shell_pid.to_string());
                    i += 2;
                }
                '!' => {
                    out.push_str(
                        &ctx.last_background_pid
                            .map(|p| p.to_string())
                            .unwrap_or_default(),
                    );
                    i += 2;
                }
                '_' => {
                    out.push_str(ctx.last_arg);
                    i += 2;
                }
                c if c == '_' || c.is_ascii_alphabetic() => {
                    let start = i + 1;
                    let mut end = start;
                    while end < chars.len() && (chars[end].is_ascii_alphanumeric() || chars[end] == '_') {
                        end += 1;
                    }
                    let name: String = chars[start..end].iter().collect();
                    out.push_str(ctx.env.get(&name).unwrap_or(""));
                    i = end;
                }
                _ => {
                    out.push('$');
                    i += 1;
                }
            }
        }
    }
    Ok(out)
}

fn resolve_braced(inner: &str, ctx: &ExpansionContext) -> Result<String, ExpandError> {
    if let Some(stripped) = inner.strip_suffix("[@]") {
        return Ok(ctx.arrays.all_joined(stripped).unwrap_or_default());
    }
    if let Some(open) = inner.find('[') {
        if let Some(close) = inner.find(']') {
            let name = &inner[..open];
            let idx_str = &inner[open + 1..close];
            let idx: usize = idx_str
                .parse()
                .map_err(|_| ExpandError::BadVariableSyntax(inner.to_string()))?;
            return Ok(ctx.arrays.element(name, idx).unwrap_or("").to_string());
        }
    }
    // `${VAR}` plain form; falls back to array-first-element semantics if
    // no scalar is set but an array of that name exists (`$name` means
    // "first element" for arrays).
    if let Some(v) = ctx.env.get(inner) {
        return Ok(v.to_string());
    }
    Ok(ctx.arrays.first(inner).unwrap_or("").to_string())
}

/// Stage 2: brace expansion — `a{b,c,d}e` -> `[abe, ace, ade]`, plus
/// `{1..3}` numeric ranges. Only a `{`/`}` pair that came from an unquoted
/// (`Bare`) span is treated as brace syntax; a `{`/`,`/`}` that came from a
/// single- or double-quoted span is just literal text and is carried
/// through untouched (its quoted status is preserved on the result so
/// stage 3 also leaves it alone).
fn brace_expand(input: &Guarded) -> Result<Vec<Guarded>, ExpandError> {
    match find_open_brace(input) {
        None => Ok(vec![input.clone()]),
        Some(open) => {
            let close = find_matching_brace(input, open)
                .ok_or_else(|| ExpandError::MalformedBrace(input.to_string()))?;
            let prefix = input.slice(0..open);
            let inner = input.slice(open + 1..close);
            let suffix = input.slice(close + 1..input.len());

            let alternatives = brace_alternatives(&inner)?;
            let mut results = Vec::new();
            for alt in &alternatives {
                for suffix_expanded in brace_expand(&suffix)? {
                    if results.len() > MAX_EXPANSIONS {
                        return Err(ExpandError::TooManyExpansions);
                    }
                    let mut combined = prefix.clone();
                    combined.extend_from(alt);
                    combined.extend_from(&suffix_expanded);
                    results.push(combined);
                }
            }
            Ok(results)
        }
    }
}

/// First unquoted `{` in `input`, if any.
fn find_open_brace(input: &Guarded) -> Option<usize> {
    (0..input.len()).find(|&i| input.chars[i] == '{' && !input.quoted[i])
}

/// Matching unquoted `}` for the unquoted `{` at `open`, tracking nesting
/// depth over unquoted braces only — a quoted `{`/`}` inside is just a
/// literal character and never changes depth.
fn find_matching_brace(input: &Guarded, open: usize) -> Option<usize> {
    let mut depth = 0;
    for i in open..input.len() {
        if input.quoted[i] {
            continue;
        }
        match input.chars[i] {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn brace_alternatives(inner: &Guarded) -> Result<Vec<Guarded>, ExpandError> {
    if !inner.quoted.iter().any(|&q| q) {
        if let Some((lo, hi)) = parse_numeric_range(&inner.to_string()) {
            let nums: Vec<i64> = if lo <= hi {
                (lo..=hi).collect()
            } else {
                (hi..=lo).rev().collect()
            };
            return Ok(nums
                .into_iter()
                .map(|n| Guarded::from_plain(&n.to_string()))
                .collect());
        }
    }

    let parts = split_top_level_commas(inner);
    if parts.len() < 2 {
        // Not a real brace expression (e.g. literal `{foo}`); leave it
        // untouched by wrapping it back up.
        let mut wrapped = Guarded::new();
        wrapped.push_char('{', false);
        wrapped.extend_from(inner);
        wrapped.push_char('}', false);
        return Ok(vec![wrapped]);
    }
    Ok(parts)
}

fn parse_numeric_range(inner: &str) -> Option<(i64, i64)> {
    let (lo, hi) = inner.split_once("..")?;
    let lo: i64 = lo.parse().ok()?;
    let hi: i64 = hi.parse().ok()?;
    Some((lo, hi))
}

/// Splits `inner` on unquoted top-level commas (not inside a nested
/// unquoted `{...}`); a quoted comma is just a literal character.
fn split_top_level_commas(inner: &Guarded) -> Vec<Guarded> {
    let mut parts = Vec::new();
    let mut depth = 0;
    let mut current = Guarded::new();
    for i in 0..inner.len() {
        let c = inner.chars[i];
        let quoted = inner.quoted[i];
        match c {
            '{' if !quoted => {
                depth += 1;
                current.push_char(c, quoted);
            }
            '}' if !quoted => {
                depth -= 1;
                current.push_char(c, quoted);
            }
            ',' if !quoted && depth == 0 => {
                parts.push(std::mem::take(&mut current));
            }
            _ => current.push_char(c, quoted),
        }
    }
    parts.push(current);
    parts
}

/// Stage 3: glob expansion against the filesystem rooted at `cwd`. No
/// match means the pattern passes through unchanged (nullglob OFF). Only
/// unquoted `*`/`?`/`[` trigger globbing; a quoted glob metachar is
/// escaped to `[c]` so the `glob` crate treats it as a literal character
/// rather than wildcard syntax.
fn glob_expand(pattern: &Guarded, cwd: &Path) -> Vec<String> {
    let literal = pattern.to_string();
    let has_unquoted_meta = (0..pattern.len())
        .any(|i| !pattern.quoted[i] && matches!(pattern.chars[i], '*' | '?' | '['));
    if !has_unquoted_meta {
        return vec![literal];
    }

    let glob_pattern = build_glob_pattern(pattern);
    let joined = cwd.join(&glob_pattern);
    let pattern_str = joined.to_string_lossy().to_string();
    match glob::glob(&pattern_str) {
        Ok(paths) => {
            let mut matches: Vec<String> = paths
                .filter_map(|p| p.ok())
                .filter_map(|p| {
                    p.strip_prefix(cwd)
                        .map(|rel| rel.to_string_lossy().to_string())
                        .ok()
                })
                .collect();
            if matches.is_empty() {
                vec![literal]
            } else {
                matches.sort();
                matches
            }
        }
        Err(_) => vec![literal],
    }
}

/// Renders `pattern` to a `glob`-crate pattern string, escaping any
/// quoted glob metachar as a single-char bracket class (`[*]`) so it
/// matches itself literally instead of acting as wildcard syntax.
fn build_glob_pattern(pattern: &Guarded) -> String {
    let mut out = String::new();
    for i in 0..pattern.len() {
        let c = pattern.chars[i];
        if pattern.quoted[i] && matches!(c, '*' | '?' | '[' | ']') {
            out.push('[');
            out.push(c);
            out.push(']');
        } else {
            out.push(c);
        }
    }
    out
}

/// Used by `RedirKind` consumers that need the plain enum without the
/// `Redirection` wrapper (kept here so `executor.rs` doesn't need to
/// import both `model` and `expander`).
pub fn redir_kind_of(r: &Redirection) -> RedirKind {
    r.kind
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::parser::parse;
    use std::env;

    fn ctx<'a>(
        env_table: &'a Environment,
        arrays: &'a ArrayTable,
        aliases: &'a AliasTable,
        positional: &'a [String],
        cwd: &'a Path,
    ) -> ExpansionContext<'a> {
        ExpansionContext {
            env: env_table,
            arrays,
            aliases,
            positional,
            shell_name: "den",
            last_exit_code: 0,
            shell_pid: 4242,
            last_background_pid: None,
            last_arg: "",
            cwd,
        }
    }

    #[test]
    fn variable_and_quote_expansion() {
        let mut env_table = Environment::default();
        env_table.set("NAME", "world");
        let arrays = ArrayTable::default();
        let aliases = AliasTable::default();
        let positional: Vec<String> = vec![];
        let cwd = env::current_dir().unwrap();
        let c = ctx(&env_table, &arrays, &aliases, &positional, &cwd);

        let chain = parse(lex(r#"echo "hello $NAME""#).unwrap()).unwrap();
        let expanded = expand_chain(&chain, &c).unwrap();
        assert_eq!(expanded.commands[0].args, vec!["hello world"]);
    }

    #[test]
    fn single_quotes_suppress_variable_expansion() {
        let env_table = Environment::default();
        let arrays = ArrayTable::default();
        let aliases = AliasTable::default();
        let positional: Vec<String> = vec![];
        let cwd = env::current_dir().unwrap();
        let c = ctx(&env_table, &arrays, &aliases, &positional, &cwd);

        let chain = parse(lex("echo '$NAME'").unwrap()).unwrap();
        let expanded = expand_chain(&chain, &c).unwrap();
        assert_eq!(expanded.commands[0].args, vec!["$NAME"]);
    }

    #[test]
    fn special_variables() {
        let env_table = Environment::default();
        let arrays = ArrayTable::default();
        let aliases = AliasTable::default();
        let positional = vec!["one".to_string(), "two".to_string()];
        let cwd = env::current_dir().unwrap();
        let mut c = ctx(&env_table, &arrays, &aliases, &positional, &cwd);
        c.last_exit_code = 7;
        c.last_background_pid = Some(999);

        let chain = parse(lex("echo $1 $2 $# $? $!").unwrap()).unwrap();
        let expanded = expand_chain(&chain, &c).unwrap();
        assert_eq!(expanded.commands[0].args, vec!["one", "two", "2", "7", "999"]);
    }

    #[test]
    fn brace_expansion_cartesian() {
        let result: Vec<String> = brace_expand(&Guarded::from_plain("a{b,c,d}e"))
            .unwrap()
            .iter()
            .map(Guarded::to_string)
            .collect();
        assert_eq!(result, vec!["abe", "ace", "ade"]);
    }

    #[test]
    fn brace_expansion_numeric_range() {
        let result: Vec<String> = brace_expand(&Guarded::from_plain("{1..3}"))
            .unwrap()
            .iter()
            .map(Guarded::to_string)
            .collect();
        assert_eq!(result, vec!["1", "2", "3"]);
    }

    #[test]
    fn single_quoted_braces_stay_literal() {
        let env_table = Environment::default();
        let arrays = ArrayTable::default();
        let aliases = AliasTable::default();
        let positional: Vec<String> = vec![];
        let cwd = env::current_dir().unwrap();
        let c = ctx(&env_table, &arrays, &aliases, &positional, &cwd);

        let chain = parse(lex("echo '{a,b}'").unwrap()).unwrap();
        let expanded = expand_chain(&chain, &c).unwrap();
        assert_eq!(expanded.commands[0].args, vec!["{a,b}"]);
    }

    #[test]
    fn double_quoted_braces_stay_literal() {
        let env_table = Environment::default();
        let arrays = ArrayTable::default();
        let aliases = AliasTable::default();
        let positional: Vec<String> = vec![];
        let cwd = env::current_dir().unwrap();
        let c = ctx(&env_table, &arrays, &aliases, &positional, &cwd);

        let chain = parse(lex(r#"echo "{a,b}""#).unwrap()).unwrap();
        let expanded = expand_chain(&chain, &c).unwrap();
        assert_eq!(expanded.commands[0].args, vec!["{a,b}"]);
    }

    #[test]
    fn single_quoted_glob_stays_literal() {
        let env_table = Environment::default();
        let arrays = ArrayTable::default();
        let aliases = AliasTable::default();
        let positional: Vec<String> = vec![];
        let cwd = env::current_dir().unwrap();
        let c = ctx(&env_table, &arrays, &aliases, &positional, &cwd);

        let chain = parse(lex("echo '*.txt'").unwrap()).unwrap();
        let expanded = expand_chain(&chain, &c).unwrap();
        assert_eq!(expanded.commands[0].args, vec!["*.txt"]);
    }

    #[test]
    fn double_quoted_glob_stays_literal() {
        let env_table = Environment::default();
        let arrays = ArrayTable::default();
        let aliases = AliasTable::default();
        let positional: Vec<String> = vec![];
        let cwd = env::current_dir().unwrap();
        let c = ctx(&env_table, &arrays, &aliases, &positional, &cwd);

        let chain = parse(lex(r#"echo "*.txt""#).unwrap()).unwrap();
        let expanded = expand_chain(&chain, &c).unwrap();
        assert_eq!(expanded.commands[0].args, vec!["*.txt"]);
    }

    #[test]
    fn unquoted_glob_still_expands_against_cwd() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "").unwrap();
        std::fs::write(dir.path().join("b.txt"), "").unwrap();

        let env_table = Environment::default();
        let arrays = ArrayTable::default();
        let aliases = AliasTable::default();
        let positional: Vec<String> = vec![];
        let c = ctx(&env_table, &arrays, &aliases, &positional, dir.path());

        let chain = parse(lex("echo *.txt").unwrap()).unwrap();
        let expanded = expand_chain(&chain, &c).unwrap();
        assert_eq!(expanded.commands[0].args, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn last_arg_special_variable_expands() {
        let env_table = Environment::default();
        let arrays = ArrayTable::default();
        let aliases = AliasTable::default();
        let positional: Vec<String> = vec![];
        let cwd = env::current_dir().unwrap();
        let mut c = ctx(&env_table, &arrays, &aliases, &positional, &cwd);
        c.last_arg = "out.txt";

        let chain = parse(lex("echo $_").unwrap()).unwrap();
        let expanded = expand_chain(&chain, &c).unwrap();
        assert_eq!(expanded.commands[0].args, vec!["out.txt"]);
    }

    #[test]
    fn alias_expansion_applies_only_to_name() {
        let env_table = Environment::default();
        let arrays = ArrayTable::default();
        let mut aliases = AliasTable::default();
        aliases.set("ll", "ls -la");
        let positional: Vec<String> = vec![];
        let cwd = env::current_dir().unwrap();
        let c = ctx(&env_table, &arrays, &aliases, &positional, &cwd);

        let chain = parse(lex("ll ll").unwrap()).unwrap();
        let expanded = expand_chain(&chain, &c).unwrap();
        assert_eq!(expanded.commands[0].name, "ls");
        assert_eq!(expanded.commands[0].args, vec!["-la", "ll"]);
    }

    #[test]
    fn array_element_and_all_expansion() {
        let env_table = Environment::default();
        let mut arrays = ArrayTable::default();
        arrays.set("files", vec!["a.txt".into(), "b.txt".into()]);
        let aliases = AliasTable::default();
        let positional: Vec<String> = vec![];
        let cwd = env::current_dir().unwrap();
        let c = ctx(&env_table, &arrays, &aliases, &positional, &cwd);

        let chain = parse(lex("echo ${files[0]} ${files[@]}").unwrap()).unwrap();
        let expanded = expand_chain(&chain, &c).unwrap();
        assert_eq!(expanded.commands[0].args, vec!["a.txt", "a.txt b.txt"]);
    }

    #[test]
    fn glob_no_match_passes_through_unchanged() {
        let env_table = Environment::default();
        let arrays = ArrayTable::default();
        let aliases = AliasTable::default();
        let positional: Vec<String> = vec![];
        let cwd = env::current_dir().unwrap();
        let c = ctx(&env_table, &arrays, &aliases, &positional, &cwd);

        let chain = parse(lex("echo *.nonexistent_ext_zzz").unwrap()).unwrap();
        let expanded = expand_chain(&chain, &c).unwrap();
        assert_eq!(expanded.commands[0].args, vec!["*.nonexistent_ext_zzz"]);
    }
}
