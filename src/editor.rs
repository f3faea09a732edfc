//! Interactive line editor — the most complex component in this shell.
//! Owns the persistent kill ring, undo stack, and editing-mode state
//! for the shell's lifetime; each call to [`LineEditor::read_line`] owns a
//! fresh buffer/cursor/search/completion/visual state for that one line.

use std::io::{self, Write};

use crate::completion::{rank, Candidate, Completer};
use crate::fuzzy::fuzzy_score;
use crate::highlight::Highlighter;
use crate::history::History;
use crate::killring::KillRing;
use crate::terminal::{self, Key, KeyReader, RawMode};
use crate::undo::UndoStack;

#[derive(Debug)]
pub struct Interrupted;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditingMode {
    Emacs,
    Vi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViSubmode {
    Insert,
    Normal,
    Replace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Substring,
    Fuzzy,
}

/// Persistent line-editor state, owned by the shell for its whole lifetime
/// Kill ring and undo stack live here, not on the shell, since they're
/// editing-session state rather than shell state.
pub struct LineEditor {
    pub kill_ring: KillRing,
    undo: UndoStack,
    mode: EditingMode,
    vi_submode: ViSubmode,
    search_mode: SearchMode,
    macro_recording: bool,
    macro_buffer: Vec<Key>,
    macro_stored: Option<Vec<Key>>,
    ps2: String,
}

impl Default for LineEditor {
    fn default() -> Self {
        LineEditor {
            kill_ring: KillRing::default(),
            undo: UndoStack::default(),
            mode: EditingMode::Emacs,
            vi_submode: ViSubmode::Insert,
            search_mode: SearchMode::Substring,
            macro_recording: false,
            macro_buffer: Vec::new(),
            macro_stored: None,
            ps2: "> ".to_string(),
        }
    }
}

/// Ephemeral per-line editing state (buffer, cursor, and every transient
/// submachine: history nav, reverse search, completion menu, suggestion,
/// visual selection).
struct Line {
    buffer: Vec<char>,
    cursor: usize,
    history_nav: Option<HistoryNav>,
    suggestion: Option<String>,
    visual: Option<usize>,
    multiline: Vec<String>,
}

struct HistoryNav {
    matches: Vec<String>,
    index: Option<usize>,
    saved: String,
}

struct ReverseSearch {
    query: String,
    match_text: Option<String>,
    search_from: usize,
}

impl Line {
    fn new() -> Self {
        Line {
            buffer: Vec::new(),
            cursor: 0,
            history_nav: None,
            suggestion: None,
            visual: None,
            multiline: Vec::new(),
        }
    }

    fn as_string(&self) -> String {
        self.buffer.iter().collect()
    }

    fn clear_filter_and_suggestion(&mut self) {
        self.history_nav = None;
        self.suggestion = None;
    }
}

impl LineEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_mode(&mut self, mode: EditingMode) {
        self.mode = mode;
        self.vi_submode = ViSubmode::Insert;
    }

    pub fn mode(&self) -> EditingMode {
        self.mode
    }

    /// Top-level entry point: emits `prompt`, enters raw mode, processes
    /// bytes until Enter on complete input, Ctrl-D on an empty buffer
    /// (EOF), or Ctrl-C (Interrupted). Handles PS2 continuation for
    /// multi-line input internally. Raw mode is restored on every exit
    /// path via `RawMode`'s `Drop`.
    pub fn read_line(
        &mut self,
        prompt: &str,
        history: &History,
        completer: &dyn Completer,
        highlighter: &dyn Highlighter,
    ) -> Result<Option<String>, Interrupted> {
        self.read_line_with_right_prompt(prompt, None, history, completer, highlighter)
    }

    /// Same as [`Self::read_line`], but also draws `right_prompt` (if any)
    /// right-justified on the input line, the way `prompt.right_prompt`
    /// renders — recomputed on every redraw since it may contain a git
    /// branch that changes as the buffer's own content (e.g. `cd`) runs.
    pub fn read_line_with_right_prompt(
        &mut self,
        prompt: &str,
        right_prompt: Option<&str>,
        history: &History,
        completer: &dyn Completer,
        highlighter: &dyn Highlighter,
    ) -> Result<Option<String>, Interrupted> {
        let _raw = RawMode::enable().map_err(|_| Interrupted)?;
        let mut keys = KeyReader::new();
        let mut line = Line::new();
        let mut current_prompt = prompt.to_string();

        loop {
            self.redraw(&current_prompt, right_prompt, &line, highlighter);
            let key = keys.next_key();

            if terminal::resize_pending() {
                // Redraw happens at top of next loop iteration.
            }

            if self.macro_recording && !matches!(key, Key::Ctrl('x')) {
                self.macro_buffer.push(key);
            }

            match self.dispatch(
                key,
                &mut line,
                history,
                completer,
                highlighter,
                &mut keys,
            ) {
                DispatchResult::Continue => continue,
                DispatchResult::Submit => {
                    let candidate = line.multiline.iter().cloned().chain(std::iter::once(line.as_string())).collect::<Vec<_>>().join("\n");
                    if is_incomplete(&candidate) {
                        line.multiline.push(line.as_string());
                        line.buffer.clear();
                        line.cursor = 0;
                        line.clear_filter_and_suggestion();
                        current_prompt = self.ps2.clone();
                        continue;
                    }
                    println!();
                    return Ok(Some(candidate));
                }
                DispatchResult::Eof => {
                    if line.buffer.is_empty() && line.multiline.is_empty() {
                        println!();
                        return Ok(None);
                    }
                    continue;
                }
                DispatchResult::Interrupt => {
                    println!();
                    return Err(Interrupted);
                }
            }
        }
    }

    fn redraw(&self, prompt: &str, right_prompt: Option<&str>, line: &Line, highlighter: &dyn Highlighter) {
        let mut out = io::stdout();
        // CR + erase-in-line, prompt, buffer (optionally highlighted), then
        // move the cursor back to the logical position.
        let _ = write!(out, "\r\x1b[2K{prompt}");
        let rendered = highlighter.highlight(&line.as_string());
        let _ = write!(out, "{rendered}");
        if let Some(suggestion) = &line.suggestion {
            let _ = write!(out, "\x1b[2m{suggestion}\x1b[0m");
        }
        if let Some(right) = right_prompt.filter(|r| !r.is_empty()) {
            let width = terminal::terminal_width();
            let used = prompt.chars().count() + line.buffer.len();
            let col = width.saturating_sub(right.chars().count());
            if col > used {
                let _ = write!(out, "\x1b[s\x1b[{}G{right}\x1b[u", col + 1);
            }
        }
        let total_len = line.buffer.len();
        let back = total_len - line.cursor;
        if back > 0 {
            let _ = write!(out, "\x1b[{back}D");
        }
        let _ = out.flush();
    }

    fn dispatch(
        &mut self,
        key: Key,
        line: &mut Line,
        history: &History,
        completer: &dyn Completer,
        _highlighter: &dyn Highlighter,
        keys: &mut KeyReader,
    ) -> DispatchResult {
        if self.mode == EditingMode::Vi && self.vi_submode == ViSubmode::Normal {
            return self.dispatch_vi_normal(key, line, history);
        }

        match key {
            Key::Enter => return DispatchResult::Submit,
            Key::Ctrl('d') => {
                if line.buffer.is_empty() {
                    return DispatchResult::Eof;
                }
                if line.cursor < line.buffer.len() {
                    self.snapshot(line);
                    line.buffer.remove(line.cursor);
                }
            }
            Key::Ctrl('c') => {
                line.buffer.clear();
                line.cursor = 0;
                line.multiline.clear();
                line.clear_filter_and_suggestion();
                return DispatchResult::Interrupt;
            }
            Key::Esc if self.mode == EditingMode::Vi => {
                self.vi_submode = ViSubmode::Normal;
                if line.cursor > 0 && line.cursor == line.buffer.len() {
                    line.cursor -= 1;
                }
                return DispatchResult::Continue;
            }
            Key::Ctrl('a') => {
                line.cursor = 0;
                line.clear_filter_and_suggestion();
            }
            Key::Ctrl('e') => {
                line.cursor = line.buffer.len();
                self.refresh_suggestion(line, history);
            }
            Key::Ctrl('b') | Key::Left => {
                if line.cursor > 0 {
                    line.cursor -= 1;
                }
                line.suggestion = None;
            }
            Key::Ctrl('f') => self.move_right_or_accept(line, history),
            Key::Right => self.move_right_or_accept(line, history),
            Key::End => {
                line.cursor = line.buffer.len();
                self.refresh_suggestion(line, history);
            }
            Key::Home => line.cursor = 0,
            Key::Ctrl('l') => {
                let _ = write!(io::stdout(), "\x1b[2J\x1b[H");
            }
            Key::Ctrl('t') => self.transpose(line),
            Key::Ctrl('u') => {
                if let Some(start) = line.visual {
                    self.cut_visual(line, start);
                } else {
                    self.snapshot(line);
                    let killed: String = line.buffer[..line.cursor].iter().collect();
                    self.kill_ring.push(killed);
                    line.buffer.drain(..line.cursor);
                    line.cursor = 0;
                }
            }
            Key::Ctrl('k') => {
                self.snapshot(line);
                let killed: String = line.buffer[line.cursor..].iter().collect();
                self.kill_ring.push(killed);
                line.buffer.truncate(line.cursor);
            }
            Key::Ctrl('w') => {
                if let Some(start) = line.visual {
                    self.copy_visual(line, start);
                } else {
                    self.kill_word_backward(line);
                }
            }
            Key::Alt('d') => self.kill_word_forward(line),
            Key::Ctrl('y') => self.yank(line),
            Key::Ctrl('r') => self.reverse_search(line, history, keys),
            Key::Ctrl(' ') | Key::CtrlSpace => line.visual = Some(line.cursor),
            Key::Ctrl('_') | Key::Ctrl('/') => self.apply_undo(line),
            Key::Tab => self.complete(line, completer, keys),
            Key::BackTab => { /* handled inside completion cycling loop */ }
            Key::Up => self.history_prev(line, history),
            Key::Down => self.history_next(line, history),
            Key::Backspace => {
                if line.cursor > 0 {
                    self.snapshot(line);
                    line.cursor -= 1;
                    line.buffer.remove(line.cursor);
                    line.clear_filter_and_suggestion();
                }
            }
            Key::Delete => {
                if line.cursor < line.buffer.len() {
                    self.snapshot(line);
                    line.buffer.remove(line.cursor);
                }
            }
            Key::Ctrl('x') => {
                self.handle_macro_key(line, history, completer, _highlighter, keys)
            }
            Key::Char(c) => {
                self.snapshot(line);
                if self.mode == EditingMode::Vi
                    && self.vi_submode == ViSubmode::Replace
                    && line.cursor < line.buffer.len()
                {
                    line.buffer[line.cursor] = c;
                } else {
                    line.buffer.insert(line.cursor, c);
                }
                line.cursor += 1;
                line.clear_filter_and_suggestion();
                self.refresh_suggestion(line, history);
            }
            _ => {}
        }
        DispatchResult::Continue
    }

    fn move_right_or_accept(&mut self, line: &mut Line, history: &History) {
        if line.cursor == line.buffer.len() {
            if let Some(suggestion) = line.suggestion.take() {
                line.buffer.extend(suggestion.chars());
                line.cursor = line.buffer.len();
                return;
            }
        }
        if line.cursor < line.buffer.len() {
            line.cursor += 1;
        }
        self.refresh_suggestion(line, history);
    }

    fn snapshot(&mut self, line: &Line) {
        self.undo.push(line.as_string(), line.cursor);
    }

    fn apply_undo(&mut self, line: &mut Line) {
        if let Some(snap) = self.undo.pop() {
            line.buffer = snap.buffer.chars().collect();
            line.cursor = snap.cursor.min(line.buffer.len());
        }
    }

    fn transpose(&mut self, line: &mut Line) {
        let len = line.buffer.len();
        if len < 2 {
            return;
        }
        self.snapshot(line);
        let i = if line.cursor >= len { len - 1 } else { line.cursor };
        if i == 0 {
            return;
        }
        line.buffer.swap(i - 1, i);
        if line.cursor < len {
            line.cursor = (line.cursor + 1).min(len);
        }
    }

    fn kill_word_backward(&mut self, line: &mut Line) {
        self.snapshot(line);
        let end = line.cursor;
        let mut start = end;
        while start > 0 && line.buffer[start - 1].is_whitespace() {
            start -= 1;
        }
        while start > 0 && !line.buffer[start - 1].is_whitespace() {
            start -= 1;
        }
        let killed: String = line.buffer[start..end].iter().collect();
        self.kill_ring.push(killed);
        line.buffer.drain(start..end);
        line.cursor = start;
    }

    fn kill_word_forward(&mut self, line: &mut Line) {
        self.snapshot(line);
        let start = line.cursor;
        let mut end = start;
        let len = line.buffer.len();
        while end < len && line.buffer[end].is_whitespace() {
            end += 1;
        }
        while end < len && !line.buffer[end].is_whitespace() {
            end += 1;
        }
        let killed: String = line.buffer[start..end].iter().collect();
        self.kill_ring.push(killed);
        line.buffer.drain(start..end);
    }

    fn yank(&mut self, line: &mut Line) {
        let text = self.kill_ring.yank().map(str::to_string);
        if let Some(text) = text {
            self.snapshot(line);
            for (i, c) in text.chars().enumerate() {
                line.buffer.insert(line.cursor + i, c);
            }
            line.cursor += text.chars().count();
        }
    }

    fn copy_visual(&mut self, line: &mut Line, start: usize) {
        let (lo, hi) = if start <= line.cursor {
            (start, line.cursor)
        } else {
            (line.cursor, start)
        };
        let text: String = line.buffer[lo..hi].iter().collect();
        self.kill_ring.push(text);
        line.visual = None;
    }

    fn cut_visual(&mut self, line: &mut Line, start: usize) {
        self.snapshot(line);
        let (lo, hi) = if start <= line.cursor {
            (start, line.cursor)
        } else {
            (line.cursor, start)
        };
        let text: String = line.buffer[lo..hi].iter().collect();
        self.kill_ring.push(text);
        line.buffer.drain(lo..hi);
        line.cursor = lo;
        line.visual = None;
    }

    /// Inline suggestion ("ghost text"): at EOL with buffer length >= 3,
    /// search history newest-to-oldest for the first entry that has the
    /// buffer as a strict prefix.
    fn refresh_suggestion(&mut self, line: &mut Line, history: &History) {
        line.suggestion = None;
        if line.cursor != line.buffer.len() || line.buffer.len() < 3 {
            return;
        }
        let current = line.as_string();
        for entry in history.iter_newest_first() {
            if entry.len() > current.len() && entry.starts_with(&current) {
                line.suggestion = Some(entry[current.len()..].to_string());
                return;
            }
        }
    }

    /// History Up/Down with substring filtering.
    fn history_prev(&mut self, line: &mut Line, history: &History) {
        if line.history_nav.is_none() {
            let saved = line.as_string();
            let matches: Vec<String> = if saved.is_empty() {
                history.iter_newest_first().map(str::to_string).collect()
            } else {
                history
                    .iter_newest_first()
                    .filter(|e| e.contains(&saved))
                    .map(str::to_string)
                    .collect()
            };
            line.history_nav = Some(HistoryNav {
                matches,
                index: None,
                saved,
            });
        }
        let nav = line.history_nav.as_mut().unwrap();
        let next_index = match nav.index {
            None => 0,
            Some(i) if i + 1 < nav.matches.len() => i + 1,
            Some(i) => i,
        };
        if let Some(entry) = nav.matches.get(next_index) {
            nav.index = Some(next_index);
            line.buffer = entry.chars().collect();
            line.cursor = line.buffer.len();
        }
    }

    fn history_next(&mut self, line: &mut Line, _history: &History) {
        let Some(nav) = line.history_nav.as_mut() else {
            return;
        };
        match nav.index {
            Some(0) | None => {
                let saved = nav.saved.clone();
                line.buffer = saved.chars().collect();
                line.cursor = line.buffer.len();
                line.history_nav = None;
            }
            Some(i) => {
                let new_index = i - 1;
                nav.index = Some(new_index);
                let entry = nav.matches[new_index].clone();
                line.buffer = entry.chars().collect();
                line.cursor = line.buffer.len();
            }
        }
    }

    /// Reverse-incremental search (Ctrl-R). Runs its own tiny event loop
    /// since it replaces the prompt with `(reverse-i-search)\`query': match`
    /// rather than participating in the outer dispatch's buffer rendering.
    fn reverse_search(&mut self, line: &mut Line, history: &History, keys: &mut KeyReader) {
        let entries: Vec<&str> = history.iter_newest_first().collect();
        let mut search = ReverseSearch {
            query: String::new(),
            match_text: None,
            search_from: 0,
        };
        self.run_search_step(&mut search, &entries);

        loop {
            self.render_search(&search);
            let key = keys.next_key();
            match key {
                Key::Ctrl('c') => return,
                Key::Enter => {
                    if let Some(m) = search.match_text.clone() {
                        line.buffer = m.chars().collect();
                        line.cursor = line.buffer.len();
                    }
                    return;
                }
                Key::Ctrl('r') => {
                    search.search_from += 1;
                    self.run_search_step(&mut search, &entries);
                }
                Key::Ctrl('s') => {
                    self.search_mode = match self.search_mode {
                        SearchMode::Substring => SearchMode::Fuzzy,
                        SearchMode::Fuzzy => SearchMode::Substring,
                    };
                    self.run_search_step(&mut search, &entries);
                }
                Key::Backspace => {
                    search.query.pop();
                    search.search_from = 0;
                    self.run_search_step(&mut search, &entries);
                }
                Key::Char(c) => {
                    search.query.push(c);
                    search.search_from = 0;
                    self.run_search_step(&mut search, &entries);
                }
                _ => {
                    if let Some(m) = search.match_text.clone() {
                        line.buffer = m.chars().collect();
                        line.cursor = line.buffer.len();
                    }
                    return;
                }
            }
        }
    }

    fn run_search_step(&self, search: &mut ReverseSearch, entries: &[&str]) {
        let skip = search.search_from;
        match self.search_mode {
            SearchMode::Substring => {
                search.match_text = entries
                    .iter()
                    .skip(skip)
                    .find(|e| e.contains(&search.query))
                    .map(|s| s.to_string());
            }
            SearchMode::Fuzzy => {
                search.match_text = entries
                    .iter()
                    .skip(skip)
                    .map(|e| (fuzzy_score(&search.query, e), *e))
                    .filter(|(score, _)| *score > 0)
                    .max_by_key(|(score, _)| *score)
                    .map(|(_, e)| e.to_string());
            }
        }
    }

    fn render_search(&self, search: &ReverseSearch) {
        let mode_label = match self.search_mode {
            SearchMode::Substring => "reverse-i-search",
            SearchMode::Fuzzy => "fuzzy-reverse-i-search",
        };
        let display = search.match_text.as_deref().unwrap_or("");
        let mut out = io::stdout();
        let _ = write!(out, "\r\x1b[2K({mode_label})`{}': {display}", search.query);
        let _ = out.flush();
    }

    /// Tab completion: zero results rings the bell; one result either
    /// replaces the word (path-style completion) or appends the suffix;
    /// multiple results enter a cycling menu.
    fn complete(&mut self, line: &mut Line, completer: &dyn Completer, keys: &mut KeyReader) {
        let word_start = find_word_start(&line.buffer, line.cursor);
        let prefix: String = line.buffer[word_start..line.cursor].iter().collect();
        let before_cursor: String = line.buffer[..line.cursor].iter().collect();

        let candidates = completer.complete(&before_cursor, &prefix);
        let basename = prefix.rsplit('/').next().unwrap_or(&prefix);
        let ranked = rank(candidates, basename);

        match ranked.len() {
            0 => terminal::bell(),
            1 => self.apply_single_completion(line, word_start, &prefix, &ranked[0]),
            _ => self.run_completion_menu(line, word_start, &prefix, ranked, keys),
        }
    }

    fn apply_single_completion(&mut self, line: &mut Line, word_start: usize, prefix: &str, candidate: &Candidate) {
        self.snapshot(line);
        let label = candidate.label();
        let replacement: String = if prefix.contains('/') && label.contains('/') {
            label.to_string()
        } else if prefix.contains('/') {
            let dir = &prefix[..prefix.rfind('/').unwrap() + 1];
            format!("{dir}{label}")
        } else {
            label.to_string()
        };
        line.buffer.splice(word_start..line.cursor, replacement.chars());
        line.cursor = word_start + replacement.chars().count();
    }

    fn run_completion_menu(
        &mut self,
        line: &mut Line,
        word_start: usize,
        prefix: &str,
        candidates: Vec<Candidate>,
        keys: &mut KeyReader,
    ) {
        let original: String = line.buffer[word_start..line.cursor].iter().collect();
        let mut index = 0usize;
        loop {
            self.render_menu(&candidates, index);
            self.apply_single_completion(line, word_start, prefix, &candidates[index]);
            let key = keys.next_key();
            match key {
                Key::Tab | Key::Right | Key::Down => {
                    index = (index + 1) % candidates.len();
                }
                Key::BackTab | Key::Left | Key::Up => {
                    index = if index == 0 { candidates.len() - 1 } else { index - 1 };
                }
                Key::Ctrl('c') => {
                    line.buffer.splice(word_start..line.cursor, original.chars());
                    line.cursor = word_start + original.chars().count();
                    return;
                }
                _ => return,
            }
        }
    }

    fn render_menu(&self, candidates: &[Candidate], selected: usize) {
        let cols = terminal::terminal_width().max(20);
        let col_width = candidates.iter().map(|c| c.label().len()).max().unwrap_or(1) + 2;
        let num_cols = (cols / col_width).max(1);
        let mut out = io::stdout();
        let _ = write!(out, "\n");
        for (i, c) in candidates.iter().enumerate() {
            let styled = if i == selected {
                format!("\x1b[7m{}\x1b[0m", c.label())
            } else if c.is_dir {
                format!("\x1b[1;36m{}\x1b[0m", c.label())
            } else {
                c.label().to_string()
            };
            let _ = write!(out, "{:<width$}", styled, width = col_width + 9 /* ansi slack */);
            if (i + 1) % num_cols == 0 {
                let _ = write!(out, "\n");
            }
        }
        let _ = write!(out, "\x1b[1A\r");
        let _ = out.flush();
    }

    /// Ctrl-X prefix: `(` starts recording, `)` stops and stores the
    /// macro, `e` replays the stored macro by re-entering `dispatch` for
    /// each recorded key.
    fn handle_macro_key(
        &mut self,
        line: &mut Line,
        history: &History,
        completer: &dyn Completer,
        highlighter: &dyn Highlighter,
        keys: &mut KeyReader,
    ) {
        match keys.next_key() {
            Key::Char('(') => {
                self.macro_recording = true;
                self.macro_buffer.clear();
            }
            Key::Char(')') => {
                self.macro_recording = false;
                self.macro_stored = Some(std::mem::take(&mut self.macro_buffer));
            }
            Key::Char('e') => {
                if let Some(macro_keys) = self.macro_stored.clone() {
                    for k in macro_keys {
                        self.dispatch(k, line, history, completer, highlighter, keys);
                    }
                }
            }
            _ => {}
        }
    }

    fn dispatch_vi_normal(&mut self, key: Key, line: &mut Line, history: &History) -> DispatchResult {
        match key {
            Key::Char('i') => self.vi_submode = ViSubmode::Insert,
            Key::Char('a') => {
                if line.cursor < line.buffer.len() {
                    line.cursor += 1;
                }
                self.vi_submode = ViSubmode::Insert;
            }
            Key::Char('I') => {
                line.cursor = 0;
                self.vi_submode = ViSubmode::Insert;
            }
            Key::Char('A') => {
                line.cursor = line.buffer.len();
                self.vi_submode = ViSubmode::Insert;
            }
            Key::Char('o') | Key::Char('O') => {
                self.vi_submode = ViSubmode::Insert;
            }
            Key::Char('s') => {
                if line.cursor < line.buffer.len() {
                    self.snapshot(line);
                    line.buffer.remove(line.cursor);
                }
                self.vi_submode = ViSubmode::Insert;
            }
            Key::Char('S') | Key::Char('C') => {
                self.snapshot(line);
                line.buffer.clear();
                line.cursor = 0;
                self.vi_submode = ViSubmode::Insert;
            }
            Key::Char('R') => self.vi_submode = ViSubmode::Replace,
            Key::Char('h') | Key::Left => {
                if line.cursor > 0 {
                    line.cursor -= 1;
                }
            }
            Key::Char('l') | Key::Right => {
                if line.cursor + 1 < line.buffer.len() {
                    line.cursor += 1;
                }
            }
            Key::Char('k') => self.history_prev(line, history),
            Key::Char('j') => self.history_next(line, history),
            Key::Char('0') => line.cursor = 0,
            Key::Char('^') => {
                line.cursor = line.buffer.iter().position(|c| !c.is_whitespace()).unwrap_or(0);
            }
            Key::Char('$') => {
                line.cursor = line.buffer.len().saturating_sub(1);
            }
            Key::Char('w') => line.cursor = next_word_start(&line.buffer, line.cursor),
            Key::Char('b') => line.cursor = prev_word_start(&line.buffer, line.cursor),
            Key::Char('e') => line.cursor = word_end(&line.buffer, line.cursor),
            Key::Char('x') => {
                if line.cursor < line.buffer.len() {
                    self.snapshot(line);
                    line.buffer.remove(line.cursor);
                }
            }
            Key::Char('X') => {
                if line.cursor > 0 {
                    self.snapshot(line);
                    line.cursor -= 1;
                    line.buffer.remove(line.cursor);
                }
            }
            Key::Char('D') => {
                self.snapshot(line);
                line.buffer.truncate(line.cursor);
            }
            Key::Char('u') => self.apply_undo(line),
            Key::Enter => return DispatchResult::Submit,
            Key::Char('d') | Key::Char('c') => {
                // `dd`/`cc`: only whole-line
                // kill/change, so the second press of the same letter acts
                // on the full buffer.
                self.snapshot(line);
                let killed = line.as_string();
                self.kill_ring.push(killed);
                line.buffer.clear();
                line.cursor = 0;
                if key == Key::Char('c') {
                    self.vi_submode = ViSubmode::Insert;
                }
            }
            _ => {}
        }
        DispatchResult::Continue
    }
}

enum DispatchResult {
    Continue,
    Submit,
    Eof,
    Interrupt,
}

fn is_word_char(c: char) -> bool {
    !c.is_whitespace()
}

fn next_word_start(buffer: &[char], from: usize) -> usize {
    let mut i = from;
    let len = buffer.len();
    while i < len && is_word_char(buffer[i]) {
        i += 1;
    }
    while i < len && buffer[i].is_whitespace() {
        i += 1;
    }
    i.min(len.saturating_sub(1)).max(from.min(len.saturating_sub(1)))
}

fn prev_word_start(buffer: &[char], from: usize) -> usize {
    let mut i = from;
    while i > 0 && buffer[i - 1].is_whitespace() {
        i -= 1;
    }
    while i > 0 && is_word_char(buffer[i - 1]) {
        i -= 1;
    }
    i
}

fn word_end(buffer: &[char], from: usize) -> usize {
    let len = buffer.len();
    if len == 0 {
        return 0;
    }
    let mut i = (from + 1).min(len - 1);
    while i < len - 1 && buffer[i].is_whitespace() {
        i += 1;
    }
    while i < len - 1 && is_word_char(buffer[i + 1]) {
        i += 1;
    }
    i
}

const META_CHARS: &[char] = &['|', '&', ';', '(', ')'];

/// Scans left from `cursor` to the nearest whitespace or shell meta-char,
/// giving the completion word's start position.
fn find_word_start(buffer: &[char], cursor: usize) -> usize {
    let mut i = cursor;
    while i > 0 && !buffer[i - 1].is_whitespace() && !META_CHARS.contains(&buffer[i - 1]) {
        i -= 1;
    }
    i
}

/// Multi-line incompleteness detection: unterminated
/// single/double quotes, unbalanced brackets, or an odd number of trailing
/// backslashes. Escape rules mirror the tokenizer: inside single quotes
/// nothing escapes; inside double quotes backslash escapes the next char;
/// outside quotes backslash escapes the next char.
pub fn is_incomplete(text: &str) -> bool {
    let mut in_single = false;
    let mut in_double = false;
    let mut depth: i32 = 0;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if !in_single => {
                chars.next();
            }
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            '(' | '{' | '[' if !in_single && !in_double => depth += 1,
            ')' | '}' | ']' if !in_single && !in_double => depth -= 1,
            _ => {}
        }
    }

    if in_single || in_double || depth != 0 {
        return true;
    }

    // Odd trailing backslash count (outside quotes) means a line
    // continuation.
    let trailing_backslashes = text.chars().rev().take_while(|&c| c == '\\').count();
    trailing_backslashes % 2 == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_on_unterminated_double_quote() {
        assert!(is_incomplete("echo \"hello"));
    }

    #[test]
    fn complete_once_quote_closed_across_lines() {
        assert!(!is_incomplete("echo \"hello\nworld\""));
    }

    #[test]
    fn incomplete_on_unbalanced_paren() {
        assert!(is_incomplete("echo (hello"));
    }

    #[test]
    fn incomplete_on_trailing_backslash() {
        assert!(is_incomplete("echo hello\\"));
    }

    #[test]
    fn complete_simple_line() {
        assert!(!is_incomplete("echo hello world"));
    }

    #[test]
    fn single_quotes_suppress_escapes() {
        assert!(is_incomplete("echo 'it'\"'\"'s"));
    }

    #[test]
    fn find_word_start_scans_to_whitespace() {
        let buf: Vec<char> = "cat ma".chars().collect();
        assert_eq!(find_word_start(&buf, buf.len()), 4);
    }

    #[test]
    fn find_word_start_scans_to_pipe() {
        let buf: Vec<char> = "ls|gr".chars().collect();
        assert_eq!(find_word_start(&buf, buf.len()), 3);
    }
}
