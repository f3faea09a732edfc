//! Terminal I/O: raw-mode control, non-blocking byte reads, and
//! escape-sequence decoding into high-level [`Key`] events.
//!
//! Raw mode is entered via `termios` directly (mirroring the `nix`-based
//! process/signal plumbing the rest of this crate already uses for job
//! control) rather than pulling in a dedicated terminal crate: canonical
//! mode, echo, and signal generation (ISIG) are disabled, and VMIN/VTIME are
//! set to 0/1 so reads return about every 100ms even with nothing typed,
//! letting the caller's loop poll for resize/job events between keystrokes.

use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

#[cfg(unix)]
use nix::sys::termios::{self, LocalFlags, SetArg, SpecialCharacterIndices, Termios};
#[cfg(unix)]
use std::os::fd::AsFd;

/// Set by the SIGWINCH handler registered in `signals.rs`; the editor's
/// input loop checks this once per iteration and redraws when set.
pub static RESIZE_PENDING: AtomicBool = AtomicBool::new(false);

pub fn resize_pending() -> bool {
    RESIZE_PENDING.swap(false, Ordering::SeqCst)
}

pub fn mark_resize_pending() {
    RESIZE_PENDING.store(true, Ordering::SeqCst);
}

/// RAII guard: enables raw mode on construction, restores the original mode
/// on drop regardless of how the scope is exited (including panics and the
/// error paths in `read_line`). `enable`/`disable` are both idempotent.
pub struct RawMode {
    #[cfg(unix)]
    original: Option<Termios>,
    active: bool,
}

impl RawMode {
    #[cfg(unix)]
    pub fn enable() -> io::Result<Self> {
        let stdin = io::stdin();
        let original =
            termios::tcgetattr(stdin.as_fd()).map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let mut raw = original.clone();
        termios::cfmakeraw(&mut raw);
        raw.local_flags.remove(LocalFlags::ISIG);
        raw.control_chars[SpecialCharacterIndices::VMIN as usize] = 0;
        raw.control_chars[SpecialCharacterIndices::VTIME as usize] = 1;
        termios::tcsetattr(stdin.as_fd(), SetArg::TCSANOW, &raw)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        Ok(RawMode {
            original: Some(original),
            active: true,
        })
    }

    #[cfg(not(unix))]
    pub fn enable() -> io::Result<Self> {
        Ok(RawMode { active: true })
    }

    pub fn disable(&mut self) {
        if !self.active {
            return;
        }
        #[cfg(unix)]
        {
            if let Some(orig) = self.original.take() {
                let stdin = io::stdin();
                let _ = termios::tcsetattr(stdin.as_fd(), SetArg::TCSANOW, &orig);
            }
        }
        self.active = false;
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        self.disable();
    }
}

/// Non-blocking single-byte read from stdin. With VMIN=0/VTIME=1 set by
/// `RawMode::enable`, this blocks at most ~100ms and returns `None` if
/// nothing arrived in that window.
pub fn read_byte() -> Option<u8> {
    let mut buf = [0u8; 1];
    match io::stdin().read(&mut buf) {
        Ok(1) => Some(buf[0]),
        _ => None,
    }
}

/// Current terminal dimensions as `(rows, cols)`, falling back to 24x80
/// when undetectable (e.g. output redirected to a file).
pub fn window_size() -> (u16, u16) {
    terminal_size::terminal_size()
        .map(|(w, h)| (h.0, w.0))
        .unwrap_or((24, 80))
}

pub fn terminal_width() -> usize {
    window_size().1 as usize
}

pub fn bell() {
    let _ = io::stdout().write_all(b"\x07");
    let _ = io::stdout().flush();
}

/// High-level key events the escape parser resolves raw bytes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    /// Ctrl-<letter>, normalized to lowercase ascii (e.g. `Ctrl('a')`).
    Ctrl(char),
    Alt(char),
    Enter,
    Tab,
    BackTab,
    Backspace,
    Delete,
    Esc,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    CtrlLeft,
    CtrlRight,
    CtrlSpace,
    Unknown,
}

/// How long to wait for a follow-up byte after a lone `ESC` before treating
/// it as a standalone Escape keypress.
const ESC_TIMEOUT: Duration = Duration::from_millis(50);

/// Reads raw bytes via [`read_byte`] and assembles them into [`Key`] events.
#[derive(Default)]
pub struct KeyReader;

impl KeyReader {
    pub fn new() -> Self {
        KeyReader
    }

    /// Blocks (via repeated ~100ms polls) until one key event is produced.
    pub fn next_key(&mut self) -> Key {
        let b = loop {
            if let Some(b) = read_byte() {
                break b;
            }
        };
        self.decode(b)
    }

    /// Non-blocking variant used by the REPL's outer loop so it can also
    /// check for completed jobs and resize events between keystrokes.
    pub fn try_next_key(&mut self) -> Option<Key> {
        read_byte().map(|b| self.decode(b))
    }

    fn decode(&mut self, b: u8) -> Key {
        match b {
            0x1b => self.decode_escape(),
            0x0d | 0x0a => Key::Enter,
            0x09 => Key::Tab,
            0x7f | 0x08 => Key::Backspace,
            0x00 => Key::CtrlSpace,
            1..=26 => Key::Ctrl((b'a' + (b - 1)) as char),
            0x20..=0x7e => Key::Char(b as char),
            _ => decode_utf8_from(b).map(Key::Char).unwrap_or(Key::Unknown),
        }
    }

    fn decode_escape(&mut self) -> Key {
        let deadline = Instant::now() + ESC_TIMEOUT;
        let Some(next) = self.wait_byte(deadline) else {
            return Key::Esc;
        };
        match next {
            b'[' => self.decode_csi(deadline),
            b'b' => Key::Alt('b'),
            b'f' => Key::Alt('f'),
            b'd' => Key::Alt('d'),
            c if (0x20..=0x7e).contains(&c) => Key::Alt(c as char),
            _ => Key::Esc,
        }
    }

    fn decode_csi(&mut self, deadline: Instant) -> Key {
        let Some(first) = self.wait_byte(deadline) else {
            return Key::Esc;
        };
        match first {
            b'A' => Key::Up,
            b'B' => Key::Down,
            b'C' => Key::Right,
            b'D' => Key::Left,
            b'H' => Key::Home,
            b'F' => Key::End,
            b'Z' => Key::BackTab,
            b'0'..=b'9' => {
                let mut digits = vec![first];
                loop {
                    match self.wait_byte(deadline) {
                        Some(b @ b'0'..=b'9') => digits.push(b),
                        Some(b';') => digits.push(b';'),
                        Some(b'~') => {
                            return match digits.as_slice() {
                                [b'3'] => Key::Delete,
                                [b'5'] => Key::PageUp,
                                [b'6'] => Key::PageDown,
                                _ => Key::Unknown,
                            };
                        }
                        Some(b'C') => return Key::CtrlRight,
                        Some(b'D') => return Key::CtrlLeft,
                        _ => return Key::Unknown,
                    }
                }
            }
            _ => Key::Unknown,
        }
    }

    fn wait_byte(&mut self, deadline: Instant) -> Option<u8> {
        loop {
            if let Some(b) = read_byte() {
                return Some(b);
            }
            if Instant::now() >= deadline {
                return None;
            }
        }
    }
}

fn decode_utf8_from(lead: u8) -> Option<char> {
    let extra = if lead & 0xE0 == 0xC0 {
        1
    } else if lead & 0xF0 == 0xE0 {
        2
    } else if lead & 0xF8 == 0xF0 {
        3
    } else {
        return None;
    };
    let mut buf = vec![lead];
    for _ in 0..extra {
        buf.push(read_byte()?);
    }
    std::str::from_utf8(&buf).ok()?.chars().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_ascii_ctrl_a() {
        let mut r = KeyReader::new();
        assert_eq!(r.decode(1), Key::Ctrl('a'));
    }

    #[test]
    fn decode_printable_char() {
        let mut r = KeyReader::new();
        assert_eq!(r.decode(b'x'), Key::Char('x'));
    }

    #[test]
    fn decode_enter_and_tab() {
        let mut r = KeyReader::new();
        assert_eq!(r.decode(0x0d), Key::Enter);
        assert_eq!(r.decode(0x09), Key::Tab);
    }

    #[test]
    fn decode_backspace_variants() {
        let mut r = KeyReader::new();
        assert_eq!(r.decode(0x7f), Key::Backspace);
        assert_eq!(r.decode(0x08), Key::Backspace);
    }
}
