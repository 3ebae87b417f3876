//! Terminal utilities for raw mode, terminal size, key encoding and
//! output rendering.
//!
//! Wraps crossterm's terminal operations and provides a RAII guard that
//! automatically restores the terminal state on drop.

use anyhow::{Context, Result};
use crossterm::cursor::MoveTo;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::QueueableCommand;
use std::io::Write;

/// RAII guard that restores the terminal to its original mode on drop.
pub struct RawModeGuard {
    _private: (),
}

impl RawModeGuard {
    /// Enter raw terminal mode.
    ///
    /// Returns a guard that will automatically restore the terminal when dropped.
    pub fn enter() -> Result<Self> {
        terminal::enable_raw_mode().context("failed to enable raw terminal mode")?;
        Ok(Self { _private: () })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Get the current terminal size as (columns, rows).
///
/// Falls back to (80, 24) if the size cannot be determined.
pub fn get_terminal_size() -> (u16, u16) {
    terminal::size().unwrap_or((80, 24))
}

/// Whether this key detaches from the session (Ctrl+]).
pub fn is_detach_key(event: &KeyEvent) -> bool {
    event.modifiers.contains(KeyModifiers::CONTROL) && event.code == KeyCode::Char(']')
}

/// Convert a crossterm key event to the bytes a terminal would send.
pub fn key_event_to_bytes(event: &KeyEvent) -> Option<Vec<u8>> {
    let mut bytes = match event.code {
        KeyCode::Char(c) => {
            if event.modifiers.contains(KeyModifiers::CONTROL) {
                // Ctrl+A = 0x01, Ctrl+B = 0x02, etc.
                let byte = (c.to_ascii_lowercase() as u8)
                    .wrapping_sub(b'a')
                    .wrapping_add(1);
                if (1..=26).contains(&byte) {
                    return Some(vec![byte]);
                }
            }
            let mut buf = [0u8; 4];
            c.encode_utf8(&mut buf).as_bytes().to_vec()
        }
        KeyCode::Enter => vec![b'\r'],
        KeyCode::Backspace => vec![0x7f],
        KeyCode::Tab => vec![b'\t'],
        KeyCode::BackTab => b"\x1b[Z".to_vec(),
        KeyCode::Esc => vec![0x1b],
        KeyCode::Up => b"\x1b[A".to_vec(),
        KeyCode::Down => b"\x1b[B".to_vec(),
        KeyCode::Right => b"\x1b[C".to_vec(),
        KeyCode::Left => b"\x1b[D".to_vec(),
        KeyCode::Home => b"\x1b[H".to_vec(),
        KeyCode::End => b"\x1b[F".to_vec(),
        KeyCode::PageUp => b"\x1b[5~".to_vec(),
        KeyCode::PageDown => b"\x1b[6~".to_vec(),
        KeyCode::Insert => b"\x1b[2~".to_vec(),
        KeyCode::Delete => b"\x1b[3~".to_vec(),
        KeyCode::F(n) => {
            let seq = match n {
                1 => "\x1bOP",
                2 => "\x1bOQ",
                3 => "\x1bOR",
                4 => "\x1bOS",
                5 => "\x1b[15~",
                6 => "\x1b[17~",
                7 => "\x1b[18~",
                8 => "\x1b[19~",
                9 => "\x1b[20~",
                10 => "\x1b[21~",
                11 => "\x1b[23~",
                12 => "\x1b[24~",
                _ => return None,
            };
            seq.as_bytes().to_vec()
        }
        _ => return None,
    };

    // Alt sends an ESC prefix.
    if event.modifiers.contains(KeyModifiers::ALT) {
        bytes.insert(0, 0x1b);
    }
    Some(bytes)
}

/// Raw mode disables output post-processing, so bare `\n` needs a `\r`.
pub fn to_raw_newlines(data: &str) -> String {
    let mut out = String::with_capacity(data.len() + data.len() / 32);
    let mut prev = '\0';
    for c in data.chars() {
        if c == '\n' && prev != '\r' {
            out.push('\r');
        }
        out.push(c);
        prev = c;
    }
    out
}

/// Draw one output frame. A non-append frame replaces the whole screen.
pub fn render_output<W: Write>(out: &mut W, data: &str, append: bool) -> Result<()> {
    if !append {
        out.queue(Clear(ClearType::All))?.queue(MoveTo(0, 0))?;
    }
    out.write_all(to_raw_newlines(data).as_bytes())?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventKind;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        let mut event = KeyEvent::new(code, modifiers);
        event.kind = KeyEventKind::Press;
        event
    }

    #[test]
    fn terminal_size_returns_nonzero() {
        let (cols, rows) = get_terminal_size();
        assert!(cols > 0);
        assert!(rows > 0);
    }

    #[test]
    fn control_letters() {
        let bytes = key_event_to_bytes(&key(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(bytes, Some(vec![0x03]));
        let bytes = key_event_to_bytes(&key(KeyCode::Char('A'), KeyModifiers::CONTROL));
        assert_eq!(bytes, Some(vec![0x01]));
    }

    #[test]
    fn special_keys() {
        let none = KeyModifiers::NONE;
        assert_eq!(key_event_to_bytes(&key(KeyCode::Enter, none)), Some(vec![b'\r']));
        assert_eq!(
            key_event_to_bytes(&key(KeyCode::BackTab, KeyModifiers::SHIFT)),
            Some(b"\x1b[Z".to_vec())
        );
        assert_eq!(
            key_event_to_bytes(&key(KeyCode::F(5), none)),
            Some(b"\x1b[15~".to_vec())
        );
        assert_eq!(key_event_to_bytes(&key(KeyCode::F(13), none)), None);
    }

    #[test]
    fn alt_prefixes_escape() {
        let bytes = key_event_to_bytes(&key(KeyCode::Char('b'), KeyModifiers::ALT));
        assert_eq!(bytes, Some(b"\x1bb".to_vec()));
    }

    #[test]
    fn detach_key() {
        assert!(is_detach_key(&key(KeyCode::Char(']'), KeyModifiers::CONTROL)));
        assert!(!is_detach_key(&key(KeyCode::Char(']'), KeyModifiers::NONE)));
    }

    #[test]
    fn newlines_for_raw_mode() {
        assert_eq!(to_raw_newlines("a\nb\r\nc"), "a\r\nb\r\nc");
        assert_eq!(to_raw_newlines(""), "");
    }

    #[test]
    fn append_frames_do_not_clear() {
        let mut buf = Vec::new();
        render_output(&mut buf, "x\n", true).unwrap();
        assert_eq!(buf, b"x\r\n");

        let mut buf = Vec::new();
        render_output(&mut buf, "y", false).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("\x1b[2J"));
        assert!(text.ends_with('y'));
    }
}
