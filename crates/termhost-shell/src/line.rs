//! Editable line buffer with cursor tracking, history, and echo generation.
//!
//! [`LineState`] is a plain value type: every edit mutates the buffer and
//! appends the terminal bytes that make the user's screen match. The
//! discipline layer owns the lock and decides whether the echo bytes are
//! actually emitted (they are dropped in raw mode).
//!
//! Cursor-move sequences follow the usual terminal convention: a move of
//! one is the bare `ESC[D`/`ESC[C`, a move of n > 1 carries the decimal
//! count, and a move of zero emits nothing.

use std::io::Write as _;

/// Line buffer, cursor, and history for one shell instance.
///
/// The buffer holds printable ASCII only; the parser has already discarded
/// everything else. Invariant: `cursor <= buffer.len()`.
#[derive(Debug)]
pub(crate) struct LineState {
    buffer: Vec<u8>,
    cursor: usize,
    history: Vec<String>,
    /// `None` means the user is editing a fresh draft, not recalling
    /// history.
    history_index: Option<usize>,
    /// Draft text and cursor captured when the user first pressed Up, so
    /// navigating Down past the newest entry restores it bit-identically.
    saved_draft: Option<(String, usize)>,
    max_history: usize,
    history_enabled: bool,
}

impl LineState {
    pub fn new(max_history: usize, history_enabled: bool) -> Self {
        Self {
            buffer: Vec::new(),
            cursor: 0,
            history: Vec::new(),
            history_index: None,
            saved_draft: None,
            max_history,
            history_enabled,
        }
    }

    pub fn line(&self) -> &[u8] {
        &self.buffer
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    // -----------------------------------------------------------------------
    // Editing
    // -----------------------------------------------------------------------

    pub fn insert(&mut self, byte: u8, echo: &mut Vec<u8>) {
        if self.cursor == self.buffer.len() {
            self.buffer.push(byte);
            self.cursor += 1;
            echo.push(byte);
        } else {
            self.buffer.insert(self.cursor, byte);
            self.cursor += 1;
            let tail_len = self.buffer.len() - self.cursor;
            echo.push(byte);
            echo.extend_from_slice(&self.buffer[self.cursor..]);
            csi_left(tail_len, echo);
        }
    }

    pub fn backspace(&mut self, echo: &mut Vec<u8>) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        self.buffer.remove(self.cursor);
        let tail_len = self.buffer.len() - self.cursor;
        csi_left(1, echo);
        echo.extend_from_slice(&self.buffer[self.cursor..]);
        echo.push(b' ');
        csi_left(tail_len + 1, echo);
    }

    pub fn delete_forward(&mut self, echo: &mut Vec<u8>) {
        if self.cursor >= self.buffer.len() {
            return;
        }
        self.buffer.remove(self.cursor);
        let tail_len = self.buffer.len() - self.cursor;
        echo.extend_from_slice(&self.buffer[self.cursor..]);
        echo.push(b' ');
        csi_left(tail_len + 1, echo);
    }

    pub fn cursor_left(&mut self, echo: &mut Vec<u8>) {
        if self.cursor > 0 {
            self.cursor -= 1;
            csi_left(1, echo);
        }
    }

    pub fn cursor_right(&mut self, echo: &mut Vec<u8>) {
        if self.cursor < self.buffer.len() {
            self.cursor += 1;
            csi_right(1, echo);
        }
    }

    pub fn cursor_home(&mut self, echo: &mut Vec<u8>) {
        if self.cursor > 0 {
            csi_left(self.cursor, echo);
            self.cursor = 0;
        }
    }

    pub fn cursor_end(&mut self, echo: &mut Vec<u8>) {
        if self.cursor < self.buffer.len() {
            csi_right(self.buffer.len() - self.cursor, echo);
            self.cursor = self.buffer.len();
        }
    }

    /// Ctrl+W: delete the word left of the cursor — skip any spaces
    /// immediately left of it, then delete back to the previous space
    /// boundary or the start of the line.
    pub fn kill_word_left(&mut self, echo: &mut Vec<u8>) {
        if self.cursor == 0 {
            return;
        }
        let mut start = self.cursor;
        while start > 0 && self.buffer[start - 1] == b' ' {
            start -= 1;
        }
        while start > 0 && self.buffer[start - 1] != b' ' {
            start -= 1;
        }
        let removed = self.cursor - start;
        self.buffer.drain(start..self.cursor);
        self.cursor = start;

        let tail_len = self.buffer.len() - self.cursor;
        csi_left(removed, echo);
        echo.extend_from_slice(&self.buffer[self.cursor..]);
        echo.extend(std::iter::repeat(b' ').take(removed));
        csi_left(tail_len + removed, echo);
    }

    // -----------------------------------------------------------------------
    // History navigation
    // -----------------------------------------------------------------------

    pub fn history_prev(&mut self, prompt: &str, echo: &mut Vec<u8>) {
        match self.history_index {
            None => {
                if self.history.is_empty() {
                    return;
                }
                let draft = String::from_utf8_lossy(&self.buffer).into_owned();
                self.saved_draft = Some((draft, self.cursor));
                self.load_entry(self.history.len() - 1, prompt, echo);
            }
            Some(0) => {}
            Some(index) => self.load_entry(index - 1, prompt, echo),
        }
    }

    pub fn history_next(&mut self, prompt: &str, echo: &mut Vec<u8>) {
        match self.history_index {
            None => {}
            Some(index) if index + 1 < self.history.len() => {
                self.load_entry(index + 1, prompt, echo);
            }
            Some(_) => {
                let (draft, cursor) = self.saved_draft.take().unwrap_or_default();
                self.buffer = draft.into_bytes();
                self.cursor = cursor.min(self.buffer.len());
                self.history_index = None;
                self.replace_line_echo(prompt, echo);
            }
        }
    }

    fn load_entry(&mut self, index: usize, prompt: &str, echo: &mut Vec<u8>) {
        self.history_index = Some(index);
        self.buffer = self.history[index].clone().into_bytes();
        self.cursor = self.buffer.len();
        self.replace_line_echo(prompt, echo);
    }

    /// Overwrite the displayed line: carriage return, prompt, contents,
    /// erase-to-EOL, then restore a mid-line cursor when needed.
    fn replace_line_echo(&self, prompt: &str, echo: &mut Vec<u8>) {
        echo.push(b'\r');
        echo.extend_from_slice(prompt.as_bytes());
        echo.extend_from_slice(&self.buffer);
        echo.extend_from_slice(b"\x1b[K");
        csi_left(self.buffer.len() - self.cursor, echo);
    }

    // -----------------------------------------------------------------------
    // Line completion
    // -----------------------------------------------------------------------

    /// Ctrl+C: discard the line, the saved draft, and any history position.
    pub fn cancel(&mut self, prompt: &str, echo: &mut Vec<u8>) {
        echo.extend_from_slice(b"^C\r\n");
        echo.extend_from_slice(prompt.as_bytes());
        self.buffer.clear();
        self.cursor = 0;
        self.saved_draft = None;
        self.history_index = None;
    }

    /// Enter: take the trimmed line and reset the edit state.
    ///
    /// Returns `None` for an empty or whitespace-only line. A non-empty
    /// line is appended to history unless it repeats the newest entry;
    /// the oldest entry is evicted when the bound is exceeded.
    pub fn take_line(&mut self) -> Option<String> {
        let raw = String::from_utf8_lossy(&self.buffer).into_owned();
        let trimmed = raw.trim().to_string();
        self.buffer.clear();
        self.cursor = 0;
        self.history_index = None;
        self.saved_draft = None;

        if trimmed.is_empty() {
            return None;
        }
        if self.history_enabled && self.history.last() != Some(&trimmed) {
            self.history.push(trimmed.clone());
            if self.history.len() > self.max_history {
                self.history.remove(0);
            }
        }
        Some(trimmed)
    }

    /// Redraw after a clear-screen: prompt plus the line being edited,
    /// cursor restored to its logical position.
    pub fn redraw_echo(&self, prompt: &str, echo: &mut Vec<u8>) {
        echo.extend_from_slice(prompt.as_bytes());
        echo.extend_from_slice(&self.buffer);
        csi_left(self.buffer.len() - self.cursor, echo);
    }
}

fn csi_left(n: usize, out: &mut Vec<u8>) {
    match n {
        0 => {}
        1 => out.extend_from_slice(b"\x1b[D"),
        n => {
            let _ = write!(out, "\x1b[{n}D");
        }
    }
}

fn csi_right(n: usize, out: &mut Vec<u8>) {
    match n {
        0 => {}
        1 => out.extend_from_slice(b"\x1b[C"),
        n => {
            let _ = write!(out, "\x1b[{n}C");
        }
    }
}
