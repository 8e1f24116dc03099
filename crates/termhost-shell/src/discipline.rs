//! Line-discipline shell: turns a raw input byte stream into edited command
//! lines, with echo, history, and cursor editing, then hands each completed
//! line to a [`LineHandler`].
//!
//! This is the cooked-mode layer most custom shells build on. A handler
//! only decides *what* commands do; everything about *how* a line is edited
//! lives here.

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{Result, ShellError};
use crate::line::LineState;
use crate::parser::{InputAction, InputParser};
use crate::pump::{OutputSink, ShellCore};
use crate::shell::{OutputListener, Shell, TerminatedListener};
use crate::types::{OutputKind, ShellMetadata, StartOptions, SubscriptionId};

/// Prompt used when a handler does not override [`LineHandler::prompt`].
pub const DEFAULT_PROMPT: &str = "$ ";

/// Knobs controlling the line discipline.
#[derive(Debug, Clone)]
pub struct LineDisciplineOptions {
    /// Completed commands kept for Up/Down recall; oldest evicted first.
    pub max_history_size: usize,
    /// Echo edits back to the terminal.
    pub echo_input: bool,
    /// Record completed commands and honor Up/Down.
    pub enable_history: bool,
    /// Decode CSI sequences. When off, ESC is discarded and the rest of a
    /// sequence arrives as ordinary printable bytes.
    pub parse_escape_sequences: bool,
}

impl Default for LineDisciplineOptions {
    fn default() -> Self {
        Self {
            max_history_size: termhost_core::config::DEFAULT_MAX_HISTORY,
            echo_input: true,
            enable_history: true,
            parse_escape_sequences: true,
        }
    }
}

impl LineDisciplineOptions {
    /// Raw preset: bytes still collect into a line and Enter still executes,
    /// but echo, history, and escape parsing are all off.
    pub fn raw() -> Self {
        Self {
            echo_input: false,
            enable_history: false,
            parse_escape_sequences: false,
            ..Self::default()
        }
    }
}

/// Output context handed to a [`LineHandler`] while it runs a command.
///
/// Carries the producer sink plus the prompt text captured when the command
/// was dispatched, so the handler can re-send the prompt when it finishes.
pub struct ShellIo {
    sink: OutputSink,
    prompt: String,
}

impl ShellIo {
    pub fn write_bytes(&self, data: impl Into<Vec<u8>>, kind: OutputKind) -> Result<()> {
        self.sink.write_bytes(data, kind)
    }

    pub fn write_text(&self, text: &str, kind: OutputKind) -> Result<()> {
        self.sink.write_text(text, kind)
    }

    /// Emit the prompt on stdout. Handlers call this once their command's
    /// output is fully enqueued.
    pub fn send_prompt(&self) -> Result<()> {
        self.sink.write_text(&self.prompt, OutputKind::Stdout)
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// A producer handle that outlives this command dispatch, for handlers
    /// that route output from background sources.
    pub fn sink(&self) -> OutputSink {
        self.sink.clone()
    }
}

/// Hooks a concrete shell plugs into the line discipline.
#[async_trait]
pub trait LineHandler: Send + Sync {
    /// Run one completed command line. Output goes through `io`; call
    /// `io.send_prompt()` when the command is done.
    ///
    /// An error here does not kill the shell: the discipline reports it on
    /// stderr as a red `Error:` line and re-sends the prompt.
    async fn execute_command_line(&self, line: &str, io: &ShellIo) -> anyhow::Result<()>;

    fn prompt(&self) -> String {
        DEFAULT_PROMPT.to_string()
    }

    /// Text emitted once before the first prompt, when present.
    fn banner(&self) -> Option<String> {
        None
    }

    /// Ctrl+L. The default clears the visible screen and homes the cursor;
    /// override to also wipe scrollback.
    fn clear_screen(&self, io: &ShellIo) -> Result<()> {
        io.write_text("\x1b[2J\x1b[H", OutputKind::Stdout)
    }

    /// Called during `start`, after the pump is up. An error rolls the
    /// shell back to stopped.
    async fn on_starting(&self, _options: &StartOptions) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called during `stop`, before the output queue closes.
    async fn on_stopping(&self) {}
}

struct LineInner {
    parser: InputParser,
    state: LineState,
}

/// What broke a feed out of the byte loop.
enum FeedBreak {
    /// All bytes consumed, nothing left to do.
    Consumed,
    /// Enter completed a non-blank line.
    Execute(String),
    /// Ctrl+L needs the handler's clear hook.
    ClearScreen,
}

/// A shell with full line-discipline input handling, generic over the
/// handler that runs its commands.
pub struct LineShell<H: LineHandler> {
    metadata: ShellMetadata,
    options: LineDisciplineOptions,
    core: ShellCore,
    handler: H,
    line: Mutex<LineInner>,
}

impl<H: LineHandler> LineShell<H> {
    pub fn new(metadata: ShellMetadata, handler: H) -> Self {
        Self::with_options(metadata, handler, LineDisciplineOptions::default())
    }

    pub fn with_options(
        metadata: ShellMetadata,
        handler: H,
        options: LineDisciplineOptions,
    ) -> Self {
        let line = LineInner {
            parser: InputParser::new(options.parse_escape_sequences),
            state: LineState::new(options.max_history_size, options.enable_history),
        };
        Self {
            metadata,
            options,
            core: ShellCore::new(),
            handler,
            line: Mutex::new(line),
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// The line currently being edited, for hosts that render a cursor.
    pub fn current_line(&self) -> String {
        let inner = self.line.lock().unwrap();
        String::from_utf8_lossy(inner.state.line()).into_owned()
    }

    pub fn cursor_position(&self) -> usize {
        self.line.lock().unwrap().state.cursor()
    }

    pub fn history_snapshot(&self) -> Vec<String> {
        self.line.lock().unwrap().state.history().to_vec()
    }

    /// Dimensions recorded by the last `start` or `resize`, as
    /// `(width, height)`.
    pub fn dimensions(&self) -> (u16, u16) {
        self.core.dimensions()
    }

    fn io(&self) -> ShellIo {
        ShellIo {
            sink: self.core.sink(),
            prompt: self.handler.prompt(),
        }
    }

    fn emit_echo(&self, echo: Vec<u8>) {
        if self.options.echo_input && !echo.is_empty() {
            // The shell may be stopping concurrently; losing echo then is
            // fine.
            let _ = self.core.enqueue_bytes(echo, OutputKind::Stdout);
        }
    }

    /// Feed bytes into the parser until one of them needs the handler.
    /// Returns the number of bytes consumed and the reason for stopping;
    /// echo for everything consumed is appended to `echo`.
    fn feed(&self, inner: &mut LineInner, bytes: &[u8], echo: &mut Vec<u8>) -> (usize, FeedBreak) {
        let prompt = self.handler.prompt();
        for (i, &byte) in bytes.iter().enumerate() {
            let Some(action) = inner.parser.step(byte) else {
                continue;
            };
            match action {
                InputAction::Insert(b) => inner.state.insert(b, echo),
                InputAction::Backspace => inner.state.backspace(echo),
                InputAction::DeleteForward => inner.state.delete_forward(echo),
                InputAction::CursorLeft => inner.state.cursor_left(echo),
                InputAction::CursorRight => inner.state.cursor_right(echo),
                InputAction::Home => inner.state.cursor_home(echo),
                InputAction::End => inner.state.cursor_end(echo),
                InputAction::HistoryPrev => inner.state.history_prev(&prompt, echo),
                InputAction::HistoryNext => inner.state.history_next(&prompt, echo),
                InputAction::KillWordLeft => inner.state.kill_word_left(echo),
                InputAction::CancelLine => inner.state.cancel(&prompt, echo),
                InputAction::Enter => {
                    echo.extend_from_slice(b"\r\n");
                    match inner.state.take_line() {
                        Some(line) => return (i + 1, FeedBreak::Execute(line)),
                        // Blank line: nothing runs, show a fresh prompt.
                        None => echo.extend_from_slice(prompt.as_bytes()),
                    }
                }
                InputAction::ClearScreen => return (i + 1, FeedBreak::ClearScreen),
            }
        }
        (bytes.len(), FeedBreak::Consumed)
    }

    async fn run_command(&self, line: &str) {
        let io = self.io();
        debug!(command = line, "executing command line");
        if let Err(e) = self.handler.execute_command_line(line, &io).await {
            warn!(command = line, error = %e, "command handler failed");
            let _ = io.write_text(
                &format!("\x1b[31mError: {e}\x1b[0m\r\n"),
                OutputKind::Stderr,
            );
            let _ = io.send_prompt();
        }
    }

    fn handle_clear_screen(&self) {
        let io = self.io();
        if let Err(e) = self.handler.clear_screen(&io) {
            warn!(error = %e, "clear-screen hook failed");
            return;
        }
        let mut echo = Vec::new();
        {
            let inner = self.line.lock().unwrap();
            inner.state.redraw_echo(io.prompt(), &mut echo);
        }
        self.emit_echo(echo);
    }
}

#[async_trait]
impl<H: LineHandler> Shell for LineShell<H> {
    fn metadata(&self) -> &ShellMetadata {
        &self.metadata
    }

    fn is_running(&self) -> bool {
        self.core.is_running()
    }

    async fn start(&self, options: StartOptions) -> Result<()> {
        self.core.start(&options)?;
        if let Err(e) = self.handler.on_starting(&options).await {
            warn!(error = %e, "startup hook failed, rolling back");
            self.core.abort_start().await;
            return Err(ShellError::StartFailed(e.to_string()));
        }
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        if self.core.is_disposed() {
            return Err(ShellError::Disposed);
        }
        if !self.core.begin_stop() {
            return Ok(());
        }
        self.handler.on_stopping().await;
        self.core.finish_stop().await;
        Ok(())
    }

    async fn dispose(&self) -> Result<()> {
        if self.core.is_disposed() {
            return Ok(());
        }
        if self.core.begin_stop() {
            self.handler.on_stopping().await;
            self.core.finish_stop().await;
        }
        self.core.mark_disposed();
        Ok(())
    }

    async fn write_input(&self, data: &[u8]) -> Result<()> {
        if self.core.is_disposed() {
            return Err(ShellError::Disposed);
        }
        if !self.core.is_running() {
            return Err(ShellError::NotRunning);
        }

        let mut offset = 0;
        while offset < data.len() {
            let mut echo = Vec::new();
            let (consumed, brk) = {
                let mut inner = self.line.lock().unwrap();
                self.feed(&mut inner, &data[offset..], &mut echo)
            };
            offset += consumed;
            self.emit_echo(echo);
            match brk {
                FeedBreak::Consumed => {}
                FeedBreak::Execute(line) => self.run_command(&line).await,
                FeedBreak::ClearScreen => self.handle_clear_screen(),
            }
        }
        Ok(())
    }

    fn resize(&self, width: u16, height: u16) {
        self.core.set_dimensions(width, height);
    }

    /// Clears the line being edited, exactly as if the user pressed Ctrl+C.
    fn cancel(&self) {
        let prompt = self.handler.prompt();
        let mut echo = Vec::new();
        {
            let mut inner = self.line.lock().unwrap();
            inner.parser.reset();
            inner.state.cancel(&prompt, &mut echo);
        }
        self.emit_echo(echo);
    }

    fn send_initial_output(&self) -> Result<()> {
        let io = self.io();
        if let Some(banner) = self.handler.banner() {
            io.write_text(&banner, OutputKind::Stdout)?;
            io.write_text("\r\n", OutputKind::Stdout)?;
        }
        io.send_prompt()
    }

    fn subscribe_output(&self, listener: OutputListener) -> SubscriptionId {
        self.core.subscribe_output(move |event| listener(event))
    }

    fn unsubscribe_output(&self, id: SubscriptionId) -> bool {
        self.core.unsubscribe_output(id)
    }

    fn subscribe_terminated(&self, listener: TerminatedListener) -> SubscriptionId {
        self.core.subscribe_terminated(move |event| listener(event))
    }

    fn unsubscribe_terminated(&self, id: SubscriptionId) -> bool {
        self.core.unsubscribe_terminated(id)
    }
}
