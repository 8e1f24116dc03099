//! The game-console shell: a line-discipline shell whose commands run on
//! the host's [`CommandInterpreter`].
//!
//! Interpreter output is routed back through a process-wide active-shell
//! slot: while a command executes, the slot names the shell that issued it,
//! and every console shell's output listener forwards only when it owns the
//! slot. A dedicated command lock keeps interpreter execution serialized
//! across all console shells in the process.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::interpreter::{CommandInterpreter, InterpreterOutputKind};
use termhost_core::config::TermhostConfig;
use termhost_shell::{
    LineHandler, LineShell, OutputKind, OutputSink, ShellIo, ShellMetadata, ShellVersion,
    StartOptions, SubscriptionId,
};

/// Registry id of the console shell.
pub const CONSOLE_SHELL_ID: &str = "console";

/// Clears the visible screen, the scrollback, and homes the cursor.
pub const CLEAR_SCREEN_AND_SCROLLBACK: &str = "\x1b[3J\x1b[2J\x1b[H";

/// The shell that issued the currently executing command, when one is
/// running. Output listeners forward interpreter lines only while their
/// shell owns this slot.
static ACTIVE_SHELL: Mutex<Option<(Uuid, OutputSink)>> = Mutex::new(None);

/// Serializes interpreter execution across every console shell in the
/// process.
static COMMAND_LOCK: Mutex<()> = Mutex::new(());

/// A console shell ready to hand to a host or a registry factory.
pub type ConsoleShell = LineShell<ConsoleHandler>;

/// Build a console shell over `interpreter`, loading the prompt from the
/// default config location.
pub fn console_shell(interpreter: Arc<dyn CommandInterpreter>) -> ConsoleShell {
    console_shell_with_config(interpreter, None)
}

/// Build a console shell over `interpreter` with an explicit config path.
pub fn console_shell_with_config(
    interpreter: Arc<dyn CommandInterpreter>,
    config_path: Option<String>,
) -> ConsoleShell {
    LineShell::new(
        console_metadata(),
        ConsoleHandler::new(interpreter, config_path),
    )
}

fn console_metadata() -> ShellMetadata {
    let mut metadata = ShellMetadata::new(CONSOLE_SHELL_ID, "Game Console");
    metadata.description = "Runs commands on the host's command interpreter".to_string();
    metadata.version = ShellVersion::new(0, 1, 0);
    metadata.author = "Termhost Contributors".to_string();
    for feature in ["history", "ansi", "clear-screen"] {
        metadata.supported_features.insert(feature.to_string());
    }
    metadata
}

/// Command handler that forwards completed lines to the interpreter.
pub struct ConsoleHandler {
    /// Identity used to claim the active-shell slot.
    tag: Uuid,
    interpreter: Arc<dyn CommandInterpreter>,
    prompt: Mutex<String>,
    config_path: Option<String>,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl ConsoleHandler {
    pub fn new(interpreter: Arc<dyn CommandInterpreter>, config_path: Option<String>) -> Self {
        Self {
            tag: Uuid::new_v4(),
            interpreter,
            prompt: Mutex::new(termhost_core::config::DEFAULT_CONSOLE_PROMPT.to_string()),
            config_path,
            subscription: Mutex::new(None),
        }
    }

    /// Re-read the prompt from configuration. Called at start and available
    /// to hosts that let users edit config at runtime.
    pub fn reload_prompt(&self) {
        let config = TermhostConfig::load_or_default(self.config_path.as_deref());
        let mut prompt = self.prompt.lock().unwrap();
        if *prompt != config.console.prompt {
            debug!(prompt = %config.console.prompt, "console prompt updated");
            *prompt = config.console.prompt;
        }
    }

    /// Route one interpreter output line to the shell that owns the slot.
    fn route_output(tag: Uuid, text: &str, kind: InterpreterOutputKind) {
        let slot = ACTIVE_SHELL.lock().unwrap();
        let Some((active_tag, sink)) = slot.as_ref() else {
            return;
        };
        if *active_tag != tag {
            return;
        }
        let result = match kind {
            InterpreterOutputKind::Message => {
                sink.write_text(&format!("{text}\r\n"), OutputKind::Stdout)
            }
            InterpreterOutputKind::Error => sink.write_text(
                &format!("\x1b[31m{text}\x1b[0m\r\n"),
                OutputKind::Stderr,
            ),
        };
        if result.is_err() {
            warn!("dropping interpreter output for a stopped shell");
        }
    }
}

#[async_trait]
impl LineHandler for ConsoleHandler {
    async fn execute_command_line(&self, line: &str, io: &ShellIo) -> anyhow::Result<()> {
        // Built-in shortcut: wipe screen and scrollback without involving
        // the interpreter.
        if line == "clear" {
            io.write_text(CLEAR_SCREEN_AND_SCROLLBACK, OutputKind::Stdout)?;
            io.send_prompt()?;
            return Ok(());
        }

        let success = {
            let _guard = COMMAND_LOCK.lock().unwrap();
            *ACTIVE_SHELL.lock().unwrap() = Some((self.tag, io.sink()));
            let success = self.interpreter.execute(line);
            *ACTIVE_SHELL.lock().unwrap() = None;
            success
        };
        debug!(command = line, success, "interpreter finished");

        io.send_prompt()?;
        Ok(())
    }

    fn prompt(&self) -> String {
        self.prompt.lock().unwrap().clone()
    }

    fn banner(&self) -> Option<String> {
        Some("Game console ready. Type 'clear' to reset the screen.".to_string())
    }

    /// Ctrl+L on the console also wipes scrollback.
    fn clear_screen(&self, io: &ShellIo) -> termhost_shell::Result<()> {
        io.write_text(CLEAR_SCREEN_AND_SCROLLBACK, OutputKind::Stdout)
    }

    async fn on_starting(&self, _options: &StartOptions) -> anyhow::Result<()> {
        self.reload_prompt();
        let tag = self.tag;
        let id = self
            .interpreter
            .subscribe_output(Box::new(move |text, kind| {
                Self::route_output(tag, text, kind);
            }));
        *self.subscription.lock().unwrap() = Some(id);
        info!("console shell attached to interpreter");
        Ok(())
    }

    async fn on_stopping(&self) {
        if let Some(id) = self.subscription.lock().unwrap().take() {
            self.interpreter.unsubscribe_output(id);
        }
        debug!("console shell detached from interpreter");
    }
}
