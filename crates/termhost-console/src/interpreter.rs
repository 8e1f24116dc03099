//! Contract with the host's command interpreter.
//!
//! The console shell does not parse or run commands itself — it hands each
//! completed line to an interpreter the embedding application provides and
//! routes the interpreter's line-oriented output back to the terminal.

use termhost_shell::SubscriptionId;

/// Classification of a single interpreter output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpreterOutputKind {
    /// Ordinary output, rendered in the default color.
    Message,
    /// Error output, rendered with an error attribute.
    Error,
}

/// Listener for interpreter output lines.
pub type InterpreterListener = Box<dyn Fn(&str, InterpreterOutputKind) + Send + Sync>;

/// A synchronous command interpreter owned by the host application.
///
/// `execute` runs one command to completion and returns whether it
/// succeeded; any output the command produces is delivered through the
/// subscribed listeners *during* the call. The host must ensure at most one
/// `execute` runs at a time process-wide — the console shell serializes its
/// own calls, and output produced while no command is active is dropped.
pub trait CommandInterpreter: Send + Sync {
    /// Run `command` to completion. Returns `false` when the command failed;
    /// the failure details arrive as `Error` output lines.
    fn execute(&self, command: &str) -> bool;

    /// Add an output listener and return its unsubscribe token.
    fn subscribe_output(&self, listener: InterpreterListener) -> SubscriptionId;

    /// Remove an output listener. Returns `false` for unknown tokens.
    fn unsubscribe_output(&self, id: SubscriptionId) -> bool;
}
