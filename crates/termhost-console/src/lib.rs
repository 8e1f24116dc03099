//! termhost-console — the reference console shell for termhost.
//!
//! Glues a line-discipline shell to the host application's command
//! interpreter: completed lines go to [`CommandInterpreter::execute`], the
//! interpreter's output lines come back through a process-wide active-shell
//! slot and are re-emitted on the shell's output pump (errors tagged with a
//! red ANSI prefix). The prompt is loaded from termhost configuration with
//! a built-in fallback.

pub mod console;
pub mod interpreter;

pub use console::{
    console_shell, console_shell_with_config, ConsoleHandler, ConsoleShell,
    CLEAR_SCREEN_AND_SCROLLBACK, CONSOLE_SHELL_ID,
};
pub use interpreter::{CommandInterpreter, InterpreterListener, InterpreterOutputKind};
