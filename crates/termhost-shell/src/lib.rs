//! termhost-shell — custom shells for an embeddable terminal-emulator core.
//!
//! A custom shell is an in-process program that looks to a terminal bridge
//! exactly like a real PTY-connected process: raw bytes in, raw bytes out,
//! with a start/stop lifecycle. This crate provides the three layers those
//! shells are built from:
//!
//! - [`Shell`]: the contract a host drives (lifecycle, input, resize,
//!   cancel, output/terminated events)
//! - [`ShellCore`]: the shared output pump — an unbounded queue drained by
//!   one background task that publishes output events in enqueue order
//! - [`LineShell`]: a full line discipline (echo, cursor editing, history,
//!   CSI parsing) that feeds completed lines to a [`LineHandler`]
//!
//! # Quick start
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use termhost_shell::{
//!     LineHandler, LineShell, OutputKind, Shell, ShellIo, ShellMetadata, StartOptions,
//! };
//!
//! struct EchoHandler;
//!
//! #[async_trait]
//! impl LineHandler for EchoHandler {
//!     async fn execute_command_line(&self, line: &str, io: &ShellIo) -> anyhow::Result<()> {
//!         io.write_text(&format!("{line}\r\n"), OutputKind::Stdout)?;
//!         io.send_prompt()?;
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let shell = LineShell::new(ShellMetadata::new("echo", "Echo"), EchoHandler);
//!     shell.subscribe_output(Box::new(|event| {
//!         print!("{}", String::from_utf8_lossy(&event.data));
//!         Ok(())
//!     }));
//!     shell.start(StartOptions::default()).await.unwrap();
//!     shell.send_initial_output().unwrap();
//!     shell.write_input(b"hello\r").await.unwrap();
//!     shell.stop().await.unwrap();
//! }
//! ```

pub mod discipline;
pub mod error;
pub mod events;
mod line;
pub mod parser;
pub mod pump;
pub mod shell;
pub mod types;

pub use discipline::{
    LineDisciplineOptions, LineHandler, LineShell, ShellIo, DEFAULT_PROMPT,
};
pub use error::{Result, ShellError};
pub use pump::{OutputSink, ShellCore};
pub use shell::{OutputListener, Shell, TerminatedListener};
pub use types::{
    OutputEvent, OutputKind, ShellMetadata, ShellVersion, StartOptions, SubscriptionId,
    TerminatedEvent,
};
