//! The shell contract: the capability surface a custom shell exposes to the
//! host that embeds it.
//!
//! A custom shell is an in-process program that presents the same surface as
//! a real PTY-connected process: it consumes raw input bytes, emits output
//! bytes, and has a start/stop lifecycle. Hosts interact with shells only
//! through this trait, which keeps the terminal bridge independent of any
//! particular shell implementation.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{OutputEvent, ShellMetadata, StartOptions, SubscriptionId, TerminatedEvent};

/// Listener for output emissions. Invoked on the pump task, sequentially,
/// in enqueue order.
pub type OutputListener = Box<dyn Fn(&OutputEvent) -> anyhow::Result<()> + Send + Sync>;

/// Listener for the one-shot termination event.
pub type TerminatedListener = Box<dyn Fn(&TerminatedEvent) -> anyhow::Result<()> + Send + Sync>;

/// Common interface implemented by every custom shell.
///
/// Implementations must be `Send + Sync` so a boxed shell can be driven from
/// multiple Tokio tasks. All methods take `&self`; shells use interior
/// locking for their mutable state because `write_input` may legitimately be
/// called from several threads at once.
#[async_trait]
pub trait Shell: Send + Sync {
    /// Immutable descriptor for this instance. Constant for its lifetime.
    fn metadata(&self) -> &ShellMetadata;

    /// Whether the shell is currently running (output pump active).
    fn is_running(&self) -> bool;

    /// Start the shell.
    ///
    /// # Errors
    ///
    /// - [`ShellError::AlreadyRunning`](crate::error::ShellError::AlreadyRunning)
    ///   when called on a running shell.
    /// - [`ShellError::InvalidArgument`](crate::error::ShellError::InvalidArgument)
    ///   when `options` carries zero terminal dimensions.
    /// - [`ShellError::Disposed`](crate::error::ShellError::Disposed) after
    ///   `dispose`.
    /// - [`ShellError::StartFailed`](crate::error::ShellError::StartFailed)
    ///   when the startup hook fails; the shell is rolled back to stopped.
    async fn start(&self, options: StartOptions) -> Result<()>;

    /// Stop the shell.
    ///
    /// Completes immediately when the shell is not running. Otherwise the
    /// output queue is closed, the pump drains with a bounded timeout, and
    /// `terminated(0, "Stopped")` fires exactly once. Idempotent.
    async fn stop(&self) -> Result<()>;

    /// Stop (if needed) and permanently retire the shell. Subsequent
    /// lifecycle calls fail with `Disposed`. Idempotent.
    async fn dispose(&self) -> Result<()>;

    /// Hand raw input bytes to the shell's input handler.
    ///
    /// # Errors
    ///
    /// - [`ShellError::NotRunning`](crate::error::ShellError::NotRunning)
    ///   when the shell is stopped.
    async fn write_input(&self, data: &[u8]) -> Result<()>;

    /// Record new terminal dimensions. Shells that do not care may ignore
    /// the values beyond storing them.
    fn resize(&self, width: u16, height: u16);

    /// Request cooperative cancellation of any in-flight command.
    fn cancel(&self) {}

    /// One-shot hook the host calls exactly once, after subscribing to
    /// output events and after `start` has completed. Shells use it to emit
    /// a banner and their first prompt.
    fn send_initial_output(&self) -> Result<()> {
        Ok(())
    }

    /// Subscribe to output emissions.
    fn subscribe_output(&self, listener: OutputListener) -> SubscriptionId;

    /// Remove an output listener. Returns `false` for unknown tokens.
    fn unsubscribe_output(&self, id: SubscriptionId) -> bool;

    /// Subscribe to the termination event.
    fn subscribe_terminated(&self, listener: TerminatedListener) -> SubscriptionId;

    /// Remove a termination listener. Returns `false` for unknown tokens.
    fn unsubscribe_terminated(&self, id: SubscriptionId) -> bool;
}
