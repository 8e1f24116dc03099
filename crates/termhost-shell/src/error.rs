//! Error types for the termhost-shell crate.

use thiserror::Error;

/// All errors that can originate from shell lifecycle operations.
#[derive(Debug, Error)]
pub enum ShellError {
    /// `start` was called while the shell is already running.
    #[error("Shell is already running")]
    AlreadyRunning,

    /// An operation that requires a running shell was called while stopped.
    #[error("Shell is not running")]
    NotRunning,

    /// The shell has been disposed and accepts no further operations.
    #[error("Shell has been disposed")]
    Disposed,

    /// A caller-supplied argument violated a precondition.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The startup hook failed; the shell was rolled back to stopped.
    #[error("Startup failed: {0}")]
    StartFailed(String),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, ShellError>;
