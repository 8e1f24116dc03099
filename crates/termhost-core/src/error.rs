use thiserror::Error;

/// Errors that can originate from the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The config file or an env override could not be parsed.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, CoreError>;
