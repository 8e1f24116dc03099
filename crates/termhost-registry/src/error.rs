//! Error types for the termhost-registry crate.

use thiserror::Error;

/// All errors that can originate from registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Empty or duplicate id, or a lookup for an id that is not registered.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The probe instance built during registration failed validation, or
    /// the factory itself failed. The id was not registered.
    #[error("Shell '{id}' failed registration: {source}")]
    Registration {
        id: String,
        #[source]
        source: anyhow::Error,
    },

    /// A registered factory failed on a later `create` call.
    #[error("Shell '{id}' could not be instantiated: {source}")]
    Instantiation {
        id: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, RegistryError>;
