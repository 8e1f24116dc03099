//! termhost-registry — discovery and instantiation of custom shells.
//!
//! A host populates a [`ShellRegistry`] at startup with one factory per
//! shell id, then creates instances on demand:
//!
//! ```rust,ignore
//! let registry = ShellRegistry::new();
//! registry.register("console", move || Ok(Box::new(build_console_shell()?)))?;
//!
//! for (id, metadata) in registry.list() {
//!     println!("{id}: {} v{}", metadata.name, metadata.version);
//! }
//! let shell = registry.create("console")?;
//! ```
//!
//! Registration validates each factory by probing it once; see
//! [`ShellRegistry::register`].

pub mod error;
pub mod registry;

pub use error::{RegistryError, Result};
pub use registry::{ShellFactory, ShellRegistry};
