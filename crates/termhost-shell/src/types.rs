//! Shared data types for termhost-shell.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// ShellVersion
// ---------------------------------------------------------------------------

/// Semantic version triple carried by [`ShellMetadata`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ShellVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for ShellVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

// ---------------------------------------------------------------------------
// ShellMetadata
// ---------------------------------------------------------------------------

/// Immutable descriptor a shell exposes to its host.
///
/// Created by the shell at construction time and constant for the lifetime
/// of the instance. The registry enforces that `id` and `name` are non-empty
/// and that `id` matches the key the shell was registered under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellMetadata {
    /// Unique key identifying the shell implementation (e.g. `"console"`).
    pub id: String,

    /// Human-readable display name.
    pub name: String,

    /// One-line description shown in shell listings.
    #[serde(default)]
    pub description: String,

    /// Implementation version.
    #[serde(default)]
    pub version: ShellVersion,

    /// Author or vendor string.
    #[serde(default)]
    pub author: String,

    /// Optional capability tags (e.g. `"history"`, `"ansi"`).
    #[serde(default)]
    pub supported_features: BTreeSet<String>,
}

impl ShellMetadata {
    /// Construct metadata with the required fields; the rest default empty.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            version: ShellVersion::default(),
            author: String::new(),
            supported_features: BTreeSet::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// StartOptions
// ---------------------------------------------------------------------------

/// Parameters passed to a shell at start. Constructed by the host and
/// read-only to the shell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartOptions {
    /// Terminal width in columns. Must be positive.
    pub terminal_width: u16,

    /// Terminal height in rows. Must be positive.
    pub terminal_height: u16,

    /// Working directory hint for shells that care about one.
    #[serde(default)]
    pub working_directory: Option<String>,

    /// Environment variables the host wants visible to the shell.
    #[serde(default)]
    pub environment: HashMap<String, String>,
}

impl Default for StartOptions {
    fn default() -> Self {
        Self {
            terminal_width: 80,
            terminal_height: 24,
            working_directory: None,
            environment: HashMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// OutputEvent / TerminatedEvent
// ---------------------------------------------------------------------------

/// Whether an output emission is ordinary output or error output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    Stdout,
    Stderr,
}

/// A single emission from a shell's output pump.
///
/// `data` may contain ANSI control sequences; consumers forward them to the
/// terminal emulator verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputEvent {
    pub data: Vec<u8>,
    pub kind: OutputKind,
}

/// Fired exactly once when a started shell transitions out of the running
/// state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminatedEvent {
    /// Exit code; 0 means a normal stop.
    pub exit_code: i32,

    /// Human-readable reason, when one is known.
    pub reason: Option<String>,
}

// ---------------------------------------------------------------------------
// SubscriptionId
// ---------------------------------------------------------------------------

/// Opaque token returned by event subscription, used to unsubscribe.
///
/// Wraps a UUID so the internal representation can change without breaking
/// callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Mint a fresh random token (UUIDv4).
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
