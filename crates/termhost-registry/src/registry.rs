//! `ShellRegistry` — catalogue of available shell implementations.
//!
//! Hosts register a factory per shell id; the registry validates each
//! registration by building one probe instance and inspecting its metadata,
//! so a broken factory is rejected up front instead of failing at first use.
//!
//! The registry is an explicit handle owned by the host, not a process
//! global — tests and embedders create as many independent instances as
//! they like.

use dashmap::DashMap;
use tracing::{debug, info};

use crate::error::{RegistryError, Result};
use termhost_shell::{Shell, ShellMetadata};

/// Builds a fresh shell instance per call.
pub type ShellFactory = Box<dyn Fn() -> anyhow::Result<Box<dyn Shell>> + Send + Sync>;

struct Registration {
    factory: ShellFactory,
    /// Metadata captured from the probe instance at registration time.
    metadata: ShellMetadata,
}

/// Concurrent map from shell id to validated factory.
///
/// Lookups are lock-free reads; registration takes the map's shard lock for
/// the one entry it touches.
pub struct ShellRegistry {
    entries: DashMap<String, Registration>,
}

impl ShellRegistry {
    /// Create an empty registry with no shells.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Register `factory` under `id`.
    ///
    /// The factory is invoked once to produce a probe instance, whose
    /// metadata must be internally valid and carry the same id the factory
    /// is being registered under. The validated metadata is cached for
    /// [`ShellRegistry::metadata`] and [`ShellRegistry::list`].
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` — empty id, or id already registered.
    /// - `Registration` — the factory failed or the probe's metadata was
    ///   rejected; the id is not registered.
    pub fn register<F>(&self, id: &str, factory: F) -> Result<()>
    where
        F: Fn() -> anyhow::Result<Box<dyn Shell>> + Send + Sync + 'static,
    {
        let id = id.trim();
        if id.is_empty() {
            return Err(RegistryError::InvalidArgument(
                "shell id must not be empty".to_string(),
            ));
        }
        if self.entries.contains_key(id) {
            return Err(RegistryError::InvalidArgument(format!(
                "shell id '{id}' is already registered"
            )));
        }

        let probe = factory().map_err(|e| RegistryError::Registration {
            id: id.to_string(),
            source: e,
        })?;
        let metadata = validate_metadata(id, probe.metadata()).map_err(|e| {
            RegistryError::Registration {
                id: id.to_string(),
                source: e,
            }
        })?;
        drop(probe);

        // A racing registration of the same id may have won while the probe
        // was validating; the loser is reported as a duplicate.
        let entry = self.entries.entry(id.to_string());
        match entry {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(RegistryError::InvalidArgument(format!(
                    "shell id '{id}' is already registered"
                )))
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                info!(id, name = %metadata.name, "registered shell");
                vacant.insert(Registration {
                    factory: Box::new(factory),
                    metadata,
                });
                Ok(())
            }
        }
    }

    /// Whether `id` names a registered shell. Safe for any input.
    pub fn is_registered(&self, id: &str) -> bool {
        let id = id.trim();
        !id.is_empty() && self.entries.contains_key(id)
    }

    /// Cached metadata for `id`, or `None` when unregistered. Never errors.
    pub fn metadata(&self, id: &str) -> Option<ShellMetadata> {
        self.entries.get(id.trim()).map(|e| e.metadata.clone())
    }

    /// Snapshot of all registered shells as `(id, metadata)` pairs.
    ///
    /// Ordering is unspecified but stable within one call.
    pub fn list(&self) -> Vec<(String, ShellMetadata)> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().metadata.clone()))
            .collect()
    }

    /// Build a fresh instance of the shell registered under `id`.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` — empty or unregistered id.
    /// - `Instantiation` — the factory failed on this invocation.
    pub fn create(&self, id: &str) -> Result<Box<dyn Shell>> {
        let id = id.trim();
        let entry = self
            .entries
            .get(id)
            .ok_or_else(|| RegistryError::InvalidArgument(format!("unknown shell id '{id}'")))?;

        debug!(id, "creating shell instance");
        (entry.factory)().map_err(|e| RegistryError::Instantiation {
            id: id.to_string(),
            source: e,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ShellRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Metadata invariants checked at registration: non-empty id and name, and
/// the probe must identify itself as the id it is registered under.
fn validate_metadata(id: &str, metadata: &ShellMetadata) -> anyhow::Result<ShellMetadata> {
    if metadata.id.trim().is_empty() {
        anyhow::bail!("probe metadata has an empty id");
    }
    if metadata.name.trim().is_empty() {
        anyhow::bail!("probe metadata has an empty name");
    }
    if metadata.id != id {
        anyhow::bail!(
            "probe metadata id '{}' does not match registration id '{}'",
            metadata.id,
            id
        );
    }
    Ok(metadata.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use termhost_shell::{
        LineHandler, LineShell, ShellIo, StartOptions,
    };

    struct NoopHandler;

    #[async_trait]
    impl LineHandler for NoopHandler {
        async fn execute_command_line(&self, _line: &str, _io: &ShellIo) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn good_factory(id: &'static str) -> impl Fn() -> anyhow::Result<Box<dyn Shell>> {
        move || {
            Ok(Box::new(LineShell::new(
                ShellMetadata::new(id, "Test Shell"),
                NoopHandler,
            )) as Box<dyn Shell>)
        }
    }

    #[test]
    fn register_then_lookup_round_trip() {
        let registry = ShellRegistry::new();
        registry.register("test", good_factory("test")).unwrap();

        assert!(registry.is_registered("test"));
        assert_eq!(registry.len(), 1);
        let metadata = registry.metadata("test").unwrap();
        assert_eq!(metadata.id, "test");
        assert_eq!(metadata.name, "Test Shell");
    }

    #[test]
    fn metadata_is_stable_across_lookups() {
        let registry = ShellRegistry::new();
        registry.register("test", good_factory("test")).unwrap();
        assert_eq!(registry.metadata("test"), registry.metadata("test"));
    }

    #[test]
    fn register_trims_the_id() {
        let registry = ShellRegistry::new();
        registry.register("  test  ", good_factory("test")).unwrap();
        assert!(registry.is_registered("test"));
        assert!(registry.is_registered("  test "));
    }

    #[test]
    fn empty_id_is_rejected() {
        let registry = ShellRegistry::new();
        let err = registry.register("   ", good_factory("x")).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidArgument(_)));
        assert!(!registry.is_registered("   "));
        assert!(!registry.is_registered(""));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let registry = ShellRegistry::new();
        registry.register("test", good_factory("test")).unwrap();
        let err = registry.register("test", good_factory("test")).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidArgument(_)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn throwing_factory_is_not_registered() {
        let registry = ShellRegistry::new();
        let err = registry
            .register("bad", || anyhow::bail!("factory exploded"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::Registration { .. }));
        assert!(!registry.is_registered("bad"));
        assert!(registry.metadata("bad").is_none());
    }

    #[test]
    fn probe_with_mismatched_id_is_rejected() {
        let registry = ShellRegistry::new();
        let err = registry
            .register("expected", good_factory("actual"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::Registration { .. }));
        assert!(!registry.is_registered("expected"));
    }

    #[test]
    fn probe_with_empty_name_is_rejected() {
        let registry = ShellRegistry::new();
        let err = registry
            .register("test", || {
                Ok(Box::new(LineShell::new(
                    ShellMetadata::new("test", "  "),
                    NoopHandler,
                )) as Box<dyn Shell>)
            })
            .unwrap_err();
        assert!(matches!(err, RegistryError::Registration { .. }));
    }

    #[test]
    fn create_returns_fresh_instances() {
        let registry = ShellRegistry::new();
        let built = Arc::new(AtomicUsize::new(0));
        let built_clone = Arc::clone(&built);
        registry
            .register("test", move || {
                built_clone.fetch_add(1, Ordering::SeqCst);
                Ok(Box::new(LineShell::new(
                    ShellMetadata::new("test", "Test Shell"),
                    NoopHandler,
                )) as Box<dyn Shell>)
            })
            .unwrap();

        // One build for the probe, one per create.
        let a = registry.create("test").unwrap();
        let b = registry.create("test").unwrap();
        assert_eq!(built.load(Ordering::SeqCst), 3);
        assert_eq!(a.metadata().id, "test");
        assert_eq!(b.metadata().id, "test");
    }

    #[test]
    fn create_unknown_id_fails_with_invalid_argument() {
        let registry = ShellRegistry::new();
        let err = match registry.create("ghost") {
            Err(e) => e,
            Ok(_) => panic!("expected create(\"ghost\") to fail"),
        };
        assert!(matches!(err, RegistryError::InvalidArgument(_)));
        let err = match registry.create("") {
            Err(e) => e,
            Ok(_) => panic!("expected create(\"\") to fail"),
        };
        assert!(matches!(err, RegistryError::InvalidArgument(_)));
    }

    #[test]
    fn factory_failing_after_registration_maps_to_instantiation() {
        let registry = ShellRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        registry
            .register("flaky", move || {
                // Succeed for the probe, fail afterwards.
                if calls_clone.fetch_add(1, Ordering::SeqCst) == 0 {
                    Ok(Box::new(LineShell::new(
                        ShellMetadata::new("flaky", "Flaky"),
                        NoopHandler,
                    )) as Box<dyn Shell>)
                } else {
                    anyhow::bail!("out of resources")
                }
            })
            .unwrap();

        let err = match registry.create("flaky") {
            Err(e) => e,
            Ok(_) => panic!("expected create(\"flaky\") to fail"),
        };
        assert!(matches!(err, RegistryError::Instantiation { .. }));
        // Still registered; a later create may succeed again.
        assert!(registry.is_registered("flaky"));
    }

    #[test]
    fn list_returns_all_registrations() {
        let registry = ShellRegistry::new();
        registry.register("one", good_factory("one")).unwrap();
        registry.register("two", good_factory("two")).unwrap();

        let mut listed = registry.list();
        listed.sort_by(|a, b| a.0.cmp(&b.0));
        let ids: Vec<&str> = listed.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, ["one", "two"]);
    }

    #[tokio::test]
    async fn created_shell_is_usable() {
        let registry = ShellRegistry::new();
        registry.register("test", good_factory("test")).unwrap();

        let shell = registry.create("test").unwrap();
        shell.start(StartOptions::default()).await.unwrap();
        shell.write_input(b"hello\r").await.unwrap();
        shell.stop().await.unwrap();
    }
}
