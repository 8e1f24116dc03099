//! Subscriber fan-out with per-subscriber error isolation.
//!
//! A shell publishes output and termination events to an arbitrary number of
//! listeners. A listener that fails must never interrupt the other listeners
//! or the pump, so `emit` logs each failure and keeps going.

use std::sync::{Arc, Mutex};
use tracing::warn;

use crate::types::SubscriptionId;

type Listener<E> = Arc<dyn Fn(&E) -> anyhow::Result<()> + Send + Sync>;

/// An ordered list of event listeners keyed by [`SubscriptionId`].
///
/// Listeners are invoked in subscription order. `emit` snapshots the list
/// before invoking anything, so a listener may subscribe or unsubscribe
/// without deadlocking the bus.
pub struct EventBus<E> {
    /// Short label used in log lines (e.g. `"output"`).
    name: &'static str,
    listeners: Mutex<Vec<(SubscriptionId, Listener<E>)>>,
}

impl<E> EventBus<E> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Add a listener and return its unsubscribe token.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&E) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = SubscriptionId::new();
        self.listeners
            .lock()
            .unwrap()
            .push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` when the token is unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock().unwrap();
        let before = listeners.len();
        listeners.retain(|(key, _)| *key != id);
        listeners.len() != before
    }

    /// Deliver `event` to every listener in subscription order.
    ///
    /// A listener error is logged and swallowed; remaining listeners still
    /// run.
    pub fn emit(&self, event: &E) {
        let snapshot: Vec<Listener<E>> = {
            let listeners = self.listeners.lock().unwrap();
            listeners.iter().map(|(_, l)| Arc::clone(l)).collect()
        };
        for listener in snapshot {
            if let Err(e) = listener(event) {
                warn!(bus = self.name, error = %e, "event listener failed");
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }
}
