//! Per-event-type listener sets.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use crate::server_event::ServerEvent;

/// A shared callback. Identity is the allocation behind the `Arc`, so
/// registering clones of one handle counts as one listener.
pub type Listener<A> = Arc<dyn Fn(&A) + Send + Sync>;

/// Receives the raw `data` payload of an envelope.
pub type Handler = Listener<Value>;

/// Receives the parsed [`ServerEvent`].
pub type EventHandler = Listener<ServerEvent>;

fn listener_key<A>(listener: &Listener<A>) -> usize {
    Arc::as_ptr(listener) as *const () as usize
}

/// Map from event type to a set of listeners.
///
/// Survives reconnects. The lock is only held while the map is read or
/// changed, never while a listener runs, so listeners may call `insert`
/// or `remove` on the registry that is dispatching to them.
pub struct ListenerRegistry<A> {
    sets: Mutex<HashMap<String, HashMap<usize, Listener<A>>>>,
}

impl<A> Default for ListenerRegistry<A> {
    fn default() -> Self {
        Self {
            sets: Mutex::new(HashMap::new()),
        }
    }
}

impl<A> ListenerRegistry<A> {
    pub fn new() -> Self {
        Self::default()
    }

    fn sets(&self) -> MutexGuard<'_, HashMap<String, HashMap<usize, Listener<A>>>> {
        self.sets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add `listener` for `kind`. Returns `false` if it was already present.
    pub fn insert(&self, kind: &str, listener: Listener<A>) -> bool {
        self.sets()
            .entry(kind.to_string())
            .or_default()
            .insert(listener_key(&listener), listener)
            .is_none()
    }

    /// Remove exactly `listener` from `kind`. Returns `false` if it was not registered.
    pub fn remove(&self, kind: &str, listener: &Listener<A>) -> bool {
        let mut sets = self.sets();
        let Some(set) = sets.get_mut(kind) else {
            return false;
        };
        let removed = set.remove(&listener_key(listener)).is_some();
        if set.is_empty() {
            sets.remove(kind);
        }
        removed
    }

    /// Copy of the current listeners for `kind`, in no particular order.
    pub fn snapshot(&self, kind: &str) -> Vec<Listener<A>> {
        self.sets()
            .get(kind)
            .map(|set| set.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.sets().get(kind).map_or(0, HashMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.sets().is_empty()
    }
}
