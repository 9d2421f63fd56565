//! Event Bus - routes event kinds to registered handlers
//!
//! Handlers are identified by index into the owner's handler list. A kind has
//! no route at all until the first handler subscribes to it, so the owner can
//! skip work for kinds nobody listens to.

use std::collections::HashMap;
use std::hash::Hash;

/// Index of a handler in the owner's handler list
pub type HandlerId = usize;

/// Kind → ordered handler list
#[derive(Debug, Clone)]
pub struct EventBus<K> {
    routes: HashMap<K, Vec<HandlerId>>,
}

impl<K: Copy + Eq + Hash> EventBus<K> {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    /// Subscribe a handler to a kind; delivery follows subscription order
    pub fn subscribe(&mut self, kind: K, handler: HandlerId) {
        let handlers = self.routes.entry(kind).or_default();
        if !handlers.contains(&handler) {
            handlers.push(handler);
        }
    }

    /// Handlers for a kind, empty if the kind was never activated
    pub fn handlers(&self, kind: K) -> &[HandlerId] {
        self.routes.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether any handler subscribed to this kind
    pub fn is_active(&self, kind: K) -> bool {
        self.routes.contains_key(&kind)
    }

    /// Number of activated kinds
    pub fn active_kinds(&self) -> usize {
        self.routes.len()
    }
}

impl<K: Copy + Eq + Hash> Default for EventBus<K> {
    fn default() -> Self {
        Self::new()
    }
}
