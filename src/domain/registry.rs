//! Concurrent store of all live subscriptions.
//!
//! [`SubscriptionRegistry`] maps [`SubscriptionKey`] to the disposable
//! handle of the running subscription and maintains an atomic count of
//! live entries. The map is a [`DashMap`], so operations on different
//! keys proceed without a global lock and operations on the same key
//! are serialized by its shard.
//!
//! # Invariants
//!
//! - At most one live handle per key between operations.
//! - The counter equals the map size after every completed operation.
//! - A handle superseded by [`SubscriptionRegistry::add_or_update`] or
//!   removed by any removal path is disposed exactly once.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::{ConnectionId, SubscriptionHandle, SubscriptionKey};

/// Central store for all active subscriptions across all connections.
///
/// None of the operations fail: absence is reported through `Option`
/// or `bool`, never an error.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    entries: DashMap<SubscriptionKey, Arc<SubscriptionHandle>>,
    count: AtomicUsize,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            count: AtomicUsize::new(0),
        }
    }

    /// Looks up the live handle for a connection/resource pair.
    ///
    /// Pure lookup: never mutates the map and never waits on another
    /// operation's disposal.
    #[must_use]
    pub fn try_get(
        &self,
        connection: &ConnectionId,
        resource: &str,
    ) -> Option<Arc<SubscriptionHandle>> {
        let key = SubscriptionKey::new(connection, resource);
        self.entries.get(&key).map(|entry| Arc::clone(entry.value()))
    }

    /// Installs `handle` for the pair, replacing any previous handle.
    ///
    /// Inserting a fresh key increments the counter; replacing an
    /// existing entry leaves it unchanged and disposes the superseded
    /// handle exactly once. The whole operation is atomic with respect
    /// to other operations on the same key: of any number of racing
    /// writers exactly one handle survives, and every other handle is
    /// disposed once.
    ///
    /// Returns `true` on a fresh insert, `false` on a replace.
    pub fn add_or_update(
        &self,
        connection: &ConnectionId,
        resource: &str,
        handle: SubscriptionHandle,
    ) -> bool {
        let key = SubscriptionKey::new(connection, resource);
        match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                let previous = occupied.insert(Arc::new(handle));
                previous.dispose();
                false
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::new(handle));
                self.count.fetch_add(1, Ordering::SeqCst);
                true
            }
        }
    }

    /// Removes and disposes the subscription for the pair, if present.
    ///
    /// Returns `true` if an entry was removed.
    pub fn try_remove(&self, connection: &ConnectionId, resource: &str) -> bool {
        let key = SubscriptionKey::new(connection, resource);
        match self.entries.remove(&key) {
            Some((_, handle)) => {
                self.count.fetch_sub(1, Ordering::SeqCst);
                handle.dispose();
                true
            }
            None => false,
        }
    }

    /// Removes and disposes every subscription owned by `connection`.
    ///
    /// Best-effort snapshot semantics: the connection's keys present at
    /// call time are enumerated, then each is removed if still present.
    /// A subscription registered for the same connection after the
    /// snapshot is taken may survive the sweep. Only successful
    /// removals decrement the counter, so the count stays consistent
    /// regardless of concurrent mutation.
    ///
    /// Returns the number of subscriptions removed.
    pub fn remove_all(&self, connection: &ConnectionId) -> usize {
        let snapshot: Vec<SubscriptionKey> = self
            .entries
            .iter()
            .filter(|entry| entry.key().belongs_to(connection))
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = 0;
        for key in snapshot {
            if let Some((_, handle)) = self.entries.remove(&key) {
                self.count.fetch_sub(1, Ordering::SeqCst);
                handle.dispose();
                removed += 1;
            }
        }
        removed
    }

    /// Returns the number of live subscriptions.
    ///
    /// Eventually consistent with the map's true size; never negative.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Returns `true` if no subscriptions are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }
}
