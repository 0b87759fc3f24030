use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::CallbackRegistry;
use crate::ObjectStore;
use crate::Resource;
use crate::StoreChange;
use crate::WatchEventType;

/// Store and subscribers of one informer.
///
/// Every mutation is followed by its dispatch on the same thread, so
/// subscribers observe changes in the order the store applied them. Nothing
/// is applied once `token` is cancelled.
pub(crate) struct Cache<T> {
    pub(crate) store: ObjectStore<T>,
    pub(crate) registry: CallbackRegistry<T>,
}

impl<T: Resource> Cache<T> {
    pub(crate) fn new() -> Self {
        Self {
            store: ObjectStore::new(),
            registry: CallbackRegistry::new(),
        }
    }

    /// Apply a list snapshot: deletions first, then every item as add or
    /// update.
    pub(crate) fn apply_snapshot(
        &self,
        items: Vec<T>,
        token: &CancellationToken,
    ) {
        if token.is_cancelled() {
            return;
        }
        let changes = self.store.reconcile(items);
        for change in &changes {
            if token.is_cancelled() {
                debug!("stopped while dispatching snapshot");
                return;
            }
            self.registry.dispatch(change.verb(), change.object());
        }
    }

    /// Apply one watch record.
    ///
    /// A delete for an identity that is not cached changes nothing and is
    /// not dispatched.
    pub(crate) fn apply_event(
        &self,
        event_type: WatchEventType,
        object: T,
        token: &CancellationToken,
    ) {
        if token.is_cancelled() {
            return;
        }

        match event_type {
            WatchEventType::Added | WatchEventType::Modified => {
                let change = self.store.upsert(object);
                let existed = matches!(change, StoreChange::Updated(_));
                self.registry.dispatch(event_type.verb(existed), change.object());
            }
            WatchEventType::Deleted => {
                let identity = object.identity();
                if self.store.remove(&identity).is_some() {
                    self.registry.dispatch(event_type.verb(true), &object);
                } else {
                    debug!(%identity, "delete for unknown object ignored");
                }
            }
        }
    }
}
