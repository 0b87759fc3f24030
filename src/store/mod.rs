//! Identity-keyed object store with a namespace index.
//!
//! Both maps live behind one `RwLock`, so every mutation updates the store
//! and the namespace index together and readers never observe one without
//! the other. Objects are kept as `Arc<T>`; reads hand out clones of the
//! `Arc`, never of the object.
//!
//! Listing order is insertion order. Replacing an object keeps its slot.


use std::collections::BTreeMap;
use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;
use tracing::trace;

use crate::Identity;
use crate::Resource;
use crate::Verb;

/// Observable outcome of a store mutation
#[derive(Debug)]
pub enum StoreChange<T> {
    Added(Arc<T>),
    Updated(Arc<T>),
    Deleted(Arc<T>),
}

impl<T> StoreChange<T> {
    pub fn verb(&self) -> Verb {
        match self {
            StoreChange::Added(_) => Verb::Add,
            StoreChange::Updated(_) => Verb::Update,
            StoreChange::Deleted(_) => Verb::Delete,
        }
    }

    pub fn object(&self) -> &Arc<T> {
        match self {
            StoreChange::Added(o) | StoreChange::Updated(o) | StoreChange::Deleted(o) => o,
        }
    }
}

impl<T> Clone for StoreChange<T> {
    fn clone(&self) -> Self {
        match self {
            StoreChange::Added(o) => StoreChange::Added(Arc::clone(o)),
            StoreChange::Updated(o) => StoreChange::Updated(Arc::clone(o)),
            StoreChange::Deleted(o) => StoreChange::Deleted(Arc::clone(o)),
        }
    }
}

struct Entry<T> {
    seq: u64,
    object: Arc<T>,
}

struct StoreInner<T> {
    objects: HashMap<Identity, Entry<T>>,
    by_namespace: HashMap<String, HashSet<Identity>>,
    // name -> identities carrying it, keyed by insertion seq
    by_name: HashMap<String, BTreeMap<u64, Identity>>,
    next_seq: u64,
}

impl<T: Resource> StoreInner<T> {
    fn upsert(
        &mut self,
        object: T,
    ) -> StoreChange<T> {
        let identity = object.identity();
        let object = Arc::new(object);

        if let Some(entry) = self.objects.get_mut(&identity) {
            entry.object = Arc::clone(&object);
            return StoreChange::Updated(object);
        }

        if let Some(ns) = identity.namespace() {
            self.by_namespace
                .entry(ns.to_string())
                .or_default()
                .insert(identity.clone());
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.by_name
            .entry(identity.name().to_string())
            .or_default()
            .insert(seq, identity.clone());
        self.objects.insert(
            identity,
            Entry {
                seq,
                object: Arc::clone(&object),
            },
        );
        StoreChange::Added(object)
    }

    fn remove(
        &mut self,
        identity: &Identity,
    ) -> Option<Arc<T>> {
        let entry = self.objects.remove(identity)?;

        if let Some(holders) = self.by_name.get_mut(identity.name()) {
            holders.remove(&entry.seq);
            if holders.is_empty() {
                self.by_name.remove(identity.name());
            }
        }

        if let Some(ns) = identity.namespace() {
            if let Some(members) = self.by_namespace.get_mut(ns) {
                members.remove(identity);
                if members.is_empty() {
                    self.by_namespace.remove(ns);
                }
            }
        }

        Some(entry.object)
    }

    fn collect<'a>(
        &'a self,
        entries: impl Iterator<Item = &'a Entry<T>>,
    ) -> Vec<Arc<T>> {
        let mut entries: Vec<&Entry<T>> = entries.collect();
        entries.sort_unstable_by_key(|e| e.seq);
        entries.into_iter().map(|e| Arc::clone(&e.object)).collect()
    }
}

pub struct ObjectStore<T> {
    inner: RwLock<StoreInner<T>>,
}

impl<T: Resource> Default for ObjectStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Resource> ObjectStore<T> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                objects: HashMap::new(),
                by_namespace: HashMap::new(),
                by_name: HashMap::new(),
                next_seq: 0,
            }),
        }
    }

    /// Lookup by name, restricted to `namespace` when one is given.
    ///
    /// Without a namespace the cluster-scoped object of that name wins;
    /// otherwise the earliest inserted object of that name in any namespace
    /// is returned.
    pub fn get(
        &self,
        name: &str,
        namespace: Option<&str>,
    ) -> Option<Arc<T>> {
        if namespace.is_some() {
            return self.get_by_identity(&Identity::new(name, namespace));
        }

        let inner = self.inner.read();
        if let Some(entry) = inner.objects.get(&Identity::cluster_scoped(name)) {
            return Some(Arc::clone(&entry.object));
        }
        let (_, identity) = inner.by_name.get(name)?.first_key_value()?;
        inner.objects.get(identity).map(|e| Arc::clone(&e.object))
    }

    pub fn get_by_identity(
        &self,
        identity: &Identity,
    ) -> Option<Arc<T>> {
        self.inner
            .read()
            .objects
            .get(identity)
            .map(|e| Arc::clone(&e.object))
    }

    /// All objects, or exactly the namespace index contents for `namespace`.
    /// An unknown namespace lists as empty.
    pub fn list(
        &self,
        namespace: Option<&str>,
    ) -> Vec<Arc<T>> {
        let inner = self.inner.read();
        match namespace {
            None => inner.collect(inner.objects.values()),
            Some(ns) => match inner.by_namespace.get(ns) {
                Some(members) => inner.collect(members.iter().filter_map(|id| inner.objects.get(id))),
                None => Vec::new(),
            },
        }
    }

    /// Namespaces that currently hold at least one object
    pub fn namespaces(&self) -> Vec<String> {
        let mut namespaces: Vec<String> = self.inner.read().by_namespace.keys().cloned().collect();
        namespaces.sort_unstable();
        namespaces
    }

    pub fn contains(
        &self,
        identity: &Identity,
    ) -> bool {
        self.inner.read().objects.contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.inner.read().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert or replace by identity.
    pub fn upsert(
        &self,
        object: T,
    ) -> StoreChange<T> {
        let change = self.inner.write().upsert(object);
        trace!(verb = %change.verb(), "store upsert");
        change
    }

    /// Remove by identity. `None` when nothing was stored.
    pub fn remove(
        &self,
        identity: &Identity,
    ) -> Option<Arc<T>> {
        let removed = self.inner.write().remove(identity);
        trace!(%identity, removed = removed.is_some(), "store remove");
        removed
    }

    /// Align the store with a full snapshot.
    ///
    /// Identities absent from `items` are removed first and reported as
    /// `Deleted`; then every item is upserted in order. Unchanged items
    /// still report `Updated`: there is no diffing.
    pub fn reconcile(
        &self,
        items: Vec<T>,
    ) -> Vec<StoreChange<T>> {
        let keep: HashSet<Identity> = items.iter().map(Resource::identity).collect();

        let mut inner = self.inner.write();

        let mut stale: Vec<(u64, Identity)> = inner
            .objects
            .iter()
            .filter(|(id, _)| !keep.contains(*id))
            .map(|(id, e)| (e.seq, id.clone()))
            .collect();
        stale.sort_unstable_by_key(|(seq, _)| *seq);

        let mut changes = Vec::with_capacity(stale.len() + items.len());
        for (_, identity) in stale {
            if let Some(object) = inner.remove(&identity) {
                changes.push(StoreChange::Deleted(object));
            }
        }
        for item in items {
            changes.push(inner.upsert(item));
        }
        drop(inner);

        debug!(
            changes = changes.len(),
            size = self.len(),
            "store reconciled against snapshot"
        );
        changes
    }
}
