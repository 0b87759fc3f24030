use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tokio::sync::oneshot;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::cache::Cache;
use super::reconciler::Reconciler;
use super::InformerState;
use super::Lister;
use crate::watch::WatchTransport;
use crate::Callback;
use crate::ErrorObserver;
use crate::InformerConfig;
use crate::IntoVerb;
use crate::ObjectStore;
use crate::Resource;
use crate::Result;
use crate::UsageError;

/// Local, continuously reconciled mirror of a remote collection.
///
/// Built by [`InformerBuilder`](super::InformerBuilder). Reads are served
/// from memory; subscriptions fire as the store changes, in the order the
/// changes were applied.
pub struct Informer<T: Resource> {
    path: String,
    params: Vec<(String, String)>,
    cache: Arc<Cache<T>>,
    lister: Arc<dyn Lister<T>>,
    transport: Arc<dyn WatchTransport>,
    config: InformerConfig,
    token: CancellationToken,
    state: Arc<watch::Sender<InformerState>>,
    started: AtomicBool,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<T> Informer<T>
where
    T: Resource + DeserializeOwned,
{
    pub(crate) fn new(
        path: String,
        params: Vec<(String, String)>,
        lister: Arc<dyn Lister<T>>,
        transport: Arc<dyn WatchTransport>,
        config: InformerConfig,
    ) -> Self {
        Self {
            path,
            params,
            cache: Arc::new(Cache::new()),
            lister,
            transport,
            config,
            token: CancellationToken::new(),
            state: Arc::new(watch::channel(InformerState::Idle).0),
            started: AtomicBool::new(false),
            task: Mutex::new(None),
        }
    }

    /// Start the list-watch loop.
    ///
    /// Resolves once the first snapshot has been applied and dispatched.
    /// Fails if bootstrap exhausts a finite list retry policy, if the
    /// informer was already started, or if it was stopped.
    pub async fn start(&self) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(UsageError::Stopped.into());
        }
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(UsageError::AlreadyStarted.into());
        }

        let (ready_tx, ready_rx) = oneshot::channel();
        let reconciler = Reconciler {
            path: self.path.clone(),
            params: self.params.clone(),
            cache: self.cache.clone(),
            lister: self.lister.clone(),
            transport: self.transport.clone(),
            config: self.config.clone(),
            token: self.token.clone(),
            state: self.state.clone(),
        };
        *self.task.lock() = Some(tokio::spawn(reconciler.run(ready_tx)));

        match ready_rx.await {
            Ok(result) => result,
            // loop exited before bootstrap finished
            Err(_) => Err(UsageError::Stopped.into()),
        }
    }

    /// Stop the loop and wait for it to exit.
    ///
    /// After this returns the store is no longer mutated and no callback
    /// runs. Idempotent. A stopped informer can not be started again.
    pub async fn stop(&self) {
        if !self.token.is_cancelled() {
            info!(path = %self.path, "stopping informer");
            self.token.cancel();
        }

        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(path = %self.path, error = %e, "informer task aborted");
            }
        }
        if self.state() != InformerState::Failed {
            self.state.send_replace(InformerState::Stopped);
        }
    }

    /// Cached object named `name`, in `namespace` when one is given.
    /// Without a namespace any namespace matches; see [`ObjectStore::get`].
    pub fn get(
        &self,
        name: &str,
        namespace: Option<&str>,
    ) -> Option<Arc<T>> {
        self.cache.store.get(name, namespace)
    }

    /// Every cached object, or those of one namespace, in insertion order.
    pub fn list(
        &self,
        namespace: Option<&str>,
    ) -> Vec<Arc<T>> {
        self.cache.store.list(namespace)
    }

    /// Subscribe to `verb` (`"add"`, `"update"`, `"delete"` or a
    /// [`Verb`](crate::Verb)). Keep a clone of `callback` to unsubscribe.
    pub fn on(
        &self,
        verb: impl IntoVerb,
        callback: Callback<T>,
    ) -> Result<()> {
        self.cache.registry.on(verb, callback)
    }

    /// Remove the first subscription of `callback` for `verb`.
    pub fn off(
        &self,
        verb: impl IntoVerb,
        callback: &Callback<T>,
    ) -> Result<bool> {
        self.cache.registry.off(verb, callback)
    }

    /// Observe list failures and abnormal watch terminations. The loop
    /// recovers from them on its own; observers are informational.
    pub fn on_error(
        &self,
        observer: ErrorObserver,
    ) {
        self.cache.registry.on_error(observer)
    }

    pub fn state(&self) -> InformerState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<InformerState> {
        self.state.subscribe()
    }

    pub fn store(&self) -> &ObjectStore<T> {
        &self.cache.store
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn config(&self) -> &InformerConfig {
        &self.config
    }
}

impl<T: Resource> Drop for Informer<T> {
    fn drop(&mut self) {
        if !self.token.is_cancelled() {
            debug!(path = %self.path, "informer dropped, cancelling loop");
            self.token.cancel();
        }
    }
}
