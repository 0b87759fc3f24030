use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::sync::watch;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::cache::Cache;
use super::InformerState;
use super::Lister;
use crate::metrics::RELIST_TOTAL;
use crate::utils::async_task::task_with_timeout_and_exponential_backoff;
use crate::utils::ExponentialBackoff;
use crate::watch::WatchParams;
use crate::watch::WatchSession;
use crate::watch::WatchTransport;
use crate::Error;
use crate::InformerConfig;
use crate::Resource;
use crate::Result;
use crate::UsageError;
use crate::VersionToken;

/// How one watch session ended, from the loop's point of view
enum SessionEnd {
    Closed,
    Failed(Error),
    Cancelled,
}

/// Body of the informer task: list, reconcile, watch, repeat until the
/// token is cancelled or a finite retry policy runs out.
pub(crate) struct Reconciler<T> {
    pub(crate) path: String,
    pub(crate) params: Vec<(String, String)>,
    pub(crate) cache: Arc<Cache<T>>,
    pub(crate) lister: Arc<dyn Lister<T>>,
    pub(crate) transport: Arc<dyn WatchTransport>,
    pub(crate) config: InformerConfig,
    pub(crate) token: CancellationToken,
    pub(crate) state: Arc<watch::Sender<InformerState>>,
}

impl<T> Reconciler<T>
where
    T: Resource + serde::de::DeserializeOwned,
{
    /// `ready` resolves after the first snapshot was applied, or with the
    /// error that ended bootstrap.
    pub(crate) async fn run(
        self,
        ready: oneshot::Sender<Result<()>>,
    ) {
        let mut ready = Some(ready);
        let mut watch_backoff = ExponentialBackoff::new(self.config.retry.watch);

        info!(path = %self.path, "informer started");

        loop {
            let phase = if ready.is_some() {
                InformerState::Bootstrapping
            } else {
                InformerState::Relisting
            };
            self.set_state(phase);

            let version = match self.list_and_reconcile().await {
                Ok(version) => version,
                Err(Error::Usage(UsageError::Stopped)) => break,
                Err(e) => {
                    error!(path = %self.path, error = %e, "list failed, informer giving up");
                    self.cache.registry.report(&e);
                    self.set_state(InformerState::Failed);
                    if let Some(ready) = ready.take() {
                        let _ = ready.send(Err(e));
                    }
                    return;
                }
            };

            if let Some(ready) = ready.take() {
                let _ = ready.send(Ok(()));
            }

            self.set_state(InformerState::Watching);
            let delivered = Arc::new(AtomicU64::new(0));
            match self.watch_until_done(version, delivered.clone()).await {
                SessionEnd::Cancelled => break,
                SessionEnd::Closed => {
                    debug!(path = %self.path, "watch closed, relisting");
                    if delivered.load(Ordering::Relaxed) > 0 {
                        watch_backoff.reset();
                    }
                }
                SessionEnd::Failed(e) => {
                    self.cache.registry.report(&e);
                    if delivered.load(Ordering::Relaxed) > 0 {
                        watch_backoff.reset();
                    }

                    let policy = *watch_backoff.policy();
                    let failures = watch_backoff.attempts() + 1;
                    if !policy.is_unlimited() && failures >= policy.max_retries {
                        let exhausted = Error::RetryExhausted {
                            operation: "watch".to_string(),
                            attempts: failures,
                            source: Box::new(e),
                        };
                        error!(path = %self.path, error = %exhausted, "watch keeps failing, informer giving up");
                        self.cache.registry.report(&exhausted);
                        self.set_state(InformerState::Failed);
                        return;
                    }

                    let delay = watch_backoff.next_delay();
                    warn!(
                        path = %self.path,
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "watch failed, relisting after backoff"
                    );
                    tokio::select! {
                        biased;
                        _ = self.token.cancelled() => break,
                        _ = sleep(delay) => {}
                    }
                }
            }
        }

        self.set_state(InformerState::Stopped);
        info!(path = %self.path, "informer stopped");
    }

    async fn list_and_reconcile(&self) -> Result<VersionToken> {
        let cache = &self.cache;
        let snapshot = task_with_timeout_and_exponential_backoff(
            "list",
            || self.lister.list(),
            self.config.retry.list,
            &self.token,
            |e| cache.registry.report(e),
        )
        .await?;

        if self.token.is_cancelled() {
            return Err(UsageError::Stopped.into());
        }

        RELIST_TOTAL.with_label_values(&[self.path.as_str()]).inc();
        info!(
            path = %self.path,
            items = snapshot.items.len(),
            version = %snapshot.version,
            "applying list snapshot"
        );
        self.cache.apply_snapshot(snapshot.items, &self.token);
        Ok(snapshot.version)
    }

    async fn watch_until_done(
        &self,
        version: VersionToken,
        delivered: Arc<AtomicU64>,
    ) -> SessionEnd {
        let (done_tx, done_rx) = oneshot::channel();
        let cache = self.cache.clone();
        let token = self.token.clone();

        let params = WatchParams {
            resume: version,
            extra: self.params.clone(),
        };
        let handle = WatchSession::<T>::new(self.transport.clone(), self.config.watch.clone()).watch(
            &self.path,
            params,
            move |event_type, object| {
                delivered.fetch_add(1, Ordering::Relaxed);
                cache.apply_event(event_type, object, &token);
            },
            move |err| {
                let _ = done_tx.send(err);
            },
        );

        let outcome = tokio::select! {
            biased;
            _ = self.token.cancelled() => {
                handle.stop();
                handle.finished().await;
                return SessionEnd::Cancelled;
            }
            outcome = done_rx => outcome,
        };
        handle.finished().await;

        match outcome {
            Ok(None) => SessionEnd::Closed,
            Ok(Some(e)) => SessionEnd::Failed(e),
            // the session task died without a completion signal
            Err(_) => SessionEnd::Failed(Error::Fatal(format!("watch session on {} aborted", self.path))),
        }
    }

    fn set_state(
        &self,
        next: InformerState,
    ) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(path = %self.path, from = %previous, to = %next, "informer state");
        }
    }
}
