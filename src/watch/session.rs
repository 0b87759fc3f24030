use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::StreamExt;
use parking_lot::Mutex;
use parking_lot::ReentrantMutex;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::codec::FramedRead;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use super::LineDecoder;
use super::WatchTransport;
use crate::metrics::MALFORMED_LINES_TOTAL;
use crate::metrics::WATCH_EVENTS_TOTAL;
use crate::metrics::WATCH_SESSIONS_TOTAL;
use crate::Error;
use crate::Result;
use crate::VersionToken;
use crate::WatchConfig;
use crate::WatchError;
use crate::WatchEventType;
use crate::WatchRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Streaming,
    /// Terminal. Watching again needs a new session.
    Done,
}

impl fmt::Display for SessionState {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let s = match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::Streaming => "streaming",
            SessionState::Done => "done",
        };
        f.write_str(s)
    }
}

/// Query parameters of one watch request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchParams {
    /// Resume point, usually the VersionToken of the preceding list
    pub resume: VersionToken,
    /// Appended after the watch flag and resume token
    pub extra: Vec<(String, String)>,
}

impl WatchParams {
    pub fn resume_from(resume: VersionToken) -> Self {
        Self {
            resume,
            extra: Vec::new(),
        }
    }

    pub fn with_param(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.extra.push((key.into(), value.into()));
        self
    }
}

/// One streaming connection, from open to its single completion signal.
///
/// [`watch`](Self::watch) consumes the session, so a finished session can
/// not be restarted.
pub struct WatchSession<T> {
    transport: Arc<dyn WatchTransport>,
    config: WatchConfig,
    _marker: PhantomData<fn() -> T>,
}

impl<T> WatchSession<T>
where
    T: DeserializeOwned + Send + 'static,
{
    pub fn new(
        transport: Arc<dyn WatchTransport>,
        config: WatchConfig,
    ) -> Self {
        Self {
            transport,
            config,
            _marker: PhantomData,
        }
    }

    /// Full query for `params`: watch flag, resume token, optional server
    /// timeout, then caller extras.
    pub fn query(
        &self,
        params: &WatchParams,
    ) -> Vec<(String, String)> {
        let mut query = vec![
            (self.config.watch_param.clone(), "true".to_string()),
            (self.config.resume_param.clone(), params.resume.as_str().to_string()),
        ];
        if let Some(secs) = self.config.timeout_seconds {
            query.push(("timeoutSeconds".to_string(), secs.to_string()));
        }
        query.extend(params.extra.iter().cloned());
        query
    }

    /// Open the stream and feed decoded records to `on_event` in arrival
    /// order.
    ///
    /// `on_done` runs exactly once when the stream ends: with `None` on a
    /// graceful close, with the error otherwise. After
    /// [`WatchHandle::stop`] neither callback runs again.
    pub fn watch<E, D>(
        self,
        path: &str,
        params: WatchParams,
        on_event: E,
        on_done: D,
    ) -> WatchHandle
    where
        E: FnMut(WatchEventType, T) + Send + 'static,
        D: FnOnce(Option<Error>) + Send + 'static,
    {
        let query = self.query(&params);
        let token = CancellationToken::new();
        let delivery = DeliveryGuard::default();
        let (state_tx, state_rx) = watch::channel(SessionState::Connecting);

        let runner = Runner {
            transport: self.transport,
            path: path.to_string(),
            max_line_bytes: self.config.max_line_bytes,
            token: token.clone(),
            delivery: delivery.clone(),
            state: state_tx,
        };
        debug!(path, resume = %params.resume, "watch session connecting");

        let task = tokio::spawn(runner.run(query, on_event, on_done));

        WatchHandle {
            token,
            delivery,
            state: state_rx,
            task: Mutex::new(Some(task)),
        }
    }
}

/// Serializes callback delivery against [`WatchHandle::stop`].
///
/// Every callback runs while holding the lock and only if the stopped flag
/// is unset; `stop` sets the flag under the same lock. The lock is
/// reentrant so a callback may stop its own session.
#[derive(Clone, Default)]
struct DeliveryGuard(Arc<ReentrantMutex<Cell<bool>>>);

impl DeliveryGuard {
    fn stop(&self) -> bool {
        let stopped = self.0.lock();
        !stopped.replace(true)
    }

    fn is_stopped(&self) -> bool {
        self.0.lock().get()
    }

    /// Run `f` unless stopped. Returns whether it ran.
    fn deliver(
        &self,
        f: impl FnOnce(),
    ) -> bool {
        let stopped = self.0.lock();
        if stopped.get() {
            return false;
        }
        f();
        true
    }
}

struct Runner {
    transport: Arc<dyn WatchTransport>,
    path: String,
    max_line_bytes: usize,
    token: CancellationToken,
    delivery: DeliveryGuard,
    state: watch::Sender<SessionState>,
}

impl Runner {
    async fn run<T, E, D>(
        self,
        query: Vec<(String, String)>,
        mut on_event: E,
        on_done: D,
    ) where
        T: DeserializeOwned + Send + 'static,
        E: FnMut(WatchEventType, T) + Send + 'static,
        D: FnOnce(Option<Error>) + Send + 'static,
    {
        let outcome = tokio::select! {
            biased;
            _ = self.token.cancelled() => None,
            r = self.stream::<T, E>(&query, &mut on_event) => Some(r),
        };

        self.state.send_replace(SessionState::Done);

        let (outcome_label, error) = match outcome {
            Some(Ok(delivered)) => {
                debug!(path = %self.path, delivered, "watch stream closed");
                ("closed", None)
            }
            Some(Err(e)) => {
                warn!(path = %self.path, error = %e, "watch stream terminated");
                ("error", Some(e))
            }
            None => {
                WATCH_SESSIONS_TOTAL.with_label_values(&[self.path.as_str(), "stopped"]).inc();
                debug!(path = %self.path, "watch session stopped");
                return;
            }
        };

        let outcome_label = if self.delivery.deliver(|| on_done(error)) {
            outcome_label
        } else {
            debug!(path = %self.path, "watch session stopped");
            "stopped"
        };
        WATCH_SESSIONS_TOTAL
            .with_label_values(&[self.path.as_str(), outcome_label])
            .inc();
    }

    /// Returns the number of records delivered.
    async fn stream<T, E>(
        &self,
        query: &[(String, String)],
        on_event: &mut E,
    ) -> Result<u64>
    where
        T: DeserializeOwned,
        E: FnMut(WatchEventType, T),
    {
        let body = self.transport.open(&self.path, query).await?;
        self.state.send_replace(SessionState::Streaming);
        debug!(path = %self.path, "watch session streaming");

        let mut lines = FramedRead::new(StreamReader::new(body), LineDecoder::new(self.max_line_bytes));
        let mut delivered = 0;
        let mut malformed = 0;

        let outcome = loop {
            let line = match lines.next().await {
                Some(Ok(line)) => line,
                Some(Err(e)) => break Err(WatchError::Io(e).into()),
                None => break Ok(delivered),
            };
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            let record = match serde_json::from_slice::<WatchRecord<T>>(&line) {
                Ok(record) => record,
                Err(e) => {
                    malformed += 1;
                    trace!(path = %self.path, error = %e, "dropping undecodable watch line");
                    continue;
                }
            };

            let event_type = record.event_type;
            let ran = self.delivery.deliver(|| on_event(event_type, record.object));
            if !ran {
                break Ok(delivered);
            }

            WATCH_EVENTS_TOTAL
                .with_label_values(&[self.path.as_str(), event_type.as_str()])
                .inc();
            trace!(path = %self.path, event = %event_type, "watch record");
            delivered += 1;
        };

        malformed += lines.decoder().discarded();
        if malformed > 0 {
            MALFORMED_LINES_TOTAL.with_label_values(&[self.path.as_str()]).inc_by(malformed);
        }
        outcome
    }
}

/// Control handle of a running [`WatchSession`].
///
/// Dropping the handle stops the session.
pub struct WatchHandle {
    token: CancellationToken,
    delivery: DeliveryGuard,
    state: watch::Receiver<SessionState>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl WatchHandle {
    /// Close the stream and suppress any further callback. Idempotent.
    ///
    /// A callback running on another thread finishes before this returns;
    /// none starts afterwards. Safe to call from inside a callback.
    pub fn stop(&self) {
        if self.delivery.stop() {
            debug!("stopping watch session");
        }
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.delivery.is_stopped()
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Resolves once the session task has exited, whether it completed or
    /// was stopped. Later calls return immediately.
    pub async fn finished(&self) {
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "watch session task aborted");
            }
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
