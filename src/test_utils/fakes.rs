use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;

use super::pending_stream;
use crate::watch::ByteStream;
use crate::watch::WatchTransport;
use crate::DynamicObject;
use crate::Error;
use crate::Lister;
use crate::ObjectList;
use crate::Result;

const WAIT_LIMIT: Duration = Duration::from_secs(5);

async fn wait_for_count(
    counter: &watch::Sender<usize>,
    n: usize,
    what: &str,
) {
    let mut rx = counter.subscribe();
    let reached = tokio::time::timeout(WAIT_LIMIT, rx.wait_for(|c| *c >= n)).await;
    assert!(
        matches!(reached, Ok(Ok(_))),
        "expected {n} {what}, saw {}",
        *counter.borrow()
    );
}

/// Lister that replays queued responses, then hangs until cancelled.
pub struct ScriptedLister {
    script: Mutex<VecDeque<Result<ObjectList<DynamicObject>>>>,
    calls: watch::Sender<usize>,
}

impl Default for ScriptedLister {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedLister {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            calls: watch::channel(0).0,
        }
    }

    pub fn push_ok(
        &self,
        items: Vec<DynamicObject>,
        version: &str,
    ) -> &Self {
        self.script.lock().push_back(Ok(ObjectList::new(items, version)));
        self
    }

    pub fn push_err(
        &self,
        err: Error,
    ) -> &Self {
        self.script.lock().push_back(Err(err));
        self
    }

    pub fn calls(&self) -> usize {
        *self.calls.borrow()
    }

    pub async fn wait_for_calls(
        &self,
        n: usize,
    ) {
        wait_for_count(&self.calls, n, "list calls").await
    }
}

#[async_trait]
impl Lister<DynamicObject> for ScriptedLister {
    async fn list(&self) -> Result<ObjectList<DynamicObject>> {
        self.calls.send_modify(|c| *c += 1);
        let next = self.script.lock().pop_front();
        match next {
            Some(response) => response,
            None => std::future::pending().await,
        }
    }
}

/// Transport that hands out queued bodies in order and records every
/// request. Once the queue is empty it opens bodies that never end.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<ByteStream>>>,
    requests: Mutex<Vec<(String, Vec<(String, String)>)>>,
    opens: watch::Sender<usize>,
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            opens: watch::channel(0).0,
        }
    }

    pub fn push_body(
        &self,
        body: ByteStream,
    ) -> &Self {
        self.script.lock().push_back(Ok(body));
        self
    }

    pub fn push_err(
        &self,
        err: Error,
    ) -> &Self {
        self.script.lock().push_back(Err(err));
        self
    }

    /// `(path, query)` of every open so far
    pub fn requests(&self) -> Vec<(String, Vec<(String, String)>)> {
        self.requests.lock().clone()
    }

    pub async fn wait_for_opens(
        &self,
        n: usize,
    ) {
        wait_for_count(&self.opens, n, "watch opens").await
    }
}

#[async_trait]
impl WatchTransport for ScriptedTransport {
    async fn open(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<ByteStream> {
        self.requests.lock().push((path.to_string(), query.to_vec()));
        self.opens.send_modify(|c| *c += 1);
        let next = self.script.lock().pop_front();
        next.unwrap_or_else(|| Ok(pending_stream()))
    }
}
