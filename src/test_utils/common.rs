use std::io;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::stream;
use parking_lot::Mutex;
use serde_json::json;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::watch::ByteStream;
use crate::Callback;
use crate::DynamicObject;
use crate::Resource;
use crate::Verb;

/// `(verb, "ns/name")` of every dispatch, in order
pub type DispatchLog = Arc<Mutex<Vec<(Verb, String)>>>;

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    env_logger::init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
    println!("setup logger for unit test.");
}

/// `{"name": name, "namespace": ns}`
pub fn object(
    name: &str,
    ns: Option<&str>,
) -> DynamicObject {
    object_with(name, ns, json!({}))
}

/// Like [`object`], with the fields of `extra` merged in.
pub fn object_with(
    name: &str,
    ns: Option<&str>,
    extra: Value,
) -> DynamicObject {
    let mut value = json!({ "name": name });
    if let Some(ns) = ns {
        value["namespace"] = json!(ns);
    }
    if let Value::Object(fields) = extra {
        for (k, v) in fields {
            value[k] = v;
        }
    }
    DynamicObject::try_from(value).unwrap()
}

pub fn names(objects: &[Arc<DynamicObject>]) -> Vec<String> {
    objects.iter().map(|o| o.identity().name().to_string()).collect()
}

/// One watch record line, newline included.
pub fn record_line(
    event_type: &str,
    object: Value,
) -> String {
    format!("{}\n", json!({ "type": event_type, "object": object }))
}

/// Body that yields each chunk as-is, then ends.
pub fn lines_stream(chunks: &[&str]) -> ByteStream {
    let chunks: Vec<io::Result<Bytes>> = chunks.iter().map(|c| Ok(Bytes::from(c.to_string()))).collect();
    Box::pin(stream::iter(chunks))
}

/// Body that yields `chunks`, then fails with a connection reset.
pub fn failing_stream(chunks: &[&str]) -> ByteStream {
    let mut items: Vec<io::Result<Bytes>> = chunks.iter().map(|c| Ok(Bytes::from(c.to_string()))).collect();
    items.push(Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset")));
    Box::pin(stream::iter(items))
}

/// Body fed by the returned sender. Dropping the sender closes it.
pub fn channel_stream() -> (mpsc::UnboundedSender<io::Result<Bytes>>, ByteStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, Box::pin(UnboundedReceiverStream::new(rx)))
}

/// Poll `condition` until it holds, failing the test after five seconds.
pub async fn eventually<F>(
    what: &str,
    condition: F,
) where
    F: Fn() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(tokio::time::Instant::now() < deadline, "timed out waiting for {what}");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Body that never yields and never ends.
pub fn pending_stream() -> ByteStream {
    Box::pin(stream::pending())
}

/// Callback that appends `(verb, identity)` to `log`.
pub fn recording_callback(
    verb: Verb,
    log: &DispatchLog,
) -> Callback<DynamicObject> {
    let log = log.clone();
    Arc::new(move |o: &DynamicObject| log.lock().push((verb, o.identity().to_string())))
}

/// Subscribes a [`recording_callback`] for every verb through `on`.
pub fn record_all<F>(on: F) -> DispatchLog
where
    F: Fn(Verb, Callback<DynamicObject>),
{
    let log = DispatchLog::default();
    for verb in Verb::ALL {
        on(verb, recording_callback(verb, &log));
    }
    log
}

pub fn dispatched(log: &DispatchLog) -> Vec<(Verb, String)> {
    log.lock().clone()
}
