use std::collections::HashMap;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use futures::stream;
use parking_lot::Mutex;
use serde_json::json;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use warp::http::Response;
use warp::http::StatusCode;
use warp::hyper::Body;
use warp::Filter;

pub const PODS: &str = "/api/v1/namespaces/default/pods";

pub type WatchFeed = mpsc::UnboundedSender<Result<String, Infallible>>;

/// In-memory stand-in for the API server's pod endpoint.
///
/// List calls replay the queued snapshots, repeating the last one. Watch
/// calls first answer queued failure statuses, then hand out queued feeds;
/// with nothing queued the watch stays open without sending anything.
#[derive(Default)]
pub struct FakeApi {
    snapshots: Mutex<Vec<Value>>,
    list_calls: AtomicUsize,
    watch_failures: Mutex<VecDeque<u16>>,
    watch_feeds: Mutex<VecDeque<mpsc::UnboundedReceiver<Result<String, Infallible>>>>,
    watch_queries: Mutex<Vec<HashMap<String, String>>>,
}

impl FakeApi {
    pub fn push_snapshot(
        &self,
        items: Vec<Value>,
        version: &str,
    ) {
        self.snapshots.lock().push(json!({
            "kind": "PodList",
            "metadata": { "resourceVersion": version },
            "items": items,
        }));
    }

    pub fn push_watch_failure(
        &self,
        status: u16,
    ) {
        self.watch_failures.lock().push_back(status);
    }

    /// Queue a watch body; records sent on the feed are streamed as-is and
    /// dropping the feed closes the stream.
    pub fn push_watch_feed(&self) -> WatchFeed {
        let (tx, rx) = mpsc::unbounded_channel();
        self.watch_feeds.lock().push_back(rx);
        tx
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn watch_queries(&self) -> Vec<HashMap<String, String>> {
        self.watch_queries.lock().clone()
    }

    fn respond(
        &self,
        query: HashMap<String, String>,
    ) -> Response<Body> {
        if query.get("watch").map(String::as_str) == Some("true") {
            self.watch_queries.lock().push(query);

            if let Some(status) = self.watch_failures.lock().pop_front() {
                let status = StatusCode::from_u16(status).unwrap();
                return Response::builder().status(status).body(Body::empty()).unwrap();
            }

            let feed = self.watch_feeds.lock().pop_front();
            let body = match feed {
                Some(rx) => Body::wrap_stream(UnboundedReceiverStream::new(rx)),
                None => Body::wrap_stream(stream::pending::<Result<String, Infallible>>()),
            };
            return Response::builder().body(body).unwrap();
        }

        let call = self.list_calls.fetch_add(1, Ordering::SeqCst);
        let snapshots = self.snapshots.lock();
        let body = snapshots
            .get(call)
            .or(snapshots.last())
            .map(Value::to_string)
            .unwrap_or_else(|| json!({ "items": [], "metadata": {} }).to_string());
        Response::builder().body(Body::from(body)).unwrap()
    }
}

/// Serve `api` on an ephemeral local port and return its base URL.
pub fn serve(api: Arc<FakeApi>) -> String {
    let with_api = warp::any().map(move || api.clone());
    let pods = warp::path!("api" / "v1" / "namespaces" / String / "pods")
        .and(warp::query::<HashMap<String, String>>())
        .and(with_api)
        .map(|_namespace: String, query: HashMap<String, String>, api: Arc<FakeApi>| api.respond(query));

    let (addr, server) = warp::serve(pods).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    format!("http://{addr}")
}

pub fn pod(
    name: &str,
    extra: Value,
) -> Value {
    let mut pod = json!({ "metadata": { "name": name, "namespace": "default" } });
    if let Value::Object(fields) = extra {
        for (k, v) in fields {
            pod[k] = v;
        }
    }
    pod
}

pub fn send(
    feed: &WatchFeed,
    event_type: &str,
    object: Value,
) {
    feed.send(Ok(format!("{}\n", json!({ "type": event_type, "object": object }))))
        .unwrap();
}

pub fn send_raw(
    feed: &WatchFeed,
    line: &str,
) {
    feed.send(Ok(line.to_string())).unwrap();
}

/// Poll `condition` until it holds, failing after five seconds.
pub async fn eventually<F>(
    what: &str,
    condition: F,
) where
    F: Fn() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(tokio::time::Instant::now() < deadline, "timed out waiting for {what}");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
