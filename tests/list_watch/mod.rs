//! End-to-end list, watch and relist against a fake API server.

use std::io::Write;
use std::sync::Arc;

use listwatch::ApiClient;
use listwatch::BackoffPolicy;
use listwatch::Callback;
use listwatch::DynamicObject;
use listwatch::Error;
use listwatch::InformerConfig;
use listwatch::InformerState;
use listwatch::Resource;
use listwatch::Verb;
use listwatch::WatchError;
use parking_lot::Mutex;
use serde_json::json;

use crate::commons::eventually;
use crate::commons::pod;
use crate::commons::send;
use crate::commons::send_raw;
use crate::commons::serve;
use crate::commons::FakeApi;
use crate::commons::PODS;
use crate::enable_logger;

type Seen = Arc<Mutex<Vec<(Verb, String)>>>;

fn fast_config() -> InformerConfig {
    let policy = BackoffPolicy {
        max_retries: 0,
        timeout_ms: 0,
        base_delay_ms: 1,
        max_delay_ms: 5,
        jitter: false,
    };
    let mut config = InformerConfig::default();
    config.retry.list = policy;
    config.retry.watch = policy;
    config
}

fn record(
    seen: &Seen,
    verb: Verb,
) -> Callback<DynamicObject> {
    let seen = seen.clone();
    Arc::new(move |o: &DynamicObject| seen.lock().push((verb, o.identity().name().to_string())))
}

fn seen_names(
    seen: &Seen,
    verb: Verb,
) -> Vec<String> {
    seen.lock()
        .iter()
        .filter(|(v, _)| *v == verb)
        .map(|(_, name)| name.clone())
        .collect()
}

#[tokio::test]
async fn test_list_watch_relist_round_trip() {
    enable_logger();
    let api = Arc::new(FakeApi::default());
    api.push_snapshot(vec![pod("A", json!({})), pod("B", json!({}))], "10");
    let feed = api.push_watch_feed();
    api.push_snapshot(
        vec![pod("B", json!({ "rev": 2 })), pod("C", json!({}))],
        "20",
    );
    let client = ApiClient::builder(serve(api.clone())).build().unwrap();

    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let informer = client.informer::<DynamicObject>(PODS, fast_config()).build().unwrap();
    for verb in [Verb::Add, Verb::Update, Verb::Delete] {
        informer.on(verb, record(&seen, verb)).unwrap();
    }

    informer.start().await.unwrap();
    assert_eq!(seen_names(&seen, Verb::Add), vec!["A", "B"]);
    assert_eq!(informer.list(Some("default")).len(), 2);

    eventually("watch to open", || !api.watch_queries().is_empty()).await;
    let query = &api.watch_queries()[0];
    assert_eq!(query.get("watch").map(String::as_str), Some("true"));
    assert_eq!(query.get("resourceVersion").map(String::as_str), Some("10"));

    send(&feed, "MODIFIED", pod("B", json!({ "rev": 2 })));
    send(&feed, "ADDED", pod("C", json!({})));
    send_raw(&feed, "{ this is not json\n");
    eventually("C to be cached", || informer.get("C", Some("default")).is_some()).await;
    assert_eq!(informer.get("B", Some("default")).unwrap().field("rev"), &json!(2));

    // closing the stream relists; A is gone from the second snapshot
    drop(feed);
    eventually("relist to drop A", || informer.get("A", Some("default")).is_none()).await;
    assert_eq!(api.list_calls(), 2);
    assert_eq!(seen_names(&seen, Verb::Delete), vec!["A"]);
    assert_eq!(seen_names(&seen, Verb::Add), vec!["A", "B", "C"]);

    eventually("watch to resume from the relist", || api.watch_queries().len() == 2).await;
    assert_eq!(
        api.watch_queries()[1].get("resourceVersion").map(String::as_str),
        Some("20")
    );

    informer.stop().await;
    assert_eq!(informer.state(), InformerState::Stopped);
    let names: Vec<String> = informer
        .list(None)
        .iter()
        .map(|o| o.identity().name().to_string())
        .collect();
    assert_eq!(names, vec!["B", "C"]);
}

#[tokio::test]
async fn test_rejected_watch_is_reported_and_recovered() {
    enable_logger();
    let api = Arc::new(FakeApi::default());
    api.push_snapshot(vec![pod("A", json!({}))], "5");
    api.push_watch_failure(410);
    let client = ApiClient::builder(serve(api.clone())).build().unwrap();

    let informer = client.informer::<DynamicObject>(PODS, fast_config()).build().unwrap();
    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = errors.clone();
    informer.on_error(Arc::new(move |e: &Error| {
        sink.lock().push(matches!(e, Error::Watch(WatchError::Status { status: 410, .. })))
    }));

    informer.start().await.unwrap();
    eventually("the rejected watch to be retried", || api.watch_queries().len() >= 2).await;

    assert_eq!(errors.lock().first(), Some(&true));
    assert!(api.list_calls() >= 2);
    assert!(informer.get("A", Some("default")).is_some());
    informer.stop().await;
}

#[tokio::test]
async fn test_watch_settings_from_config_file() {
    enable_logger();
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "[watch]\ntimeout_seconds = 30\n").unwrap();

    let api = Arc::new(FakeApi::default());
    api.push_snapshot(vec![], "1");
    let client = ApiClient::builder(serve(api.clone())).build().unwrap();

    let informer = client
        .informer::<DynamicObject>(PODS, fast_config())
        .with_override_config(file.path().to_str().unwrap())
        .unwrap()
        .watch_param("labelSelector", "app=web")
        .spawn()
        .await
        .unwrap();
    assert!(informer.list(None).is_empty());

    eventually("watch to open", || !api.watch_queries().is_empty()).await;
    let query = &api.watch_queries()[0];
    assert_eq!(query.get("timeoutSeconds").map(String::as_str), Some("30"));
    assert_eq!(query.get("labelSelector").map(String::as_str), Some("app=web"));
    informer.stop().await;
}
