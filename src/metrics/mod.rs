//! Prometheus counters for informer activity.
//!
//! Counters are process-wide and unregistered until
//! [`register_custom_metrics`] attaches them to a caller-owned registry.
//! Per-path labels let several informers share one registry.


use lazy_static::lazy_static;
use prometheus::Encoder;
use prometheus::IntCounterVec;
use prometheus::Opts;
use prometheus::Registry;

lazy_static! {
    pub static ref WATCH_EVENTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("informer_watch_events_total", "Decoded watch records by wire type"),
        &["path", "type"]
    )
    .expect("metric can not be created");

    pub static ref DISPATCH_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("informer_dispatch_total", "Callback dispatches by verb"),
        &["verb"]
    )
    .expect("metric can not be created");

    pub static ref RELIST_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("informer_relist_total", "Successful list calls, bootstrap included"),
        &["path"]
    )
    .expect("metric can not be created");

    pub static ref MALFORMED_LINES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("informer_malformed_lines_total", "Watch lines dropped as undecodable"),
        &["path"]
    )
    .expect("metric can not be created");

    pub static ref WATCH_SESSIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("informer_watch_sessions_total", "Finished watch sessions by outcome"),
        &["path", "outcome"]
    )
    .expect("metric can not be created");

    pub static ref CALLBACK_PANICS: IntCounterVec = IntCounterVec::new(
        Opts::new("informer_callback_panics_total", "Subscribers that panicked during dispatch"),
        &["verb"]
    )
    .expect("metric can not be created");
}

pub fn register_custom_metrics(registry: &Registry) -> prometheus::Result<()> {
    registry.register(Box::new(WATCH_EVENTS_TOTAL.clone()))?;
    registry.register(Box::new(DISPATCH_TOTAL.clone()))?;
    registry.register(Box::new(RELIST_TOTAL.clone()))?;
    registry.register(Box::new(MALFORMED_LINES_TOTAL.clone()))?;
    registry.register(Box::new(WATCH_SESSIONS_TOTAL.clone()))?;
    registry.register(Box::new(CALLBACK_PANICS.clone()))?;
    Ok(())
}

/// Render `registry` in the Prometheus text exposition format.
pub fn encode_text(registry: &Registry) -> prometheus::Result<String> {
    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
