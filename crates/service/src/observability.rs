use once_cell::sync::Lazy;
use prometheus::{register_histogram, register_int_counter, register_int_counter_vec, Encoder, Histogram, IntCounter, IntCounterVec, TextEncoder};

// Prometheus metrics (default registry)
pub static WEBHOOKS_RECEIVED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "pr_notifier_webhooks_received_total",
        "Webhooks received, by action",
        &["action"]
    )
    .expect("register webhooks_received_total")
});

pub static MESSAGES_POSTED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "pr_notifier_messages_posted_total",
        "Slack messages posted"
    )
    .expect("register messages_posted_total")
});

pub static WEBHOOKS_SKIPPED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "pr_notifier_webhooks_skipped_total",
        "Webhooks that produced no Slack message"
    )
    .expect("register webhooks_skipped_total")
});

pub static NOTIFY_ERRORS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "pr_notifier_errors_total",
        "Webhooks that failed to notify"
    )
    .expect("register errors_total")
});

pub static HANDLE_DURATION: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "pr_notifier_handle_duration_seconds",
        "Webhook handling duration in seconds",
        vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("register handle_duration")
});

/// Text exposition of the default registry.
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}
