use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the process metrics.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE
        .get_or_init(|| async {
            info!("Initializing Metrics ...");
            Metrics::new()
        })
        .await
}

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Token request metrics
    pub token_requests: IntCounterVec,
    pub token_request_failures: IntCounterVec,
    pub token_request_duration: HistogramVec,
    pub redundant_requests: IntCounter,

    // Protocol metrics
    pub client_registrations: IntCounter,
    pub authorization_polls: IntCounter,

    // Cache metrics
    pub cached_tokens: IntGauge,

    // Config/runtime
    pub config_validation_errors: IntCounter,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("cpademo".into()), None).unwrap();

        let metrics: Arc<Metrics> = Arc::new(Self {
            // Token requests
            token_requests: IntCounterVec::new(Opts::new("token_requests_total", "Token requests issued by kind"), &["kind"]).unwrap(),
            token_request_failures: IntCounterVec::new(Opts::new("token_request_failures_total", "Token request failures by reason"), &["reason"]).unwrap(),
            token_request_duration: HistogramVec::new(HistogramOpts::new("token_request_duration_seconds", "Token request duration seconds").buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 30.0, 120.0]), &["kind"]).unwrap(),
            redundant_requests: IntCounter::new("redundant_requests_total", "Requests skipped because a token was already available").unwrap(),

            // Protocol
            client_registrations: IntCounter::new("client_registrations_total", "Client registrations with the authorization provider").unwrap(),
            authorization_polls: IntCounter::new("authorization_polls_total", "Token endpoint polls while waiting for user authorization").unwrap(),

            // Cache
            cached_tokens: IntGauge::new("cached_tokens", "Tokens currently held by the token store").unwrap(),

            // Config/runtime
            config_validation_errors: IntCounter::new("config_validation_errors_total", "Validation errors during startup").unwrap(),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.token_requests.clone())).unwrap();
        reg.register(Box::new(metrics.token_request_failures.clone())).unwrap();
        reg.register(Box::new(metrics.token_request_duration.clone())).unwrap();
        reg.register(Box::new(metrics.redundant_requests.clone())).unwrap();
        reg.register(Box::new(metrics.client_registrations.clone())).unwrap();
        reg.register(Box::new(metrics.authorization_polls.clone())).unwrap();
        reg.register(Box::new(metrics.cached_tokens.clone())).unwrap();
        reg.register(Box::new(metrics.config_validation_errors.clone())).unwrap();

        metrics
    }

    /// Text exposition of every registered metric.
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
