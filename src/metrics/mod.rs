/// Prometheus metrics for the prediction service.
///
/// Covers HTTP traffic, model loading and caching, inference latency,
/// prediction outcomes and which recommendation rules fire.
///
/// # Example
/// ```no_run
/// use cgpa_forecast::metrics::PREDICTIONS_TOTAL;
///
/// PREDICTIONS_TOTAL.with_label_values(&["1", "success"]).inc();
/// ```

mod config;
mod middleware;

pub use config::MetricsConfig;
pub use middleware::{MetricsLayer, MetricsMiddleware};

use lazy_static::lazy_static;
use once_cell::sync::OnceCell;
use prometheus::{CounterVec, Gauge, HistogramOpts, HistogramVec, Opts, Registry};

const NAMESPACE: &str = "cgpa_forecast";

lazy_static! {
    /// Global Prometheus registry for all metrics
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    /// Total number of HTTP requests received
    ///
    /// Labels: method, path, status_code
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests")
            .namespace(NAMESPACE),
        &["method", "path", "status_code"]
    ).expect("Failed to create HTTP_REQUESTS_TOTAL metric");

    /// HTTP request duration in seconds
    ///
    /// Labels: method, path
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request duration in seconds"
        )
        .namespace(NAMESPACE)
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        &["method", "path"]
    ).expect("Failed to create HTTP_REQUEST_DURATION_SECONDS metric");

    /// Number of in-flight HTTP requests
    pub static ref HTTP_REQUESTS_IN_FLIGHT: Gauge = Gauge::with_opts(
        Opts::new("http_requests_in_flight", "Number of in-flight HTTP requests")
            .namespace(NAMESPACE)
    ).expect("Failed to create HTTP_REQUESTS_IN_FLIGHT metric");

    /// Requests against one registered model, by route and outcome
    ///
    /// Labels: model_id, route, outcome
    pub static ref MODEL_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("model_requests_total", "Total number of HTTP requests addressed to a model")
            .namespace(NAMESPACE),
        &["model_id", "route", "outcome"]
    ).expect("Failed to create MODEL_REQUESTS_TOTAL metric");

    /// Prediction requests by outcome
    ///
    /// Labels: model_id, status
    pub static ref PREDICTIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("predictions_total", "Total number of prediction requests")
            .namespace(NAMESPACE),
        &["model_id", "status"]
    ).expect("Failed to create PREDICTIONS_TOTAL metric");

    /// Model inference duration in seconds
    ///
    /// Labels: model_id
    pub static ref INFERENCE_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "inference_duration_seconds",
            "Model inference duration in seconds"
        )
        .namespace(NAMESPACE)
        .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        &["model_id"]
    ).expect("Failed to create INFERENCE_DURATION_SECONDS metric");

    /// Artifact loads from storage
    ///
    /// Labels: outcome (success, error)
    pub static ref MODEL_LOADS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("model_loads_total", "Total number of artifact loads from storage")
            .namespace(NAMESPACE),
        &["outcome"]
    ).expect("Failed to create MODEL_LOADS_TOTAL metric");

    /// Predictor cache lookups
    ///
    /// Labels: result (hit, miss, stale)
    pub static ref MODEL_CACHE_LOOKUPS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("model_cache_lookups_total", "Total number of predictor cache lookups")
            .namespace(NAMESPACE),
        &["result"]
    ).expect("Failed to create MODEL_CACHE_LOOKUPS_TOTAL metric");

    /// Recommendations emitted
    ///
    /// Labels: rule
    pub static ref RECOMMENDATIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("recommendations_total", "Total number of recommendations emitted")
            .namespace(NAMESPACE),
        &["rule"]
    ).expect("Failed to create RECOMMENDATIONS_TOTAL metric");

    /// Total number of errors
    ///
    /// Labels: component, error_type
    pub static ref ERRORS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("errors_total", "Total number of errors")
            .namespace(NAMESPACE),
        &["component", "error_type"]
    ).expect("Failed to create ERRORS_TOTAL metric");

    /// Application build info
    ///
    /// Labels: version
    pub static ref BUILD_INFO: prometheus::GaugeVec = prometheus::GaugeVec::new(
        Opts::new("build_info", "Application build information")
            .namespace(NAMESPACE),
        &["version"]
    ).expect("Failed to create BUILD_INFO metric");
}

static INITIALIZED: OnceCell<()> = OnceCell::new();

/// Register all collectors with the registry
///
/// Safe to call more than once; registration happens on the first call only.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    INITIALIZED
        .get_or_try_init(|| {
            PROMETHEUS_REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()))?;
            PROMETHEUS_REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))?;
            PROMETHEUS_REGISTRY.register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))?;
            PROMETHEUS_REGISTRY.register(Box::new(MODEL_REQUESTS_TOTAL.clone()))?;
            PROMETHEUS_REGISTRY.register(Box::new(PREDICTIONS_TOTAL.clone()))?;
            PROMETHEUS_REGISTRY.register(Box::new(INFERENCE_DURATION_SECONDS.clone()))?;
            PROMETHEUS_REGISTRY.register(Box::new(MODEL_LOADS_TOTAL.clone()))?;
            PROMETHEUS_REGISTRY.register(Box::new(MODEL_CACHE_LOOKUPS_TOTAL.clone()))?;
            PROMETHEUS_REGISTRY.register(Box::new(RECOMMENDATIONS_TOTAL.clone()))?;
            PROMETHEUS_REGISTRY.register(Box::new(ERRORS_TOTAL.clone()))?;
            PROMETHEUS_REGISTRY.register(Box::new(BUILD_INFO.clone()))?;

            BUILD_INFO
                .with_label_values(&[env!("CARGO_PKG_VERSION")])
                .set(1.0);

            tracing::info!("Prometheus metrics initialized successfully");
            Ok(())
        })
        .map(|_| ())
}

/// Prometheus text exposition of every registered metric
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = PROMETHEUS_REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}
