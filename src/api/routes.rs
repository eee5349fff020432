use crate::api::{handlers, AppState};
use crate::config::{Config, CorsConfig};
use crate::metrics::MetricsMiddleware;
use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

/// Build the main API router
pub fn build_router(state: AppState, config: &Config) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        // Health endpoints
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        // Model registry
        .route("/models", get(handlers::list_models))
        .route("/models/health_check", get(handlers::models_health_check))
        .route(
            "/models/:id",
            get(handlers::get_model).patch(handlers::update_model),
        )
        .route("/models/:id/predict", post(handlers::predict))
        .route("/models/:id/model_info", get(handlers::model_info))
        // Prediction logs
        .route("/prediction_logs", get(handlers::list_prediction_logs))
        .route("/prediction_logs/:id", get(handlers::get_prediction_log))
        // Single-student scoring
        .route("/predict", post(handlers::score))
        // Add state
        .with_state(state)
        // Add middleware
        .layer(MetricsMiddleware::layer_with_config(config.metrics.clone()))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(cors_layer(&config.cors))
}

/// Allow-list CORS; request headers are mirrored so credentials stay usable
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origin = if config.allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(config.allow_credentials)
}
