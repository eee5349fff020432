use cgpa_forecast::{
    api::{build_router, AppState},
    config::Config,
    ml::PredictionService,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration; an invalid configuration aborts startup
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    init_tracing(&config);

    tracing::info!("Starting CGPA Forecast v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = config.validate() {
        tracing::error!("Invalid configuration: {}", e);
        return Err(e.into());
    }

    // Initialize Prometheus metrics
    if config.observability.prometheus_enabled {
        if let Err(e) = cgpa_forecast::metrics::init_metrics() {
            tracing::warn!("Failed to initialize metrics: {}", e);
            tracing::warn!("Continuing without metrics");
        } else {
            tracing::info!("Prometheus metrics initialized");
        }
    } else {
        tracing::info!("Prometheus metrics disabled in configuration");
    }

    let service = Arc::new(PredictionService::from_config(&config).await?);

    // Surface broken artifacts at startup; serving continues either way
    let report = service.health_check().await;
    if !report.all_healthy() {
        tracing::warn!(
            broken = report.total_models - report.healthy_models,
            "Some models cannot be loaded; requests for them will fail"
        );
    }
    for model in report.models.iter().filter(|m| m.error.is_some()) {
        tracing::warn!(
            model_id = model.id,
            name = %model.name,
            "Model failed to load: {}",
            model.error.as_deref().unwrap_or_default()
        );
    }
    tracing::info!(
        total = report.total_models,
        healthy = report.healthy_models,
        scoring_model = ?config.scoring.model_id,
        "Model registry ready"
    );

    let app = build_router(AppState::new(service), &config);

    let http_addr = format!("{}:{}", config.server.host, config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_addr).await?;

    tracing::info!("HTTP API server listening on http://{}", http_addr);
    tracing::info!("   Health check: http://{}/health", http_addr);
    tracing::info!("   Models: http://{}/models", http_addr);
    tracing::info!("   Scoring: http://{}/predict", http_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    axum::serve(http_listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shut down gracefully");
    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.observability.log_level.clone().into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.observability.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
