//! Shared helpers for integration tests
//!
//! Artifacts are written into a temporary directory that lives as long as
//! the returned `TestApp`.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use cgpa_forecast::{
    api::{build_router, AppState},
    config::{Config, ModelEntry},
    ml::{ArtifactDocument, LinearRegressor, NormalizationPolicy, PredictionService},
};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub dir: TempDir,
}

/// Linear model over the six features
pub fn write_linear_artifact(dir: &Path, file: &str, coefficients: [f64; 6], intercept: f64) -> PathBuf {
    let path = dir.join(file);
    let document =
        ArtifactDocument::LinearRegression(LinearRegressor::new(coefficients.to_vec(), intercept));
    std::fs::write(&path, document.to_json().unwrap()).unwrap();
    path
}

pub fn entry(id: u64, name: &str, path: PathBuf, normalization: NormalizationPolicy) -> ModelEntry {
    ModelEntry {
        id,
        name: name.to_string(),
        description: format!("{} test model", name),
        path,
        is_active: true,
        normalization,
    }
}

/// Build a router over the given model entries
pub async fn build_app(dir: TempDir, models: Vec<ModelEntry>, scoring_model: Option<u64>) -> TestApp {
    let mut config = Config::default();
    config.models = models;
    config.scoring.model_id = scoring_model;

    let service = PredictionService::from_config(&config).await.unwrap();
    let router = build_router(AppState::new(Arc::new(service)), &config);

    TestApp { router, dir }
}

/// Four models:
/// 1 `rescaled`: raw = 0.2 * attendance, rescale [0, 20] -> [0, 4]
/// 2 `direct`: raw = 0.05 * attendance, clamp to [0, 4]; serves `/predict`
/// 3 `retired`: inactive copy of 2
/// 4 `broken`: unreadable artifact
pub async fn standard_app() -> TestApp {
    let dir = TempDir::new().unwrap();

    let rescaled = write_linear_artifact(dir.path(), "rescaled.json", [0.0, 0.2, 0.0, 0.0, 0.0, 0.0], 0.0);
    let direct = write_linear_artifact(dir.path(), "direct.json", [0.0, 0.05, 0.0, 0.0, 0.0, 0.0], 0.0);
    let broken = dir.path().join("broken.json");
    std::fs::write(&broken, b"\x80\x04\x95 not json").unwrap();

    let mut retired = entry(3, "retired", direct.clone(), NormalizationPolicy::clamp_default());
    retired.is_active = false;

    let models = vec![
        entry(1, "rescaled", rescaled, NormalizationPolicy::rescale_default()),
        entry(2, "direct", direct, NormalizationPolicy::clamp_default()),
        retired,
        entry(4, "broken", broken, NormalizationPolicy::clamp_default()),
    ];

    build_app(dir, models, Some(2)).await
}

/// Features in model column order with the given attendance
pub fn row(attendance: f64) -> Vec<f64> {
    vec![0.0, attendance, 0.0, 5.0, 0.0, 5.0]
}

/// Send a request and decode the JSON response body
pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = body.map(|json| json.to_string());
    let (status, bytes) = send_raw(app, method, uri, body.as_deref()).await;
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

/// Send a request with a raw JSON body and return the raw response body
pub async fn send_raw(app: &Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(text) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(text.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

/// Parse Prometheus exposition format into metric name -> lines
pub fn parse_prometheus_output(output: &str) -> HashMap<String, Vec<String>> {
    let mut metrics = HashMap::new();
    let mut current_metric = String::new();

    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if line.starts_with("# HELP") || line.starts_with("# TYPE") {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() >= 3 {
                current_metric = parts[2].to_string();
                metrics
                    .entry(current_metric.clone())
                    .or_insert_with(Vec::new)
                    .push(line.to_string());
            }
        } else if !line.starts_with('#') && !current_metric.is_empty() {
            metrics
                .entry(current_metric.clone())
                .or_insert_with(Vec::new)
                .push(line.to_string());
        }
    }

    metrics
}
