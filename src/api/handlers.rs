use crate::api::AppState;
use crate::error::{AppError, DetailError, Result};
use crate::ml::NormalizationPolicy;
use crate::models::*;
use crate::state::ArtifactUpdate;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Welcome endpoint
pub async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Welcome to the CGPA Predictor API. POST /predict to score a student."
    }))
}

/// Liveness endpoint
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// List registered models, newest first
pub async fn list_models(
    State(state): State<AppState>,
    query: std::result::Result<Query<ListModelsQuery>, QueryRejection>,
) -> Result<Json<Vec<ArtifactResponse>>> {
    let Query(params) = query?;
    let models = state.service.list_models(params.is_active()).await?;
    Ok(Json(models.into_iter().map(ArtifactResponse::from).collect()))
}

#[derive(Debug, Deserialize)]
pub struct ListModelsQuery {
    pub is_active: Option<String>,
}

impl ListModelsQuery {
    /// `true` in any case selects active models; any other value inactive ones
    pub fn is_active(&self) -> Option<bool> {
        self.is_active
            .as_deref()
            .map(|value| value.trim().eq_ignore_ascii_case("true"))
    }
}

/// Get a model by ID
pub async fn get_model(
    State(state): State<AppState>,
    path: std::result::Result<Path<ArtifactId>, PathRejection>,
) -> Result<Json<ArtifactResponse>> {
    let Path(id) = path?;
    let model = state.service.get_model(id).await?;
    Ok(Json(ArtifactResponse::from(model)))
}

/// Toggle activation or edit the description
pub async fn update_model(
    State(state): State<AppState>,
    path: std::result::Result<Path<ArtifactId>, PathRejection>,
    payload: std::result::Result<Json<UpdateModelRequest>, JsonRejection>,
) -> Result<Json<ArtifactResponse>> {
    let Path(id) = path?;
    let Json(request) = payload?;
    request.validate()?;

    let model = state.service.update_model(id, request.into()).await?;
    Ok(Json(ArtifactResponse::from(model)))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateModelRequest {
    pub is_active: Option<bool>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

impl From<UpdateModelRequest> for ArtifactUpdate {
    fn from(request: UpdateModelRequest) -> Self {
        ArtifactUpdate {
            is_active: request.is_active,
            description: request.description,
        }
    }
}

/// Batch prediction with one model
pub async fn predict(
    State(state): State<AppState>,
    path: std::result::Result<Path<ArtifactId>, PathRejection>,
    payload: std::result::Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>> {
    let Path(id) = path?;
    let Json(request) = payload?;
    request.validate()?;

    let batch = state.service.predict(id, &request.data).await?;

    Ok(Json(PredictResponse {
        predictions: batch.scores(),
        model_id: batch.model_id,
        timestamp: batch.timestamp,
    }))
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct PredictRequest {
    /// One row of six features per student
    #[validate(length(min = 1))]
    pub data: Vec<Vec<f64>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub predictions: Vec<f64>,
    pub model_id: ArtifactId,
    pub timestamp: DateTime<Utc>,
}

/// Introspection metadata for one model
pub async fn model_info(
    State(state): State<AppState>,
    path: std::result::Result<Path<ArtifactId>, PathRejection>,
) -> Result<Json<ModelInfo>> {
    let Path(id) = path?;
    Ok(Json(state.service.model_info(id).await?))
}

/// Load every registered model; always 200
pub async fn models_health_check(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.service.health_check().await)
}

/// Recent prediction logs
pub async fn list_prediction_logs(
    State(state): State<AppState>,
    query: std::result::Result<Query<LogsQuery>, QueryRejection>,
) -> Result<Json<Vec<PredictionLog>>> {
    let Query(params) = query?;
    Ok(Json(state.service.list_logs(params.model_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub model_id: Option<ArtifactId>,
}

pub async fn get_prediction_log(
    State(state): State<AppState>,
    path: std::result::Result<Path<Uuid>, PathRejection>,
) -> Result<Json<PredictionLog>> {
    let Path(id) = path?;
    Ok(Json(state.service.get_log(id).await?))
}

/// Score one student and attach study advice
///
/// Errors render as `{"detail": ...}`.
pub async fn score(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ScoreRequest>, JsonRejection>,
) -> std::result::Result<Json<StudentForecast>, DetailError> {
    let Json(request) = payload.map_err(AppError::from)?;
    let forecast = state.service.score(&request.into()).await?;
    Ok(Json(forecast))
}

/// One student's answers, named as the scoring form sends them
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreRequest {
    pub repeated_course: f64,
    pub attendance: f64,
    pub part_time_job: f64,
    pub motivation_level: f64,
    pub first_generation: f64,
    pub friends_performance: f64,
}

impl From<ScoreRequest> for FeatureVector {
    fn from(request: ScoreRequest) -> Self {
        FeatureVector {
            repeated_course: request.repeated_course,
            attendance_level: request.attendance,
            part_time_job: request.part_time_job,
            motivation_level: request.motivation_level,
            first_generation: request.first_generation,
            friend_academic_level: request.friends_performance,
        }
    }
}

/// Model DTO; the storage path stays internal
#[derive(Debug, Serialize, Deserialize)]
pub struct ArtifactResponse {
    pub id: ArtifactId,
    pub name: String,
    pub description: String,
    pub is_active: bool,
    pub normalization: NormalizationPolicy,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ModelArtifact> for ArtifactResponse {
    fn from(artifact: ModelArtifact) -> Self {
        Self {
            id: artifact.id,
            name: artifact.name,
            description: artifact.description,
            is_active: artifact.is_active,
            normalization: artifact.normalization,
            created_at: artifact.created_at,
            updated_at: artifact.updated_at,
        }
    }
}

/// Prometheus metrics endpoint
///
/// Returns metrics in Prometheus text exposition format
pub async fn metrics() -> (StatusCode, String) {
    let metrics = crate::metrics::gather_metrics();
    (StatusCode::OK, metrics)
}
