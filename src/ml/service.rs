use crate::config::{Config, ScoringConfig};
use crate::error::{AppError, Result};
use crate::metrics::{PREDICTIONS_TOTAL, RECOMMENDATIONS_TOTAL};
use crate::ml::normalizer::{round_to, ScoreNormalizer};
use crate::ml::recommendations::{flatten, RecommendationEngine};
use crate::ml::store::ModelStore;
use crate::ml::validation::FeatureValidator;
use crate::models::{
    feature_matrix, ArtifactHealth, ArtifactId, ArtifactStatus, BatchPrediction, FeatureVector,
    HealthReport, ModelArtifact, ModelInfo, PredictionLog, PredictionResult, StudentForecast,
};
use crate::state::{
    ArtifactFilter, ArtifactRegistry, ArtifactUpdate, InMemoryPredictionLog, InMemoryRegistry,
    PredictionLogStore,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Prediction service: registry lookup, inference, normalization and advice
pub struct PredictionService {
    /// Registered artifacts
    registry: Arc<dyn ArtifactRegistry>,

    /// Artifact loading and inference
    store: ModelStore,

    /// Study advice
    engine: RecommendationEngine,

    /// Input checks
    validator: FeatureValidator,

    /// Request log, absent when disabled
    logs: Option<Arc<dyn PredictionLogStore>>,

    /// Maximum entries returned by one log listing
    log_list_limit: usize,

    /// Single-student surface settings
    scoring: ScoringConfig,
}

impl PredictionService {
    /// Create a service without a prediction log or scoring model
    pub fn new(
        registry: Arc<dyn ArtifactRegistry>,
        store: ModelStore,
        engine: RecommendationEngine,
        validator: FeatureValidator,
    ) -> Self {
        Self {
            registry,
            store,
            engine,
            validator,
            logs: None,
            log_list_limit: 100,
            scoring: ScoringConfig::default(),
        }
    }

    pub fn with_prediction_log(mut self, logs: Arc<dyn PredictionLogStore>, list_limit: usize) -> Self {
        self.logs = Some(logs);
        self.log_list_limit = list_limit;
        self
    }

    pub fn with_scoring(mut self, scoring: ScoringConfig) -> Self {
        self.scoring = scoring;
        self
    }

    /// Build the full service from validated configuration
    pub async fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let registry = InMemoryRegistry::seeded(config.artifacts()).await?;
        let models = registry.count().await?;
        let store = ModelStore::new(&config.inference);
        let engine = RecommendationEngine::new(config.recommendations);
        let validator =
            FeatureValidator::new(config.validation.mode, config.validation.max_batch_size);

        let mut service = Self::new(Arc::new(registry), store, engine, validator)
            .with_scoring(config.scoring.clone());

        if config.prediction_log.enabled {
            let logs = InMemoryPredictionLog::new(config.prediction_log.max_entries);
            service = service.with_prediction_log(Arc::new(logs), config.prediction_log.list_limit);
        }

        info!(
            models,
            validation = %config.validation.mode,
            caching = service.store.is_caching(),
            "Prediction service initialized"
        );

        Ok(service)
    }

    /// Predict a batch with an active artifact, preserving row order
    pub async fn predict(&self, id: ArtifactId, rows: &[Vec<f64>]) -> Result<BatchPrediction> {
        let result = self.run_batch(id, rows).await;

        let status = if result.is_ok() { "success" } else { "error" };
        PREDICTIONS_TOTAL
            .with_label_values(&[&id.to_string(), status])
            .inc();

        result
    }

    async fn run_batch(&self, id: ArtifactId, rows: &[Vec<f64>]) -> Result<BatchPrediction> {
        let start = Instant::now();

        // Activation is re-read on every request, cached predictor or not
        let artifact = self.active_artifact(id).await?;
        let vectors = self.validator.validate_batch(rows)?;
        let normalizer = ScoreNormalizer::new(artifact.normalization)?;

        let model = self.store.get_or_load(&artifact).await?;
        let raw = self.store.predict(&model, feature_matrix(&vectors)).await?;

        let scores = normalizer.normalize_all(&raw);
        let results: Vec<PredictionResult> = raw
            .into_iter()
            .zip(scores)
            .map(|(raw_output, score)| PredictionResult {
                raw_output,
                score,
                model_id: id,
            })
            .collect();

        let batch = BatchPrediction {
            model_id: id,
            results,
            timestamp: Utc::now(),
        };

        self.record(&artifact, rows, batch.scores()).await;

        debug!(
            model_id = id,
            rows = rows.len(),
            policy = artifact.normalization.name(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Batch predicted"
        );

        Ok(batch)
    }

    /// Score one student with the configured scoring artifact and attach advice
    pub async fn score(&self, features: &FeatureVector) -> Result<StudentForecast> {
        let id = self.scoring.model_id.ok_or_else(|| {
            AppError::Configuration("no scoring model configured".to_string())
        })?;

        let batch = self.predict(id, &[features.to_row().to_vec()]).await?;
        let score = batch
            .results
            .first()
            .map(|r| r.score)
            .ok_or_else(|| AppError::Inference("model returned no prediction".to_string()))?;
        let predicted_cgpa = round_to(score, self.scoring.round_to);

        let recommendations = self.engine.evaluate(features, predicted_cgpa);
        for rec in &recommendations {
            RECOMMENDATIONS_TOTAL
                .with_label_values(&[&rec.source.to_string()])
                .inc();
        }

        Ok(StudentForecast {
            predicted_cgpa,
            recommendations: flatten(&recommendations),
        })
    }

    /// Try to load every registered artifact; failures are reported, not raised
    pub async fn health_check(&self) -> HealthReport {
        let artifacts = match self.registry.list(&ArtifactFilter::default()).await {
            Ok(artifacts) => artifacts,
            Err(e) => {
                warn!("Failed to list artifacts for health check: {}", e);
                Vec::new()
            }
        };

        let mut entries = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            // Uncached so the check reflects storage as it is now
            let (status, error) = match self.store.load(&artifact).await {
                Ok(_) => (ArtifactStatus::Healthy, None),
                Err(e) => (ArtifactStatus::Error, Some(e.to_string())),
            };
            entries.push(ArtifactHealth {
                id: artifact.id,
                name: artifact.name,
                is_active: artifact.is_active,
                status,
                error,
            });
        }

        let report = HealthReport::from_entries(entries);
        info!(
            total = report.total_models,
            healthy = report.healthy_models,
            "Model health check completed"
        );
        report
    }

    /// Introspect an artifact, active or not
    pub async fn model_info(&self, id: ArtifactId) -> Result<ModelInfo> {
        let artifact = self.get_model(id).await?;
        let model = self.store.get_or_load(&artifact).await?;
        let predictor = &model.predictor;

        Ok(ModelInfo {
            id: artifact.id,
            name: artifact.name,
            description: artifact.description,
            model_type: predictor.kind(),
            created_at: artifact.created_at,
            file_size: model.file_size,
            sha256: model.sha256.clone(),
            n_features: predictor.n_features(),
            classes: predictor.classes().map(<[f64]>::to_vec),
            has_feature_importances: predictor.feature_importances().map(|_| true),
        })
    }

    pub async fn list_models(&self, is_active: Option<bool>) -> Result<Vec<ModelArtifact>> {
        self.registry.list(&ArtifactFilter { is_active }).await
    }

    pub async fn get_model(&self, id: ArtifactId) -> Result<ModelArtifact> {
        self.registry
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Model {} not found", id)))
    }

    /// Change the activation flag or description and drop the cached predictor
    pub async fn update_model(&self, id: ArtifactId, update: ArtifactUpdate) -> Result<ModelArtifact> {
        if update.is_empty() {
            return Err(AppError::Validation(
                "update must set is_active or description".to_string(),
            ));
        }

        let artifact = self.registry.update(id, update).await?;
        self.store.invalidate(id).await;

        info!(model_id = id, is_active = artifact.is_active, "Model updated");
        Ok(artifact)
    }

    /// Logged predictions, newest first
    pub async fn list_logs(&self, model_id: Option<ArtifactId>) -> Result<Vec<PredictionLog>> {
        match &self.logs {
            Some(logs) => logs.list(model_id, self.log_list_limit).await,
            None => Ok(Vec::new()),
        }
    }

    pub async fn get_log(&self, id: Uuid) -> Result<PredictionLog> {
        let found = match &self.logs {
            Some(logs) => logs.get(&id).await?,
            None => None,
        };
        found.ok_or_else(|| AppError::NotFound(format!("Prediction log {} not found", id)))
    }

    async fn active_artifact(&self, id: ArtifactId) -> Result<ModelArtifact> {
        self.registry
            .get_active(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Model {} not found or inactive", id)))
    }

    async fn record(&self, artifact: &ModelArtifact, rows: &[Vec<f64>], scores: Vec<f64>) {
        let Some(logs) = &self.logs else {
            return;
        };

        let entry = PredictionLog::new(artifact.id, artifact.name.clone(), rows.to_vec(), scores);
        if let Err(e) = logs.append(entry).await {
            warn!(model_id = artifact.id, "Failed to record prediction: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InferenceConfig;
    use crate::ml::normalizer::NormalizationPolicy;
    use crate::ml::predictor::{ArtifactDocument, LinearRegressor, LogisticClassifier};
    use crate::ml::validation::ValidationMode;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Linear model whose output is `weight * attendance + intercept`
    fn write_attendance_model(dir: &TempDir, name: &str, weight: f64, intercept: f64) -> PathBuf {
        let path = dir.path().join(name);
        let document = ArtifactDocument::LinearRegression(LinearRegressor::new(
            vec![0.0, weight, 0.0, 0.0, 0.0, 0.0],
            intercept,
        ));
        std::fs::write(&path, document.to_json().unwrap()).unwrap();
        path
    }

    async fn service(artifacts: Vec<ModelArtifact>, scoring_model: Option<ArtifactId>) -> PredictionService {
        let registry = InMemoryRegistry::seeded(artifacts).await.unwrap();
        PredictionService::new(
            Arc::new(registry),
            ModelStore::new(&InferenceConfig::default()),
            RecommendationEngine::default(),
            FeatureValidator::default(),
        )
        .with_prediction_log(Arc::new(InMemoryPredictionLog::new(100)), 100)
        .with_scoring(ScoringConfig {
            model_id: scoring_model,
            round_to: 2,
        })
    }

    fn row(attendance: f64) -> Vec<f64> {
        vec![0.0, attendance, 0.0, 5.0, 0.0, 5.0]
    }

    #[tokio::test]
    async fn test_rescaled_batch_preserves_order() {
        let dir = TempDir::new().unwrap();
        let path = write_attendance_model(&dir, "m.json", 0.2, 0.0);
        let artifact = ModelArtifact::new(1, "rescaled", path, NormalizationPolicy::rescale_default());
        let service = service(vec![artifact], None).await;

        // raw = 0.2 * attendance: 12 -> 2.4, 20 -> 4.0, 4 -> 0.8, 200 -> clamp
        let batch = service
            .predict(1, &[row(60.0), row(100.0), row(20.0), row(1000.0)])
            .await
            .unwrap();

        assert_eq!(batch.model_id, 1);
        let raw: Vec<f64> = batch.results.iter().map(|r| r.raw_output).collect();
        assert_eq!(raw, vec![12.0, 20.0, 4.0, 200.0]);
        let scores = batch.scores();
        assert!((scores[0] - 2.4).abs() < 1e-12);
        assert_eq!(scores[1], 4.0);
        assert!((scores[2] - 0.8).abs() < 1e-12);
        assert_eq!(scores[3], 4.0);
    }

    #[tokio::test]
    async fn test_inactive_artifact_is_not_found_without_loading() {
        let dir = TempDir::new().unwrap();
        // Path does not exist: any load attempt would surface as ArtifactLoad
        let artifact = ModelArtifact::new(
            7,
            "retired",
            dir.path().join("absent.json"),
            NormalizationPolicy::clamp_default(),
        )
        .with_active(false);
        let service = service(vec![artifact], None).await;

        let err = service.predict(7, &[row(80.0)]).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = service.predict(99, &[row(80.0)]).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(service.list_logs(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deactivation_honored_with_warm_cache() {
        let dir = TempDir::new().unwrap();
        let path = write_attendance_model(&dir, "m.json", 0.01, 0.0);
        let artifact = ModelArtifact::new(1, "m", path, NormalizationPolicy::clamp_default());
        let service = service(vec![artifact], None).await;

        service.predict(1, &[row(80.0)]).await.unwrap();
        service
            .update_model(
                1,
                ArtifactUpdate {
                    is_active: Some(false),
                    description: None,
                },
            )
            .await
            .unwrap();

        let err = service.predict(1, &[row(80.0)]).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        // Still visible to introspection
        assert_eq!(service.model_info(1).await.unwrap().n_features, 6);
    }

    #[tokio::test]
    async fn test_health_check_reports_failures_inline() {
        let dir = TempDir::new().unwrap();
        let good_a = write_attendance_model(&dir, "a.json", 0.01, 0.0);
        let good_b = write_attendance_model(&dir, "b.json", 0.02, 0.0);
        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, b"{ not an artifact").unwrap();

        let service = service(
            vec![
                ModelArtifact::new(1, "a", good_a, NormalizationPolicy::clamp_default()),
                ModelArtifact::new(2, "b", good_b, NormalizationPolicy::clamp_default()),
                ModelArtifact::new(3, "broken", broken, NormalizationPolicy::clamp_default()),
            ],
            None,
        )
        .await;

        let report = service.health_check().await;
        assert_eq!(report.total_models, 3);
        assert_eq!(report.healthy_models, 2);

        let failed = report.models.iter().find(|m| m.id == 3).unwrap();
        assert_eq!(failed.status, ArtifactStatus::Error);
        assert!(failed.error.as_deref().unwrap().starts_with("Error loading model"));
        assert!(report
            .models
            .iter()
            .filter(|m| m.id != 3)
            .all(|m| m.status == ArtifactStatus::Healthy && m.error.is_none()));
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let dir = TempDir::new().unwrap();
        let path = write_attendance_model(&dir, "m.json", 0.01, 0.0);
        let artifact = ModelArtifact::new(1, "m", path, NormalizationPolicy::clamp_default());
        let service = service(vec![artifact], None).await;

        assert!(matches!(
            service.predict(1, &[]).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.predict(1, &[vec![1.0, 2.0]]).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_strict_mode_rejects_out_of_domain() {
        let dir = TempDir::new().unwrap();
        let path = write_attendance_model(&dir, "m.json", 0.01, 0.0);
        let registry = InMemoryRegistry::seeded(vec![ModelArtifact::new(
            1,
            "m",
            path,
            NormalizationPolicy::clamp_default(),
        )])
        .await
        .unwrap();
        let service = PredictionService::new(
            Arc::new(registry),
            ModelStore::new(&InferenceConfig::default()),
            RecommendationEngine::default(),
            FeatureValidator::new(ValidationMode::Strict, 10),
        );

        let err = service.predict(1, &[row(140.0)]).await.unwrap_err();
        assert!(err.to_string().contains("attendance_level"));
    }

    #[tokio::test]
    async fn test_score_rounds_and_recommends() {
        let dir = TempDir::new().unwrap();
        // 0.05 * 60 + 0.0 = 3.0, in the improve band
        let path = write_attendance_model(&dir, "m.json", 0.05, 0.0);
        let artifact = ModelArtifact::new(1, "m", path, NormalizationPolicy::clamp_default());
        let service = service(vec![artifact], Some(1)).await;

        let features = FeatureVector::from_row(&[1.0, 60.0, 0.0, 6.0, 0.0, 5.0]).unwrap();
        let forecast = service.score(&features).await.unwrap();

        assert_eq!(forecast.predicted_cgpa, 3.0);
        assert_eq!(forecast.recommendations.len(), 6);
        assert_eq!(
            forecast.recommendations[4],
            "You're passing, but there’s room to improve further."
        );
    }

    #[tokio::test]
    async fn test_score_applies_rounding() {
        let dir = TempDir::new().unwrap();
        let path = write_attendance_model(&dir, "m.json", 0.0, 2.71828);
        let artifact = ModelArtifact::new(1, "m", path, NormalizationPolicy::clamp_default());
        let service = service(vec![artifact], Some(1)).await;

        let features = FeatureVector::from_row(&row(80.0)).unwrap();
        let forecast = service.score(&features).await.unwrap();
        assert_eq!(forecast.predicted_cgpa, 2.72);
    }

    #[tokio::test]
    async fn test_score_without_scoring_model() {
        let service = service(Vec::new(), None).await;
        let features = FeatureVector::from_row(&row(80.0)).unwrap();
        assert!(matches!(
            service.score(&features).await,
            Err(AppError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_model_info_for_classifier() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clf.json");
        let document = ArtifactDocument::LogisticRegression(LogisticClassifier {
            n_features: 6,
            classes: vec![0.0, 1.0],
            coefficients: vec![vec![0.1; 6]],
            intercepts: vec![0.0],
        });
        std::fs::write(&path, document.to_json().unwrap()).unwrap();

        let artifact = ModelArtifact::new(4, "clf", path, NormalizationPolicy::clamp_default())
            .with_description("pass/fail");
        let service = service(vec![artifact], None).await;

        let info = service.model_info(4).await.unwrap();
        assert_eq!(info.classes, Some(vec![0.0, 1.0]));
        assert_eq!(info.has_feature_importances, None);
        assert_eq!(info.description, "pass/fail");
        assert_eq!(info.sha256.len(), 64);

        assert!(matches!(
            service.model_info(5).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_predictions_are_logged() {
        let dir = TempDir::new().unwrap();
        let path = write_attendance_model(&dir, "m.json", 0.01, 0.0);
        let artifact = ModelArtifact::new(1, "m", path, NormalizationPolicy::clamp_default());
        let service = service(vec![artifact], None).await;

        let batch = service.predict(1, &[row(80.0), row(50.0)]).await.unwrap();

        let logs = service.list_logs(Some(1)).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].model_name, "m");
        assert_eq!(logs[0].input_data, vec![row(80.0), row(50.0)]);
        assert_eq!(logs[0].output_data, batch.scores());

        let fetched = service.get_log(logs[0].id).await.unwrap();
        assert_eq!(fetched.id, logs[0].id);
        assert!(service.get_log(Uuid::new_v4()).await.is_err());
        assert!(service.list_logs(Some(2)).await.unwrap().is_empty());
    }
}
