/// Model serving for CGPA prediction
///
/// This module provides:
/// - Artifact parsing into polymorphic predictors
/// - Cached artifact loading and bounded-latency inference
/// - Per-artifact score normalization
/// - Rule-based study recommendations
/// - The orchestrating prediction service

pub mod normalizer;
pub mod predictor;
pub mod recommendations;
pub mod service;
pub mod store;
pub mod validation;

pub use normalizer::{round_to, NormalizationPolicy, ScoreNormalizer};
pub use predictor::{
    parse_artifact, ArtifactDocument, LinearRegressor, LogisticClassifier, ModelKind, Predictor,
    ARTIFACT_FORMAT_VERSION,
};
pub use recommendations::{
    Band, Recommendation, RecommendationEngine, RecommendationSource, RecommendationThresholds,
    Rule,
};
pub use service::PredictionService;
pub use store::{ArtifactVersion, LoadedModel, ModelStore};
pub use validation::{FeatureValidator, ValidationMode};
