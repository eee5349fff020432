use crate::error::{AppError, Result};
use crate::metrics::MetricsConfig;
use crate::ml::normalizer::NormalizationPolicy;
use crate::ml::recommendations::RecommendationThresholds;
use crate::ml::validation::ValidationMode;
use crate::models::{ArtifactId, ModelArtifact};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Artifact loading and inference
    #[serde(default)]
    pub inference: InferenceConfig,

    /// Input validation policy
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Single-student scoring surface
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Recommendation rule thresholds
    #[serde(default)]
    pub recommendations: RecommendationThresholds,

    /// Cross-origin policy
    #[serde(default)]
    pub cors: CorsConfig,

    /// In-memory prediction log
    #[serde(default)]
    pub prediction_log: PredictionLogConfig,

    /// HTTP metrics collection
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Registered model artifacts
    #[serde(default)]
    pub models: Vec<ModelEntry>,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> std::result::Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/local.toml".to_string());

        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(&config_path).required(false))
            // Override with environment variables (prefix: CGPA_)
            .add_source(
                config::Environment::with_prefix("CGPA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Reject configurations the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.inference.load_timeout_ms == 0 || self.inference.inference_timeout_ms == 0 {
            return Err(AppError::Configuration(
                "inference timeouts must be positive".to_string(),
            ));
        }
        if self.validation.max_batch_size == 0 {
            return Err(AppError::Configuration(
                "validation.max_batch_size must be positive".to_string(),
            ));
        }
        if self.scoring.round_to > 10 {
            return Err(AppError::Configuration(format!(
                "scoring.round_to must be at most 10, got {}",
                self.scoring.round_to
            )));
        }

        if self.cors.allow_credentials && self.cors.allowed_origins.iter().any(|o| o == "*") {
            return Err(AppError::Configuration(
                "cors: a wildcard origin cannot be combined with allow_credentials".to_string(),
            ));
        }

        let mut ids = HashSet::new();
        for entry in &self.models {
            if !ids.insert(entry.id) {
                return Err(AppError::Configuration(format!(
                    "duplicate model id {}",
                    entry.id
                )));
            }
            entry.normalization.validate().map_err(|e| match e {
                AppError::Configuration(msg) => {
                    AppError::Configuration(format!("model {}: {}", entry.id, msg))
                }
                other => other,
            })?;
        }

        if let Some(id) = self.scoring.model_id {
            if !ids.contains(&id) {
                return Err(AppError::Configuration(format!(
                    "scoring.model_id {} is not a configured model",
                    id
                )));
            }
        }

        Ok(())
    }

    /// Registry seed built from `[[models]]`
    pub fn artifacts(&self) -> Vec<ModelArtifact> {
        self.models.iter().map(ModelEntry::to_artifact).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Service name
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub prometheus_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            service_name: default_service_name(),
            prometheus_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Upper bound on reading and parsing one artifact
    #[serde(default = "default_load_timeout")]
    pub load_timeout_ms: u64,

    /// Upper bound on one batch inference
    #[serde(default = "default_inference_timeout")]
    pub inference_timeout_ms: u64,

    /// Predictor cache
    #[serde(default)]
    pub cache: CacheConfig,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            load_timeout_ms: default_load_timeout(),
            inference_timeout_ms: default_inference_timeout(),
            cache: CacheConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_cache_capacity")]
    pub max_capacity: u64,

    /// 0 disables time-based expiry
    #[serde(default)]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_capacity: default_cache_capacity(),
            ttl_secs: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default)]
    pub mode: ValidationMode,

    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            mode: ValidationMode::default(),
            max_batch_size: default_max_batch_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Artifact behind `POST /predict`
    #[serde(default)]
    pub model_id: Option<ArtifactId>,

    /// Decimal places of `predicted_cgpa`
    #[serde(default = "default_round_to")]
    pub round_to: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            model_id: None,
            round_to: default_round_to(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    #[serde(default = "default_true")]
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
            allow_credentials: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionLogConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Oldest entries are evicted beyond this
    #[serde(default = "default_log_max_entries")]
    pub max_entries: usize,

    /// Maximum entries returned by one listing
    #[serde(default = "default_log_list_limit")]
    pub list_limit: usize,
}

impl Default for PredictionLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: default_log_max_entries(),
            list_limit: default_log_list_limit(),
        }
    }
}

/// One `[[models]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelEntry {
    pub id: ArtifactId,
    pub name: String,

    #[serde(default)]
    pub description: String,

    pub path: PathBuf,

    #[serde(default = "default_true")]
    pub is_active: bool,

    pub normalization: NormalizationPolicy,
}

impl ModelEntry {
    pub fn to_artifact(&self) -> ModelArtifact {
        ModelArtifact::new(self.id, &self.name, &self.path, self.normalization)
            .with_description(&self.description)
            .with_active(self.is_active)
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8000
}

fn default_request_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "cgpa_forecast=info,tower_http=info".to_string()
}

fn default_service_name() -> String {
    "cgpa-forecast".to_string()
}

fn default_true() -> bool {
    true
}

fn default_load_timeout() -> u64 {
    10_000
}

fn default_inference_timeout() -> u64 {
    5_000
}

fn default_cache_capacity() -> u64 {
    64
}

fn default_max_batch_size() -> usize {
    1000
}

fn default_round_to() -> u32 {
    2
}

fn default_allowed_origins() -> Vec<String> {
    [
        "https://margadarshak.tech",
        "https://www.margadarshak.tech",
        "https://preview--journey-forecast-tool.lovable.app",
        "https://journey-forecast-tool.lovable.app",
        "http://localhost:3000",
        "http://localhost:8000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8000",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_log_max_entries() -> usize {
    10_000
}

fn default_log_list_limit() -> usize {
    100
}
