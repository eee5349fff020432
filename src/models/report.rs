use crate::ml::predictor::ModelKind;
use crate::models::ArtifactId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Load status of a single artifact
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ArtifactStatus {
    Healthy,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactHealth {
    pub id: ArtifactId,
    pub name: String,
    pub is_active: bool,
    pub status: ArtifactStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate load status across the registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub total_models: usize,
    pub healthy_models: usize,
    pub models: Vec<ArtifactHealth>,
}

impl HealthReport {
    pub fn from_entries(models: Vec<ArtifactHealth>) -> Self {
        let healthy_models = models
            .iter()
            .filter(|m| m.status == ArtifactStatus::Healthy)
            .count();

        Self {
            total_models: models.len(),
            healthy_models,
            models,
        }
    }

    pub fn all_healthy(&self) -> bool {
        self.healthy_models == self.total_models
    }
}

/// Introspection data for a loaded artifact
///
/// Capabilities a model does not have are omitted rather than reported empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: ArtifactId,
    pub name: String,
    pub description: String,
    pub model_type: ModelKind,
    pub created_at: DateTime<Utc>,
    pub file_size: u64,
    pub sha256: String,
    pub n_features: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<f64>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_feature_importances: Option<bool>,
}
