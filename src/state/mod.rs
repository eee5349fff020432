pub mod cache;
pub mod prediction_log;
pub mod store;

pub use cache::*;
pub use prediction_log::InMemoryPredictionLog;
pub use store::InMemoryRegistry;

use crate::error::Result;
use crate::models::{ArtifactId, ModelArtifact, PredictionLog};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Trait for model artifact registry operations
#[async_trait]
pub trait ArtifactRegistry: Send + Sync {
    /// Register a new artifact; ids are unique
    async fn register(&self, artifact: ModelArtifact) -> Result<()>;

    /// Get an artifact by id regardless of its active flag
    async fn get(&self, id: ArtifactId) -> Result<Option<ModelArtifact>>;

    /// Get an artifact only if it is active
    async fn get_active(&self, id: ArtifactId) -> Result<Option<ModelArtifact>> {
        Ok(self.get(id).await?.filter(|artifact| artifact.is_active))
    }

    /// List artifacts, newest first
    async fn list(&self, filter: &ArtifactFilter) -> Result<Vec<ModelArtifact>>;

    /// Apply a partial update and return the new state
    async fn update(&self, id: ArtifactId, update: ArtifactUpdate) -> Result<ModelArtifact>;

    /// Number of registered artifacts
    async fn count(&self) -> Result<usize>;
}

/// Filter for listing artifacts
#[derive(Debug, Clone, Default)]
pub struct ArtifactFilter {
    pub is_active: Option<bool>,
}

/// The mutable subset of an artifact
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtifactUpdate {
    #[serde(default)]
    pub is_active: Option<bool>,

    #[serde(default)]
    pub description: Option<String>,
}

impl ArtifactUpdate {
    pub fn is_empty(&self) -> bool {
        self.is_active.is_none() && self.description.is_none()
    }
}

/// Trait for prediction log storage
#[async_trait]
pub trait PredictionLogStore: Send + Sync {
    /// Append one log entry
    async fn append(&self, log: PredictionLog) -> Result<()>;

    /// Get an entry by id
    async fn get(&self, id: &Uuid) -> Result<Option<PredictionLog>>;

    /// Entries newest first, optionally for one model
    async fn list(&self, model_id: Option<ArtifactId>, limit: usize) -> Result<Vec<PredictionLog>>;
}
