use crate::error::{AppError, Result};
use crate::models::{ArtifactId, ModelArtifact};
use crate::state::{ArtifactFilter, ArtifactRegistry, ArtifactUpdate};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

/// In-memory artifact registry
#[derive(Clone)]
pub struct InMemoryRegistry {
    artifacts: Arc<DashMap<ArtifactId, ModelArtifact>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self {
            artifacts: Arc::new(DashMap::new()),
        }
    }

    /// Build a registry from configured artifacts
    pub async fn seeded(artifacts: impl IntoIterator<Item = ModelArtifact>) -> Result<Self> {
        let registry = Self::new();
        for artifact in artifacts {
            registry.register(artifact).await?;
        }
        Ok(registry)
    }
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArtifactRegistry for InMemoryRegistry {
    async fn register(&self, artifact: ModelArtifact) -> Result<()> {
        match self.artifacts.entry(artifact.id) {
            Entry::Occupied(_) => Err(AppError::Configuration(format!(
                "duplicate model id {}",
                artifact.id
            ))),
            Entry::Vacant(slot) => {
                tracing::debug!(model_id = artifact.id, name = %artifact.name, "Artifact registered");
                slot.insert(artifact);
                Ok(())
            }
        }
    }

    async fn get(&self, id: ArtifactId) -> Result<Option<ModelArtifact>> {
        Ok(self.artifacts.get(&id).map(|entry| entry.clone()))
    }

    async fn list(&self, filter: &ArtifactFilter) -> Result<Vec<ModelArtifact>> {
        let mut artifacts: Vec<ModelArtifact> = self
            .artifacts
            .iter()
            .map(|entry| entry.value().clone())
            .filter(|artifact| filter.is_active.map_or(true, |active| artifact.is_active == active))
            .collect();

        // Newest first; id breaks ties between artifacts registered in the same tick
        artifacts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(artifacts)
    }

    async fn update(&self, id: ArtifactId, update: ArtifactUpdate) -> Result<ModelArtifact> {
        let mut entry = self
            .artifacts
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Model {} not found", id)))?;

        if let Some(is_active) = update.is_active {
            entry.set_active(is_active);
        }
        if let Some(description) = update.description {
            entry.set_description(description);
        }

        tracing::debug!(model_id = id, is_active = entry.is_active, "Artifact updated");
        Ok(entry.clone())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.artifacts.len())
    }
}
