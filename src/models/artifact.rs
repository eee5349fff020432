use crate::ml::normalizer::NormalizationPolicy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Registry identifier of a model artifact
pub type ArtifactId = u64;

/// A registered, serialized predictor
///
/// Only `is_active` and `description` change after registration; every such
/// change bumps `updated_at`, which is part of the cache version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelArtifact {
    /// Unique identifier
    pub id: ArtifactId,

    /// Display name
    pub name: String,

    /// Free-form description
    #[serde(default)]
    pub description: String,

    /// Storage location of the serialized model
    pub path: PathBuf,

    /// Inactive artifacts are never selected for prediction
    pub is_active: bool,

    /// How raw model output is mapped onto the score domain
    pub normalization: NormalizationPolicy,

    /// Registration timestamp
    pub created_at: DateTime<Utc>,

    /// Last mutation timestamp
    pub updated_at: DateTime<Utc>,
}

impl ModelArtifact {
    /// Register a new, active artifact
    pub fn new(
        id: ArtifactId,
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        normalization: NormalizationPolicy,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            description: String::new(),
            path: path.into(),
            is_active: true,
            normalization,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    /// Toggle the active flag
    pub fn set_active(&mut self, is_active: bool) {
        self.is_active = is_active;
        self.touch();
    }

    /// Replace the description
    pub fn set_description(&mut self, description: String) {
        self.description = description;
        self.touch();
    }

    fn touch(&mut self) {
        // Strictly increasing so two updates within one clock tick still
        // produce distinct versions.
        let now = Utc::now();
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + chrono::Duration::microseconds(1)
        };
    }
}

impl std::fmt::Display for ModelArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (#{})", self.name, self.id)
    }
}
