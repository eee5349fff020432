use crate::models::ArtifactId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome for one feature vector
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PredictionResult {
    /// Unbounded model output
    pub raw_output: f64,

    /// Normalized, bounded score
    pub score: f64,

    /// Artifact that produced the prediction
    pub model_id: ArtifactId,
}

/// Outcome for a batch, in input order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchPrediction {
    pub model_id: ArtifactId,
    pub results: Vec<PredictionResult>,
    pub timestamp: DateTime<Utc>,
}

impl BatchPrediction {
    /// Normalized scores in input order
    pub fn scores(&self) -> Vec<f64> {
        self.results.iter().map(|r| r.score).collect()
    }
}

/// Predicted score for one student plus study advice
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudentForecast {
    pub predicted_cgpa: f64,
    pub recommendations: Vec<String>,
}

/// Record of one served prediction request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionLog {
    pub id: Uuid,
    pub model_id: ArtifactId,
    pub model_name: String,

    /// Feature matrix as received
    pub input_data: Vec<Vec<f64>>,

    /// Scores returned to the caller
    pub output_data: Vec<f64>,

    pub created_at: DateTime<Utc>,
}

impl PredictionLog {
    pub fn new(
        model_id: ArtifactId,
        model_name: String,
        input_data: Vec<Vec<f64>>,
        output_data: Vec<f64>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            model_id,
            model_name,
            input_data,
            output_data,
            created_at: Utc::now(),
        }
    }
}
