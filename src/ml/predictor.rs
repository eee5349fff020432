use crate::error::{AppError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use strum::Display;

/// Artifact document version understood by this build
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// A loaded model that maps a feature matrix to one raw output per row
///
/// Capability queries return `None` when the model does not have the
/// capability, instead of callers probing for attributes.
pub trait Predictor: Send + Sync + std::fmt::Debug {
    /// One raw output per row, in row order
    fn predict(&self, features: &Array2<f64>) -> Result<Vec<f64>>;

    /// Number of input columns the model was trained on
    fn n_features(&self) -> usize;

    fn kind(&self) -> ModelKind;

    /// Class labels, for classification-capable models
    fn classes(&self) -> Option<&[f64]> {
        None
    }

    fn feature_importances(&self) -> Option<&[f64]> {
        None
    }
}

/// Model family
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ModelKind {
    LinearRegression,
    LogisticRegression,
}

/// Serialized artifact document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArtifactDocument {
    LinearRegression(LinearRegressor),
    LogisticRegression(LogisticClassifier),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct VersionProbe {
    #[serde(default)]
    format_version: Option<u32>,
}

/// Parse and check an artifact document
pub fn parse_artifact(bytes: &[u8]) -> Result<Box<dyn Predictor>> {
    let probe: VersionProbe = serde_json::from_slice(bytes)
        .map_err(|e| AppError::ArtifactLoad(format!("invalid artifact document: {}", e)))?;

    match probe.format_version {
        Some(ARTIFACT_FORMAT_VERSION) => {}
        Some(other) => {
            return Err(AppError::ArtifactLoad(format!(
                "unsupported artifact format version {} (expected {})",
                other, ARTIFACT_FORMAT_VERSION
            )))
        }
        None => {
            return Err(AppError::ArtifactLoad(
                "artifact document has no format_version".to_string(),
            ))
        }
    }

    let document: ArtifactDocument = serde_json::from_slice(bytes)
        .map_err(|e| AppError::ArtifactLoad(format!("incompatible artifact: {}", e)))?;

    document.into_predictor()
}

impl ArtifactDocument {
    /// Validate internal consistency and hand back the predictor
    pub fn into_predictor(self) -> Result<Box<dyn Predictor>> {
        match self {
            ArtifactDocument::LinearRegression(model) => {
                model.check()?;
                Ok(Box::new(model))
            }
            ArtifactDocument::LogisticRegression(model) => {
                model.check()?;
                Ok(Box::new(model))
            }
        }
    }

    /// Serialize with the current format version
    pub fn to_json(&self) -> Result<String> {
        let mut value = serde_json::to_value(self)?;
        if let Some(map) = value.as_object_mut() {
            map.insert(
                "format_version".to_string(),
                serde_json::json!(ARTIFACT_FORMAT_VERSION),
            );
        }
        Ok(serde_json::to_string_pretty(&value)?)
    }
}

fn check_finite(what: &str, values: &[f64]) -> Result<()> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(AppError::ArtifactLoad(format!("{} contain non-finite values", what)))
    }
}

fn check_width(features: &Array2<f64>, expected: usize) -> Result<()> {
    if features.ncols() != expected {
        return Err(AppError::Inference(format!(
            "model expects {} features, got {}",
            expected,
            features.ncols()
        )));
    }
    Ok(())
}

fn linear_scores(features: &Array2<f64>, coefficients: ArrayView1<f64>, intercept: f64) -> Array1<f64> {
    features.dot(&coefficients) + intercept
}

/// Ordinary least squares model: `intercept + coefficients · x`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegressor {
    pub n_features: usize,
    pub coefficients: Vec<f64>,
    pub intercept: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_importances: Option<Vec<f64>>,
}

impl LinearRegressor {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Self {
        Self {
            n_features: coefficients.len(),
            coefficients,
            intercept,
            feature_importances: None,
        }
    }

    fn check(&self) -> Result<()> {
        if self.n_features == 0 {
            return Err(AppError::ArtifactLoad("n_features must be positive".to_string()));
        }
        if self.coefficients.len() != self.n_features {
            return Err(AppError::ArtifactLoad(format!(
                "expected {} coefficients, found {}",
                self.n_features,
                self.coefficients.len()
            )));
        }
        check_finite("coefficients", &self.coefficients)?;
        check_finite("intercept", &[self.intercept])?;

        if let Some(importances) = &self.feature_importances {
            if importances.len() != self.n_features {
                return Err(AppError::ArtifactLoad(format!(
                    "expected {} feature importances, found {}",
                    self.n_features,
                    importances.len()
                )));
            }
        }
        Ok(())
    }
}

impl Predictor for LinearRegressor {
    fn predict(&self, features: &Array2<f64>) -> Result<Vec<f64>> {
        check_width(features, self.n_features)?;
        let coefficients = ArrayView1::from(&self.coefficients[..]);
        Ok(linear_scores(features, coefficients, self.intercept).to_vec())
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn kind(&self) -> ModelKind {
        ModelKind::LinearRegression
    }

    fn feature_importances(&self) -> Option<&[f64]> {
        self.feature_importances.as_deref()
    }
}

/// Logistic regression over numeric class labels
///
/// Binary models carry a single coefficient row scoring the second class;
/// multi-class models carry one row per class and predict the argmax.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticClassifier {
    pub n_features: usize,
    pub classes: Vec<f64>,
    pub coefficients: Vec<Vec<f64>>,
    pub intercepts: Vec<f64>,
}

impl LogisticClassifier {
    fn is_binary(&self) -> bool {
        self.coefficients.len() == 1
    }

    fn check(&self) -> Result<()> {
        if self.n_features == 0 {
            return Err(AppError::ArtifactLoad("n_features must be positive".to_string()));
        }
        if self.classes.len() < 2 {
            return Err(AppError::ArtifactLoad(
                "classifier needs at least two classes".to_string(),
            ));
        }
        check_finite("classes", &self.classes)?;

        let rows = self.coefficients.len();
        let expected_rows = if self.classes.len() == 2 { [1, 2] } else { [self.classes.len(); 2] };
        if !expected_rows.contains(&rows) {
            return Err(AppError::ArtifactLoad(format!(
                "{} classes incompatible with {} coefficient rows",
                self.classes.len(),
                rows
            )));
        }
        if self.intercepts.len() != rows {
            return Err(AppError::ArtifactLoad(format!(
                "expected {} intercepts, found {}",
                rows,
                self.intercepts.len()
            )));
        }
        for row in &self.coefficients {
            if row.len() != self.n_features {
                return Err(AppError::ArtifactLoad(format!(
                    "expected {} coefficients per row, found {}",
                    self.n_features,
                    row.len()
                )));
            }
            check_finite("coefficients", row)?;
        }
        check_finite("intercepts", &self.intercepts)
    }
}

impl Predictor for LogisticClassifier {
    fn predict(&self, features: &Array2<f64>) -> Result<Vec<f64>> {
        check_width(features, self.n_features)?;

        if self.is_binary() {
            let coefficients = ArrayView1::from(&self.coefficients[0][..]);
            let scores = linear_scores(features, coefficients, self.intercepts[0]);
            return Ok(scores
                .iter()
                .map(|&z| {
                    let p = 1.0 / (1.0 + (-z).exp());
                    if p > 0.5 {
                        self.classes[1]
                    } else {
                        self.classes[0]
                    }
                })
                .collect());
        }

        let per_class: Vec<Array1<f64>> = self
            .coefficients
            .iter()
            .zip(&self.intercepts)
            .map(|(row, &b)| linear_scores(features, ArrayView1::from(&row[..]), b))
            .collect();

        Ok((0..features.nrows())
            .map(|i| {
                let mut best = 0;
                for k in 1..per_class.len() {
                    if per_class[k][i] > per_class[best][i] {
                        best = k;
                    }
                }
                self.classes[best]
            })
            .collect())
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn kind(&self) -> ModelKind {
        ModelKind::LogisticRegression
    }

    fn classes(&self) -> Option<&[f64]> {
        Some(&self.classes)
    }
}
