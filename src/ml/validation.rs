use crate::error::{AppError, Result};
use crate::models::{FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How strictly feature values are checked before inference
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ValidationMode {
    /// Shape and finiteness only
    #[default]
    Lenient,

    /// Also enforce each field's declared domain
    Strict,
}

/// Declared domain of each feature, in column order
const FIELD_DOMAINS: [FieldDomain; FEATURE_COUNT] = [
    FieldDomain::Binary,
    FieldDomain::Range(0.0, 100.0),
    FieldDomain::Binary,
    FieldDomain::Range(1.0, 10.0),
    FieldDomain::Binary,
    FieldDomain::Range(1.0, 10.0),
];

#[derive(Debug, Clone, Copy)]
enum FieldDomain {
    Binary,
    Range(f64, f64),
}

impl FieldDomain {
    fn contains(&self, value: f64) -> bool {
        match *self {
            FieldDomain::Binary => value == 0.0 || value == 1.0,
            FieldDomain::Range(lo, hi) => value >= lo && value <= hi,
        }
    }

    fn describe(&self) -> String {
        match *self {
            FieldDomain::Binary => "0 or 1".to_string(),
            FieldDomain::Range(lo, hi) => format!("in [{}, {}]", lo, hi),
        }
    }
}

/// Checks request batches and turns rows into feature vectors
#[derive(Debug, Clone, Copy)]
pub struct FeatureValidator {
    mode: ValidationMode,
    max_batch_size: usize,
}

impl FeatureValidator {
    pub fn new(mode: ValidationMode, max_batch_size: usize) -> Self {
        Self {
            mode,
            max_batch_size,
        }
    }

    /// Validate a raw matrix, preserving row order
    pub fn validate_batch(&self, rows: &[Vec<f64>]) -> Result<Vec<FeatureVector>> {
        if rows.is_empty() {
            return Err(AppError::Validation("batch must not be empty".to_string()));
        }
        if rows.len() > self.max_batch_size {
            return Err(AppError::Validation(format!(
                "batch of {} rows exceeds the limit of {}",
                rows.len(),
                self.max_batch_size
            )));
        }

        rows.iter()
            .enumerate()
            .map(|(i, row)| {
                if row.len() != FEATURE_COUNT {
                    return Err(AppError::Validation(format!(
                        "row {}: expected {} features, got {}",
                        i,
                        FEATURE_COUNT,
                        row.len()
                    )));
                }
                self.check_values(row)
                    .map_err(|msg| AppError::Validation(format!("row {}: {}", i, msg)))?;
                FeatureVector::from_row(row)
            })
            .collect()
    }

    fn check_values(&self, row: &[f64]) -> std::result::Result<(), String> {
        for ((value, name), domain) in row.iter().zip(FEATURE_NAMES).zip(FIELD_DOMAINS) {
            if !value.is_finite() {
                return Err(format!("{} must be a finite number", name));
            }
            if self.mode == ValidationMode::Strict && !domain.contains(*value) {
                return Err(format!(
                    "{} must be {}, got {}",
                    name,
                    domain.describe(),
                    value
                ));
            }
        }
        Ok(())
    }
}

impl Default for FeatureValidator {
    fn default() -> Self {
        Self::new(ValidationMode::default(), 1000)
    }
}
