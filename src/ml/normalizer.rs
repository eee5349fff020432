use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};

/// How raw model output is mapped onto the bounded score domain
///
/// Chosen per artifact. A model trained on a raw `[0, 20]` target needs
/// `Rescale`; a model trained to emit the score directly needs `Clamp`.
/// Applying the wrong one is off by roughly a factor of five.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum NormalizationPolicy {
    /// `bound_max * (raw - min_pred) / (max_pred - min_pred)`, then clamp
    Rescale {
        min_pred: f64,
        max_pred: f64,
        #[serde(default = "default_bound_max")]
        bound_max: f64,
    },

    /// Clamp raw output into `[0, bound_max]`
    Clamp {
        #[serde(default = "default_bound_max")]
        bound_max: f64,
    },
}

impl NormalizationPolicy {
    /// Rescale from the `[0, 20]` raw range into `[0, 4]`
    pub fn rescale_default() -> Self {
        NormalizationPolicy::Rescale {
            min_pred: 0.0,
            max_pred: 20.0,
            bound_max: default_bound_max(),
        }
    }

    /// Clamp into `[0, 4]`
    pub fn clamp_default() -> Self {
        NormalizationPolicy::Clamp {
            bound_max: default_bound_max(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            NormalizationPolicy::Rescale { .. } => "rescale",
            NormalizationPolicy::Clamp { .. } => "clamp",
        }
    }

    pub fn bound_max(&self) -> f64 {
        match *self {
            NormalizationPolicy::Rescale { bound_max, .. } => bound_max,
            NormalizationPolicy::Clamp { bound_max } => bound_max,
        }
    }

    /// Check the policy's numeric constraints
    pub fn validate(&self) -> Result<()> {
        let bound_max = self.bound_max();
        if !bound_max.is_finite() || bound_max <= 0.0 {
            return Err(AppError::Configuration(format!(
                "bound_max must be a positive finite number, got {}",
                bound_max
            )));
        }

        if let NormalizationPolicy::Rescale { min_pred, max_pred, .. } = *self {
            if !min_pred.is_finite() || !max_pred.is_finite() {
                return Err(AppError::Configuration(format!(
                    "min_pred and max_pred must be finite, got [{}, {}]",
                    min_pred, max_pred
                )));
            }
            if min_pred >= max_pred {
                return Err(AppError::Configuration(format!(
                    "min_pred ({}) must be strictly less than max_pred ({})",
                    min_pred, max_pred
                )));
            }
            if !(max_pred - min_pred).is_finite() {
                return Err(AppError::Configuration(format!(
                    "prediction range [{}, {}] is too wide to rescale",
                    min_pred, max_pred
                )));
            }
        }

        Ok(())
    }
}

fn default_bound_max() -> f64 {
    4.0
}

/// Maps raw model output into `[0, bound_max]`
#[derive(Debug, Clone, Copy)]
pub struct ScoreNormalizer {
    policy: NormalizationPolicy,
}

impl ScoreNormalizer {
    pub fn new(policy: NormalizationPolicy) -> Result<Self> {
        policy.validate()?;
        Ok(Self { policy })
    }

    pub fn policy(&self) -> &NormalizationPolicy {
        &self.policy
    }

    /// Monotonically non-decreasing in `raw`; the result always lies in
    /// `[0, bound_max]`. NaN maps to 0.
    pub fn normalize(&self, raw: f64) -> f64 {
        if raw.is_nan() {
            return 0.0;
        }

        let scaled = match self.policy {
            NormalizationPolicy::Rescale {
                min_pred,
                max_pred,
                bound_max,
            } => bound_max * (raw - min_pred) / (max_pred - min_pred),
            NormalizationPolicy::Clamp { .. } => raw,
        };
        if scaled.is_nan() {
            return 0.0;
        }

        scaled.clamp(0.0, self.policy.bound_max())
    }

    pub fn normalize_all(&self, raw: &[f64]) -> Vec<f64> {
        raw.iter().map(|&r| self.normalize(r)).collect()
    }
}

/// Round half away from zero to `decimals` places
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
