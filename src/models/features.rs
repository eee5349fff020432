use crate::error::{AppError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Number of model inputs
pub const FEATURE_COUNT: usize = 6;

/// Column order the models were trained on. Permuting it silently produces
/// wrong predictions.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "repeated_course",
    "attendance_level",
    "part_time_job",
    "motivation_level",
    "first_generation",
    "friend_academic_level",
];

/// One student's model inputs
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FeatureVector {
    /// 0/1
    pub repeated_course: f64,

    /// Attendance on a 0-100 scale
    pub attendance_level: f64,

    /// 0/1
    pub part_time_job: f64,

    /// 1-10
    pub motivation_level: f64,

    /// 0/1
    pub first_generation: f64,

    /// 1-10
    pub friend_academic_level: f64,
}

impl FeatureVector {
    /// Build from a row in model column order
    pub fn from_row(row: &[f64]) -> Result<Self> {
        match *row {
            [repeated_course, attendance_level, part_time_job, motivation_level, first_generation, friend_academic_level] => {
                Ok(Self {
                    repeated_course,
                    attendance_level,
                    part_time_job,
                    motivation_level,
                    first_generation,
                    friend_academic_level,
                })
            }
            _ => Err(AppError::Validation(format!(
                "expected {} features, got {}",
                FEATURE_COUNT,
                row.len()
            ))),
        }
    }

    /// Values in model column order
    pub fn to_row(&self) -> [f64; FEATURE_COUNT] {
        [
            self.repeated_course,
            self.attendance_level,
            self.part_time_job,
            self.motivation_level,
            self.first_generation,
            self.friend_academic_level,
        ]
    }

    pub fn has_repeated_course(&self) -> bool {
        self.repeated_course == 1.0
    }

    pub fn has_part_time_job(&self) -> bool {
        self.part_time_job == 1.0
    }
}

/// Stack a batch into an `n x FEATURE_COUNT` matrix, preserving row order
pub fn feature_matrix(batch: &[FeatureVector]) -> Array2<f64> {
    let mut matrix = Array2::zeros((batch.len(), FEATURE_COUNT));
    for (i, vector) in batch.iter().enumerate() {
        for (j, value) in vector.to_row().into_iter().enumerate() {
            matrix[[i, j]] = value;
        }
    }
    matrix
}
