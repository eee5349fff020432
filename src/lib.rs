//! CGPA prediction service.
//!
//! Serves registered regression models over HTTP, maps raw model output onto
//! a bounded score with a per-model normalization policy, and derives study
//! recommendations from the inputs and the score.

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod ml;
pub mod models;
pub mod state;

pub use error::{AppError, Result};
