/// Configuration for HTTP metrics collection

use serde::{Deserialize, Serialize};

/// Configuration for metrics collection and export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable metrics collection
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Enable histogram metrics
    #[serde(default = "default_enable_histograms")]
    pub enable_histograms: bool,

    /// Paths to exclude from HTTP metrics
    #[serde(default = "default_excluded_paths")]
    pub excluded_paths: Vec<String>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            enable_histograms: default_enable_histograms(),
            excluded_paths: default_excluded_paths(),
        }
    }
}

impl MetricsConfig {
    /// Create a configuration with metrics disabled
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Check if a path should be excluded from metrics
    pub fn is_path_excluded(&self, path: &str) -> bool {
        self.excluded_paths.iter().any(|excluded| {
            if excluded.ends_with('*') {
                path.starts_with(&excluded[..excluded.len() - 1])
            } else {
                path == excluded
            }
        })
    }
}

fn default_enabled() -> bool {
    true
}

fn default_enable_histograms() -> bool {
    true
}

fn default_excluded_paths() -> Vec<String> {
    vec!["/health".to_string(), "/metrics".to_string()]
}
