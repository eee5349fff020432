use crate::config::InferenceConfig;
use crate::error::{AppError, Result};
use crate::metrics::{INFERENCE_DURATION_SECONDS, MODEL_CACHE_LOOKUPS_TOTAL, MODEL_LOADS_TOTAL};
use crate::ml::predictor::{parse_artifact, Predictor};
use crate::models::{ArtifactId, ModelArtifact};
use crate::state::AppCache;
use chrono::{DateTime, Utc};
use ndarray::Array2;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, info, warn};

/// Identity of the bytes a cached predictor was built from
///
/// Registry mutations change `updated_at`. Replacing the file by rename
/// changes the inode on unix. Rewriting it in place changes the length or
/// the modification time, except for a same-length rewrite landing in the
/// same filesystem timestamp tick; deploy artifacts by rename, or PATCH the
/// model to force a reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactVersion {
    pub updated_at: DateTime<Utc>,
    pub len: u64,
    pub modified: Option<SystemTime>,
    pub inode: Option<u64>,
}

impl ArtifactVersion {
    fn from_metadata(updated_at: DateTime<Utc>, metadata: &std::fs::Metadata) -> Self {
        Self {
            updated_at,
            len: metadata.len(),
            modified: metadata.modified().ok(),
            inode: inode(metadata),
        }
    }
}

#[cfg(unix)]
fn inode(metadata: &std::fs::Metadata) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    Some(metadata.ino())
}

#[cfg(not(unix))]
fn inode(_metadata: &std::fs::Metadata) -> Option<u64> {
    None
}

/// A predictor in memory together with facts about its source file
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub artifact_id: ArtifactId,
    pub predictor: Arc<dyn Predictor>,
    /// Hex SHA-256 of the artifact bytes
    pub sha256: String,
    pub file_size: u64,
    pub version: ArtifactVersion,
}

/// Loads artifacts from storage and runs inference off the async runtime
#[derive(Clone)]
pub struct ModelStore {
    cache: Option<AppCache<ArtifactId, Arc<LoadedModel>>>,
    load_timeout: Duration,
    inference_timeout: Duration,
}

impl ModelStore {
    pub fn new(config: &InferenceConfig) -> Self {
        let cache = config.cache.enabled.then(|| {
            let ttl = (config.cache.ttl_secs > 0).then(|| Duration::from_secs(config.cache.ttl_secs));
            AppCache::new(config.cache.max_capacity, ttl)
        });

        Self {
            cache,
            load_timeout: Duration::from_millis(config.load_timeout_ms),
            inference_timeout: Duration::from_millis(config.inference_timeout_ms),
        }
    }

    pub fn is_caching(&self) -> bool {
        self.cache.is_some()
    }

    /// Read and parse an artifact, bypassing the cache
    pub async fn load(&self, artifact: &ModelArtifact) -> Result<LoadedModel> {
        let id = artifact.id;
        let path = artifact.path.clone();
        let updated_at = artifact.updated_at;
        let start = Instant::now();

        let task = tokio::task::spawn_blocking(move || read_artifact(id, &path, updated_at));
        let result = match tokio::time::timeout(self.load_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(AppError::ArtifactLoad(format!("load task failed: {}", e))),
            Err(_) => Err(AppError::ArtifactLoad(format!(
                "load timed out after {} ms",
                self.load_timeout.as_millis()
            ))),
        };

        match &result {
            Ok(model) => {
                MODEL_LOADS_TOTAL.with_label_values(&["success"]).inc();
                info!(
                    model_id = id,
                    file_size = model.file_size,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Artifact loaded"
                );
            }
            Err(e) => {
                MODEL_LOADS_TOTAL.with_label_values(&["error"]).inc();
                warn!(model_id = id, path = %artifact.path.display(), "Artifact load failed: {}", e);
            }
        }

        result
    }

    /// Cached predictor for the artifact, reloading when its version moved
    pub async fn get_or_load(&self, artifact: &ModelArtifact) -> Result<Arc<LoadedModel>> {
        let Some(cache) = &self.cache else {
            return Ok(Arc::new(self.load(artifact).await?));
        };

        let metadata = match tokio::fs::metadata(&artifact.path).await {
            Ok(metadata) => metadata,
            Err(e) => {
                cache.invalidate(&artifact.id).await;
                return Err(AppError::ArtifactLoad(format!(
                    "{}: {}",
                    artifact.path.display(),
                    e
                )));
            }
        };
        let current = ArtifactVersion::from_metadata(artifact.updated_at, &metadata);

        match cache.get(&artifact.id).await {
            Some(cached) if cached.version == current => {
                MODEL_CACHE_LOOKUPS_TOTAL.with_label_values(&["hit"]).inc();
                return Ok(cached);
            }
            Some(_) => {
                MODEL_CACHE_LOOKUPS_TOTAL.with_label_values(&["stale"]).inc();
                debug!(model_id = artifact.id, "Cached predictor is stale, reloading");
            }
            None => {
                MODEL_CACHE_LOOKUPS_TOTAL.with_label_values(&["miss"]).inc();
            }
        }

        let loaded = Arc::new(self.load(artifact).await?);
        cache.insert(artifact.id, loaded.clone()).await;
        Ok(loaded)
    }

    /// Drop any cached predictor for the artifact
    pub async fn invalidate(&self, id: ArtifactId) {
        if let Some(cache) = &self.cache {
            cache.invalidate(&id).await;
            debug!(model_id = id, "Predictor cache entry invalidated");
        }
    }

    /// Run inference on the blocking pool
    pub async fn predict(&self, model: &LoadedModel, features: Array2<f64>) -> Result<Vec<f64>> {
        let rows = features.nrows();
        let predictor = model.predictor.clone();
        let start = Instant::now();

        let task = tokio::task::spawn_blocking(move || predictor.predict(&features));
        let outputs = match tokio::time::timeout(self.inference_timeout, task).await {
            Ok(Ok(result)) => result?,
            Ok(Err(e)) => return Err(AppError::Inference(format!("inference task failed: {}", e))),
            Err(_) => {
                return Err(AppError::Inference(format!(
                    "inference timed out after {} ms",
                    self.inference_timeout.as_millis()
                )))
            }
        };

        INFERENCE_DURATION_SECONDS
            .with_label_values(&[&model.artifact_id.to_string()])
            .observe(start.elapsed().as_secs_f64());

        if outputs.len() != rows {
            return Err(AppError::Inference(format!(
                "model returned {} outputs for {} rows",
                outputs.len(),
                rows
            )));
        }
        if let Some(row) = outputs.iter().position(|v| !v.is_finite()) {
            return Err(AppError::Inference(format!(
                "model produced a non-finite output for row {}",
                row
            )));
        }

        Ok(outputs)
    }
}

fn read_artifact(id: ArtifactId, path: &Path, updated_at: DateTime<Utc>) -> Result<LoadedModel> {
    let io_err = |e: std::io::Error| AppError::ArtifactLoad(format!("{}: {}", path.display(), e));

    let metadata = std::fs::metadata(path).map_err(io_err)?;
    let bytes = std::fs::read(path).map_err(io_err)?;
    let predictor = parse_artifact(&bytes)?;

    Ok(LoadedModel {
        artifact_id: id,
        predictor: Arc::from(predictor),
        sha256: format!("{:x}", Sha256::digest(&bytes)),
        file_size: bytes.len() as u64,
        version: ArtifactVersion::from_metadata(updated_at, &metadata),
    })
}
