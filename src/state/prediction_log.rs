use crate::error::Result;
use crate::models::{ArtifactId, PredictionLog};
use crate::state::PredictionLogStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;
use uuid::Uuid;

/// Bounded in-memory prediction log; the oldest entry is evicted first
#[derive(Clone)]
pub struct InMemoryPredictionLog {
    entries: Arc<RwLock<VecDeque<PredictionLog>>>,
    max_entries: usize,
}

impl InMemoryPredictionLog {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(VecDeque::with_capacity(max_entries.min(1024)))),
            max_entries,
        }
    }
}

impl Default for InMemoryPredictionLog {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl PredictionLogStore for InMemoryPredictionLog {
    async fn append(&self, log: PredictionLog) -> Result<()> {
        if self.max_entries == 0 {
            return Ok(());
        }

        let mut entries = self.entries.write();
        while entries.len() >= self.max_entries {
            entries.pop_front();
        }
        tracing::trace!(log_id = %log.id, model_id = log.model_id, "Prediction logged");
        entries.push_back(log);
        Ok(())
    }

    async fn get(&self, id: &Uuid) -> Result<Option<PredictionLog>> {
        Ok(self.entries.read().iter().find(|log| log.id == *id).cloned())
    }

    async fn list(&self, model_id: Option<ArtifactId>, limit: usize) -> Result<Vec<PredictionLog>> {
        Ok(self
            .entries
            .read()
            .iter()
            .rev()
            .filter(|log| model_id.map_or(true, |id| log.model_id == id))
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(model_id: ArtifactId, output: f64) -> PredictionLog {
        PredictionLog::new(
            model_id,
            format!("model-{}", model_id),
            vec![vec![0.0, 80.0, 0.0, 5.0, 0.0, 5.0]],
            vec![output],
        )
    }

    #[tokio::test]
    async fn test_append_and_get() {
        let store = InMemoryPredictionLog::new(10);
        let entry = log(1, 2.5);
        let id = entry.id;
        store.append(entry).await.unwrap();

        let retrieved = store.get(&id).await.unwrap().unwrap();
        assert_eq!(retrieved.output_data, vec![2.5]);
        assert!(store.get(&Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ring_buffer_evicts_oldest() {
        let store = InMemoryPredictionLog::new(3);
        for i in 0..5 {
            store.append(log(1, i as f64)).await.unwrap();
        }

        assert_eq!(store.list(None, usize::MAX).await.unwrap().len(), 3);
        let outputs: Vec<f64> = store
            .list(None, 10)
            .await
            .unwrap()
            .iter()
            .map(|l| l.output_data[0])
            .collect();
        assert_eq!(outputs, vec![4.0, 3.0, 2.0]);
    }

    #[tokio::test]
    async fn test_list_filters_by_model() {
        let store = InMemoryPredictionLog::new(10);
        store.append(log(1, 1.0)).await.unwrap();
        store.append(log(2, 2.0)).await.unwrap();
        store.append(log(1, 3.0)).await.unwrap();

        let logs = store.list(Some(1), 10).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert!(logs.iter().all(|l| l.model_id == 1));

        assert_eq!(store.list(None, 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_zero_capacity_discards() {
        let store = InMemoryPredictionLog::new(0);
        store.append(log(1, 1.0)).await.unwrap();
        assert!(store.list(None, usize::MAX).await.unwrap().is_empty());
    }
}
