use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use super::{GameResult, PersistenceError, RewardDelta};

/// Receives each finished session exactly once. Retries are the sink's concern.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn persist_result(
        &self,
        result: &GameResult,
        rewards: &[RewardDelta; 2],
    ) -> Result<(), PersistenceError>;
}

#[derive(Debug, Clone)]
pub struct PersistedResult {
    pub result: GameResult,
    pub rewards: [RewardDelta; 2],
}

/// Keeps results in memory for inspection
pub struct InMemoryResultSink {
    records: Arc<RwLock<Vec<PersistedResult>>>,
}

impl InMemoryResultSink {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn records(&self) -> Vec<PersistedResult> {
        self.records.read().await.clone()
    }
}

impl Default for InMemoryResultSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResultSink for InMemoryResultSink {
    async fn persist_result(
        &self,
        result: &GameResult,
        rewards: &[RewardDelta; 2],
    ) -> Result<(), PersistenceError> {
        let mut records = self.records.write().await;
        if records
            .iter()
            .any(|record| record.result.session_id == result.session_id)
        {
            return Err(PersistenceError::Duplicate(result.session_id.clone()));
        }

        records.push(PersistedResult {
            result: result.clone(),
            rewards: rewards.clone(),
        });
        info!(session_id = %result.session_id, "Recorded game result");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewards::test_support::result_with;

    #[tokio::test]
    async fn records_each_session_once() {
        let sink = InMemoryResultSink::new();
        let result = result_with(100, 50, None);
        let rewards = [RewardDelta::new("one"), RewardDelta::new("two")];

        sink.persist_result(&result, &rewards).await.unwrap();
        let second = sink.persist_result(&result, &rewards).await;

        assert!(matches!(second, Err(PersistenceError::Duplicate(_))));
        assert_eq!(sink.records().await.len(), 1);
    }
}
