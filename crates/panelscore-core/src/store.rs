//! In-memory [`ScoreStore`].

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{EvalError, EvalResult};
use crate::record::ScoreRecord;
use crate::summary::Summary;
use crate::traits::ScoreStore;

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<String, Vec<ScoreRecord>>,
    summaries: HashMap<String, Summary>,
}

/// Process-local store. Suitable for tests, the CLI and single-node use.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScoreStore for MemoryStore {
    async fn save_record(&self, record: ScoreRecord) -> EvalResult<()> {
        let mut inner = self.inner.write().await;
        let records = inner.records.entry(record.interview_id.clone()).or_default();
        if records.iter().any(|r| r.id == record.id) {
            return Err(EvalError::Storage(format!("record {} already stored", record.id)));
        }
        records.push(record);
        Ok(())
    }

    async fn records_for(&self, interview_id: &str) -> EvalResult<Vec<ScoreRecord>> {
        let inner = self.inner.read().await;
        Ok(inner.records.get(interview_id).cloned().unwrap_or_default())
    }

    async fn save_summary(
        &self,
        summary: Summary,
        expected_revision: Option<u64>,
    ) -> EvalResult<()> {
        let mut inner = self.inner.write().await;
        let current = inner.summaries.get(&summary.interview_id).map(|s| s.revision);
        if current != expected_revision {
            return Err(EvalError::ConcurrencyConflict(format!(
                "summary for {} is at revision {:?}, expected {:?}",
                summary.interview_id, current, expected_revision
            )));
        }
        inner.summaries.insert(summary.interview_id.clone(), summary);
        Ok(())
    }

    async fn find_summary(&self, interview_id: &str) -> EvalResult<Option<Summary>> {
        let inner = self.inner.read().await;
        Ok(inner.summaries.get(interview_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Dimension;
    use crate::record::RaterKind;
    use crate::summary::Aggregator;

    #[tokio::test]
    async fn records_are_grouped_by_interview() {
        let store = MemoryStore::new();
        store
            .save_record(ScoreRecord::new("iv-1", "a", RaterKind::Human))
            .await
            .unwrap();
        store
            .save_record(ScoreRecord::new("iv-2", "b", RaterKind::Human))
            .await
            .unwrap();
        assert_eq!(store.records_for("iv-1").await.unwrap().len(), 1);
        assert!(store.records_for("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_record_id_is_rejected() {
        let store = MemoryStore::new();
        let record = ScoreRecord::new("iv-1", "a", RaterKind::Human);
        store.save_record(record.clone()).await.unwrap();
        assert!(matches!(
            store.save_record(record).await,
            Err(EvalError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn stale_summary_write_conflicts() {
        let store = MemoryStore::new();
        let mut record = ScoreRecord::new("iv-1", "a", RaterKind::Human);
        record.set_score(Dimension::Logic, 70).unwrap();
        let aggregator = Aggregator::default();
        let first = aggregator
            .summarize("iv-1", std::slice::from_ref(&record), None, None)
            .unwrap();

        store.save_summary(first.clone(), None).await.unwrap();
        // A second writer that also started from "no summary" loses.
        let err = store.save_summary(first.clone(), None).await.unwrap_err();
        assert!(matches!(err, EvalError::ConcurrencyConflict(_)));

        let next = aggregator
            .summarize("iv-1", std::slice::from_ref(&record), None, Some(&first))
            .unwrap();
        store
            .save_summary(next, Some(first.revision))
            .await
            .unwrap();
        assert_eq!(
            store.find_summary("iv-1").await.unwrap().unwrap().revision,
            2
        );
    }
}
