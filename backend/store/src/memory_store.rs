use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use dprscope_core::{
    Completion, DprRecord, DprResult, DprStatus, Failure, RecordQuery, RecordStore,
};

use crate::{already_finalized, newest_first, not_found};

/// Process-local record store for tests and throwaway deployments.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    records: Arc<RwLock<HashMap<Uuid, DprRecord>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Apply `f` to a record still in `processing`.
    async fn finalize<F>(&self, id: Uuid, f: F) -> DprResult<DprRecord>
    where
        F: FnOnce(&mut DprRecord),
    {
        let mut records = self.records.write().await;
        let record = records.get_mut(&id).ok_or_else(|| not_found(id))?;
        if record.status != DprStatus::Processing {
            return Err(already_finalized(id, record.status));
        }
        f(record);
        Ok(record.clone())
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn create(&self, filename: &str) -> DprResult<DprRecord> {
        let record = DprRecord::new(filename);
        self.records.write().await.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get(&self, id: Uuid) -> DprResult<Option<DprRecord>> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn complete(&self, id: Uuid, completion: &Completion) -> DprResult<DprRecord> {
        self.finalize(id, |r| r.apply_completion(completion)).await
    }

    async fn fail(&self, id: Uuid, failure: &Failure) -> DprResult<DprRecord> {
        self.finalize(id, |r| r.apply_failure(failure)).await
    }

    async fn set_feedback(&self, id: Uuid, feedback: &str) -> DprResult<DprRecord> {
        let mut records = self.records.write().await;
        let record = records.get_mut(&id).ok_or_else(|| not_found(id))?;
        record.feedback = Some(feedback.to_string());
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn list(&self, query: &RecordQuery) -> DprResult<Vec<DprRecord>> {
        let records = self.records.read().await;
        let mut out: Vec<DprRecord> = records
            .values()
            .filter(|r| query.risk_level.map_or(true, |lvl| r.risk_level == Some(lvl)))
            .filter(|r| query.status.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        out.sort_by(newest_first);
        out.truncate(query.limit);
        Ok(out)
    }
}
