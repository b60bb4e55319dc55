use crate::domain::outcome::{LedgerRecord, PutOutcome};
use crate::domain::ports::IdempotencyLedger;
use crate::domain::request::IdempotencyKey;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory idempotency ledger.
///
/// Uses `Arc<RwLock<HashMap<IdempotencyKey, LedgerRecord>>>`. The insert-if-absent
/// check and the insert happen under one write guard, which is what makes
/// `put_if_absent` atomic across tasks and threads.
#[derive(Default, Clone)]
pub struct InMemoryLedger {
    records: Arc<RwLock<HashMap<IdempotencyKey, LedgerRecord>>>,
}

impl InMemoryLedger {
    /// Creates a new, empty in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl IdempotencyLedger for InMemoryLedger {
    async fn get(&self, key: &IdempotencyKey) -> Result<Option<LedgerRecord>> {
        let records = self.records.read().await;
        Ok(records.get(key).cloned())
    }

    async fn put_if_absent(
        &self,
        key: &IdempotencyKey,
        record: LedgerRecord,
    ) -> Result<PutOutcome> {
        let mut records = self.records.write().await;
        match records.entry(key.clone()) {
            Entry::Occupied(existing) => Ok(PutOutcome::Existing(existing.get().clone())),
            Entry::Vacant(slot) => Ok(PutOutcome::Inserted(slot.insert(record).clone())),
        }
    }

    async fn evict(&self, key: &IdempotencyKey) -> Result<Option<LedgerRecord>> {
        let mut records = self.records.write().await;
        Ok(records.remove(key))
    }

    async fn evict_recorded_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, record| record.recorded_at >= cutoff);
        Ok(before - records.len())
    }
}
