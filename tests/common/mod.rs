#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use idempay::application::orchestrator::{OrchestratorConfig, PaymentOrchestrator};
use idempay::application::retry::RetryPolicy;
use idempay::domain::outcome::{LedgerRecord, PutOutcome};
use idempay::domain::ports::IdempotencyLedger;
use idempay::domain::request::{IdempotencyKey, PaymentRequest};
use idempay::error::Result;
use idempay::infrastructure::in_memory::InMemoryLedger;
use idempay::infrastructure::simulated_gateway::{SimulatedGateway, SimulatedGatewayConfig};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub fn alice(amount: Decimal) -> PaymentRequest {
    PaymentRequest::new(amount, "USD", "Alice", "123").expect("valid request")
}

pub fn key(raw: &str) -> IdempotencyKey {
    IdempotencyKey::parse(Some(raw)).expect("non-empty key")
}

pub fn fast_config() -> OrchestratorConfig {
    OrchestratorConfig {
        retry: RetryPolicy::new(3, Duration::from_millis(1)),
        deadline: None,
    }
}

/// Wraps the in-memory ledger and counts every call made through the port.
#[derive(Default)]
pub struct CountingLedger {
    pub inner: InMemoryLedger,
    pub gets: AtomicUsize,
    pub puts: AtomicUsize,
}

impl CountingLedger {
    pub fn interactions(&self) -> usize {
        self.gets.load(Ordering::SeqCst) + self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdempotencyLedger for CountingLedger {
    async fn get(&self, key: &IdempotencyKey) -> Result<Option<LedgerRecord>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn put_if_absent(&self, key: &IdempotencyKey, record: LedgerRecord) -> Result<PutOutcome> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put_if_absent(key, record).await
    }

    async fn evict(&self, key: &IdempotencyKey) -> Result<Option<LedgerRecord>> {
        self.inner.evict(key).await
    }

    async fn evict_recorded_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        self.inner.evict_recorded_before(cutoff).await
    }
}

/// A ledger whose reads never see anything, as when a peer's write has not
/// replicated yet. Only `put_if_absent` can reveal an existing record.
#[derive(Default)]
pub struct BlindReadLedger {
    pub inner: InMemoryLedger,
}

#[async_trait]
impl IdempotencyLedger for BlindReadLedger {
    async fn get(&self, _key: &IdempotencyKey) -> Result<Option<LedgerRecord>> {
        Ok(None)
    }

    async fn put_if_absent(&self, key: &IdempotencyKey, record: LedgerRecord) -> Result<PutOutcome> {
        self.inner.put_if_absent(key, record).await
    }

    async fn evict(&self, key: &IdempotencyKey) -> Result<Option<LedgerRecord>> {
        self.inner.evict(key).await
    }

    async fn evict_recorded_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        self.inner.evict_recorded_before(cutoff).await
    }
}

pub struct Harness {
    pub orchestrator: Arc<PaymentOrchestrator>,
    pub ledger: Arc<CountingLedger>,
    pub gateway: Arc<SimulatedGateway>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_gateway(SimulatedGatewayConfig::default())
    }

    pub fn with_gateway(gateway_config: SimulatedGatewayConfig) -> Self {
        let ledger = Arc::new(CountingLedger::default());
        let gateway = Arc::new(SimulatedGateway::new(gateway_config));
        let orchestrator = Arc::new(PaymentOrchestrator::new(
            ledger.clone(),
            gateway.clone(),
            fast_config(),
        ));
        Self {
            orchestrator,
            ledger,
            gateway,
        }
    }

    pub async fn stored(&self, raw_key: &str) -> Option<LedgerRecord> {
        self.ledger.inner.get(&key(raw_key)).await.expect("in-memory get")
    }
}
