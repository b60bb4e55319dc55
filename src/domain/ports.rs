use super::outcome::{LedgerRecord, OrderStatus, PutOutcome};
use super::request::{Beneficiary, Currency, IdempotencyKey};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Storage for completed orchestrations, keyed by idempotency key.
///
/// Implementations must make `put_if_absent` atomic per key: under concurrent
/// calls exactly one caller observes `Inserted`.
#[async_trait]
pub trait IdempotencyLedger: Send + Sync {
    async fn get(&self, key: &IdempotencyKey) -> Result<Option<LedgerRecord>>;
    async fn put_if_absent(&self, key: &IdempotencyKey, record: LedgerRecord)
    -> Result<PutOutcome>;

    /// Eviction hook. Nothing in the orchestrator calls it; records are kept
    /// until an operator decides otherwise.
    async fn evict(&self, key: &IdempotencyKey) -> Result<Option<LedgerRecord>>;
    /// Removes every record written before `cutoff` and returns how many went.
    async fn evict_recorded_before(&self, cutoff: DateTime<Utc>) -> Result<usize>;
}

pub type LedgerHandle = Arc<dyn IdempotencyLedger>;

/// Classification the provider attaches to a failed call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("transient provider failure: {0}")]
    Transient(String),
    #[error("provider rejected request: {0}")]
    Permanent(String),
}

impl GatewayError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// The four downstream calls, in workflow order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkflowStep {
    Authenticate,
    RegisterBeneficiary,
    CreateQuote,
    CreateOrder,
}

impl WorkflowStep {
    pub const ALL: [WorkflowStep; 4] = [
        Self::Authenticate,
        Self::RegisterBeneficiary,
        Self::CreateQuote,
        Self::CreateOrder,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authenticate => "authenticate",
            Self::RegisterBeneficiary => "register_beneficiary",
            Self::CreateQuote => "create_quote",
            Self::CreateOrder => "create_order",
        }
    }
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub access_token: String,
    pub expires_in: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeneficiaryRegistration {
    pub beneficiary_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteParams {
    pub amount: Decimal,
    pub currency: Currency,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub quote_id: String,
    pub total_amount: Decimal,
    pub fee: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderParams {
    pub quote_id: String,
    pub beneficiary_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub order_id: String,
    pub status: OrderStatus,
}

/// Contract of the downstream payment provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn authenticate(&self) -> GatewayResult<AccessToken>;
    async fn register_beneficiary(
        &self,
        token: &AccessToken,
        beneficiary: &Beneficiary,
    ) -> GatewayResult<BeneficiaryRegistration>;
    async fn create_quote(&self, token: &AccessToken, params: &QuoteParams)
    -> GatewayResult<Quote>;
    async fn create_order(&self, token: &AccessToken, params: &OrderParams)
    -> GatewayResult<Order>;
}

pub type GatewayHandle = Arc<dyn PaymentGateway>;
