use super::fingerprint::PayloadDigest;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order status as reported by the downstream provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Processing,
    Completed,
}

/// Money leaves the process as plain JSON numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteSummary {
    pub id: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub amount: Decimal,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub fee: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeneficiaryRef {
    pub id: String,
}

/// The normalized success response.
///
/// Computed once per idempotency key and returned verbatim on every replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOutcome {
    pub id: String,
    pub status: OrderStatus,
    pub quote: QuoteSummary,
    pub beneficiary: BeneficiaryRef,
    pub created_at: DateTime<Utc>,
}

/// What the ledger keeps for a completed key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRecord {
    pub payload_digest: PayloadDigest,
    pub outcome: PaymentOutcome,
    /// Ledger bookkeeping only; never part of the outcome.
    pub recorded_at: DateTime<Utc>,
}

impl LedgerRecord {
    pub fn new(payload_digest: PayloadDigest, outcome: PaymentOutcome) -> Self {
        Self {
            payload_digest,
            outcome,
            recorded_at: Utc::now(),
        }
    }
}

/// Result of an atomic insert-if-absent on the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutOutcome {
    /// This caller's record is now the one on file.
    Inserted(LedgerRecord),
    /// Another caller got there first; its record must be used instead.
    Existing(LedgerRecord),
}

impl PutOutcome {
    pub fn into_record(self) -> LedgerRecord {
        match self {
            Self::Inserted(record) | Self::Existing(record) => record,
        }
    }

    pub fn was_inserted(&self) -> bool {
        matches!(self, Self::Inserted(_))
    }
}
