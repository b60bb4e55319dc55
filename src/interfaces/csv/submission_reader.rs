use crate::domain::request::PaymentRequest;
use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

/// One row of a batch submission file.
///
/// An empty `idempotency_key` column deserializes to `None` and is rejected by
/// the orchestrator as a missing key.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct SubmissionRecord {
    pub idempotency_key: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub beneficiary_name: String,
    pub beneficiary_account: String,
}

impl SubmissionRecord {
    pub fn to_request(&self) -> Result<PaymentRequest> {
        PaymentRequest::new(
            self.amount,
            &self.currency,
            &self.beneficiary_name,
            &self.beneficiary_account,
        )
    }
}

/// Reads payment submissions from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over `Result<SubmissionRecord>`.
/// It handles whitespace trimming and flexible record lengths automatically.
pub struct SubmissionReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> SubmissionReader<R> {
    /// Creates a new `SubmissionReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes submissions.
    pub fn submissions(self) -> impl Iterator<Item = Result<SubmissionRecord>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(PaymentError::from))
    }
}
