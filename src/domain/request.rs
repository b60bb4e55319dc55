use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents a positive monetary amount for a payment.
///
/// Deserializes from either a JSON number or a string and rejects zero and
/// negative values.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(PaymentError::ValidationError(
                "Amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = PaymentError;

    fn try_from(value: Decimal) -> std::result::Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

/// ISO 4217 style currency code, e.g. `USD`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    pub fn new(code: impl Into<String>) -> Result<Self> {
        let code = code.into();
        if code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase()) {
            Ok(Self(code))
        } else {
            Err(PaymentError::ValidationError(format!(
                "Currency '{}' is not a three-letter ISO code",
                code
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Currency {
    type Error = PaymentError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The counterparty receiving the payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Beneficiary {
    pub name: String,
    pub account: String,
}

/// An inbound payment submission.
///
/// Immutable once received; only its digest is ever persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub amount: Amount,
    pub currency: Currency,
    pub beneficiary: Beneficiary,
}

impl PaymentRequest {
    pub fn new(amount: Decimal, currency: &str, name: &str, account: &str) -> Result<Self> {
        let request = Self {
            amount: Amount::new(amount)?,
            currency: Currency::new(currency)?,
            beneficiary: Beneficiary {
                name: name.to_string(),
                account: account.to_string(),
            },
        };
        request.validate()?;
        Ok(request)
    }

    /// Checks the fields the type system cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.beneficiary.name.trim().is_empty() {
            return Err(PaymentError::ValidationError(
                "Beneficiary name is required".to_string(),
            ));
        }
        if self.beneficiary.account.trim().is_empty() {
            return Err(PaymentError::ValidationError(
                "Beneficiary account is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Caller-supplied token identifying a logical attempt-group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Accepts any non-blank string; anything else is a missing key.
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        match raw {
            Some(key) if !key.trim().is_empty() => Ok(Self(key.to_string())),
            _ => Err(PaymentError::MissingIdempotencyKey),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
