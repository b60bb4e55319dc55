use crate::domain::ports::{GatewayError, WorkflowStep};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Caller-facing classification of a failed submission.
///
/// Each kind maps to one status code and one stable machine-readable name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MissingKey,
    InvalidRequest,
    Conflict,
    Transient,
    /// Commit kept failing transiently until the retry budget ran out.
    TransientExhausted,
    Permanent,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingKey => "missing_key",
            Self::InvalidRequest => "invalid_request",
            Self::Conflict => "conflict",
            Self::Transient => "transient",
            Self::TransientExhausted => "transient_exhausted",
            Self::Permanent => "permanent",
            Self::Internal => "internal",
        }
    }

    /// HTTP-style status code surfaced at the boundary.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingKey | Self::InvalidRequest => 400,
            Self::Conflict => 409,
            Self::Permanent => 422,
            Self::Transient | Self::TransientExhausted => 503,
            Self::Internal => 500,
        }
    }
}

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Missing Idempotency-Key")]
    MissingIdempotencyKey,
    #[error("Invalid request: {0}")]
    ValidationError(String),
    #[error("Idempotency key '{key}' reused with different payload")]
    IdempotencyConflict { key: String },
    #[error("{step} failed: {source}")]
    Gateway {
        step: WorkflowStep,
        #[source]
        source: GatewayError,
    },
    #[error("{step} still unavailable after {attempts} attempts: {source}")]
    TransientExhausted {
        step: WorkflowStep,
        attempts: u32,
        #[source]
        source: GatewayError,
    },
    #[error("Orchestration did not finish within {0:?}")]
    DeadlineExceeded(Duration),
    #[error("Ledger error: {0}")]
    LedgerError(String),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl PaymentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingIdempotencyKey => ErrorKind::MissingKey,
            Self::ValidationError(_) => ErrorKind::InvalidRequest,
            Self::IdempotencyConflict { .. } => ErrorKind::Conflict,
            Self::Gateway { source, .. } if source.is_transient() => ErrorKind::Transient,
            Self::Gateway { .. } => ErrorKind::Permanent,
            Self::TransientExhausted { .. } => ErrorKind::TransientExhausted,
            Self::DeadlineExceeded(_) => ErrorKind::Transient,
            Self::LedgerError(_)
            | Self::SerializationError(_)
            | Self::CsvError(_)
            | Self::IoError(_) => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, PaymentError>;

/// Error payload returned to callers. Internal details never leave the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: ErrorKind,
    pub message: String,
}

impl From<&PaymentError> for ErrorBody {
    fn from(err: &PaymentError) -> Self {
        let kind = err.kind();
        let message = match kind {
            ErrorKind::Internal => "Something went wrong".to_string(),
            _ => err.to_string(),
        };
        Self {
            error: kind,
            message,
        }
    }
}
