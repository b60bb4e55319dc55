use crate::domain::outcome::PaymentOutcome;
use crate::error::{ErrorBody, Result};
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Outcome(PaymentOutcome),
    Error(ErrorBody),
}

/// What a caller receives for one submission: status code plus body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    pub idempotency_key: Option<String>,
    pub status: u16,
    pub body: ResponseBody,
}

impl SubmissionResponse {
    pub fn from_result(idempotency_key: Option<String>, result: &Result<PaymentOutcome>) -> Self {
        match result {
            Ok(outcome) => Self {
                idempotency_key,
                status: 200,
                body: ResponseBody::Outcome(outcome.clone()),
            },
            Err(err) => Self {
                idempotency_key,
                status: err.kind().status_code(),
                body: ResponseBody::Error(ErrorBody::from(err)),
            },
        }
    }
}

/// Writes one JSON document per line.
pub struct ResponseWriter<W: Write> {
    writer: W,
}

impl<W: Write> ResponseWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write_response(&mut self, response: &SubmissionResponse) -> Result<()> {
        serde_json::to_writer(&mut self.writer, response)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    pub fn write_responses<'a>(
        &mut self,
        responses: impl IntoIterator<Item = &'a SubmissionResponse>,
    ) -> Result<()> {
        for response in responses {
            self.write_response(response)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
