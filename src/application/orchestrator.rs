use super::key_lock::KeyLocks;
use super::retry::RetryPolicy;
use crate::domain::fingerprint::{self, PayloadDigest};
use crate::domain::outcome::{
    BeneficiaryRef, LedgerRecord, PaymentOutcome, PutOutcome, QuoteSummary,
};
use crate::domain::ports::{
    BeneficiaryRegistration, GatewayError, GatewayHandle, LedgerHandle, Order, OrderParams, Quote,
    QuoteParams, WorkflowStep,
};
use crate::domain::request::{IdempotencyKey, PaymentRequest};
use crate::error::{ErrorKind, PaymentError, Result};
use chrono::Utc;
use std::time::Duration;

/// Runtime settings for [`PaymentOrchestrator`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Retry applied to the commit step.
    pub retry: RetryPolicy,
    /// Upper bound for one orchestration. `None` waits as long as it takes.
    pub deadline: Option<Duration>,
}

/// Runs the payment workflow at most once per idempotency key.
///
/// The orchestrator owns the control flow: fingerprint, ledger check, the four
/// provider steps, and the final ledger write. Collaborators are injected by
/// the composition root and shared through `Arc` handles.
pub struct PaymentOrchestrator {
    ledger: LedgerHandle,
    gateway: GatewayHandle,
    config: OrchestratorConfig,
    in_flight: KeyLocks,
}

impl PaymentOrchestrator {
    /// Creates a new `PaymentOrchestrator` instance.
    ///
    /// # Arguments
    ///
    /// * `ledger` - Where completed outcomes are recorded per key.
    /// * `gateway` - The downstream payment provider.
    /// * `config` - Retry policy and optional deadline.
    pub fn new(ledger: LedgerHandle, gateway: GatewayHandle, config: OrchestratorConfig) -> Self {
        Self {
            ledger,
            gateway,
            config,
            in_flight: KeyLocks::new(),
        }
    }

    /// Processes one submission.
    ///
    /// A replay of a completed key returns the stored outcome without touching
    /// the provider. Failed attempts are never recorded, so a later retry with
    /// the same key runs the whole workflow again.
    #[tracing::instrument(skip_all, fields(key = idempotency_key.unwrap_or("")))]
    pub async fn process_payment(
        &self,
        idempotency_key: Option<&str>,
        request: &PaymentRequest,
    ) -> Result<PaymentOutcome> {
        let result = self.process(idempotency_key, request).await;
        if let Err(err) = &result {
            match err.kind() {
                ErrorKind::Internal => tracing::error!(error = %err, "orchestration failed"),
                ErrorKind::Transient | ErrorKind::TransientExhausted | ErrorKind::Permanent => {
                    tracing::warn!(error = %err, kind = err.kind().as_str(), "payment not completed")
                }
                _ => tracing::debug!(error = %err, "submission rejected"),
            }
        }
        result
    }

    async fn process(
        &self,
        idempotency_key: Option<&str>,
        request: &PaymentRequest,
    ) -> Result<PaymentOutcome> {
        let key = IdempotencyKey::parse(idempotency_key)?;
        request.validate()?;
        let payload_digest = fingerprint::digest(request)?;

        let orchestration = self.orchestrate(&key, &payload_digest, request);
        match self.config.deadline {
            Some(deadline) => tokio::time::timeout(deadline, orchestration)
                .await
                .map_err(|_| PaymentError::DeadlineExceeded(deadline))?,
            None => orchestration.await,
        }
    }

    async fn orchestrate(
        &self,
        key: &IdempotencyKey,
        payload_digest: &PayloadDigest,
        request: &PaymentRequest,
    ) -> Result<PaymentOutcome> {
        // Cheap path: replays and conflicts never wait behind an in-flight run.
        if let Some(outcome) = self.check_ledger(key, payload_digest).await? {
            return Ok(outcome);
        }

        let _flight = self.in_flight.acquire(key).await;
        if let Some(outcome) = self.check_ledger(key, payload_digest).await? {
            return Ok(outcome);
        }

        let outcome = self.run_workflow(request).await?;
        let record = LedgerRecord::new(payload_digest.clone(), outcome);

        match self.ledger.put_if_absent(key, record).await? {
            PutOutcome::Inserted(record) => {
                tracing::info!(order_id = %record.outcome.id, "payment committed");
                Ok(record.outcome)
            }
            PutOutcome::Existing(record) if record.payload_digest == *payload_digest => {
                tracing::warn!(
                    order_id = %record.outcome.id,
                    "concurrent orchestration recorded first, discarding own outcome"
                );
                Ok(record.outcome)
            }
            PutOutcome::Existing(_) => Err(PaymentError::IdempotencyConflict {
                key: key.to_string(),
            }),
        }
    }

    async fn check_ledger(
        &self,
        key: &IdempotencyKey,
        payload_digest: &PayloadDigest,
    ) -> Result<Option<PaymentOutcome>> {
        match self.ledger.get(key).await? {
            None => Ok(None),
            Some(record) if record.payload_digest == *payload_digest => {
                tracing::info!(order_id = %record.outcome.id, "replaying stored outcome");
                Ok(Some(record.outcome))
            }
            Some(_) => Err(PaymentError::IdempotencyConflict {
                key: key.to_string(),
            }),
        }
    }

    async fn run_workflow(&self, request: &PaymentRequest) -> Result<PaymentOutcome> {
        let token = self
            .gateway
            .authenticate()
            .await
            .map_err(step_failed(WorkflowStep::Authenticate))?;

        let beneficiary = self
            .gateway
            .register_beneficiary(&token, &request.beneficiary)
            .await
            .map_err(step_failed(WorkflowStep::RegisterBeneficiary))?;

        let quote_params = QuoteParams {
            amount: request.amount.value(),
            currency: request.currency.clone(),
        };
        let quote = self
            .gateway
            .create_quote(&token, &quote_params)
            .await
            .map_err(step_failed(WorkflowStep::CreateQuote))?;

        let order_params = OrderParams {
            quote_id: quote.quote_id.clone(),
            beneficiary_id: beneficiary.beneficiary_id.clone(),
        };
        let order = self
            .config
            .retry
            .run(WorkflowStep::CreateOrder, || {
                self.gateway.create_order(&token, &order_params)
            })
            .await?;

        Ok(normalize(order, quote, beneficiary))
    }
}

fn step_failed(step: WorkflowStep) -> impl FnOnce(GatewayError) -> PaymentError {
    move |source| PaymentError::Gateway { step, source }
}

fn normalize(order: Order, quote: Quote, beneficiary: BeneficiaryRegistration) -> PaymentOutcome {
    PaymentOutcome {
        id: order.order_id,
        status: order.status,
        quote: QuoteSummary {
            id: quote.quote_id,
            amount: quote.total_amount.normalize(),
            fee: quote.fee.normalize(),
        },
        beneficiary: BeneficiaryRef {
            id: beneficiary.beneficiary_id,
        },
        created_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::IdempotencyLedger;
    use crate::infrastructure::in_memory::InMemoryLedger;
    use crate::infrastructure::simulated_gateway::{SimulatedGateway, SimulatedGatewayConfig};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn setup() -> (PaymentOrchestrator, Arc<InMemoryLedger>, Arc<SimulatedGateway>) {
        let ledger = Arc::new(InMemoryLedger::new());
        let gateway = Arc::new(SimulatedGateway::default());
        let config = OrchestratorConfig {
            retry: RetryPolicy::new(3, Duration::from_millis(1)),
            deadline: None,
        };
        let orchestrator = PaymentOrchestrator::new(ledger.clone(), gateway.clone(), config);
        (orchestrator, ledger, gateway)
    }

    fn alice(amount: rust_decimal::Decimal) -> PaymentRequest {
        PaymentRequest::new(amount, "USD", "Alice", "123").unwrap()
    }

    #[tokio::test]
    async fn test_first_submission_runs_full_workflow() {
        let (orchestrator, ledger, gateway) = setup();

        let outcome = orchestrator
            .process_payment(Some("k1"), &alice(dec!(100)))
            .await
            .unwrap();

        assert!(outcome.id.starts_with("ord_"));
        assert_eq!(outcome.quote.amount, dec!(100));
        assert_eq!(outcome.quote.fee, dec!(1));
        assert_eq!(outcome.quote.fee.scale(), 0);
        for step in WorkflowStep::ALL {
            assert_eq!(gateway.calls(step), 1, "{step} should run once");
        }

        let key = IdempotencyKey::parse(Some("k1")).unwrap();
        let stored = ledger.get(&key).await.unwrap().unwrap();
        assert_eq!(stored.outcome, outcome);
    }

    #[tokio::test]
    async fn test_replay_skips_provider() {
        let (orchestrator, _ledger, gateway) = setup();
        let request = alice(dec!(100));

        let first = orchestrator.process_payment(Some("k1"), &request).await.unwrap();
        let calls_after_first = gateway.total_calls();
        let second = orchestrator.process_payment(Some("k1"), &request).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(gateway.total_calls(), calls_after_first);
    }

    #[tokio::test]
    async fn test_conflict_rejected_before_provider_calls() {
        let (orchestrator, _ledger, gateway) = setup();
        orchestrator
            .process_payment(Some("k1"), &alice(dec!(100)))
            .await
            .unwrap();
        let calls_after_first = gateway.total_calls();

        let err = orchestrator
            .process_payment(Some("k1"), &alice(dec!(200)))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(gateway.total_calls(), calls_after_first);
    }

    #[tokio::test]
    async fn test_transient_auth_failure_is_not_retried() {
        let (orchestrator, ledger, gateway) = setup();
        gateway.inject(
            WorkflowStep::Authenticate,
            GatewayError::Transient("Gateway Timeout".into()),
        );

        let err = orchestrator
            .process_payment(Some("k1"), &alice(dec!(100)))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PaymentError::Gateway {
                step: WorkflowStep::Authenticate,
                ..
            }
        ));
        assert_eq!(err.kind(), ErrorKind::Transient);
        assert_eq!(gateway.calls(WorkflowStep::Authenticate), 1);
        assert_eq!(gateway.calls(WorkflowStep::RegisterBeneficiary), 0);
        assert!(ledger.is_empty().await);
    }

    #[tokio::test]
    async fn test_permanent_quote_failure_stops_before_commit() {
        let (orchestrator, ledger, gateway) = setup();
        gateway.inject(
            WorkflowStep::CreateQuote,
            GatewayError::Permanent("unsupported corridor".into()),
        );

        let err = orchestrator
            .process_payment(Some("k1"), &alice(dec!(100)))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Permanent);
        assert_eq!(gateway.calls(WorkflowStep::CreateOrder), 0);
        assert!(ledger.is_empty().await);
    }

    #[tokio::test]
    async fn test_deadline_exceeded_caches_nothing() {
        let ledger = Arc::new(InMemoryLedger::new());
        let gateway = Arc::new(SimulatedGateway::new(SimulatedGatewayConfig {
            latency: Duration::from_millis(50),
            ..SimulatedGatewayConfig::default()
        }));
        let orchestrator = PaymentOrchestrator::new(
            ledger.clone(),
            gateway,
            OrchestratorConfig {
                retry: RetryPolicy::default(),
                deadline: Some(Duration::from_millis(10)),
            },
        );

        let err = orchestrator
            .process_payment(Some("k1"), &alice(dec!(100)))
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::DeadlineExceeded(_)));
        assert_eq!(err.kind(), ErrorKind::Transient);
        assert!(ledger.is_empty().await);
    }

    #[tokio::test]
    async fn test_deadline_while_waiting_for_key_releases_lock_entry() {
        let ledger = Arc::new(InMemoryLedger::new());
        let gateway = Arc::new(SimulatedGateway::new(SimulatedGatewayConfig {
            latency: Duration::from_millis(50),
            ..SimulatedGatewayConfig::default()
        }));
        let orchestrator = PaymentOrchestrator::new(
            ledger.clone(),
            gateway,
            OrchestratorConfig {
                retry: RetryPolicy::default(),
                deadline: Some(Duration::from_millis(20)),
            },
        );
        let request = alice(dec!(100));

        let (first, second) = tokio::join!(
            orchestrator.process_payment(Some("k1"), &request),
            orchestrator.process_payment(Some("k1"), &request),
        );

        assert!(matches!(first, Err(PaymentError::DeadlineExceeded(_))));
        assert!(matches!(second, Err(PaymentError::DeadlineExceeded(_))));
        assert!(orchestrator.in_flight.is_empty());
        assert!(ledger.is_empty().await);
    }
}
