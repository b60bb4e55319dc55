use crate::domain::outcome::OrderStatus;
use crate::domain::ports::{
    AccessToken, BeneficiaryRegistration, GatewayError, GatewayResult, Order, OrderParams,
    PaymentGateway, Quote, QuoteParams, WorkflowStep,
};
use crate::domain::request::Beneficiary;
use async_trait::async_trait;
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;

/// Tuning knobs for [`SimulatedGateway`].
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedGatewayConfig {
    /// Delay applied before every call returns.
    pub latency: Duration,
    /// Probability in `[0, 1]` that `create_order` fails transiently.
    pub transient_failure_rate: f64,
    /// Fee charged on the quoted amount.
    pub fee_rate: Decimal,
}

impl Default for SimulatedGatewayConfig {
    fn default() -> Self {
        Self {
            latency: Duration::ZERO,
            transient_failure_rate: 0.0,
            fee_rate: dec!(0.01),
        }
    }
}

/// In-process stand-in for the downstream payment provider.
///
/// Besides random transient commit failures it supports scripted faults per
/// step, and it counts calls so callers can assert on provider traffic.
#[derive(Debug, Default)]
pub struct SimulatedGateway {
    config: SimulatedGatewayConfig,
    faults: Mutex<HashMap<WorkflowStep, VecDeque<GatewayError>>>,
    calls: [AtomicUsize; 4],
    committed: AtomicUsize,
}

impl SimulatedGateway {
    pub fn new(config: SimulatedGatewayConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Queues `fault` to be returned by the next call to `step`.
    pub fn inject(&self, step: WorkflowStep, fault: GatewayError) {
        let mut faults = self.faults.lock().unwrap_or_else(|e| e.into_inner());
        faults.entry(step).or_default().push_back(fault);
    }

    /// Number of times `step` was invoked, failed calls included.
    pub fn calls(&self, step: WorkflowStep) -> usize {
        self.calls[Self::slot(step)].load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        WorkflowStep::ALL.iter().map(|s| self.calls(*s)).sum()
    }

    /// Number of orders that were actually created.
    pub fn committed_orders(&self) -> usize {
        self.committed.load(Ordering::SeqCst)
    }

    fn slot(step: WorkflowStep) -> usize {
        match step {
            WorkflowStep::Authenticate => 0,
            WorkflowStep::RegisterBeneficiary => 1,
            WorkflowStep::CreateQuote => 2,
            WorkflowStep::CreateOrder => 3,
        }
    }

    async fn enter(&self, step: WorkflowStep) -> GatewayResult<()> {
        self.calls[Self::slot(step)].fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.config.latency).await;

        let injected = {
            let mut faults = self.faults.lock().unwrap_or_else(|e| e.into_inner());
            faults.get_mut(&step).and_then(VecDeque::pop_front)
        };
        match injected {
            Some(fault) => {
                tracing::debug!(step = %step, error = %fault, "injected provider fault");
                Err(fault)
            }
            None => Ok(()),
        }
    }

    fn short_id() -> String {
        Uuid::new_v4().simple().to_string()[..8].to_string()
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn authenticate(&self) -> GatewayResult<AccessToken> {
        self.enter(WorkflowStep::Authenticate).await?;
        Ok(AccessToken {
            access_token: format!("token_{}", Uuid::new_v4()),
            expires_in: 3600,
        })
    }

    async fn register_beneficiary(
        &self,
        _token: &AccessToken,
        beneficiary: &Beneficiary,
    ) -> GatewayResult<BeneficiaryRegistration> {
        self.enter(WorkflowStep::RegisterBeneficiary).await?;
        tracing::debug!(name = %beneficiary.name, "registering beneficiary");
        Ok(BeneficiaryRegistration {
            beneficiary_id: format!("ben_{}", Self::short_id()),
        })
    }

    async fn create_quote(
        &self,
        _token: &AccessToken,
        params: &QuoteParams,
    ) -> GatewayResult<Quote> {
        self.enter(WorkflowStep::CreateQuote).await?;
        Ok(Quote {
            quote_id: format!("qt_{}", Self::short_id()),
            total_amount: params.amount,
            fee: params.amount * self.config.fee_rate,
        })
    }

    async fn create_order(
        &self,
        _token: &AccessToken,
        _params: &OrderParams,
    ) -> GatewayResult<Order> {
        self.enter(WorkflowStep::CreateOrder).await?;

        let rate = self.config.transient_failure_rate.clamp(0.0, 1.0);
        if rate > 0.0 && rand::thread_rng().gen_bool(rate) {
            tracing::warn!("simulated transient failure on create_order");
            return Err(GatewayError::Transient("Gateway Timeout".to_string()));
        }

        self.committed.fetch_add(1, Ordering::SeqCst);
        Ok(Order {
            order_id: format!("ord_{}", Uuid::new_v4()),
            status: OrderStatus::Pending,
        })
    }
}
