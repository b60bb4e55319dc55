use clap::Parser;
use idempay::application::orchestrator::{OrchestratorConfig, PaymentOrchestrator};
use idempay::application::retry::RetryPolicy;
use idempay::domain::ports::{GatewayHandle, LedgerHandle};
use idempay::domain::request::IdempotencyKey;
use idempay::infrastructure::in_memory::InMemoryLedger;
use idempay::infrastructure::simulated_gateway::{SimulatedGateway, SimulatedGatewayConfig};
use idempay::interfaces::csv::submission_reader::{SubmissionReader, SubmissionRecord};
use idempay::interfaces::json::response_writer::{ResponseWriter, SubmissionResponse};
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input submissions CSV file
    input: PathBuf,

    /// Submit every row at once instead of one after another.
    #[arg(long, env = "IDEMPAY_PARALLEL")]
    parallel: bool,

    /// Total attempts for the commit step, the first one included.
    #[arg(long, env = "IDEMPAY_MAX_ATTEMPTS", default_value_t = 3)]
    max_attempts: u32,

    /// Base backoff in milliseconds; retry n waits n times this.
    #[arg(long, env = "IDEMPAY_BASE_DELAY_MS", default_value_t = 500)]
    base_delay_ms: u64,

    /// Optional upper bound for a single orchestration, in milliseconds.
    #[arg(long, env = "IDEMPAY_DEADLINE_MS")]
    deadline_ms: Option<u64>,

    /// Simulated provider latency per call, in milliseconds.
    #[arg(long, env = "IDEMPAY_LATENCY_MS", default_value_t = 0)]
    latency_ms: u64,

    /// Probability that the simulated provider fails a commit transiently.
    #[arg(long, env = "IDEMPAY_TRANSIENT_FAILURE_RATE", default_value_t = 0.0)]
    transient_failure_rate: f64,

    /// Fee charged by the simulated provider on the quoted amount.
    #[arg(long, env = "IDEMPAY_FEE_RATE", default_value = "0.01")]
    fee_rate: Decimal,
}

impl Cli {
    fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            retry: RetryPolicy::new(self.max_attempts, Duration::from_millis(self.base_delay_ms)),
            deadline: self.deadline_ms.map(Duration::from_millis),
        }
    }

    fn gateway_config(&self) -> SimulatedGatewayConfig {
        SimulatedGatewayConfig {
            latency: Duration::from_millis(self.latency_ms),
            transient_failure_rate: self.transient_failure_rate,
            fee_rate: self.fee_rate,
        }
    }
}

async fn submit(orchestrator: &PaymentOrchestrator, record: SubmissionRecord) -> SubmissionResponse {
    let key = record.idempotency_key.clone();
    let result = match IdempotencyKey::parse(key.as_deref()).and_then(|_| record.to_request()) {
        Ok(request) => orchestrator.process_payment(key.as_deref(), &request).await,
        Err(err) => Err(err),
    };
    SubmissionResponse::from_result(key, &result)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    // One ledger and one provider per process, owned here.
    let ledger: LedgerHandle = Arc::new(InMemoryLedger::new());
    let gateway: GatewayHandle = Arc::new(SimulatedGateway::new(cli.gateway_config()));
    let orchestrator = Arc::new(PaymentOrchestrator::new(
        ledger,
        gateway,
        cli.orchestrator_config(),
    ));

    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = SubmissionReader::new(file);
    let mut records = Vec::new();
    for record in reader.submissions() {
        match record {
            Ok(record) => records.push(record),
            Err(e) => eprintln!("Error reading submission: {}", e),
        }
    }

    let mut responses = Vec::with_capacity(records.len());
    if cli.parallel {
        let handles: Vec<_> = records
            .into_iter()
            .map(|record| {
                let orchestrator = orchestrator.clone();
                tokio::spawn(async move { submit(&orchestrator, record).await })
            })
            .collect();
        for handle in handles {
            responses.push(handle.await.into_diagnostic()?);
        }
    } else {
        for record in records {
            responses.push(submit(&orchestrator, record).await);
        }
    }

    let stdout = io::stdout();
    let mut writer = ResponseWriter::new(stdout.lock());
    writer.write_responses(&responses).into_diagnostic()?;

    Ok(())
}
