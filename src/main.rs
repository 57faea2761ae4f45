use clap::Parser;
use disburse::application::orchestrator::PaymentOrchestrator;
use disburse::config::{LoggingConfig, MockGatewayConfig, OrchestratorConfig, QueuePolicy};
use disburse::domain::payment::Payment;
use disburse::domain::ports::PaymentStoreRef;
use disburse::infrastructure::in_memory::InMemoryPaymentStore;
use disburse::infrastructure::mock_gateway::MockDisbursementGateway;
use disburse::infrastructure::sms::LoggingSmsNotifier;
use disburse::interfaces::api::PaymentApi;
use disburse::interfaces::csv::payment_writer::PaymentWriter;
use disburse::interfaces::csv::request_reader::RequestReader;
use disburse::logging::init_logging;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input disbursement requests CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "DISBURSE_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Probability in [0, 1] that the mock provider accepts a disbursement
    #[arg(long, env = "DISBURSE_SUCCESS_RATE", default_value_t = 0.9, value_parser = parse_rate)]
    success_rate: f64,

    #[arg(long, env = "DISBURSE_MIN_LATENCY_MS", default_value_t = 500)]
    min_latency_ms: u64,

    #[arg(long, env = "DISBURSE_MAX_LATENCY_MS", default_value_t = 3000)]
    max_latency_ms: u64,

    /// Completion workers awaiting provider outcomes
    #[arg(long, env = "DISBURSE_WORKERS", default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    workers: u64,

    /// Completions allowed to wait for a free worker
    #[arg(long, env = "DISBURSE_QUEUE_CAPACITY", default_value_t = 25, value_parser = clap::value_parser!(u64).range(1..))]
    queue_capacity: u64,

    /// What to do with a request when the completion queue is full
    #[arg(long, env = "DISBURSE_QUEUE_POLICY", value_enum, default_value_t = QueuePolicy::Wait)]
    queue_policy: QueuePolicy,

    /// Seconds to wait for outstanding completions before exiting
    #[arg(long, env = "DISBURSE_DRAIN_TIMEOUT_SECS", default_value_t = 30)]
    drain_timeout_secs: u64,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "DISBURSE_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "DISBURSE_LOG_JSON")]
    log_json: bool,
}

fn parse_rate(value: &str) -> std::result::Result<f64, String> {
    let rate: f64 = value.parse().map_err(|e| format!("{}", e))?;
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(format!("{} is not within [0, 1]", value))
    }
}

fn open_store(db_path: Option<PathBuf>) -> Result<PaymentStoreRef> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let store = disburse::infrastructure::rocksdb::RocksDBStore::open(path).into_diagnostic()?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            eprintln!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Arc::new(InMemoryPaymentStore::new()))
        }
        None => Ok(Arc::new(InMemoryPaymentStore::new())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&LoggingConfig {
        level: cli.log_level.clone(),
        json: cli.log_json,
    });

    let store = open_store(cli.db_path)?;
    let gateway = Arc::new(MockDisbursementGateway::new(MockGatewayConfig {
        success_rate: cli.success_rate,
        min_latency: Duration::from_millis(cli.min_latency_ms),
        max_latency: Duration::from_millis(cli.max_latency_ms),
    }));
    let config = OrchestratorConfig {
        completion_workers: cli.workers as usize,
        completion_queue_capacity: cli.queue_capacity as usize,
        drain_timeout: Duration::from_secs(cli.drain_timeout_secs),
        queue_policy: cli.queue_policy,
    };
    let api = PaymentApi::new(PaymentOrchestrator::new(
        store.clone(),
        gateway,
        Arc::new(LoggingSmsNotifier::new()),
        config,
    ));

    // Submit requests
    let file = File::open(cli.input).into_diagnostic()?;
    let reader = RequestReader::new(file);
    let mut ids = Vec::new();
    for record in reader.requests() {
        match record {
            Ok(record) => {
                let key = record.transaction_key.clone();
                let response = api.create(record.into()).await;
                match (response.payment(), response.error()) {
                    (Some(payment), _) => {
                        if !ids.contains(&payment.payment_id) {
                            ids.push(payment.payment_id);
                        }
                    }
                    (None, Some(error)) => {
                        let detail = if error.details.is_empty() {
                            error.message.clone()
                        } else {
                            error.details.join("; ")
                        };
                        eprintln!("Error processing request: {}", detail);

                        // A refused submission still leaves a FAILED record behind.
                        if response.status == 503 {
                            let lookup = api.get_by_transaction_key(&key).await;
                            if let Some(payment) = lookup.payment() {
                                if !ids.contains(&payment.payment_id) {
                                    ids.push(payment.payment_id);
                                }
                            }
                        }
                    }
                    (None, None) => {}
                }
            }
            Err(e) => {
                eprintln!("Error reading request: {}", e);
            }
        }
    }

    // Wait for outstanding provider outcomes
    api.shutdown().await;

    let mut payments: Vec<Payment> = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(payment) = store.get(id).await.into_diagnostic()? {
            payments.push(payment);
        }
    }

    // Output final state
    let stdout = io::stdout();
    let mut writer = PaymentWriter::new(stdout.lock());
    writer.write_payments(&payments).into_diagnostic()?;

    Ok(())
}
