//! netguard-gateway - anomaly detection ingest server
//!
//! Usage:
//!   netguard-gateway --bind 0.0.0.0:8000
//!   netguard-gateway --config detector.json --journal-dir ./alerts
//!   netguard-gateway --min-train 60 --retrain-every 30

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use netguard_core::{DEFAULT_TOP_K, Detector, DetectorConfig};
use netguard_gateway::journal::DEFAULT_JOURNAL_QUEUE;
use netguard_gateway::store::{DEFAULT_ALERT_CAPACITY, DEFAULT_METRIC_CAPACITY};
use netguard_gateway::{AlertJournal, AppState, Store, router, telemetry};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(name = "netguard-gateway")]
#[command(about = "Score network interface metrics and raise anomaly alerts")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8000")]
    bind: String,

    /// Detector config file (JSON); flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write alerts as hourly JSON-lines files into this directory
    #[arg(long)]
    journal_dir: Option<PathBuf>,

    /// Metric records kept in memory
    #[arg(long, default_value_t = DEFAULT_METRIC_CAPACITY)]
    metric_history: usize,

    /// Alert records kept in memory
    #[arg(long, default_value_t = DEFAULT_ALERT_CAPACITY)]
    alert_history: usize,

    #[arg(long)]
    buffer_size: Option<usize>,

    #[arg(long)]
    min_train: Option<usize>,

    #[arg(long)]
    retrain_every: Option<u64>,

    #[arg(long)]
    threshold_q: Option<f64>,

    /// Features listed in each explanation
    #[arg(long, default_value_t = DEFAULT_TOP_K)]
    top_k: usize,

    /// Verbose logging (overrides RUST_LOG)
    #[arg(long)]
    debug: bool,
}

impl Args {
    fn detector_config(&self) -> Result<DetectorConfig> {
        let mut config = match &self.config {
            Some(path) => DetectorConfig::from_json_file(path)
                .with_context(|| format!("loading detector config {}", path.display()))?,
            None => DetectorConfig::default(),
        };

        if let Some(v) = self.buffer_size {
            config.buffer_size = v;
        }
        if let Some(v) = self.min_train {
            config.min_train = v;
        }
        if let Some(v) = self.retrain_every {
            config.retrain_every = v;
        }
        if let Some(v) = self.threshold_q {
            config.threshold_q = v;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    telemetry::init();

    let config = args.detector_config()?;
    info!(
        buffer_size = config.buffer_size,
        min_train = config.min_train,
        retrain_every = config.retrain_every,
        threshold_q = config.threshold_q,
        n_estimators = config.n_estimators,
        "Detector configured."
    );
    let detector = Detector::new(config).context("invalid detector config")?;

    let mut state = AppState::new(detector, Store::new(args.metric_history, args.alert_history));
    state.top_k = args.top_k;

    let mut journal_worker = None;
    if let Some(dir) = &args.journal_dir {
        let (journal, worker) = AlertJournal::spawn(dir, DEFAULT_JOURNAL_QUEUE)
            .with_context(|| format!("starting alert journal in {}", dir.display()))?;
        state = state.with_journal(journal);
        journal_worker = Some(worker);
    }

    let app = router(state);
    let listener = TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("binding {}", args.bind))?;

    info!(addr = %args.bind, "Gateway listening.");
    info!("  POST /ingest       - Score and store one sample");
    info!("  GET  /api/metrics  - Recent samples");
    info!("  GET  /api/alerts   - Recent alerts");
    info!("  GET  /api/status   - Detector state");
    info!("  GET  /metrics      - Prometheus metrics");
    info!("  GET  /health       - Health check");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutting down...");
            }
        })
        .await
        .context("server error")?;

    if let Some(worker) = journal_worker {
        let written = worker.join().context("alert journal failed")?;
        info!(written, "Alert journal flushed.");
    }
    info!("Goodbye.");
    Ok(())
}
