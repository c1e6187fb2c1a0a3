//! netguard-sim - synthetic interface metric agent
//!
//! Usage:
//!   netguard-sim generate --count 100 --seed 7
//!   netguard-sim send --server http://127.0.0.1:8000 --interval 5
//!   netguard-sim replay --count 1000 --min-train 120

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use netguard_core::{Detector, DetectorConfig};
use netguard_sim::{GatewayClient, SpikeSchedule, TrafficGenerator, TrafficProfile, replay};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "netguard-sim")]
#[command(about = "Synthetic network interface metrics with periodic spikes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print samples as JSON lines
    Generate {
        #[command(flatten)]
        stream: StreamArgs,

        /// Number of samples
        #[arg(short, long, default_value_t = 100)]
        count: u64,
    },

    /// Post samples to a gateway
    Send {
        #[command(flatten)]
        stream: StreamArgs,

        /// Gateway base URL
        #[arg(long, default_value = "http://127.0.0.1:8000")]
        server: String,

        /// Stop after this many samples (default: run until interrupted)
        #[arg(short, long)]
        count: Option<u64>,
    },

    /// Run an in-process detector over a generated stream and report detection quality
    Replay {
        #[command(flatten)]
        stream: StreamArgs,

        #[arg(short, long, default_value_t = 1000)]
        count: u64,

        /// Detector config file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        min_train: Option<usize>,

        #[arg(long)]
        retrain_every: Option<u64>,
    },
}

#[derive(Args, Clone)]
struct StreamArgs {
    /// Host label
    #[arg(long, default_value = "sim-host")]
    host: String,

    /// Interface label
    #[arg(long, default_value = "eth0")]
    iface: String,

    /// Seconds per sample
    #[arg(short, long, default_value_t = 5.0)]
    interval: f64,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Spike every N-th tick, 0 disables
    #[arg(long, default_value_t = 25)]
    spike_every: u64,

    #[arg(long, default_value_t = 50.0)]
    spike_multiplier: f64,

    /// Median inbound bytes per second
    #[arg(long)]
    bps_in: Option<f64>,

    /// Median outbound bytes per second
    #[arg(long)]
    bps_out: Option<f64>,
}

impl StreamArgs {
    fn generator(&self) -> Result<TrafficGenerator> {
        let mut profile = TrafficProfile::default();
        if let Some(v) = self.bps_in {
            profile.bps_in_median = v;
        }
        if let Some(v) = self.bps_out {
            profile.bps_out_median = v;
        }
        let spikes = SpikeSchedule {
            every: self.spike_every,
            multiplier: self.spike_multiplier,
        };
        let generator = TrafficGenerator::new(&profile, spikes, self.interval, self.seed)?;
        Ok(generator.with_labels(self.host.clone(), self.iface.clone()))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().command {
        Commands::Generate { stream, count } => {
            for sample in stream.generator()?.take(count as usize) {
                println!("{}", serde_json::to_string(&sample)?);
            }
        }

        Commands::Send { stream, server, count } => {
            let client = GatewayClient::new(&server)?;
            let mut generator = stream.generator()?;
            info!(
                host = %stream.host,
                iface = %stream.iface,
                interval_s = stream.interval,
                url = client.url(),
                "Agent started."
            );

            let mut ticker = tokio::time::interval(Duration::from_secs_f64(stream.interval));
            let mut sent = 0u64;
            loop {
                if count.is_some_and(|limit| sent >= limit) {
                    break;
                }
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = tokio::signal::ctrl_c() => break,
                }

                // the sample is stamped with the send time, not the synthetic clock
                let mut sample = generator.next_sample();
                sample.ts = chrono::Utc::now();
                match client.send(&sample).await {
                    Ok(reply) => info!(tick = sample.tick, spiked = sample.spiked, "{}", reply.summary()),
                    Err(e) => warn!(tick = sample.tick, error = %e, "Send failed"),
                }
                sent += 1;
            }
            info!(sent, "Agent stopped.");
        }

        Commands::Replay {
            stream,
            count,
            config,
            min_train,
            retrain_every,
        } => {
            let mut detector_config = match &config {
                Some(path) => DetectorConfig::from_json_file(path)
                    .with_context(|| format!("loading detector config {}", path.display()))?,
                None => DetectorConfig::default(),
            };
            if let Some(v) = min_train {
                detector_config.min_train = v;
            }
            if let Some(v) = retrain_every {
                detector_config.retrain_every = v;
            }
            let detector = Detector::new(detector_config).context("invalid detector config")?;

            let mut generator = stream.generator()?;
            let report = replay(&detector, &mut generator, count);

            info!(
                samples = report.samples,
                warmup_ticks = report.warmup_ticks,
                flagged = report.flagged.len(),
                training_failures = report.training_failures,
                "Replay finished."
            );
            let summary = serde_json::json!({
                "report": report,
                "recall": report.recall(),
                "precision": report.precision(),
                "detector": detector.status(),
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}
