//! zkBank Simulator
//!
//! Drives the transaction workflow API with scripted scenarios or a
//! continuous stream of random workflows.

use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod controller;
mod metrics;
mod scenario;

use controller::SimulationController;
use scenario::Scenario;
use zkbank_client::{ApiClient, ClientConfig};
use zkbank_crypto::SeededGenerator;

/// zkBank Simulator CLI
#[derive(Parser, Debug)]
#[command(name = "zkbank-simulator")]
#[command(about = "Scenario runner and load generator for the zkBank API")]
struct Args {
    /// API base URL (defaults to ZKBANK_API_URL or http://localhost:3001/api)
    #[arg(long)]
    api_url: Option<String>,

    /// Scenario to run
    #[arg(short, long)]
    scenario: Option<String>,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Run duration in seconds (0 = until Ctrl+C)
    #[arg(long, default_value = "0")]
    duration: u64,

    /// Seconds between ledger stats polls
    #[arg(long, default_value = "30")]
    refresh_secs: u64,

    /// Workflows started per second in continuous mode
    #[arg(long, default_value = "1.0")]
    rate: f64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    if args.refresh_secs == 0 {
        anyhow::bail!("--refresh-secs must be at least 1");
    }

    let mut config = ClientConfig::from_env();
    if let Some(url) = args.api_url {
        config.api_url = url;
    }

    let mut client = ApiClient::new(config)?;
    if let Some(seed) = args.seed {
        client = client.with_generator(Arc::new(SeededGenerator::new(seed)));
    }

    info!("Starting zkBank Simulator");
    info!("API: {}", client.base_url());

    let controller = SimulationController::new(
        client,
        args.rate,
        Duration::from_secs(args.refresh_secs),
        args.seed,
    )?;

    controller.initialize().await?;
    let started = Instant::now();

    if let Some(scenario_name) = &args.scenario {
        let scenario = Scenario::load(scenario_name)?;
        controller.run_scenario(&scenario).await?;
    } else {
        info!("Running in continuous mode");
        info!("Press Ctrl+C to stop");

        let duration = if args.duration > 0 {
            Some(Duration::from_secs(args.duration))
        } else {
            None
        };

        controller.run(duration).await?;
    }

    // Print metrics
    let metrics = controller.metrics().await;
    info!("Simulation complete");
    info!("Total workflows: {}", metrics.total_workflows);
    info!("Successful: {}", metrics.successful_workflows);
    info!("Failed: {}", metrics.failed_workflows);
    info!("Stats polls: {}", metrics.polls);
    info!("Success rate: {:.1}%", metrics.success_rate() * 100.0);
    let latency = metrics.latency_summary();
    info!(
        "Latency: avg {}ms, p50 {}ms, p99 {}ms, max {}ms",
        latency.average_ms, latency.p50_ms, latency.p99_ms, latency.max_ms
    );
    info!("Throughput: {:.2}/s", metrics.throughput(started.elapsed()));

    Ok(())
}
