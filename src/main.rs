//! Command-line interface for adstream
//!
//! # Usage Examples
//!
//! ## Producer
//! ```bash
//! # Produce 10M records at 130 records/sec, metrics on :2112
//! adstream produce --broker-url kafka:9092 --topic ad_pii_topic
//!
//! # Short deterministic run that waits for every broker acknowledgment
//! adstream produce --total-count 1000 --rate 500 --seed 42 --wait-for-ack --create-topic
//! ```
//!
//! ## Consumer
//! ```bash
//! # Batches of 10k with 30s of simulated work, metrics on :2113
//! adstream consume --broker-url kafka:9092 --topic ad_pii_topic
//!
//! # Drain the topic once and exit, discarding partial batches
//! adstream consume --batch-size 500 --batch-delay 200ms --stop-at-eof --trailing-batch drop
//! ```

use adstream::consume::run_consume;
use adstream::produce::run_produce;
use adstream::{ConsumeArgs, ProduceArgs};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "adstream")]
#[command(about = "Rate-limited Kafka load generator and per-partition batch consumer")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Produce synthetic records at a fixed rate
    Produce(ProduceArgs),
    /// Consume all partitions in parallel and process fixed-size batches
    Consume(ConsumeArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupt received, shutting down");
                cancel.cancel();
            }
        });
    }

    match cli.command {
        Commands::Produce(args) => {
            run_produce(args, cancel).await?;
        }
        Commands::Consume(args) => {
            run_consume(args, cancel).await?;
        }
    }

    Ok(())
}
