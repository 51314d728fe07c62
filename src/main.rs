//! forge-knn command-line driver.
//!
//! Generates a seeded random dataset, runs the distributed search and
//! reports the compute time. With `--verify` the result is checked against
//! brute force and a failed check exits with a non-zero status.

use anyhow::{bail, Context, Result};
use clap::Parser;
use forge_knn::constants::defaults;
use forge_knn::{KnnJob, RunConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Distributed exact k-nearest-neighbor search
#[derive(Parser)]
#[command(name = "forge-knn")]
#[command(about = "Find the k nearest reference points for every query point")]
#[command(version)]
struct Cli {
    /// Number of query points
    #[arg(long, default_value_t = defaults::QUERIES)]
    nq: usize,

    /// Number of reference points
    #[arg(long, default_value_t = defaults::REFERENCE_POINTS)]
    npp: usize,

    /// Point dimension
    #[arg(short = 'd', long = "dim", default_value_t = defaults::DIMENSION)]
    dimension: usize,

    /// Neighbors per query (clamped to the reference set size)
    #[arg(short, default_value_t = defaults::K)]
    k: usize,

    /// Number of message-passing workers
    #[arg(short, long, default_value_t = defaults::WORKERS)]
    workers: usize,

    /// Threads per worker (0 = divide available parallelism among workers)
    #[arg(short, long, default_value_t = defaults::THREADS)]
    threads: usize,

    /// Check the result against brute force
    #[arg(long)]
    verify: bool,

    /// Seed for the dataset generator
    #[arg(long, default_value_t = defaults::SEED)]
    seed: u64,

    /// Print the run report as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn to_config(&self) -> RunConfig {
        RunConfig::default()
            .with_queries(self.nq)
            .with_reference_points(self.npp)
            .with_dimension(self.dimension)
            .with_k(self.k)
            .with_workers(self.workers)
            .with_threads(self.threads)
            .with_verify(self.verify)
            .with_seed(self.seed)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let job = KnnJob::new(cli.to_config()).context("invalid configuration")?;
    let outcome = match job.run() {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::error!(error = %err, "job failed");
            return Err(err).context("distributed search failed");
        }
    };
    let report = &outcome.report;

    if cli.json {
        let json = serde_json::to_string_pretty(report).context("failed to serialize report")?;
        println!("{}", json);
    } else {
        println!("{}", report.summary());
    }

    if !report.passed() {
        bail!("verification failed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_map_onto_config() {
        let cli = Cli::parse_from([
            "forge-knn", "--nq", "7", "--npp", "50", "-d", "3", "-k", "4", "-w", "3", "-t", "2",
            "--verify", "--seed", "9",
        ]);
        let config = cli.to_config();

        assert_eq!(config.queries, 7);
        assert_eq!(config.reference_points, 50);
        assert_eq!(config.dimension, 3);
        assert_eq!(config.k, 4);
        assert_eq!(config.workers, 3);
        assert_eq!(config.threads, 2);
        assert!(config.verify);
        assert_eq!(config.seed, 9);
    }

    #[test]
    fn test_defaults() {
        let config = Cli::parse_from(["forge-knn"]).to_config();
        assert_eq!(config, RunConfig::default());
    }
}
