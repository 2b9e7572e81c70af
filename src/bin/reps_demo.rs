// REPS demo: episodic policy search on a synthetic quadratic return
use anyhow::{Context, Result};
use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::info;

use reps::logging::init_logging;
use reps::{Distribution, Episode, FitReport, GaussianDiagonalDistribution, Reps, RepsConfig};

#[derive(Parser)]
#[command(name = "reps-demo")]
#[command(version = "0.1.0")]
#[command(
    about = "Run episodic REPS on J(theta) = -||theta - target||^2",
    long_about = None
)]
struct Cli {
    /// REPS configuration JSON (defaults are used when omitted)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// KL bound, overrides the configuration file
    #[arg(long)]
    eps: Option<f64>,

    /// Dimensionality of the parameter vector
    #[arg(short, long, default_value = "3")]
    dim: usize,

    /// Number of REPS updates
    #[arg(short = 'n', long, default_value = "50")]
    iterations: usize,

    /// Episodes sampled per update
    #[arg(short, long, default_value = "25")]
    episodes: usize,

    /// Random seed for reproducibility
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Write the per-iteration report to this JSON file
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Verbose output including solver diagnostics
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct DemoReport {
    config: RepsConfig,
    target: Vec<f64>,
    iterations: Vec<FitReport>,
    final_mean: Vec<f64>,
    final_std: Vec<f64>,
}

fn quadratic_return(theta: &[f64], target: &[f64]) -> f64 {
    -theta
        .iter()
        .zip(target)
        .map(|(x, t)| (x - t).powi(2))
        .sum::<f64>()
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let mut cfg = match &cli.config {
        Some(path) => RepsConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => RepsConfig::default(),
    };
    if let Some(eps) = cli.eps {
        cfg.eps = eps;
    }
    anyhow::ensure!(cli.dim > 0, "dim must be > 0");
    anyhow::ensure!(cli.episodes > 1, "episodes must be > 1");

    let target: Vec<f64> = (0..cli.dim).map(|i| 1.0 - 0.5 * i as f64).collect();
    let dist = GaussianDiagonalDistribution::new(vec![0.0; cli.dim], vec![1.0; cli.dim])?;
    let mut agent = Reps::new(dist, &cfg).context("Invalid REPS configuration")?;
    let mut rng = ChaCha20Rng::seed_from_u64(cli.seed);

    info!(
        eps = cfg.eps,
        dim = cli.dim,
        iterations = cli.iterations,
        episodes = cli.episodes,
        "starting REPS demo"
    );

    let mut history = Vec::with_capacity(cli.iterations);
    for iteration in 0..cli.iterations {
        let episodes: Vec<Episode> = (0..cli.episodes)
            .map(|_| {
                let theta = agent.episode_start(&mut rng);
                let reward = quadratic_return(&theta, &target);
                Episode::with_rewards(theta, vec![reward])
            })
            .collect();

        let report = agent
            .fit(&episodes)
            .with_context(|| format!("REPS update {} failed", iteration))?;
        history.push(report);
    }

    let final_mean = agent.distribution().mean().to_vec();
    let final_std = agent.distribution().std().to_vec();
    info!(
        final_return = quadratic_return(&final_mean, &target),
        ?final_mean,
        ?target,
        "REPS demo finished"
    );

    if let Some(path) = cli.output {
        let report = DemoReport {
            config: cfg,
            target,
            iterations: history,
            final_mean,
            final_std,
        };
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), "report written");
    }

    Ok(())
}
