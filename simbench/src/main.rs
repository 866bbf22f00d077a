use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use codec::NetId;
use serde::Serialize;
use simbench::{run_session, Scenario};

#[derive(Parser)]
#[command(
    name = "simbench",
    version,
    about = "statecast packing benchmark harness"
)]
struct Cli {
    /// Ship counts to run, comma separated.
    #[arg(long, value_delimiter = ',', default_values_t = [16u32, 64, 256])]
    ships: Vec<u32>,
    /// Number of ticks per run.
    #[arg(long, default_value_t = 300)]
    ticks: u32,
    /// RNG seed for deterministic results.
    #[arg(long, default_value_t = 1)]
    seed: u64,
    /// Per-packet byte budget.
    #[arg(long, default_value_t = 1200)]
    budget: usize,
    /// Acknowledge every Nth packet (0 never acknowledges).
    #[arg(long, default_value_t = 2)]
    ack_every: u32,
    /// Output directory for summary.json.
    #[arg(long, default_value = "target/simbench")]
    out_dir: PathBuf,
    /// Fail if any run's p95 packet size exceeds this value.
    #[arg(long)]
    max_p95_bytes: Option<usize>,
}

#[derive(Debug, Serialize)]
struct RunSummary {
    ships: u32,
    ticks: u32,
    budget: usize,
    avg_bytes: usize,
    p95_bytes: usize,
    degraded_packets: u32,
    inclusion_ratio: f64,
    avg_pack_us: u64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    fs::create_dir_all(&cli.out_dir)
        .with_context(|| format!("create output dir {}", cli.out_dir.display()))?;

    let mut runs = Vec::with_capacity(cli.ships.len());
    for ships in &cli.ships {
        let mut scenario = Scenario::new(*ships, cli.seed);
        let start = Instant::now();
        let stats = run_session(&mut scenario, NetId::new(1), cli.budget, cli.ticks, cli.ack_every)
            .with_context(|| format!("run {ships} ships"))?;
        let elapsed = start.elapsed();

        let run = RunSummary {
            ships: *ships,
            ticks: cli.ticks,
            budget: cli.budget,
            avg_bytes: stats.average(),
            p95_bytes: stats.p95(),
            degraded_packets: stats.degraded,
            inclusion_ratio: if stats.candidates == 0 {
                1.0
            } else {
                stats.included as f64 / stats.candidates as f64
            },
            avg_pack_us: elapsed.as_micros() as u64 / u64::from(cli.ticks.max(1)),
        };
        if let Some(max) = cli.max_p95_bytes {
            if run.p95_bytes > max {
                anyhow::bail!(
                    "{} ships: p95 packet bytes {} exceeds budget {}",
                    ships,
                    run.p95_bytes,
                    max
                );
            }
        }
        runs.push(run);
    }

    write_summary_json(&cli.out_dir, &runs)?;
    Ok(())
}

fn write_summary_json(out_dir: &Path, runs: &[RunSummary]) -> Result<()> {
    let path = out_dir.join("summary.json");
    let contents = serde_json::to_string_pretty(runs).context("serialize summary")?;
    fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
