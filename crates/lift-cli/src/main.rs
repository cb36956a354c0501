//! lift CLI: simulate a loyalty-program panel and measure the program's effect.

use anyhow::{Context, Result};
use clap::Parser;
use lift_inference::{CausalPipeline, aggregate_cohort, generate_panel};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

mod config;
mod report;

#[derive(Parser)]
#[command(name = "lift")]
#[command(about = "lift - causal effect of a loyalty program on customer spend")]
#[command(version)]
struct Cli {
    /// Analysis configuration (YAML)
    #[arg(short, long, default_value = "config/default.yaml")]
    config: PathBuf,

    /// Seed for the simulator and the refuters. Omit for a non-reproducible run.
    #[arg(long)]
    seed: Option<u64>,

    /// Skip the refutation tests.
    #[arg(long)]
    no_refute: bool,

    /// Also write the analysis result here (pretty JSON).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: tracing::Level,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let cfg = config::load(&cli.config)?.with_seed(cli.seed);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    report::section(&mut out, "Data Generation")?;
    let panel = generate_panel(&cfg.panel)?;
    report::data_generation_header(&mut out, panel.len(), cfg.panel.num_users)?;
    let cohort = aggregate_cohort(&panel, cfg.signup_month)?;
    report::cohort_summary(&mut out, cohort.len(), cfg.signup_month, cohort.arm_sizes())?;
    drop(panel);

    report::section(&mut out, "Causal Identification & Estimation")?;
    let mut pipeline =
        CausalPipeline::new(cohort, cfg.treatment.as_str(), cfg.outcome.as_str(), cfg.graph.clone())?;
    let estimand = pipeline.identify()?;
    report::estimand(&mut out, &estimand)?;
    let estimate = pipeline.estimate(&cfg.method, cfg.target_units)?;
    report::estimate(&mut out, &estimate, cfg.panel.treatment_effect)?;

    if !cli.no_refute && !cfg.refute.refuters()?.is_empty() {
        report::section(&mut out, "Refutation Tests")?;
        let outcomes = pipeline.refute(&cfg.refute)?;
        report::refutations(&mut out, &outcomes)?;
    }

    report::section(&mut out, "Done")?;
    out.flush()?;

    if let Some(path) = &cli.output {
        write_json(path, &pipeline.result())?;
    }
    Ok(())
}

fn write_json(path: &Path, value: &impl Serialize) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
