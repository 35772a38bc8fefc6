use anyhow::Context;
use clap::Parser;
use generator::mirror::synthesize;
use log::info;
use std::path::PathBuf;
use workflow::config::WorkflowConfig;
use workflow::runner::Runner;

mod generator;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Latitude-binned radiance curves from sounder scenes")]
struct Args {
    /// Workflow config in YAML
    #[arg(long)]
    workflow: PathBuf,
    /// Resolve and report candidate scenes without fetching or filtering
    #[arg(long, default_value_t = false)]
    dry_run: bool,
    /// Rebuild one year of the position cache from the mirror, then exit
    #[arg(long)]
    build_positions: Option<i32>,
    /// Write a synthetic mirror and position cache for the configured range
    #[arg(long, default_value_t = false)]
    synthesize: bool,
    /// Seed for --synthesize
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = WorkflowConfig::load(&args.workflow)?;

    if args.synthesize {
        let summary = synthesize(&config, args.seed).context("synthesizing mirror")?;
        info!("wrote {} synthetic scenes for {:?}", summary.scenes, summary.years);
        return Ok(());
    }

    let runner = Runner::new(config);
    if let Some(year) = args.build_positions {
        let build = runner.build_positions(year)?;
        info!(
            "{} positions written to {}, {} units incomplete",
            build.records,
            build.path.display(),
            build.incomplete.len()
        );
        for unit in &build.incomplete {
            info!("incomplete: {unit}");
        }
        return Ok(());
    }

    let result = runner.execute(args.dry_run)?;
    let selected: usize = result.batches.iter().map(|b| b.candidates.len()).sum();
    if args.dry_run {
        println!("{selected} candidate scenes in {} batches", result.batches.len());
    } else {
        let unreadable: usize = result.batches.iter().map(|b| b.unreadable.len()).sum();
        let incomplete: usize = result.batches.iter().map(|b| b.incomplete.len()).sum();
        println!(
            "{selected} scenes selected, {incomplete} not fetched, {unreadable} unreadable, {} cells kept",
            result.attrition.surviving()
        );
    }
    Ok(())
}
