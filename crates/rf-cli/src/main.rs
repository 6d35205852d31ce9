//! RegioFill CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use rf_processor::{
    EventBatch, Processor, RunConfig, SchemaAdapter, build_processor, prepare_batches, read_run_config,
    run_batches,
};

#[derive(Parser)]
#[command(name = "regiofill")]
#[command(about = "RegioFill - region-split weighted histogram filling")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process event batches and write merged outputs
    Run {
        /// Run configuration (YAML, or JSON with a .json extension)
        #[arg(short, long)]
        config: PathBuf,

        /// Batch JSON files
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Threads (0 = auto).
        #[arg(long, default_value = "0")]
        threads: usize,
    },

    /// Check a run configuration and print the resolved region catalog
    Validate {
        /// Run configuration
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Print the histogram schema of the configured processor
    Schema {
        /// Run configuration
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Print version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_max_level(cli.log_level).with_target(false).init();

    match cli.command {
        Commands::Run { config, input, output, threads } => cmd_run(&config, &input, output.as_ref(), threads),
        Commands::Validate { config } => cmd_validate(&config),
        Commands::Schema { config } => cmd_schema(&config),
        Commands::Version => {
            println!("regiofill {}", rf_core::VERSION);
            Ok(())
        }
    }
}

fn load_config(path: &PathBuf) -> Result<RunConfig> {
    tracing::info!(path = %path.display(), "loading run config");
    read_run_config(path).with_context(|| format!("invalid run config {}", path.display()))
}

fn load_processor(path: &PathBuf) -> Result<(RunConfig, Box<dyn Processor>)> {
    let config = load_config(path)?;
    let processor = build_processor(&config).context("failed to build processor")?;
    Ok((config, processor))
}

fn cmd_run(config: &PathBuf, inputs: &[PathBuf], output: Option<&PathBuf>, threads: usize) -> Result<()> {
    if threads > 0 {
        // Best-effort; if a global pool already exists, keep going.
        let _ = rayon::ThreadPoolBuilder::new().num_threads(threads).build_global();
    }
    let (_, processor) = load_processor(config)?;

    let mut batches = inputs
        .iter()
        .map(|p| EventBatch::from_path(p).with_context(|| format!("failed to load batch {}", p.display())))
        .collect::<Result<Vec<_>>>()?;
    prepare_batches(&SchemaAdapter::default(), &mut batches)?;

    let outputs = run_batches(processor.as_ref(), &batches)?;
    tracing::info!(datasets = outputs.len(), "writing outputs");
    write_json(output, serde_json::to_value(&outputs)?)
}

fn cmd_validate(config: &PathBuf) -> Result<()> {
    let (cfg, processor) = load_processor(config)?;
    let channel = cfg.channel.as_str();
    let catalog = processor.catalog();
    let regions: Vec<&str> = catalog.regions(channel)?.iter().map(|r| r.label.as_str()).collect();
    let output_json = serde_json::json!({
        "processor": processor.name(),
        "year": cfg.year,
        "channel": channel,
        "working_points": cfg.working_points(),
        "regions": regions,
        "efficiency_pair": catalog.efficiency_pair(channel),
        "catalog": catalog.to_specs(),
    });
    write_json(None, output_json)
}

fn cmd_schema(config: &PathBuf) -> Result<()> {
    let (_, processor) = load_processor(config)?;
    write_json(None, serde_json::to_value(processor.schema())?)
}

fn write_json(output: Option<&PathBuf>, value: serde_json::Value) -> Result<()> {
    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&value)?)?;
    } else {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}
