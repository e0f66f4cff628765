//! layered-fdtd: CLI for 1D FDTD reflection runs

use anyhow::{Context, Result};
use clap::Parser;
use layered_fdtd::{export::export_all, Simulation, SimulationConfig};
use std::path::PathBuf;
use tracing::{info, Level};

#[derive(Parser, Debug)]
#[command(name = "layered-fdtd")]
#[command(about = "Reflection coefficient of layered dielectrics by 1D FDTD")]
#[command(version)]
struct Args {
    /// JSON configuration file (defaults to the built-in three-layer run)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for result files
    #[arg(short, long, default_value = "fdtd-output")]
    output: PathBuf,

    /// Override the number of time steps
    #[arg(long)]
    steps: Option<usize>,

    /// Record an Ez frame every N steps
    #[arg(long)]
    snapshot_every: Option<usize>,

    /// Run the per-cell update passes in parallel
    #[arg(long)]
    parallel: bool,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    print_config: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    let mut config = match &args.config {
        Some(path) => SimulationConfig::from_file(path)
            .with_context(|| format!("Failed to load config: {:?}", path))?,
        None => SimulationConfig::default(),
    };
    if let Some(steps) = args.steps {
        config.max_time = steps;
    }
    if let Some(every) = args.snapshot_every {
        config.snapshot_every = every;
    }
    config.parallel |= args.parallel;

    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let output = Simulation::from_config(config)
        .context("Invalid configuration")?
        .run()
        .context("Simulation failed")?;

    let written = export_all(&output, &args.output)
        .with_context(|| format!("Failed to write results to {:?}", args.output))?;

    let band = output.passband();
    if let Some(peak) = band
        .iter()
        .filter(|p| p.gamma.is_finite())
        .max_by(|a, b| a.gamma.total_cmp(&b.gamma))
    {
        info!(
            "Peak |Γ| in passband: {:.4} at {:.3} GHz",
            peak.gamma,
            peak.frequency * 1e-9
        );
    }
    for path in written {
        eprintln!("Wrote {:?}", path);
    }

    Ok(())
}
