// ml_examples/src/main.rs
use anyhow::{Context, Result};
use clap::Parser;
use tabular_mlp::{run_with_config, PipelineConfig};
use tracing_subscriber::EnvFilter;

/// Train a small MLP classifier on a CSV file and print its classification report.
#[derive(Debug, Parser)]
#[command(name = "tabular-mlp", version)]
struct Args {
    /// Comma-separated input file with a header row
    #[arg(default_value = "data/LoanStats3a.csv")]
    path: String,

    /// Column to predict, after one-hot encoding (exact name)
    #[arg(default_value = "loan_status_Charged Off")]
    target: String,

    /// Fix the split and weight initialization for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = PipelineConfig::default();
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    let report = run_with_config(&args.path, &args.target, &config)
        .with_context(|| format!("failed to predict {:?} from {}", args.target, args.path))?;
    tracing::info!(
        path = %args.path,
        accuracy = report.accuracy,
        classes = report.classes.len(),
        "report ready"
    );
    print!("{}", report);
    Ok(())
}
