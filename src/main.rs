use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use thyroid_seg::config::EvalConfig;

fn main() -> anyhow::Result<()> {
    let config = EvalConfig::parse();

    let filter = match config.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let outcome = thyroid_seg::run(&config).context("test evaluation failed")?;
    println!(
        "Test Dice {:.4} (std {:.4}) | Precision {:.4} (std {:.4}) | Recall {:.4} (std {:.4}) | BCE {:.4}",
        outcome.summary.dice_mean,
        outcome.summary.dice_std,
        outcome.summary.precision_mean,
        outcome.summary.precision_std,
        outcome.summary.recall_mean,
        outcome.summary.recall_std,
        outcome.summary.ce_loss_mean,
    );
    println!("Wrote {} and {}", outcome.csv_path.display(), outcome.plot_path.display());
    Ok(())
}
