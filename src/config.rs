use std::path::{Path, PathBuf};

use clap::Parser;
use crate::error::{EvalError, Result};
use crate::report::summary::{LEARNING_GRAPH_FILE, METRIC_CSV_FILE};

/// Split evaluated under `data_direc`.
pub const TEST_SPLIT: &str = "test";

#[derive(Parser, Debug, Clone, PartialEq)]
#[command(
    name = "thyroid-eval",
    about = "Evaluate a thyroid segmentation checkpoint on the test split (Dice, precision, recall, BCE)"
)]
pub struct EvalConfig {
    /// Dataset root; images are read from <data_direc>/test.
    #[arg(long = "data_direc", default_value = "./data")]
    pub data_direc: PathBuf,
    /// Number of output mask channels.
    #[arg(long = "n_classes", default_value_t = 1)]
    pub n_classes: usize,
    /// Run on a CUDA device.
    #[arg(long)]
    pub cuda: bool,
    /// Data-loader worker threads.
    #[arg(long, default_value_t = 4)]
    pub threads: usize,
    /// Seed for model construction.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
    /// Test batch size.
    #[arg(long = "testBatchSize", default_value_t = 1)]
    pub test_batch_size: usize,
    /// Checkpoint directory holding model_statedict.pth and metric_logger.json.
    #[arg(long = "model_save_path", default_value = "./checkpoints")]
    pub model_save_path: PathBuf,
    /// Where metric_df.csv and the learning-curve plot are written.
    #[arg(long = "output_dir", default_value = "test_results")]
    pub output_dir: PathBuf,
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Default for EvalConfig {
    fn default() -> Self {
        EvalConfig::parse_from(["thyroid-eval"])
    }
}

impl EvalConfig {
    /// Checks that cannot wait until resources are opened.
    pub fn validate(&self) -> Result<()> {
        if self.test_batch_size == 0 {
            return Err(EvalError::InvalidConfig("--testBatchSize must be at least 1".into()));
        }
        if self.n_classes == 0 {
            return Err(EvalError::InvalidConfig("--n_classes must be at least 1".into()));
        }
        Ok(())
    }

    pub fn test_dir(&self) -> PathBuf {
        self.data_direc.join(TEST_SPLIT)
    }

    pub fn csv_path(&self) -> PathBuf {
        self.output_dir.join(METRIC_CSV_FILE)
    }

    pub fn plot_path(&self) -> PathBuf {
        self.output_dir.join(LEARNING_GRAPH_FILE)
    }

    pub fn checkpoint_dir(&self) -> &Path {
        &self.model_save_path
    }
}
