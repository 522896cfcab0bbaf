use std::path::PathBuf;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use rand::{rngs::StdRng, SeedableRng};
use tracing::info;

use crate::checkpoint::{directory::CheckpointDir, metric_logger::MetricHistory};
use crate::config::EvalConfig;
use crate::dataset::loader::{DataLoader, LoaderOptions};
use crate::dataset::segmentation::{DatasetOptions, SegmentationDataset};
use crate::error::{EvalError, Result};
use crate::eval::accumulator::MetricAccumulators;
use crate::eval::evaluator::Evaluator;
use crate::math::device::Device;
use crate::network::segmentation::{NetConfig, SegmentationNet};
use crate::network::state_dict::StateDict;
use crate::report::plot::learning_curve;
use crate::report::summary::SummaryReport;

const PROGRESS_TEMPLATE: &str = "{prefix} {bar:40.cyan/blue} {pos}/{len} [{elapsed_precise}<{eta_precise}]";

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub summary: SummaryReport,
    pub accumulators: MetricAccumulators,
    pub csv_path: PathBuf,
    pub plot_path: PathBuf,
}

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Evaluates the checkpoint in `config.model_save_path` on the test split and
/// writes the metric table and learning-curve plot to `config.output_dir`.
///
/// Checks run before any data is touched, in this order: checkpoint
/// directory exists, output directory is created, configuration is logged,
/// device is available, sizes are non-zero. Any later failure aborts the run
/// before either output is written.
pub fn run(config: &EvalConfig) -> Result<RunOutcome> {
    let checkpoint = CheckpointDir::open(config.checkpoint_dir())?;
    std::fs::create_dir_all(&config.output_dir)
        .map_err(|e| EvalError::io(&config.output_dir, e))?;
    info!(
        data_direc = %config.data_direc.display(),
        n_classes = config.n_classes,
        cuda = config.cuda,
        threads = config.threads,
        seed = config.seed,
        test_batch_size = config.test_batch_size,
        model_save_path = %config.model_save_path.display(),
        output_dir = %config.output_dir.display(),
        "evaluation configuration"
    );
    let device = Device::select(config.cuda)?;
    config.validate()?;

    // ── Resources ──────────────────────────────────────────────────────────
    let net_config = NetConfig::with_classes(config.n_classes);
    let dataset = SegmentationDataset::open(config.test_dir(), DatasetOptions::from(&net_config))?;
    let loader = DataLoader::new(
        Arc::new(dataset),
        LoaderOptions {
            batch_size: config.test_batch_size,
            num_workers: config.threads,
            shuffle: false,
            seed: config.seed,
        },
    )?;
    info!(samples = loader.num_samples(), batches = loader.len(), "test set opened");

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut model = SegmentationNet::new(net_config, &mut rng);
    let state_path = checkpoint.state_dict_path();
    let state = StateDict::load(&state_path)?;
    model.load_state_dict(&state)?;
    let mut model = model.to_device(device);
    model.eval();
    info!(
        path = %state_path.display(),
        tensors = state.len(),
        device = %model.device(),
        "checkpoint loaded"
    );

    let history = MetricHistory::load(&checkpoint.metric_logger_path())?;

    // ── Evaluation ─────────────────────────────────────────────────────────
    let progress = progress_bar(loader.len() as u64);
    let accumulators = Evaluator::new(device).run(&mut model, &loader, &progress)?;
    progress.finish();
    let summary = accumulators.summarize()?;
    info!(
        batches = accumulators.len(),
        dice = summary.dice_mean,
        dice_std = summary.dice_std,
        precision = summary.precision_mean,
        precision_std = summary.precision_std,
        recall = summary.recall_mean,
        recall_std = summary.recall_std,
        bce = summary.ce_loss_mean,
        "test metrics"
    );

    // ── Outputs ────────────────────────────────────────────────────────────
    let csv_path = config.csv_path();
    summary.write_csv(&csv_path)?;
    let plot_path = config.plot_path();
    learning_curve(&history).save(&plot_path)?;
    info!(csv = %csv_path.display(), plot = %plot_path.display(), "results written");

    Ok(RunOutcome { summary, accumulators, csv_path, plot_path })
}

fn progress_bar(len: u64) -> ProgressBar {
    let bar = ProgressBar::new(len);
    bar.set_style(
        ProgressStyle::with_template(PROGRESS_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_prefix("Test");
    bar
}
