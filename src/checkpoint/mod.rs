pub mod directory;
pub mod metric_logger;

pub use directory::{CheckpointDir, METRIC_LOGGER_FILE, STATE_DICT_FILE};
pub use metric_logger::{MetricHistory, TRAIN_LOSS, VAL_LOSS};
