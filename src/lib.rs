pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod loss;
pub mod metrics;
pub mod dataset;
pub mod checkpoint;
pub mod report;
pub mod eval;
pub mod config;
pub mod error;

// Convenience re-exports
pub use math::{Device, Tensor};
pub use network::{NetConfig, SegmentationNet, StateDict};
pub use dataset::{DataLoader, SegmentationDataset};
pub use checkpoint::MetricHistory;
pub use report::SummaryReport;
pub use eval::{run, Evaluator, RunOutcome};
pub use config::EvalConfig;
pub use error::{EvalError, Result};
