pub mod accumulator;
pub mod evaluator;
pub mod no_grad;
pub mod run;

pub use accumulator::{BatchMetrics, MetricAccumulators};
pub use evaluator::{Evaluator, DEFAULT_THRESHOLD};
pub use no_grad::NoGradGuard;
pub use run::{run, RunOutcome};
