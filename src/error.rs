use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EvalError>;

/// Every way an evaluation run can fail. Nothing is recovered locally; the
/// binary prints the chain and exits non-zero.
#[derive(Debug, Error)]
pub enum EvalError {
    // ── configuration ───────────────────────────────────────────────────────
    #[error("checkpoints not found at {path}, please run training first")]
    CheckpointDirMissing { path: PathBuf },
    #[error("no GPU found, please run without --cuda")]
    CudaUnavailable,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // ── resource loading ───────────────────────────────────────────────────
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("json parse error at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("image error at {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("csv error at {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("no mask found for image {image} (expected {expected})")]
    MissingMask { image: PathBuf, expected: PathBuf },
    #[error("metric history {path} has no `{key}` series")]
    MissingMetric { path: PathBuf, key: String },
    #[error("state dict: {0}")]
    StateDict(String),

    // ── per-batch runtime ──────────────────────────────────────────────────
    #[error("shape mismatch in {context}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        context: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    #[error("labels must be binary (0 or 1), found {value}")]
    NonBinaryLabels { value: f64 },
    #[error("data loader worker exited before delivering batch {batch}")]
    WorkerDisconnected { batch: usize },
    #[error("mask {path}: class index {value} out of range for {n_classes} classes")]
    InvalidLabel {
        path: PathBuf,
        value: u8,
        n_classes: usize,
    },

    // ── aggregation ────────────────────────────────────────────────────────
    #[error("test set produced no batches; nothing to aggregate")]
    EmptyTestSet,
}

impl EvalError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EvalError::Io { path: path.into(), source }
    }

    pub(crate) fn shape(context: &'static str, expected: &[usize], actual: &[usize]) -> Self {
        EvalError::ShapeMismatch {
            context,
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }
}
