use std::path::{Path, PathBuf};

use crate::error::{EvalError, Result};

pub const STATE_DICT_FILE: &str = "model_statedict.pth";
pub const METRIC_LOGGER_FILE: &str = "metric_logger.json";

/// A training run's output directory: model weights plus loss history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointDir {
    root: PathBuf,
}

impl CheckpointDir {
    /// Fails unless `root` exists and is a directory.
    pub fn open(root: impl AsRef<Path>) -> Result<CheckpointDir> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(EvalError::CheckpointDirMissing { path: root.to_path_buf() });
        }
        Ok(CheckpointDir { root: root.to_path_buf() })
    }

    pub fn state_dict_path(&self) -> PathBuf {
        self.root.join(STATE_DICT_FILE)
    }

    pub fn metric_logger_path(&self) -> PathBuf {
        self.root.join(METRIC_LOGGER_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_requires_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointDir::open(dir.path()).unwrap();
        assert_eq!(ckpt.state_dict_path(), dir.path().join("model_statedict.pth"));
        assert_eq!(ckpt.metric_logger_path(), dir.path().join("metric_logger.json"));

        let file = dir.path().join("file");
        std::fs::write(&file, b"").unwrap();
        assert!(matches!(
            CheckpointDir::open(&file),
            Err(EvalError::CheckpointDirMissing { .. })
        ));
        assert!(CheckpointDir::open(dir.path().join("missing")).is_err());
    }
}
