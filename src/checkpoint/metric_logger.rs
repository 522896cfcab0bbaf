use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};

pub const TRAIN_LOSS: &str = "train_loss";
pub const VAL_LOSS: &str = "val_loss";

/// Per-epoch metric series written by training, e.g.
/// `{"train_loss": [0.9, 0.5], "val_loss": [0.95, 0.6]}`.
///
/// Keys other than the two loss series are kept but not required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricHistory {
    series: BTreeMap<String, Vec<f64>>,
}

impl MetricHistory {
    /// Reads the history and checks that both loss series are present.
    pub fn load(path: &Path) -> Result<MetricHistory> {
        let file = File::open(path).map_err(|e| EvalError::io(path, e))?;
        let history: MetricHistory = serde_json::from_reader(BufReader::new(file))
            .map_err(|source| EvalError::Json { path: path.to_path_buf(), source })?;
        for key in [TRAIN_LOSS, VAL_LOSS] {
            if !history.series.contains_key(key) {
                return Err(EvalError::MissingMetric {
                    path: path.to_path_buf(),
                    key: key.to_owned(),
                });
            }
        }
        Ok(history)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| EvalError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)
            .map_err(|source| EvalError::Json { path: path.to_path_buf(), source })?;
        writer.flush().map_err(|e| EvalError::io(path, e))
    }

    pub fn insert(&mut self, key: impl Into<String>, values: Vec<f64>) {
        self.series.insert(key.into(), values);
    }

    pub fn get(&self, key: &str) -> Option<&[f64]> {
        self.series.get(key).map(|v| v.as_slice())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(|k| k.as_str())
    }
}
