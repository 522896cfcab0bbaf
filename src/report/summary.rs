use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};

pub const METRIC_CSV_FILE: &str = "metric_df.csv";
pub const LEARNING_GRAPH_FILE: &str = "learning_graph_dice_coefficient.png";

/// Aggregate test metrics, persisted as a one-row CSV with a header and no
/// index column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryReport {
    #[serde(rename = "Test Dice Coefficient Score")]
    pub dice_mean: f64,
    #[serde(rename = "Dice Std")]
    pub dice_std: f64,
    #[serde(rename = "Test Precision")]
    pub precision_mean: f64,
    #[serde(rename = "Precision Std")]
    pub precision_std: f64,
    #[serde(rename = "Test Recall")]
    pub recall_mean: f64,
    #[serde(rename = "Recall Std")]
    pub recall_std: f64,
    #[serde(rename = "Binary Cross Entropy Loss")]
    pub ce_loss_mean: f64,
}

impl SummaryReport {
    /// Overwrites `path` with the header row and this report's single row.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let csv_err = |source| EvalError::Csv { path: path.to_path_buf(), source };
        let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
        writer.serialize(self).map_err(csv_err)?;
        writer.flush().map_err(|e| EvalError::io(path, e))
    }

    /// Reads back the first data row of a file written by `write_csv`.
    pub fn read_csv(path: &Path) -> Result<SummaryReport> {
        let csv_err = |source| EvalError::Csv { path: path.to_path_buf(), source };
        let mut reader = csv::Reader::from_path(path).map_err(csv_err)?;
        match reader.deserialize().next() {
            Some(row) => row.map_err(csv_err),
            None => Err(EvalError::InvalidConfig(format!(
                "{} has a header but no data row",
                path.display()
            ))),
        }
    }
}
