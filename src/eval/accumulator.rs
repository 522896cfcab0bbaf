use crate::error::{EvalError, Result};
use crate::metrics::stats::Stats;
use crate::report::summary::SummaryReport;

/// Metrics of a single evaluated batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchMetrics {
    pub dice: f64,
    pub precision: f64,
    pub recall: f64,
    pub ce_loss: f64,
}

/// Per-batch metric sequences, appended in batch order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricAccumulators {
    pub dice_scores: Vec<f64>,
    pub precisions: Vec<f64>,
    pub recalls: Vec<f64>,
    pub ce_losses: Vec<f64>,
}

impl MetricAccumulators {
    pub fn push(&mut self, m: BatchMetrics) {
        self.dice_scores.push(m.dice);
        self.precisions.push(m.precision);
        self.recalls.push(m.recall);
        self.ce_losses.push(m.ce_loss);
    }

    /// Number of batches recorded.
    pub fn len(&self) -> usize {
        self.dice_scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dice_scores.is_empty()
    }

    /// Means and population standard deviations; only the mean is kept for
    /// the cross-entropy loss.
    pub fn summarize(&self) -> Result<SummaryReport> {
        let stats = |values: &[f64]| Stats::of(values).ok_or(EvalError::EmptyTestSet);
        let dice = stats(&self.dice_scores)?;
        let precision = stats(&self.precisions)?;
        let recall = stats(&self.recalls)?;
        let ce = stats(&self.ce_losses)?;
        Ok(SummaryReport {
            dice_mean: dice.mean,
            dice_std: dice.std,
            precision_mean: precision.mean,
            precision_std: precision.std,
            recall_mean: recall.mean,
            recall_std: recall.std,
            ce_loss_mean: ce.mean,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn empty_accumulators_cannot_summarize() {
        let acc = MetricAccumulators::default();
        assert!(matches!(acc.summarize(), Err(EvalError::EmptyTestSet)));
    }

    #[test]
    fn summary_uses_population_std() {
        let mut acc = MetricAccumulators::default();
        acc.push(BatchMetrics { dice: 0.8, precision: 1.0, recall: 0.5, ce_loss: 10.0 });
        acc.push(BatchMetrics { dice: 0.6, precision: 1.0, recall: 1.0, ce_loss: 30.0 });
        assert_eq!(acc.len(), 2);

        let s = acc.summarize().unwrap();
        assert_abs_diff_eq!(s.dice_mean, 0.7, epsilon = 1e-12);
        assert_abs_diff_eq!(s.dice_std, 0.1, epsilon = 1e-12);
        assert_eq!(s.precision_mean, 1.0);
        assert_eq!(s.precision_std, 0.0);
        assert_abs_diff_eq!(s.recall_mean, 0.75, epsilon = 1e-12);
        assert_abs_diff_eq!(s.recall_std, 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(s.ce_loss_mean, 20.0, epsilon = 1e-12);
    }

    #[test]
    fn push_keeps_batch_order() {
        let mut acc = MetricAccumulators::default();
        for i in 0..4 {
            let v = i as f64;
            acc.push(BatchMetrics { dice: v, precision: v, recall: v, ce_loss: v });
        }
        assert_eq!(acc.ce_losses, vec![0.0, 1.0, 2.0, 3.0]);
    }
}
