use indicatif::ProgressBar;
use tracing::{debug, warn};

use crate::dataset::loader::DataLoader;
use crate::dataset::sample::Batch;
use crate::error::Result;
use crate::eval::accumulator::{BatchMetrics, MetricAccumulators};
use crate::eval::no_grad::NoGradGuard;
use crate::loss::{bce::BceLoss, dice::DiceChannelLoss};
use crate::math::device::Device;
use crate::metrics::classification::{BinaryConfusion, ZeroDivision};
use crate::network::segmentation::SegmentationNet;

/// Probabilities strictly above this become foreground.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Scores a model batch by batch against ground-truth masks.
pub struct Evaluator {
    pub device: Device,
    pub threshold: f64,
    pub zero_division: ZeroDivision,
    pub bce: BceLoss,
    pub dice: DiceChannelLoss,
}

impl Evaluator {
    pub fn new(device: Device) -> Evaluator {
        Evaluator {
            device,
            threshold: DEFAULT_THRESHOLD,
            zero_division: ZeroDivision::default(),
            bce: BceLoss,
            dice: DiceChannelLoss::default(),
        }
    }

    // -----------------------------------------------------------------------
    // Public entry point
    // -----------------------------------------------------------------------

    /// Runs one pass over `loader` and returns the per-batch metrics in
    /// delivery order.
    ///
    /// Activation recording is switched off for the whole pass and restored
    /// afterwards. The first failing batch aborts the pass; nothing is
    /// skipped or retried. `progress` is advanced once per batch and left
    /// for the caller to finish.
    pub fn run(
        &self,
        model: &mut SegmentationNet,
        loader: &DataLoader,
        progress: &ProgressBar,
    ) -> Result<MetricAccumulators> {
        if model.is_training() {
            warn!("model is in training mode; dropout stays active during evaluation");
        }
        let mut model = NoGradGuard::new(model);
        let mut acc = MetricAccumulators::default();
        for (index, batch) in loader.iter().enumerate() {
            let metrics = self.evaluate_batch(&mut model, batch?)?;
            debug!(
                batch = index,
                dice = metrics.dice,
                precision = metrics.precision,
                recall = metrics.recall,
                bce = metrics.ce_loss,
                "batch evaluated"
            );
            acc.push(metrics);
            progress.inc(1);
        }
        Ok(acc)
    }

    /// Forward, threshold, then score one batch.
    ///
    /// Cross-entropy is taken between the thresholded prediction and the
    /// target, so it measures hard disagreements (100 per wrong pixel).
    pub fn evaluate_batch(&self, model: &mut SegmentationNet, batch: Batch) -> Result<BatchMetrics> {
        let batch = batch.to_device(self.device);
        let probs = model.forward(&batch.input)?;
        probs.expect_same_shape(&batch.target, "Evaluator::evaluate_batch")?;
        let pred = probs.threshold(self.threshold);

        let ce_loss = self.bce.forward(&pred, &batch.target)?;
        let (dice_loss, _) = self.dice.forward(&pred, &batch.target)?;
        let counts = BinaryConfusion::from_labels(&batch.target.flatten(), &pred.flatten())?;

        Ok(BatchMetrics {
            dice: 1.0 - dice_loss,
            precision: counts.precision(self.zero_division),
            recall: counts.recall(self.zero_division),
            ce_loss,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::tensor::Tensor;
    use crate::network::segmentation::NetConfig;
    use rand::{rngs::StdRng, SeedableRng};

    /// Model whose head ignores its input and always emits `sigmoid(bias)`.
    fn constant_model(bias: f64) -> SegmentationNet {
        let mut net = SegmentationNet::new(NetConfig::default(), &mut StdRng::seed_from_u64(5));
        let mut dict = net.state_dict();
        let head = NetConfig::default().hidden.len();
        for v in &mut dict.get_mut(&format!("layers.{head}.weight")).unwrap().data {
            *v = 0.0;
        }
        dict.get_mut(&format!("layers.{head}.bias")).unwrap().data = vec![bias];
        net.load_state_dict(&dict).unwrap();
        net.eval();
        net
    }

    fn batch(target: Vec<f64>) -> Batch {
        let n = target.len();
        Batch {
            input: Tensor::zeros(&[1, 1, 1, n]),
            target: Tensor::from_vec(&[1, 1, 1, n], target).unwrap(),
            names: vec!["a.png".into()],
        }
    }

    #[test]
    fn perfect_prediction_scores_one() {
        let mut net = constant_model(50.0);
        let m = Evaluator::new(Device::Cpu)
            .evaluate_batch(&mut net, batch(vec![1.0; 4]))
            .unwrap();
        assert_eq!(m.precision, 1.0);
        assert_eq!(m.recall, 1.0);
        assert_eq!(m.ce_loss, 0.0);
        assert!((m.dice - 1.0).abs() < 1e-9);
    }

    #[test]
    fn complement_prediction_scores_zero() {
        // predicts all background against an all-foreground mask
        let mut net = constant_model(-50.0);
        let m = Evaluator::new(Device::Cpu)
            .evaluate_batch(&mut net, batch(vec![1.0; 4]))
            .unwrap();
        // no predicted positives: precision falls back to the policy value
        assert_eq!(m.precision, 1.0);
        assert_eq!(m.recall, 0.0);
        assert_eq!(m.ce_loss, 100.0);
        assert!(m.dice < 1e-5);
    }

    #[test]
    fn probability_of_exactly_half_is_background() {
        let mut net = constant_model(0.0);
        let m = Evaluator::new(Device::Cpu)
            .evaluate_batch(&mut net, batch(vec![0.0, 0.0]))
            .unwrap();
        assert_eq!(m.ce_loss, 0.0);
        assert_eq!(m.recall, 1.0);
    }

    #[test]
    fn non_binary_target_aborts() {
        let mut net = constant_model(50.0);
        let err = Evaluator::new(Device::Cpu)
            .evaluate_batch(&mut net, batch(vec![0.5, 1.0]))
            .unwrap_err();
        assert!(matches!(err, crate::error::EvalError::NonBinaryLabels { .. }));
    }
}
