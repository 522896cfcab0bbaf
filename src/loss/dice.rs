use crate::error::{EvalError, Result};
use crate::math::tensor::Tensor;

const SMOOTH: f64 = 1e-5;

/// Soft Dice loss computed separately for each channel of `[B, K, H, W]`
/// tensors, pooling the batch and spatial axes.
pub struct DiceChannelLoss {
    pub smooth: f64,
}

impl Default for DiceChannelLoss {
    fn default() -> Self {
        DiceChannelLoss { smooth: SMOOTH }
    }
}

impl DiceChannelLoss {
    /// Returns `(mean loss over channels, per-channel losses)` where each
    /// channel loss is `1 - (2·Σpt + s) / (Σp + Σt + s)`.
    pub fn forward(&self, predicted: &Tensor, target: &Tensor) -> Result<(f64, Vec<f64>)> {
        predicted.expect_same_shape(target, "DiceChannelLoss")?;
        let dims = predicted.dims();
        if dims.len() < 2 {
            return Err(EvalError::shape("DiceChannelLoss", &[0, 0], dims));
        }
        let (batch, channels) = (dims[0], dims[1]);
        let plane: usize = dims[2..].iter().product();

        let (p, t) = (predicted.data(), target.data());
        let mut inter = vec![0.0; channels];
        let mut p_sum = vec![0.0; channels];
        let mut t_sum = vec![0.0; channels];
        for b in 0..batch {
            for c in 0..channels {
                let start = (b * channels + c) * plane;
                for i in start..start + plane {
                    inter[c] += p[i] * t[i];
                    p_sum[c] += p[i];
                    t_sum[c] += t[i];
                }
            }
        }

        let per_channel: Vec<f64> = (0..channels)
            .map(|c| 1.0 - (2.0 * inter[c] + self.smooth) / (p_sum[c] + t_sum[c] + self.smooth))
            .collect();
        let mean = if channels == 0 {
            0.0
        } else {
            per_channel.iter().sum::<f64>() / channels as f64
        };
        Ok((mean, per_channel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn mask(data: Vec<f64>, k: usize) -> Tensor {
        let n = data.len() / k;
        Tensor::from_vec(&[1, k, 1, n], data).unwrap()
    }

    #[test]
    fn perfect_overlap_is_zero_loss() {
        let t = mask(vec![1.0, 0.0, 1.0, 1.0], 1);
        let (loss, per) = DiceChannelLoss::default().forward(&t, &t).unwrap();
        assert_eq!(loss, 0.0);
        assert_eq!(per, vec![0.0]);
    }

    #[test]
    fn empty_prediction_and_target_is_perfect() {
        let t = mask(vec![0.0; 4], 1);
        let (loss, _) = DiceChannelLoss::default().forward(&t, &t).unwrap();
        assert_eq!(loss, 0.0);
    }

    #[test]
    fn disjoint_masks_are_near_one() {
        let p = mask(vec![1.0, 1.0, 0.0, 0.0], 1);
        let t = mask(vec![0.0, 0.0, 1.0, 1.0], 1);
        let (loss, _) = DiceChannelLoss::default().forward(&p, &t).unwrap();
        assert_abs_diff_eq!(loss, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn channels_are_scored_separately() {
        // channel 0 perfect, channel 1 half overlap: dice = 2·1 / (1 + 2)
        let p = mask(vec![1.0, 0.0, 1.0, 0.0], 2);
        let t = mask(vec![1.0, 0.0, 1.0, 1.0], 2);
        let (loss, per) = DiceChannelLoss::default().forward(&p, &t).unwrap();
        assert_abs_diff_eq!(per[0], 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(per[1], 1.0 / 3.0, epsilon = 1e-5);
        assert_abs_diff_eq!(loss, 1.0 / 6.0, epsilon = 1e-5);
    }
}
