use crate::error::Result;
use crate::math::tensor::Tensor;

/// Binary cross-entropy over every element of two same-shaped tensors.
pub struct BceLoss;

/// Lower bound for each log term, so a confident wrong prediction costs 100
/// per element instead of infinity and exact agreement costs exactly 0.
const LOG_FLOOR: f64 = -100.0;

impl BceLoss {
    /// Scalar BCE: -mean(y·log(p) + (1-y)·log(1-p)), logs clamped at -100.
    pub fn loss(predicted: &[f64], expected: &[f64]) -> f64 {
        let n = predicted.len() as f64;
        predicted.iter().zip(expected.iter())
            .map(|(p, y)| {
                let log_p = p.ln().max(LOG_FLOOR);
                let log_q = (1.0 - p).ln().max(LOG_FLOOR);
                y * log_p + (1.0 - y) * log_q
            })
            .fold(0.0, |nll, log_likelihood| nll - log_likelihood) / n
    }

    pub fn forward(&self, predicted: &Tensor, target: &Tensor) -> Result<f64> {
        predicted.expect_same_shape(target, "BceLoss")?;
        Ok(BceLoss::loss(predicted.data(), target.data()))
    }
}
