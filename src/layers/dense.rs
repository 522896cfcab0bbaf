use rand::Rng;

use crate::{math::matrix::Matrix, activation::activation::ActivationFunction};
use crate::error::{EvalError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Layer{
    pub size: usize,
    pub weights: Matrix,
    pub biases: Matrix,
    pub activator: ActivationFunction
}

impl Layer {
    /// Fresh layer with Xavier weights and zero biases drawn from `rng`.
    pub fn new<R: Rng + ?Sized>(
        size: usize,
        input_size: usize,
        activation: ActivationFunction,
        rng: &mut R,
    ) -> Layer {
        Layer {
            size,
            weights: Matrix::xavier(input_size, size, rng),
            biases: Matrix::zeros(1, size),
            activator: activation
        }
    }

    pub fn input_size(&self) -> usize {
        self.weights.rows
    }

    /// a = act(x · W + b) for a single input row.
    pub fn feed_from(&self, input: &[f64]) -> Result<Vec<f64>> {
        if input.len() != self.input_size() {
            return Err(EvalError::shape("Layer::feed_from", &[self.input_size()], &[input.len()]));
        }
        let x = Matrix { rows: 1, cols: input.len(), data: vec![input.to_vec()] };
        let z = x.matmul(&self.weights)?.add(&self.biases)?;
        let a = z.map(|v| self.activator.function(v));
        Ok(a.data.into_iter().next().unwrap_or_default())
    }
}
