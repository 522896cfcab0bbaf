use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::activation::activation::ActivationFunction;
use crate::error::Result;
use crate::layers::{dense::Layer, dropout::Dropout};
use crate::math::matrix::Matrix;
use crate::math::tensor::TensorRecord;
use crate::network::state_dict::StateDict;

/// Stack of dense layers with dropout between hidden layers.
#[derive(Debug, Clone)]
pub struct Network {
    pub layers: Vec<Layer>,
    pub dropout: Dropout,
    training: bool,
    grad_enabled: bool,
    /// Per-layer outputs of the most recent forward pass, kept only while
    /// gradient recording is enabled.
    activations: Vec<Vec<f64>>,
    rng: StdRng,
}

impl Network {
    /// Builds a network from (size, input_size, activation) tuples.
    pub fn new<R: Rng + ?Sized>(
        layer_specs: Vec<(usize, usize, ActivationFunction)>,
        dropout: Dropout,
        rng: &mut R,
    ) -> Network {
        let layers = layer_specs.into_iter()
            .map(|(size, input_size, activation)| Layer::new(size, input_size, activation, rng))
            .collect();
        Network {
            layers,
            dropout,
            training: true,
            grad_enabled: true,
            activations: Vec::new(),
            rng: StdRng::seed_from_u64(rng.gen()),
        }
    }

    pub fn is_training(&self) -> bool {
        self.training
    }

    pub fn set_training(&mut self, training: bool) {
        self.training = training;
    }

    pub fn grad_enabled(&self) -> bool {
        self.grad_enabled
    }

    /// Switches gradient recording and returns the previous setting.
    pub fn set_grad_enabled(&mut self, enabled: bool) -> bool {
        let previous = self.grad_enabled;
        self.grad_enabled = enabled;
        if !enabled {
            self.activations.clear();
        }
        previous
    }

    /// Activations recorded by the last forward pass (empty under no-grad).
    pub fn recorded_activations(&self) -> &[Vec<f64>] {
        &self.activations
    }

    /// Runs one input row through every layer. The input is borrowed; only
    /// layer outputs are allocated.
    pub fn forward(&mut self, input: &[f64]) -> Result<Vec<f64>> {
        let last = self.layers.len().saturating_sub(1);
        let record = self.grad_enabled;
        if record {
            self.activations.clear();
        }
        let mut current: Option<Vec<f64>> = None;
        for (i, layer) in self.layers.iter().enumerate() {
            let mut out = layer.feed_from(current.as_deref().unwrap_or(input))?;
            if i < last {
                self.dropout.apply(&mut out, self.training, &mut self.rng);
            }
            if record {
                self.activations.push(out.clone());
            }
            current = Some(out);
        }
        Ok(current.unwrap_or_else(|| input.to_vec()))
    }

    /// Named parameters under `prefix`, e.g. `layers.0.weight`.
    pub fn state_dict(&self, prefix: &str) -> StateDict {
        let mut dict = StateDict::default();
        for (i, layer) in self.layers.iter().enumerate() {
            dict.insert(
                format!("{prefix}{i}.weight"),
                TensorRecord {
                    shape: vec![layer.weights.rows, layer.weights.cols],
                    data: layer.weights.to_flat(),
                },
            );
            dict.insert(
                format!("{prefix}{i}.bias"),
                TensorRecord { shape: vec![layer.size], data: layer.biases.to_flat() },
            );
        }
        dict
    }

    /// Copies parameters out of `dict`. Every layer must find a weight and a
    /// bias of exactly its own shape; leftover keys are reported by the caller.
    pub fn load_state_dict(&mut self, prefix: &str, dict: &StateDict) -> Result<()> {
        for (i, layer) in self.layers.iter_mut().enumerate() {
            let w_key = format!("{prefix}{i}.weight");
            let b_key = format!("{prefix}{i}.bias");
            let weight = dict.require(&w_key, &[layer.weights.rows, layer.weights.cols])?;
            let bias = dict.require(&b_key, &[layer.size])?;
            layer.weights = Matrix::from_flat(layer.weights.rows, layer.weights.cols, &weight.data)?;
            layer.biases = Matrix::from_flat(1, layer.size, &bias.data)?;
        }
        Ok(())
    }
}
