use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::activation::activation::ActivationFunction;
use crate::error::{EvalError, Result};
use crate::layers::dropout::Dropout;
use crate::math::device::Device;
use crate::math::tensor::Tensor;
use crate::network::network::Network;
use crate::network::state_dict::StateDict;

const PARAM_PREFIX: &str = "layers.";

/// Architecture of a `SegmentationNet`.
///
/// The parameters themselves live in the state dict; this describes only the
/// shapes needed to rebuild the model before loading them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetConfig {
    /// Image channels: 1 for grayscale, 3 for RGB.
    pub in_channels: usize,
    /// Output mask channels, one sigmoid probability each.
    pub n_classes: usize,
    /// Neighbourhood radius; each pixel sees a `(2r+1)²` window.
    pub patch_radius: usize,
    pub hidden: Vec<usize>,
    pub dropout: f64,
}

impl Default for NetConfig {
    fn default() -> Self {
        NetConfig {
            in_channels: 1,
            n_classes: 1,
            patch_radius: 1,
            hidden: vec![16, 16],
            dropout: 0.1,
        }
    }
}

impl NetConfig {
    pub fn with_classes(n_classes: usize) -> Self {
        NetConfig { n_classes, ..NetConfig::default() }
    }

    /// Length of the flattened patch fed to the first layer.
    pub fn patch_len(&self) -> usize {
        let side = 2 * self.patch_radius + 1;
        self.in_channels * side * side
    }

    fn layer_specs(&self) -> Vec<(usize, usize, ActivationFunction)> {
        let mut specs = Vec::with_capacity(self.hidden.len() + 1);
        let mut input = self.patch_len();
        for &size in &self.hidden {
            specs.push((size, input, ActivationFunction::ReLU));
            input = size;
        }
        specs.push((self.n_classes, input, ActivationFunction::Sigmoid));
        specs
    }
}

/// Patch-wise segmentation network: the same MLP slides over every pixel,
/// mapping its zero-padded neighbourhood to `n_classes` probabilities.
///
/// Input `[B, C, H, W]`, output `[B, K, H, W]` with values in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct SegmentationNet {
    config: NetConfig,
    network: Network,
    device: Device,
}

impl SegmentationNet {
    /// Builds a freshly initialised model in training mode. Parameters are
    /// drawn from `rng`, so a seeded rng gives a reproducible model.
    pub fn new<R: Rng + ?Sized>(config: NetConfig, rng: &mut R) -> SegmentationNet {
        let network = Network::new(config.layer_specs(), Dropout::new(config.dropout), rng);
        SegmentationNet { config, network, device: Device::Cpu }
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn to_device(mut self, device: Device) -> SegmentationNet {
        self.device = device;
        self
    }

    /// Switches to inference behaviour (dropout disabled).
    pub fn eval(&mut self) {
        self.network.set_training(false);
    }

    pub fn is_training(&self) -> bool {
        self.network.is_training()
    }

    pub fn grad_enabled(&self) -> bool {
        self.network.grad_enabled()
    }

    pub fn set_grad_enabled(&mut self, enabled: bool) -> bool {
        self.network.set_grad_enabled(enabled)
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn forward(&mut self, input: &Tensor) -> Result<Tensor> {
        let dims = input.dims();
        if dims.len() != 4 || dims[1] != self.config.in_channels {
            return Err(EvalError::shape(
                "SegmentationNet::forward",
                &[0, self.config.in_channels, 0, 0],
                dims,
            ));
        }
        let (batch, channels, height, width) = (dims[0], dims[1], dims[2], dims[3]);
        let k = self.config.n_classes;
        let r = self.config.patch_radius as isize;
        let data = input.data();

        let mut out = vec![0.0; batch * k * height * width];
        let mut patch = Vec::with_capacity(self.config.patch_len());

        for b in 0..batch {
            for y in 0..height {
                for x in 0..width {
                    patch.clear();
                    for c in 0..channels {
                        let plane = (b * channels + c) * height * width;
                        for dy in -r..=r {
                            for dx in -r..=r {
                                let (py, px) = (y as isize + dy, x as isize + dx);
                                let inside = py >= 0
                                    && px >= 0
                                    && (py as usize) < height
                                    && (px as usize) < width;
                                patch.push(if inside {
                                    data[plane + py as usize * width + px as usize]
                                } else {
                                    0.0
                                });
                            }
                        }
                    }
                    let probs = self.network.forward(&patch)?;
                    if probs.len() != k {
                        return Err(EvalError::shape("SegmentationNet::forward", &[k], &[probs.len()]));
                    }
                    for (class, p) in probs.into_iter().enumerate() {
                        out[((b * k + class) * height + y) * width + x] = p;
                    }
                }
            }
        }

        Ok(Tensor::from_vec(&[batch, k, height, width], out)?.to_device(self.device))
    }

    pub fn state_dict(&self) -> StateDict {
        self.network.state_dict(PARAM_PREFIX)
    }

    /// Strict load: every parameter must be present with the right shape and
    /// the checkpoint may not carry parameters this model does not have.
    pub fn load_state_dict(&mut self, dict: &StateDict) -> Result<()> {
        let expected = self.state_dict();
        if let Some(extra) = dict.keys().find(|k| expected.get(k).is_none()) {
            return Err(EvalError::StateDict(format!("unexpected key `{extra}`")));
        }
        self.network.load_state_dict(PARAM_PREFIX, dict)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.state_dict().save(path)
    }
}
