use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};

/// Where tensors and model parameters live.
///
/// Only the CPU backend is compiled into this crate, so `Cuda` can be named
/// (and rejected) but never selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    #[default]
    Cpu,
    Cuda,
}

impl Device {
    pub fn cuda_is_available() -> bool {
        false
    }

    /// Resolves the `--cuda` flag into a device, failing when a GPU was
    /// requested but none is available.
    pub fn select(use_cuda: bool) -> Result<Device> {
        match (use_cuda, Device::cuda_is_available()) {
            (true, true) => Ok(Device::Cuda),
            (true, false) => Err(EvalError::CudaUnavailable),
            (false, _) => Ok(Device::Cpu),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda => write!(f, "cuda"),
        }
    }
}
