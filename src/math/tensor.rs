use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};
use crate::math::device::Device;

/// Dense N-d tensor stored row-major, e.g. `[batch, channels, height, width]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<f64>,
    device: Device,
}

/// Serializable form of a tensor, used inside state dicts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorRecord {
    pub shape: Vec<usize>,
    pub data: Vec<f64>,
}

impl Tensor {
    pub fn zeros(shape: &[usize]) -> Tensor {
        Tensor {
            shape: shape.to_vec(),
            data: vec![0.0; shape.iter().product()],
            device: Device::Cpu,
        }
    }

    /// Wraps `data` with the given shape; fails unless the element counts agree.
    pub fn from_vec(shape: &[usize], data: Vec<f64>) -> Result<Tensor> {
        let numel: usize = shape.iter().product();
        if numel != data.len() {
            return Err(EvalError::shape("Tensor::from_vec", &[numel], &[data.len()]));
        }
        Ok(Tensor { shape: shape.to_vec(), data, device: Device::Cpu })
    }

    pub fn dims(&self) -> &[usize] {
        &self.shape
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn device(&self) -> Device {
        self.device
    }

    /// Moves the tensor to `device`. Placement is bookkeeping only: every
    /// device shares host memory in this backend.
    pub fn to_device(mut self, device: Device) -> Tensor {
        self.device = device;
        self
    }

    pub fn map<F>(&self, f: F) -> Tensor
    where
        F: Fn(f64) -> f64,
    {
        Tensor {
            shape: self.shape.clone(),
            data: self.data.iter().map(|&x| f(x)).collect(),
            device: self.device,
        }
    }

    /// Binarizes: 1.0 where the value is strictly greater than `t`, else 0.0.
    pub fn threshold(&self, t: f64) -> Tensor {
        self.map(|x| if x > t { 1.0 } else { 0.0 })
    }

    /// Returns a 1-D copy of the tensor in row-major order.
    pub fn flatten(&self) -> Vec<f64> {
        self.data.clone()
    }

    /// Stacks same-shaped tensors along a new leading axis.
    pub fn stack(items: &[Tensor]) -> Result<Tensor> {
        let first = items
            .first()
            .ok_or_else(|| EvalError::shape("Tensor::stack", &[1], &[0]))?;
        let mut data = Vec::with_capacity(first.numel() * items.len());
        for item in items {
            if item.shape != first.shape {
                return Err(EvalError::shape("Tensor::stack", &first.shape, &item.shape));
            }
            data.extend_from_slice(&item.data);
        }
        let mut shape = Vec::with_capacity(first.shape.len() + 1);
        shape.push(items.len());
        shape.extend_from_slice(&first.shape);
        Ok(Tensor { shape, data, device: first.device })
    }

    /// Fails with a shape error naming `context` unless both tensors agree.
    pub fn expect_same_shape(&self, other: &Tensor, context: &'static str) -> Result<()> {
        if self.shape != other.shape {
            return Err(EvalError::shape(context, &self.shape, &other.shape));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_vec_rejects_wrong_length() {
        assert!(Tensor::from_vec(&[2, 3], vec![0.0; 5]).is_err());
        assert!(Tensor::from_vec(&[2, 3], vec![0.0; 6]).is_ok());
    }

    #[test]
    fn threshold_is_strict() {
        let t = Tensor::from_vec(&[4], vec![0.49, 0.5, 0.51, 1.0]).unwrap();
        assert_eq!(t.threshold(0.5).data(), &[0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn stack_adds_leading_axis() {
        let a = Tensor::from_vec(&[1, 2], vec![1.0, 2.0]).unwrap();
        let b = Tensor::from_vec(&[1, 2], vec![3.0, 4.0]).unwrap();
        let s = Tensor::stack(&[a, b]).unwrap();
        assert_eq!(s.dims(), &[2, 1, 2]);
        assert_eq!(s.data(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn stack_rejects_mixed_shapes() {
        let a = Tensor::zeros(&[1, 2]);
        let b = Tensor::zeros(&[2, 1]);
        assert!(matches!(
            Tensor::stack(&[a, b]),
            Err(EvalError::ShapeMismatch { .. })
        ));
    }
}
