use crate::error::Result;
use crate::math::device::Device;
use crate::math::tensor::Tensor;

/// One image/mask pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// `[C, H, W]`, values in `[0, 1]`.
    pub input: Tensor,
    /// `[K, H, W]`, values in `{0, 1}`.
    pub target: Tensor,
    pub name: String,
}

/// A collated group of samples: `input` is `[B, C, H, W]`, `target` is
/// `[B, K, H, W]`, `names` keeps the sample order.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub input: Tensor,
    pub target: Tensor,
    pub names: Vec<String>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn to_device(self, device: Device) -> Batch {
        Batch {
            input: self.input.to_device(device),
            target: self.target.to_device(device),
            names: self.names,
        }
    }
}

/// Stacks samples into a batch. All inputs (and all targets) must share a
/// shape, so mixed image sizes fail here rather than inside the model.
pub fn collate(samples: Vec<Sample>) -> Result<Batch> {
    let mut inputs = Vec::with_capacity(samples.len());
    let mut targets = Vec::with_capacity(samples.len());
    let mut names = Vec::with_capacity(samples.len());
    for s in samples {
        inputs.push(s.input);
        targets.push(s.target);
        names.push(s.name);
    }
    Ok(Batch {
        input: Tensor::stack(&inputs)?,
        target: Tensor::stack(&targets)?,
        names,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(name: &str, h: usize, w: usize) -> Sample {
        Sample {
            input: Tensor::zeros(&[1, h, w]),
            target: Tensor::zeros(&[1, h, w]),
            name: name.into(),
        }
    }

    #[test]
    fn collate_stacks_in_order() {
        let batch = collate(vec![sample("a", 2, 2), sample("b", 2, 2)]).unwrap();
        assert_eq!(batch.input.dims(), &[2, 1, 2, 2]);
        assert_eq!(batch.names, vec!["a", "b"]);
    }

    #[test]
    fn collate_rejects_mixed_sizes() {
        assert!(collate(vec![sample("a", 2, 2), sample("b", 3, 2)]).is_err());
    }
}
