use std::ops::{Deref, DerefMut};

use crate::network::segmentation::SegmentationNet;

/// Disables activation recording on a model for as long as the guard lives.
///
/// The previous setting is restored on drop, including when the scope is left
/// early through `?`.
pub struct NoGradGuard<'a> {
    model: &'a mut SegmentationNet,
    previous: bool,
}

impl<'a> NoGradGuard<'a> {
    pub fn new(model: &'a mut SegmentationNet) -> NoGradGuard<'a> {
        let previous = model.set_grad_enabled(false);
        NoGradGuard { model, previous }
    }
}

impl Deref for NoGradGuard<'_> {
    type Target = SegmentationNet;

    fn deref(&self) -> &SegmentationNet {
        self.model
    }
}

impl DerefMut for NoGradGuard<'_> {
    fn deref_mut(&mut self) -> &mut SegmentationNet {
        self.model
    }
}

impl Drop for NoGradGuard<'_> {
    fn drop(&mut self) {
        self.model.set_grad_enabled(self.previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EvalError, Result};
    use crate::math::tensor::Tensor;
    use crate::network::segmentation::NetConfig;
    use rand::{rngs::StdRng, SeedableRng};

    fn model() -> SegmentationNet {
        SegmentationNet::new(NetConfig::default(), &mut StdRng::seed_from_u64(3))
    }

    #[test]
    fn disables_then_restores() {
        let mut net = model();
        assert!(net.grad_enabled());
        {
            let mut guard = NoGradGuard::new(&mut net);
            assert!(!guard.grad_enabled());
            guard.forward(&Tensor::zeros(&[1, 1, 2, 2])).unwrap();
            assert!(guard.network().recorded_activations().is_empty());
        }
        assert!(net.grad_enabled());
    }

    #[test]
    fn nested_guard_keeps_outer_setting() {
        let mut net = model();
        let mut outer = NoGradGuard::new(&mut net);
        {
            let inner = NoGradGuard::new(&mut outer);
            assert!(!inner.grad_enabled());
        }
        assert!(!outer.grad_enabled());
        drop(outer);
        assert!(net.grad_enabled());
    }

    #[test]
    fn restores_on_early_return() {
        fn failing(net: &mut SegmentationNet) -> Result<()> {
            let mut guard = NoGradGuard::new(net);
            guard.forward(&Tensor::zeros(&[1, 3, 2, 2]))?;
            Ok(())
        }
        let mut net = model();
        assert!(matches!(failing(&mut net), Err(EvalError::ShapeMismatch { .. })));
        assert!(net.grad_enabled());
    }
}
