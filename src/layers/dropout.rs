use rand::Rng;

/// Inverted dropout. Active only while the owning model is in training mode;
/// in evaluation mode it passes values through untouched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dropout {
    pub p: f64,
}

impl Dropout {
    pub fn new(p: f64) -> Dropout {
        Dropout { p: p.clamp(0.0, 1.0) }
    }

    pub fn apply<R: Rng + ?Sized>(&self, values: &mut [f64], training: bool, rng: &mut R) {
        if !training || self.p == 0.0 {
            return;
        }
        if self.p >= 1.0 {
            values.iter_mut().for_each(|v| *v = 0.0);
            return;
        }
        let keep = 1.0 - self.p;
        for v in values.iter_mut() {
            if rng.gen::<f64>() < self.p {
                *v = 0.0;
            } else {
                *v /= keep;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn eval_mode_is_identity() {
        let mut v = vec![1.0, 2.0, 3.0];
        Dropout::new(0.9).apply(&mut v, false, &mut StdRng::seed_from_u64(0));
        assert_eq!(v, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn train_mode_zeroes_or_rescales() {
        let mut v = vec![1.0; 64];
        Dropout::new(0.5).apply(&mut v, true, &mut StdRng::seed_from_u64(3));
        assert!(v.iter().all(|&x| x == 0.0 || x == 2.0));
        assert!(v.iter().any(|&x| x == 0.0));
    }
}
