//! Binary precision and recall over flattened masks.
//!
//! Positive label is 1. When a ratio is undefined (no predicted positives for
//! precision, no actual positives for recall) the `ZeroDivision` policy
//! supplies the value.

use crate::error::{EvalError, Result};

/// Value reported for an undefined precision or recall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZeroDivision {
    Zero,
    #[default]
    One,
}

impl ZeroDivision {
    fn value(self) -> f64 {
        match self {
            ZeroDivision::Zero => 0.0,
            ZeroDivision::One => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BinaryConfusion {
    pub tp: usize,
    pub fp: usize,
    pub fn_: usize,
    pub tn: usize,
}

impl BinaryConfusion {
    /// Tallies `(target, predicted)` pairs. Both slices must hold only 0 or 1.
    pub fn from_labels(target: &[f64], predicted: &[f64]) -> Result<BinaryConfusion> {
        if target.len() != predicted.len() {
            return Err(EvalError::shape(
                "BinaryConfusion::from_labels",
                &[target.len()],
                &[predicted.len()],
            ));
        }
        let mut counts = BinaryConfusion::default();
        for (&t, &p) in target.iter().zip(predicted.iter()) {
            match (as_binary(t)?, as_binary(p)?) {
                (true, true) => counts.tp += 1,
                (false, true) => counts.fp += 1,
                (true, false) => counts.fn_ += 1,
                (false, false) => counts.tn += 1,
            }
        }
        Ok(counts)
    }

    pub fn precision(&self, zero_division: ZeroDivision) -> f64 {
        ratio(self.tp, self.tp + self.fp, zero_division)
    }

    pub fn recall(&self, zero_division: ZeroDivision) -> f64 {
        ratio(self.tp, self.tp + self.fn_, zero_division)
    }
}

fn as_binary(v: f64) -> Result<bool> {
    if v == 1.0 {
        Ok(true)
    } else if v == 0.0 {
        Ok(false)
    } else {
        Err(EvalError::NonBinaryLabels { value: v })
    }
}

fn ratio(num: usize, den: usize, zero_division: ZeroDivision) -> f64 {
    if den == 0 {
        zero_division.value()
    } else {
        num as f64 / den as f64
    }
}
