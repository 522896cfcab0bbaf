use rand::Rng;
use serde::{Serialize, Deserialize};
use std::f64::consts::PI;

use crate::error::{EvalError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix{
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<Vec<f64>>
}

impl Matrix{
    pub fn zeros(rows: usize, cols: usize) -> Matrix {
        Matrix{
            rows,
            cols,
            data: vec![vec![0.0; cols]; rows]
        }
    }

    /// Samples a single value from N(0, 1) using the Box-Muller transform.
    fn sample_standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
        // Uniform samples in (0, 1] to avoid log(0).
        let u1: f64 = 1.0 - rng.gen::<f64>();
        let u2: f64 = 1.0 - rng.gen::<f64>();
        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }

    /// Xavier (Glorot) initialization: samples from N(0, sqrt(1 / rows)).
    ///
    /// Shape: (rows, cols). `rows` is the fan-in, matching the `x · W`
    /// convention used by the dense layer.
    pub fn xavier<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Matrix {
        let std_dev = (1.0 / rows.max(1) as f64).sqrt();
        let mut res = Matrix::zeros(rows, cols);
        for i in 0..rows {
            for j in 0..cols {
                res.data[i][j] = Matrix::sample_standard_normal(rng) * std_dev;
            }
        }
        res
    }

    /// Row-major flat copy of the contents.
    pub fn to_flat(&self) -> Vec<f64> {
        self.data.iter().flatten().copied().collect()
    }

    /// Inverse of `to_flat`.
    pub fn from_flat(rows: usize, cols: usize, flat: &[f64]) -> Result<Matrix> {
        if rows * cols != flat.len() {
            return Err(EvalError::shape("Matrix::from_flat", &[rows, cols], &[flat.len()]));
        }
        let data = if cols == 0 {
            vec![Vec::new(); rows]
        } else {
            flat.chunks(cols).map(|c| c.to_vec()).collect()
        };
        Ok(Matrix { rows, cols, data })
    }

    pub fn map<F>(&self, functor: F) -> Matrix
    where
        F: Fn(f64) -> f64,
    {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data
                .iter()
                .map(|row| row.iter().map(|&x| functor(x)).collect())
                .collect(),
        }
    }

    pub fn add(&self, rhs: &Matrix) -> Result<Matrix> {
        if self.rows != rhs.rows || self.cols != rhs.cols {
            return Err(EvalError::shape(
                "Matrix::add",
                &[self.rows, self.cols],
                &[rhs.rows, rhs.cols],
            ));
        }

        let mut res = Matrix::zeros(self.rows, self.cols);

        for i in 0..self.rows {
            for j in 0..self.cols {
                res.data[i][j] = self.data[i][j] + rhs.data[i][j];
            }
        }

        Ok(res)
    }

    pub fn matmul(&self, rhs: &Matrix) -> Result<Matrix> {
        if self.cols != rhs.rows {
            return Err(EvalError::shape(
                "Matrix::matmul",
                &[self.rows, self.cols],
                &[rhs.rows, rhs.cols],
            ));
        }

        let mut res = Matrix::zeros(self.rows, rhs.cols);

        for i in 0..res.rows {
            for j in 0..res.cols {
                let mut sum = 0.0;

                for k in 0..self.cols {
                    sum += self.data[i][k] * rhs.data[k][j];
                }

                res.data[i][j] = sum;
            }
        }

        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn matmul_checks_inner_dimension() {
        let a = Matrix::zeros(2, 3);
        let b = Matrix::zeros(2, 3);
        assert!(a.matmul(&b).is_err());
        assert_eq!(a.matmul(&Matrix::zeros(3, 4)).unwrap().cols, 4);
    }

    #[test]
    fn matmul_values() {
        let a = Matrix::from_flat(1, 2, &[1.0, 2.0]).unwrap();
        let b = Matrix::from_flat(2, 1, &[3.0, 4.0]).unwrap();
        assert_eq!(a.matmul(&b).unwrap().data, vec![vec![11.0]]);
    }

    #[test]
    fn xavier_is_deterministic_for_a_seed() {
        let a = Matrix::xavier(4, 3, &mut StdRng::seed_from_u64(7));
        let b = Matrix::xavier(4, 3, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn flat_round_trip() {
        let m = Matrix::from_flat(2, 2, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(m.data, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        assert_eq!(m.to_flat(), vec![1.0, 2.0, 3.0, 4.0]);
        assert!(Matrix::from_flat(2, 2, &[1.0; 3]).is_err());
    }
}
