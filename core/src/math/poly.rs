use ndarray::{Array1, Array2, ArrayView1};

use crate::math::matrix::MatrixHelper;

/// Polynomial with coefficients in ascending order of power.
#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial {
    coefficients: Array1<f64>,
}

impl Polynomial {
    /// Least-squares fit of a polynomial of the given degree.
    pub fn fit(x: &[f64], y: &[f64], degree: usize) -> Option<Self> {
        if x.len() != y.len() || x.len() <= degree {
            return None;
        }
        let design = vandermonde(x, degree);
        let rhs = ArrayView1::from(y);
        let coefficients = MatrixHelper::least_squares(design.view(), rhs)?;
        Some(Self { coefficients })
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, &c| acc * x + c)
    }

    pub fn coefficients(&self) -> ArrayView1<'_, f64> {
        self.coefficients.view()
    }
}

/// Design matrix with `row[k] = x^k` for `k` in `0..=degree`.
pub fn vandermonde(x: &[f64], degree: usize) -> Array2<f64> {
    Array2::from_shape_fn((x.len(), degree + 1), |(row, power)| {
        x[row].powi(power as i32)
    })
}
