//! Savitzky-Golay polynomial smoothing.
//!
//! Interior samples are convolved with the least-squares smoothing
//! coefficients of a centered window. The first and last half-windows are
//! taken from a polynomial fitted to the first and last full window, which
//! keeps the output the same length as the input without padding.

use ndarray::{Array1, ArrayView1};

use crate::math::matrix::MatrixHelper;
use crate::math::poly::{vandermonde, Polynomial};

#[derive(Debug, Clone)]
pub struct SavitzkyGolay {
    window: usize,
    order: usize,
    coefficients: Array1<f64>,
}

impl SavitzkyGolay {
    /// Build a filter for an odd `window` and a polynomial `order < window`.
    pub fn new(window: usize, order: usize) -> Option<Self> {
        if window % 2 == 0 || order >= window {
            return None;
        }
        let half = (window / 2) as f64;
        let offsets: Vec<f64> = (0..window).map(|i| i as f64 - half).collect();
        let design = vandermonde(&offsets, order);

        // Row 0 of (JᵀJ)⁻¹Jᵀ evaluates the fitted polynomial at the window center.
        let normal = design.t().dot(&design);
        let mut unit = Array1::<f64>::zeros(order + 1);
        unit[0] = 1.0;
        let weights = MatrixHelper::solve(normal.view(), unit.view())?;
        let coefficients = design.dot(&weights);

        Some(Self {
            window,
            order,
            coefficients,
        })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn coefficients(&self) -> ArrayView1<'_, f64> {
        self.coefficients.view()
    }

    /// Smooth `data`; inputs shorter than the window are returned unchanged.
    pub fn smooth(&self, data: &[f64]) -> Vec<f64> {
        let n = data.len();
        let half = self.window / 2;
        if n < self.window {
            return data.to_vec();
        }

        let mut out = vec![0.0; n];
        for (i, slot) in out.iter_mut().enumerate().take(n - half).skip(half) {
            *slot = self
                .coefficients
                .iter()
                .zip(&data[i - half..=i + half])
                .map(|(c, v)| c * v)
                .sum();
        }

        self.fill_edge(&data[..self.window], &mut out[..half], 0);
        let tail_start = n - self.window;
        self.fill_edge(&data[tail_start..], &mut out[n - half..], self.window - half);
        out
    }

    /// Fit `window_data` and write the fitted values for window positions
    /// `first..first + target.len()` into `target`.
    fn fill_edge(&self, window_data: &[f64], target: &mut [f64], first: usize) {
        let half = (self.window / 2) as f64;
        let offsets: Vec<f64> = (0..self.window).map(|i| i as f64 - half).collect();
        match Polynomial::fit(&offsets, window_data, self.order) {
            Some(poly) => {
                for (k, slot) in target.iter_mut().enumerate() {
                    *slot = poly.evaluate((first + k) as f64 - half);
                }
            }
            None => target.copy_from_slice(&window_data[first..first + target.len()]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coefficients_match_tabulated_cubic_window() {
        // Savitzky & Golay (1964), 5-point quadratic/cubic: (-3, 12, 17, 12, -3) / 35.
        let filter = SavitzkyGolay::new(5, 3).unwrap();
        let expected = [-3.0, 12.0, 17.0, 12.0, -3.0];
        for (c, e) in filter.coefficients().iter().zip(expected) {
            assert!((c - e / 35.0).abs() < 1e-12);
        }
    }

    #[test]
    fn cubic_signal_passes_through_unchanged() {
        let data: Vec<f64> = (0..40)
            .map(|i| {
                let x = i as f64 * 0.1;
                0.5 * x.powi(3) - x + 2.0
            })
            .collect();
        let filter = SavitzkyGolay::new(11, 3).unwrap();
        let smoothed = filter.smooth(&data);
        assert_eq!(smoothed.len(), data.len());
        for (s, d) in smoothed.iter().zip(&data) {
            assert!((s - d).abs() < 1e-8);
        }
    }

    #[test]
    fn constant_region_stays_bit_identical() {
        let mut data = vec![1.0; 200];
        data[150..].iter_mut().for_each(|v| *v = 0.5);
        let smoothed = SavitzkyGolay::new(51, 3).unwrap().smooth(&data);
        let reference = smoothed[30];
        assert!(smoothed[30..=124].iter().all(|&v| v == reference));
    }

    #[test]
    fn smoothing_reduces_sample_to_sample_variation() {
        let data: Vec<f64> = (0..200)
            .map(|i| (i as f64 * 0.05).sin() + 0.2 * ((i * 7 + 3) as f64).sin())
            .collect();
        let smoothed = SavitzkyGolay::new(21, 3).unwrap().smooth(&data);
        let roughness = |d: &[f64]| d.windows(2).map(|w| (w[1] - w[0]).powi(2)).sum::<f64>();
        assert!(roughness(&smoothed) < roughness(&data));
    }

    #[test]
    fn rejects_even_window_and_excessive_order() {
        assert!(SavitzkyGolay::new(4, 2).is_none());
        assert!(SavitzkyGolay::new(3, 3).is_none());
    }
}
