use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};

pub struct MatrixHelper;

impl MatrixHelper {
    /// Solve the square system `a * x = b` by Gauss-Jordan elimination with
    /// partial pivoting. Returns `None` when the system is singular.
    pub fn solve(a: ArrayView2<f64>, b: ArrayView1<f64>) -> Option<Array1<f64>> {
        let n = a.nrows();
        if n == 0 || a.ncols() != n || b.len() != n {
            return None;
        }

        let mut aug = Array2::<f64>::zeros((n, n + 1));
        aug.slice_mut(s![.., ..n]).assign(&a);
        aug.column_mut(n).assign(&b);

        let scale = a.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
        if scale == 0.0 || !scale.is_finite() {
            return None;
        }
        let tolerance = scale * f64::EPSILON * n as f64;

        for col in 0..n {
            let pivot_row = (col..n).max_by(|&x, &y| {
                aug[[x, col]].abs().total_cmp(&aug[[y, col]].abs())
            })?;
            if aug[[pivot_row, col]].abs() <= tolerance {
                return None;
            }
            if pivot_row != col {
                for k in 0..=n {
                    aug.swap([col, k], [pivot_row, k]);
                }
            }

            let pivot = aug[[col, col]];
            for k in col..=n {
                aug[[col, k]] /= pivot;
            }

            for row in 0..n {
                if row == col {
                    continue;
                }
                let factor = aug[[row, col]];
                if factor != 0.0 {
                    for k in col..=n {
                        aug[[row, k]] -= factor * aug[[col, k]];
                    }
                }
            }
        }

        Some(aug.column(n).to_owned())
    }

    /// Least-squares solution of an overdetermined system via the normal equations.
    pub fn least_squares(design: ArrayView2<f64>, rhs: ArrayView1<f64>) -> Option<Array1<f64>> {
        if design.nrows() != rhs.len() || design.nrows() < design.ncols() {
            return None;
        }
        let transposed = design.t();
        let normal = transposed.dot(&design);
        let projected = transposed.dot(&rhs);
        Self::solve(normal.view(), projected.view())
    }
}
