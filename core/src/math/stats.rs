/// Slope/intercept pair of a first-degree least-squares fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

pub struct StatsHelper;

impl StatsHelper {
    pub fn mean(samples: &[f64]) -> Option<f64> {
        if samples.is_empty() {
            return None;
        }
        Some(samples.iter().sum::<f64>() / samples.len() as f64)
    }

    /// Largest value, ignoring NaN entries.
    pub fn max(samples: &[f64]) -> Option<f64> {
        samples
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .reduce(f64::max)
    }

    /// First-degree least-squares fit of `y` against `x`.
    ///
    /// Both axes are centered before accumulation so that nanosecond-scale
    /// time axes keep their precision.
    pub fn linear_fit(x: &[f64], y: &[f64]) -> Option<LinearFit> {
        if x.len() != y.len() || x.len() < 2 {
            return None;
        }
        let x_mean = Self::mean(x)?;
        let y_mean = Self::mean(y)?;

        let (sxx, sxy) = x
            .iter()
            .zip(y)
            .fold((0.0, 0.0), |(sxx, sxy), (&xi, &yi)| {
                let dx = xi - x_mean;
                (sxx + dx * dx, sxy + dx * (yi - y_mean))
            });
        if sxx == 0.0 || !sxx.is_finite() {
            return None;
        }

        let slope = sxy / sxx;
        Some(LinearFit {
            slope,
            intercept: y_mean - slope * x_mean,
        })
    }
}
