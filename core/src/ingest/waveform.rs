use serde::{Deserialize, Serialize};

use crate::prelude::{AnalysisError, AnalysisResult};

/// Cleaned capture: paired time (s) and voltage (V) samples, all finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waveform {
    time: Vec<f64>,
    voltage: Vec<f64>,
}

impl Waveform {
    pub fn new(time: Vec<f64>, voltage: Vec<f64>) -> AnalysisResult<Self> {
        if time.len() != voltage.len() {
            return Err(AnalysisError::Internal(format!(
                "time/voltage length mismatch: {} vs {}",
                time.len(),
                voltage.len()
            )));
        }
        if time.iter().chain(&voltage).any(|v| !v.is_finite()) {
            return Err(AnalysisError::Internal(
                "waveform contains non-finite samples".into(),
            ));
        }
        Ok(Self { time, voltage })
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn voltage(&self) -> &[f64] {
        &self.voltage
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.time.iter().copied().zip(self.voltage.iter().copied())
    }

    /// Samples whose time satisfies `keep`, in capture order.
    pub fn select<F>(&self, keep: F) -> (Vec<f64>, Vec<f64>)
    where
        F: Fn(f64) -> bool,
    {
        self.points().filter(|&(t, _)| keep(t)).unzip()
    }

    /// Voltage of the first sample at or after `t`.
    pub fn voltage_at_or_after(&self, t: f64) -> Option<f64> {
        self.points().find(|&(time, _)| time >= t).map(|(_, v)| v)
    }

    /// Consume the waveform, returning its `(time, voltage)` vectors.
    pub fn into_parts(self) -> (Vec<f64>, Vec<f64>) {
        (self.time, self.voltage)
    }
}
