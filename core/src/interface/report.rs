use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::constants::REPORT_INFINITY;
use crate::processing::impedance::LoadType;
use crate::processing::pipeline::AnalysisOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveformPoint {
    pub time: f64,
    pub ch1: f64,
}

/// Result record returned for a completed analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub length_meters: f64,
    pub error_percent: f64,
    pub velocity_factor: f64,
    pub vswr: f64,
    pub reflection_coefficient: f64,
    pub beta: f64,
    pub alpha: f64,
    #[serde(rename = "Z0")]
    pub z0: f64,
    pub load_type: LoadType,
    pub load_value: f64,
    pub tdr_plot_base64: String,
    pub waveform: Vec<WaveformPoint>,
}

/// JSON has no infinities; map them to large sentinels and NaN to zero.
pub fn json_safe(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else if value == f64::INFINITY {
        REPORT_INFINITY
    } else if value == f64::NEG_INFINITY {
        -REPORT_INFINITY
    } else {
        value
    }
}

impl AnalysisReport {
    pub fn from_outcome(outcome: &AnalysisOutcome, plot_png: &[u8]) -> Self {
        Self {
            length_meters: outcome.input.cable_length,
            error_percent: outcome.errors.error_percent,
            velocity_factor: outcome.temporal.velocity_factor,
            vswr: outcome.impedance.vswr,
            reflection_coefficient: outcome.impedance.reflection_coefficient,
            beta: outcome.attenuation.beta,
            alpha: outcome.attenuation.alpha,
            z0: outcome.impedance.z0,
            load_type: outcome.impedance.load_type,
            load_value: outcome.impedance.load_value,
            tdr_plot_base64: STANDARD.encode(plot_png),
            waveform: outcome
                .ingested
                .waveform
                .points()
                .map(|(time, ch1)| WaveformPoint { time, ch1 })
                .collect(),
        }
        .sanitized()
    }

    /// Apply [`json_safe`] to every top-level scalar.
    pub fn sanitized(mut self) -> Self {
        for value in [
            &mut self.length_meters,
            &mut self.error_percent,
            &mut self.velocity_factor,
            &mut self.vswr,
            &mut self.reflection_coefficient,
            &mut self.beta,
            &mut self.alpha,
            &mut self.z0,
            &mut self.load_value,
        ] {
            *value = json_safe(*value);
        }
        self
    }
}
