use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_SAMPLE_INTERVAL, LENGTH_UNCERTAINTY_FRACTION, SPEED_OF_LIGHT,
    TIMING_UNCERTAINTY_FRACTION,
};
use crate::ingest::WaveformConfig;
use crate::prelude::{AnalysisResult, AnalysisStage};
use crate::processing::temporal::TemporalParams;
use crate::telemetry::log::LogManager;

/// Measurement uncertainty propagated into the velocity estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorAnalysis {
    pub dt_error: f64,
    pub vp_error: f64,
    pub vf_error: f64,
    pub error_percent: f64,
}

pub struct ErrorInput<'a> {
    pub temporal: &'a TemporalParams,
    pub config: &'a WaveformConfig,
    pub cable_length: f64,
}

pub struct ErrorAnalyzer {
    logger: LogManager,
}

impl ErrorAnalyzer {
    pub fn new() -> Self {
        Self {
            logger: LogManager::new("errors"),
        }
    }
}

impl Default for ErrorAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> AnalysisStage<'a> for ErrorAnalyzer {
    type Input = ErrorInput<'a>;
    type Output = ErrorAnalysis;

    fn name(&self) -> &'static str {
        self.logger.stage()
    }

    fn execute(&self, input: ErrorInput<'a>) -> AnalysisResult<ErrorAnalysis> {
        let TemporalParams { dt, vp, .. } = *input.temporal;
        let sample_interval = input
            .config
            .sample_interval
            .unwrap_or(DEFAULT_SAMPLE_INTERVAL);

        let dt_error = sample_interval + TIMING_UNCERTAINTY_FRACTION * dt;
        let length_error = LENGTH_UNCERTAINTY_FRACTION * input.cable_length;
        let vp_error = vp
            * ((length_error / input.cable_length).powi(2) + (dt_error / dt).powi(2)).sqrt();

        let analysis = ErrorAnalysis {
            dt_error,
            vp_error,
            vf_error: vp_error / SPEED_OF_LIGHT * 100.0,
            error_percent: vp_error / vp * 100.0,
        };
        self.logger.record(&format!(
            "dt error {:.3e}s, vp error {:.3e} m/s ({:.2}%)",
            analysis.dt_error, analysis.vp_error, analysis.error_percent
        ));
        Ok(analysis)
    }
}
