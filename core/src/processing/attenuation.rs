use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

use crate::constants::{
    ATTENUATION_FALLBACK, MIN_ATTENUATION_SAMPLES, MIN_DECAY_FIT_POINTS, MIN_DECAY_WINDOW,
    PHASE_FALLBACK, PROPAGATION_FLOOR,
};
use crate::ingest::Waveform;
use crate::math::stats::StatsHelper;
use crate::prelude::{AnalysisResult, AnalysisStage};
use crate::processing::events::EventSet;
use crate::processing::temporal::TemporalParams;
use crate::telemetry::log::LogManager;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttenuationResult {
    /// Attenuation constant (Np/m), never below the floor.
    pub alpha: f64,
    /// Phase constant (rad/m), never below the floor.
    pub beta: f64,
}

pub struct AttenuationInput<'a> {
    pub waveform: &'a Waveform,
    pub events: &'a EventSet,
    pub temporal: &'a TemporalParams,
}

pub struct AttenuationEstimator {
    logger: LogManager,
}

impl AttenuationEstimator {
    pub fn new() -> Self {
        Self {
            logger: LogManager::new("attenuation"),
        }
    }

    /// Negative slope of `ln(|v| / v_max)` against time after `t0 + dt`.
    fn decay_alpha(&self, input: &AttenuationInput<'_>) -> Option<f64> {
        if input.waveform.len() <= MIN_ATTENUATION_SAMPLES {
            return None;
        }
        let start = input.events.t0 + input.temporal.dt;
        let (time, voltage) = input.waveform.select(|t| t >= start);
        if time.len() < MIN_DECAY_WINDOW {
            return None;
        }

        let v_max = input.events.v_max;
        let (x, y): (Vec<f64>, Vec<f64>) = time
            .iter()
            .zip(&voltage)
            .filter_map(|(&t, &v)| {
                let ratio = v.abs() / v_max;
                (ratio.is_finite() && ratio > 0.0).then(|| (t, ratio.ln()))
            })
            .unzip();
        if x.len() < MIN_DECAY_FIT_POINTS {
            return None;
        }

        StatsHelper::linear_fit(&x, &y).map(|fit| -fit.slope)
    }
}

/// Phase constant `2π / λ` with `λ = vp / f_eff`.
pub fn phase_constant(vp: f64, f_eff: f64) -> f64 {
    let wavelength = vp / f_eff;
    let usable = |v: f64| v.is_finite() && v > 0.0;
    if usable(vp) && usable(f_eff) && usable(wavelength) {
        TAU / wavelength
    } else {
        PHASE_FALLBACK
    }
}

impl Default for AttenuationEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> AnalysisStage<'a> for AttenuationEstimator {
    type Input = AttenuationInput<'a>;
    type Output = AttenuationResult;

    fn name(&self) -> &'static str {
        self.logger.stage()
    }

    fn execute(&self, input: AttenuationInput<'a>) -> AnalysisResult<AttenuationResult> {
        let alpha = self.decay_alpha(&input).unwrap_or_else(|| {
            self.logger
                .trace_marker("decay fit unavailable; using typical attenuation");
            ATTENUATION_FALLBACK
        });
        let beta = phase_constant(input.temporal.vp, input.events.f_eff);

        let result = AttenuationResult {
            alpha: alpha.max(PROPAGATION_FLOOR),
            beta: beta.max(PROPAGATION_FLOOR),
        };
        self.logger.record(&format!(
            "alpha {:.4e} Np/m beta {:.4e} rad/m",
            result.alpha, result.beta
        ));
        Ok(result)
    }
}
