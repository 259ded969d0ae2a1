use serde::{Deserialize, Serialize};

use crate::constants::{RAMP_STEPS, RAMP_WINDOW, RISE_UPPER_FRACTION, SPEED_OF_LIGHT};
use crate::prelude::{AnalysisError, AnalysisResult, AnalysisStage};
use crate::processing::events::EventSet;
use crate::telemetry::log::LogManager;

/// How the round-trip delay was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelayMethod {
    Plateau,
    Reflection,
    LinearRamp,
}

impl DelayMethod {
    /// Strategies in priority order; the first positive delay wins.
    pub const ORDERED: [DelayMethod; 3] = [
        DelayMethod::Plateau,
        DelayMethod::Reflection,
        DelayMethod::LinearRamp,
    ];

    pub fn estimate(self, events: &EventSet) -> Option<f64> {
        match self {
            DelayMethod::Plateau => events.plateau.map(|p| p.end - events.t0),
            DelayMethod::Reflection => events.reflection_start.map(|r| r - events.t0),
            DelayMethod::LinearRamp => linear_ramp_delay(events),
        }
    }
}

/// Walk a straight line from `(t0, 0)` to `(t0 + RAMP_WINDOW, v_max)` and
/// return the delay of the first point at or above 90% of `v_max`.
///
/// This is not derived from the measured waveform; it only keeps captures
/// without plateau or reflection analysable.
fn linear_ramp_delay(events: &EventSet) -> Option<f64> {
    let last = (RAMP_STEPS - 1) as f64;
    let voltage_step = events.v_max / last;
    let time_step = RAMP_WINDOW / last;
    (0..RAMP_STEPS)
        .find(|&i| i as f64 * voltage_step >= RISE_UPPER_FRACTION * events.v_max)
        .map(|i| (events.t0 + i as f64 * time_step) - events.t0)
}

/// Propagation parameters derived from the round-trip delay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemporalParams {
    /// Round-trip delay (s), always positive.
    pub dt: f64,
    /// Propagation velocity (m/s).
    pub vp: f64,
    /// Velocity factor in percent of `c`.
    pub velocity_factor: f64,
    pub epsilon_eff: f64,
    pub method: DelayMethod,
}

impl TemporalParams {
    pub fn from_delay(dt: f64, cable_length: f64, method: DelayMethod) -> AnalysisResult<Self> {
        if !(dt > 0.0 && dt.is_finite()) {
            return Err(AnalysisError::UndeterminedDelay);
        }
        let vp = 2.0 * cable_length / dt;
        Ok(Self {
            dt,
            vp,
            velocity_factor: vp / SPEED_OF_LIGHT * 100.0,
            epsilon_eff: (SPEED_OF_LIGHT / vp).powi(2),
            method,
        })
    }
}

pub struct TemporalCalculator {
    logger: LogManager,
}

impl TemporalCalculator {
    pub fn new() -> Self {
        Self {
            logger: LogManager::new("temporal"),
        }
    }
}

impl Default for TemporalCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> AnalysisStage<'a> for TemporalCalculator {
    /// Detected events and the physical cable length in meters.
    type Input = (&'a EventSet, f64);
    type Output = TemporalParams;

    fn name(&self) -> &'static str {
        self.logger.stage()
    }

    fn execute(&self, (events, cable_length): (&'a EventSet, f64)) -> AnalysisResult<TemporalParams> {
        let (method, dt) = DelayMethod::ORDERED
            .iter()
            .find_map(|&method| {
                method
                    .estimate(events)
                    .filter(|dt| *dt > 0.0)
                    .map(|dt| (method, dt))
            })
            .ok_or(AnalysisError::UndeterminedDelay)?;

        if method == DelayMethod::LinearRamp {
            self.logger.caution(&format!(
                "no plateau or reflection found; using linear-ramp delay {:.4e}s",
                dt
            ));
        }

        let params = TemporalParams::from_delay(dt, cable_length, method)?;
        self.logger.record(&format!(
            "dt {:.4e}s via {:?}, vp {:.4e} m/s, VF {:.2}%",
            params.dt, params.method, params.vp, params.velocity_factor
        ));
        Ok(params)
    }
}
