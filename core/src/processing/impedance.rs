use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{
    FALLBACK_INCIDENT_FRACTION, MATCHED_THRESHOLD, STABLE_WINDOW_SAMPLES,
    STRONG_REFLECTION_THRESHOLD, VSWR_SENTINEL,
};
use crate::ingest::Waveform;
use crate::math::stats::StatsHelper;
use crate::prelude::{AnalysisResult, AnalysisStage};
use crate::processing::events::EventSet;
use crate::processing::temporal::TemporalParams;
use crate::telemetry::log::LogManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadType {
    Matched,
    Open,
    Short,
    Capacitive,
    Inductive,
}

impl LoadType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadType::Matched => "matched",
            LoadType::Open => "open",
            LoadType::Short => "short",
            LoadType::Capacitive => "capacitive",
            LoadType::Inductive => "inductive",
        }
    }
}

impl fmt::Display for LoadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Voltage standing-wave ratio for a real reflection coefficient.
pub fn vswr(gamma: f64) -> f64 {
    let magnitude = gamma.abs();
    if magnitude < 1.0 {
        (1.0 + magnitude) / (1.0 - magnitude)
    } else {
        VSWR_SENTINEL
    }
}

/// Classify a real reflection coefficient and estimate the load impedance.
pub fn classify_load(gamma: f64, z0: f64) -> (LoadType, f64) {
    if gamma.abs() < MATCHED_THRESHOLD {
        return (LoadType::Matched, z0);
    }
    let load_type = if gamma > 0.0 {
        LoadType::Open
    } else {
        LoadType::Short
    };
    (load_type, z0 * (1.0 + gamma) / (1.0 - gamma))
}

/// Classify a reflection coefficient measured as a complex phasor.
///
/// Separate from [`classify_load`]: moderate reflections are reported as
/// reactive (capacitive/inductive) by phase sign rather than as open/short.
pub fn classify_phasor(gamma: Complex64) -> LoadType {
    let magnitude = gamma.norm();
    let phase = gamma.arg();
    if magnitude < MATCHED_THRESHOLD {
        LoadType::Matched
    } else if magnitude > STRONG_REFLECTION_THRESHOLD {
        if phase > 0.0 {
            LoadType::Open
        } else {
            LoadType::Short
        }
    } else if phase > 0.0 {
        LoadType::Capacitive
    } else {
        LoadType::Inductive
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpedanceResult {
    /// Incident voltage estimate (V).
    pub vi: f64,
    /// Reflected voltage estimate (V).
    pub vr: f64,
    pub reflection_coefficient: f64,
    pub vswr: f64,
    pub load_type: LoadType,
    /// Estimated load impedance (ohms).
    pub load_value: f64,
    pub z0: f64,
}

pub struct ImpedanceInput<'a> {
    pub waveform: &'a Waveform,
    pub events: &'a EventSet,
    pub temporal: &'a TemporalParams,
    pub z0_expected: f64,
}

pub struct ImpedanceAnalyzer {
    logger: LogManager,
}

impl ImpedanceAnalyzer {
    pub fn new() -> Self {
        Self {
            logger: LogManager::new("impedance"),
        }
    }

    fn incident_voltage(&self, input: &ImpedanceInput<'_>) -> f64 {
        let events = input.events;
        if let Some(plateau) = events.plateau {
            let (_, window) = input
                .waveform
                .select(|t| t >= plateau.start && t <= plateau.end);
            if let Some(mean) = StatsHelper::mean(&window) {
                return mean;
            }
        }

        let stable_time = events.t0 + input.temporal.dt;
        let (_, stable) = input.waveform.select(|t| t >= stable_time);
        let head = &stable[..stable.len().min(STABLE_WINDOW_SAMPLES)];
        StatsHelper::mean(head).unwrap_or_else(|| {
            self.logger
                .caution("no samples after t0 + dt; approximating incident level");
            events.v_max * FALLBACK_INCIDENT_FRACTION
        })
    }
}

impl Default for ImpedanceAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> AnalysisStage<'a> for ImpedanceAnalyzer {
    type Input = ImpedanceInput<'a>;
    type Output = ImpedanceResult;

    fn name(&self) -> &'static str {
        self.logger.stage()
    }

    fn execute(&self, input: ImpedanceInput<'a>) -> AnalysisResult<ImpedanceResult> {
        let vi = self.incident_voltage(&input);
        let vr = input
            .events
            .reflection_start
            .and_then(|start| input.waveform.voltage_at_or_after(start))
            .map(|v| v - vi)
            .unwrap_or(0.0);

        let reflection_coefficient = if vi != 0.0 { vr / vi } else { 0.0 };
        let (load_type, load_value) = classify_load(reflection_coefficient, input.z0_expected);

        let result = ImpedanceResult {
            vi,
            vr,
            reflection_coefficient,
            vswr: vswr(reflection_coefficient),
            load_type,
            load_value,
            z0: input.z0_expected,
        };
        self.logger.record(&format!(
            "vi {:.4} vr {:.4} gamma {:.4} vswr {:.4} load {} ({:.2} ohm)",
            result.vi,
            result.vr,
            result.reflection_coefficient,
            result.vswr,
            result.load_type,
            result.load_value
        ));
        Ok(result)
    }
}
