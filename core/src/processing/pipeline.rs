use crate::ingest::{IngestedWaveform, WaveformIngest};
use crate::prelude::{AnalysisInput, AnalysisResult, AnalysisStage};
use crate::processing::attenuation::{AttenuationEstimator, AttenuationInput, AttenuationResult};
use crate::processing::error_analysis::{ErrorAnalysis, ErrorAnalyzer, ErrorInput};
use crate::processing::events::{EventDetector, EventSet};
use crate::processing::impedance::{ImpedanceAnalyzer, ImpedanceInput, ImpedanceResult};
use crate::processing::temporal::{TemporalCalculator, TemporalParams};
use crate::telemetry::log::LogManager;

/// Every record produced by one analysis run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutcome {
    pub input: AnalysisInput,
    pub ingested: IngestedWaveform,
    pub events: EventSet,
    pub temporal: TemporalParams,
    pub impedance: ImpedanceResult,
    pub attenuation: AttenuationResult,
    pub errors: ErrorAnalysis,
}

/// Runs the analysis stages in dependency order.
///
/// Holds no per-run state, so a single instance can be shared between
/// concurrent requests.
pub struct Pipeline {
    ingest: WaveformIngest,
    events: EventDetector,
    temporal: TemporalCalculator,
    impedance: ImpedanceAnalyzer,
    attenuation: AttenuationEstimator,
    errors: ErrorAnalyzer,
    logger: LogManager,
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            ingest: WaveformIngest::new(),
            events: EventDetector::new(),
            temporal: TemporalCalculator::new(),
            impedance: ImpedanceAnalyzer::new(),
            attenuation: AttenuationEstimator::new(),
            errors: ErrorAnalyzer::new(),
            logger: LogManager::new("pipeline"),
        }
    }

    pub fn name(&self) -> &'static str {
        self.logger.stage()
    }

    /// Ingest only: parse, clean and smooth the capture.
    pub fn inspect(&self, content: &str) -> AnalysisResult<IngestedWaveform> {
        self.ingest.execute(content)
    }

    pub fn run(&self, content: &str, input: AnalysisInput) -> AnalysisResult<AnalysisOutcome> {
        input.validate()?;

        let ingested = self.ingest.execute(content)?;
        let events = self.events.execute(&ingested.waveform)?;
        let temporal = self.temporal.execute((&events, input.cable_length))?;
        let impedance = self.impedance.execute(ImpedanceInput {
            waveform: &ingested.waveform,
            events: &events,
            temporal: &temporal,
            z0_expected: input.z0_expected,
        })?;
        let attenuation = self.attenuation.execute(AttenuationInput {
            waveform: &ingested.waveform,
            events: &events,
            temporal: &temporal,
        })?;
        let errors = self.errors.execute(ErrorInput {
            temporal: &temporal,
            config: &ingested.config,
            cable_length: input.cable_length,
        })?;

        self.logger.record(&format!(
            "{} samples analysed through {} stages: VF {:.2}% gamma {:.3} load {}",
            ingested.waveform.len(),
            [
                self.ingest.name(),
                self.events.name(),
                self.temporal.name(),
                self.impedance.name(),
                self.attenuation.name(),
                self.errors.name(),
            ]
            .join(" > "),
            temporal.velocity_factor,
            impedance.reflection_coefficient,
            impedance.load_type
        ));

        Ok(AnalysisOutcome {
            input,
            ingested,
            events,
            temporal,
            impedance,
            attenuation,
            errors,
        })
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{HEADER_LINES, PROPAGATION_FLOOR, SPEED_OF_LIGHT};
    use crate::prelude::AnalysisError;
    use crate::processing::impedance::LoadType;
    use crate::processing::temporal::DelayMethod;

    /// 1 ns sampling, incident step at 100 ns, reflection drops to half at 400 ns.
    fn capture() -> String {
        let mut lines = vec![
            "Record Length:1000".to_string(),
            "Sample Interval:1.000000e-09,s".to_string(),
            "Vertical Scale:2.000000e-01,V".to_string(),
            "Vertical Offset:0.000000e+00,V".to_string(),
            "Horizontal Scale:1.000000e-07".to_string(),
        ];
        lines.resize(HEADER_LINES, "Source:CH1".to_string());
        lines.push("Second,Volt".to_string());
        for i in 0..1000 {
            let v = match i {
                0..=99 => 0.0,
                100..=399 => 1.0,
                _ => 0.5,
            };
            lines.push(format!("{:e},{}", i as f64 * 1e-9, v));
        }
        lines.join("\r\n")
    }

    #[test]
    fn pipeline_characterizes_step_capture() {
        let outcome = Pipeline::new()
            .run(&capture(), AnalysisInput::new(30.0, 50.0))
            .unwrap();

        assert_eq!(outcome.ingested.waveform.len(), 1000);
        assert_eq!(outcome.ingested.dropped_rows, 1);
        assert_eq!(outcome.ingested.config.sample_interval, Some(1e-9));

        let plateau = outcome.events.plateau.expect("plateau after smoothing");
        assert!(plateau.start > 100e-9 && plateau.end < 400e-9);
        assert!(outcome.events.reflection_start.unwrap() > plateau.end);

        assert_eq!(outcome.temporal.method, DelayMethod::Plateau);
        assert!(outcome.temporal.dt > 200e-9 && outcome.temporal.dt < 320e-9);
        assert_eq!(outcome.temporal.vp, 60.0 / outcome.temporal.dt);
        assert!(
            (outcome.temporal.velocity_factor - 100.0 * outcome.temporal.vp / SPEED_OF_LIGHT)
                .abs()
                < 1e-9
        );

        // The smoothed edge starts rising right after the plateau, so the
        // sampled reflection level still equals the incident level.
        assert!((outcome.impedance.vi - 1.0).abs() < 1e-9);
        assert!(outcome.impedance.reflection_coefficient.abs() < 0.1);
        assert_eq!(outcome.impedance.load_type, LoadType::Matched);
        assert_eq!(outcome.impedance.load_value, 50.0);
        assert!(outcome.attenuation.alpha >= PROPAGATION_FLOOR);
        assert!(outcome.attenuation.beta >= PROPAGATION_FLOOR);
        assert!(outcome.errors.error_percent > 0.0);
    }

    #[test]
    fn default_matches_new() {
        assert_eq!(Pipeline::default().name(), "pipeline");
        assert_eq!(Pipeline::default().name(), Pipeline::new().name());
    }

    #[test]
    fn invalid_parameters_fail_before_parsing() {
        let err = Pipeline::new()
            .run("not a capture", AnalysisInput::new(-1.0, 50.0))
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidParameter(_)));
    }

    #[test]
    fn flat_capture_reports_no_pulse() {
        let mut lines = vec![String::new(); HEADER_LINES];
        lines.extend((0..100).map(|i| format!("{},0", i)));
        let err = Pipeline::new()
            .run(&lines.join("\n"), AnalysisInput::new(10.0, 50.0))
            .unwrap_err();
        assert!(matches!(err, AnalysisError::NoPulseDetected));
    }

    #[test]
    fn inspect_returns_cleaned_series() {
        let ingested = Pipeline::new().inspect(&capture()).unwrap();
        assert_eq!(ingested.waveform.len(), 1000);
        assert_eq!(ingested.config.horizontal_scale, Some(1e-7));
    }
}
