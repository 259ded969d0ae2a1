use crate::workflow::config::AnalyzerConfig;
use std::sync::Arc;
use tdrcore::prelude::{AnalysisError, AnalysisInput, AnalysisResult};
use tdrcore::processing::AnalysisOutcome;
use tdrcore::render::render_waveform_png;
use tdrcore::{AnalysisReport, Pipeline, WaveformInspection};

pub struct WorkflowResult {
    pub outcome: AnalysisOutcome,
    pub plot_png: Vec<u8>,
    pub report: AnalysisReport,
}

/// Validates uploads, runs the shared pipeline and packages its output.
#[derive(Clone)]
pub struct Runner {
    pipeline: Arc<Pipeline>,
    config: AnalyzerConfig,
}

fn decode_capture(bytes: &[u8]) -> AnalysisResult<&str> {
    let content = std::str::from_utf8(bytes).map_err(|err| {
        AnalysisError::MalformedInput(format!("capture is not valid UTF-8: {}", err))
    })?;
    Ok(content.strip_prefix('\u{feff}').unwrap_or(content))
}

fn check_extension(filename: &str) -> AnalysisResult<()> {
    if filename.to_ascii_lowercase().ends_with(".csv") {
        Ok(())
    } else {
        Err(AnalysisError::InvalidFileType(format!(
            "'{}' is not a .csv file",
            filename
        )))
    }
}

impl Runner {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            pipeline: Arc::new(Pipeline::new()),
            config,
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn analyze(
        &self,
        filename: &str,
        bytes: &[u8],
        cable_length: f64,
        z0_expected: Option<f64>,
    ) -> AnalysisResult<WorkflowResult> {
        check_extension(filename)?;
        let input = AnalysisInput::new(
            cable_length,
            z0_expected.unwrap_or(self.config.default_z0),
        );
        let content = decode_capture(bytes)?;

        let outcome = self.pipeline.run(content, input)?;
        let plot_png = render_waveform_png(
            &outcome.ingested.waveform,
            Some(&outcome.events),
            &self.config.to_plot_style(),
        )?;
        let report = AnalysisReport::from_outcome(&outcome, &plot_png);

        Ok(WorkflowResult {
            outcome,
            plot_png,
            report,
        })
    }

    pub fn inspect(&self, bytes: &[u8]) -> AnalysisResult<WaveformInspection> {
        let content = decode_capture(bytes)?;
        self.pipeline.inspect(content).map(WaveformInspection::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::profile::{build_capture_csv, GeneratorConfig};
    use tdrcore::processing::DelayMethod;

    fn capture() -> Vec<u8> {
        build_capture_csv(&GeneratorConfig::default())
            .unwrap()
            .into_bytes()
    }

    #[test]
    fn runner_analyzes_generated_capture() {
        let runner = Runner::new(AnalyzerConfig::default());
        let result = runner
            .analyze("capture.CSV", &capture(), 30.0, None)
            .unwrap();

        assert_eq!(result.outcome.temporal.method, DelayMethod::Plateau);
        // Smoothing moves the plateau end a few samples ahead of the true edge.
        let vf = result.report.velocity_factor;
        assert!(vf > 60.0 && vf < 80.0, "velocity factor {}", vf);
        assert_eq!(result.report.z0, 50.0);
        assert_eq!(result.report.length_meters, 30.0);
        assert_eq!(result.report.waveform.len(), 1000);
        assert_eq!(result.plot_png[..4], [0x89, b'P', b'N', b'G']);
        assert!(!result.report.tdr_plot_base64.is_empty());
    }

    #[test]
    fn explicit_impedance_overrides_default() {
        let runner = Runner::new(AnalyzerConfig::default());
        let result = runner
            .analyze("capture.csv", &capture(), 30.0, Some(75.0))
            .unwrap();
        assert_eq!(result.report.z0, 75.0);
    }

    #[test]
    fn non_csv_upload_is_rejected() {
        let runner = Runner::new(AnalyzerConfig::default());
        let err = runner
            .analyze("capture.txt", &capture(), 30.0, None)
            .err()
            .unwrap();
        assert!(matches!(err, AnalysisError::InvalidFileType(_)));
    }

    #[test]
    fn non_positive_cable_length_is_an_invalid_parameter() {
        let runner = Runner::new(AnalyzerConfig::default());
        for (length, z0) in [(0.0, None), (30.0, Some(-75.0)), (f64::NAN, None)] {
            let err = runner.analyze("capture.csv", &capture(), length, z0).err().unwrap();
            assert!(
                matches!(err, AnalysisError::InvalidParameter(_)),
                "{:?}",
                err
            );
        }
    }

    #[test]
    fn invalid_bytes_are_malformed() {
        let runner = Runner::new(AnalyzerConfig::default());
        let err = runner
            .analyze("capture.csv", &[0xff, 0xfe, 0x00], 30.0, None)
            .err()
            .unwrap();
        assert!(matches!(err, AnalysisError::MalformedInput(_)));
    }

    #[test]
    fn inspection_strips_byte_order_mark() {
        let runner = Runner::new(AnalyzerConfig::default());
        let mut bytes = "\u{feff}".as_bytes().to_vec();
        bytes.extend(capture());
        let inspection = runner.inspect(&bytes).unwrap();
        assert_eq!(inspection.time.len(), 1000);
        assert_eq!(inspection.config.sample_interval, Some(1e-9));
    }
}
